//! Signing capability and the Ed25519 implementation of it.
//!
//! The chain only ever asks a [`Signer`] to sign a byte blob. Verification of
//! header authenticity belongs to whoever consumes the chain.

use ed25519_dalek::{Signature as DalekSignature, Signer as _, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SignError;

/// Opaque signature bytes produced by a signing capability.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}...)", &hex[..hex.len().min(16)])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A signing capability: signs a byte blob and returns a signature.
pub trait Signer {
    /// Sign `message`.
    fn sign(&self, message: &[u8]) -> Result<Signature, SignError>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn sign(&self, message: &[u8]) -> Result<Signature, SignError> {
        (**self).sign(message)
    }
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn sign(&self, message: &[u8]) -> Result<Signature, SignError> {
        (**self).sign(message)
    }
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify an Ed25519 signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignError> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|_| SignError::new("invalid public key"))?;
        let bytes: [u8; 64] = signature
            .as_bytes()
            .try_into()
            .map_err(|_| SignError::new("invalid signature length"))?;
        verifying_key
            .verify(message, &DalekSignature::from_bytes(&bytes))
            .map_err(|_| SignError::new("invalid signature"))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

/// An Ed25519 keypair. Signing is deterministic.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }
}

impl Signer for Keypair {
    fn sign(&self, message: &[u8]) -> Result<Signature, SignError> {
        Ok(Signature(self.signing_key.sign(message).to_bytes().to_vec()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"hello world").unwrap();

        keypair
            .public_key()
            .verify(b"hello world", &signature)
            .expect("valid signature should verify");
        assert!(keypair.public_key().verify(b"hello worlD", &signature).is_err());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let kp1 = Keypair::from_seed(&[0x42; 32]);
        let kp2 = Keypair::from_seed(&[0x42; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.sign(b"msg").unwrap(), kp2.sign(b"msg").unwrap());
    }

    #[test]
    fn test_signer_through_reference() {
        fn sign_with(signer: &dyn Signer) -> Signature {
            signer.sign(b"blob").unwrap()
        }
        let keypair = Keypair::from_seed(&[7; 32]);
        assert_eq!(sign_with(&keypair).as_bytes().len(), 64);
    }
}
