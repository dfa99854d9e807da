use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::CryptoError;

/// Ed25519 key pair identifying one fabric participant.
/// Private key material is zeroized on drop by ed25519-dalek.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair using OS-provided entropy.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a key pair from a 32-byte seed. Deterministic: the same seed
    /// always yields the same keys, which tests and fixtures rely on.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Create a key pair from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Raw secret bytes. Used only as input to the X25519 derivation.
    pub(crate) fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

/// Ed25519 public key of a fabric participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        let verifying_key = VerifyingKey::from_bytes(&arr)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid public key: {}", e)))?;
        Ok(Self { verifying_key })
    }

    /// Raw bytes (32 bytes).
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    /// Encode as hex, the format used in config files.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Decode from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair() {
        let kp = KeyPair::generate();
        assert_eq!(kp.public_key().as_bytes().len(), 32);
    }

    #[test]
    fn test_from_seed_deterministic() {
        let kp1 = KeyPair::from_seed(&[42u8; 32]);
        let kp2 = KeyPair::from_seed(&[42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_from_bytes_invalid_length() {
        assert!(KeyPair::from_bytes(&[0u8; 16]).is_err());
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let pk = KeyPair::generate().public_key();
        let back = PublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, back);
    }

    #[test]
    fn test_different_seeds_different_keys() {
        let kp1 = KeyPair::from_seed(&[1u8; 32]);
        let kp2 = KeyPair::from_seed(&[2u8; 32]);
        assert_ne!(kp1.public_key(), kp2.public_key());
    }
}
