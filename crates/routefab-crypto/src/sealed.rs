use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::keys::KeyPair;

/// A sealed payload: ciphertext plus the nonce and ephemeral public key the
/// recipient needs to open it. Only the holder of the recipient key pair can
/// recover the plaintext; intermediate hops treat the whole thing as opaque
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    /// Ephemeral X25519 public key used for the key exchange.
    pub ephemeral_pubkey: [u8; 32],
    /// 12-byte nonce for ChaCha20-Poly1305.
    pub nonce: [u8; 12],
    /// Encrypted data (ciphertext + 16-byte Poly1305 tag).
    pub ciphertext: Vec<u8>,
}

impl SealedPayload {
    /// Serialize to bytes: ephemeral_pubkey (32) + nonce (12) + ciphertext.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 12 + self.ciphertext.len());
        out.extend_from_slice(&self.ephemeral_pubkey);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < 44 {
            return Err(CryptoError::OpenError("payload too short".into()));
        }
        let mut ephemeral_pubkey = [0u8; 32];
        ephemeral_pubkey.copy_from_slice(&bytes[..32]);
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&bytes[32..44]);
        Ok(Self {
            ephemeral_pubkey,
            nonce,
            ciphertext: bytes[44..].to_vec(),
        })
    }
}

/// Derive an X25519 static secret from an Ed25519 key pair's seed, with
/// BLAKE3 domain separation.
fn derive_x25519_secret(keypair: &KeyPair) -> StaticSecret {
    let seed = keypair.secret_bytes();
    let derived = blake3::derive_key("routefab-x25519-key-derivation-v1", &seed);
    StaticSecret::from(derived)
}

/// The X25519 public key a sender needs to seal payloads for the holder of
/// `keypair`. This is what goes into address books and registration config.
pub fn sealing_key(keypair: &KeyPair) -> [u8; 32] {
    let secret = derive_x25519_secret(keypair);
    X25519PublicKey::from(&secret).to_bytes()
}

/// Seal plaintext for a recipient: ephemeral X25519 Diffie-Hellman against
/// the recipient's sealing key, symmetric key via BLAKE3, then
/// ChaCha20-Poly1305.
pub fn seal(plaintext: &[u8], recipient_sealing_key: &[u8; 32]) -> Result<SealedPayload, CryptoError> {
    let mut ephemeral_secret_bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut ephemeral_secret_bytes);
    let ephemeral_secret = StaticSecret::from(ephemeral_secret_bytes);
    ephemeral_secret_bytes.zeroize();
    let ephemeral_pubkey = X25519PublicKey::from(&ephemeral_secret);

    let recipient_pubkey = X25519PublicKey::from(*recipient_sealing_key);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient_pubkey);
    let symmetric_key = blake3::derive_key("routefab-sealed-payload-v1", shared_secret.as_bytes());

    let mut nonce_bytes = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key)
        .map_err(|e| CryptoError::SealError(format!("cipher init failed: {}", e)))?;
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::SealError(format!("encryption failed: {}", e)))?;

    Ok(SealedPayload {
        ephemeral_pubkey: ephemeral_pubkey.to_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Open a sealed payload with the recipient's key pair.
pub fn open(payload: &SealedPayload, recipient_keypair: &KeyPair) -> Result<Vec<u8>, CryptoError> {
    let ephemeral_pubkey = X25519PublicKey::from(payload.ephemeral_pubkey);
    let recipient_secret = derive_x25519_secret(recipient_keypair);
    let shared_secret = recipient_secret.diffie_hellman(&ephemeral_pubkey);
    let symmetric_key = blake3::derive_key("routefab-sealed-payload-v1", shared_secret.as_bytes());

    let nonce = Nonce::from_slice(&payload.nonce);
    let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key)
        .map_err(|e| CryptoError::OpenError(format!("cipher init failed: {}", e)))?;
    let plaintext = cipher
        .decrypt(nonce, payload.ciphertext.as_slice())
        .map_err(|e| CryptoError::OpenError(format!("decryption failed: {}", e)))?;

    Ok(plaintext)
}
