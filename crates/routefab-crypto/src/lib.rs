//! The opaque encrypt/decrypt capability of the fabric.
//!
//! Node identities and message payloads travel sealed: the sender performs an
//! ephemeral X25519 exchange against the recipient's derived public key and
//! encrypts with ChaCha20-Poly1305. Every hop in between sees only opaque
//! bytes.

pub mod error;
pub mod keys;
pub mod sealed;

pub use error::CryptoError;
pub use keys::{KeyPair, PublicKey};
pub use sealed::{open, seal, sealing_key, SealedPayload};
