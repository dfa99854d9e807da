pub mod agent;
pub mod controller;
pub mod init;
pub mod keygen;

use anyhow::Context;
use routefab_crypto::KeyPair;

/// Key pair from an optional hex seed; random when absent.
pub fn keypair_from_seed(seed: Option<&str>) -> anyhow::Result<KeyPair> {
    match seed {
        Some(hex_seed) => {
            let bytes = hex::decode(hex_seed).context("seed is not valid hex")?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("seed must be exactly 32 bytes"))?;
            Ok(KeyPair::from_seed(&seed))
        }
        None => Ok(KeyPair::generate()),
    }
}
