//! `routefab keygen`: generate a key seed and print the derived keys.

use clap::Args;
use routefab_crypto::{sealing_key, KeyPair};

#[derive(Args, Debug)]
pub struct KeygenArgs {}

pub fn run(_args: &KeygenArgs) -> anyhow::Result<()> {
    let mut seed = [0u8; 32];
    use rand::RngCore;
    rand::rngs::OsRng.fill_bytes(&mut seed);

    let keypair = KeyPair::from_seed(&seed);
    println!("seed:        {}", hex::encode(seed));
    println!("public key:  {}", keypair.public_key().to_hex());
    println!("sealing key: {}", hex::encode(sealing_key(&keypair)));
    Ok(())
}
