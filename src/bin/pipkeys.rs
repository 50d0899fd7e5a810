//! Key material helper: generate RSA key pairs and master seeds, and list
//! retired key pairs that can be deleted.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use pip_tokens::codec::to_hex;
use pip_tokens::rotation::{parse_epoch, prune_candidates, private_key_name, public_key_name};
use pip_tokens::KeyPair;
use rand::RngCore;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Blind RSA key and seed management
#[derive(Parser, Debug)]
#[command(name = "pipkeys")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a new key pair as `{"BLIND_RSA_PRIVATE_KEY_<epoch>": "<jwk json>", ...}`, ready for `rsa.keys`
    Generate {
        /// Modulus size in bits
        #[arg(long, default_value_t = 2048)]
        bits: usize,
        /// Key epoch, defaults to the current unix time in seconds
        #[arg(long)]
        epoch: Option<u64>,
    },
    /// Print a fresh 32-byte master seed in hex
    Seed,
    /// Print the key names whose epochs may be deleted
    Prune {
        /// Newest epochs to keep (never fewer than 2)
        #[arg(long, default_value_t = 2)]
        keep: usize,
        /// Key names, e.g. BLIND_RSA_PUBLIC_KEY_1700000000
        names: Vec<String>,
    },
}

/// Named JWK strings for one pair, in the shape `rsa.keys` is loaded from.
fn named_jwks(kp: &KeyPair, epoch: u64) -> pip_tokens::Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    out.insert(private_key_name(epoch), kp.sk.to_jwk().to_json()?);
    out.insert(public_key_name(epoch), kp.pk.to_jwk().to_json()?);
    Ok(out)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate { bits, epoch } => {
            let epoch = match epoch {
                Some(epoch) => epoch,
                None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
            };
            info!(bits, epoch, "generating key pair");
            let kp = KeyPair::generate(&mut rand::thread_rng(), bits)?;
            println!("{}", serde_json::to_string_pretty(&named_jwks(&kp, epoch)?)?);
        }
        Commands::Seed => {
            let mut seed = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut seed);
            println!("{}", to_hex(seed));
        }
        Commands::Prune { keep, names } => {
            let mut epochs = Vec::with_capacity(names.len());
            for name in &names {
                match parse_epoch(name) {
                    Some(epoch) => epochs.push(epoch),
                    None => warn!(name = name.as_str(), "not a blind rsa key name"),
                }
            }
            let stale = prune_candidates(&epochs, keep);
            for name in names
                .iter()
                .filter(|name| parse_epoch(name).map_or(false, |e| stale.contains(&e)))
            {
                println!("{}", name);
            }
        }
    }
    Ok(())
}
