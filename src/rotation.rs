//! Epoch-indexed RSA key pairs: the newest is "current", the one before it
//! "previous". Signing always uses the current pair; verification falls back
//! to the previous pair so tokens blinded just before a rotation still redeem.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::brsa::{BlindSignature, KeyPair, PublicKey, Signature};
use crate::error::{Error, Result};
use crate::pss::Options;

pub const PRIVATE_KEY_PREFIX: &str = "BLIND_RSA_PRIVATE_KEY_";
pub const PUBLIC_KEY_PREFIX: &str = "BLIND_RSA_PUBLIC_KEY_";

/// Pairs that are never pruned, whatever the configured floor.
pub const MIN_LIVE_PAIRS: usize = 2;

pub fn private_key_name(epoch: u64) -> String {
    format!("{}{}", PRIVATE_KEY_PREFIX, epoch)
}

pub fn public_key_name(epoch: u64) -> String {
    format!("{}{}", PUBLIC_KEY_PREFIX, epoch)
}

/// Epoch suffix of a private or public key name.
pub fn parse_epoch(name: &str) -> Option<u64> {
    name.strip_prefix(PRIVATE_KEY_PREFIX)
        .or_else(|| name.strip_prefix(PUBLIC_KEY_PREFIX))
        .and_then(|suffix| suffix.parse().ok())
}

/// Epochs that may be deleted while keeping the newest `max(2, min_retained)`.
/// Returned oldest first, without duplicates.
pub fn prune_candidates(epochs: &[u64], min_retained: usize) -> Vec<u64> {
    let mut sorted = epochs.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let keep = min_retained.max(MIN_LIVE_PAIRS);
    let cut = sorted.len().saturating_sub(keep);
    sorted.truncate(cut);
    sorted
}

#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    pairs: BTreeMap<u64, KeyPair>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a map of `BLIND_RSA_{PRIVATE,PUBLIC}_KEY_<epoch>` JWK strings.
    pub fn from_named_jwks(named: &HashMap<String, String>) -> Result<Self> {
        let mut store = KeyStore::new();
        for (name, private_jwk) in named {
            let epoch = match name.strip_prefix(PRIVATE_KEY_PREFIX) {
                Some(suffix) => match suffix.parse::<u64>() {
                    Ok(epoch) => epoch,
                    Err(_) => {
                        warn!(name = name.as_str(), "ignoring key with non-numeric epoch");
                        continue;
                    }
                },
                None => continue,
            };
            let public_jwk = named.get(&public_key_name(epoch)).ok_or_else(|| {
                warn!(epoch, "private key without a public counterpart");
                Error::InvalidKey
            })?;
            store.insert(epoch, KeyPair::from_jwk(private_jwk, public_jwk)?)?;
        }
        if store.is_empty() {
            return Err(Error::NoKeys);
        }
        debug!(epochs = ?store.epochs(), "loaded key store");
        Ok(store)
    }

    /// Add a pair under an explicit epoch. Existing epochs are never replaced.
    pub fn insert(&mut self, epoch: u64, kp: KeyPair) -> Result<()> {
        if self.pairs.contains_key(&epoch) {
            return Err(Error::InvalidKey);
        }
        self.pairs.insert(epoch, kp);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Epochs, oldest first.
    pub fn epochs(&self) -> Vec<u64> {
        self.pairs.keys().copied().collect()
    }

    pub fn current(&self) -> Result<(u64, &KeyPair)> {
        self.pairs
            .iter()
            .next_back()
            .map(|(epoch, kp)| (*epoch, kp))
            .ok_or(Error::NoKeys)
    }

    pub fn previous(&self) -> Option<(u64, &KeyPair)> {
        self.pairs
            .iter()
            .rev()
            .nth(1)
            .map(|(epoch, kp)| (*epoch, kp))
    }

    /// Public key of the current pair, handed to requesters.
    pub fn public_key(&self) -> Result<&PublicKey> {
        Ok(&self.current()?.1.pk)
    }

    /// Sign a blinded message with the current pair.
    pub fn blind_sign<R: CryptoRng + RngCore + ?Sized>(
        &self,
        rng: &mut R,
        blind_msg: impl AsRef<[u8]>,
    ) -> Result<BlindSignature> {
        let (_, kp) = self.current()?;
        kp.sk.blind_sign(rng, blind_msg)
    }

    /// Verify against the current pair, then the previous one.
    /// Returns the epoch of the pair that accepted the signature.
    pub fn verify(&self, sig: &Signature, msg: impl AsRef<[u8]>, options: &Options) -> Result<u64> {
        let msg = msg.as_ref();
        let (epoch, kp) = self.current()?;
        if kp.pk.verify(sig, msg, options).is_ok() {
            return Ok(epoch);
        }
        if let Some((epoch, kp)) = self.previous() {
            if kp.pk.verify(sig, msg, options).is_ok() {
                debug!(epoch, "signature accepted by previous key");
                return Ok(epoch);
            }
        }
        Err(Error::InvalidSignature)
    }

    /// Make `kp` the current pair. Its epoch is the wall clock in seconds, or
    /// one past the current epoch if the clock is behind.
    pub fn rotate(&mut self, kp: KeyPair) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let epoch = match self.pairs.keys().next_back() {
            Some(latest) if *latest >= now => latest + 1,
            _ => now,
        };
        self.pairs.insert(epoch, kp);
        info!(epoch, "rotated key pair");
        epoch
    }

    /// Drop pairs older than the newest `max(2, min_retained)`.
    pub fn prune(&mut self, min_retained: usize) -> Vec<u64> {
        let removed = prune_candidates(&self.epochs(), min_retained);
        for epoch in &removed {
            self.pairs.remove(epoch);
        }
        if !removed.is_empty() {
            info!(removed = ?removed, "pruned key pairs");
        }
        removed
    }

    /// JWK strings for every pair, keyed the way `from_named_jwks` reads them.
    pub fn to_named_jwks(&self) -> Result<HashMap<String, String>> {
        let mut named = HashMap::with_capacity(self.pairs.len() * 2);
        for (epoch, kp) in &self.pairs {
            named.insert(private_key_name(*epoch), kp.sk.to_jwk().to_json()?);
            named.insert(public_key_name(*epoch), kp.pk.to_jwk().to_json()?);
        }
        Ok(named)
    }
}
