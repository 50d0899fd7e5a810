//! HKDF-SHA256 derivation of per-context HMAC keys from a master seed.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use hmac_sha256::{HKDF, HMAC};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::codec;
use crate::error::{Error, Result};

/// Bytes of the seed used as input key material.
pub const SEED_IKM_LEN: usize = 32;

/// A 256-bit HMAC-SHA256 key; wiped on drop and never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ServiceKey([u8; 32]);

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceKey(..)")
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for ServiceKey {}

impl ServiceKey {
    pub fn sign(&self, msg: impl AsRef<[u8]>) -> [u8; 32] {
        HMAC::mac(msg, self.0)
    }

    pub fn verify(&self, msg: impl AsRef<[u8]>, mac: &[u8]) -> bool {
        self.sign(msg)[..].ct_eq(mac).into()
    }
}

/// Derive the HMAC key for `context` from the hex-encoded master seed.
///
/// `info = SHA-512(context)`, salt is all zeros.
pub fn derive_service_key(seed_hex: &str, context: &str) -> Result<ServiceKey> {
    if seed_hex.is_empty() || context.is_empty() {
        return Err(Error::EmptySecretOrContext);
    }
    let seed = Zeroizing::new(codec::from_hex(seed_hex)?);
    let ikm = &seed[..seed.len().min(SEED_IKM_LEN)];
    let info = Sha512::digest(context.as_bytes());

    let prk = Zeroizing::new(HKDF::extract([0u8; 32], ikm));
    let mut okm = [0u8; 32];
    HKDF::expand(&mut okm, &*prk, info);
    Ok(ServiceKey(okm))
}

/// Master seed plus the per-context key cache.
///
/// Derivation is deterministic, so concurrent misses may derive the same key
/// twice; the last insert wins and all of them are equal.
pub struct ServiceKeys {
    seed_hex: Zeroizing<String>,
    cache: RwLock<HashMap<String, ServiceKey>>,
}

impl fmt::Debug for ServiceKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKeys").finish_non_exhaustive()
    }
}

impl ServiceKeys {
    pub fn new(seed_hex: impl Into<String>) -> Result<Self> {
        let seed_hex = Zeroizing::new(seed_hex.into());
        if seed_hex.is_empty() {
            return Err(Error::EmptySecretOrContext);
        }
        if !codec::is_hex(&seed_hex) {
            return Err(Error::InvalidEncoding);
        }
        Ok(ServiceKeys {
            seed_hex,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn get(&self, context: &str) -> Result<ServiceKey> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(key) = cache.get(context) {
                return Ok(key.clone());
            }
        }
        let key = derive_service_key(&self.seed_hex, context)?;
        debug!(context, "derived service key");
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(context.to_string(), key.clone());
        Ok(key)
    }

    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
