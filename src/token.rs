//! Expiring token issuance and per-request claim verification.
//!
//! A token is `expiryHex || rawTokenHex`, where `expiryHex` is the 11-char
//! hex of the expiry in epoch milliseconds. The service signs
//! `expiryHex || hex(SHA-256(rawToken))` with its HMAC key; that signature is
//! handed to the client once and thereafter acts as the client's MAC key for
//! per-request nonces. The server never stores it: it is recomputed from the
//! token on every claim.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac_sha256::HMAC;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use crate::codec::{from_hex, is_hex, to_hex};
use crate::error::{Error, Result};
use crate::kdf::ServiceKey;

/// Width of the expiry prefix, in hex characters.
pub const EXPIRY_HEX_LEN: usize = 11;
/// Largest expiry the prefix can carry (year 2527).
pub const MAX_EXPIRY_MS: u64 = 0xfff_ffff_ffff;
/// Token lifetime: 30 days.
pub const TOKEN_TTL_MS: u64 = 30 * 24 * 60 * 60 * 1000;
pub const HASHED_TOKEN_HEX_LEN: usize = 64;
pub const RAW_TOKEN_LEN: usize = 32;

/// Outcome of a claim check. Never a bool, so call sites fail closed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ClaimResult {
    Ok = 1,
    NotOk = 2,
}

impl ClaimResult {
    pub fn is_ok(self) -> bool {
        self == ClaimResult::Ok
    }
}

/// Expiry and signature returned to the client at issuance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Issued {
    pub expiry_hex: String,
    pub signature_hex: String,
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn expiry_hex(expiry_ms: u64) -> Result<String> {
    if expiry_ms > MAX_EXPIRY_MS {
        return Err(Error::ExpiryOutOfRange);
    }
    Ok(format!("{:0width$x}", expiry_ms, width = EXPIRY_HEX_LEN))
}

/// Reads the expiry prefix of a full or hashed token.
pub fn parse_expiry(token_hex: &str) -> Result<u64> {
    let prefix = token_hex
        .get(..EXPIRY_HEX_LEN)
        .ok_or(Error::InvalidToken)?;
    if !is_hex(prefix) {
        return Err(Error::InvalidToken);
    }
    u64::from_str_radix(prefix, 16).map_err(|_| Error::InvalidToken)
}

pub fn is_expired(token_hex: &str, now_ms: u64) -> bool {
    parse_expiry(token_hex).map_or(true, |expiry| expiry < now_ms)
}

/// Hex SHA-256 of a raw token.
pub fn hash_token(raw_token: &[u8]) -> String {
    to_hex(Sha256::digest(raw_token))
}

/// Draws a fresh raw token.
pub fn random_raw_token<R: rand::CryptoRng + rand::RngCore + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut raw = vec![0u8; RAW_TOKEN_LEN];
    rng.fill_bytes(&mut raw);
    raw
}

/// Issue a 30-day token signature for a hashed token.
pub fn issue(key: &ServiceKey, hashed_token_hex: &str) -> Result<Issued> {
    issue_at(key, hashed_token_hex, now_ms())
}

pub fn issue_at(key: &ServiceKey, hashed_token_hex: &str, now_ms: u64) -> Result<Issued> {
    if hashed_token_hex.len() != HASHED_TOKEN_HEX_LEN || !is_hex(hashed_token_hex) {
        return Err(Error::InvalidToken);
    }
    let expiry_hex = expiry_hex(now_ms.saturating_add(TOKEN_TTL_MS))?;
    let signed = format!("{}{}", expiry_hex, hashed_token_hex);
    let signature = key.sign(from_hex(&signed)?);
    Ok(Issued {
        expiry_hex,
        signature_hex: to_hex(signature),
    })
}

/// Recomputes the issuance signature from a full token.
fn derive_signature(key: &ServiceKey, full_token_hex: &str) -> Result<Zeroizing<[u8; 32]>> {
    if !full_token_hex.is_ascii() || full_token_hex.len() <= EXPIRY_HEX_LEN {
        return Err(Error::InvalidToken);
    }
    let (expiry_hex, raw_token_hex) = full_token_hex.split_at(EXPIRY_HEX_LEN);
    let raw_token = Zeroizing::new(from_hex(raw_token_hex)?);
    let hashed = format!("{}{}", expiry_hex, hash_token(&raw_token));
    Ok(Zeroizing::new(key.sign(from_hex(&hashed)?)))
}

fn mac_with(signature: &[u8], nonce_hex: &str) -> Result<[u8; 32]> {
    Ok(HMAC::mac(from_hex(nonce_hex)?, signature))
}

/// Computes the request MAC for `nonce_hex` under a held signature.
pub fn message(signature_hex: &str, nonce_hex: &str) -> Result<String> {
    let signature = Zeroizing::new(from_hex(signature_hex)?);
    if signature.is_empty() {
        return Err(Error::InvalidSignature);
    }
    Ok(to_hex(mac_with(&signature, nonce_hex)?))
}

fn check_claim(
    key: &ServiceKey,
    full_token_hex: &str,
    nonce_hex: &str,
    mac_hex: &str,
    now_ms: u64,
) -> Result<()> {
    if parse_expiry(full_token_hex)? < now_ms {
        return Err(Error::Expired);
    }
    let signature = derive_signature(key, full_token_hex)?;
    let expected = mac_with(&signature[..], nonce_hex)?;
    let mac = from_hex(mac_hex)?;
    if bool::from(expected[..].ct_eq(&mac)) {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

/// Checks a (token, nonce, mac) claim. Every failure is `NotOk`.
pub fn verify_claim(
    key: &ServiceKey,
    full_token_hex: &str,
    nonce_hex: &str,
    mac_hex: &str,
) -> ClaimResult {
    verify_claim_at(key, full_token_hex, nonce_hex, mac_hex, now_ms())
}

pub fn verify_claim_at(
    key: &ServiceKey,
    full_token_hex: &str,
    nonce_hex: &str,
    mac_hex: &str,
    now_ms: u64,
) -> ClaimResult {
    match check_claim(key, full_token_hex, nonce_hex, mac_hex, now_ms) {
        Ok(()) => ClaimResult::Ok,
        Err(e) => {
            debug!("verify_claim: {}", e);
            ClaimResult::NotOk
        }
    }
}

/// Service-to-service pre-shared key check.
pub fn verify_svc_psk(expected: Option<&str>, supplied: &str) -> ClaimResult {
    match expected {
        Some(psk) if !psk.is_empty() && bool::from(psk.as_bytes().ct_eq(supplied.as_bytes())) => {
            ClaimResult::Ok
        }
        _ => ClaimResult::NotOk,
    }
}
