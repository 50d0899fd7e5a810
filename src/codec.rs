//! Hex and base64url helpers for the token wire formats.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::{Error, Result};

pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Decodes a hex string into bytes.
///
/// Odd-length input is accepted: pairs are decoded from the left and a
/// trailing lone nibble becomes a byte of its own. Expiry-prefixed tokens
/// are 75 hex characters and are signed over this byte view.
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    if !s.is_ascii() {
        return Err(Error::InvalidEncoding);
    }
    let (pairs, tail) = s.split_at(s.len() - s.len() % 2);
    let mut out = hex::decode(pairs).map_err(|_| Error::InvalidEncoding)?;
    if let Some(c) = tail.chars().next() {
        let nibble = c.to_digit(16).ok_or(Error::InvalidEncoding)?;
        out.push(nibble as u8);
    }
    Ok(out)
}

pub fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn from_base64url(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|_| Error::InvalidEncoding)
}

pub fn to_base64url(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
