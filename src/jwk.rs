//! JSON Web Key import and export for RSA-PSS key material.

use num_traits::One;
use rsa::BigUint;
use serde::{Deserialize, Serialize};

use crate::bigint::mod_inverse;
use crate::brsa::{KeyPair, PublicKey, SecretKey};
use crate::codec::{from_base64url, to_base64url};
use crate::error::{Error, Result};

/// Only the fields the engine consumes; everything else in the JWK is ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    pub n: String,
    pub e: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// CRT exponents and coefficient. Exported for WebCrypto, recomputed on import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<String>,
    #[serde(default)]
    pub ext: bool,
}

fn uint(field: &str) -> Result<BigUint> {
    let bytes = from_base64url(field)?;
    if bytes.is_empty() {
        return Err(Error::InvalidEncoding);
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

fn b64(x: &BigUint) -> String {
    to_base64url(x.to_bytes_be())
}

impl Jwk {
    pub fn parse(json: &str) -> Result<Self> {
        let jwk: Jwk = serde_json::from_str(json).map_err(|_| Error::InvalidEncoding)?;
        if jwk.kty != "RSA" {
            return Err(Error::KeyTypeMismatch);
        }
        if let Some(alg) = &jwk.alg {
            if !alg.starts_with("PS") {
                return Err(Error::KeyTypeMismatch);
            }
        }
        Ok(jwk)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| Error::InvalidEncoding)
    }
}

impl PublicKey {
    pub fn from_jwk(json: &str) -> Result<Self> {
        let jwk = Jwk::parse(json)?;
        PublicKey::new(uint(&jwk.n)?, uint(&jwk.e)?)
    }

    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            alg: Some("PS384".to_string()),
            n: b64(self.n()),
            e: b64(self.e()),
            key_ops: vec!["verify".to_string()],
            ext: true,
            ..Default::default()
        }
    }
}

impl SecretKey {
    pub fn from_jwk(json: &str) -> Result<Self> {
        let jwk = Jwk::parse(json)?;
        let d = jwk.d.as_deref().ok_or(Error::KeyTypeMismatch)?;
        let primes = match (&jwk.p, &jwk.q) {
            (Some(p), Some(q)) => vec![uint(p)?, uint(q)?],
            _ => vec![],
        };
        SecretKey::new(uint(&jwk.n)?, uint(&jwk.e)?, uint(d)?, primes)
    }

    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = Jwk {
            kty: "RSA".to_string(),
            alg: Some("PS384".to_string()),
            n: b64(self.n()),
            e: b64(self.e()),
            d: Some(b64(self.d())),
            key_ops: vec!["sign".to_string()],
            ext: true,
            ..Default::default()
        };
        if let [p, q] = self.primes() {
            let one = BigUint::one();
            jwk.p = Some(b64(p));
            jwk.q = Some(b64(q));
            jwk.dp = Some(b64(&(self.d() % &(p - &one))));
            jwk.dq = Some(b64(&(self.d() % &(q - &one))));
            jwk.qi = mod_inverse(q, p).ok().map(|qi| b64(&qi));
        }
        jwk
    }
}

impl KeyPair {
    /// Build a key pair from the private and public JWK strings.
    pub fn from_jwk(private_jwk: &str, public_jwk: &str) -> Result<Self> {
        let sk = SecretKey::from_jwk(private_jwk)?;
        let pk = PublicKey::from_jwk(public_jwk)?;
        if sk.public_key() != pk {
            return Err(Error::InvalidKey);
        }
        Ok(KeyPair { pk, sk })
    }
}
