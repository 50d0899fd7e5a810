//! Request router for the signing service and the claim check in front of
//! proxied connections.

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::brsa::{PublicKey, Signature};
use crate::claims::ClaimCache;
use crate::codec::{from_hex, is_hex, to_hex};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::kdf::ServiceKeys;
use crate::pss::Options;
use crate::rotation::KeyStore;
use crate::token::{self, verify_svc_psk, ClaimResult, HASHED_TOKEN_HEX_LEN};

/// Separator of the issue body and of the issued `expiry:signature` pair.
pub const CLAIM_DELIM: char = ':';

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Blind-sign `blind_msg_hex` with the current key.
    Sign {
        psk: Option<String>,
        blind_msg_hex: String,
    },
    /// Exchange an unblinded `msgHex:sigHex:hashedTokenHex` for a token.
    /// The signed message must be the hashed token.
    Issue { psk: Option<String>, body: String },
    /// Admit a request carrying a claim.
    Allow {
        claim: Option<String>,
        nonce_hex: Option<String>,
        mac_hex: Option<String>,
        context: Option<String>,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    BlindSignature(String),
    Token {
        expiry_hex: String,
        signature_hex: String,
    },
    Claim(ClaimResult),
    Unauthorized,
    BadRequest,
    Internal,
}

impl Response {
    /// HTTP status the surrounding server answers with.
    pub fn status(&self) -> u16 {
        match self {
            Response::BlindSignature(_) | Response::Token { .. } => 200,
            Response::Claim(ClaimResult::Ok) => 200,
            Response::Claim(ClaimResult::NotOk) | Response::Unauthorized => 401,
            Response::BadRequest => 400,
            Response::Internal => 500,
        }
    }

    /// Plain-text body, if any.
    pub fn body(&self) -> Option<String> {
        match self {
            Response::BlindSignature(hex) => Some(hex.clone()),
            Response::Token {
                expiry_hex,
                signature_hex,
            } => Some(format!("{}{}{}", expiry_hex, CLAIM_DELIM, signature_hex)),
            _ => None,
        }
    }
}

pub struct Gateway {
    keys: KeyStore,
    service_keys: ServiceKeys,
    claims: ClaimCache,
    options: Options,
    auth_context: String,
    svc_psk: Option<String>,
    bypass: bool,
}

impl Gateway {
    pub fn new(settings: &Settings) -> Result<Self> {
        let keys = KeyStore::from_named_jwks(&settings.rsa.keys)?;
        Self::with_key_store(settings, keys)
    }

    pub fn with_key_store(settings: &Settings, keys: KeyStore) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::NoKeys);
        }
        let bypass = settings.bypass_active();
        if bypass {
            warn!("gateway: claim verification is bypassed");
        }
        Ok(Gateway {
            keys,
            service_keys: ServiceKeys::new(settings.seed_hex.as_str())?,
            claims: ClaimCache::new(settings.claims.capacity, settings.claims.mode),
            options: settings.options(),
            auth_context: settings.auth_context.clone(),
            svc_psk: settings.svc_psk.clone(),
            bypass,
        })
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }

    pub fn public_key(&self) -> Result<&PublicKey> {
        self.keys.public_key()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Nonce a client MACs for a request path: hex(SHA-256(path)).
    pub fn nonce_for_path(path: &str) -> String {
        to_hex(Sha256::digest(path.as_bytes()))
    }

    pub fn handle(&self, req: Request) -> Response {
        self.handle_at(req, token::now_ms())
    }

    pub fn handle_at(&self, req: Request, now_ms: u64) -> Response {
        match req {
            Request::Sign { psk, blind_msg_hex } => {
                if !self.superuser(psk.as_deref()) {
                    return Response::Unauthorized;
                }
                self.sign(&blind_msg_hex)
            }
            Request::Issue { psk, body } => {
                if !self.superuser(psk.as_deref()) {
                    return Response::Unauthorized;
                }
                self.issue(&body, now_ms)
            }
            Request::Allow {
                claim,
                nonce_hex,
                mac_hex,
                context,
            } => Response::Claim(self.allow(
                claim.as_deref(),
                nonce_hex.as_deref(),
                mac_hex.as_deref(),
                context.as_deref(),
                now_ms,
            )),
        }
    }

    fn superuser(&self, psk: Option<&str>) -> bool {
        match psk {
            Some(psk) => verify_svc_psk(self.svc_psk.as_deref(), psk).is_ok(),
            None => false,
        }
    }

    fn sign(&self, blind_msg_hex: &str) -> Response {
        if blind_msg_hex.is_empty() {
            return Response::BadRequest;
        }
        let Ok(blind_msg) = from_hex(blind_msg_hex) else {
            return Response::BadRequest;
        };
        match self.keys.blind_sign(&mut rand::thread_rng(), &blind_msg) {
            Ok(blind_sig) => Response::BlindSignature(to_hex(&blind_sig)),
            Err(Error::UnexpectedInputSize) | Err(Error::InvalidMessageLength) => {
                debug!("sign: malformed blinded message");
                Response::BadRequest
            }
            Err(e) => {
                warn!("sign: {}", e);
                Response::Internal
            }
        }
    }

    fn issue(&self, body: &str, now_ms: u64) -> Response {
        let parts: Vec<&str> = body.trim().split(CLAIM_DELIM).collect();
        let [msg_hex, sig_hex, hashed_hex, ..] = parts[..] else {
            return Response::BadRequest;
        };
        if msg_hex.is_empty() || sig_hex.is_empty() || hashed_hex.is_empty() {
            return Response::BadRequest;
        }
        if hashed_hex.len() != HASHED_TOKEN_HEX_LEN || !is_hex(hashed_hex) {
            return Response::BadRequest;
        }
        let (Ok(msg), Ok(sig), Ok(hashed)) =
            (from_hex(msg_hex), from_hex(sig_hex), from_hex(hashed_hex))
        else {
            return Response::BadRequest;
        };
        // one signature buys the token it was blinded over, nothing else
        if msg != hashed {
            debug!("issue: signed message is not the hashed token");
            return Response::Unauthorized;
        }
        if let Err(e) = self.keys.verify(&Signature(sig), &msg, &self.options) {
            debug!("issue: {}", e);
            return Response::Unauthorized;
        }
        let key = match self.service_keys.get(&self.auth_context) {
            Ok(key) => key,
            Err(e) => {
                warn!("issue: {}", e);
                return Response::Internal;
            }
        };
        match token::issue_at(&key, hashed_hex, now_ms) {
            Ok(issued) => Response::Token {
                expiry_hex: issued.expiry_hex,
                signature_hex: issued.signature_hex,
            },
            Err(Error::InvalidToken) => Response::BadRequest,
            Err(e) => {
                warn!("issue: {}", e);
                Response::Internal
            }
        }
    }

    fn allow(
        &self,
        claim: Option<&str>,
        nonce_hex: Option<&str>,
        mac_hex: Option<&str>,
        context: Option<&str>,
        now_ms: u64,
    ) -> ClaimResult {
        if self.bypass {
            warn!("auth: bypass");
            return ClaimResult::Ok;
        }
        let (Some(tok), Some(nonce), Some(mac)) = (claim, nonce_hex, mac_hex) else {
            debug!("auth: no claim or mac");
            return ClaimResult::NotOk;
        };
        if tok.is_empty() || nonce.is_empty() || mac.is_empty() {
            debug!("auth: empty claim, nonce or mac");
            return ClaimResult::NotOk;
        }
        let context = context
            .filter(|c| !c.is_empty())
            .unwrap_or(self.auth_context.as_str());
        if token::is_expired(tok, now_ms) {
            debug!("auth: expired claim");
            return ClaimResult::NotOk;
        }
        if let Some(cached) = self.claims.lookup(tok, nonce, mac, context, now_ms) {
            debug!(?cached, "auth: cached claim");
            return cached;
        }
        let key = match self.service_keys.get(context) {
            Ok(key) => key,
            Err(e) => {
                warn!("auth: no service key: {}", e);
                return ClaimResult::NotOk;
            }
        };
        let res = token::verify_claim_at(&key, tok, nonce, mac, now_ms);
        if res.is_ok() {
            self.claims.insert(tok, nonce, mac, context);
        }
        res
    }
}
