//! Unlinkable access tokens.
//!
//! A requester obtains an RSA blind signature ([RFC 9474](https://www.rfc-editor.org/rfc/rfc9474))
//! over the hash of a random identifier, exchanges the unblinded signature
//! for an expiring HMAC token bound to that identifier, and then proves
//! possession of that token on every request by MACing a per-request nonce.
//! The signer cannot link the token back to the signing transaction, and the
//! verifier keeps no per-client state.
//!
//! ```rust
//! use pip_tokens::{client::TokenRequest, kdf, token, ClaimResult, KeyPair, Options};
//!
//! let mut rng = rand::thread_rng();
//! let options = Options::default();
//! let kp = KeyPair::generate(&mut rng, 1024)?;
//!
//! // [CLIENT]: blind a hashed random token and keep the request.
//! let req = TokenRequest::new(&mut rng, &kp.pk, &options)?;
//!
//! // [SIGNER]: sign the blinded message.
//! let blind_sig = kp.sk.blind_sign(&mut rng, pip_tokens::codec::from_hex(&req.blind_msg_hex())?)?;
//!
//! // [CLIENT]: unblind.
//! let grant = req.finalize(&pip_tokens::codec::to_hex(&blind_sig))?;
//!
//! // [ISSUER]: check the RSA signature over the hashed token, then issue.
//! kp.pk.verify(grant.signature(), grant.message(), &options)?;
//! let key = kdf::derive_service_key(&"01".repeat(32), "per-client-pip-key")?;
//! let issued = token::issue(&key, &grant.hashed_token_hex())?;
//!
//! // [CLIENT]: MAC a nonce per request.
//! let cred = grant.into_credential(&issued.expiry_hex, &issued.signature_hex)?;
//! let (tok, mac) = cred.claim("7265712d31")?;
//!
//! // [VERIFIER]: stateless check.
//! assert_eq!(token::verify_claim(&key, &tok, "7265712d31", &mac), ClaimResult::Ok);
//! # Ok::<(), pip_tokens::Error>(())
//! ```

#[macro_use]
extern crate derive_new;

mod bigint;
mod mgf1;

pub mod brsa;
pub mod claims;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod jwk;
pub mod kdf;
pub mod pss;
pub mod rotation;
pub mod token;

pub mod reexports {
    pub use {digest, hmac_sha256, rand, rsa};
}

pub use brsa::{
    BlindSignature, BlindedMessage, BlindingResult, KeyPair, PublicKey, Secret, SecretKey,
    Signature,
};
pub use config::Settings;
pub use error::{Error, Result};
pub use gateway::{Gateway, Request, Response};
pub use jwk::Jwk;
pub use kdf::{derive_service_key, ServiceKey, ServiceKeys};
pub use pss::{Hash, Options};
pub use rotation::KeyStore;
pub use token::{verify_claim, verify_svc_psk, ClaimResult};
