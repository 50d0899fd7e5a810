//! Requester side of the token flow.
//!
//! `TokenRequest` (blind) -> signer -> `TokenGrant` (unblinded signature) ->
//! issuer -> `Credential` (full token plus MAC key) -> per-request claims.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::brsa::{BlindSignature, BlindingResult, PublicKey, Signature};
use crate::codec::{from_hex, is_hex, to_hex};
use crate::error::{Error, Result};
use crate::gateway::{Gateway, CLAIM_DELIM};
use crate::pss::Options;
use crate::token::{self, hash_token, random_raw_token, EXPIRY_HEX_LEN};

/// A blinded hashed token awaiting the signer, plus the raw token behind it.
pub struct TokenRequest {
    pk: PublicKey,
    options: Options,
    msg: Vec<u8>,
    raw_token: Zeroizing<Vec<u8>>,
    blinding: BlindingResult,
}

impl TokenRequest {
    /// Draws a raw token and blinds its SHA-256 hash, the value the issuer
    /// later requires the signature to cover.
    pub fn new<R: CryptoRng + RngCore + ?Sized>(
        rng: &mut R,
        pk: &PublicKey,
        options: &Options,
    ) -> Result<Self> {
        let raw_token = Zeroizing::new(random_raw_token(rng));
        let msg = from_hex(&hash_token(&raw_token))?;
        let blinding = pk.blind(rng, &msg, options)?;
        Ok(TokenRequest {
            pk: pk.clone(),
            options: options.clone(),
            msg,
            raw_token,
            blinding,
        })
    }

    /// Body of the sign request.
    pub fn blind_msg_hex(&self) -> String {
        to_hex(&self.blinding.blind_msg)
    }

    pub fn hashed_token_hex(&self) -> String {
        hash_token(&self.raw_token)
    }

    /// Unblind the signer's answer. Fails if it does not verify under `pk`.
    pub fn finalize(self, blind_sig_hex: &str) -> Result<TokenGrant> {
        let blind_sig = BlindSignature(from_hex(blind_sig_hex.trim())?);
        let signature =
            self.pk
                .finalize(&blind_sig, &self.blinding.secret, &self.msg, &self.options)?;
        Ok(TokenGrant {
            msg: self.msg,
            signature,
            raw_token: self.raw_token,
        })
    }
}

/// An unblinded signature, exchangeable once for an expiring token.
pub struct TokenGrant {
    msg: Vec<u8>,
    signature: Signature,
    raw_token: Zeroizing<Vec<u8>>,
}

impl TokenGrant {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn hashed_token_hex(&self) -> String {
        hash_token(&self.raw_token)
    }

    /// The signed message: the hashed token's bytes.
    pub fn message(&self) -> &[u8] {
        &self.msg
    }

    /// `msgHex:sigHex:hashedTokenHex`
    pub fn issue_body(&self) -> String {
        format!(
            "{}{d}{}{d}{}",
            to_hex(&self.msg),
            to_hex(&self.signature),
            hash_token(&self.raw_token),
            d = CLAIM_DELIM
        )
    }

    pub fn into_credential(self, expiry_hex: &str, signature_hex: &str) -> Result<Credential> {
        if expiry_hex.len() != EXPIRY_HEX_LEN || !is_hex(expiry_hex) {
            return Err(Error::InvalidToken);
        }
        if signature_hex.len() != 64 || !is_hex(signature_hex) {
            return Err(Error::InvalidToken);
        }
        Ok(Credential {
            full_token_hex: format!("{}{}", expiry_hex, to_hex(self.raw_token.as_slice())),
            signature_hex: Zeroizing::new(signature_hex.to_string()),
        })
    }

    /// Accept the issuer's `expiry:signature` body.
    pub fn accept(self, issued_body: &str) -> Result<Credential> {
        let (expiry_hex, signature_hex) = issued_body
            .trim()
            .split_once(CLAIM_DELIM)
            .ok_or(Error::InvalidToken)?;
        self.into_credential(expiry_hex, signature_hex)
    }
}

/// Full token and the signature that keys its request MACs.
pub struct Credential {
    full_token_hex: String,
    signature_hex: Zeroizing<String>,
}

impl Credential {
    pub fn full_token_hex(&self) -> &str {
        &self.full_token_hex
    }

    pub fn expiry_ms(&self) -> Result<u64> {
        token::parse_expiry(&self.full_token_hex)
    }

    /// `(full token hex, mac hex)` for one request nonce.
    pub fn claim(&self, nonce_hex: &str) -> Result<(String, String)> {
        let mac = token::message(&self.signature_hex, nonce_hex)?;
        Ok((self.full_token_hex.clone(), mac))
    }

    /// `(full token hex, nonce hex, mac hex)` for a request path.
    pub fn claim_for_path(&self, path: &str) -> Result<(String, String, String)> {
        let nonce = Gateway::nonce_for_path(path);
        let (tok, mac) = self.claim(&nonce)?;
        Ok((tok, nonce, mac))
    }
}
