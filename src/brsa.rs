//! RSA blind signatures over RSASSA-PSS (RFC 9474).
//!
//! ```rust
//! use pip_tokens::brsa::KeyPair;
//! use pip_tokens::Options;
//!
//! let options = Options::default();
//! let mut rng = rand::thread_rng();
//!
//! // [SERVER]: Generate a RSA key pair
//! let kp = KeyPair::generate(&mut rng, 1024)?;
//! let (pk, sk) = (kp.pk, kp.sk);
//!
//! // [CLIENT]: blind a message for the server whose public key is `pk`.
//! // The client must keep the message and the secret.
//! let msg = b"test";
//! let blinding_result = pk.blind(&mut rng, msg, &options)?;
//!
//! // [SERVER]: sign the blinded message. The secret is never sent.
//! let blind_sig = sk.blind_sign(&mut rng, &blinding_result.blind_msg)?;
//!
//! // [CLIENT]: unblind into a regular RSA-PSS signature. The server cannot
//! // link it to the (blinded message, blind signature) pair it saw.
//! let sig = pk.finalize(&blind_sig, &blinding_result.secret, msg, &options)?;
//!
//! // [ANYONE]: verify with the public key.
//! sig.verify(&pk, msg, &options)?;
//! # Ok::<(), pip_tokens::Error>(())
//! ```

use std::fmt;

use derive_more::*;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::bigint::{self, i2osp, mod_inverse, mod_mul, mod_pow, os2ip, MAX_SAMPLING_ATTEMPTS};
use crate::error::{Error, Result};
use crate::pss::{emsa_pss_encode, emsa_pss_verify, Options};

/// An RSA public key
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicKey {
    n: BigUint,
    e: BigUint,
}

/// An RSA secret key
#[derive(Clone, Eq, PartialEq)]
pub struct SecretKey {
    n: BigUint,
    e: BigUint,
    d: BigUint,
    primes: Vec<BigUint>,
}

/// An RSA key pair
#[derive(Clone, Debug, From, Into, new)]
pub struct KeyPair {
    pub pk: PublicKey,
    pub sk: SecretKey,
}

/// The blinding inverse `r^-1 mod n`, kept by the client until finalization
#[derive(Clone, Debug, Deref, From, Zeroize, ZeroizeOnDrop)]
pub struct Secret(pub Vec<u8>);

/// A blinded message
#[derive(Clone, Debug, Eq, PartialEq, Deref, From, Into, new)]
pub struct BlindedMessage(pub Vec<u8>);

/// A blind signature
#[derive(Clone, Debug, Eq, PartialEq, Deref, From, Into, new)]
pub struct BlindSignature(pub Vec<u8>);

/// A (non-blind) signature
#[derive(Clone, Debug, Eq, PartialEq, Deref, From, Into, new)]
pub struct Signature(pub Vec<u8>);

/// Result of a blinding operation
#[derive(Clone, Debug)]
pub struct BlindingResult {
    pub blind_msg: BlindedMessage,
    pub secret: Secret,
}

impl AsRef<[u8]> for Secret {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl AsRef<[u8]> for BlindedMessage {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl AsRef<[u8]> for BlindSignature {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("n", &self.n)
            .field("e", &self.e)
            .finish_non_exhaustive()
    }
}

fn check_rsa_parameters(n: &BigUint, e: &BigUint) -> Result<()> {
    let modulus_bits = n.bits();
    if !(1024..=4096).contains(&modulus_bits) {
        return Err(Error::UnsupportedParameters);
    }
    let e3 = BigUint::from(3u32);
    let ef4 = BigUint::from(65537u32);
    if ![e3, ef4].contains(e) {
        return Err(Error::UnsupportedParameters);
    }
    Ok(())
}

/// RSAVP1: `s^e mod n`
fn rsavp1(pk: &PublicKey, s: &BigUint) -> Result<BigUint> {
    if s >= &pk.n {
        return Err(Error::InvalidMessageLength);
    }
    Ok(mod_pow(s, &pk.e, &pk.n))
}

/// RSASP1: `m^d mod n`
///
/// The exponentiation runs on a randomized base `m * b^e`, and the result
/// is checked against `m` before it is released.
fn rsasp1<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    sk: &SecretKey,
    m: &BigUint,
) -> Result<BigUint> {
    let n = &sk.n;
    if m >= n {
        return Err(Error::InvalidMessageLength);
    }
    let (b, b_inv) = invertible_factor(rng, n)?;
    let blinded = mod_mul(m, &mod_pow(&b, &sk.e, n), n);
    let s = mod_mul(&mod_pow(&blinded, &sk.d, n), &b_inv, n);
    if &mod_pow(&s, &sk.e, n) != m {
        return Err(Error::InvalidKey);
    }
    Ok(s)
}

/// Draws `r` uniformly from `[1, n)` until `r^-1 mod n` exists.
fn invertible_factor<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    n: &BigUint,
) -> Result<(BigUint, BigUint)> {
    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        let r = bigint::random_below(rng, n)?;
        if let Ok(r_inv) = mod_inverse(&r, n) {
            return Ok((r, r_inv));
        }
    }
    Err(Error::InvalidBlind)
}

impl PublicKey {
    pub fn new(n: BigUint, e: BigUint) -> Result<Self> {
        check_rsa_parameters(&n, &e)?;
        Ok(PublicKey { n, e })
    }

    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Modulus bit length
    pub fn bits(&self) -> usize {
        self.n.bits()
    }

    /// Modulus byte length (`kLen`)
    pub fn size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// Blind a message to be signed
    pub fn blind<R: CryptoRng + RngCore + ?Sized>(
        &self,
        rng: &mut R,
        msg: impl AsRef<[u8]>,
        options: &Options,
    ) -> Result<BlindingResult> {
        let k_len = self.size();
        let encoded = emsa_pss_encode(rng, msg.as_ref(), self.bits() - 1, options)?;
        let m = os2ip(&encoded);

        let (r, r_inv) = invertible_factor(rng, &self.n)?;
        let x = rsavp1(self, &r)?;
        let z = mod_mul(&m, &x, &self.n);

        Ok(BlindingResult {
            blind_msg: BlindedMessage(i2osp(&z, k_len)?),
            secret: Secret(i2osp(&r_inv, k_len)?),
        })
    }

    /// Compute a valid signature for the original message given a blindly signed message
    pub fn finalize(
        &self,
        blind_sig: &BlindSignature,
        secret: &Secret,
        msg: impl AsRef<[u8]>,
        options: &Options,
    ) -> Result<Signature> {
        let k_len = self.size();
        if blind_sig.len() != k_len || secret.len() != k_len {
            return Err(Error::UnexpectedInputSize);
        }
        let z = os2ip(blind_sig);
        let r_inv = os2ip(secret);
        let s = mod_mul(&z, &r_inv, &self.n);
        let sig = Signature(i2osp(&s, k_len)?);
        self.verify(&sig, msg, options).map_err(|e| {
            debug!("finalize: self-check failed: {}", e);
            Error::InvalidSignature
        })?;
        Ok(sig)
    }

    /// Verify a (non-blind) RSASSA-PSS signature
    pub fn verify(&self, sig: &Signature, msg: impl AsRef<[u8]>, options: &Options) -> Result<()> {
        let k_len = self.size();
        if sig.len() != k_len {
            return Err(Error::InvalidSignature);
        }
        let em_bits = self.bits() - 1;
        let m = rsavp1(self, &os2ip(sig)).map_err(|_| Error::InvalidSignature)?;
        let em = i2osp(&m, (em_bits + 7) / 8).map_err(|_| Error::InvalidSignature)?;
        emsa_pss_verify(msg.as_ref(), &em, em_bits, options)
    }
}

impl SecretKey {
    pub fn new(n: BigUint, e: BigUint, d: BigUint, primes: Vec<BigUint>) -> Result<Self> {
        check_rsa_parameters(&n, &e)?;
        if d.is_one() || d >= n {
            return Err(Error::InvalidKey);
        }
        if !primes.is_empty() && primes.iter().fold(BigUint::one(), |acc, p| acc * p) != n {
            return Err(Error::InvalidKey);
        }
        Ok(SecretKey { n, e, d, primes })
    }

    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn e(&self) -> &BigUint {
        &self.e
    }

    pub fn d(&self) -> &BigUint {
        &self.d
    }

    pub fn primes(&self) -> &[BigUint] {
        &self.primes
    }

    /// Modulus byte length (`kLen`)
    pub fn size(&self) -> usize {
        (self.n.bits() + 7) / 8
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            n: self.n.clone(),
            e: self.e.clone(),
        }
    }

    /// Sign a blinded message
    pub fn blind_sign<R: CryptoRng + RngCore + ?Sized>(
        &self,
        rng: &mut R,
        blind_msg: impl AsRef<[u8]>,
    ) -> Result<BlindSignature> {
        let k_len = self.size();
        let blind_msg = blind_msg.as_ref();
        if blind_msg.len() != k_len {
            return Err(Error::UnexpectedInputSize);
        }
        let m = os2ip(blind_msg);
        let s = rsasp1(rng, self, &m)?;
        Ok(BlindSignature(i2osp(&s, k_len)?))
    }
}

impl KeyPair {
    /// Generate a new key pair
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R, modulus_bits: usize) -> Result<KeyPair> {
        let inner =
            RsaPrivateKey::new(rng, modulus_bits).map_err(|_| Error::UnsupportedParameters)?;
        let sk = SecretKey::new(
            inner.n().clone(),
            inner.e().clone(),
            inner.d().clone(),
            inner.primes().to_vec(),
        )?;
        let pk = sk.public_key();
        Ok(KeyPair { pk, sk })
    }
}

impl Signature {
    /// Verify that the (non-blind) signature is valid for the given public key and original message
    pub fn verify(&self, pk: &PublicKey, msg: impl AsRef<[u8]>, options: &Options) -> Result<()> {
        pk.verify(self, msg, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pss::Hash;

    // 1024-bit keys keep debug-mode key generation fast.
    fn key() -> KeyPair {
        KeyPair::generate(&mut rand::thread_rng(), 1024).unwrap()
    }

    #[test]
    fn rejects_bad_exponent() {
        let kp = key();
        assert_eq!(
            PublicKey::new(kp.pk.n().clone(), BigUint::from(17u32)),
            Err(Error::UnsupportedParameters)
        );
    }

    #[test]
    fn blind_sign_input_checks() {
        let kp = key();
        let mut rng = rand::thread_rng();
        let k_len = kp.sk.size();
        assert_eq!(
            kp.sk.blind_sign(&mut rng, vec![1u8; k_len - 1]),
            Err(Error::UnexpectedInputSize)
        );
        assert_eq!(
            kp.sk.blind_sign(&mut rng, vec![0xffu8; k_len]),
            Err(Error::InvalidMessageLength)
        );
    }

    #[test]
    fn finalize_input_checks() {
        let kp = key();
        let options = Options::new(Hash::Sha256, 32);
        let mut rng = rand::thread_rng();
        let br = kp.pk.blind(&mut rng, b"msg", &options).unwrap();
        let bs = kp.sk.blind_sign(&mut rng, &br.blind_msg).unwrap();
        let short = BlindSignature(bs[1..].to_vec());
        assert_eq!(
            kp.pk.finalize(&short, &br.secret, b"msg", &options),
            Err(Error::UnexpectedInputSize)
        );
        assert_eq!(
            kp.pk.finalize(&bs, &br.secret, b"other", &options),
            Err(Error::InvalidSignature)
        );
        kp.pk.finalize(&bs, &br.secret, b"msg", &options).unwrap();
    }
}
