//! EMSA-PSS encoding and verification (RFC 8017, section 9.1).

use derive_more::*;
use digest::DynDigest;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::mgf1::mgf1_xor;

/// Hash function for padding and message hashing
#[derive(Clone, Copy, Debug, Eq, PartialEq, Display)]
pub enum Hash {
    #[display(fmt = "SHA-256")]
    Sha256,
    #[display(fmt = "SHA-384")]
    Sha384,
    #[display(fmt = "SHA-512")]
    Sha512,
}

impl Hash {
    pub fn output_size(self) -> usize {
        match self {
            Hash::Sha256 => 32,
            Hash::Sha384 => 48,
            Hash::Sha512 => 64,
        }
    }

    /// Largest input, in bytes, the hash function accepts.
    pub fn max_input_len(self) -> u64 {
        match self {
            Hash::Sha256 => (1 << 61) - 1,
            Hash::Sha384 | Hash::Sha512 => u64::MAX,
        }
    }

    pub(crate) fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            Hash::Sha256 => Box::new(Sha256::new()),
            Hash::Sha384 => Box::new(Sha384::new()),
            Hash::Sha512 => Box::new(Sha512::new()),
        }
    }

    pub fn digest(self, msg: &[u8]) -> Result<Vec<u8>> {
        if msg.len() as u64 > self.max_input_len() {
            return Err(Error::MessageTooLong);
        }
        Ok(match self {
            Hash::Sha256 => Sha256::digest(msg).to_vec(),
            Hash::Sha384 => Sha384::digest(msg).to_vec(),
            Hash::Sha512 => Sha512::digest(msg).to_vec(),
        })
    }
}

/// Options
#[derive(Clone, Debug, Eq, PartialEq, new)]
pub struct Options {
    /// Hash function to use for padding and for hashing the message
    pub hash: Hash,
    /// Salt length in bytes
    pub salt_len: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            hash: Hash::Sha384,
            salt_len: Hash::Sha384.output_size(),
        }
    }
}

/// EMSA-PSS-ENCODE with a freshly drawn salt of `options.salt_len` bytes.
pub fn emsa_pss_encode<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    msg: &[u8],
    em_bits: usize,
    options: &Options,
) -> Result<Vec<u8>> {
    let m_hash = options.hash.digest(msg)?;
    let h_len = options.hash.output_size();
    let em_len = (em_bits + 7) / 8;
    if em_len < h_len + options.salt_len + 2 {
        return Err(Error::EncodingError);
    }
    let mut salt = vec![0u8; options.salt_len];
    rng.fill_bytes(&mut salt);
    encode_with_salt(&m_hash, em_bits, &salt, options.hash)
}

pub(crate) fn encode_with_salt(
    m_hash: &[u8],
    em_bits: usize,
    salt: &[u8],
    hash: Hash,
) -> Result<Vec<u8>> {
    let h_len = hash.output_size();
    let s_len = salt.len();
    let em_len = (em_bits + 7) / 8;
    if m_hash.len() != h_len {
        return Err(Error::EncodingError);
    }
    if em_len < h_len + s_len + 2 {
        return Err(Error::EncodingError);
    }
    let mut hasher = hash.hasher();
    let mut em = vec![0; em_len];
    let (db, h) = em.split_at_mut(em_len - h_len - 1);
    let h = &mut h[..h_len];

    // M' = 0x00 x 8 || mHash || salt
    hasher.update(&[0u8; 8]);
    hasher.update(m_hash);
    hasher.update(salt);
    h.copy_from_slice(&hasher.finalize_reset());

    // DB = PS || 0x01 || salt
    db[em_len - s_len - h_len - 2] = 0x01;
    db[em_len - s_len - h_len - 1..].copy_from_slice(salt);
    mgf1_xor(db, &*hasher, h)?;
    db[0] &= 0xff >> (8 * em_len - em_bits);
    em[em_len - 1] = 0xbc;
    Ok(em)
}

/// EMSA-PSS-VERIFY for an exact salt length.
///
/// `em` must be `ceil(em_bits/8)` bytes.
pub fn emsa_pss_verify(msg: &[u8], em: &[u8], em_bits: usize, options: &Options) -> Result<()> {
    let hash = options.hash;
    let m_hash = hash.digest(msg)?;
    let h_len = hash.output_size();
    let s_len = options.salt_len;
    let em_len = (em_bits + 7) / 8;
    if em.len() != em_len || em_len < h_len + s_len + 2 {
        return Err(Error::InvalidSignature);
    }
    if em[em_len - 1] != 0xbc {
        return Err(Error::InvalidSignature);
    }
    let (masked_db, rest) = em.split_at(em_len - h_len - 1);
    let h = &rest[..h_len];
    let top_mask = !(0xffu8 >> (8 * em_len - em_bits));
    if masked_db[0] & top_mask != 0 {
        return Err(Error::InvalidSignature);
    }

    let hasher = hash.hasher();
    let mut db = masked_db.to_vec();
    mgf1_xor(&mut db, &*hasher, h)?;
    db[0] &= !top_mask;

    let ps_len = em_len - h_len - s_len - 2;
    if db[..ps_len].iter().any(|&b| b != 0) || db[ps_len] != 0x01 {
        return Err(Error::InvalidSignature);
    }
    let salt = &db[db.len() - s_len..];

    let mut hasher = hasher;
    hasher.update(&[0u8; 8]);
    hasher.update(&m_hash);
    hasher.update(salt);
    let expected = hasher.finalize_reset();
    if bool::from(expected[..].ct_eq(h)) {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_layout() {
        let options = Options::default();
        let em = emsa_pss_encode(&mut rand::thread_rng(), b"test", 2047, &options).unwrap();
        assert_eq!(em.len(), 256);
        assert_eq!(em[255], 0xbc);
        assert_eq!(em[0] & 0x80, 0);
        emsa_pss_verify(b"test", &em, 2047, &options).unwrap();
        assert_eq!(
            emsa_pss_verify(b"tesT", &em, 2047, &options),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn randomized_by_salt() {
        let options = Options::new(Hash::Sha256, 32);
        let mut rng = rand::thread_rng();
        let a = emsa_pss_encode(&mut rng, b"m", 1023, &options).unwrap();
        let b = emsa_pss_encode(&mut rng, b"m", 1023, &options).unwrap();
        assert_ne!(a, b);

        let zero_salt = Options::new(Hash::Sha256, 0);
        let c = emsa_pss_encode(&mut rng, b"m", 1023, &zero_salt).unwrap();
        let d = emsa_pss_encode(&mut rng, b"m", 1023, &zero_salt).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn too_small_for_parameters() {
        let options = Options::new(Hash::Sha512, 64);
        assert_eq!(
            emsa_pss_encode(&mut rand::thread_rng(), b"m", 8 * 64 + 8 * 64 + 8, &options),
            Err(Error::EncodingError)
        );
        assert!(emsa_pss_encode(&mut rand::thread_rng(), b"m", 8 * 130, &options).is_ok());
    }

    #[test]
    fn salt_length_must_match() {
        let em = emsa_pss_encode(&mut rand::thread_rng(), b"m", 1023, &Options::new(Hash::Sha384, 16))
            .unwrap();
        emsa_pss_verify(b"m", &em, 1023, &Options::new(Hash::Sha384, 16)).unwrap();
        assert!(emsa_pss_verify(b"m", &em, 1023, &Options::new(Hash::Sha384, 48)).is_err());
    }
}
