//! Integer/octet-string conversions and modular arithmetic over `BigUint`.

use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use rsa::BigUint;

use crate::error::{Error, Result};

/// Upper bound on rejection-sampling rounds when drawing a blinding factor.
pub(crate) const MAX_SAMPLING_ATTEMPTS: usize = 256;

/// OS2IP: interpret a big-endian octet string as a non-negative integer.
pub fn os2ip(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// I2OSP: encode `x` as exactly `len` big-endian bytes.
///
/// Fails with [`Error::IntegerTooLarge`] if `x >= 256^len`.
pub fn i2osp(x: &BigUint, len: usize) -> Result<Vec<u8>> {
    if x.is_zero() {
        return Ok(vec![0u8; len]);
    }
    let v = x.to_bytes_be();
    if v.len() > len {
        return Err(Error::IntegerTooLarge);
    }
    let mut out = vec![0u8; len - v.len()];
    out.extend_from_slice(&v);
    Ok(out)
}

pub fn mod_pow(base: &BigUint, exp: &BigUint, n: &BigUint) -> BigUint {
    base.modpow(exp, n)
}

pub fn mod_mul(a: &BigUint, b: &BigUint, n: &BigUint) -> BigUint {
    (a * b) % n
}

/// Modular inverse through the extended Euclidean algorithm.
pub fn mod_inverse(a: &BigUint, n: &BigUint) -> Result<BigUint> {
    if n.is_zero() || n.is_one() {
        return Err(Error::NotInvertible);
    }

    let mut t = BigUint::zero();
    let mut new_t = BigUint::one();
    let mut r = n.clone();
    let mut new_r = a % n;

    // Bezout coefficients can go negative; track their signs separately.
    let mut t_neg = false;
    let mut new_t_neg = false;

    while !new_r.is_zero() {
        let (quotient, next_r) = r.div_rem(&new_r);

        let qt = &quotient * &new_t;
        let (next_t, next_t_neg) = if t_neg == new_t_neg {
            if t >= qt {
                (t - &qt, t_neg)
            } else {
                (&qt - &t, !t_neg)
            }
        } else {
            (t + &qt, t_neg)
        };
        t = new_t;
        t_neg = new_t_neg;
        new_t = next_t;
        new_t_neg = next_t_neg;

        r = new_r;
        new_r = next_r;
    }

    if !r.is_one() {
        return Err(Error::NotInvertible);
    }
    if t_neg && !t.is_zero() {
        Ok(n - &t)
    } else {
        Ok(t)
    }
}

/// Draw an integer uniformly from `[1, n)` by rejection sampling over
/// `ceil(bits(n)/8)`-byte strings with the excess high bits masked.
pub fn random_below<R: CryptoRng + RngCore + ?Sized>(rng: &mut R, n: &BigUint) -> Result<BigUint> {
    let bits = n.bits();
    if bits < 2 {
        return Err(Error::UnsupportedParameters);
    }
    let len = (bits + 7) / 8;
    let excess = len * 8 - bits;
    let mut buf = vec![0u8; len];
    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        rng.fill_bytes(&mut buf);
        buf[0] &= 0xff >> excess;
        let r = os2ip(&buf);
        if !r.is_zero() && &r < n {
            return Ok(r);
        }
    }
    Err(Error::InvalidBlind)
}
