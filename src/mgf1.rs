use digest::DynDigest;

use crate::error::{Error, Result};

/// MGF1 XOR operation used in PSS padding
///
/// XORs `dst` with `MGF1(seed, dst.len())`, hashing `seed || counter` with a
/// 4-byte big-endian counter starting at zero. `hash` must be in its initial
/// state; it is cloned for every round and left untouched.
pub fn mgf1_xor(dst: &mut [u8], hash: &dyn DynDigest, seed: &[u8]) -> Result<()> {
    let h_len = hash.output_size();
    let rounds = (dst.len() + h_len - 1) / h_len;
    if rounds as u64 > 1u64 << 32 {
        return Err(Error::MaskTooLong);
    }
    for (counter, chunk) in dst.chunks_mut(h_len).enumerate() {
        let mut h = hash.box_clone();
        h.update(seed);
        h.update(&(counter as u32).to_be_bytes());
        let digest = h.finalize_reset();
        for (d, s) in chunk.iter_mut().zip(&*digest) {
            *d ^= s;
        }
    }
    Ok(())
}
