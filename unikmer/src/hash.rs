//! The invertible 64-bit integer hash used both to decorrelate k-mer codes
//! from their bit patterns (`HASHED` body mode) and to derive independent
//! Bloom filter positions from a single hash (double hashing).
//!
//! This is Thomas Wang's 64-bit mix function. It is a bijection on `u64`, so
//! `ihash64(hash64(x)) == x` for all `x` — this is what lets a `HASHED` file
//! be "unhashed" back to sortable codes without keeping a side table.

/// Mixes a 64-bit value using a finalizer shape similar to the classic
/// `fmix64`, generalized to a full invertible mix rather than a one-way
/// finalizer.
///
/// # Examples
///
/// ```
/// use unikmer::hash::{hash64, ihash64};
/// let x = 0x1234_5678_9abc_def0u64;
/// assert_eq!(ihash64(hash64(x)), x);
/// ```
#[inline]
pub fn hash64(mut key: u64) -> u64 {
    key = (!key).wrapping_add(key << 21);
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8);
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4);
    key ^= key >> 28;
    key = key.wrapping_add(key << 31);
    key
}

/// Modular inverse of 21 mod 2^64 — undoes the `key + (key<<2) + (key<<4)`
/// step, which is multiplication by 21 in disguise.
const INV_21: u64 = 14_933_078_535_860_113_213;
/// Modular inverse of 265 mod 2^64 — undoes `key + (key<<3) + (key<<8)`
/// (multiplication by 265).
const INV_265: u64 = 15_244_667_743_933_553_977;

/// The inverse of [`hash64`], run in reverse instruction order.
pub fn ihash64(mut key: u64) -> u64 {
    // invert: key = key + (key << 31)
    let mut tmp = key.wrapping_sub(key << 31);
    key = key.wrapping_sub(tmp << 31);

    // invert: key ^= key >> 28
    tmp = key ^ key >> 28;
    key ^= tmp >> 28;

    // invert: key = key * 21  (as key + (key<<2) + (key<<4))
    key = key.wrapping_mul(INV_21);

    // invert: key ^= key >> 14
    tmp = key ^ key >> 14;
    tmp = key ^ tmp >> 14;
    tmp = key ^ tmp >> 14;
    key ^= tmp >> 14;

    // invert: key = key * 265  (as key + (key<<3) + (key<<8))
    key = key.wrapping_mul(INV_265);

    // invert: key ^= key >> 24
    tmp = key ^ key >> 24;
    key ^= tmp >> 24;

    // invert: key = (!key) + (key << 21)
    tmp = !key;
    tmp = !(key.wrapping_sub(tmp << 21));
    tmp = !(key.wrapping_sub(tmp << 21));
    key = !(key.wrapping_sub(tmp << 21));

    key
}

/// Derives `num_hashes` independent Bloom filter positions in `[0, num_sigs)`
/// for a single code, via Kirsch-Mitzenmacher double hashing: split one
/// 64-bit hash into high/low 32-bit halves `a`/`b` and combine as `a + b*i`,
/// rather than running `num_hashes` independent hash functions.
///
/// # Examples
///
/// ```
/// use unikmer::hash::hash_locations;
/// let locs = hash_locations(42, 3, 1 << 20);
/// assert_eq!(locs.len(), 3);
/// assert!(locs.iter().all(|&p| p < (1 << 20)));
/// ```
pub fn hash_locations(code: u64, num_hashes: usize, num_sigs: u64) -> Vec<u64> {
    let h = hash64(code);
    let a = h >> 32;
    let b = h & 0xffff_ffff;
    (0..num_hashes as u64)
        .map(|i| (a.wrapping_add(b.wrapping_mul(i))) % num_sigs)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_invertible_for_many_values() {
        for x in [0u64, 1, 2, 42, u64::MAX, 0xdead_beef_cafe_babe] {
            assert_eq!(ihash64(hash64(x)), x);
        }
    }

    #[test]
    fn hash_locations_are_deterministic() {
        let a = hash_locations(7, 4, 1024);
        let b = hash_locations(7, 4, 1024);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_locations_vary_with_index() {
        let locs = hash_locations(7, 4, 1 << 30);
        let unique: std::collections::HashSet<_> = locs.iter().collect();
        assert_eq!(unique.len(), locs.len());
    }
}
