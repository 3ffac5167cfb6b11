// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Murmur3-128 collapsed to 64 bits, bit-compatible with the Java/C++
//! TS-file implementations (both halves are summed after finalization).

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

/// Hashes `buf` with the given seed.
#[must_use]
pub fn murmur128(buf: &[u8], seed: u64) -> u64 {
    let block_count = buf.len() / 16;
    let mut h1 = seed;
    let mut h2 = seed;

    for i in 0..block_count {
        let mut k1 = get_block(buf, i * 2);
        let mut k2 = get_block(buf, i * 2 + 1);

        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(31);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(27);
        h1 = h1.wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

        k2 = k2.wrapping_mul(C2);
        k2 = k2.rotate_left(33);
        k2 = k2.wrapping_mul(C1);
        h2 ^= k2;
        h2 = h2.rotate_left(31);
        h2 = h2.wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
    }

    let tail = buf.get(block_count * 16..).unwrap_or_default();
    let mut k1: u64 = 0;
    let mut k2: u64 = 0;

    for (i, byte) in tail.iter().enumerate().rev() {
        let b = u64::from(*byte);
        if i >= 8 {
            k2 ^= b << ((i - 8) * 8);
        } else {
            k1 ^= b << (i * 8);
        }
    }

    if tail.len() > 8 {
        k2 = k2.wrapping_mul(C2);
        k2 = k2.rotate_left(33);
        k2 = k2.wrapping_mul(C1);
        h2 ^= k2;
    }

    if !tail.is_empty() {
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(31);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    let len = buf.len() as u64;
    h1 ^= len;
    h2 ^= len;
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix(h1);
    h2 = fmix(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1.wrapping_add(h2)
}

fn get_block(buf: &[u8], index: usize) -> u64 {
    let offset = index * 8;
    let mut res: u64 = 0;
    for i in 0..8 {
        res |= u64::from(*buf.get(offset + i).unwrap_or(&0)) << (i * 8);
    }
    res
}

fn fmix(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn hash_is_deterministic() {
        let h1 = murmur128(b"root.sg1.d1.s1", 0x9747_b28c);
        let h2 = murmur128(b"root.sg1.d1.s1", 0x9747_b28c);
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_depends_on_seed() {
        let h1 = murmur128(b"device.measurement", 0x9747_b28c);
        let h2 = murmur128(b"device.measurement", 0xc2b2_ae35);
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_depends_on_input() {
        assert_ne!(murmur128(b"a", 1), murmur128(b"b", 1));
        assert_ne!(murmur128(b"", 1), murmur128(b"a", 1));
    }

    #[test]
    fn hash_covers_tail_lengths() {
        // exercise every tail length 0..=15 plus a body block
        let data: Vec<u8> = (0u8..48).collect();
        let mut seen = std::collections::HashSet::new();

        for len in 0..=data.len() {
            let h = murmur128(data.get(..len).unwrap_or_default(), 42);
            assert!(seen.insert(h), "collision at prefix length {len}");
        }
    }
}
