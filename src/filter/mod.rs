// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod bit_array;

use crate::hash::murmur128;
use bit_array::BitArray;
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

const SEED_1: u64 = 0x9747_b28c;
const SEED_2: u64 = 0xc2b2_ae35;

const MIN_BITS: usize = 256;
const MAX_HASH_FUNCTIONS: usize = 8;

/// Murmur128-based membership filter over `(device, measurement)` keys.
///
/// Sized from an error rate and the expected entry count:
/// `m = ceil(-n·ln(ε) / (ln 2)²)` bits and `k = round((m/n)·ln 2)` hash
/// functions. May report extras (false positives), never misses an added
/// key.
pub struct BloomFilter {
    bits: BitArray,
    m: usize,
    k: usize,
}

impl BloomFilter {
    /// Creates a filter for `expected_entries` keys at the given error rate.
    #[must_use]
    pub fn with_error_rate(error_rate: f64, expected_entries: usize) -> Self {
        let n = expected_entries.max(1);
        let error_rate = error_rate.clamp(1e-7, 0.999_999);

        let ln2_squared = std::f64::consts::LN_2.powi(2);

        #[allow(clippy::cast_precision_loss)]
        let m = (-(n as f64) * error_rate.ln() / ln2_squared).ceil();

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let m = (m as usize).max(MIN_BITS).div_ceil(8) * 8;

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let k = ((m as f64 / n as f64) * std::f64::consts::LN_2).round() as usize;
        let k = k.clamp(1, MAX_HASH_FUNCTIONS);

        Self {
            bits: BitArray::with_capacity(m / 8),
            m,
            k,
        }
    }

    /// Number of bits.
    #[must_use]
    pub fn num_bits(&self) -> usize {
        self.m
    }

    /// Number of hash functions.
    #[must_use]
    pub fn num_hash_functions(&self) -> usize {
        self.k
    }

    fn positions(&self, key: &[u8]) -> impl Iterator<Item = usize> + '_ {
        let h1 = murmur128(key, SEED_1);
        let h2 = murmur128(key, SEED_2);
        let m = self.m as u64;

        #[allow(clippy::cast_possible_truncation)]
        (0..self.k as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
    }

    /// Adds a key to the filter.
    pub fn add(&mut self, key: &str) {
        let positions: Vec<usize> = self.positions(key.as_bytes()).collect();
        for idx in positions {
            self.bits.enable_bit(idx);
        }
    }

    /// Returns `true` if the key may be contained.
    ///
    /// Will never have a false negative.
    #[must_use]
    pub fn might_contain(&self, key: &str) -> bool {
        self.positions(key.as_bytes()).all(|idx| self.bits.get(idx))
    }

    /// Serializes: `varint m`, `varint k`, raw bit-array bytes (LSB of
    /// byte 0 is bit 0).
    pub fn serialize_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u64_varint(self.m as u64)?;

        #[allow(clippy::cast_possible_truncation)]
        writer.write_u64_varint(self.k as u64)?;

        writer.write_all(self.bits.bytes())?;
        Ok(())
    }

    /// Deserializes a filter written by [`BloomFilter::serialize_into`].
    pub fn deserialize_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let m = reader.read_u64_varint()? as usize;
        let k = reader.read_u64_varint()? as usize;

        if m == 0 || m % 8 != 0 || k == 0 || k > MAX_HASH_FUNCTIONS {
            return Err(crate::Error::InvalidFile("malformed bloom filter"));
        }

        let mut bytes = vec![0u8; m / 8];
        reader.read_exact(&mut bytes)?;

        Ok(Self {
            bits: BitArray::from_bytes(bytes.into_boxed_slice()),
            m,
            k,
        })
    }
}
