// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Delta-of-delta encoding over blocks of up to 128 values.
//!
//! Block layout: `varint value_count`, `varint bit_width`,
//! zigzag-varint minimum delta, first value (fixed-width big-endian),
//! then the deltas-minus-minimum bit-packed in groups of 8 (zero-padded).

use super::{packer, PackedInt};
use crate::stream::ByteStream;
use std::collections::VecDeque;
use varint_rs::{VarintReader, VarintWriter};

pub(crate) const BLOCK_SIZE: usize = 128;

pub(crate) struct Ts2DiffEncoder<T: PackedInt> {
    block: Vec<T>,
}

impl<T: PackedInt> Ts2DiffEncoder<T> {
    pub fn new() -> Self {
        Self {
            block: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    pub fn encode(&mut self, v: T, out: &mut ByteStream) -> crate::Result<()> {
        self.block.push(v);

        if self.block.len() == BLOCK_SIZE {
            self.flush_block(out)?;
        }

        Ok(())
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        if !self.block.is_empty() {
            self.flush_block(out)?;
        }
        Ok(())
    }

    fn flush_block(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        let block = std::mem::take(&mut self.block);

        #[allow(clippy::expect_used)]
        let first = *block.first().expect("block is non-empty");

        let deltas: Vec<T> = block.windows(2).filter_map(window_delta).collect();

        let min_delta = deltas
            .iter()
            .copied()
            .reduce(|a, b| if delta_lt(b, a) { b } else { a })
            .unwrap_or_else(|| T::from_u64(0));

        let offsets: Vec<T> = deltas
            .iter()
            .map(|d| d.wrapping_sub(min_delta))
            .collect();

        let bit_width = offsets.iter().map(|o| o.bit_width()).max().unwrap_or(0);

        #[allow(clippy::cast_possible_truncation)]
        out.write_u32_varint(block.len() as u32)?;
        out.write_u32_varint(bit_width)?;
        min_delta.write_varint(out)?;
        first.write_be(out)?;

        let mut packed = Vec::new();
        for chunk in offsets.chunks(8) {
            let mut group = [T::from_u64(0); 8];
            for (slot, v) in group.iter_mut().zip(chunk.iter()) {
                *slot = *v;
            }
            packer::pack_8(&group, bit_width, &mut packed);
        }
        out.write_raw(&packed);

        Ok(())
    }
}

fn window_delta<T: PackedInt>(window: &[T]) -> Option<T> {
    match window {
        [a, b] => Some(b.wrapping_sub(*a)),
        _ => None,
    }
}

// compares deltas as signed values of the underlying width
fn delta_lt<T: PackedInt>(a: T, b: T) -> bool {
    let shift = 64 - T::WIDTH;

    #[allow(clippy::cast_possible_wrap)]
    let (a, b) = (
        (a.to_u64() << shift) as i64,
        (b.to_u64() << shift) as i64,
    );

    a < b
}

pub(crate) struct Ts2DiffDecoder<T: PackedInt> {
    pending: VecDeque<T>,
}

impl<T: PackedInt> Ts2DiffDecoder<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    fn load_block(&mut self, src: &mut ByteStream) -> crate::Result<()> {
        let count = src.read_u32_varint()? as usize;
        let bit_width = src.read_u32_varint()?;
        let min_delta = T::read_varint(src)?;
        let first = T::read_be(src)?;

        if count == 0 || bit_width > T::WIDTH {
            return Err(crate::Error::CorruptChunk("bad delta block header".into()));
        }

        self.pending.push_back(first);

        let delta_count = count - 1;
        let group_count = delta_count.div_ceil(8);

        let mut prev = first;
        let mut produced = 0usize;
        let mut group = vec![0u8; bit_width as usize];

        for _ in 0..group_count {
            if bit_width > 0 && src.read_into(&mut group) != group.len() {
                return Err(crate::Error::BufNotEnough);
            }

            for offset in packer::unpack_8::<T>(&group, bit_width) {
                if produced == delta_count {
                    break;
                }

                let delta = offset.wrapping_add(min_delta);
                prev = prev.wrapping_add(delta);
                self.pending.push_back(prev);
                produced += 1;
            }
        }

        Ok(())
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<T> {
        if self.pending.is_empty() {
            self.load_block(src)?;
        }

        self.pending
            .pop_front()
            .ok_or(crate::Error::BufNotEnough)
    }

    pub fn has_next(&mut self, src: &mut ByteStream) -> crate::Result<bool> {
        Ok(!self.pending.is_empty() || src.remaining() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn roundtrip<T: PackedInt>(input: &[T]) -> crate::Result<()> {
        let mut stream = ByteStream::new();

        let mut encoder = Ts2DiffEncoder::<T>::new();
        for v in input {
            encoder.encode(*v, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = Ts2DiffDecoder::<T>::new();
        let mut decoded = Vec::with_capacity(input.len());
        while decoder.has_next(&mut stream)? {
            decoded.push(decoder.read(&mut stream)?);
        }

        assert_eq!(input, decoded.as_slice());
        Ok(())
    }

    #[test]
    fn ts2diff_regular_timestamps() -> crate::Result<()> {
        let data: Vec<i64> = (0..1000).map(|i| 1_622_505_600_000 + i * 100).collect();
        roundtrip(&data)
    }

    #[test]
    fn ts2diff_single_value() -> crate::Result<()> {
        roundtrip(&[42i64])?;
        roundtrip(&[-42i32])
    }

    #[test]
    fn ts2diff_constant_series() -> crate::Result<()> {
        roundtrip(&[7i32; 300])
    }

    #[test]
    fn ts2diff_negative_deltas() -> crate::Result<()> {
        let data: Vec<i64> = (0..500).map(|i| 10_000 - i * 3).collect();
        roundtrip(&data)
    }

    #[test]
    fn ts2diff_jittery_series() -> crate::Result<()> {
        use rand::Rng;
        let mut rng = rand::rng();

        let mut v = 0i64;
        let data: Vec<i64> = (0..1000)
            .map(|_| {
                v += rng.random_range(-50..150);
                v
            })
            .collect();

        roundtrip(&data)
    }

    #[test]
    fn ts2diff_extreme_values() -> crate::Result<()> {
        roundtrip(&[i64::MIN, i64::MAX, 0, -1, 1, i64::MAX, i64::MIN])?;
        roundtrip(&[i32::MIN, i32::MAX, 0, -1, 1])
    }

    #[test]
    fn ts2diff_exact_block_boundary() -> crate::Result<()> {
        let data: Vec<i32> = (0..BLOCK_SIZE as i32).collect();
        roundtrip(&data)?;

        let data: Vec<i32> = (0..BLOCK_SIZE as i32 * 2).collect();
        roundtrip(&data)?;

        let data: Vec<i32> = (0..BLOCK_SIZE as i32 + 1).collect();
        roundtrip(&data)
    }

    #[test]
    fn ts2diff_flush_between_values() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = Ts2DiffEncoder::<i64>::new();

        encoder.encode(10, &mut stream)?;
        encoder.encode(20, &mut stream)?;
        encoder.flush(&mut stream)?;
        encoder.encode(100, &mut stream)?;
        encoder.flush(&mut stream)?;
        encoder.flush(&mut stream)?; // idempotent on empty

        let mut decoder = Ts2DiffDecoder::<i64>::new();
        let mut decoded = vec![];
        while decoder.has_next(&mut stream)? {
            decoded.push(decoder.read(&mut stream)?);
        }

        assert_eq!(vec![10, 20, 100], decoded);
        Ok(())
    }
}
