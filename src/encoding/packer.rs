// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Packs and unpacks blocks of exactly 8 integers at a fixed bit width.
//!
//! A block of 8 values at width `w` occupies exactly `w` bytes. Packing is
//! MSB-first: `values[i]` occupies bits `[i*w, (i+1)*w)` counted from the
//! high bit of the first byte.

use super::PackedInt;

/// Appends one packed block of 8 values to `out`.
pub fn pack_8<T: PackedInt>(values: &[T; 8], width: u32, out: &mut Vec<u8>) {
    debug_assert!(width <= T::WIDTH);

    if width == 0 {
        return;
    }

    let start = out.len();
    out.resize(start + width as usize, 0);

    let mask = if width == 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };

    for (i, value) in values.iter().enumerate() {
        let v = value.to_u64() & mask;

        for bit in 0..width {
            if (v >> (width - 1 - bit)) & 1 == 1 {
                let pos = i as u32 * width + bit;
                if let Some(byte) = out.get_mut(start + (pos / 8) as usize) {
                    *byte |= 0x80 >> (pos % 8);
                }
            }
        }
    }
}

/// Decodes one block of 8 values from `buf` (which must hold `width` bytes).
pub fn unpack_8<T: PackedInt>(buf: &[u8], width: u32) -> [T; 8] {
    debug_assert!(width <= T::WIDTH);
    debug_assert!(buf.len() * 8 >= (width * 8) as usize);

    let mut values = [T::from_u64(0); 8];

    if width == 0 {
        return values;
    }

    for (i, value) in values.iter_mut().enumerate() {
        let mut v = 0u64;

        for bit in 0..width {
            let pos = i as u32 * width + bit;
            let byte = buf.get((pos / 8) as usize).copied().unwrap_or(0);
            v = (v << 1) | u64::from((byte >> (7 - pos % 8)) & 1);
        }

        *value = T::from_u64(v);
    }

    values
}

/// Decodes `buf.len() / width` consecutive blocks of 8.
pub fn unpack_all<T: PackedInt>(buf: &[u8], width: u32, out: &mut Vec<T>) {
    if width == 0 {
        return;
    }

    for block in buf.chunks_exact(width as usize) {
        out.extend_from_slice(&unpack_8::<T>(block, width));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn pack_sequential_values_all_widths_i32() {
        for width in 3..32u32 {
            let values: [i32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

            let mut buf = vec![];
            pack_8(&values, width, &mut buf);
            assert_eq!(width as usize, buf.len());

            assert_eq!(values, unpack_8::<i32>(&buf, width), "width {width}");
        }
    }

    #[test]
    fn pack_all_zeros() {
        for width in 1..=31u32 {
            let values = [0i32; 8];

            let mut buf = vec![];
            pack_8(&values, width, &mut buf);

            assert!(buf.iter().all(|b| *b == 0));
            assert_eq!(values, unpack_8::<i32>(&buf, width));
        }
    }

    #[test]
    fn pack_width_one_alternating() {
        let values: [i32; 8] = [0, 1, 0, 1, 0, 1, 0, 1];

        let mut buf = vec![];
        pack_8(&values, 1, &mut buf);

        assert_eq!(vec![0b0101_0101], buf);
        assert_eq!(values, unpack_8::<i32>(&buf, 1));
    }

    #[test]
    fn pack_max_width_negative_i32() {
        let values: [i32; 8] = [i32::MIN, -1, 0, 1, i32::MAX, -123_456, 42, -7];

        let mut buf = vec![];
        pack_8(&values, 32, &mut buf);

        assert_eq!(values, unpack_8::<i32>(&buf, 32));
    }

    #[test]
    fn pack_max_width_negative_i64() {
        let values: [i64; 8] = [
            i64::MIN,
            -1,
            0,
            1,
            i64::MAX,
            -9_876_543_210,
            9_876_543_210,
            -7,
        ];

        let mut buf = vec![];
        pack_8(&values, 64, &mut buf);

        assert_eq!(values, unpack_8::<i64>(&buf, 64));
    }

    #[test]
    fn pack_random_values_fit_width() {
        use rand::Rng;
        let mut rng = rand::rng();

        for width in 1..=64u32 {
            let mask = if width == 64 {
                u64::MAX
            } else {
                (1u64 << width) - 1
            };

            let mut values = [0i64; 8];
            for v in &mut values {
                *v = i64::from_u64(rng.random::<u64>() & mask);
            }

            let mut buf = vec![];
            pack_8(&values, width, &mut buf);

            assert_eq!(values, unpack_8::<i64>(&buf, width), "width {width}");
        }
    }

    #[test]
    fn unpack_all_multiple_blocks() {
        let width = 16u32;
        let blocks = 10usize;

        let mut orig = Vec::with_capacity(blocks * 8);
        let mut buf = vec![];

        for b in 0..blocks {
            let mut block = [0i32; 8];
            for (i, v) in block.iter_mut().enumerate() {
                *v = ((b << 4) | i) as i32;
            }
            orig.extend_from_slice(&block);
            pack_8(&block, width, &mut buf);
        }

        let mut out = vec![];
        unpack_all::<i32>(&buf, width, &mut out);

        assert_eq!(orig, out);
    }
}
