// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! XOR-based encoding after the Facebook Gorilla paper.
//!
//! The first value is stored raw. Every further value is XORed with its
//! predecessor: a zero XOR is a single `0` bit; otherwise a `1` bit is
//! followed by either `0` (reuse the previous leading/trailing-zero window)
//! or `1` plus a new window header (leading-zero count and
//! `meaningful_bits - 1`). `flush` encodes an end marker and pads to a
//! byte boundary.

use super::{
    bits::{BitReader, BitWriter},
    PackedInt,
};
use crate::stream::ByteStream;

pub(crate) struct GorillaEncoder<T: PackedInt> {
    end_marker: T,
    prev: u64,
    stored_leading: u32,
    stored_trailing: u32,
    started: bool,
    bits: BitWriter,
}

impl<T: PackedInt> GorillaEncoder<T> {
    pub fn new(end_marker: T) -> Self {
        Self {
            end_marker,
            prev: 0,
            stored_leading: u32::MAX,
            stored_trailing: 0,
            started: false,
            bits: BitWriter::new(),
        }
    }

    pub fn encode(&mut self, v: T, out: &mut ByteStream) -> crate::Result<()> {
        let value = v.to_u64();

        if !self.started {
            self.bits.write_bits(value, T::WIDTH, out);
            self.started = true;
            self.prev = value;
            return Ok(());
        }

        let xor = value ^ self.prev;
        self.prev = value;

        if xor == 0 {
            self.bits.write_bit(false, out);
            return Ok(());
        }

        self.bits.write_bit(true, out);

        let leading = xor.leading_zeros() - (64 - T::WIDTH);
        let trailing = xor.trailing_zeros();

        if self.stored_leading != u32::MAX
            && leading >= self.stored_leading
            && trailing >= self.stored_trailing
        {
            self.bits.write_bit(false, out);

            let significant = T::WIDTH - self.stored_leading - self.stored_trailing;
            self.bits
                .write_bits(xor >> self.stored_trailing, significant, out);
        } else {
            self.bits.write_bit(true, out);

            let significant = T::WIDTH - leading - trailing;
            self.bits.write_bits(u64::from(leading), T::LEAD_BITS, out);
            self.bits
                .write_bits(u64::from(significant - 1), T::SIG_BITS, out);
            self.bits.write_bits(xor >> trailing, significant, out);

            self.stored_leading = leading;
            self.stored_trailing = trailing;
        }

        Ok(())
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        let marker = self.end_marker;
        self.encode(marker, out)?;
        self.bits.pad_to_byte(out);

        self.started = false;
        self.prev = 0;
        self.stored_leading = u32::MAX;
        self.stored_trailing = 0;

        Ok(())
    }
}

pub(crate) struct GorillaDecoder<T: PackedInt> {
    end_marker: T,
    prev: u64,
    stored_leading: u32,
    stored_trailing: u32,
    started: bool,
    cached: Option<T>,
    exhausted: bool,
    bits: BitReader,
}

impl<T: PackedInt> GorillaDecoder<T> {
    pub fn new(end_marker: T) -> Self {
        Self {
            end_marker,
            prev: 0,
            stored_leading: 0,
            stored_trailing: 0,
            started: false,
            cached: None,
            exhausted: false,
            bits: BitReader::new(),
        }
    }

    fn decode_next(&mut self, src: &mut ByteStream) -> crate::Result<T> {
        if !self.started {
            self.prev = self.bits.read_bits(T::WIDTH, src)?;
            self.started = true;
            return Ok(T::from_u64(self.prev));
        }

        if !self.bits.read_bit(src)? {
            return Ok(T::from_u64(self.prev));
        }

        let xor = if self.bits.read_bit(src)? {
            let leading = self.bits.read_bits(T::LEAD_BITS, src)?;

            #[allow(clippy::cast_possible_truncation)]
            let significant = self.bits.read_bits(T::SIG_BITS, src)? as u32 + 1;

            #[allow(clippy::cast_possible_truncation)]
            let leading = leading as u32;

            let Some(trailing) = T::WIDTH.checked_sub(leading + significant) else {
                return Err(crate::Error::CorruptChunk("bad gorilla window".into()));
            };

            self.stored_leading = leading;
            self.stored_trailing = trailing;

            self.bits.read_bits(significant, src)? << trailing
        } else {
            let significant = T::WIDTH - self.stored_leading - self.stored_trailing;
            self.bits.read_bits(significant, src)? << self.stored_trailing
        };

        self.prev ^= xor;
        Ok(T::from_u64(self.prev))
    }

    /// Reads the next value, regardless of the end marker.
    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<T> {
        if let Some(v) = self.cached.take() {
            return Ok(v);
        }
        self.decode_next(src)
    }

    /// Peeks ahead; `false` once the end marker (or end of input) is hit.
    pub fn has_next(&mut self, src: &mut ByteStream) -> crate::Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        if self.cached.is_some() {
            return Ok(true);
        }

        if !self.bits.has_bits(src) {
            self.exhausted = true;
            return Ok(false);
        }

        let next = self.decode_next(src)?;
        if next == self.end_marker {
            self.exhausted = true;
            return Ok(false);
        }

        self.cached = Some(next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn gorilla_int32_expected_stream() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i32>::new(i32::MIN);

        for v in [100, 102, 105, 107, 110, 115, 120, 1_000_000, 1_000_005] {
            encoder.encode(v, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        assert_eq!(24, stream.total_size());

        let expected: [u8; 24] = [
            0, 0, 0, 100, 252, 15, 193, 252, 82, 251, 39, 101, 236, 135, 161, 31, 232, 174, 15,
            192, 7, 161, 34, 128,
        ];
        assert_eq!(expected.to_vec(), stream.to_vec());

        Ok(())
    }

    #[test]
    fn gorilla_int32_roundtrip() -> crate::Result<()> {
        let data = [100, 102, 105, 107, 110, 115, 120, 1_000_000, 1_000_005];

        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i32>::new(i32::MIN);
        for v in data {
            encoder.encode(v, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = GorillaDecoder::<i32>::new(i32::MIN);
        for v in data {
            assert!(decoder.has_next(&mut stream)?);
            assert_eq!(v, decoder.read(&mut stream)?);
        }
        assert!(!decoder.has_next(&mut stream)?);

        Ok(())
    }

    #[test]
    fn gorilla_int32_large_quantities() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i32>::new(i32::MIN);
        for v in 0..10_000 {
            encoder.encode(v, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = GorillaDecoder::<i32>::new(i32::MIN);
        for v in 0..10_000 {
            assert_eq!(v, decoder.read(&mut stream)?);
        }

        Ok(())
    }

    #[test]
    fn gorilla_int64_roundtrip() -> crate::Result<()> {
        let data: Vec<i64> = vec![100, 102, 105, 107, 110, 115, 120, 1_000_000, 1_000_005];

        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i64>::new(i64::MIN);
        for v in &data {
            encoder.encode(*v, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = GorillaDecoder::<i64>::new(i64::MIN);
        for v in &data {
            assert_eq!(*v, decoder.read(&mut stream)?);
        }

        Ok(())
    }

    #[test]
    fn gorilla_int64_large_quantities() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i64>::new(i64::MIN);
        for v in 0i64..10_000 {
            encoder.encode(v, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = GorillaDecoder::<i64>::new(i64::MIN);
        for v in 0i64..10_000 {
            assert_eq!(v, decoder.read(&mut stream)?);
        }

        Ok(())
    }

    #[test]
    fn gorilla_float_boundary_values() -> crate::Result<()> {
        let nan_marker = 0x7fc0_0000_u32 as i32;

        let values: Vec<f32> = vec![
            0.0,
            -0.0,
            1.0,
            -1.0,
            f32::MIN_POSITIVE,
            f32::MAX,
            f32::MIN,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::EPSILON,
        ];

        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i32>::new(nan_marker);
        for v in &values {
            #[allow(clippy::cast_possible_wrap)]
            encoder.encode(v.to_bits() as i32, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = GorillaDecoder::<i32>::new(nan_marker);
        for expected in &values {
            #[allow(clippy::cast_sign_loss)]
            let decoded = f32::from_bits(decoder.read(&mut stream)? as u32);

            assert_eq!(expected.to_bits(), decoded.to_bits());
        }

        Ok(())
    }

    #[test]
    fn gorilla_double_boundary_values() -> crate::Result<()> {
        let nan_marker = 0x7ff8_0000_0000_0000_u64 as i64;

        let values: Vec<f64> = vec![
            0.0,
            -0.0,
            1.0,
            -1.0,
            f64::MIN_POSITIVE,
            f64::MAX,
            f64::MIN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::EPSILON,
            f64::NAN,
        ];

        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i64>::new(nan_marker);
        for v in &values {
            #[allow(clippy::cast_possible_wrap)]
            encoder.encode(v.to_bits() as i64, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = GorillaDecoder::<i64>::new(nan_marker);
        for expected in &values {
            #[allow(clippy::cast_sign_loss)]
            let decoded = f64::from_bits(decoder.read(&mut stream)? as u64);

            if expected.is_nan() {
                assert!(decoded.is_nan());
            } else {
                assert_eq!(expected.to_bits(), decoded.to_bits());
            }
        }

        Ok(())
    }

    #[test]
    fn gorilla_constant_series_is_compact() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = GorillaEncoder::<i64>::new(i64::MIN);
        for _ in 0..1000 {
            encoder.encode(42, &mut stream)?;
        }
        encoder.flush(&mut stream)?;

        // 8 bytes raw + ~1 bit per repeat + end marker
        assert!(stream.total_size() < 160);

        let mut decoder = GorillaDecoder::<i64>::new(i64::MIN);
        for _ in 0..1000 {
            assert_eq!(42, decoder.read(&mut stream)?);
        }

        Ok(())
    }
}
