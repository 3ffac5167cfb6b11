// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

pub(crate) mod bits;
mod dictionary;
mod gorilla;
pub(crate) mod packer;
mod plain;
mod rle;
mod sprintz;
mod ts2diff;

pub(crate) use dictionary::{DictionaryDecoder, DictionaryEncoder};
pub(crate) use gorilla::{GorillaDecoder, GorillaEncoder};
pub(crate) use rle::{RleDecoder, RleEncoder};
pub(crate) use sprintz::{SprintzDecoder, SprintzEncoder, SprintzMode};
pub(crate) use ts2diff::{Ts2DiffDecoder, Ts2DiffEncoder};

use crate::{stream::ByteStream, TSDataType, TypeClass, Value};
use std::io::{Read, Write};

/// Column encoding
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TSEncoding {
    /// Type-dependent direct encoding
    Plain,

    /// Ordered-dictionary encoding for byte strings
    Dictionary,

    /// Hybrid run-length / bit-packed encoding for integers
    Rle,

    /// Delta-of-delta blocks with bit packing
    Ts2Diff,

    /// XOR-based encoding (Facebook Gorilla)
    Gorilla,

    /// Zigzag varints, no framing
    Zigzag,

    /// Frequency-domain encoding (declared, not supported)
    Freq,

    /// Block-of-8 delta encoding with per-block bit width
    Sprintz,
}

impl From<TSEncoding> for u8 {
    fn from(value: TSEncoding) -> Self {
        match value {
            TSEncoding::Plain => 0,
            TSEncoding::Dictionary => 1,
            TSEncoding::Rle => 2,
            TSEncoding::Ts2Diff => 4,
            TSEncoding::Gorilla => 8,
            TSEncoding::Zigzag => 9,
            TSEncoding::Freq => 10,
            TSEncoding::Sprintz => 11,
        }
    }
}

impl TryFrom<u8> for TSEncoding {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Plain),
            1 => Ok(Self::Dictionary),
            2 => Ok(Self::Rle),
            4 => Ok(Self::Ts2Diff),
            8 => Ok(Self::Gorilla),
            9 => Ok(Self::Zigzag),
            10 => Ok(Self::Freq),
            11 => Ok(Self::Sprintz),
            _ => Err(crate::Error::InvalidFile("unknown encoding tag")),
        }
    }
}

impl std::fmt::Display for TSEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl TSEncoding {
    /// Whether this encoding is legal for the given data type.
    #[must_use]
    pub fn supports(self, data_type: TSDataType) -> bool {
        match data_type.type_class() {
            TypeClass::Bool => self == Self::Plain,
            TypeClass::Int | TypeClass::Long => matches!(
                self,
                Self::Plain
                    | Self::Ts2Diff
                    | Self::Gorilla
                    | Self::Rle
                    | Self::Zigzag
                    | Self::Sprintz
            ),
            TypeClass::Float | TypeClass::Double => matches!(
                self,
                Self::Plain | Self::Gorilla | Self::Sprintz | Self::Ts2Diff
            ),
            TypeClass::Bytes => matches!(self, Self::Plain | Self::Dictionary),
        }
    }
}

/// Fixed-width integer usable by the bit-oriented codecs.
///
/// Signed values pass through as two's complement; the packers are agnostic.
pub(crate) trait PackedInt: Copy + Eq + std::fmt::Debug {
    const WIDTH: u32;

    /// Bits used for the leading-zero count in the gorilla header
    const LEAD_BITS: u32;

    /// Bits used for the meaningful-bit count in the gorilla header
    const SIG_BITS: u32;

    const MIN: Self;

    fn to_u64(self) -> u64;
    fn from_u64(v: u64) -> Self;

    fn zigzag(self) -> u64;
    fn from_zigzag(v: u64) -> Self;

    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Bits needed to represent the raw (unsigned view) value
    fn bit_width(self) -> u32;

    fn write_be<W: Write>(self, out: &mut W) -> std::io::Result<()>;
    fn read_be<R: Read>(src: &mut R) -> std::io::Result<Self>;

    /// Zigzag varint
    fn write_varint<W: Write>(self, out: &mut W) -> std::io::Result<()>;
    fn read_varint<R: Read>(src: &mut R) -> std::io::Result<Self>;
}

impl PackedInt for i32 {
    const WIDTH: u32 = 32;
    const LEAD_BITS: u32 = 5;
    const SIG_BITS: u32 = 5;
    const MIN: Self = Self::MIN;

    fn to_u64(self) -> u64 {
        u64::from(self as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_u64(v: u64) -> Self {
        v as u32 as Self
    }

    fn zigzag(self) -> u64 {
        u64::from(((self << 1) ^ (self >> 31)) as u32)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn from_zigzag(v: u64) -> Self {
        let v = v as u32;
        ((v >> 1) as Self) ^ -((v & 1) as Self)
    }

    fn wrapping_sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    fn bit_width(self) -> u32 {
        Self::WIDTH - (self as u32).leading_zeros()
    }

    fn write_be<W: Write>(self, out: &mut W) -> std::io::Result<()> {
        use byteorder::{BigEndian, WriteBytesExt};
        out.write_i32::<BigEndian>(self)
    }

    fn read_be<R: Read>(src: &mut R) -> std::io::Result<Self> {
        use byteorder::{BigEndian, ReadBytesExt};
        src.read_i32::<BigEndian>()
    }

    fn write_varint<W: Write>(self, out: &mut W) -> std::io::Result<()> {
        use varint_rs::VarintWriter;

        #[allow(clippy::cast_possible_truncation)]
        out.write_u32_varint(self.zigzag() as u32)
    }

    fn read_varint<R: Read>(src: &mut R) -> std::io::Result<Self> {
        use varint_rs::VarintReader;
        Ok(Self::from_zigzag(u64::from(src.read_u32_varint()?)))
    }
}

impl PackedInt for i64 {
    const WIDTH: u32 = 64;
    const LEAD_BITS: u32 = 6;
    const SIG_BITS: u32 = 6;
    const MIN: Self = Self::MIN;

    #[allow(clippy::cast_sign_loss)]
    fn to_u64(self) -> u64 {
        self as u64
    }

    #[allow(clippy::cast_possible_wrap)]
    fn from_u64(v: u64) -> Self {
        v as Self
    }

    #[allow(clippy::cast_sign_loss)]
    fn zigzag(self) -> u64 {
        ((self << 1) ^ (self >> 63)) as u64
    }

    #[allow(clippy::cast_possible_wrap)]
    fn from_zigzag(v: u64) -> Self {
        ((v >> 1) as Self) ^ -((v & 1) as Self)
    }

    fn wrapping_sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    #[allow(clippy::cast_sign_loss)]
    fn bit_width(self) -> u32 {
        Self::WIDTH - (self as u64).leading_zeros()
    }

    fn write_be<W: Write>(self, out: &mut W) -> std::io::Result<()> {
        use byteorder::{BigEndian, WriteBytesExt};
        out.write_i64::<BigEndian>(self)
    }

    fn read_be<R: Read>(src: &mut R) -> std::io::Result<Self> {
        use byteorder::{BigEndian, ReadBytesExt};
        src.read_i64::<BigEndian>()
    }

    fn write_varint<W: Write>(self, out: &mut W) -> std::io::Result<()> {
        use varint_rs::VarintWriter;
        out.write_u64_varint(self.zigzag())
    }

    fn read_varint<R: Read>(src: &mut R) -> std::io::Result<Self> {
        use varint_rs::VarintReader;
        Ok(Self::from_zigzag(src.read_u64_varint()?))
    }
}

const FLOAT_NAN_BITS: i32 = 0x7fc0_0000_u32 as i32;
const DOUBLE_NAN_BITS: i64 = 0x7ff8_0000_0000_0000_u64 as i64;

/// Encoder for `i64` streams (also drives the time column and DOUBLE via
/// bit patterns).
pub(crate) enum Int64Encoder {
    Plain,
    Zigzag,
    Rle(RleEncoder<i64>),
    Ts2Diff(Ts2DiffEncoder<i64>),
    Gorilla(GorillaEncoder<i64>),
    Sprintz(SprintzEncoder<i64>),
}

impl Int64Encoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Zigzag => Ok(Self::Zigzag),
            TSEncoding::Rle => Ok(Self::Rle(RleEncoder::new())),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffEncoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaEncoder::new(i64::MIN))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzEncoder::new(SprintzMode::Delta))),
            _ => Err(crate::Error::NotSupport("encoding for INT64")),
        }
    }

    pub fn encode(&mut self, v: i64, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain | Self::Zigzag => {
                v.write_varint(out)?;
                Ok(())
            }
            Self::Rle(e) => e.encode(v),
            Self::Ts2Diff(e) => e.encode(v, out),
            Self::Gorilla(e) => e.encode(v, out),
            Self::Sprintz(e) => e.encode(v, out),
        }
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain | Self::Zigzag => Ok(()),
            Self::Rle(e) => e.flush(out),
            Self::Ts2Diff(e) => e.flush(out),
            Self::Gorilla(e) => e.flush(out),
            Self::Sprintz(e) => e.flush(out),
        }
    }
}

/// Decoder counterpart of [`Int64Encoder`]
pub(crate) enum Int64Decoder {
    Plain,
    Zigzag,
    Rle(RleDecoder<i64>),
    Ts2Diff(Ts2DiffDecoder<i64>),
    Gorilla(GorillaDecoder<i64>),
    Sprintz(SprintzDecoder<i64>),
}

impl Int64Decoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Zigzag => Ok(Self::Zigzag),
            TSEncoding::Rle => Ok(Self::Rle(RleDecoder::new())),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffDecoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaDecoder::new(i64::MIN))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzDecoder::new(SprintzMode::Delta))),
            _ => Err(crate::Error::NotSupport("encoding for INT64")),
        }
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<i64> {
        match self {
            Self::Plain | Self::Zigzag => Ok(i64::read_varint(src)?),
            Self::Rle(d) => d.read(src),
            Self::Ts2Diff(d) => d.read(src),
            Self::Gorilla(d) => d.read(src),
            Self::Sprintz(d) => d.read(src),
        }
    }

    pub fn has_next(&mut self, src: &mut ByteStream) -> crate::Result<bool> {
        match self {
            Self::Plain | Self::Zigzag => Ok(src.remaining() > 0),
            Self::Rle(d) => d.has_next(src),
            Self::Ts2Diff(d) => d.has_next(src),
            Self::Gorilla(d) => d.has_next(src),
            Self::Sprintz(d) => d.has_next(src),
        }
    }
}

pub(crate) enum Int32Encoder {
    Plain,
    Zigzag,
    Rle(RleEncoder<i32>),
    Ts2Diff(Ts2DiffEncoder<i32>),
    Gorilla(GorillaEncoder<i32>),
    Sprintz(SprintzEncoder<i32>),
}

impl Int32Encoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Zigzag => Ok(Self::Zigzag),
            TSEncoding::Rle => Ok(Self::Rle(RleEncoder::new())),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffEncoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaEncoder::new(i32::MIN))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzEncoder::new(SprintzMode::Delta))),
            _ => Err(crate::Error::NotSupport("encoding for INT32")),
        }
    }

    pub fn encode(&mut self, v: i32, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain | Self::Zigzag => {
                v.write_varint(out)?;
                Ok(())
            }
            Self::Rle(e) => e.encode(v),
            Self::Ts2Diff(e) => e.encode(v, out),
            Self::Gorilla(e) => e.encode(v, out),
            Self::Sprintz(e) => e.encode(v, out),
        }
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain | Self::Zigzag => Ok(()),
            Self::Rle(e) => e.flush(out),
            Self::Ts2Diff(e) => e.flush(out),
            Self::Gorilla(e) => e.flush(out),
            Self::Sprintz(e) => e.flush(out),
        }
    }
}

pub(crate) enum Int32Decoder {
    Plain,
    Zigzag,
    Rle(RleDecoder<i32>),
    Ts2Diff(Ts2DiffDecoder<i32>),
    Gorilla(GorillaDecoder<i32>),
    Sprintz(SprintzDecoder<i32>),
}

impl Int32Decoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Zigzag => Ok(Self::Zigzag),
            TSEncoding::Rle => Ok(Self::Rle(RleDecoder::new())),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffDecoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaDecoder::new(i32::MIN))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzDecoder::new(SprintzMode::Delta))),
            _ => Err(crate::Error::NotSupport("encoding for INT32")),
        }
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<i32> {
        match self {
            Self::Plain | Self::Zigzag => Ok(i32::read_varint(src)?),
            Self::Rle(d) => d.read(src),
            Self::Ts2Diff(d) => d.read(src),
            Self::Gorilla(d) => d.read(src),
            Self::Sprintz(d) => d.read(src),
        }
    }

    pub fn has_next(&mut self, src: &mut ByteStream) -> crate::Result<bool> {
        match self {
            Self::Plain | Self::Zigzag => Ok(src.remaining() > 0),
            Self::Rle(d) => d.has_next(src),
            Self::Ts2Diff(d) => d.has_next(src),
            Self::Gorilla(d) => d.has_next(src),
            Self::Sprintz(d) => d.has_next(src),
        }
    }
}

/// FLOAT encoders run the integer codecs over the IEEE-754 bit pattern.
pub(crate) enum FloatEncoder {
    Plain,
    Ts2Diff(Ts2DiffEncoder<i32>),
    Gorilla(GorillaEncoder<i32>),
    Sprintz(SprintzEncoder<i32>),
}

impl FloatEncoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffEncoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaEncoder::new(FLOAT_NAN_BITS))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzEncoder::new(SprintzMode::Xor))),
            _ => Err(crate::Error::NotSupport("encoding for FLOAT")),
        }
    }

    pub fn encode(&mut self, v: f32, out: &mut ByteStream) -> crate::Result<()> {
        #[allow(clippy::cast_possible_wrap)]
        let bits = v.to_bits() as i32;

        match self {
            Self::Plain => {
                bits.write_be(out)?;
                Ok(())
            }
            Self::Ts2Diff(e) => e.encode(bits, out),
            Self::Gorilla(e) => e.encode(bits, out),
            Self::Sprintz(e) => e.encode(bits, out),
        }
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain => Ok(()),
            Self::Ts2Diff(e) => e.flush(out),
            Self::Gorilla(e) => e.flush(out),
            Self::Sprintz(e) => e.flush(out),
        }
    }
}

pub(crate) enum FloatDecoder {
    Plain,
    Ts2Diff(Ts2DiffDecoder<i32>),
    Gorilla(GorillaDecoder<i32>),
    Sprintz(SprintzDecoder<i32>),
}

impl FloatDecoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffDecoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaDecoder::new(FLOAT_NAN_BITS))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzDecoder::new(SprintzMode::Xor))),
            _ => Err(crate::Error::NotSupport("encoding for FLOAT")),
        }
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<f32> {
        let bits = match self {
            Self::Plain => i32::read_be(src)?,
            Self::Ts2Diff(d) => d.read(src)?,
            Self::Gorilla(d) => d.read(src)?,
            Self::Sprintz(d) => d.read(src)?,
        };

        #[allow(clippy::cast_sign_loss)]
        Ok(f32::from_bits(bits as u32))
    }
}

/// DOUBLE encoders run the integer codecs over the IEEE-754 bit pattern.
pub(crate) enum DoubleEncoder {
    Plain,
    Ts2Diff(Ts2DiffEncoder<i64>),
    Gorilla(GorillaEncoder<i64>),
    Sprintz(SprintzEncoder<i64>),
}

impl DoubleEncoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffEncoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaEncoder::new(DOUBLE_NAN_BITS))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzEncoder::new(SprintzMode::Xor))),
            _ => Err(crate::Error::NotSupport("encoding for DOUBLE")),
        }
    }

    pub fn encode(&mut self, v: f64, out: &mut ByteStream) -> crate::Result<()> {
        #[allow(clippy::cast_possible_wrap)]
        let bits = v.to_bits() as i64;

        match self {
            Self::Plain => {
                bits.write_be(out)?;
                Ok(())
            }
            Self::Ts2Diff(e) => e.encode(bits, out),
            Self::Gorilla(e) => e.encode(bits, out),
            Self::Sprintz(e) => e.encode(bits, out),
        }
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain => Ok(()),
            Self::Ts2Diff(e) => e.flush(out),
            Self::Gorilla(e) => e.flush(out),
            Self::Sprintz(e) => e.flush(out),
        }
    }
}

pub(crate) enum DoubleDecoder {
    Plain,
    Ts2Diff(Ts2DiffDecoder<i64>),
    Gorilla(GorillaDecoder<i64>),
    Sprintz(SprintzDecoder<i64>),
}

impl DoubleDecoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Ts2Diff => Ok(Self::Ts2Diff(Ts2DiffDecoder::new())),
            TSEncoding::Gorilla => Ok(Self::Gorilla(GorillaDecoder::new(DOUBLE_NAN_BITS))),
            TSEncoding::Sprintz => Ok(Self::Sprintz(SprintzDecoder::new(SprintzMode::Xor))),
            _ => Err(crate::Error::NotSupport("encoding for DOUBLE")),
        }
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<f64> {
        let bits = match self {
            Self::Plain => i64::read_be(src)?,
            Self::Ts2Diff(d) => d.read(src)?,
            Self::Gorilla(d) => d.read(src)?,
            Self::Sprintz(d) => d.read(src)?,
        };

        #[allow(clippy::cast_sign_loss)]
        Ok(f64::from_bits(bits as u64))
    }
}

pub(crate) enum BytesEncoder {
    Plain,
    Dictionary(DictionaryEncoder),
}

impl BytesEncoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Dictionary => Ok(Self::Dictionary(DictionaryEncoder::new())),
            _ => Err(crate::Error::NotSupport("encoding for byte strings")),
        }
    }

    pub fn encode(&mut self, v: &[u8], out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain => plain::encode_bytes(v, out),
            Self::Dictionary(e) => e.encode(v),
        }
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Plain => Ok(()),
            Self::Dictionary(e) => e.flush(out),
        }
    }
}

pub(crate) enum BytesDecoder {
    Plain,
    Dictionary(DictionaryDecoder),
}

impl BytesDecoder {
    pub fn new(encoding: TSEncoding) -> crate::Result<Self> {
        match encoding {
            TSEncoding::Plain => Ok(Self::Plain),
            TSEncoding::Dictionary => Ok(Self::Dictionary(DictionaryDecoder::new())),
            _ => Err(crate::Error::NotSupport("encoding for byte strings")),
        }
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<Vec<u8>> {
        match self {
            Self::Plain => plain::decode_bytes(src),
            Self::Dictionary(d) => d.read(src),
        }
    }
}

/// Encoder over [`Value`]s of one column, dispatching on the data type.
pub(crate) enum ColumnEncoder {
    Boolean,
    Int32(Int32Encoder),
    Int64(Int64Encoder),
    Float(FloatEncoder),
    Double(DoubleEncoder),
    Bytes(BytesEncoder),
}

impl ColumnEncoder {
    pub fn new(data_type: TSDataType, encoding: TSEncoding) -> crate::Result<Self> {
        if !encoding.supports(data_type) {
            return Err(crate::Error::NotSupport("encoding for data type"));
        }

        Ok(match data_type.type_class() {
            TypeClass::Bool => Self::Boolean,
            TypeClass::Int => Self::Int32(Int32Encoder::new(encoding)?),
            TypeClass::Long => Self::Int64(Int64Encoder::new(encoding)?),
            TypeClass::Float => Self::Float(FloatEncoder::new(encoding)?),
            TypeClass::Double => Self::Double(DoubleEncoder::new(encoding)?),
            TypeClass::Bytes => Self::Bytes(BytesEncoder::new(encoding)?),
        })
    }

    /// Encodes one value. The value's class must already match the column.
    pub fn encode(&mut self, value: &Value, out: &mut ByteStream) -> crate::Result<()> {
        match (self, value) {
            (Self::Boolean, Value::Boolean(v)) => plain::encode_bool(*v, out),
            (Self::Int32(e), Value::Int32(v)) => e.encode(*v, out),
            (Self::Int64(e), Value::Int64(v)) => e.encode(*v, out),
            (Self::Float(e), Value::Float(v)) => e.encode(*v, out),
            (Self::Double(e), Value::Double(v)) => e.encode(*v, out),
            (Self::Bytes(e), Value::Bytes(v)) => e.encode(v, out),
            _ => Err(crate::Error::InvalidArg(
                "value class does not match column encoder".into(),
            )),
        }
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        match self {
            Self::Boolean => Ok(()),
            Self::Int32(e) => e.flush(out),
            Self::Int64(e) => e.flush(out),
            Self::Float(e) => e.flush(out),
            Self::Double(e) => e.flush(out),
            Self::Bytes(e) => e.flush(out),
        }
    }
}

/// Decoder over [`Value`]s of one column
pub(crate) enum ColumnDecoder {
    Boolean,
    Int32(Int32Decoder),
    Int64(Int64Decoder),
    Float(FloatDecoder),
    Double(DoubleDecoder),
    Bytes(BytesDecoder),
}

impl ColumnDecoder {
    pub fn new(data_type: TSDataType, encoding: TSEncoding) -> crate::Result<Self> {
        if !encoding.supports(data_type) {
            return Err(crate::Error::NotSupport("encoding for data type"));
        }

        Ok(match data_type.type_class() {
            TypeClass::Bool => Self::Boolean,
            TypeClass::Int => Self::Int32(Int32Decoder::new(encoding)?),
            TypeClass::Long => Self::Int64(Int64Decoder::new(encoding)?),
            TypeClass::Float => Self::Float(FloatDecoder::new(encoding)?),
            TypeClass::Double => Self::Double(DoubleDecoder::new(encoding)?),
            TypeClass::Bytes => Self::Bytes(BytesDecoder::new(encoding)?),
        })
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<Value> {
        Ok(match self {
            Self::Boolean => Value::Boolean(plain::decode_bool(src)?),
            Self::Int32(d) => Value::Int32(d.read(src)?),
            Self::Int64(d) => Value::Int64(d.read(src)?),
            Self::Float(d) => Value::Float(d.read(src)?),
            Self::Double(d) => Value::Double(d.read(src)?),
            Self::Bytes(d) => Value::Bytes(d.read(src)?),
        })
    }
}
