// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{coding, TSDataType, TypeClass, Value};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Aggregates of one page or chunk: value count, covered time range and
/// per-type extremes.
///
/// `count` covers non-null values only; the time range covers every
/// timestamp slot, null slots included.
#[derive(Clone, Debug, PartialEq)]
pub enum Statistics {
    /// BOOLEAN stats; `sum` counts `true` values
    Boolean {
        count: u64,
        start_time: i64,
        end_time: i64,
        first: bool,
        last: bool,
        sum: i64,
    },

    /// INT32 / DATE stats
    Int32 {
        count: u64,
        start_time: i64,
        end_time: i64,
        min: i32,
        max: i32,
        first: i32,
        last: i32,
        sum: i64,
    },

    /// INT64 / TIMESTAMP stats
    Int64 {
        count: u64,
        start_time: i64,
        end_time: i64,
        min: i64,
        max: i64,
        first: i64,
        last: i64,
        sum: i64,
    },

    /// FLOAT stats
    Float {
        count: u64,
        start_time: i64,
        end_time: i64,
        min: f32,
        max: f32,
        first: f32,
        last: f32,
        sum: f64,
    },

    /// DOUBLE stats
    Double {
        count: u64,
        start_time: i64,
        end_time: i64,
        min: f64,
        max: f64,
        first: f64,
        last: f64,
        sum: f64,
    },

    /// STRING / TEXT / BLOB stats (first and last value only)
    Bytes {
        count: u64,
        start_time: i64,
        end_time: i64,
        first: Vec<u8>,
        last: Vec<u8>,
    },
}

#[allow(missing_docs)]
impl Statistics {
    /// Creates empty statistics for a column type.
    #[must_use]
    pub fn new(data_type: TSDataType) -> Self {
        let (count, start_time, end_time) = (0, i64::MAX, i64::MIN);

        match data_type.type_class() {
            TypeClass::Bool => Self::Boolean {
                count,
                start_time,
                end_time,
                first: false,
                last: false,
                sum: 0,
            },
            TypeClass::Int => Self::Int32 {
                count,
                start_time,
                end_time,
                min: i32::MAX,
                max: i32::MIN,
                first: 0,
                last: 0,
                sum: 0,
            },
            TypeClass::Long => Self::Int64 {
                count,
                start_time,
                end_time,
                min: i64::MAX,
                max: i64::MIN,
                first: 0,
                last: 0,
                sum: 0,
            },
            TypeClass::Float => Self::Float {
                count,
                start_time,
                end_time,
                min: f32::INFINITY,
                max: f32::NEG_INFINITY,
                first: 0.0,
                last: 0.0,
                sum: 0.0,
            },
            TypeClass::Double => Self::Double {
                count,
                start_time,
                end_time,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
                first: 0.0,
                last: 0.0,
                sum: 0.0,
            },
            TypeClass::Bytes => Self::Bytes {
                count,
                start_time,
                end_time,
                first: Vec::new(),
                last: Vec::new(),
            },
        }
    }

    /// Number of non-null values covered.
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            Self::Boolean { count, .. }
            | Self::Int32 { count, .. }
            | Self::Int64 { count, .. }
            | Self::Float { count, .. }
            | Self::Double { count, .. }
            | Self::Bytes { count, .. } => *count,
        }
    }

    /// First covered timestamp (`i64::MAX` when empty).
    #[must_use]
    pub fn start_time(&self) -> i64 {
        match self {
            Self::Boolean { start_time, .. }
            | Self::Int32 { start_time, .. }
            | Self::Int64 { start_time, .. }
            | Self::Float { start_time, .. }
            | Self::Double { start_time, .. }
            | Self::Bytes { start_time, .. } => *start_time,
        }
    }

    /// Last covered timestamp (`i64::MIN` when empty).
    #[must_use]
    pub fn end_time(&self) -> i64 {
        match self {
            Self::Boolean { end_time, .. }
            | Self::Int32 { end_time, .. }
            | Self::Int64 { end_time, .. }
            | Self::Float { end_time, .. }
            | Self::Double { end_time, .. }
            | Self::Bytes { end_time, .. } => *end_time,
        }
    }

    /// Extends the covered time range by one timestamp slot.
    pub fn cover_time(&mut self, ts: i64) {
        match self {
            Self::Boolean {
                start_time,
                end_time,
                ..
            }
            | Self::Int32 {
                start_time,
                end_time,
                ..
            }
            | Self::Int64 {
                start_time,
                end_time,
                ..
            }
            | Self::Float {
                start_time,
                end_time,
                ..
            }
            | Self::Double {
                start_time,
                end_time,
                ..
            }
            | Self::Bytes {
                start_time,
                end_time,
                ..
            } => {
                *start_time = (*start_time).min(ts);
                *end_time = (*end_time).max(ts);
            }
        }
    }

    /// Folds one non-null value into the aggregates.
    ///
    /// The value class must match; mismatches are ignored (they are
    /// rejected earlier at the tablet boundary).
    pub fn update(&mut self, value: &Value) {
        match (self, value) {
            (
                Self::Boolean {
                    count,
                    first,
                    last,
                    sum,
                    ..
                },
                Value::Boolean(v),
            ) => {
                if *count == 0 {
                    *first = *v;
                }
                *last = *v;
                *sum += i64::from(*v);
                *count += 1;
            }

            (
                Self::Int32 {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Value::Int32(v),
            ) => {
                if *count == 0 {
                    *first = *v;
                }
                *last = *v;
                *min = (*min).min(*v);
                *max = (*max).max(*v);
                *sum += i64::from(*v);
                *count += 1;
            }

            (
                Self::Int64 {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Value::Int64(v),
            ) => {
                if *count == 0 {
                    *first = *v;
                }
                *last = *v;
                *min = (*min).min(*v);
                *max = (*max).max(*v);
                *sum = sum.wrapping_add(*v);
                *count += 1;
            }

            (
                Self::Float {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Value::Float(v),
            ) => {
                if *count == 0 {
                    *first = *v;
                }
                *last = *v;
                *min = (*min).min(*v);
                *max = (*max).max(*v);
                *sum += f64::from(*v);
                *count += 1;
            }

            (
                Self::Double {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Value::Double(v),
            ) => {
                if *count == 0 {
                    *first = *v;
                }
                *last = *v;
                *min = (*min).min(*v);
                *max = (*max).max(*v);
                *sum += *v;
                *count += 1;
            }

            (
                Self::Bytes {
                    count, first, last, ..
                },
                Value::Bytes(v),
            ) => {
                if *count == 0 {
                    first.clone_from(v);
                }
                last.clone_from(v);
                *count += 1;
            }

            _ => {}
        }
    }

    /// Merges another statistics block of the same kind into this one.
    pub fn merge(&mut self, other: &Self) {
        if other.count() == 0 {
            let (start, end) = (other.start_time(), other.end_time());
            if start <= end {
                self.cover_time(start);
                self.cover_time(end);
            }
            return;
        }

        let (other_start, other_end) = (other.start_time(), other.end_time());
        self.cover_time(other_start);
        self.cover_time(other_end);

        match (self, other) {
            (
                Self::Boolean {
                    count,
                    first,
                    last,
                    sum,
                    ..
                },
                Self::Boolean {
                    count: other_count,
                    first: other_first,
                    last: other_last,
                    sum: other_sum,
                    ..
                },
            ) => {
                if *count == 0 {
                    *first = *other_first;
                }
                *last = *other_last;
                *sum += other_sum;
                *count += other_count;
            }

            (
                Self::Int32 {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Self::Int32 {
                    count: other_count,
                    min: other_min,
                    max: other_max,
                    first: other_first,
                    last: other_last,
                    sum: other_sum,
                    ..
                },
            ) => {
                if *count == 0 {
                    *first = *other_first;
                }
                *last = *other_last;
                *min = (*min).min(*other_min);
                *max = (*max).max(*other_max);
                *sum += other_sum;
                *count += other_count;
            }

            (
                Self::Int64 {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Self::Int64 {
                    count: other_count,
                    min: other_min,
                    max: other_max,
                    first: other_first,
                    last: other_last,
                    sum: other_sum,
                    ..
                },
            ) => {
                if *count == 0 {
                    *first = *other_first;
                }
                *last = *other_last;
                *min = (*min).min(*other_min);
                *max = (*max).max(*other_max);
                *sum = sum.wrapping_add(*other_sum);
                *count += other_count;
            }

            (
                Self::Float {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Self::Float {
                    count: other_count,
                    min: other_min,
                    max: other_max,
                    first: other_first,
                    last: other_last,
                    sum: other_sum,
                    ..
                },
            ) => {
                if *count == 0 {
                    *first = *other_first;
                }
                *last = *other_last;
                *min = (*min).min(*other_min);
                *max = (*max).max(*other_max);
                *sum += other_sum;
                *count += other_count;
            }

            (
                Self::Double {
                    count,
                    min,
                    max,
                    first,
                    last,
                    sum,
                    ..
                },
                Self::Double {
                    count: other_count,
                    min: other_min,
                    max: other_max,
                    first: other_first,
                    last: other_last,
                    sum: other_sum,
                    ..
                },
            ) => {
                if *count == 0 {
                    *first = *other_first;
                }
                *last = *other_last;
                *min = (*min).min(*other_min);
                *max = (*max).max(*other_max);
                *sum += other_sum;
                *count += other_count;
            }

            (
                Self::Bytes {
                    count, first, last, ..
                },
                Self::Bytes {
                    count: other_count,
                    first: other_first,
                    last: other_last,
                    ..
                },
            ) => {
                if *count == 0 {
                    first.clone_from(other_first);
                }
                last.clone_from(other_last);
                *count += other_count;
            }

            _ => {}
        }
    }

    /// Serializes: `varint count`, `i64be start`, `i64be end`, then the
    /// type-specific payload.
    pub fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writer.write_u64_varint(self.count())?;
        writer.write_i64::<BigEndian>(self.start_time())?;
        writer.write_i64::<BigEndian>(self.end_time())?;

        match self {
            Self::Boolean {
                first, last, sum, ..
            } => {
                writer.write_u8(u8::from(*first))?;
                writer.write_u8(u8::from(*last))?;
                writer.write_i64::<BigEndian>(*sum)?;
            }

            Self::Int32 {
                min,
                max,
                first,
                last,
                sum,
                ..
            } => {
                writer.write_i32::<BigEndian>(*min)?;
                writer.write_i32::<BigEndian>(*max)?;
                writer.write_i32::<BigEndian>(*first)?;
                writer.write_i32::<BigEndian>(*last)?;
                writer.write_i64::<BigEndian>(*sum)?;
            }

            Self::Int64 {
                min,
                max,
                first,
                last,
                sum,
                ..
            } => {
                writer.write_i64::<BigEndian>(*min)?;
                writer.write_i64::<BigEndian>(*max)?;
                writer.write_i64::<BigEndian>(*first)?;
                writer.write_i64::<BigEndian>(*last)?;
                writer.write_i64::<BigEndian>(*sum)?;
            }

            Self::Float {
                min,
                max,
                first,
                last,
                sum,
                ..
            } => {
                writer.write_u32::<BigEndian>(min.to_bits())?;
                writer.write_u32::<BigEndian>(max.to_bits())?;
                writer.write_u32::<BigEndian>(first.to_bits())?;
                writer.write_u32::<BigEndian>(last.to_bits())?;
                writer.write_u64::<BigEndian>(sum.to_bits())?;
            }

            Self::Double {
                min,
                max,
                first,
                last,
                sum,
                ..
            } => {
                writer.write_u64::<BigEndian>(min.to_bits())?;
                writer.write_u64::<BigEndian>(max.to_bits())?;
                writer.write_u64::<BigEndian>(first.to_bits())?;
                writer.write_u64::<BigEndian>(last.to_bits())?;
                writer.write_u64::<BigEndian>(sum.to_bits())?;
            }

            Self::Bytes { first, last, .. } => {
                coding::write_str(writer, first)?;
                coding::write_str(writer, last)?;
            }
        }

        Ok(())
    }

    /// Deserializes statistics of the given column type.
    pub fn decode_from<R: Read>(reader: &mut R, data_type: TSDataType) -> crate::Result<Self> {
        let count = reader.read_u64_varint()?;
        let start_time = reader.read_i64::<BigEndian>()?;
        let end_time = reader.read_i64::<BigEndian>()?;

        Ok(match data_type.type_class() {
            TypeClass::Bool => Self::Boolean {
                count,
                start_time,
                end_time,
                first: reader.read_u8()? != 0,
                last: reader.read_u8()? != 0,
                sum: reader.read_i64::<BigEndian>()?,
            },

            TypeClass::Int => Self::Int32 {
                count,
                start_time,
                end_time,
                min: reader.read_i32::<BigEndian>()?,
                max: reader.read_i32::<BigEndian>()?,
                first: reader.read_i32::<BigEndian>()?,
                last: reader.read_i32::<BigEndian>()?,
                sum: reader.read_i64::<BigEndian>()?,
            },

            TypeClass::Long => Self::Int64 {
                count,
                start_time,
                end_time,
                min: reader.read_i64::<BigEndian>()?,
                max: reader.read_i64::<BigEndian>()?,
                first: reader.read_i64::<BigEndian>()?,
                last: reader.read_i64::<BigEndian>()?,
                sum: reader.read_i64::<BigEndian>()?,
            },

            TypeClass::Float => Self::Float {
                count,
                start_time,
                end_time,
                min: f32::from_bits(reader.read_u32::<BigEndian>()?),
                max: f32::from_bits(reader.read_u32::<BigEndian>()?),
                first: f32::from_bits(reader.read_u32::<BigEndian>()?),
                last: f32::from_bits(reader.read_u32::<BigEndian>()?),
                sum: f64::from_bits(reader.read_u64::<BigEndian>()?),
            },

            TypeClass::Double => Self::Double {
                count,
                start_time,
                end_time,
                min: f64::from_bits(reader.read_u64::<BigEndian>()?),
                max: f64::from_bits(reader.read_u64::<BigEndian>()?),
                first: f64::from_bits(reader.read_u64::<BigEndian>()?),
                last: f64::from_bits(reader.read_u64::<BigEndian>()?),
                sum: f64::from_bits(reader.read_u64::<BigEndian>()?),
            },

            TypeClass::Bytes => Self::Bytes {
                count,
                start_time,
                end_time,
                first: coding::read_str(reader)?,
                last: coding::read_str(reader)?,
            },
        })
    }
}
