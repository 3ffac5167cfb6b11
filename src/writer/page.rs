// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    bitmap::Bitmap,
    encoding::{ColumnEncoder, Int64Encoder},
    stream::ByteStream,
    CompressionType, Statistics, TSDataType, TSEncoding, Value,
};
use varint_rs::VarintWriter;

/// An encoded, compressed page awaiting its chunk seal
pub(crate) struct SealedPage {
    pub uncompressed_size: u32,
    pub data: Vec<u8>,
    pub statistics: Statistics,
}

/// Buffers one page of a single column: timestamps, values and the null
/// bitmap.
///
/// The sealed page body is `u8 time_encoding`, `u8 time_compression`,
/// the varint uncompressed and compressed time lengths, the (separately
/// compressed) time stream, `varint bitmap_len`, the null bitmap (bit
/// set = null slot) and the encoded non-null values; the whole body then
/// runs through the column compressor.
pub(crate) struct PageWriter {
    data_type: TSDataType,
    value_encoding: TSEncoding,
    time_encoding: TSEncoding,
    time_compression: CompressionType,
    time_encoder: Int64Encoder,
    value_encoder: ColumnEncoder,
    time_stream: ByteStream,
    value_stream: ByteStream,
    nulls: Vec<bool>,
    statistics: Statistics,
    point_count: u32,
}

impl PageWriter {
    pub fn new(
        data_type: TSDataType,
        value_encoding: TSEncoding,
        time_encoding: TSEncoding,
        time_compression: CompressionType,
    ) -> crate::Result<Self> {
        Ok(Self {
            data_type,
            value_encoding,
            time_encoding,
            time_compression,
            time_encoder: Int64Encoder::new(time_encoding)?,
            value_encoder: ColumnEncoder::new(data_type, value_encoding)?,
            time_stream: ByteStream::new(),
            value_stream: ByteStream::new(),
            nulls: Vec::new(),
            statistics: Statistics::new(data_type),
            point_count: 0,
        })
    }

    /// Appends one timestamp slot, with or without a value.
    pub fn write(&mut self, ts: i64, value: Option<&Value>) -> crate::Result<()> {
        self.time_encoder.encode(ts, &mut self.time_stream)?;
        self.statistics.cover_time(ts);

        match value {
            Some(v) => {
                self.value_encoder.encode(v, &mut self.value_stream)?;
                self.statistics.update(v);
                self.nulls.push(false);
            }
            None => self.nulls.push(true),
        }

        self.point_count += 1;
        Ok(())
    }

    /// Number of timestamp slots buffered.
    pub fn point_count(&self) -> u32 {
        self.point_count
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    /// Rough in-memory size of the buffered page.
    pub fn estimated_size(&self) -> usize {
        self.time_stream.total_size() + self.value_stream.total_size() + self.nulls.len() / 8
    }

    /// Encodes, compresses and drains the buffered page.
    pub fn seal(&mut self, compression: CompressionType) -> crate::Result<SealedPage> {
        self.time_encoder.flush(&mut self.time_stream)?;
        self.value_encoder.flush(&mut self.value_stream)?;

        let time_bytes = self.time_stream.to_vec();
        let mut time_compressed = Vec::with_capacity(time_bytes.len());
        self.time_compression
            .compress(&time_bytes, &mut time_compressed)?;

        let value_bytes = self.value_stream.to_vec();

        let mut bitmap = Bitmap::new(self.nulls.len(), false);
        for (idx, is_null) in self.nulls.iter().enumerate() {
            if *is_null {
                bitmap.set(idx);
            }
        }

        let mut body = Vec::with_capacity(
            2 + 20 + time_compressed.len() + bitmap.bytes().len() + value_bytes.len(),
        );
        body.push(self.time_encoding.into());
        body.push(self.time_compression.into());

        #[allow(clippy::cast_possible_truncation)]
        body.write_u32_varint(time_bytes.len() as u32)?;

        #[allow(clippy::cast_possible_truncation)]
        body.write_u32_varint(time_compressed.len() as u32)?;
        body.extend_from_slice(&time_compressed);

        #[allow(clippy::cast_possible_truncation)]
        body.write_u32_varint(bitmap.bytes().len() as u32)?;
        body.extend_from_slice(bitmap.bytes());

        body.extend_from_slice(&value_bytes);

        let mut compressed = Vec::with_capacity(body.len());
        compression.compress(&body, &mut compressed)?;

        let sealed = SealedPage {
            #[allow(clippy::cast_possible_truncation)]
            uncompressed_size: body.len() as u32,
            data: compressed,
            statistics: std::mem::replace(&mut self.statistics, Statistics::new(self.data_type)),
        };

        // fresh encoders for the next page
        self.time_encoder = Int64Encoder::new(self.time_encoding)?;
        self.value_encoder = ColumnEncoder::new(self.data_type, self.value_encoding)?;
        self.time_stream.clear();
        self.value_stream.clear();
        self.nulls.clear();
        self.point_count = 0;

        Ok(sealed)
    }
}
