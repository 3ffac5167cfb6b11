// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::page::{PageWriter, SealedPage};
use crate::{
    coding::{read_str, write_str, Decode, Encode},
    file::CountingWriter,
    meta::ChunkMetadata,
    CompressionType, Statistics, TSDataType, TSEncoding, Value,
};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Marker opening a chunk-group header
pub(crate) const MARKER_CHUNK_GROUP: u8 = 0x00;

/// Marker of a chunk whose body is a single page (page headers omit
/// statistics)
pub(crate) const MARKER_SINGLE_PAGE_CHUNK: u8 = 0x01;

/// Marker of a chunk with multiple pages
pub(crate) const MARKER_MULTI_PAGE_CHUNK: u8 = 0x05;

/// Header prefixed to every chunk group, naming the device
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ChunkGroupHeader {
    pub device_id: String,
}

impl Encode for ChunkGroupHeader {
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writer.write_u8(MARKER_CHUNK_GROUP)?;
        write_str(writer, self.device_id.as_bytes())?;
        Ok(())
    }
}

impl Decode for ChunkGroupHeader {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let marker = reader.read_u8()?;
        if marker != MARKER_CHUNK_GROUP {
            return Err(crate::Error::CorruptChunk(format!(
                "bad chunk group marker {marker:#04x}"
            )));
        }

        let device_id = String::from_utf8(read_str(reader)?)
            .map_err(|_| crate::Error::CorruptChunk("non-utf8 device id".into()))?;

        Ok(Self { device_id })
    }
}

/// Header prefixed to every chunk
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ChunkHeader {
    pub marker: u8,
    pub measurement: String,
    pub total_body_size: u32,
    pub data_type: TSDataType,
    pub compression: CompressionType,
    pub encoding: TSEncoding,
}

impl ChunkHeader {
    pub fn is_single_page(&self) -> bool {
        self.marker == MARKER_SINGLE_PAGE_CHUNK
    }
}

impl Encode for ChunkHeader {
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writer.write_u8(self.marker)?;
        write_str(writer, self.measurement.as_bytes())?;
        writer.write_u32_varint(self.total_body_size)?;
        writer.write_u8(self.data_type.into())?;
        writer.write_u8(self.compression.into())?;
        writer.write_u8(self.encoding.into())?;
        Ok(())
    }
}

impl Decode for ChunkHeader {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let marker = reader.read_u8()?;
        if marker != MARKER_SINGLE_PAGE_CHUNK && marker != MARKER_MULTI_PAGE_CHUNK {
            return Err(crate::Error::CorruptChunk(format!(
                "bad chunk marker {marker:#04x}"
            )));
        }

        let measurement = String::from_utf8(read_str(reader)?)
            .map_err(|_| crate::Error::CorruptChunk("non-utf8 measurement".into()))?;
        let total_body_size = reader.read_u32_varint()?;
        let data_type = TSDataType::try_from(reader.read_u8()?)?;
        let compression = CompressionType::try_from(reader.read_u8()?)?;
        let encoding = TSEncoding::try_from(reader.read_u8()?)?;

        Ok(Self {
            marker,
            measurement,
            total_body_size,
            data_type,
            compression,
            encoding,
        })
    }
}

/// Header prefixed to every page inside a chunk body.
///
/// Single-page chunks omit the statistics block; the chunk-level
/// statistics cover it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PageHeader {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub statistics: Option<Statistics>,
}

impl PageHeader {
    pub fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writer.write_u32_varint(self.uncompressed_size)?;
        writer.write_u32_varint(self.compressed_size)?;

        if let Some(statistics) = &self.statistics {
            statistics.encode_into(writer)?;
        }

        Ok(())
    }

    pub fn decode_from<R: Read>(
        reader: &mut R,
        data_type: TSDataType,
        with_statistics: bool,
    ) -> crate::Result<Self> {
        let uncompressed_size = reader.read_u32_varint()?;
        let compressed_size = reader.read_u32_varint()?;

        let statistics = if with_statistics {
            Some(Statistics::decode_from(reader, data_type)?)
        } else {
            None
        };

        Ok(Self {
            uncompressed_size,
            compressed_size,
            statistics,
        })
    }
}

/// Writes one column's chunk within one chunk group: fills pages, seals
/// them on threshold, then emits the chunk as header + page bodies.
pub(crate) struct ChunkWriter {
    measurement: String,
    data_type: TSDataType,
    encoding: TSEncoding,
    compression: CompressionType,
    page: PageWriter,
    sealed_pages: Vec<SealedPage>,
    statistics: Statistics,
    max_page_points: u32,
    max_page_size: u32,
}

impl ChunkWriter {
    pub fn new(
        measurement: impl Into<String>,
        data_type: TSDataType,
        encoding: TSEncoding,
        compression: CompressionType,
        time_encoding: TSEncoding,
        time_compression: CompressionType,
        max_page_points: u32,
        max_page_size: u32,
    ) -> crate::Result<Self> {
        Ok(Self {
            measurement: measurement.into(),
            data_type,
            encoding,
            compression,
            page: PageWriter::new(data_type, encoding, time_encoding, time_compression)?,
            sealed_pages: Vec::new(),
            statistics: Statistics::new(data_type),
            max_page_points,
            max_page_size,
        })
    }

    /// Appends one point.
    pub fn write(&mut self, ts: i64, value: Option<&Value>) -> crate::Result<()> {
        self.page.write(ts, value)?;

        if self.page.point_count() >= self.max_page_points
            || self.page.estimated_size() >= self.max_page_size as usize
        {
            self.seal_page()?;
        }

        Ok(())
    }

    /// Appends one null slot.
    pub fn write_null(&mut self, ts: i64) -> crate::Result<()> {
        self.write(ts, None)
    }

    fn seal_page(&mut self) -> crate::Result<()> {
        if self.page.is_empty() {
            return Ok(());
        }

        let sealed = self.page.seal(self.compression)?;
        self.statistics.merge(&sealed.statistics);
        self.sealed_pages.push(sealed);

        Ok(())
    }

    /// Rough in-memory footprint of buffered and sealed pages.
    pub fn memory_size(&self) -> usize {
        self.page.estimated_size() + self.sealed_pages.iter().map(|p| p.data.len()).sum::<usize>()
    }

    /// Whether any point was written at all.
    pub fn is_empty(&self) -> bool {
        self.page.is_empty() && self.sealed_pages.is_empty()
    }

    /// Seals the final page and writes the whole chunk to the sink.
    pub fn seal_chunk<W: Write>(
        mut self,
        sink: &mut CountingWriter<W>,
    ) -> crate::Result<ChunkMetadata> {
        self.seal_page()?;

        if self.sealed_pages.is_empty() {
            return Err(crate::Error::InvalidArg(
                "cannot seal a chunk without points".into(),
            ));
        }

        let multi_page = self.sealed_pages.len() > 1;

        let mut body = Vec::new();
        for page in &self.sealed_pages {
            let header = PageHeader {
                uncompressed_size: page.uncompressed_size,

                #[allow(clippy::cast_possible_truncation)]
                compressed_size: page.data.len() as u32,

                statistics: multi_page.then(|| page.statistics.clone()),
            };
            header.encode_into(&mut body)?;
            body.extend_from_slice(&page.data);
        }

        let offset = sink.position();

        let header = ChunkHeader {
            marker: if multi_page {
                MARKER_MULTI_PAGE_CHUNK
            } else {
                MARKER_SINGLE_PAGE_CHUNK
            },
            measurement: self.measurement.clone(),

            #[allow(clippy::cast_possible_truncation)]
            total_body_size: body.len() as u32,

            data_type: self.data_type,
            compression: self.compression,
            encoding: self.encoding,
        };
        header.encode_into(sink)?;
        sink.write_all(&body)?;

        log::trace!(
            "sealed chunk measurement={} pages={} body={}B",
            self.measurement,
            self.sealed_pages.len(),
            body.len(),
        );

        Ok(ChunkMetadata {
            offset,
            data_type: self.data_type,
            encoding: self.encoding,
            compression: self.compression,

            #[allow(clippy::cast_possible_truncation)]
            num_pages: self.sealed_pages.len() as u32,

            statistics: self.statistics,
        })
    }
}
