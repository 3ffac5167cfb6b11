// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    bitmap::Bitmap,
    coding::Decode,
    encoding::{ColumnDecoder, Int64Decoder},
    file::{RandomAccess, SectionReader},
    meta::ChunkMetadata,
    stream::ByteStream,
    writer::chunk::{ChunkHeader, PageHeader},
    CompressionType, TSEncoding, Value,
};
use std::io::{BufReader, Read};
use varint_rs::VarintReader;

/// Loads one chunk and decodes every page overlapping `[t0, t1]` into
/// `(timestamp, value)` slots, null slots included.
pub(crate) fn read_chunk_points<R: RandomAccess + ?Sized>(
    source: &R,
    file_size: u64,
    meta: &ChunkMetadata,
    t0: i64,
    t1: i64,
) -> crate::Result<Vec<(i64, Option<Value>)>> {
    let mut reader = BufReader::new(SectionReader::new(source, meta.offset, file_size));
    let header = ChunkHeader::decode_from(&mut reader)?;

    if header.data_type != meta.data_type || header.encoding != meta.encoding {
        return Err(crate::Error::CorruptChunk(
            "chunk header disagrees with metadata".into(),
        ));
    }

    let mut body = vec![0u8; header.total_body_size as usize];
    reader.read_exact(&mut body)?;

    let single_page = header.is_single_page();
    let mut cursor = std::io::Cursor::new(body);
    let mut points = Vec::new();
    let mut pages_seen = 0u32;

    while cursor.position() < cursor.get_ref().len() as u64 {
        let page_header = PageHeader::decode_from(&mut cursor, header.data_type, !single_page)?;

        let mut data = vec![0u8; page_header.compressed_size as usize];
        cursor.read_exact(&mut data)?;
        pages_seen += 1;

        // page-level pruning where statistics are present
        if let Some(statistics) = &page_header.statistics {
            if statistics.end_time() < t0 || statistics.start_time() > t1 {
                continue;
            }
        }

        let page_body = header
            .compression
            .decompress(&data, page_header.uncompressed_size as usize)?;

        decode_page(&page_body, &header, &mut points)?;
    }

    if pages_seen != meta.num_pages {
        return Err(crate::Error::CorruptChunk(format!(
            "expected {} pages, found {pages_seen}",
            meta.num_pages,
        )));
    }

    Ok(points)
}

fn decode_page(
    body: &[u8],
    header: &ChunkHeader,
    out: &mut Vec<(i64, Option<Value>)>,
) -> crate::Result<()> {
    let mut stream = ByteStream::from_vec(body.to_vec());

    let mut time_encoding_tag = [0u8];
    if stream.read_into(&mut time_encoding_tag) != 1 {
        return Err(crate::Error::CorruptChunk("truncated page body".into()));
    }

    let time_encoding = TSEncoding::try_from(time_encoding_tag[0])?;
    if !matches!(time_encoding, TSEncoding::Plain | TSEncoding::Ts2Diff) {
        return Err(crate::Error::CorruptChunk("bad time encoding".into()));
    }

    let mut time_compression_tag = [0u8];
    if stream.read_into(&mut time_compression_tag) != 1 {
        return Err(crate::Error::CorruptChunk("truncated page body".into()));
    }
    let time_compression = CompressionType::try_from(time_compression_tag[0])?;

    let time_unc_len = stream.read_u32_varint()? as usize;
    let time_comp_len = stream.read_u32_varint()? as usize;

    let mut time_compressed = vec![0u8; time_comp_len];
    if stream.read_into(&mut time_compressed) != time_comp_len {
        return Err(crate::Error::CorruptChunk("truncated time stream".into()));
    }

    let time_bytes = time_compression.decompress(&time_compressed, time_unc_len)?;

    let mut times = Vec::new();
    let mut time_src = ByteStream::from_vec(time_bytes);
    let mut time_decoder = Int64Decoder::new(time_encoding)?;
    while time_decoder.has_next(&mut time_src)? {
        times.push(time_decoder.read(&mut time_src)?);
    }

    let bitmap_len = stream.read_u32_varint()? as usize;
    let mut bitmap_bytes = vec![0u8; bitmap_len];
    if stream.read_into(&mut bitmap_bytes) != bitmap_len {
        return Err(crate::Error::CorruptChunk("truncated null bitmap".into()));
    }

    if bitmap_len * 8 < times.len() {
        return Err(crate::Error::CorruptChunk("short null bitmap".into()));
    }

    let nulls = Bitmap::from_bytes(bitmap_bytes, times.len());

    let mut value_bytes = vec![0u8; stream.remaining()];
    let got = stream.read_into(&mut value_bytes);
    value_bytes.truncate(got);

    let mut value_src = ByteStream::from_vec(value_bytes);
    let mut value_decoder = ColumnDecoder::new(header.data_type, header.encoding)?;

    out.reserve(times.len());
    for (slot, ts) in times.iter().enumerate() {
        if nulls.get(slot) {
            out.push((*ts, None));
        } else {
            out.push((*ts, Some(value_decoder.read(&mut value_src)?)));
        }
    }

    Ok(())
}
