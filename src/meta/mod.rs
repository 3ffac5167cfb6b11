// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Footer metadata: per-column chunk metadata, per-table metadata-index
//! trees and the table-schema table.

use crate::{
    coding::{read_str, write_str, Decode, Encode},
    file::{CountingWriter, RandomAccess, SectionReader},
    ColumnCategory, ColumnSchema, CompressionType, Statistics, TSDataType, TSEncoding,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{BufReader, Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Location and shape of one chunk of one column
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkMetadata {
    /// Absolute file offset of the chunk header
    pub offset: u64,

    /// Column data type
    pub data_type: TSDataType,

    /// Column encoding
    pub encoding: TSEncoding,

    /// Page compression
    pub compression: CompressionType,

    /// Number of pages in the chunk body
    pub num_pages: u32,

    /// Chunk-level statistics
    pub statistics: Statistics,
}

impl Encode for ChunkMetadata {
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writer.write_u64::<BigEndian>(self.offset)?;
        writer.write_u8(self.data_type.into())?;
        writer.write_u8(self.encoding.into())?;
        writer.write_u8(self.compression.into())?;
        writer.write_u32_varint(self.num_pages)?;
        self.statistics.encode_into(writer)?;
        Ok(())
    }
}

impl Decode for ChunkMetadata {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let offset = reader.read_u64::<BigEndian>()?;
        let data_type = TSDataType::try_from(reader.read_u8()?)?;
        let encoding = TSEncoding::try_from(reader.read_u8()?)?;
        let compression = CompressionType::try_from(reader.read_u8()?)?;
        let num_pages = reader.read_u32_varint()?;
        let statistics = Statistics::decode_from(reader, data_type)?;

        Ok(Self {
            offset,
            data_type,
            encoding,
            compression,
            num_pages,
            statistics,
        })
    }
}

/// All chunks of one `(device, measurement)` series
#[derive(Clone, Debug, PartialEq)]
pub struct TimeseriesIndex {
    /// Measurement (column) name
    pub measurement: String,

    /// Column data type
    pub data_type: TSDataType,

    /// Chunk metadata in file order
    pub chunks: Vec<ChunkMetadata>,
}

impl Encode for TimeseriesIndex {
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        write_str(writer, self.measurement.as_bytes())?;
        writer.write_u8(self.data_type.into())?;

        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32_varint(self.chunks.len() as u32)?;

        for chunk in &self.chunks {
            chunk.encode_into(writer)?;
        }

        Ok(())
    }
}

impl Decode for TimeseriesIndex {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let measurement = String::from_utf8(read_str(reader)?)
            .map_err(|_| crate::Error::InvalidFile("non-utf8 measurement name"))?;
        let data_type = TSDataType::try_from(reader.read_u8()?)?;

        let count = reader.read_u32_varint()? as usize;
        let mut chunks = Vec::with_capacity(count);
        for _ in 0..count {
            chunks.push(ChunkMetadata::decode_from(reader)?);
        }

        Ok(Self {
            measurement,
            data_type,
            chunks,
        })
    }
}

/// Level of a metadata-index node
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MetadataIndexNodeType {
    /// Internal node of a device tree
    InternalDevice = 0,

    /// Leaf node of a device tree
    LeafDevice = 1,

    /// Internal node of a measurement tree
    InternalMeasurement = 2,

    /// Leaf node of a measurement tree
    LeafMeasurement = 3,
}

impl From<MetadataIndexNodeType> for u8 {
    fn from(value: MetadataIndexNodeType) -> Self {
        value as Self
    }
}

impl TryFrom<u8> for MetadataIndexNodeType {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::InternalDevice),
            1 => Ok(Self::LeafDevice),
            2 => Ok(Self::InternalMeasurement),
            3 => Ok(Self::LeafMeasurement),
            _ => Err(crate::Error::InvalidFile("unknown index node type")),
        }
    }
}

impl MetadataIndexNodeType {
    fn is_internal(self) -> bool {
        matches!(self, Self::InternalDevice | Self::InternalMeasurement)
    }
}

/// One node of a metadata-index tree: sorted `(key, offset)` entries.
///
/// Internal nodes point at child nodes; leaves point at measurement-tree
/// roots (device trees) or [`TimeseriesIndex`] records (measurement
/// trees).
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataIndexNode {
    /// Node level
    pub node_type: MetadataIndexNodeType,

    /// Sorted entries; the key of an internal entry is the first key of
    /// its subtree
    pub entries: Vec<(String, u64)>,
}

impl Encode for MetadataIndexNode {
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        writer.write_u8(self.node_type.into())?;

        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32_varint(self.entries.len() as u32)?;

        for (key, offset) in &self.entries {
            write_str(writer, key.as_bytes())?;
            writer.write_u64::<BigEndian>(*offset)?;
        }

        Ok(())
    }
}

impl Decode for MetadataIndexNode {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let node_type = MetadataIndexNodeType::try_from(reader.read_u8()?)?;

        let count = reader.read_u32_varint()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let key = String::from_utf8(read_str(reader)?)
                .map_err(|_| crate::Error::InvalidFile("non-utf8 index key"))?;
            let offset = reader.read_u64::<BigEndian>()?;
            entries.push((key, offset));
        }

        Ok(Self { node_type, entries })
    }
}

/// Writes a metadata-index tree bottom-up over sorted leaf entries.
///
/// Leaves are emitted first, then each internal level; a node holds at
/// most `max_degree` entries and the first key of each child becomes its
/// separator in the parent. Returns the root offset.
pub(crate) fn write_index_tree<W: Write>(
    entries: &[(String, u64)],
    leaf_type: MetadataIndexNodeType,
    internal_type: MetadataIndexNodeType,
    max_degree: usize,
    sink: &mut CountingWriter<W>,
) -> crate::Result<u64> {
    debug_assert!(max_degree >= 2);
    debug_assert!(entries.windows(2).all(|w| match w {
        [a, b] => a.0 <= b.0,
        _ => true,
    }));

    if entries.is_empty() {
        let offset = sink.position();
        MetadataIndexNode {
            node_type: leaf_type,
            entries: Vec::new(),
        }
        .encode_into(sink)?;
        return Ok(offset);
    }

    let mut level: Vec<(String, u64)> = Vec::new();

    for group in entries.chunks(max_degree) {
        let offset = sink.position();
        MetadataIndexNode {
            node_type: leaf_type,
            entries: group.to_vec(),
        }
        .encode_into(sink)?;

        if let Some((first_key, _)) = group.first() {
            level.push((first_key.clone(), offset));
        }
    }

    while level.len() > 1 {
        let mut next = Vec::new();

        for group in level.chunks(max_degree) {
            let offset = sink.position();
            MetadataIndexNode {
                node_type: internal_type,
                entries: group.to_vec(),
            }
            .encode_into(sink)?;

            if let Some((first_key, _)) = group.first() {
                next.push((first_key.clone(), offset));
            }
        }

        level = next;
    }

    level
        .first()
        .map(|(_, offset)| *offset)
        .ok_or(crate::Error::InvalidFile("empty index level"))
}

fn read_node<R: RandomAccess + ?Sized>(
    source: &R,
    offset: u64,
    end: u64,
) -> crate::Result<MetadataIndexNode> {
    let mut reader = BufReader::new(SectionReader::new(source, offset, end));
    MetadataIndexNode::decode_from(&mut reader)
}

/// Collects all leaf entries of an index tree in key order.
pub(crate) fn collect_leaf_entries<R: RandomAccess + ?Sized>(
    source: &R,
    root_offset: u64,
    end: u64,
) -> crate::Result<Vec<(String, u64)>> {
    let mut collected = Vec::new();
    let mut stack = vec![root_offset];
    let mut levels = Vec::new();

    while let Some(offset) = stack.pop() {
        let node = read_node(source, offset, end)?;

        if node.node_type.is_internal() {
            // children pushed in reverse keep key order on the stack
            for (_, child) in node.entries.iter().rev() {
                stack.push(*child);
            }
        } else {
            levels.push(node.entries);
        }
    }

    for entries in levels {
        collected.extend(entries);
    }

    Ok(collected)
}

/// Descends an index tree to the offset stored for `key`.
pub(crate) fn lookup_index_key<R: RandomAccess + ?Sized>(
    source: &R,
    root_offset: u64,
    end: u64,
    key: &str,
) -> crate::Result<Option<u64>> {
    let mut offset = root_offset;

    loop {
        let node = read_node(source, offset, end)?;

        if node.node_type.is_internal() {
            // last entry whose separator key is <= target
            let child = node
                .entries
                .iter()
                .take_while(|(k, _)| k.as_str() <= key)
                .last()
                .map(|(_, child)| *child);

            match child {
                Some(child) => offset = child,
                None => return Ok(None),
            }
        } else {
            return Ok(node
                .entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, target)| *target));
        }
    }
}

/// Schema-table entry of one table
#[derive(Clone, Debug, PartialEq)]
pub struct TableMeta {
    /// Table name
    pub name: String,

    /// Declared columns
    pub columns: Vec<ColumnSchema>,

    /// Root offset of the table's device-index tree
    pub root_offset: u64,
}

/// The footer's table-schema table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaTable {
    /// Per-table metadata, sorted by table name
    pub tables: Vec<TableMeta>,
}

impl Encode for SchemaTable {
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32_varint(self.tables.len() as u32)?;

        for table in &self.tables {
            write_str(writer, table.name.as_bytes())?;

            #[allow(clippy::cast_possible_truncation)]
            writer.write_u32_varint(table.columns.len() as u32)?;

            for column in &table.columns {
                write_str(writer, column.name.as_bytes())?;
                writer.write_u8(column.data_type.into())?;
                writer.write_u8(column.category.into())?;
                writer.write_u8(column.encoding.into())?;
                writer.write_u8(column.compression.into())?;
            }

            writer.write_u64::<BigEndian>(table.root_offset)?;
        }

        Ok(())
    }
}

impl Decode for SchemaTable {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let table_count = reader.read_u32_varint()? as usize;
        let mut tables = Vec::with_capacity(table_count);

        for _ in 0..table_count {
            let name = String::from_utf8(read_str(reader)?)
                .map_err(|_| crate::Error::InvalidFile("non-utf8 table name"))?;

            let column_count = reader.read_u32_varint()? as usize;
            let mut columns = Vec::with_capacity(column_count);

            for _ in 0..column_count {
                let column_name = String::from_utf8(read_str(reader)?)
                    .map_err(|_| crate::Error::InvalidFile("non-utf8 column name"))?;

                let data_type = TSDataType::try_from(reader.read_u8()?)?;
                let category = ColumnCategory::try_from(reader.read_u8()?)?;
                let encoding = TSEncoding::try_from(reader.read_u8()?)?;
                let compression = CompressionType::try_from(reader.read_u8()?)?;

                columns.push(
                    ColumnSchema::new(column_name, data_type)
                        .use_category(category)
                        .use_encoding(encoding)
                        .use_compression(compression),
                );
            }

            let root_offset = reader.read_u64::<BigEndian>()?;

            tables.push(TableMeta {
                name,
                columns,
                root_offset,
            });
        }

        Ok(Self { tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use test_log::test;

    fn demo_stats() -> Statistics {
        let mut stats = Statistics::new(TSDataType::Int64);
        stats.cover_time(5);
        stats.update(&Value::Int64(99));
        stats
    }

    #[test]
    fn chunk_metadata_roundtrip() -> crate::Result<()> {
        let meta = ChunkMetadata {
            offset: 4711,
            data_type: TSDataType::Int64,
            encoding: TSEncoding::Ts2Diff,
            compression: CompressionType::Uncompressed,
            num_pages: 3,
            statistics: demo_stats(),
        };

        let bytes = meta.encode_into_vec()?;
        assert_eq!(meta, ChunkMetadata::decode_from(&mut &bytes[..])?);

        Ok(())
    }

    #[test]
    fn timeseries_index_roundtrip() -> crate::Result<()> {
        let index = TimeseriesIndex {
            measurement: "temperature".into(),
            data_type: TSDataType::Int64,
            chunks: vec![
                ChunkMetadata {
                    offset: 7,
                    data_type: TSDataType::Int64,
                    encoding: TSEncoding::Plain,
                    compression: CompressionType::Uncompressed,
                    num_pages: 1,
                    statistics: demo_stats(),
                },
                ChunkMetadata {
                    offset: 930,
                    data_type: TSDataType::Int64,
                    encoding: TSEncoding::Plain,
                    compression: CompressionType::Uncompressed,
                    num_pages: 2,
                    statistics: demo_stats(),
                },
            ],
        };

        let bytes = index.encode_into_vec()?;
        assert_eq!(index, TimeseriesIndex::decode_from(&mut &bytes[..])?);

        Ok(())
    }

    #[test]
    fn index_node_roundtrip() -> crate::Result<()> {
        let node = MetadataIndexNode {
            node_type: MetadataIndexNodeType::LeafDevice,
            entries: vec![("t1.d1".into(), 100), ("t1.d2".into(), 220)],
        };

        let bytes = node.encode_into_vec()?;
        assert_eq!(node, MetadataIndexNode::decode_from(&mut &bytes[..])?);

        Ok(())
    }

    fn write_tree(
        entries: &[(String, u64)],
        max_degree: usize,
    ) -> crate::Result<(Vec<u8>, u64)> {
        let mut sink = CountingWriter::new(Vec::new());
        let root = write_index_tree(
            entries,
            MetadataIndexNodeType::LeafMeasurement,
            MetadataIndexNodeType::InternalMeasurement,
            max_degree,
            &mut sink,
        )?;
        Ok((sink.into_inner(), root))
    }

    #[test]
    fn single_leaf_tree() -> crate::Result<()> {
        let entries: Vec<(String, u64)> =
            (0..5).map(|i| (format!("s{i}"), i * 10)).collect();

        let (bytes, root) = write_tree(&entries, 256)?;
        assert_eq!(0, root);

        let collected = collect_leaf_entries(&bytes, root, bytes.len() as u64)?;
        assert_eq!(entries, collected);

        assert_eq!(
            Some(30),
            lookup_index_key(&bytes, root, bytes.len() as u64, "s3")?,
        );
        assert_eq!(
            None,
            lookup_index_key(&bytes, root, bytes.len() as u64, "zz")?,
        );

        Ok(())
    }

    #[test]
    fn multi_level_tree() -> crate::Result<()> {
        // 40 keys at degree 3: leaves, internals and a root
        let entries: Vec<(String, u64)> =
            (0..40).map(|i| (format!("k{i:03}"), 1000 + i)).collect();

        let (bytes, root) = write_tree(&entries, 3)?;
        assert!(root > 0);

        let collected = collect_leaf_entries(&bytes, root, bytes.len() as u64)?;
        assert_eq!(entries, collected);

        for (key, offset) in &entries {
            assert_eq!(
                Some(*offset),
                lookup_index_key(&bytes, root, bytes.len() as u64, key)?,
                "lookup {key}",
            );
        }

        assert_eq!(
            None,
            lookup_index_key(&bytes, root, bytes.len() as u64, "a")?,
        );

        Ok(())
    }

    #[test]
    fn empty_tree_has_empty_root() -> crate::Result<()> {
        let (bytes, root) = write_tree(&[], 256)?;

        assert!(collect_leaf_entries(&bytes, root, bytes.len() as u64)?.is_empty());
        Ok(())
    }

    #[test]
    fn schema_table_roundtrip() -> crate::Result<()> {
        let table = SchemaTable {
            tables: vec![TableMeta {
                name: "vehicles".into(),
                columns: vec![
                    ColumnSchema::tag("vin"),
                    ColumnSchema::new("speed", TSDataType::Float)
                        .use_encoding(TSEncoding::Gorilla),
                ],
                root_offset: 123_456,
            }],
        };

        let bytes = table.encode_into_vec()?;
        assert_eq!(table, SchemaTable::decode_from(&mut &bytes[..])?);

        Ok(())
    }
}
