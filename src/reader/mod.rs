// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

pub(crate) mod chunk;
mod result_set;

pub use result_set::{ResultSet, ResultSetMetadata};

use crate::{
    coding::Decode,
    file::{read_exact_at, RandomAccess, SectionReader, MAGIC_BYTES, VERSION_BYTE},
    filter::BloomFilter,
    meta::{collect_leaf_entries, lookup_index_key, SchemaTable, TableMeta, TimeseriesIndex},
    tablet::NULL_TAG_SENTINEL,
    ColumnCategory, ColumnSchema, TSDataType,
};
use byteorder::{BigEndian, ReadBytesExt};
use result_set::{DeviceCursor, PointStream};
use std::io::BufReader;
use std::path::Path;

/// Requested ordering of query results
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TableQueryOrdering {
    /// Rows ordered by `(device, timestamp)`
    #[default]
    Device,

    /// Rows ordered by timestamp across devices (declared, not
    /// supported)
    Time,
}

/// Reads a closed TS-file: parses the footer once on open, then serves
/// table queries.
///
/// A reader holds read-only state; many independent readers over the
/// same file are safe.
pub struct TsFileReader<R: RandomAccess> {
    source: R,
    file_size: u64,
    schema_table: SchemaTable,
    bloom: BloomFilter,
}

impl TsFileReader<std::fs::File> {
    /// Opens a TS-file from disk.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();

        let file = std::fs::File::open(path).map_err(|source| crate::Error::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_source(file)
    }
}

impl<R: RandomAccess> TsFileReader<R> {
    /// Opens a TS-file over any random-access source.
    pub fn from_source(source: R) -> crate::Result<Self> {
        let file_size = source.len()?;

        // leading magic + version, footer length, trailing magic
        if file_size < (MAGIC_BYTES.len() as u64 + 1) + 4 + MAGIC_BYTES.len() as u64 {
            return Err(crate::Error::InvalidFile("file too small"));
        }

        let head = read_exact_at(&source, 0, MAGIC_BYTES.len() + 1)?;
        if head.get(..MAGIC_BYTES.len()) != Some(&MAGIC_BYTES[..]) {
            return Err(crate::Error::InvalidFile("bad leading magic"));
        }
        if head.get(MAGIC_BYTES.len()) != Some(&VERSION_BYTE) {
            return Err(crate::Error::InvalidFile("unsupported format version"));
        }

        let tail_offset = file_size - MAGIC_BYTES.len() as u64;
        let tail = read_exact_at(&source, tail_offset, MAGIC_BYTES.len())?;
        if tail != MAGIC_BYTES {
            return Err(crate::Error::InvalidFile("bad trailing magic"));
        }

        let footer_length_offset = tail_offset - 4;
        let footer_length = u64::from(
            (&mut &read_exact_at(&source, footer_length_offset, 4)?[..])
                .read_u32::<BigEndian>()?,
        );

        let footer_start = footer_length_offset
            .checked_sub(footer_length)
            .ok_or(crate::Error::InvalidFile("bad footer length"))?;

        let mut footer = BufReader::new(SectionReader::new(
            &source,
            footer_start,
            footer_length_offset,
        ));

        let schema_table = SchemaTable::decode_from(&mut footer)?;
        let bloom = BloomFilter::deserialize_from(&mut footer)?;

        log::debug!(
            "opened ts-file: {file_size} bytes, {} tables",
            schema_table.tables.len(),
        );

        Ok(Self {
            source,
            file_size,
            schema_table,
            bloom,
        })
    }

    /// Names of all tables in the file.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.schema_table
            .tables
            .iter()
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Schema-table entry of a table (ASCII case-insensitive).
    #[must_use]
    pub fn table_meta(&self, table: &str) -> Option<&TableMeta> {
        self.schema_table
            .tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(table))
    }

    /// Chunk-level metadata (statistics included) of one series, without
    /// touching any page data.
    pub fn timeseries_index(
        &self,
        table: &str,
        device: &str,
        measurement: &str,
    ) -> crate::Result<Option<TimeseriesIndex>> {
        let Some(meta) = self.table_meta(table) else {
            return Err(crate::Error::TableNotExist(table.into()));
        };

        let Some(measurement_root) =
            lookup_index_key(&self.source, meta.root_offset, self.file_size, device)?
        else {
            return Ok(None);
        };

        let Some(offset) = lookup_index_key(
            &self.source,
            measurement_root,
            self.file_size,
            measurement,
        )?
        else {
            return Ok(None);
        };

        let mut reader =
            BufReader::new(SectionReader::new(&self.source, offset, self.file_size));
        Ok(Some(TimeseriesIndex::decode_from(&mut reader)?))
    }

    /// Projects `columns` of `table` over `[t0, t1]`, ordered by device
    /// then time.
    pub fn query(
        &self,
        table: &str,
        columns: &[&str],
        t0: i64,
        t1: i64,
    ) -> crate::Result<ResultSet<'_, R>> {
        self.query_ordered(table, columns, t0, t1, TableQueryOrdering::Device)
    }

    /// Like [`TsFileReader::query`] with an explicit result ordering.
    pub fn query_ordered(
        &self,
        table: &str,
        columns: &[&str],
        t0: i64,
        t1: i64,
        ordering: TableQueryOrdering,
    ) -> crate::Result<ResultSet<'_, R>> {
        if ordering == TableQueryOrdering::Time {
            return Err(crate::Error::UnsupportedOrder);
        }

        let Some(meta) = self.table_meta(table) else {
            return Err(crate::Error::TableNotExist(table.into()));
        };

        // resolve requested columns against the schema
        let mut tag_columns: Vec<&ColumnSchema> = Vec::new();
        let mut field_columns: Vec<&ColumnSchema> = Vec::new();

        for requested in columns {
            let Some(column) = meta
                .columns
                .iter()
                .find(|c| c.name().eq_ignore_ascii_case(requested))
            else {
                return Err(crate::Error::ColumnNotExist((*requested).into()));
            };

            match column.category() {
                ColumnCategory::Tag => tag_columns.push(column),
                ColumnCategory::Field => field_columns.push(column),
            }
        }

        let mut result_columns = vec![("time".to_owned(), TSDataType::Int64)];
        for column in &tag_columns {
            result_columns.push((column.name().to_owned(), column.data_type()));
        }
        for column in &field_columns {
            result_columns.push((column.name().to_owned(), column.data_type()));
        }

        let schema_tag_names: Vec<&str> = meta
            .columns
            .iter()
            .filter(|c| c.category() == ColumnCategory::Tag)
            .map(ColumnSchema::name)
            .collect();

        let devices =
            collect_leaf_entries(&self.source, meta.root_offset, self.file_size)?;

        let mut cursors = Vec::new();

        for (device, measurement_root) in devices {
            let mut streams = Vec::with_capacity(field_columns.len());
            let mut any_chunks = false;

            for column in &field_columns {
                let bloom_key = format!("{device}.{}", column.name());

                let chunks = if self.bloom.might_contain(&bloom_key) {
                    match lookup_index_key(
                        &self.source,
                        measurement_root,
                        self.file_size,
                        column.name(),
                    )? {
                        Some(offset) => {
                            let mut reader = BufReader::new(SectionReader::new(
                                &self.source,
                                offset,
                                self.file_size,
                            ));
                            let index = TimeseriesIndex::decode_from(&mut reader)?;

                            index
                                .chunks
                                .into_iter()
                                .filter(|c| {
                                    c.statistics.start_time() <= t1
                                        && c.statistics.end_time() >= t0
                                })
                                .collect()
                        }
                        None => Vec::new(),
                    }
                } else {
                    Vec::new()
                };

                any_chunks = any_chunks || !chunks.is_empty();
                streams.push(PointStream::new(&self.source, self.file_size, chunks, t0, t1));
            }

            if !any_chunks {
                continue;
            }

            let tag_values =
                parse_device_tags(&device, &meta.name, &schema_tag_names, &tag_columns);

            cursors.push(DeviceCursor {
                tag_values,
                streams,
            });
        }

        Ok(ResultSet::new(
            ResultSetMetadata::new(result_columns),
            tag_columns.len(),
            cursors,
        ))
    }
}

/// Splits a dot-joined device id back into the requested tag values.
///
/// The `null` sentinel parses back to a null tag; an empty component to
/// an empty string.
fn parse_device_tags(
    device: &str,
    table_name: &str,
    schema_tag_names: &[&str],
    requested_tags: &[&ColumnSchema],
) -> Vec<Option<String>> {
    let tag_count = schema_tag_names.len();

    let components: Vec<&str> = if tag_count == 0 {
        Vec::new()
    } else {
        device
            .get(table_name.len().saturating_add(1)..)
            .map(|rest| rest.splitn(tag_count, '.').collect())
            .unwrap_or_default()
    };

    requested_tags
        .iter()
        .map(|requested| {
            let position = schema_tag_names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(requested.name()));

            match position.and_then(|p| components.get(p)) {
                Some(&value) if value != NULL_TAG_SENTINEL => Some(value.to_owned()),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn garbage_is_not_a_tsfile() {
        let garbage: Vec<u8> = b"definitely not a time series file".to_vec();

        assert!(matches!(
            TsFileReader::from_source(garbage),
            Err(crate::Error::InvalidFile(_)),
        ));
    }

    #[test]
    fn tiny_file_rejected() {
        assert!(matches!(
            TsFileReader::from_source(b"TsFile\x03".to_vec()),
            Err(crate::Error::InvalidFile(_)),
        ));
    }

    #[test]
    fn device_tag_parsing() {
        let id = ColumnSchema::tag("id");
        let region = ColumnSchema::tag("region");
        let requested = vec![&region, &id];

        let tags = parse_device_tags(
            "tbl.dev1.eu",
            "tbl",
            &["id", "region"],
            &requested,
        );
        assert_eq!(
            vec![Some("eu".to_owned()), Some("dev1".to_owned())],
            tags,
        );

        // null sentinel and empty tags
        let tags = parse_device_tags("tbl.null.", "tbl", &["id", "region"], &requested);
        assert_eq!(vec![Some(String::new()), None], tags);
    }
}
