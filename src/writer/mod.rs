// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

pub(crate) mod chunk;
pub(crate) mod page;

use crate::{
    coding::Encode,
    file::{CountingWriter, WriteFile, MAGIC_BYTES, VERSION_BYTE},
    filter::BloomFilter,
    meta::{
        write_index_tree, MetadataIndexNodeType, SchemaTable, TableMeta, TimeseriesIndex,
    },
    tablet::NULL_TAG_SENTINEL,
    ColumnCategory, Config, TSEncoding, TableSchema, Tablet, TsRecord, Value,
};
use byteorder::{BigEndian, WriteBytesExt};
use chunk::{ChunkGroupHeader, ChunkWriter};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Buffered chunk writers of one device's open chunk group
struct DeviceBuffer {
    table_key: String,
    chunk_writers: BTreeMap<String, ChunkWriter>,
}

/// Writes a TS-file: routes tablets into per-device chunk groups and
/// emits the metadata footer on close.
///
/// One writer owns one file; concurrent use is not supported. After an
/// I/O error the writer is poisoned and every further call returns the
/// recorded error.
pub struct TsFileWriter<W: Write> {
    sink: CountingWriter<W>,
    config: Config,
    tables: BTreeMap<String, TableSchema>,
    column_owner: FxHashMap<String, String>,
    groups: BTreeMap<String, DeviceBuffer>,
    series: BTreeMap<String, BTreeMap<String, BTreeMap<String, TimeseriesIndex>>>,
    last_time: FxHashMap<String, i64>,
    poison: Option<(std::io::ErrorKind, String)>,
}

impl TsFileWriter<WriteFile> {
    /// Creates a writer over a new file at `path` (truncating an
    /// existing one).
    pub fn create(
        path: impl AsRef<Path>,
        schema: Option<TableSchema>,
        config: Config,
    ) -> crate::Result<Self> {
        Self::new(WriteFile::open(path, false)?, schema, config)
    }

    /// Creates a writer over a new file at `path`, failing with
    /// `AlreadyExist` if the file exists.
    pub fn create_new(
        path: impl AsRef<Path>,
        schema: Option<TableSchema>,
        config: Config,
    ) -> crate::Result<Self> {
        Self::new(WriteFile::open(path, true)?, schema, config)
    }
}

impl<W: Write> TsFileWriter<W> {
    /// Creates a writer over an arbitrary sink, writing the leading
    /// magic immediately. An optional schema is registered on the spot.
    pub fn new(sink: W, schema: Option<TableSchema>, config: Config) -> crate::Result<Self> {
        let mut sink = CountingWriter::new(sink);
        sink.write_all(&MAGIC_BYTES)?;
        sink.write_all(&[VERSION_BYTE])?;

        let mut writer = Self {
            sink,
            config,
            tables: BTreeMap::new(),
            column_owner: FxHashMap::default(),
            groups: BTreeMap::new(),
            series: BTreeMap::new(),
            last_time: FxHashMap::default(),
            poison: None,
        };

        if let Some(schema) = schema {
            writer.register_table(schema)?;
        }

        Ok(writer)
    }

    fn check_poison(&self) -> crate::Result<()> {
        match &self.poison {
            Some((kind, message)) => Err(crate::Error::Io(std::io::Error::new(
                *kind,
                message.clone(),
            ))),
            None => Ok(()),
        }
    }

    fn poison_on_io(&mut self, error: &crate::Error) {
        if let crate::Error::Io(e) = error {
            self.poison = Some((e.kind(), e.to_string()));
        }
    }

    /// Registers a table schema.
    ///
    /// Rejects duplicate table names, column names already claimed by
    /// another table, and illegal `(type, encoding)` combinations. TAG
    /// columns must be STRING (enforced at [`TableSchema::new`]).
    pub fn register_table(&mut self, schema: TableSchema) -> crate::Result<()> {
        let key = schema.table_name.to_ascii_lowercase();

        if self.tables.contains_key(&key) {
            return Err(crate::Error::InvalidSchema(format!(
                "table {:?} is already registered",
                schema.table_name,
            )));
        }

        for column in &schema.columns {
            if !column.encoding.supports(column.data_type) {
                return Err(crate::Error::NotSupport("encoding for data type"));
            }

            let column_key = column.name.to_ascii_lowercase();
            if let Some(owner) = self.column_owner.get(&column_key) {
                return Err(crate::Error::InvalidSchema(format!(
                    "column {:?} already belongs to table {owner:?}",
                    column.name,
                )));
            }
        }

        for column in &schema.columns {
            self.column_owner
                .insert(column.name.to_ascii_lowercase(), key.clone());
        }

        self.tables.insert(key, schema);
        Ok(())
    }

    /// Registered schema of a table, if any.
    #[must_use]
    pub fn table_schema(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(&table.to_ascii_lowercase())
    }

    /// Writes one tablet against its registered table schema.
    ///
    /// Rows are grouped by device; timestamps must be non-decreasing per
    /// device, both within the tablet and against everything previously
    /// written for that device. A failed validation leaves the file
    /// untouched.
    pub fn write_table(&mut self, tablet: &Tablet) -> crate::Result<()> {
        self.check_poison()?;

        let key = tablet.target_name().to_ascii_lowercase();
        let Some(schema) = self.tables.get(&key) else {
            return Err(crate::Error::TableNotExist(tablet.target_name().into()));
        };

        let rows = tablet.row_count();
        if rows == 0 {
            return Ok(());
        }

        // bind tablet columns to schema columns
        let mut bindings = Vec::with_capacity(tablet.columns().len());
        for (tablet_idx, column) in tablet.columns().iter().enumerate() {
            let Some((schema_idx, schema_column)) = schema.column(column.name()) else {
                return Err(crate::Error::ColumnNotExist(column.name().into()));
            };

            if schema_column.data_type != column.data_type() {
                return Err(crate::Error::TypeNotMatch(
                    schema_column.data_type,
                    column.data_type(),
                ));
            }

            bindings.push((tablet_idx, schema_idx));
        }

        let tag_bindings: Vec<(usize, Option<usize>)> = schema
            .tag_indexes()
            .iter()
            .map(|schema_idx| {
                let tablet_idx = bindings
                    .iter()
                    .find(|(_, s)| s == schema_idx)
                    .map(|(t, _)| *t);
                (*schema_idx, tablet_idx)
            })
            .collect();

        let field_bindings: Vec<(usize, usize)> = bindings
            .iter()
            .filter(|(_, schema_idx)| {
                schema
                    .columns
                    .get(*schema_idx)
                    .is_some_and(|c| c.category == ColumnCategory::Field)
            })
            .copied()
            .collect();

        let device_of = |row: usize| -> String {
            let mut id = schema.table_name.clone();

            for (_, tablet_idx) in &tag_bindings {
                id.push('.');

                match tablet_idx.and_then(|idx| tablet.get_value(row, idx)) {
                    Some(Value::Bytes(bytes)) => {
                        id.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Some(_) => {}
                    None => match tablet_idx {
                        // bound but null renders as the sentinel
                        Some(idx) if tablet.is_null(row, *idx) => {
                            id.push_str(NULL_TAG_SENTINEL);
                        }
                        // missing tag column renders empty
                        _ => {}
                    },
                }
            }

            id
        };

        // validate ordering for the whole tablet before mutating anything
        let devices: Vec<String> = (0..rows).map(device_of).collect();
        let mut seen_last: FxHashMap<&str, i64> = FxHashMap::default();

        for (row, device) in devices.iter().enumerate() {
            let ts = tablet.timestamp(row).unwrap_or(0);

            let previous = seen_last
                .get(device.as_str())
                .or_else(|| self.last_time.get(device))
                .copied();

            if let Some(previous) = previous {
                if ts < previous {
                    return Err(crate::Error::OutOfOrder(device.clone(), previous, ts));
                }
            }

            seen_last.insert(device.as_str(), ts);
        }

        // commit
        for (row, device) in devices.iter().enumerate() {
            let ts = tablet.timestamp(row).unwrap_or(0);

            let buffer = self
                .groups
                .entry(device.clone())
                .or_insert_with(|| DeviceBuffer {
                    table_key: key.clone(),
                    chunk_writers: BTreeMap::new(),
                });

            for (tablet_idx, schema_idx) in &field_bindings {
                let Some(column) = schema.columns.get(*schema_idx) else {
                    continue;
                };

                use std::collections::btree_map::Entry;

                let writer = match buffer.chunk_writers.entry(column.name().to_owned()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let encoding = if column.encoding == TSEncoding::Plain {
                            self.config.encoding_for(column.data_type)
                        } else {
                            column.encoding
                        };

                        let compression =
                            if column.compression == crate::CompressionType::Uncompressed {
                                self.config.default_compression
                            } else {
                                column.compression
                            };

                        entry.insert(ChunkWriter::new(
                            column.name(),
                            column.data_type,
                            encoding,
                            compression,
                            self.config.time_encoding,
                            self.config.time_compression,
                            self.config.page_max_point_num,
                            self.config.page_max_size,
                        )?)
                    }
                };

                match tablet.get_value(row, *tablet_idx) {
                    Some(value) => writer.write(ts, Some(&value))?,
                    None => writer.write_null(ts)?,
                }
            }
        }

        for (device, ts) in seen_last {
            self.last_time.insert(device.to_owned(), ts);
        }

        if self.buffered_bytes() > self.config.chunk_group_size_threshold {
            self.flush()?;
        }

        Ok(())
    }

    /// Path-structured variant: the tablet's target name is taken as the
    /// device id directly (a tag-less table).
    pub fn write_tablet(&mut self, tablet: &Tablet) -> crate::Result<()> {
        self.write_table(tablet)
    }

    /// Writes a single record as a one-row tablet.
    pub fn write_record(&mut self, record: &TsRecord) -> crate::Result<()> {
        self.check_poison()?;

        let key = record.target_name.to_ascii_lowercase();
        let Some(schema) = self.tables.get(&key) else {
            return Err(crate::Error::TableNotExist(record.target_name.clone()));
        };

        let mut columns = Vec::new();
        let mut seen = FxHashMap::default();

        for (measurement, value) in &record.points {
            let Some((_, schema_column)) = schema.column(measurement) else {
                return Err(crate::Error::ColumnNotExist(measurement.clone()));
            };

            if schema_column.data_type.type_class() != value.type_class() {
                let got = match value.type_class() {
                    crate::TypeClass::Bool => crate::TSDataType::Boolean,
                    crate::TypeClass::Int => crate::TSDataType::Int32,
                    crate::TypeClass::Long => crate::TSDataType::Int64,
                    crate::TypeClass::Float => crate::TSDataType::Float,
                    crate::TypeClass::Double => crate::TSDataType::Double,
                    crate::TypeClass::Bytes => crate::TSDataType::String,
                };

                return Err(crate::Error::TypeNotMatch(schema_column.data_type, got));
            }

            if seen
                .insert(measurement.to_ascii_lowercase(), ())
                .is_none()
            {
                columns.push(schema_column.clone());
            }
        }

        let mut tablet = Tablet::new(record.target_name.clone(), columns, 1)?;
        tablet.add_timestamp(0, record.timestamp)?;

        for (measurement, value) in &record.points {
            tablet.add_value(0, measurement.as_str(), value.clone())?;
        }

        self.write_table(&tablet)
    }

    /// In-memory bytes held by open chunk writers.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.groups
            .values()
            .flat_map(|b| b.chunk_writers.values())
            .map(ChunkWriter::memory_size)
            .sum()
    }

    /// Seals all open chunk groups and writes them to the sink.
    pub fn flush(&mut self) -> crate::Result<()> {
        self.check_poison()?;

        let result = self.flush_groups();
        if let Err(e) = &result {
            self.poison_on_io(e);
        }
        result
    }

    fn flush_groups(&mut self) -> crate::Result<()> {
        let groups = std::mem::take(&mut self.groups);

        for (device, buffer) in groups {
            let writers: Vec<(String, ChunkWriter)> = buffer
                .chunk_writers
                .into_iter()
                .filter(|(_, writer)| !writer.is_empty())
                .collect();

            if writers.is_empty() {
                continue;
            }

            ChunkGroupHeader {
                device_id: device.clone(),
            }
            .encode_into(&mut self.sink)?;

            let chunk_count = writers.len();

            for (measurement, writer) in writers {
                let metadata = writer.seal_chunk(&mut self.sink)?;

                self.series
                    .entry(buffer.table_key.clone())
                    .or_default()
                    .entry(device.clone())
                    .or_default()
                    .entry(measurement.clone())
                    .or_insert_with(|| TimeseriesIndex {
                        measurement,
                        data_type: metadata.data_type,
                        chunks: Vec::new(),
                    })
                    .chunks
                    .push(metadata);
            }

            log::debug!("sealed chunk group device={device} chunks={chunk_count}");
        }

        Ok(())
    }

    /// Flushes, emits the footer (index trees, schema table, bloom
    /// filter) and the trailing magic.
    pub fn close(mut self) -> crate::Result<()> {
        self.flush()?;

        let result = self.write_footer();
        if let Err(e) = &result {
            self.poison_on_io(e);
        }
        result
    }

    fn write_footer(&mut self) -> crate::Result<()> {
        let mut schema_table = SchemaTable::default();

        for (key, schema) in &self.tables {
            let empty = BTreeMap::new();
            let devices = self.series.get(key).unwrap_or(&empty);

            let mut device_entries = Vec::with_capacity(devices.len());

            for (device, measurements) in devices {
                let mut measurement_entries = Vec::with_capacity(measurements.len());

                for (measurement, ts_index) in measurements {
                    let offset = self.sink.position();
                    ts_index.encode_into(&mut self.sink)?;
                    measurement_entries.push((measurement.clone(), offset));
                }

                let measurement_root = write_index_tree(
                    &measurement_entries,
                    MetadataIndexNodeType::LeafMeasurement,
                    MetadataIndexNodeType::InternalMeasurement,
                    self.config.max_degree_of_index_node,
                    &mut self.sink,
                )?;

                device_entries.push((device.clone(), measurement_root));
            }

            let root_offset = write_index_tree(
                &device_entries,
                MetadataIndexNodeType::LeafDevice,
                MetadataIndexNodeType::InternalDevice,
                self.config.max_degree_of_index_node,
                &mut self.sink,
            )?;

            schema_table.tables.push(TableMeta {
                name: schema.table_name.clone(),
                columns: schema.columns.clone(),
                root_offset,
            });
        }

        let footer_start = self.sink.position();
        schema_table.encode_into(&mut self.sink)?;

        let keys: Vec<String> = self
            .series
            .values()
            .flat_map(|devices| {
                devices.iter().flat_map(|(device, measurements)| {
                    measurements
                        .keys()
                        .map(move |measurement| format!("{device}.{measurement}"))
                })
            })
            .collect();

        let mut bloom =
            BloomFilter::with_error_rate(self.config.bloom_filter_error_rate, keys.len());
        for key in &keys {
            bloom.add(key);
        }
        bloom.serialize_into(&mut self.sink)?;

        #[allow(clippy::cast_possible_truncation)]
        let footer_length = (self.sink.position() - footer_start) as u32;
        self.sink.write_u32::<BigEndian>(footer_length)?;
        self.sink.write_all(&MAGIC_BYTES)?;
        self.sink.flush()?;

        log::debug!(
            "closed ts-file: {} bytes, {} tables, {} series",
            self.sink.position(),
            self.tables.len(),
            keys.len(),
        );

        Ok(())
    }
}
