// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::chunk::read_chunk_points;
use crate::{file::RandomAccess, meta::ChunkMetadata, ColumnId, TSDataType, Value};
use std::collections::VecDeque;

fn value_kind(value: &Value) -> TSDataType {
    match value {
        Value::Boolean(_) => TSDataType::Boolean,
        Value::Int32(_) => TSDataType::Int32,
        Value::Int64(_) => TSDataType::Int64,
        Value::Float(_) => TSDataType::Float,
        Value::Double(_) => TSDataType::Double,
        Value::Bytes(_) => TSDataType::String,
    }
}

/// Column names and types of a result set; column 0 is always
/// `time: INT64`, followed by the requested TAG columns and then the
/// requested FIELD columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultSetMetadata {
    columns: Vec<(String, TSDataType)>,
}

impl ResultSetMetadata {
    pub(crate) fn new(columns: Vec<(String, TSDataType)>) -> Self {
        Self { columns }
    }

    /// Number of result columns, time included.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Name of a column.
    #[must_use]
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|(name, _)| name.as_str())
    }

    /// Data type of a column.
    #[must_use]
    pub fn column_type(&self, index: usize) -> Option<TSDataType> {
        self.columns.get(index).map(|(_, data_type)| *data_type)
    }

    fn resolve(&self, column: ColumnId<'_>) -> crate::Result<usize> {
        match column {
            ColumnId::Index(index) => {
                if index < self.columns.len() {
                    Ok(index)
                } else {
                    Err(crate::Error::ColumnNotExist(format!("#{index}")))
                }
            }
            ColumnId::Name(name) => self
                .columns
                .iter()
                .position(|(n, _)| n.eq_ignore_ascii_case(name))
                .ok_or_else(|| crate::Error::ColumnNotExist(name.into())),
        }
    }
}

/// Ordered `(timestamp, value)` stream of one column of one device,
/// loading one chunk at a time.
pub(crate) struct PointStream<'r, R: RandomAccess + ?Sized> {
    source: &'r R,
    file_size: u64,
    chunks: Vec<ChunkMetadata>,
    next_chunk: usize,
    buffer: VecDeque<(i64, Option<Value>)>,
    t0: i64,
    t1: i64,
}

impl<'r, R: RandomAccess + ?Sized> PointStream<'r, R> {
    pub fn new(
        source: &'r R,
        file_size: u64,
        chunks: Vec<ChunkMetadata>,
        t0: i64,
        t1: i64,
    ) -> Self {
        Self {
            source,
            file_size,
            chunks,
            next_chunk: 0,
            buffer: VecDeque::new(),
            t0,
            t1,
        }
    }

    fn fill(&mut self) {
        while self.buffer.is_empty() {
            let Some(meta) = self.chunks.get(self.next_chunk) else {
                return;
            };
            self.next_chunk += 1;

            match read_chunk_points(self.source, self.file_size, meta, self.t0, self.t1) {
                Ok(points) => {
                    self.buffer.extend(
                        points
                            .into_iter()
                            .filter(|(ts, _)| (self.t0..=self.t1).contains(ts)),
                    );
                }
                Err(e) => {
                    // a corrupt chunk fails alone; the stream advances
                    log::warn!("skipping corrupt chunk at {}: {e}", meta.offset);
                }
            }
        }
    }

    pub fn peek_ts(&mut self) -> Option<i64> {
        self.fill();
        self.buffer.front().map(|(ts, _)| *ts)
    }

    /// Consumes every point at `ts`; of duplicates, the last non-null
    /// value wins (later writes shadow earlier ones).
    pub fn take_at(&mut self, ts: i64) -> Option<Value> {
        let mut value = None;

        loop {
            match self.peek_ts() {
                Some(front) if front == ts => {
                    if let Some((_, v)) = self.buffer.pop_front() {
                        if v.is_some() {
                            value = v;
                        }
                    }
                }
                _ => break,
            }
        }

        value
    }
}

/// All column streams of one device, merged by timestamp.
pub(crate) struct DeviceCursor<'r, R: RandomAccess + ?Sized> {
    pub tag_values: Vec<Option<String>>,
    pub streams: Vec<PointStream<'r, R>>,
}

impl<R: RandomAccess + ?Sized> DeviceCursor<'_, R> {
    fn next_row(&mut self) -> Option<(i64, Vec<Option<Value>>)> {
        let ts = self
            .streams
            .iter_mut()
            .filter_map(PointStream::peek_ts)
            .min()?;

        let values = self
            .streams
            .iter_mut()
            .map(|stream| match stream.peek_ts() {
                Some(front) if front == ts => stream.take_at(ts),
                _ => None,
            })
            .collect();

        Some((ts, values))
    }
}

/// Row-oriented query result, ordered by `(device, timestamp)`.
///
/// String cells returned by [`ResultSet::get_string`] and
/// [`ResultSet::get_binary`] borrow from the current row and are
/// invalidated by the next [`ResultSet::next`] call; copy them out with
/// `to_owned` to keep them.
pub struct ResultSet<'r, R: RandomAccess + ?Sized> {
    metadata: ResultSetMetadata,
    tag_count: usize,
    devices: Vec<DeviceCursor<'r, R>>,
    current_device: usize,
    row_time: i64,
    row_cells: Vec<Option<Value>>,
    has_row: bool,
}

impl<'r, R: RandomAccess + ?Sized> ResultSet<'r, R> {
    pub(crate) fn new(
        metadata: ResultSetMetadata,
        tag_count: usize,
        devices: Vec<DeviceCursor<'r, R>>,
    ) -> Self {
        Self {
            metadata,
            tag_count,
            devices,
            current_device: 0,
            row_time: 0,
            row_cells: Vec::new(),
            has_row: false,
        }
    }

    /// Advances to the next row; `false` once the result is exhausted.
    pub fn next(&mut self) -> crate::Result<bool> {
        while let Some(cursor) = self.devices.get_mut(self.current_device) {
            if let Some((ts, field_values)) = cursor.next_row() {
                self.row_time = ts;

                self.row_cells.clear();
                for tag in &cursor.tag_values {
                    self.row_cells
                        .push(tag.clone().map(|t| Value::Bytes(t.into_bytes())));
                }
                self.row_cells.extend(field_values);

                self.has_row = true;
                return Ok(true);
            }

            self.current_device += 1;
        }

        self.has_row = false;
        Ok(false)
    }

    /// Column names and types.
    #[must_use]
    pub fn metadata(&self) -> &ResultSetMetadata {
        &self.metadata
    }

    fn cell(&self, column: ColumnId<'_>) -> crate::Result<(usize, Option<&Value>)> {
        if !self.has_row {
            return Err(crate::Error::InvalidQuery(
                "no current row; call next() first".into(),
            ));
        }

        let index = self.metadata.resolve(column)?;
        if index == 0 {
            return Ok((0, None));
        }

        Ok((index, self.row_cells.get(index - 1).and_then(Option::as_ref)))
    }

    fn require_value(&self, column: ColumnId<'_>) -> crate::Result<&Value> {
        let (_, value) = self.cell(column)?;
        value.ok_or_else(|| {
            crate::Error::InvalidArg("column value is null; check is_null()".into())
        })
    }

    /// Whether the cell is null (the time column never is).
    pub fn is_null<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<bool> {
        let (index, value) = self.cell(column.into())?;
        Ok(index != 0 && value.is_none())
    }

    /// Timestamp of the current row.
    pub fn timestamp(&self) -> crate::Result<i64> {
        if self.has_row {
            Ok(self.row_time)
        } else {
            Err(crate::Error::InvalidQuery(
                "no current row; call next() first".into(),
            ))
        }
    }

    /// Reads a BOOLEAN cell.
    pub fn get_bool<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<bool> {
        match self.require_value(column.into())? {
            Value::Boolean(v) => Ok(*v),
            other => Err(crate::Error::TypeNotMatch(
                TSDataType::Boolean,
                value_kind(other),
            )),
        }
    }

    /// Reads an INT32 / DATE cell.
    pub fn get_int<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<i32> {
        match self.require_value(column.into())? {
            Value::Int32(v) => Ok(*v),
            other => Err(crate::Error::TypeNotMatch(
                TSDataType::Int32,
                value_kind(other),
            )),
        }
    }

    /// Reads an INT64 / TIMESTAMP cell; column 0 reads the row time.
    pub fn get_long<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<i64> {
        let column = column.into();
        let (index, _) = self.cell(column)?;

        if index == 0 {
            return self.timestamp();
        }

        match self.require_value(column)? {
            Value::Int64(v) => Ok(*v),
            other => Err(crate::Error::TypeNotMatch(
                TSDataType::Int64,
                value_kind(other),
            )),
        }
    }

    /// Reads a FLOAT cell.
    pub fn get_float<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<f32> {
        match self.require_value(column.into())? {
            Value::Float(v) => Ok(*v),
            other => Err(crate::Error::TypeNotMatch(
                TSDataType::Float,
                value_kind(other),
            )),
        }
    }

    /// Reads a DOUBLE cell.
    pub fn get_double<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<f64> {
        match self.require_value(column.into())? {
            Value::Double(v) => Ok(*v),
            other => Err(crate::Error::TypeNotMatch(
                TSDataType::Double,
                value_kind(other),
            )),
        }
    }

    /// Reads a STRING / TEXT cell as UTF-8, borrowed from the current
    /// row.
    pub fn get_string<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<&str> {
        match self.require_value(column.into())? {
            Value::Bytes(v) => std::str::from_utf8(v)
                .map_err(|_| crate::Error::InvalidArg("cell is not valid UTF-8".into())),
            other => Err(crate::Error::TypeNotMatch(
                TSDataType::String,
                value_kind(other),
            )),
        }
    }

    /// Reads a BLOB cell, borrowed from the current row.
    pub fn get_binary<'a>(&self, column: impl Into<ColumnId<'a>>) -> crate::Result<&[u8]> {
        match self.require_value(column.into())? {
            Value::Bytes(v) => Ok(v.as_slice()),
            other => Err(crate::Error::TypeNotMatch(
                TSDataType::Blob,
                value_kind(other),
            )),
        }
    }

    /// Number of requested TAG columns.
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.tag_count
    }
}
