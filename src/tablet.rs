// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    arena::{ArenaRef, ModId, PageArena},
    bitmap::Bitmap,
    ColumnCategory, ColumnSchema, TSDataType, TypeClass, Value,
};
use rustc_hash::FxHashMap;

/// Sentinel component a null tag renders to inside a device identity
pub const NULL_TAG_SENTINEL: &str = "null";

const ARENA_SLAB_SIZE: usize = 16 * 1024;

/// Column selector: by index or by name (ASCII case-insensitive)
#[derive(Copy, Clone, Debug)]
pub enum ColumnId<'a> {
    /// 0-based column index
    Index(usize),

    /// Column name
    Name(&'a str),
}

impl From<usize> for ColumnId<'_> {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl<'a> From<&'a str> for ColumnId<'a> {
    fn from(value: &'a str) -> Self {
        Self::Name(value)
    }
}

enum ColumnValues {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Bytes(Vec<ArenaRef>),
}

impl ColumnValues {
    fn new(data_type: TSDataType, capacity: usize) -> Self {
        match data_type.type_class() {
            TypeClass::Bool => Self::Boolean(vec![false; capacity]),
            TypeClass::Int => Self::Int32(vec![0; capacity]),
            TypeClass::Long => Self::Int64(vec![0; capacity]),
            TypeClass::Float => Self::Float(vec![0.0; capacity]),
            TypeClass::Double => Self::Double(vec![0.0; capacity]),
            TypeClass::Bytes => Self::Bytes(vec![
                ArenaRef::default();
                capacity
            ]),
        }
    }
}

/// Row-oriented, typed write buffer for one table (or one device, in the
/// path-structured mode).
///
/// String values are interned into a tablet-owned arena and released
/// together with the tablet.
pub struct Tablet {
    target_name: String,
    columns: Vec<ColumnSchema>,
    name_index: FxHashMap<String, usize>,
    timestamps: Vec<i64>,
    values: Vec<ColumnValues>,
    nulls: Vec<Bitmap>,
    arena: PageArena,
    max_rows: usize,
    cur_rows: usize,
}

impl Tablet {
    /// Creates a tablet for `max_rows` rows over the given columns.
    ///
    /// # Errors
    ///
    /// `InvalidArg` if two columns share a name (case-insensitive).
    pub fn new(
        target_name: impl Into<String>,
        columns: Vec<ColumnSchema>,
        max_rows: usize,
    ) -> crate::Result<Self> {
        assert!(max_rows > 0, "tablet capacity must be positive");

        let mut name_index = FxHashMap::default();
        for (idx, column) in columns.iter().enumerate() {
            if name_index
                .insert(column.name.to_ascii_lowercase(), idx)
                .is_some()
            {
                return Err(crate::Error::InvalidArg(format!(
                    "duplicate column name {:?}",
                    column.name,
                )));
            }
        }

        let values = columns
            .iter()
            .map(|c| ColumnValues::new(c.data_type, max_rows))
            .collect();

        let nulls = columns.iter().map(|_| Bitmap::new(max_rows, true)).collect();

        Ok(Self {
            target_name: target_name.into(),
            columns,
            name_index,
            timestamps: vec![0; max_rows],
            values,
            nulls,
            arena: PageArena::new(ARENA_SLAB_SIZE, ModId::Tablet),
            max_rows,
            cur_rows: 0,
        })
    }

    /// Table name (or device id in path-structured mode).
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Renames the write target.
    pub fn set_target_name(&mut self, name: impl Into<String>) {
        self.target_name = name.into();
    }

    /// Column schemas in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Row capacity.
    #[must_use]
    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// High-water mark over all row writes.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.cur_rows
    }

    fn resolve(&self, column: ColumnId<'_>) -> crate::Result<usize> {
        match column {
            ColumnId::Index(idx) => {
                if idx < self.columns.len() {
                    Ok(idx)
                } else {
                    Err(crate::Error::OutOfRange(
                        idx as u32,
                        self.columns.len() as u32,
                    ))
                }
            }
            ColumnId::Name(name) => self
                .name_index
                .get(&name.to_ascii_lowercase())
                .copied()
                .ok_or_else(|| crate::Error::InvalidArg(format!("unknown column {name:?}"))),
        }
    }

    /// Sets the timestamp of a row, growing the high-water mark.
    pub fn add_timestamp(&mut self, row: usize, timestamp: i64) -> crate::Result<()> {
        let Some(slot) = self.timestamps.get_mut(row) else {
            return Err(crate::Error::OutOfRange(
                row as u32,
                self.max_rows as u32,
            ));
        };

        *slot = timestamp;
        self.cur_rows = self.cur_rows.max(row + 1);
        Ok(())
    }

    /// Timestamp of a row.
    #[must_use]
    pub fn timestamp(&self, row: usize) -> Option<i64> {
        self.timestamps.get(..self.cur_rows)?.get(row).copied()
    }

    /// Sets a cell value.
    ///
    /// The value class must match the column type exactly (no widening);
    /// a mismatch returns `TypeNotMatch` and leaves the null bit set.
    pub fn add_value<'a, V: Into<Value>>(
        &mut self,
        row: usize,
        column: impl Into<ColumnId<'a>>,
        value: V,
    ) -> crate::Result<()> {
        let col = self.resolve(column.into())?;

        if row >= self.max_rows {
            return Err(crate::Error::OutOfRange(
                row as u32,
                self.max_rows as u32,
            ));
        }

        let value: Value = value.into();

        #[allow(clippy::expect_used)]
        let column_schema = self.columns.get(col).expect("resolved index is valid");

        if value.type_class() != column_schema.data_type.type_class() {
            return Err(crate::Error::TypeNotMatch(
                column_schema.data_type,
                probe_data_type(&value),
            ));
        }

        match (self.values.get_mut(col), value) {
            (Some(ColumnValues::Boolean(cells)), Value::Boolean(v)) => {
                if let Some(cell) = cells.get_mut(row) {
                    *cell = v;
                }
            }
            (Some(ColumnValues::Int32(cells)), Value::Int32(v)) => {
                if let Some(cell) = cells.get_mut(row) {
                    *cell = v;
                }
            }
            (Some(ColumnValues::Int64(cells)), Value::Int64(v)) => {
                if let Some(cell) = cells.get_mut(row) {
                    *cell = v;
                }
            }
            (Some(ColumnValues::Float(cells)), Value::Float(v)) => {
                if let Some(cell) = cells.get_mut(row) {
                    *cell = v;
                }
            }
            (Some(ColumnValues::Double(cells)), Value::Double(v)) => {
                if let Some(cell) = cells.get_mut(row) {
                    *cell = v;
                }
            }
            (Some(ColumnValues::Bytes(cells)), Value::Bytes(v)) => {
                let interned = self.arena.intern(&v);
                if let Some(cell) = cells.get_mut(row) {
                    *cell = interned;
                }
            }
            _ => unreachable!("type class was checked above"),
        }

        if let Some(nulls) = self.nulls.get_mut(col) {
            nulls.clear(row);
        }

        Ok(())
    }

    /// Reads a cell back; `None` if the cell is null or out of range.
    #[must_use]
    pub fn get_value(&self, row: usize, col: usize) -> Option<Value> {
        if row >= self.cur_rows || self.nulls.get(col)?.get(row) {
            return None;
        }

        Some(match self.values.get(col)? {
            ColumnValues::Boolean(cells) => Value::Boolean(*cells.get(row)?),
            ColumnValues::Int32(cells) => Value::Int32(*cells.get(row)?),
            ColumnValues::Int64(cells) => Value::Int64(*cells.get(row)?),
            ColumnValues::Float(cells) => Value::Float(*cells.get(row)?),
            ColumnValues::Double(cells) => Value::Double(*cells.get(row)?),
            ColumnValues::Bytes(cells) => {
                Value::Bytes(self.arena.get(*cells.get(row)?).to_vec())
            }
        })
    }

    /// Whether a cell is null.
    #[must_use]
    pub fn is_null(&self, row: usize, col: usize) -> bool {
        self.nulls.get(col).is_none_or(|bits| bits.get(row))
    }

    /// Device identity components of a row: the target name followed by
    /// each TAG value in declared order (`None` for a null tag).
    #[must_use]
    pub fn device_id(&self, row: usize) -> Vec<Option<String>> {
        let mut components = vec![Some(self.target_name.clone())];

        for (idx, column) in self.columns.iter().enumerate() {
            if column.category != ColumnCategory::Tag {
                continue;
            }

            let component = match self.get_value(row, idx) {
                Some(Value::Bytes(bytes)) => {
                    Some(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => None,
            };
            components.push(component);
        }

        components
    }

    /// Dot-joined device identity of a row; a null tag renders as the
    /// `null` sentinel, an empty tag as an empty component.
    #[must_use]
    pub fn device_id_string(&self, row: usize) -> String {
        self.device_id(row)
            .iter()
            .map(|c| c.as_deref().unwrap_or(NULL_TAG_SENTINEL).to_owned())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Clears all rows for reuse; interned strings are released.
    pub fn reset(&mut self) {
        self.cur_rows = 0;
        self.timestamps.fill(0);
        for nulls in &mut self.nulls {
            nulls.fill(true);
        }
        self.arena.reset();
    }
}

fn probe_data_type(value: &Value) -> TSDataType {
    match value {
        Value::Boolean(_) => TSDataType::Boolean,
        Value::Int32(_) => TSDataType::Int32,
        Value::Int64(_) => TSDataType::Int64,
        Value::Float(_) => TSDataType::Float,
        Value::Double(_) => TSDataType::Double,
        Value::Bytes(_) => TSDataType::String,
    }
}

/// A single `(device, timestamp, points)` record; sugar over a one-row
/// tablet.
#[derive(Clone, Debug)]
pub struct TsRecord {
    pub(crate) target_name: String,
    pub(crate) timestamp: i64,
    pub(crate) points: Vec<(String, Value)>,
}

impl TsRecord {
    /// Creates an empty record.
    pub fn new(timestamp: i64, target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            timestamp,
            points: Vec::new(),
        }
    }

    /// Appends one `(measurement, value)` point.
    pub fn add_point(&mut self, measurement: impl Into<String>, value: impl Into<Value>) {
        self.points.push((measurement.into(), value.into()));
    }

    /// Record timestamp.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Write target (table or device).
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// All points added so far.
    #[must_use]
    pub fn points(&self) -> &[(String, Value)] {
        &self.points
    }
}
