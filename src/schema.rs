// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{CompressionType, TSDataType, TSEncoding};
use rustc_hash::FxHashMap;

/// Role of a column inside a table
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ColumnCategory {
    /// Part of the device identity; must be STRING
    Tag = 0,

    /// Measurement value
    Field = 1,
}

impl From<ColumnCategory> for u8 {
    fn from(value: ColumnCategory) -> Self {
        value as Self
    }
}

impl TryFrom<u8> for ColumnCategory {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Tag),
            1 => Ok(Self::Field),
            _ => Err(crate::Error::InvalidFile("unknown column category tag")),
        }
    }
}

/// Schema of a single column
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub(crate) name: String,
    pub(crate) data_type: TSDataType,
    pub(crate) encoding: TSEncoding,
    pub(crate) compression: CompressionType,
    pub(crate) category: ColumnCategory,
}

impl ColumnSchema {
    /// Creates a FIELD column with PLAIN encoding and no compression.
    pub fn new(name: impl Into<String>, data_type: TSDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            encoding: TSEncoding::Plain,
            compression: CompressionType::Uncompressed,
            category: ColumnCategory::Field,
        }
    }

    /// Creates a TAG column (STRING, PLAIN, uncompressed).
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: TSDataType::String,
            encoding: TSEncoding::Plain,
            compression: CompressionType::Uncompressed,
            category: ColumnCategory::Tag,
        }
    }

    /// Sets the column encoding.
    #[must_use]
    pub fn use_encoding(mut self, encoding: TSEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the column compression.
    #[must_use]
    pub fn use_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the column category.
    #[must_use]
    pub fn use_category(mut self, category: ColumnCategory) -> Self {
        self.category = category;
        self
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column data type.
    #[must_use]
    pub fn data_type(&self) -> TSDataType {
        self.data_type
    }

    /// Column encoding.
    #[must_use]
    pub fn encoding(&self) -> TSEncoding {
        self.encoding
    }

    /// Column compression.
    #[must_use]
    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Column category.
    #[must_use]
    pub fn category(&self) -> ColumnCategory {
        self.category
    }
}

/// Ordered column list of one table
#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema {
    pub(crate) table_name: String,
    pub(crate) columns: Vec<ColumnSchema>,
    name_index: FxHashMap<String, usize>,
}

impl TableSchema {
    /// Creates a table schema.
    ///
    /// # Errors
    ///
    /// `InvalidArg` if two columns share a name (comparison is ASCII
    /// case-insensitive); `InvalidSchema` if a TAG column is not STRING.
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnSchema>) -> crate::Result<Self> {
        let table_name = table_name.into();
        let mut name_index = FxHashMap::default();

        for (idx, column) in columns.iter().enumerate() {
            if column.category == ColumnCategory::Tag && column.data_type != TSDataType::String {
                return Err(crate::Error::InvalidSchema(format!(
                    "tag column {:?} must be STRING, got {}",
                    column.name, column.data_type,
                )));
            }

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

        Ok(Self {
            table_name,
            columns,
            name_index,
        })
    }

    /// Table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// All columns, in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Looks up a column by name (ASCII case-insensitive).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<(usize, &ColumnSchema)> {
        let idx = *self.name_index.get(&name.to_ascii_lowercase())?;
        self.columns.get(idx).map(|c| (idx, c))
    }

    /// Indexes of all TAG columns, in declaration order.
    #[must_use]
    pub fn tag_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.category == ColumnCategory::Tag)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indexes of all FIELD columns, in declaration order.
    #[must_use]
    pub fn field_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.category == ColumnCategory::Field)
            .map(|(i, _)| i)
            .collect()
    }
}
