// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A columnar, single-file time-series storage format.
//!
//! A TS-file holds ordered, typed, timestamped observations for one or
//! more logical *tables*. Rows are written through in-memory [`Tablet`]s,
//! routed into per-device chunk groups of per-column chunks, and sealed
//! with a self-describing footer (per-table metadata-index trees, the
//! table-schema table and a bloom filter). Closed files are immutable;
//! many concurrent readers per file are fine, one writer per file.
//!
//! # Example usage
//!
//! ```
//! use tsfile::{
//!     ColumnSchema, Config, TSDataType, TableSchema, Tablet, TsFileReader, TsFileWriter,
//! };
//! #
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("demo.tsfile");
//!
//! let schema = TableSchema::new(
//!     "sensors",
//!     vec![
//!         ColumnSchema::tag("device"),
//!         ColumnSchema::new("temperature", TSDataType::Double),
//!     ],
//! )?;
//!
//! let mut writer = TsFileWriter::create(&path, Some(schema), Config::default())?;
//!
//! let mut tablet = Tablet::new(
//!     "sensors",
//!     vec![
//!         ColumnSchema::tag("device"),
//!         ColumnSchema::new("temperature", TSDataType::Double),
//!     ],
//!     16,
//! )?;
//!
//! for row in 0..16 {
//!     tablet.add_timestamp(row, row as i64)?;
//!     tablet.add_value(row, "device", "kitchen")?;
//!     tablet.add_value(row, "temperature", 20.0 + row as f64 / 10.0)?;
//! }
//!
//! writer.write_table(&tablet)?;
//! writer.close()?;
//!
//! let reader = TsFileReader::open(&path)?;
//! let mut rows = reader.query("sensors", &["device", "temperature"], 0, 100)?;
//!
//! while rows.next()? {
//!     let t = rows.get_long("time")?;
//!     let device = rows.get_string("device")?;
//!     let temperature = rows.get_double("temperature")?;
//!     assert_eq!(20.0 + t as f64 / 10.0, temperature);
//!     assert_eq!("kitchen", device);
//! }
//! #
//! # Ok::<(), tsfile::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::cargo)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]

pub mod arena;
mod bitmap;
mod coding;
mod compression;
mod config;
mod data_type;
mod encoding;
mod error;
mod file;
mod filter;
mod hash;
mod meta;
mod reader;
mod schema;
mod statistics;
pub mod stream;
mod tablet;
mod writer;

pub use compression::CompressionType;
pub use config::Config;
pub use data_type::{date_to_int, int_to_date, TSDataType, TypeClass, Value};
pub use encoding::TSEncoding;
pub use error::{Error, Result, StatusCode};
pub use file::{RandomAccess, WriteFile};
pub use filter::BloomFilter;
pub use meta::{ChunkMetadata, TableMeta, TimeseriesIndex};
pub use reader::{ResultSet, ResultSetMetadata, TableQueryOrdering, TsFileReader};
pub use schema::{ColumnCategory, ColumnSchema, TableSchema};
pub use statistics::Statistics;
pub use tablet::{ColumnId, Tablet, TsRecord, NULL_TAG_SENTINEL};
pub use writer::TsFileWriter;
