// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{CompressionType, TSDataType};
use std::path::PathBuf;

/// Stable numeric status codes, shared with external callers.
///
/// The numeric values are part of the public contract and must not change.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum StatusCode {
    /// Success
    Ok = 0,

    /// Target file already exists
    AlreadyExist = 1,

    /// File could not be opened (also covers raw I/O errors from the sink)
    OpenErr = 2,

    /// Table schema is malformed
    InvalidSchema = 3,

    /// Invalid argument
    InvalidArg = 4,

    /// Row index beyond tablet capacity
    OutOfRange = 5,

    /// Supplied value type does not match the column type
    TypeNotMatch = 6,

    /// Referenced column is not part of the schema
    ColumnNotExist = 7,

    /// Referenced table is not registered
    TableNotExist = 8,

    /// Timestamps regress for a device
    OutOfOrder = 9,

    /// Supplied buffer too small
    BufNotEnough = 10,

    /// Operation or combination not supported
    NotSupport = 11,

    /// File is not a readable TS-file
    InvalidFile = 12,

    /// Chunk could not be decoded
    CorruptChunk = 13,

    /// Query is malformed
    InvalidQuery = 14,

    /// Requested result ordering is not supported
    UnsupportedOrder = 15,
}

/// Represents errors that can occur in the TS-file engine
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Target file already exists
    AlreadyExist(PathBuf),

    /// File could not be created or opened
    OpenFailed {
        /// Offending path
        path: PathBuf,

        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Table schema is malformed
    InvalidSchema(String),

    /// Invalid argument
    InvalidArg(String),

    /// Row index beyond tablet capacity (index, capacity)
    OutOfRange(u32, u32),

    /// Supplied value type does not match the column type (expected, got)
    TypeNotMatch(TSDataType, TSDataType),

    /// Referenced column is not part of the schema
    ColumnNotExist(String),

    /// Referenced table is not registered
    TableNotExist(String),

    /// Timestamps regress for a device (device, previous, offending)
    OutOfOrder(String, i64, i64),

    /// Supplied buffer too small
    BufNotEnough,

    /// Operation or combination not supported
    NotSupport(&'static str),

    /// File is not a readable TS-file
    InvalidFile(&'static str),

    /// Chunk could not be decoded
    CorruptChunk(String),

    /// Decompression failed
    Decompress(CompressionType),

    /// Query is malformed
    InvalidQuery(String),

    /// Requested result ordering is not supported
    UnsupportedOrder,
}

impl Error {
    /// Returns the stable numeric code of this error.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        match self {
            // The stable code set carries no dedicated I/O code;
            // raw I/O failures surface as OpenErr.
            Self::Io(_) | Self::OpenFailed { .. } => StatusCode::OpenErr,
            Self::AlreadyExist(_) => StatusCode::AlreadyExist,
            Self::InvalidSchema(_) => StatusCode::InvalidSchema,
            Self::InvalidArg(_) => StatusCode::InvalidArg,
            Self::OutOfRange(_, _) => StatusCode::OutOfRange,
            Self::TypeNotMatch(_, _) => StatusCode::TypeNotMatch,
            Self::ColumnNotExist(_) => StatusCode::ColumnNotExist,
            Self::TableNotExist(_) => StatusCode::TableNotExist,
            Self::OutOfOrder(_, _, _) => StatusCode::OutOfOrder,
            Self::BufNotEnough => StatusCode::BufNotEnough,
            Self::NotSupport(_) => StatusCode::NotSupport,
            Self::InvalidFile(_) => StatusCode::InvalidFile,
            Self::CorruptChunk(_) | Self::Decompress(_) => StatusCode::CorruptChunk,
            Self::InvalidQuery(_) => StatusCode::InvalidQuery,
            Self::UnsupportedOrder => StatusCode::UnsupportedOrder,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TsFileError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::OpenFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// TS-file result
pub type Result<T> = std::result::Result<T, Error>;
