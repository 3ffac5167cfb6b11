// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{CompressionType, TSDataType, TSEncoding};

/// Default page flush threshold in points
pub const DEFAULT_PAGE_MAX_POINT_NUM: u32 = 1024;

/// Default page flush threshold in encoded bytes
pub const DEFAULT_PAGE_MAX_SIZE: u32 = 64 * 1024;

/// Default writer memory threshold in bytes (128 MiB)
pub const DEFAULT_CHUNK_GROUP_SIZE_THRESHOLD: usize = 128 * 1024 * 1024;

/// Default metadata-index fan-out
pub const DEFAULT_MAX_DEGREE_OF_INDEX_NODE: usize = 256;

/// Default bloom filter error rate
pub const DEFAULT_BLOOM_FILTER_ERROR_RATE: f64 = 0.05;

/// Per-writer configuration.
///
/// Carried by each writer instance instead of process-global state;
/// readers derive everything they need from the file itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub(crate) time_encoding: TSEncoding,
    pub(crate) time_compression: CompressionType,
    pub(crate) int32_encoding: TSEncoding,
    pub(crate) int64_encoding: TSEncoding,
    pub(crate) float_encoding: TSEncoding,
    pub(crate) double_encoding: TSEncoding,
    pub(crate) boolean_encoding: TSEncoding,
    pub(crate) string_encoding: TSEncoding,
    pub(crate) default_compression: CompressionType,
    pub(crate) page_max_point_num: u32,
    pub(crate) page_max_size: u32,
    pub(crate) chunk_group_size_threshold: usize,
    pub(crate) max_degree_of_index_node: usize,
    pub(crate) bloom_filter_error_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_encoding: TSEncoding::Ts2Diff,
            time_compression: CompressionType::Uncompressed,
            int32_encoding: TSEncoding::Plain,
            int64_encoding: TSEncoding::Plain,
            float_encoding: TSEncoding::Plain,
            double_encoding: TSEncoding::Plain,
            boolean_encoding: TSEncoding::Plain,
            string_encoding: TSEncoding::Plain,
            default_compression: CompressionType::Uncompressed,
            page_max_point_num: DEFAULT_PAGE_MAX_POINT_NUM,
            page_max_size: DEFAULT_PAGE_MAX_SIZE,
            chunk_group_size_threshold: DEFAULT_CHUNK_GROUP_SIZE_THRESHOLD,
            max_degree_of_index_node: DEFAULT_MAX_DEGREE_OF_INDEX_NODE,
            bloom_filter_error_rate: DEFAULT_BLOOM_FILTER_ERROR_RATE,
        }
    }
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The time column type is fixed; anything but INT64 is rejected.
    pub fn use_time_data_type(self, data_type: TSDataType) -> crate::Result<Self> {
        if data_type != TSDataType::Int64 {
            return Err(crate::Error::NotSupport("time column must be INT64"));
        }
        Ok(self)
    }

    /// Sets the time column encoding (PLAIN or TS_2DIFF).
    pub fn use_time_encoding(mut self, encoding: TSEncoding) -> crate::Result<Self> {
        if !matches!(encoding, TSEncoding::Plain | TSEncoding::Ts2Diff) {
            return Err(crate::Error::NotSupport(
                "time encoding must be PLAIN or TS_2DIFF",
            ));
        }
        self.time_encoding = encoding;
        Ok(self)
    }

    /// Sets the time column compression (UNCOMPRESSED or LZ4).
    pub fn use_time_compression(mut self, compression: CompressionType) -> crate::Result<Self> {
        if !time_compression_supported(compression) {
            return Err(crate::Error::NotSupport(
                "time compression must be UNCOMPRESSED or LZ4",
            ));
        }
        self.time_compression = compression;
        Ok(self)
    }

    /// Sets the default encoding for a data type.
    ///
    /// The defaults are narrower than the per-column legality table: the
    /// numeric types accept PLAIN, TS_2DIFF, GORILLA, SPRINTZ and RLE
    /// only (ZIGZAG stays a per-column override), strings accept PLAIN
    /// only (DICTIONARY stays a per-column override).
    pub fn use_encoding(
        mut self,
        data_type: TSDataType,
        encoding: TSEncoding,
    ) -> crate::Result<Self> {
        if !encoding.supports(data_type) {
            return Err(crate::Error::NotSupport("encoding for data type"));
        }

        match data_type {
            TSDataType::Boolean => self.boolean_encoding = encoding,
            TSDataType::Int32
            | TSDataType::Date
            | TSDataType::Int64
            | TSDataType::Timestamp
            | TSDataType::Float
            | TSDataType::Double => {
                if encoding == TSEncoding::Zigzag {
                    return Err(crate::Error::NotSupport(
                        "ZIGZAG is not a default encoding",
                    ));
                }

                match data_type {
                    TSDataType::Int32 | TSDataType::Date => self.int32_encoding = encoding,
                    TSDataType::Int64 | TSDataType::Timestamp => self.int64_encoding = encoding,
                    TSDataType::Float => self.float_encoding = encoding,
                    _ => self.double_encoding = encoding,
                }
            }
            TSDataType::Text | TSDataType::Blob | TSDataType::String => {
                if encoding != TSEncoding::Plain {
                    return Err(crate::Error::NotSupport(
                        "string default encoding must be PLAIN",
                    ));
                }
                self.string_encoding = encoding;
            }
        }

        Ok(self)
    }

    /// Sets the default compression (UNCOMPRESSED or LZ4).
    pub fn use_default_compression(
        mut self,
        compression: CompressionType,
    ) -> crate::Result<Self> {
        if !time_compression_supported(compression) {
            return Err(crate::Error::NotSupport(
                "default compression must be UNCOMPRESSED or LZ4",
            ));
        }
        self.default_compression = compression;
        Ok(self)
    }

    /// Sets the page flush threshold in points.
    #[must_use]
    pub fn use_page_max_point_num(mut self, points: u32) -> Self {
        assert!(points > 0, "page point threshold must be positive");
        self.page_max_point_num = points;
        self
    }

    /// Sets the page flush threshold in encoded bytes.
    #[must_use]
    pub fn use_page_max_size(mut self, bytes: u32) -> Self {
        assert!(bytes > 0, "page size threshold must be positive");
        self.page_max_size = bytes;
        self
    }

    /// Sets the writer memory threshold that forces a chunk-group flush.
    #[must_use]
    pub fn use_chunk_group_size_threshold(mut self, bytes: usize) -> Self {
        assert!(bytes > 0, "chunk group threshold must be positive");
        self.chunk_group_size_threshold = bytes;
        self
    }

    /// Sets the metadata-index fan-out.
    #[must_use]
    pub fn use_max_degree_of_index_node(mut self, degree: usize) -> Self {
        assert!(degree >= 2, "index fan-out must be at least 2");
        self.max_degree_of_index_node = degree;
        self
    }

    /// Sets the bloom filter error rate.
    #[must_use]
    pub fn use_bloom_filter_error_rate(mut self, error_rate: f64) -> Self {
        assert!(
            error_rate > 0.0 && error_rate < 1.0,
            "error rate must be in (0, 1)",
        );
        self.bloom_filter_error_rate = error_rate;
        self
    }

    /// Default encoding for a data type.
    #[must_use]
    pub fn encoding_for(&self, data_type: TSDataType) -> TSEncoding {
        match data_type {
            TSDataType::Boolean => self.boolean_encoding,
            TSDataType::Int32 | TSDataType::Date => self.int32_encoding,
            TSDataType::Int64 | TSDataType::Timestamp => self.int64_encoding,
            TSDataType::Float => self.float_encoding,
            TSDataType::Double => self.double_encoding,
            TSDataType::Text | TSDataType::Blob | TSDataType::String => self.string_encoding,
        }
    }
}

fn time_compression_supported(compression: CompressionType) -> bool {
    #[cfg(feature = "lz4")]
    {
        matches!(
            compression,
            CompressionType::Uncompressed | CompressionType::Lz4
        )
    }

    #[cfg(not(feature = "lz4"))]
    {
        compression == CompressionType::Uncompressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(TSEncoding::Ts2Diff, config.time_encoding);
        assert_eq!(DEFAULT_PAGE_MAX_POINT_NUM, config.page_max_point_num);
        assert_eq!(
            DEFAULT_MAX_DEGREE_OF_INDEX_NODE,
            config.max_degree_of_index_node,
        );
    }

    #[test]
    fn time_data_type_must_be_int64() {
        assert!(Config::new().use_time_data_type(TSDataType::Int64).is_ok());
        assert!(Config::new().use_time_data_type(TSDataType::Int32).is_err());
        assert!(Config::new()
            .use_time_data_type(TSDataType::Timestamp)
            .is_err());
    }

    #[test]
    fn time_encoding_restricted() -> crate::Result<()> {
        let config = Config::new().use_time_encoding(TSEncoding::Plain)?;
        assert_eq!(TSEncoding::Plain, config.time_encoding);

        assert!(Config::new().use_time_encoding(TSEncoding::Gorilla).is_err());
        assert!(Config::new().use_time_encoding(TSEncoding::Rle).is_err());

        Ok(())
    }

    #[test]
    fn value_encoding_validated_per_type() -> crate::Result<()> {
        let config = Config::new()
            .use_encoding(TSDataType::Int32, TSEncoding::Gorilla)?
            .use_encoding(TSDataType::Double, TSEncoding::Sprintz)?;

        assert_eq!(TSEncoding::Gorilla, config.encoding_for(TSDataType::Int32));
        assert_eq!(TSEncoding::Gorilla, config.encoding_for(TSDataType::Date));
        assert_eq!(
            TSEncoding::Sprintz,
            config.encoding_for(TSDataType::Double),
        );

        assert!(Config::new()
            .use_encoding(TSDataType::Boolean, TSEncoding::Rle)
            .is_err());
        assert!(Config::new()
            .use_encoding(TSDataType::String, TSEncoding::Gorilla)
            .is_err());

        Ok(())
    }

    #[test]
    fn zigzag_is_not_a_default_encoding() -> crate::Result<()> {
        // legal as a per-column override, rejected as a per-type default
        for data_type in [
            TSDataType::Int32,
            TSDataType::Int64,
            TSDataType::Date,
            TSDataType::Timestamp,
        ] {
            assert!(TSEncoding::Zigzag.supports(data_type));
            assert!(Config::new()
                .use_encoding(data_type, TSEncoding::Zigzag)
                .is_err());
        }

        assert!(Config::new()
            .use_encoding(TSDataType::Float, TSEncoding::Zigzag)
            .is_err());
        assert!(Config::new()
            .use_encoding(TSDataType::Double, TSEncoding::Zigzag)
            .is_err());

        // DICTIONARY is likewise override-only for strings
        assert!(Config::new()
            .use_encoding(TSDataType::String, TSEncoding::Dictionary)
            .is_err());

        Ok(())
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn compression_restricted_to_lz4() -> crate::Result<()> {
        let config = Config::new().use_default_compression(CompressionType::Lz4)?;
        assert_eq!(CompressionType::Lz4, config.default_compression);

        #[cfg(feature = "gzip")]
        assert!(Config::new()
            .use_default_compression(CompressionType::Gzip)
            .is_err());

        Ok(())
    }
}
