// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Compression algorithm applied to page bodies
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CompressionType {
    /// No compression
    Uncompressed,

    /// Snappy compression
    #[cfg(feature = "snappy")]
    Snappy,

    /// Gzip compression
    #[cfg(feature = "gzip")]
    Gzip,

    /// LZ4 block compression
    #[cfg(feature = "lz4")]
    Lz4,
}

impl From<CompressionType> for u8 {
    fn from(value: CompressionType) -> Self {
        match value {
            CompressionType::Uncompressed => 0,

            #[cfg(feature = "snappy")]
            CompressionType::Snappy => 1,

            #[cfg(feature = "gzip")]
            CompressionType::Gzip => 2,

            #[cfg(feature = "lz4")]
            CompressionType::Lz4 => 7,
        }
    }
}

impl TryFrom<u8> for CompressionType {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Uncompressed),

            #[cfg(feature = "snappy")]
            1 => Ok(Self::Snappy),

            #[cfg(feature = "gzip")]
            2 => Ok(Self::Gzip),

            #[cfg(feature = "lz4")]
            7 => Ok(Self::Lz4),

            _ => Err(crate::Error::NotSupport("compression algorithm")),
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Uncompressed => "uncompressed",

                #[cfg(feature = "snappy")]
                Self::Snappy => "snappy",

                #[cfg(feature = "gzip")]
                Self::Gzip => "gzip",

                #[cfg(feature = "lz4")]
                Self::Lz4 => "lz4",
            }
        )
    }
}

impl CompressionType {
    /// Compresses `src`, appending to `out`.
    pub fn compress(self, src: &[u8], out: &mut Vec<u8>) -> crate::Result<()> {
        match self {
            Self::Uncompressed => {
                out.extend_from_slice(src);
                Ok(())
            }

            #[cfg(feature = "snappy")]
            Self::Snappy => {
                let compressed = snap::raw::Encoder::new()
                    .compress_vec(src)
                    .map_err(|_| crate::Error::Decompress(self))?;
                out.extend_from_slice(&compressed);
                Ok(())
            }

            #[cfg(feature = "gzip")]
            Self::Gzip => {
                use std::io::Write;

                let mut encoder =
                    flate2::write::GzEncoder::new(&mut *out, flate2::Compression::default());
                encoder.write_all(src)?;
                encoder.finish()?;
                Ok(())
            }

            #[cfg(feature = "lz4")]
            Self::Lz4 => {
                out.extend_from_slice(&lz4_flex::compress(src));
                Ok(())
            }
        }
    }

    /// Decompresses `src` into exactly `uncompressed_size` bytes.
    pub fn decompress(self, src: &[u8], uncompressed_size: usize) -> crate::Result<Vec<u8>> {
        match self {
            Self::Uncompressed => {
                if src.len() != uncompressed_size {
                    return Err(crate::Error::Decompress(self));
                }
                Ok(src.to_vec())
            }

            #[cfg(feature = "snappy")]
            Self::Snappy => {
                let out = snap::raw::Decoder::new()
                    .decompress_vec(src)
                    .map_err(|_| crate::Error::Decompress(self))?;

                if out.len() != uncompressed_size {
                    return Err(crate::Error::Decompress(self));
                }
                Ok(out)
            }

            #[cfg(feature = "gzip")]
            Self::Gzip => {
                use std::io::Read;

                let mut out = Vec::with_capacity(uncompressed_size);
                flate2::read::GzDecoder::new(src)
                    .read_to_end(&mut out)
                    .map_err(|_| crate::Error::Decompress(self))?;

                if out.len() != uncompressed_size {
                    return Err(crate::Error::Decompress(self));
                }
                Ok(out)
            }

            #[cfg(feature = "lz4")]
            Self::Lz4 => lz4_flex::decompress(src, uncompressed_size)
                .map_err(|_| crate::Error::Decompress(self)),
        }
    }
}
