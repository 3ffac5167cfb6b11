// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Read, Write};

/// Trait to serialize on-disk structures
pub trait Encode {
    /// Serializes into writer.
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()>;

    /// Serializes into vector.
    fn encode_into_vec(&self) -> crate::Result<Vec<u8>> {
        let mut v = vec![];
        self.encode_into(&mut v)?;
        Ok(v)
    }
}

/// Trait to deserialize on-disk structures
pub trait Decode {
    /// Deserializes from reader.
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self>
    where
        Self: Sized;
}

/// Writes a length-prefixed byte string (varint length + raw bytes).
pub fn write_str<W: Write>(writer: &mut W, bytes: &[u8]) -> crate::Result<()> {
    use varint_rs::VarintWriter;

    #[allow(clippy::cast_possible_truncation)]
    writer.write_u32_varint(bytes.len() as u32)?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Reads a length-prefixed byte string.
pub fn read_str<R: Read>(reader: &mut R) -> crate::Result<Vec<u8>> {
    use varint_rs::VarintReader;

    let len = reader.read_u32_varint()? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
