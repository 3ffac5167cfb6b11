// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! PLAIN encoding primitives: zigzag varints for integers, big-endian
//! IEEE-754 bit patterns for floats, length-prefixed bytes for strings,
//! one byte per boolean.

use crate::stream::ByteStream;

pub fn encode_bool(v: bool, out: &mut ByteStream) -> crate::Result<()> {
    out.write_raw(&[u8::from(v)]);
    Ok(())
}

pub fn decode_bool(src: &mut ByteStream) -> crate::Result<bool> {
    let mut byte = [0u8];
    if src.read_into(&mut byte) != 1 {
        return Err(crate::Error::BufNotEnough);
    }

    match byte[0] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(crate::Error::CorruptChunk("invalid boolean byte".into())),
    }
}

pub fn encode_bytes(v: &[u8], out: &mut ByteStream) -> crate::Result<()> {
    crate::coding::write_str(out, v)
}

pub fn decode_bytes(src: &mut ByteStream) -> crate::Result<Vec<u8>> {
    crate::coding::read_str(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::PackedInt;
    use test_log::test;

    #[test]
    fn bool_roundtrip() -> crate::Result<()> {
        let mut stream = ByteStream::new();

        encode_bool(true, &mut stream)?;
        encode_bool(false, &mut stream)?;
        assert_eq!(2, stream.total_size());

        assert!(decode_bool(&mut stream)?);
        assert!(!decode_bool(&mut stream)?);
        assert!(decode_bool(&mut stream).is_err());

        Ok(())
    }

    #[test]
    fn bytes_roundtrip() -> crate::Result<()> {
        let mut stream = ByteStream::new();

        encode_bytes(b"apple", &mut stream)?;
        encode_bytes(b"", &mut stream)?;
        encode_bytes(&[0xFF, 0x00, 0x80], &mut stream)?;

        assert_eq!(b"apple".to_vec(), decode_bytes(&mut stream)?);
        assert_eq!(Vec::<u8>::new(), decode_bytes(&mut stream)?);
        assert_eq!(vec![0xFF, 0x00, 0x80], decode_bytes(&mut stream)?);

        Ok(())
    }

    #[test]
    fn int_varints_are_zigzag() -> std::io::Result<()> {
        let mut stream = ByteStream::new();

        5i32.write_varint(&mut stream)?;
        assert_eq!(vec![10], stream.to_vec());

        let mut stream = ByteStream::new();
        (-3i64).write_varint(&mut stream)?;
        assert_eq!(vec![5], stream.to_vec());

        Ok(())
    }

    #[test]
    fn int_roundtrip() -> std::io::Result<()> {
        let mut stream = ByteStream::new();

        for v in [0i64, 1, -1, i64::MIN, i64::MAX, 1_622_505_600_000] {
            v.write_varint(&mut stream)?;
        }

        for v in [0i64, 1, -1, i64::MIN, i64::MAX, 1_622_505_600_000] {
            assert_eq!(v, i64::read_varint(&mut stream)?);
        }

        Ok(())
    }
}
