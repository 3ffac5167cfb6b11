// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Ordered-dictionary encoding for byte strings.
//!
//! `flush` emits: zigzag-varint entry count, each distinct entry in
//! first-seen order (zigzag-varint length + bytes), then the RLE-encoded
//! stream of 0-based entry ids.

use super::{PackedInt, RleDecoder, RleEncoder};
use crate::stream::ByteStream;
use rustc_hash::FxHashMap;
use varint_rs::{VarintReader, VarintWriter};

pub(crate) struct DictionaryEncoder {
    entries: Vec<Vec<u8>>,
    ids: FxHashMap<Vec<u8>, i32>,
    id_stream: RleEncoder<i32>,
}

impl DictionaryEncoder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            ids: FxHashMap::default(),
            id_stream: RleEncoder::new(),
        }
    }

    pub fn encode(&mut self, value: &[u8]) -> crate::Result<()> {
        let id = match self.ids.get(value) {
            Some(id) => *id,
            None => {
                #[allow(clippy::cast_possible_truncation)]
                let id = self.entries.len() as i32;
                self.entries.push(value.to_vec());
                self.ids.insert(value.to_vec(), id);
                id
            }
        };

        self.id_stream.encode(id)
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }

        #[allow(clippy::cast_possible_truncation)]
        (self.entries.len() as i32).write_varint(out)?;

        for entry in &self.entries {
            #[allow(clippy::cast_possible_truncation)]
            (entry.len() as i32).write_varint(out)?;
            out.write_raw(entry);
        }

        self.id_stream.flush(out)?;

        self.entries.clear();
        self.ids.clear();

        Ok(())
    }
}

pub(crate) struct DictionaryDecoder {
    entries: Vec<Vec<u8>>,
    id_stream: RleDecoder<i32>,
    // id blob of the current segment, bounded so that reading the ids can
    // never run into the next segment's entry table
    ids_src: ByteStream,
    ids_left: bool,
}

impl DictionaryDecoder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            id_stream: RleDecoder::new(),
            ids_src: ByteStream::from_vec(Vec::new()),
            ids_left: false,
        }
    }

    fn load_segment(&mut self, src: &mut ByteStream) -> crate::Result<()> {
        let count = i32::read_varint(src)?;
        if count < 0 {
            return Err(crate::Error::CorruptChunk("bad dictionary header".into()));
        }

        self.entries.clear();
        self.entries.reserve(count as usize);

        for _ in 0..count {
            let len = i32::read_varint(src)?;
            if len < 0 {
                return Err(crate::Error::CorruptChunk("bad dictionary entry".into()));
            }

            let mut entry = vec![0u8; len as usize];
            if src.read_into(&mut entry) != entry.len() {
                return Err(crate::Error::BufNotEnough);
            }
            self.entries.push(entry);
        }

        let blob_len = src.read_u32_varint()? as usize;
        let mut blob = vec![0u8; blob_len];
        if src.read_into(&mut blob) != blob_len {
            return Err(crate::Error::BufNotEnough);
        }

        self.ids_src = ByteStream::new();
        #[allow(clippy::cast_possible_truncation)]
        VarintWriter::write_u32_varint(&mut self.ids_src, blob_len as u32)?;
        self.ids_src.write_raw(&blob);

        self.id_stream = RleDecoder::new();
        self.ids_left = true;

        Ok(())
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<Vec<u8>> {
        if !self.ids_left {
            self.load_segment(src)?;
        }

        let id = self.id_stream.read(&mut self.ids_src)?;
        if !self.id_stream.has_next(&mut self.ids_src)? {
            self.ids_left = false;
        }

        self.entries
            .get(usize::try_from(id).map_err(|_| {
                crate::Error::CorruptChunk("negative dictionary id".into())
            })?)
            .cloned()
            .ok_or_else(|| crate::Error::CorruptChunk("dictionary id out of range".into()))
    }

    pub fn has_next(&mut self, src: &mut ByteStream) -> crate::Result<bool> {
        Ok(self.ids_left || src.remaining() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn dictionary_expected_stream() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = DictionaryEncoder::new();

        encoder.encode(b"apple")?;
        encoder.encode(b"banana")?;
        encoder.encode(b"cherry")?;
        encoder.encode(b"apple")?;
        encoder.flush(&mut stream)?;

        let expected: Vec<u8> = vec![
            6, 10, b'a', b'p', b'p', b'l', b'e', 12, b'b', b'a', b'n', b'a', b'n', b'a', 12, b'c',
            b'h', b'e', b'r', b'r', b'y', 5, 2, 3, 4, 24, 0,
        ];
        assert_eq!(expected, stream.to_vec());

        Ok(())
    }

    #[test]
    fn dictionary_roundtrip() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = DictionaryEncoder::new();

        encoder.encode(b"apple")?;
        encoder.encode(b"banana")?;
        encoder.encode(b"cherry")?;
        encoder.encode(b"apple")?;
        encoder.flush(&mut stream)?;

        let mut decoder = DictionaryDecoder::new();
        for expected in [&b"apple"[..], b"banana", b"cherry", b"apple"] {
            assert!(decoder.has_next(&mut stream)?);
            assert_eq!(expected.to_vec(), decoder.read(&mut stream)?);
        }
        assert!(!decoder.has_next(&mut stream)?);

        Ok(())
    }

    #[test]
    fn dictionary_single_item() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = DictionaryEncoder::new();

        encoder.encode(b"apple")?;
        encoder.flush(&mut stream)?;

        let mut decoder = DictionaryDecoder::new();
        assert!(decoder.has_next(&mut stream)?);
        assert_eq!(b"apple".to_vec(), decoder.read(&mut stream)?);
        assert!(!decoder.has_next(&mut stream)?);

        Ok(())
    }

    #[test]
    fn dictionary_repeated_items() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = DictionaryEncoder::new();

        for c in b'a'..=b'z' {
            for _ in 0..100 {
                encoder.encode(&[c, c, c])?;
            }
        }
        encoder.flush(&mut stream)?;

        let mut decoder = DictionaryDecoder::new();
        for c in b'a'..=b'z' {
            for _ in 0..100 {
                assert_eq!(vec![c, c, c], decoder.read(&mut stream)?);
            }
        }

        Ok(())
    }

    #[test]
    fn dictionary_many_random_strings() -> crate::Result<()> {
        use rand::Rng;
        let mut rng = rand::rng();

        let mut inputs: Vec<Vec<u8>> = vec![];
        for _ in 0..10_000 {
            let len = rng.random_range(5..=20);
            inputs.push((0..len).map(|_| rng.random_range(33..=126u8)).collect());
        }

        let mut stream = ByteStream::new();
        let mut encoder = DictionaryEncoder::new();
        for input in &inputs {
            encoder.encode(input)?;
        }
        encoder.flush(&mut stream)?;

        let mut decoder = DictionaryDecoder::new();
        for input in &inputs {
            assert_eq!(*input, decoder.read(&mut stream)?);
        }

        Ok(())
    }

    #[test]
    fn dictionary_multiple_flush_segments() -> crate::Result<()> {
        let mut stream = ByteStream::new();
        let mut encoder = DictionaryEncoder::new();

        encoder.encode(b"x")?;
        encoder.encode(b"y")?;
        encoder.flush(&mut stream)?;

        encoder.encode(b"z")?;
        encoder.flush(&mut stream)?;

        let mut decoder = DictionaryDecoder::new();
        for expected in [&b"x"[..], b"y", b"z"] {
            assert!(decoder.has_next(&mut stream)?);
            assert_eq!(expected.to_vec(), decoder.read(&mut stream)?);
        }
        assert!(!decoder.has_next(&mut stream)?);

        Ok(())
    }
}
