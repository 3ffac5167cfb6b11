// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Hybrid run-length / bit-packed integer encoding.
//!
//! `flush` emits one self-contained blob: `varint blob_len`, then
//! `u8 bit_width` followed by packs. A run pack is
//! `varint (repeat_count << 1)` + zigzag-varint value; a bit-packed pack is
//! `varint (group_count << 1) | 1` + `u8 valid_count_in_last_group` +
//! `group_count` groups of 8 values at `bit_width` bits.

use super::{packer, PackedInt};
use crate::stream::ByteStream;
use std::collections::VecDeque;
use std::io::Read;
use varint_rs::{VarintReader, VarintWriter};

const RLE_MIN_REPEAT: usize = 8;
const MAX_GROUPS_PER_PACK: usize = 63;

struct PackState<T: PackedInt> {
    prev: Option<T>,
    repeat: usize,
    buffered: [T; 8],
    buffered_len: usize,
    groups: usize,
    packed: Vec<u8>,
}

impl<T: PackedInt> PackState<T> {
    fn new() -> Self {
        Self {
            prev: None,
            repeat: 0,
            buffered: [T::from_u64(0); 8],
            buffered_len: 0,
            groups: 0,
            packed: Vec::new(),
        }
    }

    fn end_bit_packed(&mut self, last_group_len: usize, blob: &mut Vec<u8>) -> crate::Result<()> {
        if self.groups == 0 {
            return Ok(());
        }

        #[allow(clippy::cast_possible_truncation)]
        blob.write_u32_varint(((self.groups as u32) << 1) | 1)?;
        blob.push(last_group_len as u8);
        blob.append(&mut self.packed);
        self.groups = 0;

        Ok(())
    }

    fn write_run(&mut self, blob: &mut Vec<u8>) -> crate::Result<()> {
        self.end_bit_packed(8, blob)?;

        #[allow(clippy::cast_possible_truncation)]
        blob.write_u32_varint((self.repeat as u32) << 1)?;

        if let Some(value) = self.prev {
            value.write_varint(blob)?;
        }

        self.repeat = 0;
        self.buffered_len = 0;

        Ok(())
    }

    fn commit_group(&mut self, bit_width: u32, blob: &mut Vec<u8>) -> crate::Result<()> {
        packer::pack_8(&self.buffered, bit_width, &mut self.packed);
        self.groups += 1;
        self.buffered_len = 0;
        self.repeat = 0;

        if self.groups == MAX_GROUPS_PER_PACK {
            self.end_bit_packed(8, blob)?;
        }

        Ok(())
    }

    fn push(&mut self, v: T, bit_width: u32, blob: &mut Vec<u8>) -> crate::Result<()> {
        if self.prev == Some(v) {
            self.repeat += 1;
            if self.repeat >= RLE_MIN_REPEAT {
                // part of an open run, nothing to buffer
                return Ok(());
            }
        } else {
            if self.repeat >= RLE_MIN_REPEAT {
                self.write_run(blob)?;
            }
            self.repeat = 1;
            self.prev = Some(v);
        }

        if let Some(slot) = self.buffered.get_mut(self.buffered_len) {
            *slot = v;
        }
        self.buffered_len += 1;

        if self.buffered_len == 8 {
            self.commit_group(bit_width, blob)?;
        }

        Ok(())
    }
}

/// Buffering RLE encoder; the bit width is determined at flush time.
pub(crate) struct RleEncoder<T: PackedInt> {
    values: Vec<T>,
}

impl<T: PackedInt> RleEncoder<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn encode(&mut self, v: T) -> crate::Result<()> {
        self.values.push(v);
        Ok(())
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        if self.values.is_empty() {
            return Ok(());
        }

        let bit_width = self
            .values
            .iter()
            .map(|v| v.bit_width())
            .max()
            .unwrap_or(0);

        let mut blob: Vec<u8> = vec![bit_width as u8];
        let mut state = PackState::<T>::new();

        for v in std::mem::take(&mut self.values) {
            state.push(v, bit_width, &mut blob)?;
        }

        let last_group_len = state.buffered_len;

        if state.repeat >= RLE_MIN_REPEAT {
            state.write_run(&mut blob)?;
        } else if state.buffered_len > 0 {
            for i in state.buffered_len..8 {
                if let Some(slot) = state.buffered.get_mut(i) {
                    *slot = T::from_u64(0);
                }
            }
            packer::pack_8(&state.buffered, bit_width, &mut state.packed);
            state.groups += 1;
            state.end_bit_packed(last_group_len, &mut blob)?;
        } else {
            state.end_bit_packed(8, &mut blob)?;
        }

        #[allow(clippy::cast_possible_truncation)]
        out.write_u32_varint(blob.len() as u32)?;
        out.write_raw(&blob);

        Ok(())
    }
}

/// Streaming RLE decoder; consumes one blob at a time from the source.
pub(crate) struct RleDecoder<T: PackedInt> {
    blob: std::io::Cursor<Vec<u8>>,
    bit_width: u32,
    run_left: usize,
    run_value: T,
    packed: VecDeque<T>,
}

impl<T: PackedInt> RleDecoder<T> {
    pub fn new() -> Self {
        Self {
            blob: std::io::Cursor::new(Vec::new()),
            bit_width: 0,
            run_left: 0,
            run_value: T::from_u64(0),
            packed: VecDeque::new(),
        }
    }

    fn blob_remaining(&self) -> usize {
        let len = self.blob.get_ref().len() as u64;
        (len.saturating_sub(self.blob.position())) as usize
    }

    fn load_blob(&mut self, src: &mut ByteStream) -> crate::Result<()> {
        if src.remaining() == 0 {
            return Err(crate::Error::BufNotEnough);
        }

        let len = src.read_u32_varint()? as usize;
        let mut bytes = vec![0u8; len];
        if src.read_into(&mut bytes) != len {
            return Err(crate::Error::BufNotEnough);
        }

        let mut cursor = std::io::Cursor::new(bytes);
        let mut width = [0u8];
        cursor.read_exact(&mut width)?;

        self.bit_width = u32::from(width[0]);
        self.blob = cursor;

        Ok(())
    }

    fn parse_pack(&mut self) -> crate::Result<()> {
        let header = self.blob.read_u32_varint()? as usize;

        if header & 1 == 0 {
            self.run_left = header >> 1;
            self.run_value = T::read_varint(&mut self.blob)?;
        } else {
            let groups = header >> 1;

            let mut last = [0u8];
            self.blob.read_exact(&mut last)?;
            let last_len = (last[0] as usize).min(8);

            let mut group = vec![0u8; self.bit_width as usize];
            for g in 0..groups {
                if self.bit_width > 0 {
                    self.blob.read_exact(&mut group)?;
                }

                let values = packer::unpack_8::<T>(&group, self.bit_width);
                let valid = if g + 1 == groups { last_len } else { 8 };
                self.packed
                    .extend(values.get(..valid).unwrap_or_default().iter().copied());
            }
        }

        Ok(())
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<T> {
        loop {
            if self.run_left > 0 {
                self.run_left -= 1;
                return Ok(self.run_value);
            }

            if let Some(v) = self.packed.pop_front() {
                return Ok(v);
            }

            if self.blob_remaining() > 0 {
                self.parse_pack()?;
            } else {
                self.load_blob(src)?;
            }
        }
    }

    pub fn has_next(&mut self, src: &mut ByteStream) -> crate::Result<bool> {
        Ok(self.run_left > 0
            || !self.packed.is_empty()
            || self.blob_remaining() > 0
            || src.remaining() > 0)
    }
}
