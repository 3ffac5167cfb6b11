// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Block-oriented delta encoding with a per-block bit width.
//!
//! Each block of 8 stores deltas against the running previous value,
//! zigzag of the arithmetic difference for integers and XOR of the bit
//! patterns for floats, as `u8 width` + `width` bytes of packed deltas.
//! The first block of a segment carries a raw big-endian anchor (its
//! first value) between the width byte and the packed deltas. A trailing
//! partial block is `u8 0xFF` + `varint count` + PLAIN-encoded values.

use super::{packer, PackedInt};
use crate::stream::ByteStream;
use std::collections::VecDeque;
use varint_rs::{VarintReader, VarintWriter};

const TAIL_SENTINEL: u8 = 0xFF;

/// How block deltas are formed
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SprintzMode {
    /// Zigzag of the wrapping arithmetic difference (integers)
    Delta,

    /// XOR of the raw bit patterns (floats)
    Xor,
}

impl SprintzMode {
    fn delta<T: PackedInt>(self, v: T, prev: T) -> u64 {
        match self {
            Self::Delta => v.wrapping_sub(prev).zigzag(),
            Self::Xor => v.to_u64() ^ prev.to_u64(),
        }
    }

    fn restore<T: PackedInt>(self, delta: u64, prev: T) -> T {
        match self {
            Self::Delta => prev.wrapping_add(T::from_zigzag(delta)),
            Self::Xor => T::from_u64(delta ^ prev.to_u64()),
        }
    }
}

pub(crate) struct SprintzEncoder<T: PackedInt> {
    mode: SprintzMode,
    buffer: Vec<T>,
    prev: T,
    anchored: bool,
}

impl<T: PackedInt> SprintzEncoder<T> {
    pub fn new(mode: SprintzMode) -> Self {
        Self {
            mode,
            buffer: Vec::with_capacity(8),
            prev: T::from_u64(0),
            anchored: false,
        }
    }

    pub fn encode(&mut self, v: T, out: &mut ByteStream) -> crate::Result<()> {
        self.buffer.push(v);

        if self.buffer.len() == 8 {
            self.flush_block(out)?;
        }

        Ok(())
    }

    fn flush_block(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        let block = std::mem::take(&mut self.buffer);

        #[allow(clippy::expect_used)]
        let first = *block.first().expect("block is non-empty");

        let write_anchor = !self.anchored;
        if write_anchor {
            self.prev = first;
            self.anchored = true;
        }

        let mut deltas = [T::from_u64(0); 8];
        for (slot, v) in deltas.iter_mut().zip(block.iter()) {
            *slot = T::from_u64(self.mode.delta(*v, self.prev));
            self.prev = *v;
        }

        let width = deltas.iter().map(|d| d.bit_width()).max().unwrap_or(0);

        // the width byte is <= 64 and can never collide with the tail
        // sentinel, so it leads the block; the anchor follows it once
        // per segment
        out.write_raw(&[width as u8]);
        if write_anchor {
            first.write_be(out)?;
        }

        let mut packed = Vec::with_capacity(width as usize);
        packer::pack_8(&deltas, width, &mut packed);
        out.write_raw(&packed);

        Ok(())
    }

    pub fn flush(&mut self, out: &mut ByteStream) -> crate::Result<()> {
        if self.buffer.len() == 8 {
            self.flush_block(out)?;
        }

        if !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);

            out.write_raw(&[TAIL_SENTINEL]);

            #[allow(clippy::cast_possible_truncation)]
            out.write_u32_varint(tail.len() as u32)?;

            for v in tail {
                match self.mode {
                    SprintzMode::Delta => v.write_varint(out)?,
                    SprintzMode::Xor => v.write_be(out)?,
                }
            }
        } else if self.anchored {
            // a segment ending on a block boundary still needs its
            // terminator, or a following segment's anchor would be
            // misread as packed deltas
            out.write_raw(&[TAIL_SENTINEL]);
            out.write_u32_varint(0)?;
        }

        // each flushed segment is self-contained
        self.anchored = false;
        self.prev = T::from_u64(0);

        Ok(())
    }
}

pub(crate) struct SprintzDecoder<T: PackedInt> {
    mode: SprintzMode,
    pending: VecDeque<T>,
    prev: T,
    anchored: bool,
}

impl<T: PackedInt> SprintzDecoder<T> {
    pub fn new(mode: SprintzMode) -> Self {
        Self {
            mode,
            pending: VecDeque::new(),
            prev: T::from_u64(0),
            anchored: false,
        }
    }

    fn load(&mut self, src: &mut ByteStream) -> crate::Result<()> {
        let mut marker = [0u8];
        if src.read_into(&mut marker) != 1 {
            return Err(crate::Error::BufNotEnough);
        }

        if marker[0] == TAIL_SENTINEL {
            let count = src.read_u32_varint()? as usize;

            for _ in 0..count {
                let v = match self.mode {
                    SprintzMode::Delta => T::read_varint(src)?,
                    SprintzMode::Xor => T::read_be(src)?,
                };
                self.pending.push_back(v);
            }

            // a tail terminates its segment
            self.anchored = false;
            self.prev = T::from_u64(0);
            return Ok(());
        }

        let width = u32::from(marker[0]);
        if width > T::WIDTH {
            return Err(crate::Error::CorruptChunk("bad sprintz width".into()));
        }

        if !self.anchored {
            self.prev = T::read_be(src).map_err(|_| crate::Error::BufNotEnough)?;
            self.anchored = true;

            // the anchor equals the block's first value, whose in-block
            // delta is therefore zero
        }

        let mut packed = vec![0u8; width as usize];
        if src.read_into(&mut packed) != packed.len() {
            return Err(crate::Error::BufNotEnough);
        }

        for delta in packer::unpack_8::<T>(&packed, width) {
            let v = self.mode.restore(delta.to_u64(), self.prev);
            self.prev = v;
            self.pending.push_back(v);
        }

        Ok(())
    }

    pub fn read(&mut self, src: &mut ByteStream) -> crate::Result<T> {
        while self.pending.is_empty() {
            self.load(src)?;
        }

        self.pending
            .pop_front()
            .ok_or(crate::Error::BufNotEnough)
    }

    pub fn has_next(&mut self, src: &mut ByteStream) -> crate::Result<bool> {
        while self.pending.is_empty() && src.remaining() > 0 {
            self.load(src)?;
        }

        Ok(!self.pending.is_empty())
    }
}
