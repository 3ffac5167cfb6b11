// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::atomic::{AtomicI64, Ordering};

/// Module tags for the process-wide allocation counters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(usize)]
pub enum ModId {
    /// Untagged allocations
    Default = 0,

    /// Tablet-owned string storage
    Tablet = 1,

    /// Encoder scratch space
    Encoder = 2,

    /// Writer-side buffers
    Writer = 3,

    /// Reader-side buffers
    Reader = 4,
}

const MOD_COUNT: usize = 5;

static ALLOC_BYTES: [AtomicI64; MOD_COUNT] = [
    AtomicI64::new(0),
    AtomicI64::new(0),
    AtomicI64::new(0),
    AtomicI64::new(0),
    AtomicI64::new(0),
];

/// Net allocated bytes currently tracked for a module.
///
/// Debug aid only; not a correctness feature.
#[must_use]
pub fn allocated_bytes(module: ModId) -> i64 {
    ALLOC_BYTES
        .get(module as usize)
        .map_or(0, |c| c.load(Ordering::Relaxed))
}

fn track(module: ModId, delta: i64) {
    if let Some(counter) = ALLOC_BYTES.get(module as usize) {
        counter.fetch_add(delta, Ordering::Relaxed);
    }
}

/// Reference into a [`PageArena`] slab.
///
/// The default reference is empty and resolves to an empty slice.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ArenaRef {
    slab: u32,
    offset: u32,
    len: u32,
}

impl ArenaRef {
    /// Length in bytes of the referenced allocation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the referenced allocation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bump allocator over fixed-size slabs.
///
/// Allocations are 8-byte aligned and live until [`PageArena::reset`] (or
/// drop). Allocations larger than the slab size get a slab of their own.
/// Used to intern short-lived strings inside a tablet.
pub struct PageArena {
    slabs: Vec<Vec<u8>>,
    slab_size: usize,
    module: ModId,
}

impl PageArena {
    /// Creates an arena handing out slabs of `slab_size` bytes.
    #[must_use]
    pub fn new(slab_size: usize, module: ModId) -> Self {
        assert!(slab_size > 0, "slab size must be positive");

        Self {
            slabs: Vec::new(),
            slab_size,
            module,
        }
    }

    /// Copies `bytes` into the arena and returns a stable reference.
    pub fn intern(&mut self, bytes: &[u8]) -> ArenaRef {
        let len = bytes.len();

        // Oversized allocations get a dedicated slab
        if len > self.slab_size {
            self.slabs.push(bytes.to_vec());
            track(self.module, len as i64);

            #[allow(clippy::cast_possible_truncation)]
            return ArenaRef {
                slab: (self.slabs.len() - 1) as u32,
                offset: 0,
                len: len as u32,
            };
        }

        let needs_new = match self.slabs.last() {
            Some(slab) => align_up(slab.len()) + len > self.slab_size,
            None => true,
        };

        if needs_new {
            self.slabs.push(Vec::with_capacity(self.slab_size));
            track(self.module, self.slab_size as i64);
        }

        #[allow(clippy::expect_used)]
        let slab_idx = self.slabs.len() - 1;
        let slab = self.slabs.last_mut().expect("slab was just ensured");

        let offset = align_up(slab.len());
        slab.resize(offset, 0);
        slab.extend_from_slice(bytes);

        #[allow(clippy::cast_possible_truncation)]
        ArenaRef {
            slab: slab_idx as u32,
            offset: offset as u32,
            len: len as u32,
        }
    }

    /// Resolves a reference produced by [`PageArena::intern`].
    #[must_use]
    pub fn get(&self, r: ArenaRef) -> &[u8] {
        self.slabs
            .get(r.slab as usize)
            .and_then(|slab| slab.get(r.offset as usize..(r.offset + r.len) as usize))
            .unwrap_or_default()
    }

    /// Releases all slabs at once.
    pub fn reset(&mut self) {
        for slab in &self.slabs {
            let tracked = if slab.len() > self.slab_size {
                slab.len()
            } else {
                self.slab_size
            };
            track(self.module, -(tracked as i64));
        }
        self.slabs.clear();
    }
}

impl Drop for PageArena {
    fn drop(&mut self) {
        self.reset();
    }
}

fn align_up(offset: usize) -> usize {
    (offset + 7) & !7
}
