// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Default page size of a [`ByteStream`] (64 KiB)
pub const DEFAULT_PAGE_SIZE: usize = 64 * 1024;

/// Growable, append-only byte buffer backed by a list of fixed-size pages.
///
/// Writes always append; there is no seek. A separate read cursor walks the
/// written bytes from the front, so a stream can be handed from an encoder
/// to a decoder directly. Implements [`std::io::Write`] and
/// [`std::io::Read`], so `byteorder` and `varint-rs` extension traits work
/// on it unchanged.
pub struct ByteStream {
    pages: Vec<Vec<u8>>,
    page_size: usize,
    read_pos: usize,
}

impl Default for ByteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStream {
    /// Creates an empty stream with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates an empty stream with the given page size.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be positive");

        Self {
            pages: Vec::new(),
            page_size,
            read_pos: 0,
        }
    }

    /// Wraps an existing buffer, positioning the read cursor at the front.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        let page_size = data.len().max(1);

        Self {
            pages: vec![data],
            page_size,
            read_pos: 0,
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Number of unread bytes in front of the read cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total_size() - self.read_pos
    }

    /// Appends raw bytes.
    pub fn write_raw(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let free = match self.pages.last() {
                Some(page) if page.len() < self.page_size => self.page_size - page.len(),
                _ => {
                    self.pages.push(Vec::with_capacity(self.page_size));
                    self.page_size
                }
            };

            let take = free.min(bytes.len());
            let (head, tail) = bytes.split_at(take);

            if let Some(page) = self.pages.last_mut() {
                page.extend_from_slice(head);
            }

            bytes = tail;
        }
    }

    /// Copies up to `buf.len()` unread bytes into `buf`, advancing the read
    /// cursor. Returns the number of bytes copied.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let mut copied = 0;

        while copied < buf.len() && self.read_pos < self.total_size() {
            let page_idx = self.read_pos / self.page_size;
            let page_off = self.read_pos % self.page_size;

            let Some(page) = self.pages.get(page_idx) else {
                break;
            };
            let Some(src) = page.get(page_off..) else {
                break;
            };

            let take = src.len().min(buf.len() - copied);
            if take == 0 {
                break;
            }

            if let Some(dst) = buf.get_mut(copied..copied + take) {
                dst.copy_from_slice(src.get(..take).unwrap_or_default());
            }

            copied += take;
            self.read_pos += take;
        }

        copied
    }

    /// Concatenates all written bytes into one vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(self.total_size());
        for page in &self.pages {
            v.extend_from_slice(page);
        }
        v
    }

    /// Drops all content and resets the read cursor.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.read_pos = 0;
    }
}

impl std::io::Write for ByteStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_raw(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_into(buf))
    }
}
