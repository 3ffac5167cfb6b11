// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 6-byte file signature, leading and trailing
pub const MAGIC_BYTES: [u8; 6] = [b'T', b's', b'F', b'i', b'l', b'e'];

/// Format version byte following the leading magic
pub const VERSION_BYTE: u8 = 0x03;

/// Append-only write sink over a regular file.
pub struct WriteFile {
    file: File,
    path: PathBuf,
}

impl WriteFile {
    /// Creates (or truncates) the target file.
    ///
    /// With `create_excl`, an existing file is an error
    /// (`AlreadyExist`); any other open failure maps to `OpenFailed`,
    /// e.g. a path naming a directory.
    pub fn open(path: impl AsRef<Path>, create_excl: bool) -> crate::Result<Self> {
        let path = path.as_ref();

        let result = if create_excl {
            File::create_new(path)
        } else {
            File::create(path)
        };

        let file = result.map_err(|source| {
            if create_excl && source.kind() == std::io::ErrorKind::AlreadyExists {
                crate::Error::AlreadyExist(path.to_path_buf())
            } else {
                crate::Error::OpenFailed {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path this sink writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes file contents to stable storage.
    pub fn sync_all(&self) -> crate::Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

impl Write for WriteFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

/// Random-access read source backing a file reader.
pub trait RandomAccess {
    /// Reads at `offset`, returning the number of bytes read.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize>;

    /// Total length in bytes.
    fn len(&self) -> std::io::Result<u64>;
}

impl RandomAccess for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }

    fn len(&self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl RandomAccess for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let available = self.get(offset.min(self.len())..).unwrap_or_default();

        let take = available.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..take), available.get(..take)) {
            dst.copy_from_slice(src);
        }

        Ok(take)
    }

    fn len(&self) -> std::io::Result<u64> {
        Ok(Vec::len(self) as u64)
    }
}

/// Reads exactly `size` bytes at `offset`.
pub fn read_exact_at<R: RandomAccess + ?Sized>(
    source: &R,
    offset: u64,
    size: usize,
) -> crate::Result<Vec<u8>> {
    let mut buf = vec![0u8; size];
    let mut filled = 0usize;

    while filled < size {
        let got = source.read_at(
            buf.get_mut(filled..).unwrap_or_default(),
            offset + filled as u64,
        )?;

        if got == 0 {
            return Err(crate::Error::InvalidFile("unexpected end of file"));
        }
        filled += got;
    }

    Ok(buf)
}

/// Write adapter tracking the absolute number of bytes written.
///
/// The writer emits footer structures that reference each other by
/// absolute file offset, so every write path goes through this.
pub struct CountingWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wraps a sink positioned at offset 0.
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Unwraps the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Sequential [`std::io::Read`] view over a region of a random-access
/// source.
pub struct SectionReader<'a, R: RandomAccess + ?Sized> {
    source: &'a R,
    position: u64,
    end: u64,
}

impl<'a, R: RandomAccess + ?Sized> SectionReader<'a, R> {
    /// Creates a reader over `[start, end)`.
    pub fn new(source: &'a R, start: u64, end: u64) -> Self {
        Self {
            source,
            position: start,
            end,
        }
    }
}

impl<R: RandomAccess + ?Sized> std::io::Read for SectionReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let left = usize::try_from(self.end.saturating_sub(self.position)).unwrap_or(usize::MAX);
        if left == 0 {
            return Ok(0);
        }

        let want = buf.len().min(left);
        let got = self
            .source
            .read_at(buf.get_mut(..want).unwrap_or_default(), self.position)?;

        self.position += got as u64;
        Ok(got)
    }
}
