// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::StorageError;

/// Number of 4-byte integer slots in the header of every [DataAccess].
pub const HEADER_SLOTS: usize = 4;

/// Prefix of every persisted [DataAccess] file.
const MAGIC: &[u8; 4] = b"RXES";

const PREAMBLE_LEN: usize = MAGIC.len() + HEADER_SLOTS * 4 + 8;

/// Default amount of bytes by which a [DataAccess] grows.
pub const DEFAULT_SEGMENT_SIZE: usize = 1 << 16;

/// Describes where [DataAccess] objects keep their data between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directory {
    /// Every [DataAccess] is persisted in a separate file in the given directory,
    /// named after the [DataAccess].
    OnDisk(PathBuf),

    /// Data only lives in memory; flushing is a no-op and loading always fails.
    InMemory,
}

impl Directory {
    pub fn on_disk<P: Into<PathBuf>>(path: P) -> Self {
        Self::OnDisk(path.into())
    }

    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Returns the path of the file backing a [DataAccess] with the given name,
    /// or `None` for in-memory directories.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        match self {
            Self::OnDisk(dir) => Some(dir.join(name)),
            Self::InMemory => None,
        }
    }

    /// Returns a new, empty [DataAccess] bound to this directory.
    pub fn find(&self, name: &str) -> DataAccess {
        DataAccess::new(name, self.path_of(name))
    }
}

/// Growable byte buffer with a small integer header, optionally backed by a file.
///
/// Newly allocated bytes are filled with a repeating pattern (see
/// [DataAccess::set_fill_pattern]), aligned to offset 0 of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAccess {
    name: String,
    location: Option<PathBuf>,
    header: [i32; HEADER_SLOTS],
    data: Vec<u8>,
    segment_size: usize,
    fill: Vec<u8>,
}

impl DataAccess {
    pub fn new(name: &str, location: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            location,
            header: [0; HEADER_SLOTS],
            data: Vec::default(),
            segment_size: DEFAULT_SEGMENT_SIZE,
            fill: vec![0],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file, if any.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Sets the pattern used to fill newly allocated bytes. Empty patterns are ignored.
    pub fn set_fill_pattern(&mut self, pattern: &[u8]) {
        if !pattern.is_empty() {
            self.fill = pattern.to_vec();
        }
    }

    pub fn set_segment_size(&mut self, size: usize) {
        self.segment_size = size.max(1);
    }

    /// Number of currently allocated bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Discards all data and allocates space for at least `bytes` bytes.
    pub fn create(&mut self, bytes: usize) {
        self.data.clear();
        self.header = [0; HEADER_SLOTS];
        self.ensure_capacity(bytes.max(1));
    }

    /// Grows the buffer (in whole segments) so that it holds at least `bytes` bytes.
    /// Returns `true` if the buffer had to grow.
    pub fn ensure_capacity(&mut self, bytes: usize) -> bool {
        if bytes <= self.data.len() {
            return false;
        }

        let segments = bytes.div_ceil(self.segment_size);
        let new_len = segments * self.segment_size;
        let start = self.data.len();
        let pattern = &self.fill;
        self.data
            .extend((start..new_len).map(|offset| pattern[offset % pattern.len()]));

        log::debug!("{}: grown to {} bytes", self.name, new_len);
        true
    }

    /// Returns `len` bytes starting at `offset`, or `None` if they lie outside of the buffer.
    #[inline]
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.data.get(offset..offset.checked_add(len)?)
    }

    /// Writes bytes at the given offset, growing the buffer if necessary.
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        self.ensure_capacity(end);
        self.data[offset..end].copy_from_slice(bytes);
    }

    pub fn header(&self, slot: usize) -> i32 {
        self.header[slot]
    }

    pub fn set_header(&mut self, slot: usize, value: i32) {
        self.header[slot] = value;
    }

    /// Persists the header and the data into the backing file.
    /// No-op for in-memory data.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let Some(path) = self.location.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(MAGIC)?;
        for slot in self.header {
            w.write_all(&slot.to_le_bytes())?;
        }
        w.write_all(&(self.data.len() as u64).to_le_bytes())?;
        w.write_all(&self.data)?;
        w.flush()?;

        log::debug!("{}: flushed {} bytes to {}", self.name, self.data.len(), path.display());
        Ok(())
    }

    /// Replaces the header and the data with the contents of the backing file.
    pub fn load_existing(&mut self) -> Result<(), StorageError> {
        let Some(path) = self.location.as_ref() else {
            return Err(StorageError::NotPersistent(self.name.clone()));
        };

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(self.corrupt("missing file"));
            }
            Err(e) => return Err(e.into()),
        };

        if content.len() < PREAMBLE_LEN {
            return Err(self.corrupt("truncated header"));
        }
        if &content[..MAGIC.len()] != MAGIC {
            return Err(self.corrupt("invalid magic bytes"));
        }

        let mut header = [0; HEADER_SLOTS];
        for (i, slot) in header.iter_mut().enumerate() {
            let start = MAGIC.len() + i * 4;
            *slot = i32::from_le_bytes(read_array(&content[start..start + 4]));
        }

        let len_start = MAGIC.len() + HEADER_SLOTS * 4;
        let len = u64::from_le_bytes(read_array(&content[len_start..PREAMBLE_LEN]));
        let body = &content[PREAMBLE_LEN..];
        if body.len() as u64 != len {
            return Err(self.corrupt("truncated body"));
        }

        self.header = header;
        self.data = body.to_vec();
        log::debug!("{}: loaded {} bytes from {}", self.name, len, path.display());
        Ok(())
    }

    /// Copies the header, data and fill pattern into another [DataAccess].
    /// The name and location of `other` are preserved.
    pub fn copy_to(&self, other: &mut DataAccess) {
        other.header = self.header;
        other.data.clone_from(&self.data);
        other.fill.clone_from(&self.fill);
        other.segment_size = self.segment_size;
    }

    /// Releases all held memory. The backing file is left untouched.
    pub fn close(&mut self) {
        self.data = Vec::default();
        self.header = [0; HEADER_SLOTS];
    }

    fn corrupt(&self, reason: &'static str) -> StorageError {
        StorageError::CorruptStore {
            name: self.name.clone(),
            reason,
        }
    }
}

#[inline]
fn read_array<const N: usize>(b: &[u8]) -> [u8; N] {
    let mut a = [0; N];
    a.copy_from_slice(b);
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_in_segments_with_fill_pattern() {
        let mut da = Directory::in_memory().find("test");
        da.set_segment_size(8);
        da.set_fill_pattern(&[0xAB, 0xCD]);

        assert!(da.ensure_capacity(3));
        assert_eq!(da.capacity(), 8);
        assert!(!da.ensure_capacity(8));

        da.set_bytes(9, &[1]);
        assert_eq!(da.capacity(), 16);
        assert_eq!(da.bytes(8, 4), Some(&[0xAB, 1, 0xAB, 0xCD][..]));
        assert_eq!(da.bytes(15, 2), None);
    }

    #[test]
    fn flush_and_load() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let dir = Directory::on_disk(tmp.path());

        let mut da = dir.find("ext_test");
        da.create(4);
        da.set_header(0, 2);
        da.set_header(1, 17);
        da.set_bytes(0, &[1, 2, 3]);
        da.flush()?;

        let mut loaded = dir.find("ext_test");
        loaded.load_existing()?;
        assert_eq!(loaded.header(0), 2);
        assert_eq!(loaded.header(1), 17);
        assert_eq!(loaded.bytes(0, 3), Some(&[1, 2, 3][..]));
        assert_eq!(loaded.capacity(), da.capacity());
        Ok(())
    }

    #[test]
    fn load_rejects_missing_and_truncated_files() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let dir = Directory::on_disk(tmp.path());

        let mut da = dir.find("ext_missing");
        assert!(matches!(
            da.load_existing(),
            Err(StorageError::CorruptStore { .. })
        ));

        fs::write(tmp.path().join("ext_short"), b"RXES\x01\x00")?;
        let mut da = dir.find("ext_short");
        assert!(matches!(
            da.load_existing(),
            Err(StorageError::CorruptStore { .. })
        ));

        let mut full = dir.find("ext_body");
        full.create(16);
        full.flush()?;
        let path = tmp.path().join("ext_body");
        let content = fs::read(&path)?;
        fs::write(&path, &content[..content.len() - 1])?;
        assert!(matches!(
            full.load_existing(),
            Err(StorageError::CorruptStore { reason: "truncated body", .. })
        ));
        Ok(())
    }

    #[test]
    fn in_memory_can_not_be_loaded() {
        let mut da = Directory::in_memory().find("test");
        da.create(1);
        assert!(da.flush().is_ok());
        assert!(matches!(
            da.load_existing(),
            Err(StorageError::NotPersistent(_))
        ));
    }
}
