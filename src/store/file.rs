//! File-backed binary store.
//!
//! Records are appended to a private file under a configured directory. The
//! file is deleted once its content has been read, when the data handle is
//! dropped unread, or when the store is dropped before it was finished.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

use super::{BinaryData, BinaryStore, StoreError};

const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove resolution result file"
            );
        }
    }
}

/// Binary store appending to a file.
#[derive(Debug)]
pub struct FileBinaryStore {
    path: Option<PathBuf>,
    writer: BufWriter<File>,
    position: u64,
}

impl FileBinaryStore {
    /// Create a fresh store file in `directory`.
    pub fn create(directory: &Path) -> Result<Self, StoreError> {
        Self::create_with_capacity(directory, DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a fresh store file in `directory` with a write buffer of
    /// `capacity` bytes.
    pub fn create_with_capacity(directory: &Path, capacity: usize) -> Result<Self, StoreError> {
        fs::create_dir_all(directory)?;
        let path = directory.join(format!("resolution-{}.bin", Uuid::new_v4()));
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        tracing::trace!(path = %path.display(), "Opened resolution result file");
        Ok(Self {
            path: Some(path),
            writer: BufWriter::with_capacity(capacity.max(1), file),
            position: 0,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl BinaryStore for FileBinaryStore {
    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.writer.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn done(mut self: Box<Self>) -> Result<Box<dyn BinaryData>, StoreError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        // Taking the path hands file ownership to the data handle; the
        // store's drop no longer deletes it.
        let path = self.path.take().ok_or(StoreError::AlreadyConsumed)?;
        Ok(Box::new(FileBinaryData {
            path: Mutex::new(Some(path)),
            len: self.position,
        }))
    }
}

impl Drop for FileBinaryStore {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            remove_quietly(&path);
        }
    }
}

/// Read-once file content.
#[derive(Debug)]
pub struct FileBinaryData {
    path: Mutex<Option<PathBuf>>,
    len: u64,
}

impl FileBinaryData {
    /// Path of the backing file, `None` once consumed.
    pub fn path(&self) -> Option<PathBuf> {
        self.path.lock().clone()
    }
}

impl BinaryData for FileBinaryData {
    fn read(&self) -> Result<Box<dyn Read + Send>, StoreError> {
        let path = self.path.lock().take().ok_or(StoreError::AlreadyConsumed)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(ScopedFileReader {
                reader: BufReader::new(file),
                path,
            })),
            Err(e) => {
                remove_quietly(&path);
                Err(e.into())
            }
        }
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn is_consumed(&self) -> bool {
        self.path.lock().is_none()
    }
}

impl Drop for FileBinaryData {
    fn drop(&mut self) {
        if let Some(path) = self.path.get_mut().take() {
            remove_quietly(&path);
        }
    }
}

/// Reader that deletes its file when dropped.
struct ScopedFileReader {
    reader: BufReader<File>,
    path: PathBuf,
}

impl Read for ScopedFileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Drop for ScopedFileReader {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}
