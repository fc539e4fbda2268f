//! In-memory binary store.

use std::io::{Cursor, Read};

use parking_lot::Mutex;

use super::{BinaryData, BinaryStore, StoreError};

/// Binary store holding its records in a growable buffer.
#[derive(Debug, Default)]
pub struct InMemoryBinaryStore {
    buffer: Vec<u8>,
}

impl InMemoryBinaryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }
}

impl BinaryStore for InMemoryBinaryStore {
    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn done(self: Box<Self>) -> Result<Box<dyn BinaryData>, StoreError> {
        Ok(Box::new(InMemoryBinaryData::new(self.buffer)))
    }
}

/// Read-once in-memory content.
#[derive(Debug)]
pub struct InMemoryBinaryData {
    bytes: Mutex<Option<Vec<u8>>>,
    len: u64,
}

impl InMemoryBinaryData {
    /// Wrap finished content.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            len: bytes.len() as u64,
            bytes: Mutex::new(Some(bytes)),
        }
    }
}

impl BinaryData for InMemoryBinaryData {
    fn read(&self) -> Result<Box<dyn Read + Send>, StoreError> {
        let bytes = self.bytes.lock().take().ok_or(StoreError::AlreadyConsumed)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn is_consumed(&self) -> bool {
        self.bytes.lock().is_none()
    }
}
