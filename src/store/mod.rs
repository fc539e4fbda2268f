//! Append-only binary stores backing a resolution result.
//!
//! A [`BinaryStore`] is opened when a resolution starts and receives whole
//! records while the graph is walked. [`BinaryStore::done`] consumes the store
//! and hands back an immutable [`BinaryData`] handle, which can be read
//! exactly once. The backing resource is released after that read, or when the
//! handle is dropped unread.

pub mod memory;
pub mod file;

use std::io::{self, Read};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("Binary store I/O error: {0}")]
    Io(#[from] io::Error),
    /// The data was already read once.
    #[error("Binary data has already been consumed; resolution results can only be read once")]
    AlreadyConsumed,
}

/// Write side of a binary store.
pub trait BinaryStore: Send {
    /// Append one record.
    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Number of bytes written so far.
    fn position(&self) -> u64;

    /// Close the store for writing.
    fn done(self: Box<Self>) -> Result<Box<dyn BinaryData>, StoreError>;
}

/// Immutable, read-once content of a finished store.
pub trait BinaryData: Send + Sync + std::fmt::Debug {
    /// Open the content for a single sequential read.
    ///
    /// Every call after the first fails with [`StoreError::AlreadyConsumed`],
    /// whether or not the first read succeeded. Dropping the returned reader
    /// releases the backing resource.
    fn read(&self) -> Result<Box<dyn Read + Send>, StoreError>;

    /// Total number of bytes.
    fn len(&self) -> u64;

    /// Whether no bytes were written.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`read`](Self::read) was already called.
    fn is_consumed(&self) -> bool;
}

pub use memory::{InMemoryBinaryData, InMemoryBinaryStore};
pub use file::{FileBinaryData, FileBinaryStore};
