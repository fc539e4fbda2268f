//! Write-once / read-once reference tables.
//!
//! Heavyweight values that repeat throughout a graph are written in full on
//! first occurrence and as a bare index afterwards:
//!
//! ```text
//! absent          -> -1
//! first occurrence -> index, payload      (index == number of values seen)
//! repeat          -> index
//! ```
//!
//! The reader mirrors the writer positionally, so a stream must be decoded in
//! exactly the order it was encoded, in one pass. A writer/reader pair serves
//! one resolution in one direction and must be [`reset`](DedupWriter::reset)
//! before being reused for another.

use std::collections::HashMap;
use std::hash::Hash;
use std::io::{Read, Write};

use super::{CodecError, Decoder, Encoder};

const ABSENT: i64 = -1;

/// Assigns indices to values on first write.
///
/// Values are keyed by structural equality. For `Arc<T>` payloads this means
/// two distinct allocations of equal values share one index.
#[derive(Debug)]
pub struct DedupWriter<T> {
    indices: HashMap<T, i64>,
}

impl<T: Eq + Hash + Clone> DedupWriter<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            indices: HashMap::new(),
        }
    }

    /// Write the reference for `value`.
    ///
    /// Returns `true` when this is the first occurrence and the caller must
    /// write the payload next.
    pub fn write_ref<W: Write>(
        &mut self,
        enc: &mut Encoder<W>,
        value: Option<&T>,
    ) -> Result<bool, CodecError> {
        let Some(value) = value else {
            enc.write_long(ABSENT)?;
            return Ok(false);
        };
        if let Some(&index) = self.indices.get(value) {
            enc.write_long(index)?;
            return Ok(false);
        }
        let index = self.indices.len() as i64;
        self.indices.insert(value.clone(), index);
        enc.write_long(index)?;
        Ok(true)
    }

    /// Write the reference for `value`, followed by its payload on first
    /// occurrence.
    pub fn write<W, F>(&mut self, enc: &mut Encoder<W>, value: Option<&T>, payload: F) -> Result<(), CodecError>
    where
        W: Write,
        F: FnOnce(&mut Encoder<W>, &T) -> Result<(), CodecError>,
    {
        if self.write_ref(enc, value)? {
            if let Some(value) = value {
                payload(enc, value)?;
            }
        }
        Ok(())
    }

    /// Number of distinct values written.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Forget every value.
    pub fn reset(&mut self) {
        self.indices.clear();
    }
}

impl<T: Eq + Hash + Clone> Default for DedupWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<T> {
    /// The writer wrote no value.
    Absent,
    /// A value materialized earlier in the stream.
    Known(T),
    /// First occurrence: the payload follows and must be passed to
    /// [`DedupReader::complete`] with this slot.
    First(usize),
}

/// Positional mirror of a [`DedupWriter`].
#[derive(Debug)]
pub struct DedupReader<T> {
    values: Vec<Option<T>>,
}

impl<T: Clone> DedupReader<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Read a reference.
    ///
    /// A first occurrence reserves its slot before the payload is decoded, so
    /// payloads may contain nested references to the same table.
    pub fn read_ref<R: Read>(&mut self, dec: &mut Decoder<R>) -> Result<Reference<T>, CodecError> {
        let index = dec.read_long()?;
        if index == ABSENT {
            return Ok(Reference::Absent);
        }
        let slot = usize::try_from(index)
            .map_err(|_| CodecError::Malformed(format!("negative reference {}", index)))?;
        if slot == self.values.len() {
            self.values.push(None);
            return Ok(Reference::First(slot));
        }
        match self.values.get(slot) {
            Some(Some(value)) => Ok(Reference::Known(value.clone())),
            Some(None) => Err(CodecError::Malformed(format!(
                "reference {} used while its payload is being decoded",
                slot
            ))),
            None => Err(CodecError::Malformed(format!(
                "reference {} is ahead of the {} values read so far",
                slot,
                self.values.len()
            ))),
        }
    }

    /// Store the payload of a first occurrence and return it.
    pub fn complete(&mut self, slot: usize, value: T) -> T {
        if let Some(entry) = self.values.get_mut(slot) {
            *entry = Some(value.clone());
        }
        value
    }

    /// Read a reference, decoding the payload on first occurrence.
    pub fn read<R, F>(&mut self, dec: &mut Decoder<R>, payload: F) -> Result<Option<T>, CodecError>
    where
        R: Read,
        F: FnOnce(&mut Decoder<R>) -> Result<T, CodecError>,
    {
        match self.read_ref(dec)? {
            Reference::Absent => Ok(None),
            Reference::Known(value) => Ok(Some(value)),
            Reference::First(slot) => {
                let value = payload(dec)?;
                Ok(Some(self.complete(slot, value)))
            }
        }
    }

    /// Number of values read.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was read yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Forget every value.
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

impl<T: Clone> Default for DedupReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    fn write_all(values: &[Option<Arc<String>>]) -> Vec<u8> {
        let mut writer = DedupWriter::new();
        let mut bytes = Vec::new();
        let mut enc = Encoder::new(&mut bytes);
        for value in values {
            writer
                .write(&mut enc, value.as_ref(), |enc, v| enc.write_string(v))
                .unwrap();
        }
        bytes
    }

    #[test]
    fn test_repeat_is_written_as_index_only() {
        let value = Arc::new("a fairly long payload string".to_string());
        let once = write_all(&[Some(value.clone())]);
        let twice = write_all(&[Some(value.clone()), Some(value)]);

        // The repeat costs one byte for index 0.
        assert_eq!(twice.len(), once.len() + 1);
    }

    #[test]
    fn test_reader_shares_instances() {
        let a = Arc::new("a".to_string());
        let b = Arc::new("b".to_string());
        let bytes = write_all(&[Some(a.clone()), None, Some(b), Some(Arc::new("a".to_string()))]);

        let mut reader: DedupReader<Arc<String>> = DedupReader::new();
        let mut dec = Decoder::new(Cursor::new(bytes));
        let mut read = || {
            reader
                .read(&mut dec, |dec| dec.read_string().map(Arc::new))
                .unwrap()
        };

        let first = read().unwrap();
        assert_eq!(read(), None);
        assert_eq!(read().unwrap().as_str(), "b");
        let again = read().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_reference_ahead_of_stream_is_malformed() {
        let mut bytes = Vec::new();
        Encoder::new(&mut bytes).write_long(3).unwrap();

        let mut reader: DedupReader<String> = DedupReader::new();
        let err = reader.read_ref(&mut Decoder::new(Cursor::new(bytes))).unwrap_err();
        assert!(err.to_string().contains("ahead"));
    }

    #[test]
    fn test_reset_restarts_indices() {
        let mut writer = DedupWriter::new();
        let mut bytes = Vec::new();
        let mut enc = Encoder::new(&mut bytes);
        assert!(writer.write_ref(&mut enc, Some(&"x")).unwrap());
        assert!(!writer.write_ref(&mut enc, Some(&"x")).unwrap());
        writer.reset();
        assert!(writer.is_empty());
        assert!(writer.write_ref(&mut enc, Some(&"x")).unwrap());
    }
}
