//! Deduplicating codec for selected variants and attribute containers.
//!
//! Variant payload: owner identifier, display name, attribute container
//! reference, capabilities, external variant reference. The external variant
//! goes through the same table as its referrer.

use std::io::{Read, Write};
use std::sync::Arc;

use super::dedup::{DedupReader, DedupWriter, Reference};
use super::identifier::{read_component_identifier, write_component_identifier};
use super::{CodecError, Decoder, Encoder};
use crate::types::{AttributeContainer, AttributeValue, Capability, ResolvedVariantResult};

const STRING_VALUE: u8 = 0;
const BOOL_VALUE: u8 = 1;
const INT_VALUE: u8 = 2;

/// Writer side of the variant tables.
#[derive(Debug, Default)]
pub struct ResolvedVariantWriter {
    variants: DedupWriter<Arc<ResolvedVariantResult>>,
    attributes: DedupWriter<Arc<AttributeContainer>>,
}

impl ResolvedVariantWriter {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an optional variant.
    pub fn write<W: Write>(
        &mut self,
        enc: &mut Encoder<W>,
        variant: Option<&Arc<ResolvedVariantResult>>,
    ) -> Result<(), CodecError> {
        if !self.variants.write_ref(enc, variant)? {
            return Ok(());
        }
        let Some(variant) = variant else {
            return Ok(());
        };
        write_component_identifier(enc, &variant.owner)?;
        enc.write_string(&variant.display_name)?;
        self.write_attributes(enc, &variant.attributes)?;
        write_capabilities(enc, &variant.capabilities)?;
        self.write(enc, variant.external_variant.as_ref())
    }

    /// Write an attribute container.
    pub fn write_attributes<W: Write>(
        &mut self,
        enc: &mut Encoder<W>,
        attributes: &Arc<AttributeContainer>,
    ) -> Result<(), CodecError> {
        self.attributes.write(enc, Some(attributes), |enc, attributes| {
            enc.write_len(attributes.len())?;
            for (name, value) in attributes.iter() {
                enc.write_string(name)?;
                match value {
                    AttributeValue::String(s) => {
                        enc.write_byte(STRING_VALUE)?;
                        enc.write_string(s)?;
                    }
                    AttributeValue::Bool(b) => {
                        enc.write_byte(BOOL_VALUE)?;
                        enc.write_bool(*b)?;
                    }
                    AttributeValue::Int(i) => {
                        enc.write_byte(INT_VALUE)?;
                        enc.write_long(*i)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Number of distinct variants written.
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Forget every variant and attribute container.
    pub fn reset(&mut self) {
        self.variants.reset();
        self.attributes.reset();
    }
}

/// Reader side of the variant tables.
#[derive(Debug, Default)]
pub struct ResolvedVariantReader {
    variants: DedupReader<Arc<ResolvedVariantResult>>,
    attributes: DedupReader<Arc<AttributeContainer>>,
}

impl ResolvedVariantReader {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an optional variant.
    pub fn read<R: Read>(
        &mut self,
        dec: &mut Decoder<R>,
    ) -> Result<Option<Arc<ResolvedVariantResult>>, CodecError> {
        let slot = match self.variants.read_ref(dec)? {
            Reference::Absent => return Ok(None),
            Reference::Known(variant) => return Ok(Some(variant)),
            Reference::First(slot) => slot,
        };
        let owner = read_component_identifier(dec)?;
        let display_name = dec.read_string()?;
        let attributes = self.read_attributes(dec)?;
        let capabilities = read_capabilities(dec)?;
        let external_variant = self.read(dec)?;

        let variant = Arc::new(ResolvedVariantResult {
            owner,
            display_name,
            attributes,
            capabilities,
            external_variant,
        });
        Ok(Some(self.variants.complete(slot, variant)))
    }

    /// Read an attribute container.
    pub fn read_attributes<R: Read>(&mut self, dec: &mut Decoder<R>) -> Result<Arc<AttributeContainer>, CodecError> {
        let attributes = self.attributes.read(dec, |dec| {
            let count = dec.read_len()?;
            let mut entries = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                let name = dec.read_string()?;
                let value = match dec.read_byte()? {
                    STRING_VALUE => AttributeValue::String(dec.read_string()?),
                    BOOL_VALUE => AttributeValue::Bool(dec.read_bool()?),
                    INT_VALUE => AttributeValue::Int(dec.read_long()?),
                    tag => {
                        return Err(CodecError::UnknownTag {
                            kind: "attribute value",
                            tag,
                        })
                    }
                };
                entries.push((name, value));
            }
            Ok(Arc::new(entries.into_iter().collect()))
        })?;
        attributes.ok_or_else(|| CodecError::Malformed("attribute container reference is absent".to_string()))
    }

    /// Forget every variant and attribute container.
    pub fn reset(&mut self) {
        self.variants.reset();
        self.attributes.reset();
    }
}

fn write_capabilities<W: Write>(enc: &mut Encoder<W>, capabilities: &[Capability]) -> Result<(), CodecError> {
    enc.write_len(capabilities.len())?;
    for capability in capabilities {
        enc.write_string(&capability.group)?;
        enc.write_string(&capability.name)?;
        enc.write_nullable_string(capability.version.as_deref())?;
    }
    Ok(())
}

fn read_capabilities<R: Read>(dec: &mut Decoder<R>) -> Result<Vec<Capability>, CodecError> {
    let count = dec.read_len()?;
    let mut capabilities = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let group = dec.read_string()?;
        let name = dec.read_string()?;
        let version = dec.read_nullable_string()?;
        capabilities.push(Capability::new(group, name, version));
    }
    Ok(capabilities)
}
