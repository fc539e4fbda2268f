//! Selection reason codec.
//!
//! `count`, then per descriptor: cause byte, custom-description flag and,
//! when the flag is set, the description.

use std::io::{Read, Write};

use super::{CodecError, Decoder, Encoder};
use crate::types::{ComponentSelectionCause, ComponentSelectionDescriptor, ComponentSelectionReason};

/// Write a selection reason.
pub fn write_reason<W: Write>(
    enc: &mut Encoder<W>,
    reason: &ComponentSelectionReason,
) -> Result<(), CodecError> {
    let descriptors = reason.descriptors();
    enc.write_len(descriptors.len())?;
    for descriptor in descriptors {
        enc.write_byte(descriptor.cause().to_byte())?;
        if descriptor.has_custom_description() {
            enc.write_bool(true)?;
            enc.write_string(descriptor.description())?;
        } else {
            enc.write_bool(false)?;
        }
    }
    Ok(())
}

/// Read a selection reason.
pub fn read_reason<R: Read>(dec: &mut Decoder<R>) -> Result<ComponentSelectionReason, CodecError> {
    let count = dec.read_len()?;
    let mut descriptors = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let tag = dec.read_byte()?;
        let cause = ComponentSelectionCause::from_byte(tag).ok_or(CodecError::UnknownTag {
            kind: "selection cause",
            tag,
        })?;
        let descriptor = if dec.read_bool()? {
            ComponentSelectionDescriptor::with_custom(cause, dec.read_string()?)
        } else {
            ComponentSelectionDescriptor::new(cause)
        };
        descriptors.push(descriptor);
    }
    Ok(shared(ComponentSelectionReason::of(descriptors)))
}

/// Swap a decoded reason for its shared constant when one exists.
fn shared(reason: ComponentSelectionReason) -> ComponentSelectionReason {
    const SHARED: [ComponentSelectionReason; 7] = [
        ComponentSelectionReason::REQUESTED,
        ComponentSelectionReason::ROOT,
        ComponentSelectionReason::FORCED,
        ComponentSelectionReason::CONFLICT_RESOLUTION,
        ComponentSelectionReason::SELECTED_BY_RULE,
        ComponentSelectionReason::SELECTED_BY_RULE_AND_CONFLICT_RESOLUTION,
        ComponentSelectionReason::COMPOSITE_BUILD,
    ];
    SHARED
        .into_iter()
        .find(|candidate| *candidate == reason)
        .unwrap_or(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(reason: &ComponentSelectionReason) -> (ComponentSelectionReason, usize) {
        let mut bytes = Vec::new();
        write_reason(&mut Encoder::new(&mut bytes), reason).unwrap();
        let len = bytes.len();
        (read_reason(&mut Decoder::new(Cursor::new(bytes))).unwrap(), len)
    }

    #[test]
    fn test_default_descriptions_are_not_written() {
        let (decoded, len) = round_trip(&ComponentSelectionReason::SELECTED_BY_RULE_AND_CONFLICT_RESOLUTION);
        assert_eq!(decoded, ComponentSelectionReason::SELECTED_BY_RULE_AND_CONFLICT_RESOLUTION);
        // count + 2 * (cause + flag)
        assert_eq!(len, 5);
    }

    #[test]
    fn test_custom_descriptions_survive() {
        let reason = ComponentSelectionReason::of([
            ComponentSelectionDescriptor::new(ComponentSelectionCause::Requested),
            ComponentSelectionDescriptor::with_custom(ComponentSelectionCause::Rejection, "1.0 is vulnerable"),
        ]);
        let (decoded, _) = round_trip(&reason);
        assert_eq!(decoded, reason);
        assert_eq!(decoded.to_string(), "1.0 is vulnerable");
    }

    #[test]
    fn test_unknown_cause_fails_fast() {
        let mut dec = Decoder::new(Cursor::new(vec![1u8, 200, 0]));
        assert!(matches!(
            read_reason(&mut dec),
            Err(CodecError::UnknownTag { kind: "selection cause", tag: 200 })
        ));
    }
}
