//! Fixed-schema codecs for identifiers, selectors and version constraints.

use std::io::{Read, Write};

use super::{CodecError, Decoder, Encoder};
use crate::types::{ComponentIdentifier, ComponentSelector, ModuleVersionIdentifier, VersionConstraint};

const MODULE: u8 = 1;
const PROJECT: u8 = 2;
const LIBRARY: u8 = 3;

/// Write a module version identifier.
pub fn write_module_version<W: Write>(
    enc: &mut Encoder<W>,
    id: &ModuleVersionIdentifier,
) -> Result<(), CodecError> {
    enc.write_string(&id.module.group)?;
    enc.write_string(&id.module.name)?;
    enc.write_string(&id.version)
}

/// Read a module version identifier.
pub fn read_module_version<R: Read>(dec: &mut Decoder<R>) -> Result<ModuleVersionIdentifier, CodecError> {
    let group = dec.read_string()?;
    let name = dec.read_string()?;
    let version = dec.read_string()?;
    Ok(ModuleVersionIdentifier::new(group, name, version))
}

/// Write a component identifier.
pub fn write_component_identifier<W: Write>(
    enc: &mut Encoder<W>,
    id: &ComponentIdentifier,
) -> Result<(), CodecError> {
    match id {
        ComponentIdentifier::Module { group, module, version } => {
            enc.write_byte(MODULE)?;
            enc.write_string(group)?;
            enc.write_string(module)?;
            enc.write_string(version)
        }
        ComponentIdentifier::Project {
            build_path,
            project_path,
        } => {
            enc.write_byte(PROJECT)?;
            enc.write_string(build_path)?;
            enc.write_string(project_path)
        }
        ComponentIdentifier::Library {
            project_path,
            library_name,
            variant,
        } => {
            enc.write_byte(LIBRARY)?;
            enc.write_string(project_path)?;
            enc.write_string(library_name)?;
            enc.write_string(variant)
        }
    }
}

/// Read a component identifier.
pub fn read_component_identifier<R: Read>(dec: &mut Decoder<R>) -> Result<ComponentIdentifier, CodecError> {
    match dec.read_byte()? {
        MODULE => {
            let group = dec.read_string()?;
            let module = dec.read_string()?;
            let version = dec.read_string()?;
            Ok(ComponentIdentifier::module(group, module, version))
        }
        PROJECT => {
            let build_path = dec.read_string()?;
            let project_path = dec.read_string()?;
            Ok(ComponentIdentifier::project(build_path, project_path))
        }
        LIBRARY => {
            let project_path = dec.read_string()?;
            let library_name = dec.read_string()?;
            let variant = dec.read_string()?;
            Ok(ComponentIdentifier::library(project_path, library_name, variant))
        }
        tag => Err(CodecError::UnknownTag {
            kind: "component identifier",
            tag,
        }),
    }
}

/// Write a version constraint.
///
/// The format has room for several rejected versions, but only zero or one
/// can be written until readers of older streams are retired.
pub fn write_version_constraint<W: Write>(
    enc: &mut Encoder<W>,
    constraint: &VersionConstraint,
) -> Result<(), CodecError> {
    if constraint.rejected.len() > 1 {
        return Err(CodecError::Unsupported(format!(
            "Cannot encode more than one rejected version, got {}: not yet supported",
            constraint
        )));
    }
    enc.write_string(&constraint.preferred)?;
    enc.write_len(constraint.rejected.len())?;
    for rejected in &constraint.rejected {
        enc.write_string(rejected)?;
    }
    Ok(())
}

/// Read a version constraint. Any number of rejected versions is accepted.
pub fn read_version_constraint<R: Read>(dec: &mut Decoder<R>) -> Result<VersionConstraint, CodecError> {
    let preferred = dec.read_string()?;
    let count = dec.read_len()?;
    let mut rejected = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        rejected.push(dec.read_string()?);
    }
    Ok(VersionConstraint { preferred, rejected })
}

/// Write a component selector.
pub fn write_component_selector<W: Write>(
    enc: &mut Encoder<W>,
    selector: &ComponentSelector,
) -> Result<(), CodecError> {
    match selector {
        ComponentSelector::Module {
            group,
            module,
            constraint,
        } => {
            enc.write_byte(MODULE)?;
            enc.write_string(group)?;
            enc.write_string(module)?;
            write_version_constraint(enc, constraint)
        }
        ComponentSelector::Project {
            build_path,
            project_path,
        } => {
            enc.write_byte(PROJECT)?;
            enc.write_string(build_path)?;
            enc.write_string(project_path)
        }
        ComponentSelector::Library {
            project_path,
            library_name,
            variant,
        } => {
            enc.write_byte(LIBRARY)?;
            enc.write_string(project_path)?;
            enc.write_string(library_name)?;
            enc.write_nullable_string(variant.as_deref())
        }
    }
}

/// Read a component selector.
pub fn read_component_selector<R: Read>(dec: &mut Decoder<R>) -> Result<ComponentSelector, CodecError> {
    match dec.read_byte()? {
        MODULE => {
            let group = dec.read_string()?;
            let module = dec.read_string()?;
            let constraint = read_version_constraint(dec)?;
            Ok(ComponentSelector::module_with_constraint(group, module, constraint))
        }
        PROJECT => {
            let build_path = dec.read_string()?;
            let project_path = dec.read_string()?;
            Ok(ComponentSelector::project(build_path, project_path))
        }
        LIBRARY => {
            let project_path = dec.read_string()?;
            let library_name = dec.read_string()?;
            let variant = dec.read_nullable_string()?;
            Ok(ComponentSelector::library(project_path, library_name, variant))
        }
        tag => Err(CodecError::UnknownTag {
            kind: "component selector",
            tag,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decoder(bytes: Vec<u8>) -> Decoder<Cursor<Vec<u8>>> {
        Decoder::new(Cursor::new(bytes))
    }

    #[test]
    fn test_identifier_variants_round_trip() {
        let ids = vec![
            ComponentIdentifier::module("org.example", "core", "1.2.3"),
            ComponentIdentifier::project(":", ":app"),
            ComponentIdentifier::library(":native", "math", "release"),
        ];
        let mut bytes = Vec::new();
        let mut enc = Encoder::new(&mut bytes);
        for id in &ids {
            write_component_identifier(&mut enc, id).unwrap();
        }

        let mut dec = decoder(bytes);
        for id in &ids {
            assert_eq!(&read_component_identifier(&mut dec).unwrap(), id);
        }
    }

    #[test]
    fn test_selector_with_rejected_version() {
        let selector = ComponentSelector::module_with_constraint(
            "org",
            "lib",
            VersionConstraint::prefer("2.0").rejecting("1.9"),
        );
        let mut bytes = Vec::new();
        write_component_selector(&mut Encoder::new(&mut bytes), &selector).unwrap();

        assert_eq!(read_component_selector(&mut decoder(bytes)).unwrap(), selector);
    }

    #[test]
    fn test_more_than_one_rejected_version_is_unsupported_on_write() {
        let constraint = VersionConstraint::prefer("2.0").rejecting("1.8").rejecting("1.9");
        let mut bytes = Vec::new();

        let err = write_version_constraint(&mut Encoder::new(&mut bytes), &constraint).unwrap_err();
        assert!(matches!(err, CodecError::Unsupported(_)));
        assert!(err.to_string().contains("not yet supported"));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_more_than_one_rejected_version_is_accepted_on_read() {
        let mut bytes = Vec::new();
        let mut enc = Encoder::new(&mut bytes);
        enc.write_string("2.0").unwrap();
        enc.write_small_int(2).unwrap();
        enc.write_string("1.8").unwrap();
        enc.write_string("1.9").unwrap();

        let constraint = read_version_constraint(&mut decoder(bytes)).unwrap();
        assert_eq!(constraint.rejected, vec!["1.8".to_string(), "1.9".to_string()]);
    }

    #[test]
    fn test_unknown_tag_fails_fast() {
        match read_component_identifier(&mut decoder(vec![42])) {
            Err(CodecError::UnknownTag { kind, tag }) => {
                assert_eq!(kind, "component identifier");
                assert_eq!(tag, 42);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            read_component_selector(&mut decoder(vec![0])),
            Err(CodecError::UnknownTag { tag: 0, .. })
        ));
    }
}
