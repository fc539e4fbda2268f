//! Record framing of the resolution result stream.
//!
//! ```text
//! COMPONENT(1)  result_id, module_version, reason, component_id,
//!               variant count, variant refs..., repository name?
//! DEPENDENCY(2) owner result_id, edge count, edges...
//! ROOT(3)       root result_id
//!
//! edge          requested selector, constraint flag, reason, outcome byte,
//!               then for resolved edges: selected result_id, variant ref?
//! ```
//!
//! A stream holds any number of `COMPONENT` and `DEPENDENCY` records,
//! terminated by exactly one `ROOT` record. The `ROOT` tag is tied to the
//! writer version and only ever changes together with the record layouts.

use std::fmt;

/// Outcome byte of a resolved edge; followed by the selected id and variant.
pub const EDGE_RESOLVED: u8 = 0;
/// Outcome byte of a failed edge.
pub const EDGE_FAILED: u8 = 1;

/// Kind of a stream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTag {
    /// A component and its selected variants.
    Component,
    /// The outgoing edges of one node.
    Dependency,
    /// The root of the graph; always the last record.
    Root,
}

impl RecordTag {
    /// Tag byte of `COMPONENT` records.
    pub const COMPONENT: u8 = 1;
    /// Tag byte of `DEPENDENCY` records.
    pub const DEPENDENCY: u8 = 2;
    /// Tag byte of `ROOT` records written by this version.
    pub const ROOT: u8 = 3;

    /// Wire tag.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Component => Self::COMPONENT,
            Self::Dependency => Self::DEPENDENCY,
            Self::Root => Self::ROOT,
        }
    }

    /// Record kind for a wire tag.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::COMPONENT => Some(Self::Component),
            Self::DEPENDENCY => Some(Self::Dependency),
            Self::ROOT => Some(Self::Root),
            _ => None,
        }
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Component => "COMPONENT",
            Self::Dependency => "DEPENDENCY",
            Self::Root => "ROOT",
        }
    }
}

impl fmt::Display for RecordTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
