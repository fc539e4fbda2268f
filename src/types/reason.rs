//! Selection reasons: why a component version ended up in the graph.
//!
//! A [`ComponentSelectionReason`] accumulates [`ComponentSelectionDescriptor`]s
//! while conflicts are resolved. The common single-cause reasons are shared
//! constants backed by static slices, so the bulk of the graph never allocates
//! for its reasons.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

/// Cause of a component selection.
///
/// The discriminant order is part of the record stream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentSelectionCause {
    /// The version was requested by a dependency declaration.
    Requested,
    /// The component is the root of the graph.
    Root,
    /// The version was forced.
    Forced,
    /// The version won a conflict against other candidates.
    ConflictResolution,
    /// A substitution or resolution rule selected the version.
    SelectedByRule,
    /// The component was substituted by a project of a composite build.
    CompositeBuild,
    /// A dependency constraint contributed to the selection.
    Constraint,
    /// Other candidates were rejected.
    Rejection,
    /// An ancestor in the graph enforced the version.
    ByAncestor,
}

impl ComponentSelectionCause {
    /// All causes, indexed by their wire discriminant.
    pub const ALL: [ComponentSelectionCause; 9] = [
        Self::Requested,
        Self::Root,
        Self::Forced,
        Self::ConflictResolution,
        Self::SelectedByRule,
        Self::CompositeBuild,
        Self::Constraint,
        Self::Rejection,
        Self::ByAncestor,
    ];

    /// Built-in description used when no custom description is given.
    pub const fn default_description(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Root => "root",
            Self::Forced => "forced",
            Self::ConflictResolution => "conflict resolution",
            Self::SelectedByRule => "selected by rule",
            Self::CompositeBuild => "composite build substitution",
            Self::Constraint => "constraint",
            Self::Rejection => "rejection",
            Self::ByAncestor => "by ancestor",
        }
    }

    /// Wire discriminant of this cause.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Cause for a wire discriminant, `None` if unknown.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }
}

impl fmt::Display for ComponentSelectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_description())
    }
}

/// One entry of a selection reason: a cause plus its description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComponentSelectionDescriptor {
    cause: ComponentSelectionCause,
    description: Cow<'static, str>,
}

impl ComponentSelectionDescriptor {
    /// Descriptor carrying the cause's default description.
    pub const fn new(cause: ComponentSelectionCause) -> Self {
        Self {
            cause,
            description: Cow::Borrowed(cause.default_description()),
        }
    }

    /// Descriptor with an explicit description.
    pub fn with_custom(cause: ComponentSelectionCause, description: impl Into<String>) -> Self {
        Self {
            cause,
            description: Cow::Owned(description.into()),
        }
    }

    /// Same cause, different description.
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self::with_custom(self.cause, description)
    }

    /// The cause.
    pub fn cause(&self) -> ComponentSelectionCause {
        self.cause
    }

    /// The description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the description differs from the cause's default text.
    pub fn has_custom_description(&self) -> bool {
        self.description != self.cause.default_description()
    }
}

impl fmt::Display for ComponentSelectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Error raised by selection reason transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReasonError {
    /// The reason has no conflict-resolution counterpart.
    ///
    /// This signals a logic error in the caller, which only applies conflict
    /// resolution to reasons that can take part in a conflict.
    #[error("Cannot create conflict resolution selection reason for input: {0}")]
    NoConflictTransition(String),
}

/// Ordered set of descriptors explaining a selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ComponentSelectionReason {
    descriptors: Cow<'static, [ComponentSelectionDescriptor]>,
}

type Descriptors = &'static [ComponentSelectionDescriptor];

const REQUESTED_DESCRIPTORS: Descriptors =
    &[ComponentSelectionDescriptor::new(ComponentSelectionCause::Requested)];
const ROOT_DESCRIPTORS: Descriptors =
    &[ComponentSelectionDescriptor::new(ComponentSelectionCause::Root)];
const FORCED_DESCRIPTORS: Descriptors =
    &[ComponentSelectionDescriptor::new(ComponentSelectionCause::Forced)];
const CONFLICT_DESCRIPTORS: Descriptors =
    &[ComponentSelectionDescriptor::new(ComponentSelectionCause::ConflictResolution)];
const RULE_DESCRIPTORS: Descriptors =
    &[ComponentSelectionDescriptor::new(ComponentSelectionCause::SelectedByRule)];
const RULE_AND_CONFLICT_DESCRIPTORS: Descriptors = &[
    ComponentSelectionDescriptor::new(ComponentSelectionCause::SelectedByRule),
    ComponentSelectionDescriptor::new(ComponentSelectionCause::ConflictResolution),
];
const COMPOSITE_DESCRIPTORS: Descriptors =
    &[ComponentSelectionDescriptor::new(ComponentSelectionCause::CompositeBuild)];

impl ComponentSelectionReason {
    /// Selected because it was requested.
    pub const REQUESTED: Self = Self::from_static(REQUESTED_DESCRIPTORS);
    /// The graph root.
    pub const ROOT: Self = Self::from_static(ROOT_DESCRIPTORS);
    /// Forced version.
    pub const FORCED: Self = Self::from_static(FORCED_DESCRIPTORS);
    /// Won a version conflict.
    pub const CONFLICT_RESOLUTION: Self = Self::from_static(CONFLICT_DESCRIPTORS);
    /// Selected by a rule.
    pub const SELECTED_BY_RULE: Self = Self::from_static(RULE_DESCRIPTORS);
    /// Selected by a rule, then won a version conflict.
    pub const SELECTED_BY_RULE_AND_CONFLICT_RESOLUTION: Self =
        Self::from_static(RULE_AND_CONFLICT_DESCRIPTORS);
    /// Substituted by a composite build participant.
    pub const COMPOSITE_BUILD: Self = Self::from_static(COMPOSITE_DESCRIPTORS);

    const fn from_static(descriptors: Descriptors) -> Self {
        Self {
            descriptors: Cow::Borrowed(descriptors),
        }
    }

    /// An empty reason, to be filled with [`add_cause`](Self::add_cause).
    pub fn empty() -> Self {
        Self {
            descriptors: Cow::Owned(Vec::new()),
        }
    }

    /// Reason holding the given descriptors, duplicates dropped.
    pub fn of(descriptors: impl IntoIterator<Item = ComponentSelectionDescriptor>) -> Self {
        let mut reason = Self::empty();
        for descriptor in descriptors {
            reason.add_cause(descriptor);
        }
        reason
    }

    /// Append a descriptor unless an equal one is already present.
    pub fn add_cause(&mut self, descriptor: ComponentSelectionDescriptor) -> &mut Self {
        if !self.descriptors.contains(&descriptor) {
            self.descriptors.to_mut().push(descriptor);
        }
        self
    }

    /// Replace every descriptor with `descriptor`.
    pub fn set_cause(&mut self, descriptor: ComponentSelectionDescriptor) -> &mut Self {
        self.descriptors = Cow::Owned(Vec::new());
        self.add_cause(descriptor)
    }

    /// Descriptors in insertion order.
    pub fn descriptors(&self) -> &[ComponentSelectionDescriptor] {
        &self.descriptors
    }

    fn has_cause(&self, cause: ComponentSelectionCause) -> bool {
        self.descriptors.iter().any(|d| d.cause == cause)
    }

    /// Whether a single requested or root cause explains the selection.
    pub fn is_expected(&self) -> bool {
        match &*self.descriptors {
            [only] => matches!(
                only.cause,
                ComponentSelectionCause::Requested | ComponentSelectionCause::Root
            ),
            _ => false,
        }
    }

    /// Whether any descriptor is [`Forced`](ComponentSelectionCause::Forced).
    pub fn is_forced(&self) -> bool {
        self.has_cause(ComponentSelectionCause::Forced)
    }

    /// Whether any descriptor is [`ConflictResolution`](ComponentSelectionCause::ConflictResolution).
    pub fn is_conflict_resolution(&self) -> bool {
        self.has_cause(ComponentSelectionCause::ConflictResolution)
    }

    /// Whether any descriptor is [`SelectedByRule`](ComponentSelectionCause::SelectedByRule).
    pub fn is_selected_by_rule(&self) -> bool {
        self.has_cause(ComponentSelectionCause::SelectedByRule)
    }

    /// Whether any descriptor is [`Constraint`](ComponentSelectionCause::Constraint).
    pub fn is_constrained(&self) -> bool {
        self.has_cause(ComponentSelectionCause::Constraint)
    }

    /// Whether any descriptor is [`CompositeBuild`](ComponentSelectionCause::CompositeBuild).
    pub fn is_composite_substitution(&self) -> bool {
        self.has_cause(ComponentSelectionCause::CompositeBuild)
    }

    /// Whether any descriptor carries a custom description.
    pub fn has_custom_descriptions(&self) -> bool {
        self.descriptors.iter().any(|d| d.has_custom_description())
    }

    /// The reason that also records a conflict resolution.
    ///
    /// | input | output |
    /// |-------|--------|
    /// | already a conflict resolution | unchanged |
    /// | selected by rule | selected by rule and conflict resolution |
    /// | requested, forced | conflict resolution |
    /// | root | root |
    pub fn with_conflict_resolution(reason: &Self) -> Result<Self, ReasonError> {
        if reason.is_conflict_resolution() || *reason == Self::ROOT {
            Ok(reason.clone())
        } else if *reason == Self::SELECTED_BY_RULE {
            Ok(Self::SELECTED_BY_RULE_AND_CONFLICT_RESOLUTION)
        } else if *reason == Self::REQUESTED || *reason == Self::FORCED {
            Ok(Self::CONFLICT_RESOLUTION)
        } else {
            Err(ReasonError::NoConflictTransition(reason.to_string()))
        }
    }
}

impl Default for ComponentSelectionReason {
    fn default() -> Self {
        Self::REQUESTED
    }
}

impl fmt::Display for ComponentSelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.descriptors.last() {
            Some(last) => write!(f, "{}", last),
            None => f.write_str("unknown"),
        }
    }
}
