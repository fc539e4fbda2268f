//! Core types of the resolution result model.

pub mod reason;
pub mod identifier;
pub mod variant;
pub mod failure;
pub mod result;

pub use reason::{
    ComponentSelectionCause, ComponentSelectionDescriptor, ComponentSelectionReason, ReasonError,
};
pub use identifier::{
    ComponentIdentifier, ComponentSelector, ModuleIdentifier, ModuleVersionIdentifier,
    VersionConstraint,
};
pub use variant::{AttributeContainer, AttributeValue, Capability, ResolvedVariantResult};
pub use failure::ResolveFailure;
pub use result::{
    ComponentResult, DependencyOutcome, DependencyResult, ResolutionId, ResolutionResult,
    ResolutionResultGraphBuilder, ResultGraphError,
};
