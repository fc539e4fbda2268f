//! Dependency resolution failures carried as graph data.

use serde::Serialize;

use super::identifier::ComponentSelector;

/// Why a requested component could not be resolved.
///
/// Failures are not errors of the result store. They travel with the graph and
/// are surfaced unchanged to whoever walks the materialized result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[error("Could not resolve {selector}: {message}")]
pub struct ResolveFailure {
    /// Selector that failed to resolve.
    pub selector: ComponentSelector,
    /// Failure summary.
    pub message: String,
    /// Underlying causes, outermost first.
    pub causes: Vec<String>,
}

impl ResolveFailure {
    /// Create a failure without causes.
    pub fn new(selector: ComponentSelector, message: impl Into<String>) -> Self {
        Self {
            selector,
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Add an underlying cause.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let failure = ResolveFailure::new(
            ComponentSelector::module("com.x", "missing", "1.0"),
            "not found in any repository",
        )
        .with_cause("404 from https://repo.example/com/x/missing/1.0");

        assert_eq!(
            failure.to_string(),
            "Could not resolve com.x:missing:1.0: not found in any repository"
        );
        assert_eq!(failure.causes.len(), 1);
    }
}
