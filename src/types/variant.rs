//! Selected variants, their attributes and capabilities.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::identifier::ComponentIdentifier;

/// Typed attribute value.
///
/// The discriminant order is part of the record stream format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String-typed attribute.
    String(String),
    /// Boolean attribute.
    Bool(bool),
    /// Integer attribute.
    Int(i64),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Immutable set of named attributes, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AttributeContainer {
    attributes: BTreeMap<String, AttributeValue>,
}

impl AttributeContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an attribute.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeContainer {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

/// A capability provided by a variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Capability {
    /// Capability group.
    pub group: String,
    /// Capability name.
    pub name: String,
    /// Capability version, if declared.
    pub version: Option<String>,
}

impl Capability {
    /// Create a new capability.
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        Ok(())
    }
}

/// A variant selected for a component.
///
/// Variants are heavyweight and shared by many nodes of a graph, so they are
/// handed around as `Arc<ResolvedVariantResult>` and deduplicated on the wire
/// by structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedVariantResult {
    /// Component owning the variant.
    pub owner: ComponentIdentifier,
    /// Human readable variant name.
    pub display_name: String,
    /// Variant attributes.
    pub attributes: Arc<AttributeContainer>,
    /// Capabilities provided by the variant.
    pub capabilities: Vec<Capability>,
    /// Variant of another component this variant delegates to.
    pub external_variant: Option<Arc<ResolvedVariantResult>>,
}

impl ResolvedVariantResult {
    /// Create a variant without capabilities or external variant.
    pub fn new(
        owner: ComponentIdentifier,
        display_name: impl Into<String>,
        attributes: Arc<AttributeContainer>,
    ) -> Self {
        Self {
            owner,
            display_name: display_name.into(),
            attributes,
            capabilities: Vec::new(),
            external_variant: None,
        }
    }

    /// Add a capability.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Delegate to a variant of another component.
    pub fn with_external_variant(mut self, variant: Arc<ResolvedVariantResult>) -> Self {
        self.external_variant = Some(variant);
        self
    }
}

impl fmt::Display for ResolvedVariantResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_ordered_by_name() {
        let attributes = AttributeContainer::new()
            .with("usage", "java-runtime")
            .with("category", "library")
            .with("jvm.version", 17i64);

        let names: Vec<_> = attributes.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["category", "jvm.version", "usage"]);
        assert_eq!(attributes.get("jvm.version"), Some(&AttributeValue::Int(17)));
    }

    #[test]
    fn test_structural_equality() {
        let attributes = Arc::new(AttributeContainer::new().with("usage", "api"));
        let a = ResolvedVariantResult::new(ComponentIdentifier::module("g", "m", "1"), "api", attributes.clone());
        let b = ResolvedVariantResult::new(ComponentIdentifier::module("g", "m", "1"), "api", attributes);
        assert_eq!(a, b);
        assert_ne!(a, b.with_capability(Capability::new("g", "extra", None)));
    }
}
