//! Identifier and selector value objects.

use serde::Serialize;
use std::fmt;

/// `group:name` coordinate of a module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleIdentifier {
    /// Module group.
    pub group: String,
    /// Module name.
    pub name: String,
}

impl ModuleIdentifier {
    /// Create a new module identifier.
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// `group:name:version` coordinate of a resolved module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleVersionIdentifier {
    /// The module.
    pub module: ModuleIdentifier,
    /// Resolved version.
    pub version: String,
}

impl ModuleVersionIdentifier {
    /// Create a new module version identifier.
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: ModuleIdentifier::new(group, name),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModuleVersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.version)
    }
}

/// Identity of a resolved component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentIdentifier {
    /// A module from a repository.
    Module {
        /// Module group.
        group: String,
        /// Module name.
        module: String,
        /// Module version.
        version: String,
    },
    /// A project of this or another build.
    Project {
        /// Path of the build owning the project.
        build_path: String,
        /// Path of the project inside its build.
        project_path: String,
    },
    /// A library binary produced by a project.
    Library {
        /// Path of the producing project.
        project_path: String,
        /// Library name.
        library_name: String,
        /// Binary variant.
        variant: String,
    },
}

impl ComponentIdentifier {
    /// Module component identifier.
    pub fn module(group: impl Into<String>, module: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Module {
            group: group.into(),
            module: module.into(),
            version: version.into(),
        }
    }

    /// Project component identifier.
    pub fn project(build_path: impl Into<String>, project_path: impl Into<String>) -> Self {
        Self::Project {
            build_path: build_path.into(),
            project_path: project_path.into(),
        }
    }

    /// Library binary identifier.
    pub fn library(
        project_path: impl Into<String>,
        library_name: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self::Library {
            project_path: project_path.into(),
            library_name: library_name.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { group, module, version } => write!(f, "{}:{}:{}", group, module, version),
            Self::Project { project_path, .. } => write!(f, "project {}", project_path),
            Self::Library {
                project_path,
                library_name,
                variant,
            } => write!(f, "project {} library {}:{}", project_path, library_name, variant),
        }
    }
}

/// Preferred version plus the versions that must not be selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VersionConstraint {
    /// Version to select when nothing else contradicts it.
    pub preferred: String,
    /// Versions excluded from selection.
    pub rejected: Vec<String>,
}

impl VersionConstraint {
    /// Constraint preferring `version` and rejecting nothing.
    pub fn prefer(version: impl Into<String>) -> Self {
        Self {
            preferred: version.into(),
            rejected: Vec::new(),
        }
    }

    /// Add a rejected version.
    pub fn rejecting(mut self, version: impl Into<String>) -> Self {
        self.rejected.push(version.into());
        self
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preferred)?;
        if !self.rejected.is_empty() {
            write!(f, " (rejects {})", self.rejected.join(", "))?;
        }
        Ok(())
    }
}

/// What a dependency declaration asked for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentSelector {
    /// A module by coordinates and version constraint.
    Module {
        /// Module group.
        group: String,
        /// Module name.
        module: String,
        /// Requested versions.
        constraint: VersionConstraint,
    },
    /// A project by path.
    Project {
        /// Path of the build owning the project.
        build_path: String,
        /// Path of the project inside its build.
        project_path: String,
    },
    /// A library of a project.
    Library {
        /// Path of the producing project.
        project_path: String,
        /// Library name.
        library_name: String,
        /// Requested binary variant, if any.
        variant: Option<String>,
    },
}

impl ComponentSelector {
    /// Module selector preferring `version`.
    pub fn module(group: impl Into<String>, module: impl Into<String>, version: impl Into<String>) -> Self {
        Self::module_with_constraint(group, module, VersionConstraint::prefer(version))
    }

    /// Module selector with a full version constraint.
    pub fn module_with_constraint(
        group: impl Into<String>,
        module: impl Into<String>,
        constraint: VersionConstraint,
    ) -> Self {
        Self::Module {
            group: group.into(),
            module: module.into(),
            constraint,
        }
    }

    /// Project selector.
    pub fn project(build_path: impl Into<String>, project_path: impl Into<String>) -> Self {
        Self::Project {
            build_path: build_path.into(),
            project_path: project_path.into(),
        }
    }

    /// Library selector.
    pub fn library(
        project_path: impl Into<String>,
        library_name: impl Into<String>,
        variant: Option<String>,
    ) -> Self {
        Self::Library {
            project_path: project_path.into(),
            library_name: library_name.into(),
            variant,
        }
    }
}

impl fmt::Display for ComponentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { group, module, constraint } => {
                write!(f, "{}:{}:{}", group, module, constraint)
            }
            Self::Project { project_path, .. } => write!(f, "project {}", project_path),
            Self::Library {
                project_path,
                library_name,
                variant,
            } => {
                write!(f, "project {} library {}", project_path, library_name)?;
                if let Some(variant) = variant {
                    write!(f, ":{}", variant)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(
            ComponentSelector::module("com.x", "missing", "1.0").to_string(),
            "com.x:missing:1.0"
        );
        assert_eq!(
            ComponentIdentifier::module("org", "lib", "2.1").to_string(),
            "org:lib:2.1"
        );
        assert_eq!(ComponentIdentifier::project(":", ":core").to_string(), "project :core");
        assert_eq!(
            ComponentSelector::library(":app", "main", None).to_string(),
            "project :app library main"
        );
        assert_eq!(
            VersionConstraint::prefer("1.0").rejecting("0.9").to_string(),
            "1.0 (rejects 0.9)"
        );
    }
}
