//! Distribution descriptors.

use serde::{Deserialize, Serialize};

use crate::arch::{Arch, join_archs};

/// Describes one target distribution of a repository.
///
/// Supplied by configuration and never mutated by the builder. Each
/// `(architecture, repo)` pair of a distro becomes one unit of build work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroSpec {
    /// Short identifier used on the command line (e.g. "ubuntu2204").
    pub name: String,

    /// Release code name written into the Release header (e.g. "jammy").
    pub code_name: String,

    /// Repository component (e.g. "main", "multiverse").
    pub component: String,

    /// Product edition selecting the Release template (e.g. "community").
    pub edition: String,

    /// Architectures published for this distribution, in Release order.
    pub architectures: Vec<Arch>,

    /// Storage bucket the finished repository is published to.
    pub bucket: String,

    /// Repository paths, relative to the local workspace, that receive the
    /// packages (e.g. `repo/apt/ubuntu/dists/jammy/acme/1.0`).
    #[serde(default)]
    pub repos: Vec<String>,
}

/// Problems found by [`DistroSpec::validate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DistroError {
    /// A required string field is empty.
    #[error("distro '{distro}': field '{field}' is empty")]
    EmptyField {
        /// Name of the offending distro.
        distro: String,
        /// Name of the empty field.
        field: &'static str,
    },

    /// The architecture list is empty.
    #[error("distro '{0}' lists no architectures")]
    NoArchitectures(String),

    /// The same architecture is listed twice.
    #[error("distro '{distro}' lists architecture '{arch}' more than once")]
    DuplicateArchitecture {
        /// Name of the offending distro.
        distro: String,
        /// The repeated architecture.
        arch: Arch,
    },

    /// The component is not a single path segment.
    #[error("distro '{distro}': component '{component}' must be a single path segment")]
    InvalidComponent {
        /// Name of the offending distro.
        distro: String,
        /// The rejected component.
        component: String,
    },
}

impl DistroSpec {
    /// Architecture names joined by single spaces.
    pub fn architectures_joined(&self) -> String {
        join_archs(&self.architectures)
    }

    /// Whether this distro publishes `arch`.
    pub fn has_arch(&self, arch: &Arch) -> bool {
        self.architectures.contains(arch)
    }

    /// Check the structural rules every distro must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first [`DistroError`] found.
    pub fn validate(&self) -> Result<(), DistroError> {
        let required = [
            ("name", &self.name),
            ("code_name", &self.code_name),
            ("component", &self.component),
            ("edition", &self.edition),
            ("bucket", &self.bucket),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DistroError::EmptyField {
                    distro: self.name.clone(),
                    field,
                });
            }
        }

        if self.component.contains(['/', '\\']) || self.component == "." || self.component == ".." {
            return Err(DistroError::InvalidComponent {
                distro: self.name.clone(),
                component: self.component.clone(),
            });
        }

        if self.architectures.is_empty() {
            return Err(DistroError::NoArchitectures(self.name.clone()));
        }

        for (i, arch) in self.architectures.iter().enumerate() {
            if self.architectures[..i].contains(arch) {
                return Err(DistroError::DuplicateArchitecture {
                    distro: self.name.clone(),
                    arch: arch.clone(),
                });
            }
        }

        Ok(())
    }
}
