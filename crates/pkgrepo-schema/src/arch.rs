//! Target architecture names.

use serde::{Deserialize, Serialize};

/// A Debian architecture name (`amd64`, `arm64`, `ppc64el`, `s390x`, ...).
///
/// Packages and package indices are maintained separately per architecture.
/// The name is validated on construction so it can be spliced into paths
/// (`binary-<arch>`) without further checks.
///
/// # Example
///
/// ```
/// use pkgrepo_schema::Arch;
///
/// let arch: Arch = "amd64".parse().unwrap();
/// assert_eq!(arch.as_str(), "amd64");
/// assert_eq!(arch.dir_name(), "binary-amd64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Arch(String);

/// Errors produced when parsing an [`Arch`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchError {
    /// The architecture name was empty.
    #[error("architecture name is empty")]
    Empty,

    /// The name contains a character outside `[a-z0-9-]`.
    #[error("invalid architecture name '{0}': only lowercase letters, digits and '-' are allowed")]
    InvalidName(String),
}

impl Arch {
    /// Validate and wrap an architecture name.
    ///
    /// # Errors
    ///
    /// Returns [`ArchError::Empty`] for an empty name and
    /// [`ArchError::InvalidName`] if it contains anything but lowercase ASCII
    /// letters, digits or hyphens.
    pub fn new(name: impl Into<String>) -> Result<Self, ArchError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ArchError::Empty);
        }
        let valid = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid || name.starts_with('-') {
            return Err(ArchError::InvalidName(name));
        }
        Ok(Self(name))
    }

    /// The raw architecture name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the directory holding this architecture's packages.
    pub fn dir_name(&self) -> String {
        format!("{}{}", crate::ARCH_DIR_PREFIX, self.0)
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Arch {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Arch {
    type Error = ArchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Arch> for String {
    fn from(arch: Arch) -> Self {
        arch.0
    }
}

impl AsRef<str> for Arch {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Join architecture names with single spaces, the form used by the
/// `Architectures:` field of a Release file.
pub fn join_archs(archs: &[Arch]) -> String {
    archs.iter().map(Arch::as_str).collect::<Vec<_>>().join(" ")
}
