//! Shared types for pkgrepo.
//!
//! These are the read-only descriptors handed to the repository builder by
//! configuration: which distributions exist, which architectures each one
//! publishes, and which release template edition applies.

pub mod arch;
pub mod distro;

// Re-exports
pub use arch::*;
pub use distro::*;

/// Prefix of every per-architecture directory inside a component
/// (`binary-amd64`, `binary-arm64`, ...).
pub const ARCH_DIR_PREFIX: &str = "binary-";
