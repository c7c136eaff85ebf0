pub mod build;
pub mod check;
pub mod scaffold;

use std::path::Path;

use anyhow::{Context, Result};
use pkgrepo_core::Config;

/// Load and validate the configuration at `path`.
pub(crate) fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}
