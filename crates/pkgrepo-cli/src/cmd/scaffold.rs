//! Scaffold command: create empty repository skeletons
use std::path::Path;

use anyhow::{Context, Result, bail};
use pkgrepo_core::config::is_relative_repo;
use pkgrepo_core::inject::repo_path;
use pkgrepo_core::layout::ensure_arch_dirs;

use super::load_config;

/// Create `binary-<arch>` directories with empty indices for every
/// repository of `distro_name` (or only `repo`).
pub fn scaffold(config_path: &Path, distro_name: &str, workspace: &Path, repo: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let distro = config.distro(distro_name)?;

    let repos: Vec<&str> = match repo {
        Some(name) => vec![name],
        None => distro.repos.iter().map(String::as_str).collect(),
    };
    if repos.is_empty() {
        bail!("Distro '{distro_name}' has no repositories; pass --repo");
    }

    for name in repos {
        if !is_relative_repo(name) {
            bail!("Repository '{name}' must be a relative path without '..'");
        }
        let path = repo_path(workspace, name, &distro.component);
        let created = ensure_arch_dirs(&path, &distro.architectures)
            .with_context(|| format!("Failed to scaffold {}", path.display()))?;
        println!(
            "{}: {created} of {} architectures initialized",
            path.display(),
            distro.architectures.len()
        );
    }
    Ok(())
}
