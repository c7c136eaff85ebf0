//! Checks that run before any repository is touched.

use std::path::PathBuf;

use tracing::debug;

use crate::error::RepoError;
use crate::failures::Failures;

/// Resolve every program in `tools` on `PATH`.
///
/// Returns the resolved paths in input order.
///
/// # Errors
///
/// Returns [`RepoError::MissingTool`] for each program that cannot be found,
/// aggregated.
pub fn check_tools(tools: &[&str]) -> Result<Vec<PathBuf>, RepoError> {
    let mut failures = Failures::new();
    let mut found = Vec::with_capacity(tools.len());

    for tool in tools {
        match which::which(tool) {
            Ok(path) => {
                debug!(tool, path = %path.display(), "found tool");
                found.push(path);
            }
            Err(_) => failures.push(RepoError::MissingTool((*tool).to_string())),
        }
    }

    failures.resolve()?;
    Ok(found)
}
