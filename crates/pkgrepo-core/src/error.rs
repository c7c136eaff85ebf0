//! Errors raised while building a repository.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum RepoError {
    /// No Release header template is configured for the edition.
    #[error("no 'Release' template defined for edition '{0}'")]
    MissingTemplate(String),

    #[error("{0}")]
    Template(#[from] TemplateError),

    #[error("command '{command}' failed with {status} in '{}': [{output}]", .dir.display())]
    CommandFailed {
        command: String,
        status: String,
        dir: PathBuf,
        output: String,
    },

    #[error("failed to run '{program}': {cause}")]
    Spawn {
        program: String,
        cause: std::io::Error,
    },

    #[error("{action} '{}': {cause}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        cause: std::io::Error,
    },

    /// A pipeline step failed; `cause` carries the underlying error.
    #[error("{step} for '{}': {cause}", .path.display())]
    Step {
        step: &'static str,
        path: PathBuf,
        cause: Box<RepoError>,
    },

    #[error("path '{}' is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("invalid repository layout '{}': {reason}", .path.display())]
    Layout { path: PathBuf, reason: String },

    #[error("'{}' is not a .deb package", .0.display())]
    NotAPackage(PathBuf),

    #[error("signature '{}' already exists", .0.display())]
    SignatureExists(PathBuf),

    #[error("signing key: {0}")]
    SigningKey(String),

    #[error("distro '{distro}' does not publish architecture '{arch}'")]
    UnsupportedArch { distro: String, arch: String },

    #[error("required tool '{0}' not found on PATH")]
    MissingTool(String),

    /// Several independent operations failed.
    #[error("{}", describe_all(.0))]
    Aggregate(Vec<RepoError>),
}

impl RepoError {
    /// Returns a closure wrapping an `io::Error` with the action and path,
    /// for use with `map_err`.
    pub fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |cause| Self::Io {
            action,
            path,
            cause,
        }
    }

    /// Wrap `self` as the cause of a failed pipeline step.
    pub fn in_step(self, step: &'static str, path: &Path) -> Self {
        Self::Step {
            step,
            path: path.to_path_buf(),
            cause: Box::new(self),
        }
    }

    /// Number of leaf failures contained in this error.
    pub fn count(&self) -> usize {
        match self {
            Self::Aggregate(errors) => errors.iter().map(Self::count).sum(),
            _ => 1,
        }
    }
}

fn describe_all(errors: &[RepoError]) -> String {
    let listed: Vec<String> = errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}] {e}", i + 1))
        .collect();
    format!("{} operations failed: {}", errors.len(), listed.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_message_chains_cause() {
        let err = RepoError::MissingTemplate("enterprise".to_string())
            .in_step("building Release file", Path::new("/repo/dists/x/main"));
        assert_eq!(
            err.to_string(),
            "building Release file for '/repo/dists/x/main': no 'Release' template defined for edition 'enterprise'"
        );
    }

    #[test]
    fn test_aggregate_lists_in_order() {
        let err = RepoError::Aggregate(vec![
            RepoError::MissingTool("dpkg-scanpackages".to_string()),
            RepoError::MissingTool("apt-ftparchive".to_string()),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 operations failed"));
        let first = msg.find("dpkg-scanpackages").unwrap();
        let second = msg.find("apt-ftparchive").unwrap();
        assert!(first < second);
        assert_eq!(err.count(), 2);
    }
}
