//! Builder configuration, loaded from TOML.
//!
//! ```toml
//! [templates.deb]
//! community = """
//! Origin: Acme
//! Suite: {{ .CodeName }}
//! Components: {{ .Component }}
//! Architectures: {{ .Architectures }}
//! """
//!
//! [signing]
//! mode = "ed25519"
//! key_env = "PKGREPO_SIGNING_KEY"
//!
//! [[distros]]
//! name = "ubuntu2204"
//! code_name = "jammy"
//! component = "multiverse"
//! edition = "community"
//! architectures = ["amd64", "arm64"]
//! bucket = "repo.example.org"
//! repos = ["repo/apt/ubuntu/dists/jammy/acme/1.0"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use pkgrepo_schema::DistroSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{}': {cause}", .path.display())]
    Read {
        path: PathBuf,
        cause: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("unknown distro '{0}'")]
    UnknownDistro(String),
}

/// Release header templates, keyed by edition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Templates {
    #[serde(default)]
    pub deb: BTreeMap<String, String>,
}

/// External programs used to build indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub scan: String,
    pub release: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            scan: "dpkg-scanpackages".to_string(),
            release: "apt-ftparchive".to_string(),
        }
    }
}

/// How Release files are signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SigningConfig {
    /// Run an external program; see [`crate::sign::CommandSigner`].
    Command {
        program: String,
        #[serde(default = "default_gpg_args")]
        args: Vec<String>,
    },
    /// Sign in-process with a base64 key read from `key_env`.
    ///
    /// Writes a base64 Ed25519 signature, not OpenPGP, so apt clients will
    /// reject the resulting `Release.gpg`. Meant for repositories whose
    /// consumers check the signature themselves; use `command` with `gpg`
    /// for apt.
    Ed25519 { key_env: String },
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::Command {
            program: "gpg".to_string(),
            args: default_gpg_args(),
        }
    }
}

fn default_gpg_args() -> Vec<String> {
    ["--batch", "--yes", "--armor", "--detach-sign", "--output", "{signature}", "{file}"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub templates: Templates,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub distros: Vec<DistroSpec>,
}

impl Config {
    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|cause| ConfigError::Read {
            path: path.to_path_buf(),
            cause,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation: every distro is well formed, distro names are
    /// unique and no distro lists a repo twice. Missing templates are not checked here; see
    /// [`Config::missing_templates`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        let mut seen = BTreeSet::new();

        for distro in &self.distros {
            if let Err(e) = distro.validate() {
                problems.push(e.to_string());
            }
            if !seen.insert(distro.name.as_str()) {
                problems.push(format!("distro '{}' is defined more than once", distro.name));
            }
            let mut repos = BTreeSet::new();
            for repo in &distro.repos {
                if !repos.insert(repo.as_str()) {
                    problems.push(format!("distro '{}' lists repo '{repo}' more than once", distro.name));
                }
                if !is_relative_repo(repo) {
                    problems.push(format!(
                        "distro '{}': repo '{repo}' must be a relative path without '..'",
                        distro.name
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// `(distro, edition)` pairs whose edition has no Release template.
    pub fn missing_templates(&self) -> Vec<(&str, &str)> {
        self.distros
            .iter()
            .filter(|d| !self.templates.deb.contains_key(&d.edition))
            .map(|d| (d.name.as_str(), d.edition.as_str()))
            .collect()
    }

    /// Look up a distro by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDistro`] if no distro has that name.
    pub fn distro(&self, name: &str) -> Result<&DistroSpec, ConfigError> {
        self.distros
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ConfigError::UnknownDistro(name.to_string()))
    }

    /// Programs that must be installed to build every configured distro.
    pub fn required_tools(&self) -> Vec<&str> {
        let mut tools = vec![self.tools.scan.as_str(), self.tools.release.as_str()];
        if let SigningConfig::Command { program, .. } = &self.signing {
            tools.push(program.as_str());
        }
        tools
    }
}

/// Whether `repo` is a non-empty relative path made only of plain names.
pub fn is_relative_repo(repo: &str) -> bool {
    let path = Path::new(repo);
    !repo.is_empty()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[templates.deb]
community = "Suite: {{ .CodeName }}\n"

[signing]
mode = "ed25519"
key_env = "PKGREPO_SIGNING_KEY"

[[distros]]
name = "ubuntu2204"
code_name = "jammy"
component = "multiverse"
edition = "community"
architectures = ["amd64", "arm64"]
bucket = "repo.example.org"
repos = ["repo/apt/ubuntu/dists/jammy/acme/1.0"]

[[distros]]
name = "debian12"
code_name = "bookworm"
component = "main"
edition = "enterprise"
architectures = ["amd64"]
bucket = "repo.example.org"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.distros.len(), 2);
        assert_eq!(config.tools, ToolsConfig::default());
        assert_eq!(
            config.signing,
            SigningConfig::Ed25519 {
                key_env: "PKGREPO_SIGNING_KEY".to_string()
            }
        );

        let jammy = config.distro("ubuntu2204").unwrap();
        assert_eq!(jammy.architectures_joined(), "amd64 arm64");
        assert!(config.distro("nope").is_err());
    }

    #[test]
    fn test_missing_templates() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.missing_templates(), vec![("debian12", "enterprise")]);
    }

    #[test]
    fn test_defaults_to_gpg_command() {
        let config = Config::from_toml("").unwrap();
        let SigningConfig::Command { program, args } = &config.signing else {
            panic!("expected command signing");
        };
        assert_eq!(program, "gpg");
        assert!(args.contains(&"{signature}".to_string()));
        assert_eq!(config.required_tools(), vec!["dpkg-scanpackages", "apt-ftparchive", "gpg"]);
    }

    #[test]
    fn test_command_signing_args_default() {
        let config = Config::from_toml(
            r#"
[signing]
mode = "command"
program = "notary-client"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.signing,
            SigningConfig::Command { ref program, ref args } if program == "notary-client" && !args.is_empty()
        ));
    }

    #[test]
    fn test_validation_collects_problems() {
        let bad = r#"
[[distros]]
name = "x"
code_name = ""
component = "main"
edition = "community"
architectures = ["amd64"]
bucket = "b"
repos = ["../escape"]

[[distros]]
name = "x"
code_name = "y"
component = "main"
edition = "community"
architectures = []
bucket = "b"
"#;
        let Err(ConfigError::Invalid(problems)) = Config::from_toml(bad) else {
            panic!("expected validation failure");
        };
        assert_eq!(problems.len(), 4, "{problems:?}");
    }

    #[test]
    fn test_duplicate_repo_is_rejected() {
        let bad = r#"
[[distros]]
name = "ubuntu2204"
code_name = "jammy"
component = "multiverse"
edition = "community"
architectures = ["amd64"]
bucket = "b"
repos = ["repo/apt/ubuntu/dists/jammy/acme/1.0", "repo/apt/ubuntu/dists/jammy/acme/1.0"]
"#;
        let Err(ConfigError::Invalid(problems)) = Config::from_toml(bad) else {
            panic!("expected validation failure");
        };
        assert_eq!(
            problems,
            vec!["distro 'ubuntu2204' lists repo 'repo/apt/ubuntu/dists/jammy/acme/1.0' more than once".to_string()]
        );
    }

    #[test]
    fn test_invalid_architecture_is_a_parse_error() {
        let bad = r#"
[[distros]]
name = "x"
code_name = "y"
component = "main"
edition = "community"
architectures = ["AMD64"]
bucket = "b"
"#;
        assert!(matches!(Config::from_toml(bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_repo_paths() {
        assert!(is_relative_repo("repo/apt/ubuntu/dists/jammy/acme/1.0"));
        assert!(!is_relative_repo("/abs/path"));
        assert!(!is_relative_repo("a/../b"));
        assert!(!is_relative_repo(""));
    }

    #[test]
    fn test_load_reports_path() {
        let err = Config::load(Path::new("/nonexistent/pkgrepo.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pkgrepo.toml"));
    }
}
