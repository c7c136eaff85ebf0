//! Detached signatures for Release manifests.
//!
//! The pipeline only needs the call contract `sign(path, extension,
//! overwrite)`. Two implementations ship: [`CommandSigner`], which hands the
//! file to an external signing program (gpg, a notary client), and
//! [`Ed25519Signer`], which signs in-process with a key from the
//! environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::SigningKey;
use tracing::info;

use crate::command::{CommandRunner, Invocation, path_arg};
use crate::config::SigningConfig;
use crate::error::RepoError;
use crate::metadata::write_file;

/// Extension of the Release signature (`Release.gpg`).
pub const SIGNATURE_EXTENSION: &str = "gpg";

/// Produces a detached signature next to a file.
pub trait Signer: Send + Sync {
    /// Sign `path`, writing the signature to `<path>.<extension>`.
    ///
    /// With `overwrite == false` an existing signature file is an error and
    /// is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::SignatureExists`] when refusing to overwrite, or
    /// whatever the signing backend reports.
    fn sign(&self, path: &Path, extension: &str, overwrite: bool) -> Result<(), RepoError>;
}

impl<T: Signer + ?Sized> Signer for Arc<T> {
    fn sign(&self, path: &Path, extension: &str, overwrite: bool) -> Result<(), RepoError> {
        (**self).sign(path, extension, overwrite)
    }
}

/// `<path>.<extension>`
pub fn signature_path(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn guard_overwrite(signature: &Path, overwrite: bool) -> Result<(), RepoError> {
    if !overwrite
        && signature
            .try_exists()
            .map_err(RepoError::io("checking signature", signature))?
    {
        return Err(RepoError::SignatureExists(signature.to_path_buf()));
    }
    Ok(())
}

/// Runs an external signing program.
///
/// Placeholders in the configured arguments are replaced per call:
///
/// | placeholder   | value                          |
/// |---------------|--------------------------------|
/// | `{file}`      | file to sign                   |
/// | `{ext}`       | signature extension            |
/// | `{signature}` | `<file>.<ext>`                 |
/// | `{overwrite}` | `true` or `false`              |
pub struct CommandSigner {
    runner: Arc<dyn CommandRunner>,
    program: String,
    args: Vec<String>,
}

impl std::fmt::Debug for CommandSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSigner")
            .field("program", &self.program)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl CommandSigner {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn expand(&self, path: &Path, extension: &str, signature: &Path, overwrite: bool) -> Result<Vec<String>, RepoError> {
        let file = path_arg(path)?;
        let signature = path_arg(signature)?;
        let overwrite = overwrite.to_string();
        Ok(self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{file}", file)
                    .replace("{ext}", extension)
                    .replace("{signature}", signature)
                    .replace("{overwrite}", &overwrite)
            })
            .collect())
    }
}

impl Signer for CommandSigner {
    fn sign(&self, path: &Path, extension: &str, overwrite: bool) -> Result<(), RepoError> {
        let signature = signature_path(path, extension);
        guard_overwrite(&signature, overwrite)?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let inv = Invocation::new(&self.program, dir).args(self.expand(path, extension, &signature, overwrite)?);
        info!(command = %inv.command_line(), "signing file");

        let output = self.runner.run(&inv)?;
        output.check(&inv, &output.combined())?;
        info!(path = %signature.display(), "wrote signature");
        Ok(())
    }
}

/// Signs in-process with an Ed25519 key, writing a base64 signature.
///
/// The signature is the raw 64-byte Ed25519 signature in base64, not an
/// OpenPGP detached signature. apt does not accept it as `Release.gpg`;
/// clients must verify it against [`Ed25519Signer::public_key_base64`]
/// out of band. Use a [`CommandSigner`] running `gpg` for apt-facing
/// repositories.
pub struct Ed25519Signer {
    key: SigningKey,
}

// Never print key material.
impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer").finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Parse a base64-encoded 32-byte secret key.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::SigningKey`] for invalid base64 or a key of the
    /// wrong length.
    pub fn from_base64(secret: &str) -> Result<Self, RepoError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(secret.trim())
            .map_err(|e| RepoError::SigningKey(format!("invalid base64: {e}")))?;
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            RepoError::SigningKey(format!("expected a 32-byte Ed25519 key, got {} bytes", bytes.len()))
        })?;
        Ok(Self::new(SigningKey::from_bytes(&key)))
    }

    /// Read the key from the environment variable `var`.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::SigningKey`] if the variable is unset or invalid.
    pub fn from_env(var: &str) -> Result<Self, RepoError> {
        let secret = std::env::var(var).map_err(|_| RepoError::SigningKey(format!("{var} not set")))?;
        Self::from_base64(&secret)
    }

    /// Base64 public key matching this signer.
    pub fn public_key_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.key.verifying_key().to_bytes())
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, path: &Path, extension: &str, overwrite: bool) -> Result<(), RepoError> {
        use ed25519_dalek::Signer as _;

        let signature = signature_path(path, extension);
        guard_overwrite(&signature, overwrite)?;

        let data = std::fs::read(path).map_err(RepoError::io("reading file to sign", path))?;
        let sig = self.key.sign(&data);
        let encoded = base64::engine::general_purpose::STANDARD.encode(sig.to_bytes());
        write_file(&signature, encoded.as_bytes())?;
        info!(path = %signature.display(), "wrote signature");
        Ok(())
    }
}

/// Build the signer described by `config`.
///
/// # Errors
///
/// Returns [`RepoError::SigningKey`] if an Ed25519 key cannot be loaded.
pub fn from_config(config: &SigningConfig, runner: Arc<dyn CommandRunner>) -> Result<Arc<dyn Signer>, RepoError> {
    match config {
        SigningConfig::Command { program, args } => {
            Ok(Arc::new(CommandSigner::new(runner, program.clone(), args.clone())))
        }
        SigningConfig::Ed25519 { key_env } => Ok(Arc::new(Ed25519Signer::from_env(key_env)?)),
    }
}
