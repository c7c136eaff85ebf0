//! External process execution.
//!
//! Every tool the builder shells out to (`dpkg-scanpackages`,
//! `apt-ftparchive`, signing programs) goes through [`CommandRunner`], so the
//! pipeline can be driven by deterministic fakes in tests. Calls block until
//! the process exits; there is no timeout at this layer.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use crate::error::RepoError;

/// A program, its arguments and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The command line as a single string, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `path` as a command-line argument.
///
/// # Errors
///
/// Returns [`RepoError::NonUtf8Path`] rather than passing a lossily
/// converted path to an external tool.
pub fn path_arg(path: &Path) -> Result<&str, RepoError> {
    path.to_str().ok_or_else(|| RepoError::NonUtf8Path(path.to_path_buf()))
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// A successful exit with the given standard output.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed exit with the given code and standard error.
    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.stdout.len() + self.stderr.len());
        out.extend_from_slice(&self.stdout);
        out.extend_from_slice(&self.stderr);
        out
    }

    fn status_text(&self) -> String {
        self.code
            .map_or_else(|| "signal".to_string(), |c| format!("exit code {c}"))
    }

    /// Turn a non-zero exit into [`RepoError::CommandFailed`], embedding
    /// `captured` (whatever output the caller wants surfaced).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::CommandFailed`] when the process did not exit 0.
    pub fn check(&self, invocation: &Invocation, captured: &[u8]) -> Result<(), RepoError> {
        if self.success() {
            return Ok(());
        }
        Err(RepoError::CommandFailed {
            command: invocation.command_line(),
            status: self.status_text(),
            dir: invocation.dir.clone(),
            output: String::from_utf8_lossy(captured).trim_end().to_string(),
        })
    }
}

/// Capability to run an external command and capture its output.
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit is NOT an error here; it is reported through
    /// [`CommandOutput::code`]. Errors mean the process could not be run.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Spawn`] if the program cannot be started.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RepoError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RepoError> {
        (**self).run(invocation)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RepoError> {
        debug!(
            command = %invocation.command_line(),
            dir = %invocation.dir.display(),
            "spawning process"
        );

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.dir)
            .output()
            .map_err(|cause| RepoError::Spawn {
                program: invocation.program.clone(),
                cause,
            })?;

        if !output.stderr.is_empty() {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr), "command stderr");
        }

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
