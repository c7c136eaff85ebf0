//! Fake collaborators for unit tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pkgrepo_schema::{Arch, DistroSpec};

use crate::command::{CommandOutput, CommandRunner, Invocation};
use crate::config::{Config, Templates};
use crate::error::RepoError;
use crate::index_page::IndexPageBuilder;
use crate::output::OutputStore;
use crate::pipeline::JobContext;
use crate::sign::Signer;

pub const HEADER: &str = "Origin: Acme\nSuite: {{ .CodeName }}\nComponents: {{ .Component }}\nArchitectures: {{ .Architectures }}\n";

pub fn distro() -> DistroSpec {
    DistroSpec {
        name: "ubuntu2204".to_string(),
        code_name: "jammy".to_string(),
        component: "multiverse".to_string(),
        edition: "community".to_string(),
        architectures: vec![Arch::new("amd64").unwrap(), Arch::new("arm64").unwrap()],
        bucket: "repo.example.org".to_string(),
        repos: vec!["repo/apt/ubuntu/dists/jammy/acme/1.0".to_string()],
    }
}

pub fn config() -> Config {
    Config {
        templates: Templates {
            deb: BTreeMap::from([("community".to_string(), HEADER.to_string())]),
        },
        distros: vec![distro()],
        ..Config::default()
    }
}

pub fn context(
    runner: Arc<dyn CommandRunner>,
    signer: Arc<dyn Signer>,
    pages: Arc<dyn IndexPageBuilder>,
) -> JobContext {
    JobContext {
        config: Arc::new(config()),
        runner,
        signer,
        pages,
        outputs: Arc::new(OutputStore::new()),
    }
}

/// Answers per program name; unknown programs succeed with no output.
#[derive(Default)]
pub struct FakeRunner {
    responses: BTreeMap<String, CommandOutput>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, program: &str, output: CommandOutput) -> Self {
        self.responses.insert(program.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RepoError> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok(self
            .responses
            .get(&invocation.program)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok(Vec::new())))
    }
}

/// Records `(path, extension, overwrite, path existed)` per call.
#[derive(Default)]
pub struct FakeSigner {
    fail: bool,
    calls: Mutex<Vec<(PathBuf, String, bool, bool)>>,
}

impl FakeSigner {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, String, bool, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Signer for FakeSigner {
    fn sign(&self, path: &Path, extension: &str, overwrite: bool) -> Result<(), RepoError> {
        self.calls.lock().unwrap().push((
            path.to_path_buf(),
            extension.to_string(),
            overwrite,
            path.exists(),
        ));
        if self.fail {
            return Err(RepoError::SigningKey("signing service unavailable".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePages {
    calls: Mutex<Vec<(PathBuf, String)>>,
}

impl FakePages {
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl IndexPageBuilder for FakePages {
    fn build_index_page(&self, dir: &Path, bucket: &str) -> Result<(), RepoError> {
        self.calls.lock().unwrap().push((dir.to_path_buf(), bucket.to_string()));
        Ok(())
    }
}
