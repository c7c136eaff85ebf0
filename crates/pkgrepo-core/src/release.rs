//! Release manifest assembly.
//!
//! A Release file is the rendered per-edition header followed by the output
//! of `apt-ftparchive release ../`, which supplies the checksums of every
//! index below the distribution directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pkgrepo_schema::DistroSpec;
use tracing::{debug, info};

use crate::command::{CommandRunner, Invocation};
use crate::error::RepoError;
use crate::layout::RepoLayout;
use crate::metadata::write_file;
use crate::output::OutputStore;
use crate::sign::{SIGNATURE_EXTENSION, signature_path};
use crate::template;

/// Prefix of the [`OutputStore`] key holding the release tool's output.
pub const OUTPUT_KEY_PREFIX: &str = "sign-release-file-";

/// [`OutputStore`] key for the release tool output of `working_dir`.
pub fn output_key(working_dir: &Path) -> String {
    format!("{OUTPUT_KEY_PREFIX}{}", working_dir.display())
}

/// Builds Release manifests for one run.
#[derive(Clone, Copy)]
pub struct ReleaseBuilder<'a> {
    runner: &'a dyn CommandRunner,
    program: &'a str,
    templates: &'a BTreeMap<String, String>,
    outputs: &'a OutputStore,
}

impl std::fmt::Debug for ReleaseBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseBuilder")
            .field("program", &self.program)
            .field("editions", &self.templates.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<'a> ReleaseBuilder<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        program: &'a str,
        templates: &'a BTreeMap<String, String>,
        outputs: &'a OutputStore,
    ) -> Self {
        Self {
            runner,
            program,
            templates,
            outputs,
        }
    }

    /// Render the header, run the release tool and write
    /// `<release dir>/Release`. Returns the path written.
    ///
    /// The template lookup happens before anything runs: a missing edition
    /// never reaches the external tool. Nothing is written unless every
    /// earlier step succeeded. Once the new manifest is on disk, a detached
    /// signature left over from the previous one is removed; if the write
    /// fails the old manifest and its signature stay as they were. A rebuild
    /// of the same directory replaces the recorded tool output.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::MissingTemplate`] for an unknown edition, or a
    /// [`RepoError::Step`] for render, tool or write failures.
    pub fn build_manifest(&self, layout: &RepoLayout, distro: &DistroSpec) -> Result<PathBuf, RepoError> {
        let working_dir = layout.working_dir();

        let source = self
            .templates
            .get(&distro.edition)
            .ok_or_else(|| RepoError::MissingTemplate(distro.edition.clone()))?;

        let architectures = distro.architectures_joined();
        let header = template::render(
            source,
            &[
                ("CodeName", distro.code_name.as_str()),
                ("Component", distro.component.as_str()),
                ("Architectures", architectures.as_str()),
            ],
        )
        .map_err(|e| RepoError::from(e).in_step("rendering Release template", &working_dir))?;

        let inv = Invocation::new(self.program, &working_dir)
            .arg("release")
            .arg("../");
        info!(command = %inv.command_line(), path = %inv.dir.display(), "generating release file");

        let output = self
            .runner
            .run(&inv)
            .map_err(|e| e.in_step("generating Release content", &working_dir))?;
        let body = output.combined();
        debug!(output = %String::from_utf8_lossy(&body), "release tool output");
        output
            .check(&inv, &body)
            .map_err(|e| e.in_step("generating Release content", &working_dir))?;

        self.outputs
            .record(output_key(&working_dir), String::from_utf8_lossy(&body));

        let mut content = header.into_bytes();
        content.extend_from_slice(&body);

        let release_path = layout.release_path();
        write_file(&release_path, &content)
            .map_err(|e| e.in_step("writing Release file", &working_dir))?;
        info!(path = %release_path.display(), "wrote release file");
        remove_stale_signature(&release_path)
            .map_err(|e| e.in_step("writing Release file", &working_dir))?;

        Ok(release_path)
    }
}

fn remove_stale_signature(release_path: &Path) -> Result<(), RepoError> {
    let signature = signature_path(release_path, SIGNATURE_EXTENSION);
    match std::fs::remove_file(&signature) {
        Ok(()) => {
            debug!(path = %signature.display(), "removed stale signature");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RepoError::io("removing stale signature", &signature)(e)),
    }
}
