//! The rebuild pipeline for one component directory.
//!
//! Steps run strictly in order and stop at the first failure:
//!
//! 1. regenerate `binary-<arch>/Packages{,.gz}`
//! 2. assemble `../Release`
//! 3. sign it (`Release.gpg`, never overwriting)
//! 4. build the `index.html` pages
//!
//! Files written by earlier steps are left in place when a later one fails.

use std::path::Path;
use std::sync::Arc;

use pkgrepo_schema::{Arch, DistroSpec};
use tracing::info;

use crate::command::CommandRunner;
use crate::config::Config;
use crate::error::RepoError;
use crate::index_page::IndexPageBuilder;
use crate::layout::RepoLayout;
use crate::metadata::regenerate_index;
use crate::output::OutputStore;
use crate::release::ReleaseBuilder;
use crate::sign::{SIGNATURE_EXTENSION, Signer};

/// Collaborators shared by every job of a run.
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<Config>,
    pub runner: Arc<dyn CommandRunner>,
    pub signer: Arc<dyn Signer>,
    pub pages: Arc<dyn IndexPageBuilder>,
    pub outputs: Arc<OutputStore>,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("tools", &self.config.tools)
            .field("outputs", &self.outputs.len())
            .finish_non_exhaustive()
    }
}

/// Rebuild the metadata of `working_dir` for `arch` and publish it.
///
/// # Errors
///
/// Returns the first failing step, wrapped with its name and the working
/// directory.
pub fn rebuild_repo(
    ctx: &JobContext,
    working_dir: &Path,
    distro: &DistroSpec,
    arch: &Arch,
) -> Result<(), RepoError> {
    let layout = RepoLayout::from_working_dir(working_dir)?;
    let tools = &ctx.config.tools;

    regenerate_index(ctx.runner.as_ref(), &tools.scan, &layout, arch)?;

    let release = ReleaseBuilder::new(
        ctx.runner.as_ref(),
        &tools.release,
        &ctx.config.templates.deb,
        &ctx.outputs,
    )
    .build_manifest(&layout, distro)
    .map_err(|e| {
        // Every other failure is already wrapped with its own step.
        if matches!(e, RepoError::MissingTemplate(_)) {
            e.in_step("building Release file", working_dir)
        } else {
            e
        }
    })?;

    ctx.signer
        .sign(&release, SIGNATURE_EXTENSION, false)
        .map_err(|e| e.in_step("signing Release file", working_dir))?;

    ctx.pages
        .build_index_page(working_dir, &distro.bucket)
        .map_err(|e| e.in_step("building index.html pages", working_dir))?;

    info!(path = %working_dir.display(), arch = %arch, "rebuilt repository");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::layout::ensure_arch_dirs;
    use crate::release::output_key;
    use crate::testutil::{FakePages, FakeRunner, FakeSigner, context, distro};

    fn working_dir(root: &Path) -> std::path::PathBuf {
        let dir = root.join("repo/dists/jammy/acme/1.0/multiverse");
        ensure_arch_dirs(&dir, &distro().architectures).unwrap();
        dir
    }

    #[test]
    fn test_steps_run_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = working_dir(tmp.path());
        let runner = Arc::new(
            FakeRunner::new()
                .respond("dpkg-scanpackages", CommandOutput::ok("Package: foo\n"))
                .respond("apt-ftparchive", CommandOutput::ok("Origin: test\n")),
        );
        let signer = Arc::new(FakeSigner::default());
        let pages = Arc::new(FakePages::default());
        let ctx = context(runner.clone(), signer.clone(), pages.clone());

        let arch = Arch::new("arm64").unwrap();
        rebuild_repo(&ctx, &dir, &distro(), &arch).unwrap();

        let programs: Vec<_> = runner.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, vec!["dpkg-scanpackages", "apt-ftparchive"]);

        let signed = signer.calls();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].0, tmp.path().join("repo/dists/jammy/acme/1.0/Release"));
        assert_eq!(signed[0].1, "gpg");
        assert!(!signed[0].2, "must never overwrite");
        assert!(signed[0].3, "Release must exist when signing");

        assert_eq!(pages.calls(), vec![(dir.clone(), "repo.example.org".to_string())]);
        assert!(ctx.outputs.get(&output_key(&dir)).is_some());
    }

    #[test]
    fn test_scan_failure_stops_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = working_dir(tmp.path());
        let runner = Arc::new(
            FakeRunner::new().respond("dpkg-scanpackages", CommandOutput::failed(2, "")),
        );
        let signer = Arc::new(FakeSigner::default());
        let pages = Arc::new(FakePages::default());
        let ctx = context(runner.clone(), signer.clone(), pages.clone());

        let err = rebuild_repo(&ctx, &dir, &distro(), &Arch::new("amd64").unwrap()).unwrap_err();

        assert!(err.to_string().starts_with("building 'Packages'"));
        assert_eq!(runner.calls().len(), 1);
        assert!(signer.calls().is_empty());
        assert!(pages.calls().is_empty());
    }

    #[test]
    fn test_missing_template_is_wrapped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = working_dir(tmp.path());
        let runner = Arc::new(FakeRunner::new());
        let signer = Arc::new(FakeSigner::default());
        let mut ctx = context(runner.clone(), signer.clone(), Arc::new(FakePages::default()));
        let mut config = (*ctx.config).clone();
        config.templates.deb.clear();
        ctx.config = Arc::new(config);

        let err = rebuild_repo(&ctx, &dir, &distro(), &Arch::new("amd64").unwrap()).unwrap_err();

        assert!(err.to_string().starts_with("building Release file"));
        assert!(err.to_string().contains("no 'Release' template defined for edition 'community'"));
        // Only the scan ran.
        assert_eq!(runner.calls().len(), 1);
        assert!(signer.calls().is_empty());
    }

    #[test]
    fn test_sign_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = working_dir(tmp.path());
        let signer = Arc::new(FakeSigner::failing());
        let pages = Arc::new(FakePages::default());
        let ctx = context(Arc::new(FakeRunner::new()), signer, pages.clone());

        let err = rebuild_repo(&ctx, &dir, &distro(), &Arch::new("amd64").unwrap()).unwrap_err();

        assert!(err.to_string().starts_with("signing Release file"));
        assert!(pages.calls().is_empty());
        assert!(tmp.path().join("repo/dists/jammy/acme/1.0/Release").exists());
    }

    #[test]
    fn test_shallow_working_dir_is_rejected() {
        let ctx = context(
            Arc::new(FakeRunner::new()),
            Arc::new(FakeSigner::default()),
            Arc::new(FakePages::default()),
        );
        let err = rebuild_repo(&ctx, Path::new("a/b"), &distro(), &Arch::new("amd64").unwrap()).unwrap_err();
        assert!(matches!(err, RepoError::Layout { .. }));
    }
}
