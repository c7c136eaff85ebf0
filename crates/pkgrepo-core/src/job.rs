//! Schedulable unit of work: one distro and architecture.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use pkgrepo_schema::{Arch, DistroSpec};
use tracing::{error, info, warn};

use crate::error::RepoError;
use crate::failures::Failures;
use crate::inject::inject_packages;
use crate::pipeline::{JobContext, rebuild_repo};

/// Builds every repository of a distro for one architecture.
///
/// Each job works in its own directory under the workspace
/// (`<workspace>/<id>`), so jobs never share working directories or
/// [`crate::OutputStore`] keys.
#[derive(Debug)]
pub struct DebRepoJob {
    ctx: JobContext,
    distro: DistroSpec,
    arch: Arch,
    workspace: PathBuf,
    packages: Vec<PathBuf>,
    completed: AtomicBool,
}

/// Outcome of [`DebRepoJob::run`].
#[derive(Debug)]
pub struct JobReport {
    pub id: String,
    pub completed: bool,
    /// Component directories rebuilt successfully.
    pub rebuilt: Vec<PathBuf>,
    pub error: Option<RepoError>,
}

impl JobReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl DebRepoJob {
    /// # Errors
    ///
    /// Returns [`RepoError::UnsupportedArch`] if `distro` does not list
    /// `arch`.
    pub fn new(
        ctx: JobContext,
        distro: DistroSpec,
        arch: Arch,
        workspace: &Path,
        packages: Vec<PathBuf>,
    ) -> Result<Self, RepoError> {
        if !distro.has_arch(&arch) {
            return Err(RepoError::UnsupportedArch {
                distro: distro.name.clone(),
                arch: arch.to_string(),
            });
        }
        Ok(Self {
            ctx,
            distro,
            arch,
            workspace: workspace.to_path_buf(),
            packages,
            completed: AtomicBool::new(false),
        })
    }

    /// `<distro>-<arch>-deb-repo`
    pub fn id(&self) -> String {
        format!("{}-{}-deb-repo", self.distro.name, self.arch)
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    pub fn distro(&self) -> &DistroSpec {
        &self.distro
    }

    /// Directory this job injects into and rebuilds.
    pub fn local_dir(&self) -> PathBuf {
        self.workspace.join(self.id())
    }

    /// A job runs once; false after [`DebRepoJob::run`] returned.
    pub fn should_run(&self) -> bool {
        !self.completed.load(Ordering::Acquire)
    }

    /// Inject and rebuild every repository of the distro.
    ///
    /// Repositories are independent: a failure in one is recorded and the
    /// next is still attempted. Within a repository the rebuild is skipped
    /// when injection failed. The job is marked complete either way.
    pub fn run(&self) -> JobReport {
        let id = self.id();
        let local = self.local_dir();
        let mut failures = Failures::new();
        let mut rebuilt = Vec::new();

        if self.distro.repos.is_empty() {
            warn!(job = %id, "distro has no repositories configured");
        }

        for repo_name in &self.distro.repos {
            let (repo_path, injected) = inject_packages(
                &local,
                repo_name,
                &self.distro.component,
                &self.arch,
                &self.distro.architectures,
                &self.packages,
            );
            if failures.add(injected).is_none() {
                warn!(job = %id, path = %repo_path.display(), "skipping rebuild after failed injection");
                continue;
            }

            if failures
                .add(rebuild_repo(&self.ctx, &repo_path, &self.distro, &self.arch))
                .is_some()
            {
                rebuilt.push(repo_path);
            }
        }

        self.completed.store(true, Ordering::Release);

        let error = failures.resolve().err();
        match &error {
            None => info!(job = %id, repos = rebuilt.len(), "job complete"),
            Some(e) => error!(job = %id, failures = e.count(), "job finished with errors: {e}"),
        }

        JobReport {
            id,
            completed: true,
            rebuilt,
            error,
        }
    }
}
