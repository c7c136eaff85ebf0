//! Package injection into a component's architecture directory.

use std::fs;
use std::path::{Path, PathBuf};

use pkgrepo_schema::Arch;
use tracing::{debug, info};

use crate::error::RepoError;
use crate::failures::Failures;
use crate::layout::ensure_arch_dirs;

const PACKAGE_EXTENSION: &str = "deb";

/// `local/repo_name/component`
pub fn repo_path(local: &Path, repo_name: &str, component: &str) -> PathBuf {
    local.join(repo_name).join(component)
}

/// Scaffold the component for every architecture in `all_archs`, then link
/// `packages` into its `binary-<arch>` directory.
///
/// Sibling architectures are scaffolded too, so one injection keeps the
/// whole component consistent. The skeleton and link steps are independent:
/// both always run and their failures are reported together. The
/// repository path is returned alongside that result so callers can log or
/// skip it either way.
pub fn inject_packages(
    local: &Path,
    repo_name: &str,
    component: &str,
    arch: &Arch,
    all_archs: &[Arch],
    packages: &[PathBuf],
) -> (PathBuf, Result<usize, RepoError>) {
    let repo = repo_path(local, repo_name, component);
    let mut failures = Failures::new();

    failures.add(ensure_arch_dirs(&repo, all_archs));

    let target = repo.join(arch.dir_name());
    let mut linked = 0;
    for package in packages {
        if failures.add(link_package(package, &target)).is_some() {
            linked += 1;
        }
    }

    if linked > 0 {
        info!(path = %target.display(), linked, "injected packages");
    }
    let result = failures.resolve().map(|()| linked);
    (repo, result)
}

/// Place `package` in `dir` under its own file name, replacing any previous
/// copy. Hard links are tried first; a copy is made when linking is not
/// possible (different filesystem, no permission).
fn link_package(package: &Path, dir: &Path) -> Result<(), RepoError> {
    if package.extension().and_then(|e| e.to_str()) != Some(PACKAGE_EXTENSION) {
        return Err(RepoError::NotAPackage(package.to_path_buf()));
    }
    let Some(name) = package.file_name() else {
        return Err(RepoError::NotAPackage(package.to_path_buf()));
    };

    let meta = fs::metadata(package).map_err(RepoError::io("reading package", package))?;
    if !meta.is_file() {
        return Err(RepoError::NotAPackage(package.to_path_buf()));
    }

    let dest = dir.join(name);
    match fs::remove_file(&dest) {
        Ok(()) => debug!(path = %dest.display(), "replacing existing package"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(RepoError::io("removing old package", &dest)(e)),
    }

    if fs::hard_link(package, &dest).is_ok() {
        debug!(from = %package.display(), to = %dest.display(), "linked package");
        return Ok(());
    }

    fs::copy(package, &dest).map_err(RepoError::io("copying package", &dest))?;
    debug!(from = %package.display(), to = %dest.display(), "copied package");
    Ok(())
}
