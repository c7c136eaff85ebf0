//! Repository directory layout.
//!
//! ```text
//! <root>/                                  repository root, scanner cwd
//! └── dists/<code>/<org>/<version>/        Release, Release.gpg
//!     └── <component>/                     working directory
//!         ├── binary-amd64/Packages{,.gz}
//!         └── binary-arm64/Packages{,.gz}
//! ```
//!
//! The working directory sits [`SCAN_ROOT_DEPTH`] segments below the
//! repository root. [`RepoLayout`] validates that split once, up front, so
//! later steps never recompute it from string arithmetic.

use std::fs;
use std::path::{Component, Path, PathBuf};

use pkgrepo_schema::Arch;
use tracing::{debug, info};

use crate::error::RepoError;
use crate::failures::Failures;
use crate::metadata::{PACKAGES_FILE, PACKAGES_GZ_FILE, write_file, write_gzipped};

/// Number of path segments between the repository root and a component's
/// working directory (`dists/<code>/<org>/<version>/<component>`).
pub const SCAN_ROOT_DEPTH: usize = 5;

/// Release manifest file name.
pub const RELEASE_FILE: &str = "Release";

/// A working directory split into its repository root and the relative path
/// beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
    relative: PathBuf,
}

impl RepoLayout {
    /// Split `working_dir` into the root [`SCAN_ROOT_DEPTH`] segments up and
    /// the relative remainder.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Layout`] if the path is not valid UTF-8, if the
    /// last segments are not plain names (`..`, `.`) or if nothing is left
    /// over for the root.
    pub fn from_working_dir(working_dir: &Path) -> Result<Self, RepoError> {
        let invalid = |reason: String| RepoError::Layout {
            path: working_dir.to_path_buf(),
            reason,
        };

        // Segments become arguments to external tools.
        if working_dir.to_str().is_none() {
            return Err(invalid("path is not valid UTF-8".to_string()));
        }

        let components: Vec<Component<'_>> = working_dir.components().collect();
        if components.len() <= SCAN_ROOT_DEPTH {
            return Err(invalid(format!(
                "expected more than {SCAN_ROOT_DEPTH} path segments"
            )));
        }

        let split = components.len() - SCAN_ROOT_DEPTH;
        let mut relative = PathBuf::new();
        for component in &components[split..] {
            match component {
                Component::Normal(name) => relative.push(name),
                other => {
                    return Err(invalid(format!(
                        "segment '{}' is not a directory name",
                        other.as_os_str().to_string_lossy()
                    )));
                }
            }
        }

        let root: PathBuf = components[..split].iter().collect();
        if components[..split]
            .iter()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(invalid("repository root must not contain '..'".to_string()));
        }

        Ok(Self { root, relative })
    }

    /// Repository root; the package scanner runs from here.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working directory relative to the root.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn working_dir(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    /// `<working>/binary-<arch>`
    pub fn arch_dir(&self, arch: &Arch) -> PathBuf {
        self.working_dir().join(arch.dir_name())
    }

    /// Scanner argument: the architecture subtree relative to the root.
    pub fn scan_target(&self, arch: &Arch) -> PathBuf {
        self.relative.join(arch.dir_name())
    }

    /// Directory holding the Release manifest (parent of the working dir).
    pub fn release_dir(&self) -> PathBuf {
        let parent = self.relative.parent().unwrap_or_else(|| Path::new(""));
        self.root.join(parent)
    }

    pub fn release_path(&self) -> PathBuf {
        self.release_dir().join(RELEASE_FILE)
    }
}

/// Create `base/binary-<arch>` with empty index files for every architecture
/// that does not have a directory yet.
///
/// Every architecture is attempted; failures are collected and reported
/// together. An existing directory is left untouched (existence check only,
/// its contents are not inspected). Losing a creation race to a concurrent
/// job is treated the same as finding the directory already there.
///
/// Returns how many architectures were initialized.
///
/// # Errors
///
/// Returns the aggregated per-architecture failures.
pub fn ensure_arch_dirs(base: &Path, archs: &[Arch]) -> Result<usize, RepoError> {
    let mut failures = Failures::new();
    let mut created = 0;

    for arch in archs {
        if let Some(true) = failures.add(init_arch_dir(&base.join(arch.dir_name()))) {
            created += 1;
        }
    }

    failures.resolve()?;
    if created > 0 {
        info!(base = %base.display(), created, "initialized architecture directories");
    }
    Ok(created)
}

/// Returns `Ok(false)` when there was nothing to do.
fn init_arch_dir(dir: &Path) -> Result<bool, RepoError> {
    if dir
        .try_exists()
        .map_err(RepoError::io("checking directory", dir))?
    {
        return Ok(false);
    }

    if let Some(parent) = dir.parent() {
        create_dirs(parent)?;
    }

    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    match builder.create(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            debug!(path = %dir.display(), "directory created concurrently");
            return Ok(false);
        }
        Err(e) => return Err(RepoError::io("creating directory", dir)(e)),
    }

    write_file(&dir.join(PACKAGES_FILE), b"")?;
    write_gzipped(&dir.join(PACKAGES_GZ_FILE), b"")?;
    Ok(true)
}

fn create_dirs(path: &Path) -> Result<(), RepoError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(path)
        .map_err(RepoError::io("creating directory", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::SystemTime;

    fn archs(names: &[&str]) -> Vec<Arch> {
        names.iter().map(|n| Arch::new(*n).unwrap()).collect()
    }

    fn mtime(path: &Path) -> SystemTime {
        fs::metadata(path).unwrap().modified().unwrap()
    }

    #[test]
    fn test_layout_split() {
        let layout =
            RepoLayout::from_working_dir(Path::new("/srv/repo/apt/ubuntu/dists/jammy/acme/1.0/main"))
                .unwrap();
        assert_eq!(layout.root(), Path::new("/srv/repo/apt/ubuntu"));
        assert_eq!(layout.relative(), Path::new("dists/jammy/acme/1.0/main"));
        assert_eq!(
            layout.scan_target(&Arch::new("arm64").unwrap()),
            Path::new("dists/jammy/acme/1.0/main/binary-arm64")
        );
        assert_eq!(
            layout.release_path(),
            Path::new("/srv/repo/apt/ubuntu/dists/jammy/acme/1.0/Release")
        );
        assert_eq!(
            layout.working_dir(),
            Path::new("/srv/repo/apt/ubuntu/dists/jammy/acme/1.0/main")
        );
    }

    #[test]
    fn test_layout_rejects_short_paths() {
        let err = RepoLayout::from_working_dir(Path::new("dists/jammy/acme/1.0/main")).unwrap_err();
        assert!(matches!(err, RepoError::Layout { .. }));
        assert!(RepoLayout::from_working_dir(Path::new("/a/b/c")).is_err());
    }

    #[test]
    fn test_layout_rejects_parent_segments() {
        assert!(RepoLayout::from_working_dir(Path::new("/srv/dists/../acme/1.0/main/x")).is_err());
        assert!(RepoLayout::from_working_dir(Path::new("/srv/../x/dists/a/b/c/d")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_layout_rejects_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let working = Path::new(OsStr::from_bytes(b"/srv/\xffws/dists/jammy/acme/1.0/main"));
        let err = RepoLayout::from_working_dir(working).unwrap_err();
        assert!(
            matches!(err, RepoError::Layout { ref reason, .. } if reason.contains("UTF-8")),
            "{err}"
        );
    }

    #[test]
    fn test_ensure_creates_skeleton() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("repo/multiverse");

        let created = ensure_arch_dirs(&base, &archs(&["amd64", "arm64"])).unwrap();
        assert_eq!(created, 2);

        for arch in ["amd64", "arm64"] {
            let dir = base.join(format!("binary-{arch}"));
            assert!(dir.is_dir());
            assert_eq!(fs::read(dir.join(PACKAGES_FILE)).unwrap(), b"");
            let gz = fs::read(dir.join(PACKAGES_GZ_FILE)).unwrap();
            assert_eq!(&gz[..2], &[0x1f, 0x8b], "Packages.gz should be gzip framed");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        ensure_arch_dirs(tmp.path(), &archs(&["amd64"])).unwrap();

        let dir = tmp.path().join("binary-amd64");
        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        // umask can only clear bits
        assert_eq!(mode & 0o700, 0o700);
        let file_mode = fs::metadata(dir.join(PACKAGES_FILE)).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o111, 0);
    }

    #[test]
    fn test_existing_directory_is_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("binary-amd64");
        fs::create_dir_all(&dir).unwrap();

        let created = ensure_arch_dirs(tmp.path(), &archs(&["amd64"])).unwrap();
        assert_eq!(created, 0);
        // existence check only: placeholder files are not backfilled
        assert!(!dir.join(PACKAGES_FILE).exists());
    }

    #[test]
    fn test_failures_do_not_block_other_archs() {
        let tmp = tempfile::tempdir().unwrap();
        // a regular file where the base directory should be for one arch
        let base = tmp.path().join("component");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("binary-arm64"), "not a dir").unwrap();
        let blocked = tmp.path().join("blocked");
        fs::write(&blocked, "file").unwrap();

        let err = ensure_arch_dirs(&blocked, &archs(&["amd64", "arm64"])).unwrap_err();
        assert_eq!(err.count(), 2);

        // the file named like a directory counts as existing
        let created = ensure_arch_dirs(&base, &archs(&["amd64", "arm64"])).unwrap();
        assert_eq!(created, 1);
        assert!(base.join("binary-amd64").is_dir());
    }

    #[test]
    fn test_concurrent_ensure_is_safe() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("main");
        let all = archs(&["amd64", "arm64", "ppc64el", "s390x"]);

        let total: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| ensure_arch_dirs(&base, &all).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(total, all.len());
        for arch in &all {
            assert!(base.join(arch.dir_name()).join(PACKAGES_GZ_FILE).exists());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_ensure_is_idempotent(names in proptest::collection::btree_set("[a-z][a-z0-9]{0,7}", 1..5)) {
            let tmp = tempfile::tempdir().unwrap();
            let all: Vec<Arch> = names.iter().map(|n| Arch::new(n.clone()).unwrap()).collect();

            prop_assert_eq!(ensure_arch_dirs(tmp.path(), &all).unwrap(), all.len());
            let before: Vec<SystemTime> = all
                .iter()
                .map(|a| mtime(&tmp.path().join(a.dir_name()).join(PACKAGES_FILE)))
                .collect();

            prop_assert_eq!(ensure_arch_dirs(tmp.path(), &all).unwrap(), 0);
            let after: Vec<SystemTime> = all
                .iter()
                .map(|a| mtime(&tmp.path().join(a.dir_name()).join(PACKAGES_FILE)))
                .collect();
            prop_assert_eq!(before, after);
        }
    }
}
