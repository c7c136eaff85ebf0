//! Package index regeneration.
//!
//! `Packages` and `Packages.gz` are always produced from the same scan
//! invocation: the plain index is written verbatim from the scanner's
//! standard output and the compressed index is a recompression of those same
//! bytes. There is no incremental update path.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use pkgrepo_schema::Arch;
use tracing::info;

use crate::command::{CommandRunner, Invocation, path_arg};
use crate::error::RepoError;
use crate::layout::RepoLayout;

/// Plain-text package index file name.
pub const PACKAGES_FILE: &str = "Packages";
/// Compressed package index file name.
pub const PACKAGES_GZ_FILE: &str = "Packages.gz";

/// Write `content` to `path` with mode 0644 on unix.
///
/// # Errors
///
/// Returns [`RepoError::Io`] if the file cannot be created or written.
pub fn write_file(path: &Path, content: &[u8]) -> Result<(), RepoError> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options
        .open(path)
        .map_err(RepoError::io("creating file", path))?;
    file.write_all(content)
        .map_err(RepoError::io("writing file", path))
}

/// Gzip `content` at maximum compression.
///
/// # Errors
///
/// Returns [`RepoError::Io`] if the encoder fails.
pub fn gzip(content: &[u8], name: &Path) -> Result<Vec<u8>, RepoError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(content)
        .map_err(RepoError::io("compressing", name))?;
    encoder.finish().map_err(RepoError::io("compressing", name))
}

/// Gzip `content` and write the result to `path`.
///
/// # Errors
///
/// Returns [`RepoError::Io`] if compression or the write fails.
pub fn write_gzipped(path: &Path, content: &[u8]) -> Result<(), RepoError> {
    let compressed = gzip(content, path)?;
    write_file(path, &compressed)?;
    info!(path = %path.display(), "wrote zipped packages file");
    Ok(())
}

/// Regenerate `binary-<arch>/Packages` and `Packages.gz` under the layout's
/// working directory.
///
/// The scanner runs from the repository root so the `Filename:` entries it
/// emits are relative to that root. A non-zero exit aborts before anything
/// is written.
///
/// # Errors
///
/// Returns a [`RepoError::Step`] naming the failed stage: the scan itself,
/// the index write, or the compression.
pub fn regenerate_index(
    runner: &dyn CommandRunner,
    scan_program: &str,
    layout: &RepoLayout,
    arch: &Arch,
) -> Result<(), RepoError> {
    let working_dir = layout.working_dir();
    let target = layout.scan_target(arch);

    let inv = Invocation::new(scan_program, layout.root())
        .arg("--multiversion")
        .arg(path_arg(&target).map_err(|e| e.in_step("building 'Packages'", &working_dir))?);
    info!(command = %inv.command_line(), path = %inv.dir.display(), "running command");

    let output = runner
        .run(&inv)
        .map_err(|e| e.in_step("building 'Packages'", &working_dir))?;
    output
        .check(&inv, &output.stdout)
        .map_err(|e| e.in_step("building 'Packages'", &working_dir))?;

    let packages_file = layout.arch_dir(arch).join(PACKAGES_FILE);
    write_file(&packages_file, &output.stdout)
        .map_err(|e| e.in_step("writing packages file", &working_dir))?;
    info!(path = %packages_file.display(), "wrote packages file");

    let compressed_file = layout.arch_dir(arch).join(PACKAGES_GZ_FILE);
    write_gzipped(&compressed_file, &output.stdout)
        .map_err(|e| e.in_step("compressing the 'Packages' file", &working_dir))?;

    Ok(())
}
