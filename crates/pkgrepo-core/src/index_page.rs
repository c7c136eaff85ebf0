//! Browsable `index.html` listings for a published repository tree.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::RepoError;
use crate::metadata::write_file;

/// Name of the generated listing page.
pub const INDEX_PAGE: &str = "index.html";

/// Final pipeline step: make `dir` browsable once it is published to
/// `bucket`.
pub trait IndexPageBuilder: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if any page cannot be produced.
    fn build_index_page(&self, dir: &Path, bucket: &str) -> Result<(), RepoError>;
}

impl<T: IndexPageBuilder + ?Sized> IndexPageBuilder for Arc<T> {
    fn build_index_page(&self, dir: &Path, bucket: &str) -> Result<(), RepoError> {
        (**self).build_index_page(dir, bucket)
    }
}

/// Writes a static `index.html` into `dir` and every directory below it.
///
/// Links are relative, so the pages work wherever the tree is served from.
/// Existing `index.html` files are regenerated and never listed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIndexPages;

impl IndexPageBuilder for StaticIndexPages {
    fn build_index_page(&self, dir: &Path, bucket: &str) -> Result<(), RepoError> {
        let mut pages = 0;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                RepoError::Io {
                    action: "walking directory",
                    path,
                    cause: e.into(),
                }
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let title = if relative.as_os_str().is_empty() {
                bucket.to_string()
            } else {
                format!("{bucket}/{}", relative.display())
            };

            let html = render_listing(entry.path(), &title, entry.depth() > 0)?;
            write_file(&entry.path().join(INDEX_PAGE), html.as_bytes())?;
            debug!(path = %entry.path().display(), "wrote index page");
            pages += 1;
        }
        info!(path = %dir.display(), bucket, pages, "built index pages");
        Ok(())
    }
}

fn render_listing(dir: &Path, title: &str, has_parent: bool) -> Result<String, RepoError> {
    let mut names: Vec<(String, bool)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(RepoError::io("listing directory", dir))? {
        let entry = entry.map_err(RepoError::io("listing directory", dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == INDEX_PAGE {
            continue;
        }
        let is_dir = entry
            .file_type()
            .map_err(RepoError::io("listing directory", &entry.path()))?
            .is_dir();
        names.push((name, is_dir));
    }
    names.sort();

    let title = html_escape(title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );
    if has_parent {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for (name, is_dir) in names {
        let suffix = if is_dir { "/" } else { "" };
        let name = html_escape(&name);
        html.push_str(&format!("<li><a href=\"{name}{suffix}\">{name}{suffix}</a></li>\n"));
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    Ok(html)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
