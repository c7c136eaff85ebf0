//! pkgrepo - Debian repository builder
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Turns freshly built `.deb` packages into signed, browsable apt
//! repositories.
//!
//! # Workspace Layout
//!
//! ```text
//! <workspace>/
//! └── <distro>-<arch>-deb-repo/          one directory per job
//!     └── repo/apt/ubuntu/dists/jammy/acme/1.0/
//!         ├── Release, Release.gpg
//!         └── multiverse/
//!             ├── index.html
//!             └── binary-amd64/{Packages,Packages.gz,*.deb}
//! ```

pub mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pkgrepo")]
#[command(author, version, about = "pkgrepo - build signed Debian package repositories")]
pub struct Cli {
    /// Path to the builder configuration
    #[arg(long, short, global = true, env = "PKGREPO_CONFIG", default_value = "pkgrepo.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the empty directory skeleton for a distro's repositories
    Scaffold {
        /// Distro name from the configuration
        #[arg(long, short)]
        distro: String,
        /// Root directory the repositories live under
        #[arg(long, short)]
        workspace: PathBuf,
        /// Only scaffold this repository (defaults to all of the distro's)
        #[arg(long)]
        repo: Option<String>,
    },
    /// Inject packages and rebuild, sign and index repositories
    Build {
        /// Root directory for job working trees
        #[arg(long, short)]
        workspace: PathBuf,
        /// Distros to build (defaults to all)
        #[arg(long, short)]
        distro: Vec<String>,
        /// Restrict to these architectures
        #[arg(long, short)]
        arch: Vec<String>,
        /// .deb files to inject into every selected repository
        #[arg(long, short)]
        package: Vec<PathBuf>,
        /// Write captured release tool output as JSON to this file
        #[arg(long)]
        audit: Option<PathBuf>,
        /// Do not check that external tools are installed
        #[arg(long)]
        skip_preflight: bool,
    },
    /// Validate the configuration and check required tools
    Check {
        /// Skip the PATH lookup of external tools
        #[arg(long)]
        no_tools: bool,
    },
}
