//! Build command: run one repository job per distro and architecture
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use futures::future::join_all;
use tracing::info;

use pkgrepo_core::preflight::check_tools;
use pkgrepo_core::{
    CommandRunner, Config, DebRepoJob, JobContext, OutputStore, StaticIndexPages, SystemRunner, sign,
};
use pkgrepo_schema::{Arch, DistroSpec};

use super::load_config;

#[derive(Debug)]
pub struct BuildOptions {
    pub workspace: PathBuf,
    pub distros: Vec<String>,
    pub archs: Vec<String>,
    pub packages: Vec<PathBuf>,
    pub audit: Option<PathBuf>,
    pub skip_preflight: bool,
}

/// Inject, rebuild, sign and index every selected repository.
///
/// Jobs run in parallel on the blocking pool; each is sequential inside.
pub async fn build(config_path: &Path, options: BuildOptions) -> Result<()> {
    let config = Arc::new(load_config(config_path)?);
    let distros = select_distros(&config, &options.distros)?;
    let archs = options
        .archs
        .iter()
        .map(|a| a.parse::<Arch>())
        .collect::<Result<Vec<_>, _>>()?;

    if !options.skip_preflight {
        check_tools(&config.required_tools()).context("Preflight check failed")?;
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let signer = sign::from_config(&config.signing, Arc::clone(&runner))?;
    let ctx = JobContext {
        config: Arc::clone(&config),
        runner,
        signer,
        pages: Arc::new(StaticIndexPages),
        outputs: Arc::new(OutputStore::new()),
    };

    let mut jobs = Vec::new();
    for distro in distros {
        for arch in &distro.architectures {
            if !archs.is_empty() && !archs.contains(arch) {
                continue;
            }
            jobs.push(DebRepoJob::new(
                ctx.clone(),
                distro.clone(),
                arch.clone(),
                &options.workspace,
                options.packages.clone(),
            )?);
        }
    }
    if jobs.is_empty() {
        bail!("No jobs match the selected distros and architectures");
    }

    let total = jobs.len();
    info!(jobs = total, workspace = %options.workspace.display(), "starting build");

    let handles = jobs
        .into_iter()
        .filter(DebRepoJob::should_run)
        .map(|job| tokio::task::spawn_blocking(move || job.run()));
    let results = join_all(handles).await;

    let mut failed = 0;
    for result in results {
        let report = result.context("Build job panicked")?;
        match &report.error {
            None => println!("{}: rebuilt {} repositories", report.id, report.rebuilt.len()),
            Some(e) => {
                failed += 1;
                eprintln!("{}: {e}", report.id);
            }
        }
    }

    if let Some(path) = &options.audit {
        let json = ctx.outputs.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write audit file {}", path.display()))?;
        info!(path = %path.display(), entries = ctx.outputs.len(), "wrote audit file");
    }

    if failed > 0 {
        bail!("{failed} of {total} jobs failed");
    }
    Ok(())
}

fn select_distros(config: &Config, names: &[String]) -> Result<Vec<DistroSpec>> {
    if names.is_empty() {
        return Ok(config.distros.clone());
    }
    names
        .iter()
        .map(|name| config.distro(name).cloned().map_err(Into::into))
        .collect()
}
