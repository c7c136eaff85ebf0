//! pkgrepo - Debian repository builder CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pkgrepo_cli::cmd;
use pkgrepo_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command results.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scaffold {
            distro,
            workspace,
            repo,
        } => cmd::scaffold::scaffold(&cli.config, &distro, &workspace, repo.as_deref()),
        Commands::Build {
            workspace,
            distro,
            arch,
            package,
            audit,
            skip_preflight,
        } => {
            let options = cmd::build::BuildOptions {
                workspace,
                distros: distro,
                archs: arch,
                packages: package,
                audit,
                skip_preflight,
            };
            cmd::build::build(&cli.config, options).await
        }
        Commands::Check { no_tools } => cmd::check::check(&cli.config, no_tools),
    }
}
