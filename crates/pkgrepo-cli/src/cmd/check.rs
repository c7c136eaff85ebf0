//! Check command: validate configuration before a build
use std::path::Path;

use anyhow::{Result, bail};
use pkgrepo_core::config::SigningConfig;
use pkgrepo_core::preflight::check_tools;
use pkgrepo_core::sign::Ed25519Signer;

use super::load_config;

/// Report every problem that would make `build` fail up front.
pub fn check(config_path: &Path, no_tools: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut problems = Vec::new();

    for (distro, edition) in config.missing_templates() {
        problems.push(format!(
            "distro '{distro}': no 'Release' template defined for edition '{edition}'"
        ));
    }

    if let SigningConfig::Ed25519 { key_env } = &config.signing {
        match Ed25519Signer::from_env(key_env) {
            Ok(signer) => {
                println!("signing key: {}", signer.public_key_base64());
                eprintln!("warning: ed25519 signatures are not OpenPGP; apt will not verify Release.gpg");
            }
            Err(e) => problems.push(e.to_string()),
        }
    }

    if !no_tools && let Err(e) = check_tools(&config.required_tools()) {
        problems.push(e.to_string());
    }

    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("error: {problem}");
        }
        bail!("{} problem(s) found in {}", problems.len(), config_path.display());
    }

    println!(
        "{}: {} distro(s), {} template(s) OK",
        config_path.display(),
        config.distros.len(),
        config.templates.deb.len()
    );
    Ok(())
}
