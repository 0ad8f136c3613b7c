/// # token-sync CLI Interface (Module)
///
/// Command parsing and the async entrypoint for the `token-sync` binary.
/// All pipeline logic lives in [`token_sync_core`]; this module only loads
/// configuration, builds the GitHub client and prints results.
///
/// Results are printed to stdout as JSON; logs go to stderr.
use crate::github::GitHubClient;
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use token_sync_core::generate::ArtifactGenerator;
use token_sync_core::synchronise::{build, preview, synchronise};

/// CLI for token-sync: turn a design-token manifest into style files and a pull request.
#[derive(Parser)]
#[clap(
    name = "token-sync",
    version,
    about = "Generate CSS/SCSS/JS from a design-token manifest and publish changes as a pull request"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build artifacts and open a pull request for the ones that changed
    Sync {
        /// Path to the token manifest (JSON)
        #[clap(long)]
        manifest: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Build artifacts into the output directory without touching the repository
    Build {
        /// Path to the token manifest (JSON)
        #[clap(long)]
        manifest: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Build artifacts and list which ones differ from the base branch
    Preview {
        /// Path to the token manifest (JSON)
        #[clap(long)]
        manifest: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildSummary {
    output_files: Vec<String>,
    written: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed_files: Option<Vec<String>>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise result")?;
    println!("{json}");
    Ok(())
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let generator = ArtifactGenerator::default();

    match cli.command {
        Commands::Sync { manifest, config } => {
            let config = load_config(config.as_deref())?;
            let client = GitHubClient::new_from_env()
                .context("Failed to construct GitHub client from environment")?;
            tracing::info!(command = "sync", manifest = %manifest.display(), "Starting token sync");

            let result = synchronise(&config, &generator, &client, &manifest).await;
            print_json(&result)?;

            if result.success {
                tracing::info!(command = "sync", changed = result.changed_files.len(), "Token sync complete");
                Ok(())
            } else {
                if result.needs_cleanup() {
                    tracing::warn!(
                        branch = result.branch.as_deref().unwrap_or_default(),
                        committed = ?result.committed_files,
                        "Failed run left a branch behind"
                    );
                }
                tracing::error!(command = "sync", message = %result.message, "Token sync failed");
                Err(anyhow::Error::msg(result.message))
            }
        }
        Commands::Build { manifest, config } => {
            let config = load_config(config.as_deref())?;
            tracing::info!(command = "build", manifest = %manifest.display(), "Building artifacts");
            let report = build(&config, &generator, &manifest)?;
            print_json(&BuildSummary {
                output_files: report.output_files(),
                written: report.written,
                changed_files: None,
            })
        }
        Commands::Preview { manifest, config } => {
            let config = load_config(config.as_deref())?;
            let client = GitHubClient::new_from_env()
                .context("Failed to construct GitHub client from environment")?;
            tracing::info!(command = "preview", manifest = %manifest.display(), "Previewing changes");
            let report = preview(&config, &generator, &client, &manifest).await?;
            print_json(&BuildSummary {
                output_files: report.build.output_files(),
                written: report.build.written,
                changed_files: Some(report.changed),
            })
        }
    }
}
