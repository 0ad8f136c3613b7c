/// `load_config` module: loads the optional YAML pipeline config and applies
/// environment overrides, producing the core [`SyncConfig`].
///
/// # Accepted YAML
/// ```yaml
/// output_dir: ./build
/// manifest_dir: uploads
/// targets:
///   - destination: output/tokens.css
///     format: css/variables
/// publish:
///   base_branch: main
///   branch_prefix: design-tokens/update
///   title: "🎨 Design Token Update"
///   labels: [design-tokens, auto-generated]
/// ```
/// Every key is optional and falls back to the reference configuration.
///
/// # Environment
/// - `GITHUB_BRANCH` overrides `publish.base_branch`.
///
/// Credentials are not part of this file; see [`crate::github`].
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use token_sync_core::config::SyncConfig;
use tracing::{error, info};

pub const BASE_BRANCH_ENV: &str = "GITHUB_BRANCH";

/// Load `path` if given, otherwise start from defaults; then apply env overrides.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let mut config = match path {
        Some(path) => read_yaml(path)?,
        None => {
            info!("No config file given, using reference configuration");
            SyncConfig::default()
        }
    };

    if let Ok(branch) = std::env::var(BASE_BRANCH_ENV) {
        if !branch.trim().is_empty() {
            info!(base_branch = %branch, "Base branch overridden from environment");
            config.publish.base_branch = branch.trim().to_string();
        }
    }

    config.trace_loaded();
    Ok(config)
}

fn read_yaml(path: &Path) -> Result<SyncConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    // An empty document means "all defaults".
    if content.trim().is_empty() {
        return Ok(SyncConfig::default());
    }

    let config: SyncConfig = serde_yaml::from_str(&content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            e
        })
        .context("Failed to parse config YAML")?;

    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(config)
}
