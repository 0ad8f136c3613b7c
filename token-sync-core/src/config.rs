use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::generate::OutputTarget;
use crate::publish::PublishSettings;

/// Per-run pipeline configuration. Every field defaults to the reference
/// configuration: three targets under `output/`, manifests committed under
/// `uploads/`, change requests against `main`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory the artifacts are written to before publishing.
    pub output_dir: PathBuf,
    /// Repository directory the manifest itself is committed to.
    pub manifest_dir: String,
    pub targets: Vec<OutputTarget>,
    pub publish: PublishSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            output_dir: PathBuf::from("."),
            manifest_dir: "uploads".to_string(),
            targets: OutputTarget::reference_set(),
            publish: PublishSettings::default(),
        }
    }
}

impl SyncConfig {
    /// Repository path the manifest file is committed under.
    pub fn manifest_repo_path(&self, file_name: &str) -> String {
        let dir = self.manifest_dir.trim_matches('/');
        if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{dir}/{file_name}")
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            output_dir = %self.output_dir.display(),
            targets_count = self.targets.len(),
            base_branch = %self.publish.base_branch,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
