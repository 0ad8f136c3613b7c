//! High-level pipeline: orchestrates validate → generate → materialise →
//! detect → publish for one uploaded manifest.
//!
//! # Responsibilities
//! - Runs the stages strictly in order; the first failing stage stops the run
//!   and nothing is retried.
//! - Materialises artifacts only after every artifact was generated, so a
//!   generation failure leaves no files behind.
//! - Short-circuits with success when no generated file differs from the base
//!   branch: no branch, no change request.
//! - [`SyncResult::from_run`] is the single place where a stage failure is
//!   turned into the caller-facing payload.
//!
//! # Entry points
//! - [`synchronise`]: the full pipeline.
//! - [`build`]: local generation only, no repository access.
//! - [`preview`]: generation plus change detection, no repository writes.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::contract::{ChangeRequest, RepositoryClient};
use crate::detect::{self, Candidate};
use crate::error::{materialize_err, MaterializeError, Stage, SyncError};
use crate::generate::{ArtifactGenerator, GeneratedArtifact};
use crate::manifest::ManifestFile;
use crate::publish::{ChangeEntry, ChangeSet, PublishedChange, Publisher};

/// Output of the local part of the pipeline.
#[derive(Debug)]
pub struct BuildReport {
    pub manifest: ManifestFile,
    /// Repository path the manifest is committed under.
    pub manifest_repo_path: String,
    pub artifacts: Vec<GeneratedArtifact>,
    /// Local files written, in target order.
    pub written: Vec<PathBuf>,
}

impl BuildReport {
    pub fn output_files(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .map(|a| a.target.destination.clone())
            .collect()
    }
}

#[derive(Debug)]
pub struct PreviewReport {
    pub build: BuildReport,
    pub changed: Vec<String>,
}

/// Successful end states of [`run`].
#[derive(Debug)]
pub enum SyncOutcome {
    Unchanged { output_files: Vec<String> },
    Published {
        output_files: Vec<String>,
        changed: Vec<String>,
        published: PublishedChange,
    },
}

/// Change-request part of the caller payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResult {
    fn opened(cr: &ChangeRequest) -> Self {
        PublishResult {
            success: true,
            pr_url: Some(cr.url.clone()),
            pr_number: Some(cr.number),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        PublishResult {
            success: false,
            pr_url: None,
            pr_number: None,
            error: Some(error),
        }
    }
}

/// Caller-facing result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    pub output_files: Vec<String>,
    pub changed_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub committed_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<PublishResult>,
}

impl SyncResult {
    pub fn from_run(run: Result<SyncOutcome, SyncError>, config: &SyncConfig) -> Self {
        match run {
            Ok(SyncOutcome::Unchanged { output_files }) => SyncResult {
                success: true,
                message: "Tokens built; no generated file changed, no pull request opened."
                    .to_string(),
                output_files,
                changed_files: Vec::new(),
                stage: None,
                error: None,
                branch: None,
                committed_files: Vec::new(),
                label_error: None,
                pr: None,
            },
            Ok(SyncOutcome::Published {
                output_files,
                changed,
                published,
            }) => SyncResult {
                success: true,
                message: format!(
                    "Tokens built and pull request #{} opened.",
                    published.change_request.number
                ),
                output_files,
                changed_files: changed,
                stage: None,
                error: None,
                branch: Some(published.branch),
                committed_files: published.committed,
                label_error: published.label_error.map(|e| e.to_string()),
                pr: Some(PublishResult::opened(&published.change_request)),
            },
            Err(err) => {
                let stage = err.stage();
                // Past materialisation every configured target exists locally.
                let output_files = match stage {
                    Stage::Detect | Stage::Publish => config
                        .targets
                        .iter()
                        .map(|t| t.destination.clone())
                        .collect(),
                    _ => Vec::new(),
                };
                let (branch, committed_files, pr) = match &err {
                    SyncError::Publish(p) => (
                        p.branch.clone(),
                        p.committed.clone(),
                        Some(PublishResult::failed(p.to_string())),
                    ),
                    _ => (None, Vec::new(), None),
                };
                let mut message = format!("Token sync failed at stage {stage}.");
                if let Some(b) = &branch {
                    message.push_str(&format!(" Branch {b} was left behind and may need manual cleanup."));
                }
                SyncResult {
                    success: false,
                    message,
                    output_files,
                    changed_files: Vec::new(),
                    stage: Some(stage),
                    error: Some(err.to_string()),
                    branch,
                    committed_files,
                    label_error: None,
                    pr,
                }
            }
        }
    }

    /// True when a failed run left a branch in the repository.
    pub fn needs_cleanup(&self) -> bool {
        !self.success && self.branch.is_some()
    }
}

/// Run the whole pipeline and map the outcome for the caller.
pub async fn synchronise<C>(
    config: &SyncConfig,
    generator: &ArtifactGenerator,
    client: &C,
    manifest_path: &Path,
) -> SyncResult
where
    C: RepositoryClient + ?Sized,
{
    let run = run(config, generator, client, manifest_path).await;
    if let Err(e) = &run {
        error!(stage = %e.stage(), error = %e, "[SYNC][ERROR] Pipeline failed");
    }
    SyncResult::from_run(run, config)
}

/// The pipeline with typed errors.
pub async fn run<C>(
    config: &SyncConfig,
    generator: &ArtifactGenerator,
    client: &C,
    manifest_path: &Path,
) -> Result<SyncOutcome, SyncError>
where
    C: RepositoryClient + ?Sized,
{
    info!(manifest_path = %manifest_path.display(), "[SYNC] Starting token sync pipeline");

    let PreviewReport { build, changed } = preview(config, generator, client, manifest_path).await?;
    let output_files = build.output_files();

    if changed.is_empty() {
        info!("[SYNC] No generated file changed; skipping publish");
        return Ok(SyncOutcome::Unchanged { output_files });
    }

    let change_set = ChangeSet {
        manifest: ChangeEntry {
            path: build.manifest_repo_path.clone(),
            content: build.manifest.bytes.clone(),
        },
        artifacts: build
            .artifacts
            .iter()
            .filter(|a| changed.contains(&a.target.destination))
            .map(|a| ChangeEntry {
                path: a.target.destination.clone(),
                content: a.content.clone(),
            })
            .collect(),
    };

    let published = Publisher::new(client, &config.publish)
        .publish(&change_set)
        .await?;

    if let Some(e) = &published.label_error {
        warn!(error = %e, "[SYNC] Change request opened without labels");
    }
    info!(
        branch = %published.branch,
        number = published.change_request.number,
        "[SYNC] Token sync complete"
    );

    Ok(SyncOutcome::Published {
        output_files,
        changed,
        published,
    })
}

/// Generation plus change detection against the configured base branch.
pub async fn preview<C>(
    config: &SyncConfig,
    generator: &ArtifactGenerator,
    client: &C,
    manifest_path: &Path,
) -> Result<PreviewReport, SyncError>
where
    C: RepositoryClient + ?Sized,
{
    let build = build(config, generator, manifest_path)?;

    let candidates: Vec<Candidate> = build
        .artifacts
        .iter()
        .map(|a| Candidate {
            path: a.target.destination.clone(),
            content: a.content.clone(),
        })
        .collect();
    let changed = detect::diff(client, &candidates, &config.publish.base_branch).await?;

    Ok(PreviewReport { build, changed })
}

/// Load, validate, generate and write artifacts under `config.output_dir`.
pub fn build(
    config: &SyncConfig,
    generator: &ArtifactGenerator,
    manifest_path: &Path,
) -> Result<BuildReport, SyncError> {
    let manifest = ManifestFile::load(manifest_path)?;
    let artifacts = generator.generate(&manifest.manifest, &config.targets)?;
    let written = materialize(&config.output_dir, &artifacts)?;
    let manifest_repo_path = config.manifest_repo_path(&manifest.file_name());

    info!(
        written = written.len(),
        manifest_repo_path = %manifest_repo_path,
        "[BUILD] Artifacts written"
    );

    Ok(BuildReport {
        manifest,
        manifest_repo_path,
        artifacts,
        written,
    })
}

/// Write each artifact through a temp file in its destination directory, so
/// a reader never sees a half-written file.
pub fn materialize(
    output_dir: &Path,
    artifacts: &[GeneratedArtifact],
) -> Result<Vec<PathBuf>, MaterializeError> {
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let relative = Path::new(&artifact.target.destination);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(materialize_err(
                relative,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "destination must be a relative path inside the output directory",
                ),
            ));
        }

        let path = output_dir.join(relative);
        let parent = path.parent().unwrap_or(output_dir);
        std::fs::create_dir_all(parent).map_err(|e| materialize_err(parent, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| materialize_err(parent, e))?;
        tmp.write_all(&artifact.content)
            .map_err(|e| materialize_err(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| materialize_err(&path, e.error))?;

        info!(path = %path.display(), bytes = artifact.content.len(), "[BUILD] Wrote artifact");
        written.push(path);
    }
    Ok(written)
}
