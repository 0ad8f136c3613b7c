//! Publishing a change set as a change request.
//!
//! The publisher is a linear state machine, one repository call per step:
//!
//! | step                | call                          | on failure                            |
//! |---------------------|-------------------------------|---------------------------------------|
//! | resolve-base        | `get_ref(base)`               | abort, nothing created                |
//! | create-branch       | `create_ref(branch, sha)`     | abort, nothing created                |
//! | commit-files        | `create_or_update_content` ×N | abort, branch keeps committed subset  |
//! | open-change-request | `create_change_request`       | abort, branch keeps all files         |
//! | label               | `add_labels`                  | reported, change request still valid  |
//!
//! Nothing is retried and nothing is rolled back; [`PublishError`] records the
//! branch and the files committed so far so an operator can clean up.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contract::{ChangeRequest, ContentUpdate, NewChangeRequest, RepositoryClient};
use crate::error::{LabelError, PublishError, PublishStep};

/// Ordered files destined for one branch. The manifest comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub manifest: ChangeEntry,
    pub artifacts: Vec<ChangeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEntry {
    pub path: String,
    pub content: Vec<u8>,
}

impl ChangeSet {
    pub fn entries(&self) -> impl Iterator<Item = &ChangeEntry> {
        std::iter::once(&self.manifest).chain(self.artifacts.iter())
    }
}

/// How change requests are named, described and labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    pub base_branch: String,
    pub branch_prefix: String,
    pub title: String,
    pub labels: Vec<String>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        PublishSettings {
            base_branch: "main".to_string(),
            branch_prefix: "design-tokens/update".to_string(),
            title: "🎨 Design Token Update".to_string(),
            labels: vec!["design-tokens".to_string(), "auto-generated".to_string()],
        }
    }
}

/// Result of a publish that got as far as opening the change request.
#[derive(Debug)]
pub struct PublishedChange {
    pub branch: String,
    pub change_request: ChangeRequest,
    pub committed: Vec<String>,
    /// Set when the best-effort labeling step failed.
    pub label_error: Option<LabelError>,
}

/// Branch name unique per run: `<prefix>-<unix millis>-<8 hex chars>`.
///
/// The random suffix keeps runs started in the same millisecond apart.
pub fn branch_name(prefix: &str, now: DateTime<Utc>, run_id: Uuid) -> String {
    let simple = run_id.simple().to_string();
    format!("{}-{}-{}", prefix, now.timestamp_millis(), &simple[..8])
}

/// Markdown body listing the manifest and the changed outputs.
pub fn change_request_body(manifest_path: &str, changed_outputs: &[String]) -> String {
    let mut body = String::from("## 🎨 Design Token Changes\n\n");
    body.push_str("This pull request contains updated design tokens.\n\n");
    body.push_str("### Changed files\n\n");
    let _ = writeln!(body, "**Token file:**\n- {manifest_path}\n");
    body.push_str("**Generated files:**\n");
    for path in changed_outputs {
        let _ = writeln!(body, "- {path}");
    }
    body.push_str("\n---\n\n🤖 This pull request was generated automatically.\n");
    body
}

fn commit_message(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    format!("Update {name}")
}

pub struct Publisher<'a, C: ?Sized> {
    client: &'a C,
    settings: &'a PublishSettings,
}

impl<'a, C> Publisher<'a, C>
where
    C: RepositoryClient + ?Sized,
{
    pub fn new(client: &'a C, settings: &'a PublishSettings) -> Self {
        Publisher { client, settings }
    }

    /// Publish onto a freshly named branch off `settings.base_branch`.
    pub async fn publish(&self, change_set: &ChangeSet) -> Result<PublishedChange, PublishError> {
        let branch = branch_name(&self.settings.branch_prefix, Utc::now(), Uuid::new_v4());
        self.publish_to_branch(change_set, &branch).await
    }

    pub async fn publish_to_branch(
        &self,
        change_set: &ChangeSet,
        branch: &str,
    ) -> Result<PublishedChange, PublishError> {
        let base = self.settings.base_branch.as_str();
        info!(base, branch, files = change_set.artifacts.len() + 1, "[PUBLISH] Starting publish");

        // --- ResolveBase ---
        let sha = self.client.get_ref(base).await.map_err(|e| {
            error!(base, error = %e, "[PUBLISH][ERROR] Could not resolve base branch");
            PublishError {
                step: PublishStep::ResolveBase,
                branch: None,
                committed: Vec::new(),
                source: e,
            }
        })?;

        // --- CreateBranch ---
        self.client.create_ref(branch, &sha).await.map_err(|e| {
            error!(branch, sha = %sha, error = %e, "[PUBLISH][ERROR] Could not create branch");
            PublishError {
                step: PublishStep::CreateBranch,
                branch: None,
                committed: Vec::new(),
                source: e,
            }
        })?;
        info!(branch, sha = %sha, "[PUBLISH] Created branch");

        // --- CommitFiles ---
        let mut committed = Vec::new();
        for entry in change_set.entries() {
            let message = commit_message(&entry.path);
            let update = ContentUpdate {
                path: &entry.path,
                content: &entry.content,
                branch,
                message: &message,
            };
            if let Err(e) = self.client.create_or_update_content(update).await {
                error!(
                    branch,
                    path = %entry.path,
                    committed = committed.len(),
                    error = %e,
                    "[PUBLISH][ERROR] Commit failed; branch left with partial content"
                );
                return Err(PublishError {
                    step: PublishStep::CommitFiles,
                    branch: Some(branch.to_string()),
                    committed,
                    source: e,
                });
            }
            info!(branch, path = %entry.path, "[PUBLISH] Committed file");
            committed.push(entry.path.clone());
        }

        // --- OpenChangeRequest ---
        let changed_outputs: Vec<String> =
            change_set.artifacts.iter().map(|a| a.path.clone()).collect();
        let body = change_request_body(&change_set.manifest.path, &changed_outputs);
        let request = NewChangeRequest {
            title: &self.settings.title,
            body: &body,
            head: branch,
            base,
        };
        let change_request = match self.client.create_change_request(request).await {
            Ok(cr) => cr,
            Err(e) => {
                error!(branch, error = %e, "[PUBLISH][ERROR] Could not open change request");
                return Err(PublishError {
                    step: PublishStep::OpenChangeRequest,
                    branch: Some(branch.to_string()),
                    committed,
                    source: e,
                });
            }
        };
        info!(number = change_request.number, url = %change_request.url, "[PUBLISH] Opened change request");

        let label_error = self.label(&change_request).await;

        Ok(PublishedChange {
            branch: branch.to_string(),
            change_request,
            committed,
            label_error,
        })
    }

    /// Best-effort: a failure is returned, never propagated.
    async fn label(&self, change_request: &ChangeRequest) -> Option<LabelError> {
        if self.settings.labels.is_empty() {
            return None;
        }
        match self
            .client
            .add_labels(change_request.number, &self.settings.labels)
            .await
        {
            Ok(()) => {
                info!(number = change_request.number, labels = ?self.settings.labels, "[PUBLISH] Labelled change request");
                None
            }
            Err(e) => {
                warn!(number = change_request.number, error = %e, "[PUBLISH] Labeling failed; change request kept");
                Some(LabelError {
                    number: change_request.number,
                    source: e,
                })
            }
        }
    }
}
