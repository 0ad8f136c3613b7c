//! Error taxonomy for the token-sync pipeline.
//!
//! Every stage owns one error type. [`SyncError`] aggregates them so the
//! orchestrator can report which stage failed without flattening the cause
//! into a string.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::contract::RepoError;
use crate::generate::Format;

/// The manifest could not be read or does not have the category → token shape.
#[derive(Debug, Error)]
#[error("{reason}: {path}: {detail}")]
pub struct ValidationError {
    pub reason: &'static str,
    pub path: PathBuf,
    pub detail: String,
}

impl ValidationError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        ValidationError {
            reason: "malformed manifest",
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        ValidationError {
            reason: "unreadable manifest",
            path: path.into(),
            detail: source.to_string(),
        }
    }
}

/// A renderer or value transform faulted on an otherwise valid manifest.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no renderer registered for format {0}")]
    UnsupportedFormat(Format),

    #[error("more than one target writes to {0}")]
    DuplicateDestination(String),

    #[error("transform {transform} rejected {category}.{token} = {value:?}")]
    Transform {
        transform: &'static str,
        category: String,
        token: String,
        value: String,
    },
}

/// Writing a generated artifact to the local output directory failed.
#[derive(Debug, Error)]
#[error("I/O error at {path}: {source}")]
pub struct MaterializeError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub(crate) fn materialize_err(path: impl Into<PathBuf>, source: std::io::Error) -> MaterializeError {
    MaterializeError {
        path: path.into(),
        source,
    }
}

/// Fetching the reference content for a path failed for a reason other than
/// the path not existing.
#[derive(Debug, Error)]
#[error("could not compare {path} against {reference}: {source}")]
pub struct DetectionError {
    pub path: String,
    pub reference: String,
    #[source]
    pub source: RepoError,
}

/// Steps of the publisher state machine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishStep {
    ResolveBase,
    CreateBranch,
    CommitFiles,
    OpenChangeRequest,
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PublishStep::ResolveBase => "resolve-base",
            PublishStep::CreateBranch => "create-branch",
            PublishStep::CommitFiles => "commit-files",
            PublishStep::OpenChangeRequest => "open-change-request",
        };
        f.write_str(name)
    }
}

/// A publisher step failed. `branch` and `committed` describe the state left
/// behind in the repository; nothing is rolled back.
#[derive(Debug, Error)]
#[error("publish failed at {step}: {source}")]
pub struct PublishError {
    pub step: PublishStep,
    pub branch: Option<String>,
    pub committed: Vec<String>,
    #[source]
    pub source: RepoError,
}

/// Labeling an opened change request failed. Never fatal.
#[derive(Debug, Error)]
#[error("could not label change request #{number}: {source}")]
pub struct LabelError {
    pub number: u64,
    #[source]
    pub source: RepoError,
}

/// Pipeline stage names as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Validate,
    Generate,
    Materialize,
    Detect,
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Generate => "generate",
            Stage::Materialize => "materialize",
            Stage::Detect => "detect",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Any fatal pipeline failure.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl SyncError {
    pub fn stage(&self) -> Stage {
        match self {
            SyncError::Validation(_) => Stage::Validate,
            SyncError::Generation(_) => Stage::Generate,
            SyncError::Materialize(_) => Stage::Materialize,
            SyncError::Detection(_) => Stage::Detect,
            SyncError::Publish(_) => Stage::Publish,
        }
    }
}
