//! # contract: interface to the repository that receives the artifacts
//!
//! This module defines the [`RepositoryClient`] trait and its request/response
//! types. The pipeline only talks to a repository through this trait; the
//! GitHub REST implementation lives in the `token-sync` crate and tests use the
//! generated [`MockRepositoryClient`].
//!
//! ## Error contract
//! - [`RepoError::NotFound`] must be returned when a ref or path does not
//!   exist. The change detector relies on it to tell new files apart from
//!   failed fetches.
//! - Every other failure maps to one of the remaining variants; implementors
//!   must never report a transport failure as `NotFound`.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; the mock is exported under the
//!   default `test-export-mocks` feature so integration tests can use it.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

/// Failure reported by a repository implementation.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound(_))
    }
}

/// One file write onto a branch. Creates the file or replaces its content.
#[derive(Debug, Clone, Copy)]
pub struct ContentUpdate<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub branch: &'a str,
    pub message: &'a str,
}

/// Parameters for opening a change request from `head` into `base`.
#[derive(Debug, Clone, Copy)]
pub struct NewChangeRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub head: &'a str,
    pub base: &'a str,
}

/// An opened change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    pub number: u64,
    pub url: String,
}

/// Capability set the pipeline needs from a hosted repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Latest commit SHA of `branch`.
    async fn get_ref(&self, branch: &str) -> Result<String, RepoError>;

    /// Create branch `name` pointing at `sha`.
    async fn create_ref(&self, name: &str, sha: &str) -> Result<(), RepoError>;

    /// Raw content of `path` at `reference`, or [`RepoError::NotFound`].
    async fn get_content(&self, path: &str, reference: &str) -> Result<Vec<u8>, RepoError>;

    /// Create or update one file on a branch as a single commit.
    async fn create_or_update_content<'a>(&self, update: ContentUpdate<'a>) -> Result<(), RepoError>;

    async fn create_change_request<'a>(
        &self,
        request: NewChangeRequest<'a>,
    ) -> Result<ChangeRequest, RepoError>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), RepoError>;
}
