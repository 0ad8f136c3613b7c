//! # GitHub client
//!
//! Bridges [`token_sync_core::contract::RepositoryClient`] to the GitHub REST
//! API (v3) over `reqwest`.
//!
//! | contract call              | endpoint                                        |
//! |----------------------------|-------------------------------------------------|
//! | `get_ref`                  | `GET  /repos/{o}/{r}/git/ref/heads/{branch}`    |
//! | `create_ref`               | `POST /repos/{o}/{r}/git/refs`                  |
//! | `get_content`              | `GET  /repos/{o}/{r}/contents/{path}?ref=`      |
//! | `create_or_update_content` | `PUT  /repos/{o}/{r}/contents/{path}`           |
//! | `create_change_request`    | `POST /repos/{o}/{r}/pulls`                     |
//! | `add_labels`               | `POST /repos/{o}/{r}/issues/{n}/labels`         |
//!
//! Construct with [`GitHubClient::new_from_env`] (`GITHUB_TOKEN`,
//! `GITHUB_OWNER`, `GITHUB_REPO`, optional `GITHUB_API_URL`).

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;

use token_sync_core::contract::{
    ChangeRequest, ContentUpdate, NewChangeRequest, RepoError, RepositoryClient,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Connection settings for one repository.
#[derive(Clone)]
pub struct GitHubSettings {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GitHubSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let required = |name: &str| {
            env::var(name).map_err(|e| {
                tracing::error!(error = ?e, var = name, "Missing required environment variable");
                anyhow::anyhow!("{name} environment variable not set")
            })
        };
        let token = required("GITHUB_TOKEN")?;
        let owner = required("GITHUB_OWNER")?;
        let repo = required("GITHUB_REPO")?;
        let api_url = env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Ok(GitHubSettings {
            token,
            owner,
            repo,
            api_url,
            timeout: Duration::from_secs(30),
        })
    }
}

pub struct GitHubClient {
    http: reqwest::Client,
    repo_url: String,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

        let http = reqwest::Client::builder()
            .user_agent(concat!("token-sync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        let repo_url = format!(
            "{}/repos/{}/{}",
            settings.api_url.trim_end_matches('/'),
            settings.owner,
            settings.repo
        );
        tracing::info!(repo_url = %repo_url, "Initialized GitHubClient");
        Ok(GitHubClient { http, repo_url })
    }

    pub fn new_from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = GitHubSettings::from_env()?;
        GitHubClient::new(&settings)
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/{}", self.repo_url, tail)
    }

    /// Send and turn any non-2xx status into a [`RepoError`].
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, RepoError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = ?e, what, "GitHub request failed to send");
            RepoError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();
        let err = classify(status, remaining.as_deref(), &body, what);
        if !err.is_not_found() {
            tracing::error!(status = status.as_u16(), what, error = %err, "GitHub API error");
        }
        Err(err)
    }

    async fn json<T: for<'de> Deserialize<'de>>(response: Response, what: &str) -> Result<T, RepoError> {
        response.json::<T>().await.map_err(|e| {
            tracing::error!(error = ?e, what, "Could not decode GitHub response");
            RepoError::Transport(format!("invalid response for {what}: {e}"))
        })
    }

    /// `contents/{path}` with each path segment percent-encoded.
    fn contents_url(&self, path: &str) -> Result<Url, RepoError> {
        let mut url = Url::parse(&self.url("contents"))
            .map_err(|e| RepoError::Transport(format!("invalid contents url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| RepoError::Transport(format!("{} cannot carry a path", self.repo_url)))?
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    async fn fetch_file(&self, path: &str, reference: &str) -> Result<ContentResponse, RepoError> {
        let request = self
            .http
            .get(self.contents_url(path)?)
            .query(&[("ref", reference)]);
        let response = self.send(request, path).await?;
        Self::json(response, path).await
    }
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn get_ref(&self, branch: &str) -> Result<String, RepoError> {
        tracing::info!(branch, "Resolving branch head");
        let what = format!("heads/{branch}");
        let response = self
            .send(self.http.get(self.url(&format!("git/ref/{what}"))), &what)
            .await?;
        let parsed: RefResponse = Self::json(response, &what).await?;
        Ok(parsed.object.sha)
    }

    async fn create_ref(&self, name: &str, sha: &str) -> Result<(), RepoError> {
        tracing::info!(branch = name, sha, "Creating branch");
        let body = json!({ "ref": format!("refs/heads/{name}"), "sha": sha });
        self.send(self.http.post(self.url("git/refs")).json(&body), name)
            .await?;
        Ok(())
    }

    async fn get_content(&self, path: &str, reference: &str) -> Result<Vec<u8>, RepoError> {
        tracing::debug!(path, reference, "Fetching file content");
        let file = self.fetch_file(path, reference).await?;
        decode_content(file.content.as_deref(), file.encoding.as_deref())
    }

    async fn create_or_update_content<'a>(&self, update: ContentUpdate<'a>) -> Result<(), RepoError> {
        // Updating an existing file requires its current blob sha on the branch.
        let existing_sha = match self.fetch_file(update.path, update.branch).await {
            Ok(file) => Some(file.sha),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        tracing::info!(
            path = update.path,
            branch = update.branch,
            update = existing_sha.is_some(),
            "Writing file content"
        );
        let mut body = json!({
            "message": update.message,
            "content": base64::engine::general_purpose::STANDARD.encode(update.content),
            "branch": update.branch,
        });
        if let Some(sha) = existing_sha {
            body["sha"] = json!(sha);
        }

        let url = self.contents_url(update.path)?;
        self.send(self.http.put(url).json(&body), update.path).await?;
        Ok(())
    }

    async fn create_change_request<'a>(
        &self,
        request: NewChangeRequest<'a>,
    ) -> Result<ChangeRequest, RepoError> {
        tracing::info!(head = request.head, base = request.base, "Opening pull request");
        let body = json!({
            "title": request.title,
            "body": request.body,
            "head": request.head,
            "base": request.base,
        });
        let response = self
            .send(self.http.post(self.url("pulls")).json(&body), "pulls")
            .await?;
        let pull: PullResponse = Self::json(response, "pulls").await?;
        tracing::info!(number = pull.number, url = %pull.html_url, "Opened pull request");
        Ok(ChangeRequest {
            number: pull.number,
            url: pull.html_url,
        })
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), RepoError> {
        tracing::info!(number, ?labels, "Adding labels");
        let url = self.url(&format!("issues/{number}/labels"));
        self.send(self.http.post(url).json(&json!({ "labels": labels })), "labels")
            .await?;
        Ok(())
    }
}

/// Map a non-success status to the contract's error kinds.
pub fn classify(status: StatusCode, rate_remaining: Option<&str>, body: &str, what: &str) -> RepoError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string());
    let rate_exhausted = rate_remaining == Some("0");

    match status {
        StatusCode::NOT_FOUND => RepoError::NotFound(what.to_string()),
        StatusCode::TOO_MANY_REQUESTS => RepoError::RateLimited(message),
        StatusCode::FORBIDDEN if rate_exhausted => RepoError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepoError::Unauthorized(message),
        other => RepoError::Api {
            status: other.as_u16(),
            message,
        },
    }
}

/// Decode the `content` field of a contents response.
pub fn decode_content(content: Option<&str>, encoding: Option<&str>) -> Result<Vec<u8>, RepoError> {
    match (content, encoding) {
        (Some(content), Some("base64")) => {
            let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| RepoError::Transport(format!("invalid base64 content: {e}")))
        }
        (None, _) | (Some(_), None) => Ok(Vec::new()),
        (Some(_), Some(other)) => Err(RepoError::Api {
            status: 200,
            message: format!("unsupported content encoding {other:?}"),
        }),
    }
}
