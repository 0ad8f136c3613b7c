//! Design-token manifest model and loading.
//!
//! A manifest is a JSON object of categories, each an object of tokens:
//!
//! ```json
//! { "color": { "primary": { "value": "#112233", "type": "color" } },
//!   "size":  { "gap":     { "value": "4",       "type": "size"  } } }
//! ```
//!
//! Loading is the validation step of the pipeline: anything that does not
//! have this shape is rejected with a [`ValidationError`] before any artifact
//! is generated.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::ValidationError;

/// Declared type of a token. Unknown values are kept verbatim and treated as
/// opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    Color,
    Size,
    Other,
    Unknown(String),
}

impl From<&str> for TokenType {
    fn from(s: &str) -> Self {
        match s {
            "color" => TokenType::Color,
            "size" => TokenType::Size,
            "other" => TokenType::Other,
            other => TokenType::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Color => f.write_str("color"),
            TokenType::Size => f.write_str("size"),
            TokenType::Other => f.write_str("other"),
            TokenType::Unknown(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub kind: TokenType,
    pub description: String,
}

/// Tokens grouped by category, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenManifest {
    categories: IndexMap<String, IndexMap<String, Token>>,
}

impl TokenManifest {
    /// Parse manifest JSON. `origin` is only used for error reporting.
    pub fn parse(bytes: &[u8], origin: &Path) -> Result<Self, ValidationError> {
        let raw: IndexMap<String, IndexMap<String, RawToken>> = serde_json::from_slice(bytes)
            .map_err(|e| ValidationError::malformed(origin, e.to_string()))?;

        let categories = raw
            .into_iter()
            .map(|(category, tokens)| {
                let tokens = tokens
                    .into_iter()
                    .map(|(name, raw)| (name, raw.into_token()))
                    .collect();
                (category, tokens)
            })
            .collect();

        Ok(TokenManifest { categories })
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &IndexMap<String, Token>)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, category: &str, token: &str) -> Option<&Token> {
        self.categories.get(category)?.get(token)
    }

    pub fn token_count(&self) -> usize {
        self.categories.values().map(IndexMap::len).sum()
    }
}

#[derive(Deserialize)]
struct RawToken {
    value: RawValue,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(serde_json::Number),
}

impl RawToken {
    fn into_token(self) -> Token {
        let value = match self.value {
            RawValue::Text(s) => s,
            RawValue::Number(n) => n.to_string(),
        };
        Token {
            value,
            kind: self.kind.as_deref().map(TokenType::from).unwrap_or(TokenType::Other),
            description: self.description.unwrap_or_default(),
        }
    }
}

/// A manifest as read from disk: the parsed tokens plus the exact bytes, which
/// are committed alongside the generated artifacts.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub manifest: TokenManifest,
}

impl ManifestFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        info!(manifest_path = %path.display(), "[VALIDATE] Loading token manifest");

        let bytes = std::fs::read(path).map_err(|e| {
            error!(error = ?e, manifest_path = %path.display(), "[VALIDATE][ERROR] Failed to read manifest");
            ValidationError::unreadable(path, &e)
        })?;

        let manifest = TokenManifest::parse(&bytes, path).map_err(|e| {
            error!(error = %e, "[VALIDATE][ERROR] Manifest rejected");
            e
        })?;

        debug!(
            categories = manifest.categories.len(),
            tokens = manifest.token_count(),
            "[VALIDATE] Manifest parsed"
        );

        Ok(ManifestFile {
            path: path.to_path_buf(),
            bytes,
            manifest,
        })
    }

    /// Final path component, used for the repository path and commit messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tokens.json".to_string())
    }
}
