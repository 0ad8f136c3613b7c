//! Change detection: which generated files differ from the reference branch.
//!
//! Each candidate is fetched from the repository at the reference and
//! compared byte-for-byte with its fresh content. A path that does not exist
//! at the reference is new and therefore changed. Any other fetch failure
//! aborts detection: treating it as "unchanged" would silently drop real
//! changes.

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::contract::RepositoryClient;
use crate::error::DetectionError;

/// A repository path and the content it should have after publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Modified,
    Unchanged,
}

/// Returns the changed candidate paths, in candidate order.
///
/// Fetches run concurrently; they share nothing but the client.
pub async fn diff<C>(
    client: &C,
    candidates: &[Candidate],
    reference: &str,
) -> Result<Vec<String>, DetectionError>
where
    C: RepositoryClient + ?Sized,
{
    info!(
        candidates = candidates.len(),
        reference, "[DETECT] Comparing generated files against reference"
    );

    let fetches = candidates
        .iter()
        .map(|candidate| async move { (candidate, client.get_content(&candidate.path, reference).await) });
    let results = join_all(fetches).await;

    let mut changed = Vec::new();
    for (candidate, fetched) in results {
        let status = match fetched {
            Ok(current) if current == candidate.content => FileStatus::Unchanged,
            Ok(_) => FileStatus::Modified,
            Err(e) if e.is_not_found() => FileStatus::New,
            Err(e) => {
                error!(path = %candidate.path, reference, error = %e, "[DETECT][ERROR] Fetch failed");
                return Err(DetectionError {
                    path: candidate.path.clone(),
                    reference: reference.to_string(),
                    source: e,
                });
            }
        };
        debug!(path = %candidate.path, ?status, "[DETECT] Classified file");
        if status != FileStatus::Unchanged {
            changed.push(candidate.path.clone());
        }
    }

    info!(changed = changed.len(), "[DETECT] Change detection finished");
    Ok(changed)
}
