use crate::core::storage::repository::{ContentRepository, StorageError};

/// Decides whether a remote item already exists locally. A non-empty guid is
/// authoritative; the title path is a best-effort heuristic consulted only
/// when the remote source supplied no stable identifier, and a positive match
/// there means "treat as existing", not certainty.
pub async fn find_existing_post(
    repository: &ContentRepository,
    guid: &str,
    title: &str,
) -> Result<Option<i64>, StorageError> {
    if !guid.is_empty() {
        return repository.find_post_by_remote_guid(guid).await;
    }
    if title.is_empty() {
        return Ok(None);
    }
    repository.find_post_by_title(title).await
}
