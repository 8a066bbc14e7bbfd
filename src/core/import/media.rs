use std::path::Path;

use crate::core::feed::client::fetch_media_source_url;
use crate::core::feed::types::RemotePost;
use crate::core::storage::repository::{ContentRepository, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("image download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("unexpected image status code: {0}")]
    HttpStatus(u16),
    #[error("image write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("attachment storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Picks the best-available featured-image URL: the embedded source URL when
/// present, otherwise a narrowed follow-up fetch through the media link.
pub async fn resolve_image_url(client: &reqwest::Client, post: &RemotePost) -> Option<String> {
    if let Some(url) = post.embedded_media_url() {
        return Some(url);
    }
    let href = post.media_link_href()?;
    fetch_media_source_url(client, &href).await
}

/// Downloads the image, stores it under the media directory and associates it
/// as the post's thumbnail, replacing any prior association.
pub async fn download_and_attach(
    client: &reqwest::Client,
    repository: &ContentRepository,
    media_dir: &Path,
    post_id: i64,
    image_url: &str,
) -> Result<i64, MediaError> {
    let response = client.get(image_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::HttpStatus(status.as_u16()));
    }
    let bytes = response.bytes().await?;

    std::fs::create_dir_all(media_dir)?;
    let file_name = file_name_from_url(image_url);
    let file_path = media_dir.join(format!("{post_id}-{file_name}"));
    std::fs::write(&file_path, &bytes)?;

    let attachment_id = repository
        .insert_attachment(post_id, image_url, &file_path.to_string_lossy())
        .await?;
    repository.set_post_thumbnail(post_id, attachment_id).await?;
    Ok(attachment_id)
}

fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let candidate = without_query.rsplit('/').next().unwrap_or("").trim();
    if candidate.is_empty() {
        "attachment".to_string()
    } else {
        candidate.to_string()
    }
}
