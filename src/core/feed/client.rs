use serde::Deserialize;

use crate::core::feed::types::RemotePost;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
    #[error("feed decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct MediaFields {
    #[serde(default)]
    source_url: Option<String>,
}

/// Fetches the remote published listing with related resources embedded, so
/// taxonomy terms and featured media travel with each post.
pub async fn fetch_published(
    client: &reqwest::Client,
    endpoint: &str,
) -> Result<Vec<RemotePost>, FetchError> {
    let url = with_query_param(endpoint, "_embed");
    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }
    let body = response.bytes().await?;
    let posts = serde_json::from_slice::<Vec<RemotePost>>(&body)?;
    Ok(posts)
}

/// Narrowed follow-up fetch for a linked media resource. Any failure (network,
/// status, decode, blank field) yields `None`; the caller treats that as
/// "no image", never as a fatal error.
pub async fn fetch_media_source_url(client: &reqwest::Client, href: &str) -> Option<String> {
    let url = with_query_param(href, "_fields=source_url");
    let response = client.get(&url).send().await.ok()?;
    if response.status().as_u16() != 200 {
        return None;
    }
    let fields = response.json::<MediaFields>().await.ok()?;
    fields
        .source_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn with_query_param(url: &str, param: &str) -> String {
    if url.contains('?') {
        format!("{url}&{param}")
    } else {
        format!("{url}?{param}")
    }
}
