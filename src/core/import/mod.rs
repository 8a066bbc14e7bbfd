pub mod audit;
pub mod dedup;
pub mod media;
pub mod terms;

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::core::config::ImportConfig;
use crate::core::feed::client::{fetch_published, FetchError};
use crate::core::feed::types::RemotePost;
use crate::core::import::dedup::find_existing_post;
use crate::core::import::media::{download_and_attach, resolve_image_url};
use crate::core::import::terms::{resolve_terms, slugify, ResolvedTerms};
use crate::core::storage::models::{NewPost, PostInsert, TermKind};
use crate::core::storage::repository::{ContentRepository, StorageError};

/// Imported content is always attributed to an administrator; this is the
/// first system account, used when no administrator can be resolved.
pub const DEFAULT_AUTHOR_ID: i64 = 1;

const ALLOWED_STATUSES: [&str; 4] = ["publish", "draft", "pending", "future"];
const PLACEHOLDER_TITLE: &str = "Untitled";
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum ImportRunError {
    #[error("remote endpoint is not configured")]
    MissingEndpoint,
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Created(i64),
    Updated(i64),
}

/// Per-item import decision record, consumed by the audit logger.
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub outcome: ItemOutcome,
    pub title: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub warnings: Vec<String>,
}

/// Runs one full import cycle: fetch the remote listing, then scan it
/// sequentially. A failing item is skipped and logged; only a missing
/// endpoint or a feed-level fetch failure aborts the run.
pub async fn run_import(
    client: &reqwest::Client,
    repository: &ContentRepository,
    config: &ImportConfig,
) -> Result<ImportSummary, ImportRunError> {
    let endpoint = config.remote_endpoint.trim();
    if endpoint.is_empty() {
        return Err(ImportRunError::MissingEndpoint);
    }

    let posts = fetch_published(client, endpoint).await?;
    tracing::info!("fetched {} remote posts from {endpoint}", posts.len());

    let author_id = resolve_author(repository).await;
    let mut summary = ImportSummary::default();
    for post in &posts {
        match import_post(client, repository, config, post, author_id).await {
            Ok(report) => {
                audit::record_item(&report);
                match report.outcome {
                    ItemOutcome::Created(_) => summary.created += 1,
                    ItemOutcome::Updated(_) => summary.updated += 1,
                }
            }
            Err(error) => {
                tracing::warn!("skipping remote post '{}': {error}", post.guid_value());
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

async fn import_post(
    client: &reqwest::Client,
    repository: &ContentRepository,
    config: &ImportConfig,
    post: &RemotePost,
    author_id: i64,
) -> Result<ItemReport, StorageError> {
    let guid = post.guid_value();
    let title = post.plain_title();

    // Terms are refreshed on every run so remote re-categorization propagates
    // to items that were imported earlier.
    let resolved = resolve_terms(repository, &post.remote_terms()).await;

    if let Some(post_id) = find_existing_post(repository, &guid, &title).await? {
        return refresh_existing_post(repository, post_id, &guid, title, resolved).await;
    }

    let new_post = build_new_post(post, &title, author_id);
    let post_id = match non_empty(&guid) {
        Some(guid_value) => {
            match repository.insert_post_with_guid(&new_post, guid_value).await? {
                PostInsert::Inserted(id) => id,
                // A concurrent run stored this guid between the lookup and
                // the insert; converge on its row instead of duplicating it.
                PostInsert::Existing(id) => {
                    return refresh_existing_post(repository, id, &guid, title, resolved).await;
                }
            }
        }
        None => {
            let id = repository.insert_post(&new_post).await?;
            repository.mark_imported(id, None).await?;
            id
        }
    };
    repository
        .set_post_terms(post_id, TermKind::Category, &resolved.category_ids)
        .await?;
    repository
        .set_post_terms(post_id, TermKind::Tag, &resolved.tag_ids)
        .await?;

    let mut images = Vec::new();
    let mut warnings = Vec::new();
    match resolve_image_url(client, post).await {
        Some(image_url) => {
            match download_and_attach(client, repository, &config.media_dir, post_id, &image_url)
                .await
            {
                Ok(_) => images.push(image_url),
                Err(error) => {
                    warnings.push(format!("featured image download failed for {image_url}: {error}"));
                }
            }
        }
        None => warnings.push("no featured image found".to_string()),
    }

    Ok(ItemReport {
        outcome: ItemOutcome::Created(post_id),
        title: new_post.title,
        categories: resolved.category_names,
        tags: resolved.tag_names,
        images,
        warnings,
    })
}

/// Update path for an already-stored item: the resolved term sets replace
/// the local associations, provenance is refreshed, and body/title are left
/// untouched so local edits survive repeat imports.
async fn refresh_existing_post(
    repository: &ContentRepository,
    post_id: i64,
    guid: &str,
    title: String,
    resolved: ResolvedTerms,
) -> Result<ItemReport, StorageError> {
    repository
        .set_post_terms(post_id, TermKind::Category, &resolved.category_ids)
        .await?;
    repository
        .set_post_terms(post_id, TermKind::Tag, &resolved.tag_ids)
        .await?;
    repository.mark_imported(post_id, non_empty(guid)).await?;

    Ok(ItemReport {
        outcome: ItemOutcome::Updated(post_id),
        title,
        categories: resolved.category_names,
        tags: resolved.tag_names,
        images: Vec::new(),
        warnings: Vec::new(),
    })
}

fn build_new_post(post: &RemotePost, plain_title: &str, author_id: i64) -> NewPost {
    let title = if plain_title.is_empty() {
        PLACEHOLDER_TITLE.to_string()
    } else {
        plain_title.to_string()
    };
    let remote_slug = post.slug_value();
    let slug = if remote_slug.is_empty() {
        slugify(&title)
    } else {
        remote_slug
    };

    NewPost {
        title,
        content: post.content_html(),
        excerpt: post.plain_excerpt(),
        slug,
        status: normalize_status(post.status_value()),
        author_id,
        published_at: published_timestamp(post),
    }
}

async fn resolve_author(repository: &ContentRepository) -> i64 {
    match repository.find_admin_user_id().await {
        Ok(Some(id)) => id,
        Ok(None) => DEFAULT_AUTHOR_ID,
        Err(error) => {
            tracing::warn!("author lookup failed: {error}");
            DEFAULT_AUTHOR_ID
        }
    }
}

// Unknown statuses must never surface remote content as published.
fn normalize_status(raw: Option<&str>) -> String {
    match raw {
        Some(value) if ALLOWED_STATUSES.contains(&value) => value.to_string(),
        _ => "draft".to_string(),
    }
}

/// Publication date, preferring the GMT field converted to the local-time
/// representation, then the site-local field as-is. `None` lets the store
/// apply its own default.
fn published_timestamp(post: &RemotePost) -> Option<String> {
    if let Some(formatted) = post.date_gmt.as_deref().and_then(gmt_to_local) {
        return Some(formatted);
    }
    post.date.as_deref().and_then(site_local)
}

fn gmt_to_local(value: &str) -> Option<String> {
    let naive = parse_remote_datetime(value)?;
    let local = Utc.from_utc_datetime(&naive).with_timezone(&Local);
    Some(local.format(LOCAL_DATETIME_FORMAT).to_string())
}

fn site_local(value: &str) -> Option<String> {
    parse_remote_datetime(value).map(|naive| naive.format(LOCAL_DATETIME_FORMAT).to_string())
}

fn parse_remote_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_utc());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").ok()
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
