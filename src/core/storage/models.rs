use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Classification schemes mirrored from the remote source. Remote taxonomies
/// outside this set are dropped during term resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }

    pub fn from_taxonomy(raw: &str) -> Option<Self> {
        match raw.trim() {
            "category" => Some(Self::Category),
            "post_tag" | "tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// Outcome of a term lookup. `Created` means this call inserted the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermLookup {
    Found(i64),
    Created(i64),
}

impl TermLookup {
    pub fn term_id(self) -> i64 {
        match self {
            Self::Found(id) | Self::Created(id) => id,
        }
    }
}

/// Outcome of a guid-keyed post insert. `Existing` means the guid was
/// already stored by another writer and no row was inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostInsert {
    Inserted(i64),
    Existing(i64),
}

impl PostInsert {
    pub fn post_id(self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Existing(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub status: String,
    pub author_id: i64,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub status: String,
    pub author_id: i64,
    pub published_at: String,
    pub thumbnail_id: Option<i64>,
    pub remote_guid: Option<String>,
    pub imported: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TermRecord {
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttachmentRecord {
    pub id: i64,
    pub post_id: i64,
    pub source_url: String,
    pub file_path: String,
}
