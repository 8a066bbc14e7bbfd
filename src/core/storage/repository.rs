use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use super::models::{
    AttachmentRecord, NewPost, PostInsert, PostRecord, TermKind, TermLookup, TermRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

const POST_COLUMNS: &str = "id, title, content, excerpt, slug, status, author_id, published_at, thumbnail_id, remote_guid, imported, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ContentRepository {
    pool: SqlitePool,
}

impl ContentRepository {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn find_post_by_remote_guid(&self, guid: &str) -> Result<Option<i64>, StorageError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM posts WHERE remote_guid = ?1 ORDER BY id LIMIT 1",
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn find_post_by_title(&self, title: &str) -> Result<Option<i64>, StorageError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM posts WHERE title = ?1 ORDER BY id LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn insert_post(&self, post: &NewPost) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, content, excerpt, slug, status, author_id, published_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, CURRENT_TIMESTAMP))
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.slug)
        .bind(&post.status)
        .bind(post.author_id)
        .bind(&post.published_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Atomic insert for posts carrying a non-empty remote guid. The guid and
    /// import flag land in the same statement as the row, and a concurrent
    /// writer holding the guid turns the insert into `Existing` instead of a
    /// duplicate.
    pub async fn insert_post_with_guid(
        &self,
        post: &NewPost,
        remote_guid: &str,
    ) -> Result<PostInsert, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, content, excerpt, slug, status, author_id, published_at, remote_guid, imported)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, CURRENT_TIMESTAMP), ?8, 1)
            ON CONFLICT(remote_guid) WHERE remote_guid IS NOT NULL AND remote_guid != '' DO NOTHING
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.slug)
        .bind(&post.status)
        .bind(post.author_id)
        .bind(&post.published_at)
        .bind(remote_guid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Lost an insert race; the existing row wins.
            let id = self
                .find_post_by_remote_guid(remote_guid)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            return Ok(PostInsert::Existing(id));
        }

        Ok(PostInsert::Inserted(result.last_insert_rowid()))
    }

    pub async fn get_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, StorageError> {
        let row = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_posts(&self) -> Result<Vec<PostRecord>, StorageError> {
        let rows = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stamps a post as machine-imported, refreshing the provenance guid when
    /// one is available. A `None` guid leaves any previously stored value.
    pub async fn mark_imported(
        &self,
        post_id: i64,
        remote_guid: Option<&str>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE posts
            SET remote_guid = COALESCE(?1, remote_guid),
                imported = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?2
            "#,
        )
        .bind(remote_guid)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_or_create_term(
        &self,
        kind: TermKind,
        name: &str,
        slug: &str,
    ) -> Result<TermLookup, StorageError> {
        if let Some(id) = self.find_term_id(kind, slug).await? {
            return Ok(TermLookup::Found(id));
        }

        let result = sqlx::query(
            "INSERT INTO terms (kind, name, slug) VALUES (?1, ?2, ?3) ON CONFLICT(kind, slug) DO NOTHING",
        )
        .bind(kind.as_str())
        .bind(name)
        .bind(slug)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Lost a create race; the existing row wins.
            let id = self
                .find_term_id(kind, slug)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            return Ok(TermLookup::Found(id));
        }

        Ok(TermLookup::Created(result.last_insert_rowid()))
    }

    async fn find_term_id(&self, kind: TermKind, slug: &str) -> Result<Option<i64>, StorageError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM terms WHERE kind = ?1 AND slug = ?2 LIMIT 1",
        )
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get_term_by_id(&self, term_id: i64) -> Result<Option<TermRecord>, StorageError> {
        let row = sqlx::query_as::<_, TermRecord>(
            "SELECT id, kind, name, slug FROM terms WHERE id = ?1",
        )
        .bind(term_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Replaces the post's associations for one kind with exactly `term_ids`.
    pub async fn set_post_terms(
        &self,
        post_id: i64,
        kind: TermKind,
        term_ids: &[i64],
    ) -> Result<(), StorageError> {
        sqlx::query(
            "DELETE FROM post_terms WHERE post_id = ?1 AND term_id IN (SELECT id FROM terms WHERE kind = ?2)",
        )
        .bind(post_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        for term_id in term_ids {
            sqlx::query("INSERT OR IGNORE INTO post_terms (post_id, term_id) VALUES (?1, ?2)")
                .bind(post_id)
                .bind(term_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn terms_for_post(
        &self,
        post_id: i64,
        kind: TermKind,
    ) -> Result<Vec<TermRecord>, StorageError> {
        let rows = sqlx::query_as::<_, TermRecord>(
            r#"
            SELECT t.id, t.kind, t.name, t.slug
            FROM terms t
            JOIN post_terms pt ON pt.term_id = t.id
            WHERE pt.post_id = ?1 AND t.kind = ?2
            ORDER BY t.id
            "#,
        )
        .bind(post_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_attachment(
        &self,
        post_id: i64,
        source_url: &str,
        file_path: &str,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO attachments (post_id, source_url, file_path) VALUES (?1, ?2, ?3)",
        )
        .bind(post_id)
        .bind(source_url)
        .bind(file_path)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn attachments_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<AttachmentRecord>, StorageError> {
        let rows = sqlx::query_as::<_, AttachmentRecord>(
            "SELECT id, post_id, source_url, file_path FROM attachments WHERE post_id = ?1 ORDER BY id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn set_post_thumbnail(
        &self,
        post_id: i64,
        attachment_id: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE posts SET thumbnail_id = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
        )
        .bind(attachment_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_admin_user_id(&self) -> Result<Option<i64>, StorageError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM users WHERE role = 'administrator' ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    fn make_post(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "<p>body</p>".to_string(),
            excerpt: "summary".to_string(),
            slug: "a-post".to_string(),
            status: "draft".to_string(),
            author_id: 1,
            published_at: None,
        }
    }

    async fn connect_memory() -> ContentRepository {
        ContentRepository::connect("sqlite::memory:")
            .await
            .expect("connect must succeed")
    }

    #[tokio::test]
    async fn migration_creates_required_tables() {
        let repository = connect_memory().await;
        let rows = sqlx::query(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table'
              AND name IN ('posts', 'terms', 'post_terms', 'attachments', 'users')
            ORDER BY name
            "#,
        )
        .fetch_all(&repository.pool)
        .await
        .expect("query must succeed");

        let table_names: Vec<String> = rows
            .into_iter()
            .map(|row| row.get::<String, _>("name"))
            .collect();
        assert_eq!(
            table_names,
            vec![
                "attachments".to_string(),
                "post_terms".to_string(),
                "posts".to_string(),
                "terms".to_string(),
                "users".to_string()
            ]
        );

        let indexes = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_posts_remote_guid_unique'",
        )
        .fetch_all(&repository.pool)
        .await
        .expect("index query must succeed");
        assert_eq!(indexes.len(), 1);
    }

    #[tokio::test]
    async fn migration_seeds_an_administrator() {
        let repository = connect_memory().await;
        let admin = repository
            .find_admin_user_id()
            .await
            .expect("lookup should succeed");
        assert_eq!(admin, Some(1));
    }

    #[tokio::test]
    async fn insert_post_applies_store_default_date_when_unset() {
        let repository = connect_memory().await;
        let post_id = repository
            .insert_post(&make_post("Defaults"))
            .await
            .expect("insert should succeed");
        let stored = repository
            .get_post_by_id(post_id)
            .await
            .expect("get should succeed")
            .expect("post should exist");

        assert!(!stored.published_at.is_empty());
        assert_eq!(stored.imported, 0);
        assert!(stored.remote_guid.is_none());
    }

    #[tokio::test]
    async fn mark_imported_sets_flag_and_preserves_guid_when_absent() {
        let repository = connect_memory().await;
        let post_id = repository
            .insert_post(&make_post("Provenance"))
            .await
            .expect("insert should succeed");

        repository
            .mark_imported(post_id, Some("abc-123"))
            .await
            .expect("first mark should succeed");
        repository
            .mark_imported(post_id, None)
            .await
            .expect("second mark should succeed");

        let stored = repository
            .get_post_by_id(post_id)
            .await
            .expect("get should succeed")
            .expect("post should exist");
        assert_eq!(stored.remote_guid.as_deref(), Some("abc-123"));
        assert_eq!(stored.imported, 1);
    }

    #[tokio::test]
    async fn guid_keyed_insert_converges_on_the_existing_row() {
        let repository = connect_memory().await;
        let first = repository
            .insert_post_with_guid(&make_post("First Writer"), "abc-123")
            .await
            .expect("first insert should succeed");
        let second = repository
            .insert_post_with_guid(&make_post("Second Writer"), "abc-123")
            .await
            .expect("second insert should succeed");

        assert!(matches!(first, PostInsert::Inserted(_)));
        assert_eq!(second, PostInsert::Existing(first.post_id()));

        let posts = repository.list_posts().await.expect("list should succeed");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "First Writer");
        assert_eq!(posts[0].remote_guid.as_deref(), Some("abc-123"));
        assert_eq!(posts[0].imported, 1);
    }

    #[tokio::test]
    async fn guidless_posts_are_not_constrained_by_the_unique_index() {
        let repository = connect_memory().await;
        repository
            .insert_post(&make_post("No Guid One"))
            .await
            .expect("first insert should succeed");
        repository
            .insert_post(&make_post("No Guid Two"))
            .await
            .expect("second insert should succeed");

        let posts = repository.list_posts().await.expect("list should succeed");
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn find_post_by_remote_guid_uses_exact_match() {
        let repository = connect_memory().await;
        let post_id = repository
            .insert_post(&make_post("Guided"))
            .await
            .expect("insert should succeed");
        repository
            .mark_imported(post_id, Some("abc-123"))
            .await
            .expect("mark should succeed");

        let found = repository
            .find_post_by_remote_guid("abc-123")
            .await
            .expect("lookup should succeed");
        let missing = repository
            .find_post_by_remote_guid("abc-999")
            .await
            .expect("lookup should succeed");

        assert_eq!(found, Some(post_id));
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn get_or_create_term_converges_on_the_same_row() {
        let repository = connect_memory().await;
        let first = repository
            .get_or_create_term(TermKind::Category, "News", "news")
            .await
            .expect("first resolve should succeed");
        let second = repository
            .get_or_create_term(TermKind::Category, "Headlines", "news")
            .await
            .expect("second resolve should succeed");

        assert!(matches!(first, TermLookup::Created(_)));
        assert_eq!(second, TermLookup::Found(first.term_id()));

        let stored = repository
            .get_term_by_id(first.term_id())
            .await
            .expect("get should succeed")
            .expect("term should exist");
        assert_eq!(stored.name, "News");
    }

    #[tokio::test]
    async fn same_slug_under_different_kinds_creates_distinct_terms() {
        let repository = connect_memory().await;
        let category = repository
            .get_or_create_term(TermKind::Category, "News", "news")
            .await
            .expect("category resolve should succeed");
        let tag = repository
            .get_or_create_term(TermKind::Tag, "News", "news")
            .await
            .expect("tag resolve should succeed");

        assert_ne!(category.term_id(), tag.term_id());
    }

    #[tokio::test]
    async fn set_post_terms_replaces_only_the_given_kind() {
        let repository = connect_memory().await;
        let post_id = repository
            .insert_post(&make_post("Tagged"))
            .await
            .expect("insert should succeed");
        let news = repository
            .get_or_create_term(TermKind::Category, "News", "news")
            .await
            .expect("term should resolve")
            .term_id();
        let sports = repository
            .get_or_create_term(TermKind::Category, "Sports", "sports")
            .await
            .expect("term should resolve")
            .term_id();
        let rust = repository
            .get_or_create_term(TermKind::Tag, "Rust", "rust")
            .await
            .expect("term should resolve")
            .term_id();

        repository
            .set_post_terms(post_id, TermKind::Category, &[news, sports])
            .await
            .expect("first set should succeed");
        repository
            .set_post_terms(post_id, TermKind::Tag, &[rust])
            .await
            .expect("tag set should succeed");
        repository
            .set_post_terms(post_id, TermKind::Category, &[sports])
            .await
            .expect("replace should succeed");

        let categories = repository
            .terms_for_post(post_id, TermKind::Category)
            .await
            .expect("terms should load");
        let tags = repository
            .terms_for_post(post_id, TermKind::Tag)
            .await
            .expect("terms should load");

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, sports);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, rust);
    }

    #[tokio::test]
    async fn thumbnail_association_is_replaced_on_repeat() {
        let repository = connect_memory().await;
        let post_id = repository
            .insert_post(&make_post("Pictured"))
            .await
            .expect("insert should succeed");
        let first = repository
            .insert_attachment(post_id, "https://cdn.example.com/a.jpg", "media/1-a.jpg")
            .await
            .expect("attachment should insert");
        let second = repository
            .insert_attachment(post_id, "https://cdn.example.com/b.jpg", "media/1-b.jpg")
            .await
            .expect("attachment should insert");

        repository
            .set_post_thumbnail(post_id, first)
            .await
            .expect("first thumbnail should set");
        repository
            .set_post_thumbnail(post_id, second)
            .await
            .expect("second thumbnail should set");

        let stored = repository
            .get_post_by_id(post_id)
            .await
            .expect("get should succeed")
            .expect("post should exist");
        assert_eq!(stored.thumbnail_id, Some(second));

        let attachments = repository
            .attachments_for_post(post_id)
            .await
            .expect("attachments should load");
        assert_eq!(attachments.len(), 2);
    }
}
