//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::{Condition, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

/// Compact article listing embedded in author responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i32,
    pub title: String,
}

/// Field changes for a partial author update. An outer `None` leaves the
/// column untouched; for nullable columns the inner `None` clears it.
#[derive(Debug, Default, Clone)]
pub struct AuthorChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub institute: Option<Option<String>>,
    pub job: Option<Option<String>>,
}

/// Field changes for a partial reference update, same unset-vs-null
/// semantics as [`AuthorChanges`].
#[derive(Debug, Default, Clone)]
pub struct ReferenceChanges {
    pub citation_content: Option<Option<String>>,
    pub if_key_reference: Option<bool>,
    pub if_secondary_reference: Option<bool>,
    pub ai_rated_score: Option<Option<i32>>,
    pub feedback: Option<Option<String>>,
    pub author_comment: Option<Option<String>>,
}

/// Column values for a new reference row. Score and feedback always start
/// unset; the score is only filled in by the scoring callout afterwards.
#[derive(Debug, Clone)]
pub struct NewReference {
    pub cited_from_id: i32,
    pub cited_to_id: i32,
    pub content: String,
    pub citation_content: Option<String>,
    pub if_key_reference: bool,
    pub if_secondary_reference: bool,
    pub author_comment: Option<String>,
}

/// Join a display list the way the denormalized columns store it
pub fn join_display_list(items: &[String]) -> String {
    items.join(", ")
}

/// Split a denormalized display column back into its items
pub fn split_display_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Escape LIKE wildcards in user-supplied search input
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-insensitive substring match on a column
fn contains_ci(col: ArticleColumn, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col)))
        .like(format!("%{}%", escape_like(&needle.to_lowercase())))
}

/// Build the article search condition: filters are AND-combined across
/// fields, OR-combined across keywords. No filters yields an empty
/// condition matching the full set.
pub fn search_condition(
    title: Option<&str>,
    subject: Option<&str>,
    keywords: &[String],
) -> Condition {
    let mut cond = Condition::all();

    if let Some(title) = title {
        cond = cond.add(contains_ci(ArticleColumn::Title, title));
    }

    if let Some(subject) = subject {
        cond = cond.add(contains_ci(ArticleColumn::Subject, subject));
    }

    if !keywords.is_empty() {
        let mut any = Condition::any();
        for kw in keywords {
            any = any.add(contains_ci(ArticleColumn::Keywords, kw));
        }
        cond = cond.add(any);
    }

    cond
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Author Operations
    // ========================================================================

    /// Create a new author with an already-hashed password
    pub async fn create_author(
        &self,
        name: String,
        email: String,
        institute: Option<String>,
        job: Option<String>,
        password_hash: String,
    ) -> Result<Author> {
        let author = AuthorActiveModel {
            name: Set(name),
            email: Set(email),
            institute: Set(institute),
            job: Set(job),
            password_hash: Set(password_hash),
            ..Default::default()
        };

        author.insert(self.conn()).await.map_err(Into::into)
    }

    /// List all authors
    pub async fn list_authors(&self) -> Result<Vec<Author>> {
        AuthorEntity::find()
            .order_by_asc(AuthorColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find author by ID
    pub async fn find_author_by_id(&self, id: i32) -> Result<Option<Author>> {
        AuthorEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find author by email
    pub async fn find_author_by_email(&self, email: &str) -> Result<Option<Author>> {
        AuthorEntity::find()
            .filter(AuthorColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a partial update to an author
    pub async fn update_author(&self, id: i32, changes: AuthorChanges) -> Result<Author> {
        let mut author: AuthorActiveModel = AuthorEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::AuthorNotFound { id: id.to_string() })?
            .into();

        if let Some(name) = changes.name {
            author.name = Set(name);
        }
        if let Some(email) = changes.email {
            author.email = Set(email);
        }
        if let Some(hash) = changes.password_hash {
            author.password_hash = Set(hash);
        }
        if let Some(institute) = changes.institute {
            author.institute = Set(institute);
        }
        if let Some(job) = changes.job {
            author.job = Set(job);
        }

        author.update(self.conn()).await.map_err(Into::into)
    }

    /// Delete author by ID. Link rows go with it (ON DELETE CASCADE);
    /// articles survive.
    pub async fn delete_author(&self, id: i32) -> Result<bool> {
        let result = AuthorEntity::delete_by_id(id).exec(self.conn()).await?;

        Ok(result.rows_affected > 0)
    }

    /// Count articles where the given author is the corresponding author
    pub async fn count_corresponding_articles(&self, author_id: i32) -> Result<u64> {
        ArticleEntity::find()
            .filter(ArticleColumn::CorrespondingAuthorId.eq(author_id))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Get {id, title} summaries for every article linked to an author
    pub async fn article_summaries_for_author(
        &self,
        author_id: i32,
    ) -> Result<Vec<ArticleSummary>> {
        let articles = self.list_articles_by_author(author_id).await?;

        Ok(articles
            .into_iter()
            .map(|a| ArticleSummary {
                id: a.id,
                title: a.title,
            })
            .collect())
    }

    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Create an article together with its author link rows in one commit.
    ///
    /// `linked_authors` holds (author_id, author_order) pairs for the
    /// co-authors known to the system; name-only externals have no row.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_article(
        &self,
        title: String,
        content: String,
        published_journal: String,
        published_date: chrono::NaiveDate,
        author_names: String,
        subject: Option<String>,
        keywords: Option<String>,
        corresponding_author_id: i32,
        linked_authors: Vec<(i32, i32)>,
    ) -> Result<Article> {
        let txn = self.conn().begin().await?;

        let article = ArticleActiveModel {
            title: Set(title),
            content: Set(content),
            published_journal: Set(published_journal),
            published_date: Set(published_date),
            author_names: Set(author_names),
            subject: Set(subject),
            keywords: Set(keywords),
            corresponding_author_id: Set(corresponding_author_id),
            ..Default::default()
        };

        let article = article.insert(&txn).await?;

        for (author_id, author_order) in linked_authors {
            let link = AuthorArticleActiveModel {
                author_id: Set(author_id),
                article_id: Set(article.id),
                author_order: Set(Some(author_order)),
            };
            link.insert(&txn).await?;
        }

        txn.commit().await?;

        Ok(article)
    }

    /// Find article by ID
    pub async fn find_article_by_id(&self, id: i32) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Delete article by ID; references and link rows cascade
    pub async fn delete_article(&self, id: i32) -> Result<bool> {
        let result = ArticleEntity::delete_by_id(id).exec(self.conn()).await?;

        Ok(result.rows_affected > 0)
    }

    /// Every article reachable via an author's link rows
    pub async fn list_articles_by_author(&self, author_id: i32) -> Result<Vec<Article>> {
        let links = AuthorArticleEntity::find()
            .filter(AuthorArticleColumn::AuthorId.eq(author_id))
            .all(self.conn())
            .await?;

        let article_ids: Vec<i32> = links.iter().map(|l| l.article_id).collect();
        if article_ids.is_empty() {
            return Ok(Vec::new());
        }

        ArticleEntity::find()
            .filter(ArticleColumn::Id.is_in(article_ids))
            .order_by_asc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Link rows for an article in display order
    pub async fn links_for_article(&self, article_id: i32) -> Result<Vec<AuthorArticle>> {
        AuthorArticleEntity::find()
            .filter(AuthorArticleColumn::ArticleId.eq(article_id))
            .order_by_asc(AuthorArticleColumn::AuthorOrder)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Case-insensitive article search; see [`search_condition`]
    pub async fn search_articles(
        &self,
        title: Option<&str>,
        subject: Option<&str>,
        keywords: &[String],
    ) -> Result<Vec<Article>> {
        ArticleEntity::find()
            .filter(search_condition(title, subject, keywords))
            .order_by_asc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// IDs of articles whose subject contains the filter substring
    pub async fn article_ids_by_subject(&self, subject: Option<&str>) -> Result<Vec<i32>> {
        let mut query = ArticleEntity::find().select_only().column(ArticleColumn::Id);

        if let Some(subject) = subject {
            query = query.filter(contains_ci(ArticleColumn::Subject, subject));
        }

        query
            .into_tuple::<i32>()
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Reference Operations
    // ========================================================================

    /// Persist a citation edge. Both endpoints must already be validated.
    pub async fn create_reference(&self, new: NewReference) -> Result<Reference> {
        let reference = ReferenceActiveModel {
            cited_from_id: Set(new.cited_from_id),
            cited_to_id: Set(new.cited_to_id),
            content: Set(new.content),
            citation_content: Set(new.citation_content),
            if_key_reference: Set(new.if_key_reference),
            if_secondary_reference: Set(new.if_secondary_reference),
            ai_rated_score: Set(None),
            feedback: Set(None),
            author_comment: Set(new.author_comment),
            ..Default::default()
        };

        reference.insert(self.conn()).await.map_err(Into::into)
    }

    /// Find reference by ID
    pub async fn find_reference_by_id(&self, id: i32) -> Result<Option<Reference>> {
        ReferenceEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All references made from an article (outgoing edges)
    pub async fn list_references_from(&self, article_id: i32) -> Result<Vec<Reference>> {
        ReferenceEntity::find()
            .filter(ReferenceColumn::CitedFromId.eq(article_id))
            .order_by_asc(ReferenceColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All references pointing to an article (incoming edges)
    pub async fn list_references_to(&self, article_id: i32) -> Result<Vec<Reference>> {
        ReferenceEntity::find()
            .filter(ReferenceColumn::CitedToId.eq(article_id))
            .order_by_asc(ReferenceColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a partial update to a reference
    pub async fn update_reference(&self, id: i32, changes: ReferenceChanges) -> Result<Reference> {
        let mut reference: ReferenceActiveModel = ReferenceEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::ReferenceNotFound { id: id.to_string() })?
            .into();

        if let Some(citation_content) = changes.citation_content {
            reference.citation_content = Set(citation_content);
        }
        if let Some(key) = changes.if_key_reference {
            reference.if_key_reference = Set(key);
        }
        if let Some(secondary) = changes.if_secondary_reference {
            reference.if_secondary_reference = Set(secondary);
        }
        if let Some(score) = changes.ai_rated_score {
            reference.ai_rated_score = Set(score);
        }
        if let Some(feedback) = changes.feedback {
            reference.feedback = Set(feedback);
        }
        if let Some(comment) = changes.author_comment {
            reference.author_comment = Set(comment);
        }

        reference.update(self.conn()).await.map_err(Into::into)
    }

    /// Best-effort score write-back after the scoring callout
    pub async fn set_reference_score(&self, id: i32, score: i32) -> Result<Reference> {
        let mut reference: ReferenceActiveModel = ReferenceEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::ReferenceNotFound { id: id.to_string() })?
            .into();

        reference.ai_rated_score = Set(Some(score));

        reference.update(self.conn()).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn search_sql(title: Option<&str>, subject: Option<&str>, keywords: &[String]) -> String {
        ArticleEntity::find()
            .filter(search_condition(title, subject, keywords))
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_display_list_roundtrip() {
        let names = vec!["Alice Zhang".to_string(), "Bob Smith".to_string()];
        let joined = join_display_list(&names);
        assert_eq!(joined, "Alice Zhang, Bob Smith");
        assert_eq!(split_display_list(&joined), names);
    }

    #[test]
    fn test_split_display_list_tolerates_spacing() {
        assert_eq!(
            split_display_list("graphs ,  quantum,ml"),
            vec!["graphs", "quantum", "ml"]
        );
        assert!(split_display_list("").is_empty());
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_search_condition_empty_matches_all() {
        let sql = search_sql(None, None, &[]);
        assert!(!sql.contains("WHERE"), "unexpected filter in: {}", sql);
    }

    #[test]
    fn test_search_condition_fields_are_anded() {
        let sql = search_sql(Some("Quantum"), Some("Physics"), &[]);
        assert!(sql.contains("LOWER"));
        // needles are lowercased for the case-insensitive match
        assert!(sql.contains("%quantum%"));
        assert!(sql.contains("%physics%"));
        assert!(sql.contains(" AND "));
    }

    #[test]
    fn test_search_condition_keywords_are_ored() {
        let keywords = vec!["qubit".to_string(), "error correction".to_string()];
        let sql = search_sql(None, None, &keywords);
        assert!(sql.contains("%qubit%"));
        assert!(sql.contains("%error correction%"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_search_condition_mixed() {
        let keywords = vec!["ml".to_string()];
        let sql = search_sql(Some("opt"), None, &keywords);
        // title filter AND keyword filter, no subject clause
        assert!(sql.contains("%opt%"));
        assert!(sql.contains("%ml%"));
        assert!(!sql.contains("subject"));
    }
}
