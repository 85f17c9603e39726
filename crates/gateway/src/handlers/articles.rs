//! Article management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use citequill_common::{
    db::{
        join_display_list,
        models::{Article, AuthorArticle},
        split_display_list, Repository,
    },
    errors::{AppError, Result},
};

/// Request to create a new article.
///
/// `author_names` and `author_emails` are aligned lists; an entry with a
/// known email becomes a link row, anything else stays name-only in the
/// denormalized display string.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[validate(length(min = 1))]
    pub content: String,

    #[validate(length(min = 1, max = 500))]
    pub published_journal: String,

    /// Defaults to today when omitted
    pub published_date: Option<chrono::NaiveDate>,

    pub subject: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[validate(email)]
    pub corresponding_author_email: String,

    pub author_names: Vec<String>,

    pub author_emails: Vec<Option<String>>,
}

/// Article record with the denormalized author list expanded back into
/// aligned name/id vectors
#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub published_journal: String,
    pub published_date: chrono::NaiveDate,
    pub subject: Option<String>,
    pub keywords: Vec<String>,
    pub corresponding_author_id: i32,
    pub author_names: Vec<String>,
    /// Aligned with author_names; None for co-authors not in the system
    pub author_ids: Vec<Option<i32>>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub subject: Option<String>,
    /// Comma-separated keyword list, OR-combined
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LuckyParams {
    pub subject: Option<String>,
}

#[derive(Serialize)]
pub struct LuckyResponse {
    pub id: i32,
}

/// Expand an article row plus its link rows into a response. Names come
/// from the denormalized string; ids are re-aligned via author_order.
pub fn serialize_article(article: Article, links: &[AuthorArticle]) -> ArticleResponse {
    let author_names = split_display_list(&article.author_names);

    let mut author_ids: Vec<Option<i32>> = vec![None; author_names.len()];
    for link in links {
        if let Some(order) = link.author_order {
            let position = (order - 1) as usize;
            if position < author_ids.len() {
                author_ids[position] = Some(link.author_id);
            }
        }
    }

    let keywords = article
        .keywords
        .as_deref()
        .map(split_display_list)
        .unwrap_or_default();

    ArticleResponse {
        id: article.id,
        title: article.title,
        content: article.content,
        published_journal: article.published_journal,
        published_date: article.published_date,
        subject: article.subject,
        keywords,
        corresponding_author_id: article.corresponding_author_id,
        author_names,
        author_ids,
    }
}

async fn article_response(repo: &Repository, article: Article) -> Result<ArticleResponse> {
    let links = repo.links_for_article(article.id).await?;
    Ok(serialize_article(article, &links))
}

/// Create a new article with its author links
pub async fn create_article(
    State(state): State<AppState>,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    if request.author_names.len() != request.author_emails.len() {
        return Err(AppError::Validation {
            message: "author_names and author_emails length mismatch".to_string(),
            field: Some("author_emails".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());

    let corresponding = repo
        .find_author_by_email(&request.corresponding_author_email)
        .await?
        .ok_or_else(|| AppError::AuthorNotFound {
            id: request.corresponding_author_email.clone(),
        })?;

    // Resolve each aligned (name, email) pair. Known emails get a link row
    // with their 1-based position; everyone else stays name-only.
    let mut author_ids: Vec<Option<i32>> = Vec::with_capacity(request.author_names.len());
    let mut linked: Vec<(i32, i32)> = Vec::new();
    for (position, email) in request.author_emails.iter().enumerate() {
        let resolved = match email {
            Some(email) => repo.find_author_by_email(email).await?.map(|a| a.id),
            None => None,
        };

        author_ids.push(resolved);

        if let Some(author_id) = resolved {
            // The composite key forbids duplicate links; keep the first
            // position if an author is listed twice
            if !linked.iter().any(|(id, _)| *id == author_id) {
                linked.push((author_id, position as i32 + 1));
            }
        }
    }

    let published_date = request
        .published_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let keywords = if request.keywords.is_empty() {
        None
    } else {
        Some(join_display_list(&request.keywords))
    };

    let article = repo
        .create_article(
            request.title,
            request.content,
            request.published_journal,
            published_date,
            join_display_list(&request.author_names),
            request.subject,
            keywords,
            corresponding.id,
            linked,
        )
        .await?;

    tracing::info!(
        article_id = article.id,
        corresponding_author_id = corresponding.id,
        "Article created"
    );

    let response = ArticleResponse {
        author_names: request.author_names,
        author_ids,
        ..serialize_article(article, &[])
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Get an article by ID
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleResponse>> {
    let repo = Repository::new(state.db.clone());

    let article = repo
        .find_article_by_id(id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })?;

    Ok(Json(article_response(&repo, article).await?))
}

/// Delete an article; its references and author links cascade
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteResponse>> {
    let repo = Repository::new(state.db.clone());

    let article = repo
        .find_article_by_id(id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })?;

    repo.delete_article(id).await?;

    tracing::info!(article_id = id, "Article deleted");

    Ok(Json(DeleteResponse {
        message: format!("Article '{}'-{} deleted successfully", article.title, id),
    }))
}

/// List every article linked to an author
pub async fn list_articles_by_author(
    State(state): State<AppState>,
    Path(author_id): Path<i32>,
) -> Result<Json<Vec<ArticleResponse>>> {
    let repo = Repository::new(state.db.clone());

    if repo.find_author_by_id(author_id).await?.is_none() {
        return Err(AppError::AuthorNotFound {
            id: author_id.to_string(),
        });
    }

    let mut responses = Vec::new();
    for article in repo.list_articles_by_author(author_id).await? {
        responses.push(article_response(&repo, article).await?);
    }

    Ok(Json(responses))
}

/// Search articles by title, subject, and keywords.
///
/// All matches are case-insensitive substrings; fields are AND-combined and
/// keywords OR-combined. An empty result answers 404, not an empty list.
pub async fn search_articles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ArticleResponse>>> {
    let repo = Repository::new(state.db.clone());

    let keywords = params
        .keyword
        .as_deref()
        .map(split_display_list)
        .unwrap_or_default();

    let articles = repo
        .search_articles(params.title.as_deref(), params.subject.as_deref(), &keywords)
        .await?;

    if articles.is_empty() {
        return Err(AppError::NoArticlesMatched);
    }

    let mut responses = Vec::new();
    for article in articles {
        responses.push(article_response(&repo, article).await?);
    }

    Ok(Json(responses))
}

/// Pick one uniformly-random article, optionally filtered by subject
pub async fn lucky_article(
    State(state): State<AppState>,
    Query(params): Query<LuckyParams>,
) -> Result<Json<LuckyResponse>> {
    let repo = Repository::new(state.db.clone());

    let ids = repo.article_ids_by_subject(params.subject.as_deref()).await?;
    if ids.is_empty() {
        return Err(AppError::NoArticlesMatched);
    }

    let id = ids[rand::thread_rng().gen_range(0..ids.len())];

    Ok(Json(LuckyResponse { id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(author_names: &str, keywords: Option<&str>) -> Article {
        Article {
            id: 1,
            title: "Quantum Computing Advances".to_string(),
            content: "content".to_string(),
            published_journal: "Journal of Quantum Tech".to_string(),
            published_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            author_names: author_names.to_string(),
            subject: Some("quantum computing".to_string()),
            keywords: keywords.map(String::from),
            corresponding_author_id: 1,
        }
    }

    fn link(author_id: i32, order: Option<i32>) -> AuthorArticle {
        AuthorArticle {
            author_id,
            article_id: 1,
            author_order: order,
        }
    }

    #[test]
    fn test_serialize_aligns_ids_with_names() {
        let links = vec![link(11, Some(1)), link(22, Some(3))];
        let response = serialize_article(article("Alice, Bob, Carol", None), &links);

        assert_eq!(response.author_names, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(response.author_ids, vec![Some(11), None, Some(22)]);
    }

    #[test]
    fn test_serialize_ignores_out_of_range_order() {
        let links = vec![link(11, Some(9)), link(22, None)];
        let response = serialize_article(article("Alice, Bob", None), &links);

        assert_eq!(response.author_ids, vec![None, None]);
    }

    #[test]
    fn test_serialize_splits_keywords() {
        let response = serialize_article(article("Alice", Some("qubits, error correction")), &[]);
        assert_eq!(response.keywords, vec!["qubits", "error correction"]);

        let response = serialize_article(article("Alice", None), &[]);
        assert!(response.keywords.is_empty());
    }
}
