//! Author management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::patch::double_option;
use crate::AppState;
use citequill_common::{
    auth,
    db::{models::Author, ArticleSummary, Repository},
    errors::{AppError, Result},
};

/// Request to create a new author
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAuthorRequest {
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 500))]
    pub password: String,

    pub institute: Option<String>,

    pub job: Option<String>,
}

/// Partial author update. Absent fields stay untouched; nullable fields may
/// be cleared with an explicit null.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAuthorRequest {
    pub name: Option<String>,

    pub email: Option<String>,

    pub password: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub institute: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub job: Option<Option<String>>,
}

/// Lookup body for the by-email route
#[derive(Debug, Deserialize, Validate)]
pub struct AuthorEmailRequest {
    #[validate(email)]
    pub email: String,
}

/// Author record with embedded article summaries; the password hash never
/// leaves the database layer
#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub institute: Option<String>,
    pub job: Option<String>,
    pub articles: Vec<ArticleSummary>,
}

impl AuthorResponse {
    pub fn from_model(author: Author, articles: Vec<ArticleSummary>) -> Self {
        Self {
            id: author.id,
            name: author.name,
            email: author.email,
            institute: author.institute,
            job: author.job,
            articles,
        }
    }
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

async fn author_response(repo: &Repository, author: Author) -> Result<AuthorResponse> {
    let articles = repo.article_summaries_for_author(author.id).await?;
    Ok(AuthorResponse::from_model(author, articles))
}

/// Create a new author
pub async fn create_author(
    State(state): State<AppState>,
    Json(request): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<AuthorResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    if repo.find_author_by_email(&request.email).await?.is_some() {
        return Err(AppError::DuplicateEmail {
            email: request.email,
        });
    }

    let password_hash = auth::hash_password(&request.password)?;

    let author = repo
        .create_author(
            request.name,
            request.email,
            request.institute,
            request.job,
            password_hash,
        )
        .await?;

    tracing::info!(author_id = author.id, "Author created");

    Ok((
        StatusCode::CREATED,
        Json(AuthorResponse::from_model(author, Vec::new())),
    ))
}

/// List all authors with their article summaries
pub async fn list_authors(State(state): State<AppState>) -> Result<Json<Vec<AuthorResponse>>> {
    let repo = Repository::new(state.db.clone());

    let mut responses = Vec::new();
    for author in repo.list_authors().await? {
        responses.push(author_response(&repo, author).await?);
    }

    Ok(Json(responses))
}

/// Get an author by ID
pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AuthorResponse>> {
    let repo = Repository::new(state.db.clone());

    let author = repo
        .find_author_by_id(id)
        .await?
        .ok_or_else(|| AppError::AuthorNotFound { id: id.to_string() })?;

    Ok(Json(author_response(&repo, author).await?))
}

/// Get an author by email, with article summaries
pub async fn get_author_by_email(
    State(state): State<AppState>,
    Json(request): Json<AuthorEmailRequest>,
) -> Result<Json<AuthorResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("email".to_string()),
    })?;

    let repo = Repository::new(state.db.clone());

    let author = repo
        .find_author_by_email(&request.email)
        .await?
        .ok_or_else(|| AppError::AuthorNotFound {
            id: request.email.clone(),
        })?;

    Ok(Json(author_response(&repo, author).await?))
}

/// Delete an author.
///
/// Link rows cascade with the author; articles survive. Deleting an author
/// who is still the corresponding author of an article is refused, since
/// that article would be left pointing at a missing author.
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteResponse>> {
    let repo = Repository::new(state.db.clone());

    let author = repo
        .find_author_by_id(id)
        .await?
        .ok_or_else(|| AppError::AuthorNotFound { id: id.to_string() })?;

    let in_use = repo.count_corresponding_articles(id).await?;
    if in_use > 0 {
        return Err(AppError::AuthorInUse {
            id,
            article_count: in_use as usize,
        });
    }

    repo.delete_author(id).await?;

    tracing::info!(author_id = id, "Author deleted");

    Ok(Json(DeleteResponse {
        message: format!("Author '{}'-{} deleted successfully", author.name, id),
    }))
}

/// Partially update an author. Only fields present in the body are applied.
pub async fn patch_author(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateAuthorRequest>,
) -> Result<Json<AuthorResponse>> {
    let repo = Repository::new(state.db.clone());

    if repo.find_author_by_id(id).await?.is_none() {
        return Err(AppError::AuthorNotFound { id: id.to_string() });
    }

    if let Some(ref name) = request.name {
        if name.is_empty() {
            return Err(AppError::Validation {
                message: "name must not be empty".to_string(),
                field: Some("name".to_string()),
            });
        }
    }

    if let Some(ref email) = request.email {
        if !validator::ValidateEmail::validate_email(email) {
            return Err(AppError::InvalidFormat {
                message: format!("'{}' is not a valid email address", email),
            });
        }
        // A replacement email must not collide with another author
        if let Some(existing) = repo.find_author_by_email(email).await? {
            if existing.id != id {
                return Err(AppError::DuplicateEmail {
                    email: email.clone(),
                });
            }
        }
    }

    let password_hash = match request.password {
        Some(ref password) if password.is_empty() => {
            return Err(AppError::Validation {
                message: "password must not be empty".to_string(),
                field: Some("password".to_string()),
            });
        }
        Some(ref password) => Some(auth::hash_password(password)?),
        None => None,
    };

    let changes = citequill_common::db::AuthorChanges {
        name: request.name,
        email: request.email,
        password_hash,
        institute: request.institute,
        job: request.job,
    };

    let author = repo.update_author(id, changes).await?;

    Ok(Json(author_response(&repo, author).await?))
}
