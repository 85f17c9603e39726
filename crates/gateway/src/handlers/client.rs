//! Login handler

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::handlers::authors::AuthorResponse;
use crate::AppState;
use citequill_common::{
    auth,
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    pub password: String,
}

/// Log an author in by email and password.
///
/// Unknown email and wrong password both answer 401 with the same message;
/// the caller cannot probe which field was wrong.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthorResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("email".to_string()),
    })?;

    let repo = Repository::new(state.db.clone());

    let author = repo
        .find_author_by_email(&request.email)
        .await?
        .ok_or(AppError::AuthFailure)?;

    if !auth::verify_password(&request.password, &author.password_hash) {
        return Err(AppError::AuthFailure);
    }

    tracing::info!(author_id = author.id, "Author logged in");

    let articles = repo.article_summaries_for_author(author.id).await?;
    Ok(Json(AuthorResponse::from_model(author, articles)))
}
