//! Reference (citation edge) handlers
//!
//! Reference creation is the only path with outbound side effects: a
//! best-effort scoring callout followed by a best-effort notification to the
//! cited article's corresponding author. Neither failure surfaces to the
//! caller; the committed edge is the durable outcome.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::patch::double_option;
use crate::AppState;
use citequill_common::{
    config::MailConfig,
    db::{
        models::{Article, Reference},
        NewReference, ReferenceChanges, Repository,
    },
    errors::{AppError, Result},
    mail::{self, Mailer},
    metrics,
    scoring::{CitationScorer, ReferenceScore},
};

/// Request to create a new citation edge
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReferenceRequest {
    pub cited_from_id: i32,

    pub cited_to_id: i32,

    #[validate(length(min = 1))]
    pub content: String,

    pub if_key_reference: bool,

    pub if_secondary_reference: bool,

    pub citation_content: Option<String>,

    pub author_comment: Option<String>,
}

/// Partial reference update; typically used to record reviewer feedback,
/// the citing author's comment, or to correct the flags/score post-hoc
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReferenceRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub citation_content: Option<Option<String>>,

    pub if_key_reference: Option<bool>,

    pub if_secondary_reference: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    pub ai_rated_score: Option<Option<i32>>,

    #[serde(default, deserialize_with = "double_option")]
    pub feedback: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub author_comment: Option<Option<String>>,
}

/// Citation edge with both article titles for display
#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub id: i32,
    pub cited_from_id: i32,
    pub cited_to_id: i32,
    pub cited_from_title: Option<String>,
    pub cited_to_title: Option<String>,
    pub content: String,
    pub citation_content: Option<String>,
    pub if_key_reference: bool,
    pub if_secondary_reference: bool,
    pub ai_rated_score: Option<i32>,
    pub feedback: Option<String>,
    pub author_comment: Option<String>,
}

/// Serialize an edge together with its endpoint titles
pub fn serialize_reference(
    reference: Reference,
    cited_from_title: Option<String>,
    cited_to_title: Option<String>,
) -> ReferenceResponse {
    ReferenceResponse {
        id: reference.id,
        cited_from_id: reference.cited_from_id,
        cited_to_id: reference.cited_to_id,
        cited_from_title,
        cited_to_title,
        content: reference.content,
        citation_content: reference.citation_content,
        if_key_reference: reference.if_key_reference,
        if_secondary_reference: reference.if_secondary_reference,
        ai_rated_score: reference.ai_rated_score,
        feedback: reference.feedback,
        author_comment: reference.author_comment,
    }
}

async fn reference_response(repo: &Repository, reference: Reference) -> Result<ReferenceResponse> {
    let cited_from_title = repo
        .find_article_by_id(reference.cited_from_id)
        .await?
        .map(|a| a.title);
    let cited_to_title = repo
        .find_article_by_id(reference.cited_to_id)
        .await?
        .map(|a| a.title);

    Ok(serialize_reference(
        reference,
        cited_from_title,
        cited_to_title,
    ))
}

/// Run the scoring callout. Any failure is logged and swallowed; the caller
/// keeps a null score.
pub async fn run_scoring(
    scorer: Option<&dyn CitationScorer>,
    citing: &Article,
    cited: &Article,
    reference: &Reference,
) -> Option<ReferenceScore> {
    let scorer = scorer?;

    let start = Instant::now();
    match scorer.score(citing, cited, reference).await {
        Ok(scored) => {
            metrics::record_scoring(start.elapsed().as_secs_f64(), scorer.model_name(), true);
            tracing::info!(
                reference_id = reference.id,
                score = scored.score,
                reasoning = %scored.reasoning,
                "Citation scored"
            );
            Some(scored)
        }
        Err(e) => {
            metrics::record_scoring(start.elapsed().as_secs_f64(), scorer.model_name(), false);
            tracing::warn!(
                reference_id = reference.id,
                error = %e,
                "Citation scoring failed, score stays unset"
            );
            None
        }
    }
}

/// Send the citation notification. Any failure is logged and swallowed.
pub async fn run_notification(
    mailer: Option<&dyn Mailer>,
    config: &MailConfig,
    recipient: &str,
    citing: &Article,
    cited: &Article,
    reference: &Reference,
    score: Option<i32>,
) {
    let Some(mailer) = mailer else {
        return;
    };

    let Some(to) = mail::resolve_recipient(config, recipient) else {
        tracing::warn!("Mail redirect enabled without an admin address, notification skipped");
        return;
    };

    if config.redirect_to_admin {
        tracing::info!(
            original_recipient = recipient,
            redirected_to = to,
            "Notification redirected to admin address"
        );
    }

    let subject = mail::notice_subject(citing);
    let html = mail::notice_html(citing, cited, reference, score);

    match mailer.send(to, &subject, &html).await {
        Ok(()) => {
            metrics::record_mail(true);
            tracing::info!(reference_id = reference.id, to = to, "Citation notification sent");
        }
        Err(e) => {
            metrics::record_mail(false);
            tracing::warn!(
                reference_id = reference.id,
                error = %e,
                "Citation notification failed"
            );
        }
    }
}

/// Create a citation edge, then score and notify best-effort.
///
/// The row write commits before either callout runs; a crash or failure
/// between the steps leaves a valid edge with a null score and no mail,
/// which is the accepted degraded outcome.
pub async fn create_reference(
    State(state): State<AppState>,
    Json(request): Json<CreateReferenceRequest>,
) -> Result<(StatusCode, Json<ReferenceResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    let citing = repo
        .find_article_by_id(request.cited_from_id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound {
            id: request.cited_from_id.to_string(),
        })?;

    let cited = repo
        .find_article_by_id(request.cited_to_id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound {
            id: request.cited_to_id.to_string(),
        })?;

    let mut reference = repo
        .create_reference(NewReference {
            cited_from_id: request.cited_from_id,
            cited_to_id: request.cited_to_id,
            content: request.content,
            citation_content: request.citation_content,
            if_key_reference: request.if_key_reference,
            if_secondary_reference: request.if_secondary_reference,
            author_comment: request.author_comment,
        })
        .await?;

    tracing::info!(
        reference_id = reference.id,
        cited_from_id = reference.cited_from_id,
        cited_to_id = reference.cited_to_id,
        "Reference created"
    );

    // Best-effort scoring; the write-back is its own commit and may fail
    // without affecting the response status
    let scored = run_scoring(state.scorer.as_deref(), &citing, &cited, &reference).await;
    if let Some(ref scored) = scored {
        match repo.set_reference_score(reference.id, scored.score).await {
            Ok(updated) => reference = updated,
            Err(e) => {
                tracing::warn!(
                    reference_id = reference.id,
                    error = %e,
                    "Score write-back failed, score stays unset"
                );
            }
        }
    }

    // Best-effort notification to the cited article's corresponding author.
    // The computed score goes into the mail even if the write-back failed.
    match repo.find_author_by_id(cited.corresponding_author_id).await {
        Ok(Some(author)) => {
            run_notification(
                state.mailer.as_deref(),
                &state.config.mail,
                &author.email,
                &citing,
                &cited,
                &reference,
                scored.as_ref().map(|s| s.score),
            )
            .await;
        }
        Ok(None) => {
            tracing::warn!(
                article_id = cited.id,
                "Cited article has no corresponding author row, notification skipped"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Corresponding author lookup failed, notification skipped");
        }
    }

    let response = serialize_reference(reference, Some(citing.title), Some(cited.title));

    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a reference by ID
pub async fn get_reference(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ReferenceResponse>> {
    let repo = Repository::new(state.db.clone());

    let reference = repo
        .find_reference_by_id(id)
        .await?
        .ok_or_else(|| AppError::ReferenceNotFound { id: id.to_string() })?;

    Ok(Json(reference_response(&repo, reference).await?))
}

/// All references made from an article
pub async fn list_references_from(
    State(state): State<AppState>,
    Path(article_id): Path<i32>,
) -> Result<Json<Vec<ReferenceResponse>>> {
    let repo = Repository::new(state.db.clone());

    let mut responses = Vec::new();
    for reference in repo.list_references_from(article_id).await? {
        responses.push(reference_response(&repo, reference).await?);
    }

    Ok(Json(responses))
}

/// All references pointing to an article
pub async fn list_references_to(
    State(state): State<AppState>,
    Path(article_id): Path<i32>,
) -> Result<Json<Vec<ReferenceResponse>>> {
    let repo = Repository::new(state.db.clone());

    let mut responses = Vec::new();
    for reference in repo.list_references_to(article_id).await? {
        responses.push(reference_response(&repo, reference).await?);
    }

    Ok(Json(responses))
}

/// Partially update a reference. Only fields present in the body are
/// applied; nullable fields may be cleared with an explicit null.
pub async fn patch_reference(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateReferenceRequest>,
) -> Result<Json<ReferenceResponse>> {
    let repo = Repository::new(state.db.clone());

    if repo.find_reference_by_id(id).await?.is_none() {
        return Err(AppError::ReferenceNotFound { id: id.to_string() });
    }

    if let Some(Some(score)) = request.ai_rated_score {
        if !(0..=10).contains(&score) {
            return Err(AppError::Validation {
                message: format!("ai_rated_score {} outside [0, 10]", score),
                field: Some("ai_rated_score".to_string()),
            });
        }
    }

    let changes = ReferenceChanges {
        citation_content: request.citation_content,
        if_key_reference: request.if_key_reference,
        if_secondary_reference: request.if_secondary_reference,
        ai_rated_score: request.ai_rated_score,
        feedback: request.feedback,
        author_comment: request.author_comment,
    };

    let reference = repo.update_reference(id, changes).await?;

    Ok(Json(reference_response(&repo, reference).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use citequill_common::mail::MockMailer;
    use citequill_common::scoring::MockScorer;

    fn article(id: i32, title: &str) -> Article {
        Article {
            id,
            title: title.to_string(),
            content: "content".to_string(),
            published_journal: "Journal".to_string(),
            published_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            author_names: "Carol Lee, David Wong".to_string(),
            subject: Some("optimization".to_string()),
            keywords: None,
            corresponding_author_id: 3,
        }
    }

    fn reference(from: i32, to: i32) -> Reference {
        Reference {
            id: 9,
            cited_from_id: from,
            cited_to_id: to,
            content: "Reference: data-driven optimization methodology.".to_string(),
            citation_content: None,
            if_key_reference: true,
            if_secondary_reference: true,
            ai_rated_score: None,
            feedback: None,
            author_comment: None,
        }
    }

    fn mail_config(redirect: bool, admin: Option<&str>) -> MailConfig {
        MailConfig {
            api_key: None,
            api_base: None,
            from: "notifications@citequill.dev".to_string(),
            admin_email: admin.map(String::from),
            redirect_to_admin: redirect,
            timeout_secs: 10,
        }
    }

    #[tokio::test]
    async fn test_run_scoring_success() {
        let scorer = MockScorer::new(8);
        let scored = run_scoring(
            Some(&scorer as &dyn CitationScorer),
            &article(1, "A"),
            &article(2, "B"),
            &reference(1, 2),
        )
        .await;
        assert_eq!(scored.unwrap().score, 8);
    }

    #[tokio::test]
    async fn test_run_scoring_failure_yields_none() {
        let scorer = MockScorer::failing();
        let scored = run_scoring(
            Some(&scorer as &dyn CitationScorer),
            &article(1, "A"),
            &article(2, "B"),
            &reference(1, 2),
        )
        .await;
        assert!(scored.is_none());
    }

    #[tokio::test]
    async fn test_run_scoring_disabled_yields_none() {
        let scored = run_scoring(None, &article(1, "A"), &article(2, "B"), &reference(1, 2)).await;
        assert!(scored.is_none());
    }

    #[tokio::test]
    async fn test_run_scoring_tolerates_self_citation() {
        // Self-loops are currently accepted; scoring still runs over them
        let scorer = MockScorer::new(2);
        let a = article(1, "A");
        let scored = run_scoring(Some(&scorer as &dyn CitationScorer), &a, &a, &reference(1, 1)).await;
        assert_eq!(scored.unwrap().score, 2);
    }

    #[tokio::test]
    async fn test_notification_delivers_to_recipient() {
        let mailer = MockMailer::new();
        run_notification(
            Some(&mailer as &dyn Mailer),
            &mail_config(false, None),
            "carol.lee@example.com",
            &article(1, "Citing"),
            &article(2, "Cited"),
            &reference(1, 2),
            Some(7),
        )
        .await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "carol.lee@example.com");
        assert!(sent[0].subject.contains("Citing"));
        assert!(sent[0].html.contains("7/10"));
    }

    #[tokio::test]
    async fn test_notification_redirects_to_admin() {
        let mailer = MockMailer::new();
        run_notification(
            Some(&mailer as &dyn Mailer),
            &mail_config(true, Some("admin@citequill.dev")),
            "carol.lee@example.com",
            &article(1, "Citing"),
            &article(2, "Cited"),
            &reference(1, 2),
            None,
        )
        .await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "admin@citequill.dev");
        assert!(sent[0].html.contains("pending review"));
    }

    #[tokio::test]
    async fn test_notification_failure_is_swallowed() {
        let mailer = MockMailer::failing();
        // Must not panic or propagate
        run_notification(
            Some(&mailer as &dyn Mailer),
            &mail_config(false, None),
            "carol.lee@example.com",
            &article(1, "Citing"),
            &article(2, "Cited"),
            &reference(1, 2),
            None,
        )
        .await;
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn test_patch_body_unset_vs_null() {
        let patch: UpdateReferenceRequest =
            serde_json::from_str(r#"{"feedback": "needs a page number"}"#).unwrap();
        assert_eq!(patch.feedback, Some(Some("needs a page number".to_string())));
        assert_eq!(patch.author_comment, None);
        assert_eq!(patch.ai_rated_score, None);

        let patch: UpdateReferenceRequest =
            serde_json::from_str(r#"{"ai_rated_score": null, "if_key_reference": false}"#).unwrap();
        assert_eq!(patch.ai_rated_score, Some(None));
        assert_eq!(patch.if_key_reference, Some(false));
        assert_eq!(patch.feedback, None);
    }
}
