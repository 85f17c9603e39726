//! Mail notification callout
//!
//! Sends a transactional email to the cited article's corresponding author
//! when a new reference to their work is submitted. Like scoring, this is
//! best-effort with no retries: a failure is logged at the boundary and the
//! reference-create request still succeeds.

use crate::config::MailConfig;
use crate::db::models::{Article, Reference};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Trait for outbound mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a single message
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// Decide where a notification actually goes.
///
/// The testing-mode gate (`redirect_to_admin`) reroutes every message to the
/// configured admin address. Returns `None` when the gate is on but no admin
/// address is configured, in which case the caller skips the send.
pub fn resolve_recipient<'a>(config: &'a MailConfig, recipient: &'a str) -> Option<&'a str> {
    if config.redirect_to_admin {
        config.admin_email.as_deref()
    } else {
        Some(recipient)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Subject line for a citation notification
pub fn notice_subject(citing: &Article) -> String {
    format!("Your work has been cited in \"{}\"", citing.title)
}

/// HTML body for a citation notification.
///
/// Summarizes both articles, the citation context, the score when one was
/// computed, and both reference flags.
pub fn notice_html(
    citing: &Article,
    cited: &Article,
    reference: &Reference,
    score: Option<i32>,
) -> String {
    let context = reference
        .citation_content
        .as_deref()
        .unwrap_or("(no context provided)");

    let score_line = match score {
        Some(s) => format!("{}/10", s),
        None => "pending review".to_string(),
    };

    format!(
        r#"<h2>New citation of your article</h2>
<p>Your article <strong>{cited_title}</strong> ({cited_journal}) has been cited by
<strong>{citing_title}</strong> ({citing_journal}) by {citing_authors}.</p>
<h3>Citation context</h3>
<blockquote>{context}</blockquote>
<h3>Reference</h3>
<blockquote>{content}</blockquote>
<ul>
<li>Key reference: {key}</li>
<li>Secondary reference: {secondary}</li>
<li>AI quality score: {score_line}</li>
</ul>
<p>You can review this citation and leave validation feedback in Citequill.</p>"#,
        cited_title = cited.title,
        cited_journal = cited.published_journal,
        citing_title = citing.title,
        citing_journal = citing.published_journal,
        citing_authors = citing.author_names,
        context = context,
        content = reference.content,
        key = yes_no(reference.if_key_reference),
        secondary = yes_no(reference.if_secondary_reference),
        score_line = score_line,
    )
}

/// Resend HTTP API client
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    /// Create a new Resend client from configuration
    pub fn new(config: &MailConfig, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            from: config.from.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.resend.com".to_string()),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let url = format!("{}/emails", self.base_url);

        let request = ResendRequest {
            from: &self.from,
            to: vec![to],
            subject,
            html,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::MailError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MailError {
                message: format!("API error {}: {}", status, body),
            });
        }

        Ok(())
    }
}

/// A message captured by [`MockMailer`]
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mock mailer for testing; records every send
#[derive(Default)]
pub struct MockMailer {
    sent: std::sync::Mutex<Vec<SentMail>>,
    fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every call fails, for degraded-path tests
    pub fn failing() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Messages captured so far
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        if self.fail {
            return Err(AppError::MailError {
                message: "mock failure".to_string(),
            });
        }
        self.sent.lock().expect("mailer lock poisoned").push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Create a mailer from configuration; a missing API key disables mail
pub fn create_mailer(config: &MailConfig) -> Option<Arc<dyn Mailer>> {
    match &config.api_key {
        Some(key) => Some(Arc::new(ResendMailer::new(config, key.clone()))),
        None => {
            tracing::warn!("Mail API key not configured, citation notifications disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i32, title: &str) -> Article {
        Article {
            id,
            title: title.to_string(),
            content: "content".to_string(),
            published_journal: "Energy Journal".to_string(),
            published_date: chrono::NaiveDate::from_ymd_opt(2023, 11, 10).unwrap(),
            author_names: "Bob Smith, Carol Lee".to_string(),
            subject: None,
            keywords: None,
            corresponding_author_id: 2,
        }
    }

    fn reference() -> Reference {
        Reference {
            id: 5,
            cited_from_id: 1,
            cited_to_id: 2,
            content: "Reference: data-driven optimization methodology.".to_string(),
            citation_content: Some("Optimization techniques inspired by ML.".to_string()),
            if_key_reference: false,
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

    #[test]
    fn test_recipient_passthrough() {
        let config = mail_config(false, Some("admin@x.com"));
        assert_eq!(
            resolve_recipient(&config, "bob@x.com"),
            Some("bob@x.com")
        );
    }

    #[test]
    fn test_recipient_admin_redirect() {
        let config = mail_config(true, Some("admin@x.com"));
        assert_eq!(
            resolve_recipient(&config, "bob@x.com"),
            Some("admin@x.com")
        );
    }

    #[test]
    fn test_recipient_redirect_without_admin_skips() {
        let config = mail_config(true, None);
        assert_eq!(resolve_recipient(&config, "bob@x.com"), None);
    }

    #[test]
    fn test_notice_html_contents() {
        let citing = article(1, "Machine Learning in Energy Systems");
        let cited = article(2, "Data-Driven Optimization");
        let html = notice_html(&citing, &cited, &reference(), Some(7));

        assert!(html.contains("Machine Learning in Energy Systems"));
        assert!(html.contains("Data-Driven Optimization"));
        assert!(html.contains("Optimization techniques inspired by ML."));
        assert!(html.contains("Key reference: No"));
        assert!(html.contains("Secondary reference: Yes"));
        assert!(html.contains("7/10"));
    }

    #[test]
    fn test_notice_html_without_score() {
        let citing = article(1, "A");
        let cited = article(2, "B");
        let html = notice_html(&citing, &cited, &reference(), None);
        assert!(html.contains("pending review"));
    }

    #[test]
    fn test_notice_subject() {
        let citing = article(1, "Quantum Computing Advances");
        assert_eq!(
            notice_subject(&citing),
            "Your work has been cited in \"Quantum Computing Advances\""
        );
    }

    #[tokio::test]
    async fn test_mock_mailer_records() {
        let mailer = MockMailer::new();
        mailer.send("bob@x.com", "subj", "<p>hi</p>").await.unwrap();
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "bob@x.com");
    }

    #[tokio::test]
    async fn test_failing_mock_mailer() {
        let mailer = MockMailer::failing();
        assert!(mailer.send("bob@x.com", "s", "h").await.is_err());
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn test_create_mailer_without_key() {
        assert!(create_mailer(&mail_config(false, None)).is_none());
    }
}
