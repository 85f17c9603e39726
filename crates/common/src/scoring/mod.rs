//! Citation scoring callout
//!
//! Asks a hosted model to rate a citation 0-10 given both articles and the
//! reference text. The callout is strictly best-effort: callers log a
//! failure and leave `ai_rated_score` unset. There are no retries — the
//! reference-create path keeps at-most-once side effects.

use crate::config::ScoringConfig;
use crate::db::models::{Article, Reference};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A validated scoring result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceScore {
    /// Integer in [0, 10]
    pub score: i32,
    pub reasoning: String,
}

/// Trait for citation scoring
#[async_trait]
pub trait CitationScorer: Send + Sync {
    /// Score a single citation edge
    async fn score(
        &self,
        citing: &Article,
        cited: &Article,
        reference: &Reference,
    ) -> Result<ReferenceScore>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Build the fixed scoring prompt. The rubric bands are requested from the
/// model; locally only the [0, 10] range is enforced.
pub fn build_prompt(citing: &Article, cited: &Article, reference: &Reference) -> String {
    let subject = cited.subject.as_deref().unwrap_or("academic research");
    let citing_subject = citing.subject.as_deref().unwrap_or("not specified");
    let cited_subject = cited.subject.as_deref().unwrap_or("not specified");
    let excerpt: String = citing.content.chars().take(500).collect();
    let context = reference
        .citation_content
        .as_deref()
        .unwrap_or("No context provided");

    format!(
        r#"You are a professor in {subject} and an expert academic reviewer evaluating citation quality.

CITING ARTICLE:
Title: {citing_title}
Subject: {citing_subject}
Content excerpt: {excerpt}...

CITED WORK:
Title: {cited_title}
Authors: {cited_authors}
Subject: {cited_subject}

CITATION CONTEXT:
{context}

REFERENCE CONTENT:
{content}

Rate this citation on a scale of 0-10:
- 0-3: Poor (irrelevant, inaccurate, or misrepresented)
- 4-6: Fair (somewhat relevant but could be better)
- 7-8: Good (relevant and accurate)
- 9-10: Excellent (highly relevant, accurate, and necessary)

Respond ONLY with a JSON object:
{{
  "score": <number 0-10>,
  "reasoning": "<brief 1-2 sentence explanation>"
}}"#,
        subject = subject,
        citing_title = citing.title,
        citing_subject = citing_subject,
        excerpt = excerpt,
        cited_title = cited.title,
        cited_authors = cited.author_names,
        cited_subject = cited_subject,
        context = context,
        content = reference.content,
    )
}

/// Strip a surrounding markdown code fence, with or without a `json` tag
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    let inner = inner.trim_start();
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

/// Parse the model's response body into a validated score.
///
/// Non-JSON bodies, non-integer scores, and out-of-range values are all
/// rejected; the caller treats any of them as "no score available".
pub fn parse_score_response(body: &str) -> Result<ReferenceScore> {
    let stripped = strip_code_fence(body);

    let value: serde_json::Value =
        serde_json::from_str(stripped).map_err(|e| AppError::ScoringError {
            message: format!("Response is not valid JSON: {}", e),
        })?;

    let score = value
        .get("score")
        .and_then(|s| s.as_i64())
        .ok_or_else(|| AppError::ScoringError {
            message: "Response is missing an integer score".to_string(),
        })?;

    if !(0..=10).contains(&score) {
        return Err(AppError::ScoringError {
            message: format!("Score {} outside [0, 10]", score),
        });
    }

    let reasoning = value
        .get("reasoning")
        .and_then(|r| r.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(ReferenceScore {
        score: score as i32,
        reasoning,
    })
}

/// Gemini scoring client
pub struct GeminiScorer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiScorer {
    /// Create a new Gemini scorer from configuration
    pub fn new(config: &ScoringConfig, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
        }
    }

    async fn make_request(&self, prompt: String) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ScoringError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ScoringError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: GeminiResponse =
            response.json().await.map_err(|e| AppError::ScoringError {
                message: format!("Failed to parse response: {}", e),
            })?;

        result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AppError::ScoringError {
                message: "Empty response".to_string(),
            })
    }
}

#[async_trait]
impl CitationScorer for GeminiScorer {
    async fn score(
        &self,
        citing: &Article,
        cited: &Article,
        reference: &Reference,
    ) -> Result<ReferenceScore> {
        let prompt = build_prompt(citing, cited, reference);
        let body = self.make_request(prompt).await?;
        parse_score_response(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock scorer for testing
pub struct MockScorer {
    score: i32,
    fail: bool,
}

impl MockScorer {
    pub fn new(score: i32) -> Self {
        Self { score, fail: false }
    }

    /// A scorer whose every call fails, for degraded-path tests
    pub fn failing() -> Self {
        Self { score: 0, fail: true }
    }
}

#[async_trait]
impl CitationScorer for MockScorer {
    async fn score(
        &self,
        _citing: &Article,
        _cited: &Article,
        _reference: &Reference,
    ) -> Result<ReferenceScore> {
        if self.fail {
            return Err(AppError::ScoringError {
                message: "mock failure".to_string(),
            });
        }
        Ok(ReferenceScore {
            score: self.score,
            reasoning: "mock reasoning".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-scorer"
    }
}

/// Create a scorer from configuration; a missing API key disables scoring
pub fn create_scorer(config: &ScoringConfig) -> Option<Arc<dyn CitationScorer>> {
    match &config.api_key {
        Some(key) => Some(Arc::new(GeminiScorer::new(config, key.clone()))),
        None => {
            tracing::warn!("Scoring API key not configured, references will not be scored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i32, title: &str, subject: Option<&str>) -> Article {
        Article {
            id,
            title: title.to_string(),
            content: "Exploring new qubit architectures.".to_string(),
            published_journal: "Journal of Quantum Tech".to_string(),
            published_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            author_names: "Alice Zhang, Bob Smith".to_string(),
            subject: subject.map(String::from),
            keywords: None,
            corresponding_author_id: 1,
        }
    }

    fn reference() -> Reference {
        Reference {
            id: 1,
            cited_from_id: 1,
            cited_to_id: 2,
            content: "Reference: quantum computing principles applied to ML.".to_string(),
            citation_content: Some("Inspired by energy system predictions.".to_string()),
            if_key_reference: true,
            if_secondary_reference: false,
            ai_rated_score: None,
            feedback: None,
            author_comment: None,
        }
    }

    #[test]
    fn test_prompt_embeds_both_articles() {
        let citing = article(1, "Quantum Computing Advances", Some("quantum computing"));
        let cited = article(2, "Machine Learning in Energy Systems", Some("energy"));
        let prompt = build_prompt(&citing, &cited, &reference());

        assert!(prompt.contains("Quantum Computing Advances"));
        assert!(prompt.contains("Machine Learning in Energy Systems"));
        assert!(prompt.contains("Alice Zhang, Bob Smith"));
        assert!(prompt.contains("Inspired by energy system predictions."));
        assert!(prompt.contains("0-3: Poor"));
    }

    #[test]
    fn test_prompt_without_context() {
        let citing = article(1, "A", None);
        let cited = article(2, "B", None);
        let mut r = reference();
        r.citation_content = None;
        let prompt = build_prompt(&citing, &cited, &r);
        assert!(prompt.contains("No context provided"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"score\": 7}"), "{\"score\": 7}");
        assert_eq!(
            strip_code_fence("```json\n{\"score\": 7}\n```"),
            "{\"score\": 7}"
        );
        assert_eq!(strip_code_fence("```\n{\"score\": 7}\n```"), "{\"score\": 7}");
        // unterminated fence still yields the payload
        assert_eq!(strip_code_fence("```json\n{\"score\": 7}"), "{\"score\": 7}");
    }

    #[test]
    fn test_parse_valid_response() {
        let parsed =
            parse_score_response("{\"score\": 8, \"reasoning\": \"relevant and accurate\"}")
                .unwrap();
        assert_eq!(parsed.score, 8);
        assert_eq!(parsed.reasoning, "relevant and accurate");
    }

    #[test]
    fn test_parse_fenced_response() {
        let parsed =
            parse_score_response("```json\n{\"score\": 10, \"reasoning\": \"x\"}\n```").unwrap();
        assert_eq!(parsed.score, 10);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(parse_score_response("{\"score\": 11}").is_err());
        assert!(parse_score_response("{\"score\": -1}").is_err());
    }

    #[test]
    fn test_parse_rejects_non_integer() {
        assert!(parse_score_response("{\"score\": 7.5}").is_err());
        assert!(parse_score_response("{\"score\": \"7\"}").is_err());
        assert!(parse_score_response("not json at all").is_err());
        assert!(parse_score_response("{\"reasoning\": \"no score\"}").is_err());
    }

    #[tokio::test]
    async fn test_mock_scorer() {
        let scorer = MockScorer::new(9);
        let citing = article(1, "A", None);
        let cited = article(2, "B", None);
        let result = scorer.score(&citing, &cited, &reference()).await.unwrap();
        assert_eq!(result.score, 9);
    }

    #[tokio::test]
    async fn test_failing_mock_scorer() {
        let scorer = MockScorer::failing();
        let citing = article(1, "A", None);
        let cited = article(2, "B", None);
        assert!(scorer.score(&citing, &cited, &reference()).await.is_err());
    }

    #[test]
    fn test_create_scorer_without_key() {
        let config = ScoringConfig {
            api_key: None,
            api_base: None,
            model: "gemini-2.0-flash-exp".to_string(),
            timeout_secs: 20,
        };
        assert!(create_scorer(&config).is_none());
    }
}
