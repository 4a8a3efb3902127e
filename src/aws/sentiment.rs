use std::fmt;

use aws_sdk_comprehend::Client;
use aws_sdk_comprehend::types::{LanguageCode, SentimentType};
use serde::{Deserialize, Serialize};

use super::error::ServiceError;

/// Sentiment label, matching the categories offered to human reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    /// Parse either Comprehend's `POSITIVE` form or a reviewer's `Positive` label.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(Sentiment::Positive),
            "NEGATIVE" => Some(Sentiment::Negative),
            "NEUTRAL" => Some(Sentiment::Neutral),
            "MIXED" => Some(Sentiment::Mixed),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "Positive"),
            Sentiment::Negative => write!(f, "Negative"),
            Sentiment::Neutral => write!(f, "Neutral"),
            Sentiment::Mixed => write!(f, "Mixed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f32,
    pub negative: f32,
    pub neutral: f32,
    pub mixed: f32,
}

impl SentimentScores {
    pub fn of(&self, sentiment: Sentiment) -> f32 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Mixed => self.mixed,
        }
    }
}

/// Result of one `DetectSentiment` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub scores: SentimentScores,
}

impl SentimentResult {
    /// Score the model assigned to its own prediction.
    pub fn confidence(&self) -> f32 {
        self.scores.of(self.sentiment)
    }
}

/// Text sentiment scoring service.
#[allow(async_fn_in_trait)]
pub trait SentimentApi {
    async fn detect(&self, text: &str, language: &str) -> Result<SentimentResult, ServiceError>;
}

/// [`SentimentApi`] backed by Amazon Comprehend.
pub struct ComprehendClient {
    client: Client,
}

impl ComprehendClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn score(value: impl Into<Option<f32>>) -> f32 {
    value.into().unwrap_or_default()
}

impl SentimentApi for ComprehendClient {
    async fn detect(&self, text: &str, language: &str) -> Result<SentimentResult, ServiceError> {
        let out = self
            .client
            .detect_sentiment()
            .text(text)
            .language_code(LanguageCode::from(language))
            .send()
            .await
            .map_err(ServiceError::sdk("DetectSentiment"))?;

        let label: Option<&SentimentType> = out.sentiment().into();
        let sentiment = label
            .and_then(|s| Sentiment::parse(s.as_str()))
            .ok_or(ServiceError::MissingField {
                operation: "DetectSentiment",
                field: "Sentiment",
            })?;

        let scores = out
            .sentiment_score()
            .map(|s| SentimentScores {
                positive: score(s.positive()),
                negative: score(s.negative()),
                neutral: score(s.neutral()),
                mixed: score(s.mixed()),
            })
            .unwrap_or_default();

        Ok(SentimentResult { sentiment, scores })
    }
}
