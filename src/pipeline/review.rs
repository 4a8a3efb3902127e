//! Sentiment analysis with human review of low-confidence predictions.
//!
//! Comprehend scores each text; anything whose predicted label scores below
//! `review.confidence_threshold` is sent to an Augmented AI human loop. Once a
//! loop completes, A2I writes the reviewers' answers to S3 as JSON.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::timestamped_name;
use crate::aws::{
    FlowDefinitionSpec, FlowDefinitionWatch, HumanLoopWatch, ObjectStore, ReviewApi, S3Uri,
    SentimentApi, SentimentResult,
};
use crate::config::JobwatchConfig;
use crate::error::JobwatchError;
use crate::waiter::{AsyncJobWaiter, FlowDefinitionRecord, FlowStatus, HumanLoopRecord};

/// Worker task template: one free-text object, four sentiment categories.
pub const DEFAULT_TEMPLATE: &str = r#"<script src="https://assets.crowd.aws/crowd-html-elements.js"></script>

<crowd-form>
  <crowd-classifier
    name="sentiment"
    categories="['Positive', 'Negative', 'Neutral', 'Mixed']"
    initial-value="{{ task.input.initialValue }}"
    header="What sentiment does this text convey?"
  >
    <classification-target>
      {{ task.input.taskObject }}
    </classification-target>

    <full-instructions header="Sentiment Analysis Instructions">
      <p><strong>Positive</strong> sentiment includes: joy, excitement, delight</p>
      <p><strong>Negative</strong> sentiment includes: anger, sarcasm, anxiety</p>
      <p><strong>Neutral</strong>: neither positive or negative, such as stating a fact</p>
      <p><strong>Mixed</strong>: when the sentiment is mixed</p>
    </full-instructions>

    <short-instructions>
     Choose the primary sentiment that is expressed by the text.
    </short-instructions>
  </crowd-classifier>
</crowd-form>
"#;

/// One analysed text and, if it was routed to review, the loop handling it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedText {
    pub text: String,
    pub result: SentimentResult,
    pub human_loop: Option<String>,
}

/// What the reviewers decided for one human loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    pub loop_name: String,
    pub text: Option<String>,
    /// Comprehend's prediction as shown to the reviewers.
    pub initial_value: Option<String>,
    /// One label per reviewer answer.
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoopOutput {
    #[serde(default)]
    human_answers: Vec<HumanAnswer>,
    #[serde(default)]
    input_content: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HumanAnswer {
    answer_content: Value,
}

impl ReviewOutcome {
    /// Parse the JSON document A2I writes for a completed loop.
    pub fn parse(loop_name: &str, raw: &[u8]) -> Result<Self, JobwatchError> {
        let output: LoopOutput = serde_json::from_slice(raw)?;
        let labels = output
            .human_answers
            .iter()
            .map(|a| {
                a.answer_content["sentiment"]["label"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        JobwatchError::ReviewOutput(format!(
                            "{loop_name}: answer without sentiment.label"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            loop_name: loop_name.to_string(),
            text: output.input_content["taskObject"]
                .as_str()
                .map(str::to_string),
            initial_value: output.input_content["initialValue"]
                .as_str()
                .map(str::to_string),
            labels,
        })
    }
}

/// Comprehend + Augmented AI review workflow.
pub struct ReviewPipeline<'a, R, C, S> {
    review: &'a R,
    sentiment: &'a C,
    store: &'a S,
    config: &'a JobwatchConfig,
    waiter: AsyncJobWaiter,
}

impl<'a, R, C, S> ReviewPipeline<'a, R, C, S>
where
    R: ReviewApi,
    C: SentimentApi,
    S: ObjectStore,
{
    pub fn new(
        review: &'a R,
        sentiment: &'a C,
        store: &'a S,
        config: &'a JobwatchConfig,
        waiter: AsyncJobWaiter,
    ) -> Self {
        Self {
            review,
            sentiment,
            store,
            config,
            waiter,
        }
    }

    /// Register the worker template and a flow definition, then wait until it is active.
    pub async fn create_flow(
        &self,
        template: Option<&str>,
        on_poll: impl FnMut(u32, &FlowDefinitionRecord),
    ) -> Result<FlowDefinitionRecord, JobwatchError> {
        let cfg = &self.config.review;
        let role_arn = JobwatchConfig::require("role_arn", &self.config.role_arn)?;
        let workteam_arn = JobwatchConfig::require("review.workteam_arn", &cfg.workteam_arn)?;
        let bucket = JobwatchConfig::require("bucket", &self.config.bucket)?;

        let now = Utc::now();
        let ui_name = timestamped_name(&cfg.task_ui_prefix, now);
        let ui_arn = self
            .review
            .create_task_ui(&ui_name, template.unwrap_or(DEFAULT_TEMPLATE))
            .await?;
        tracing::info!(ui = %ui_name, arn = %ui_arn, "task UI created");

        let spec = FlowDefinitionSpec {
            name: timestamped_name(&cfg.flow_prefix, now),
            role_arn: role_arn.to_string(),
            workteam_arn: workteam_arn.to_string(),
            human_task_ui_arn: ui_arn,
            task_title: cfg.task_title.clone(),
            task_description: cfg.task_description.clone(),
            task_count: cfg.task_count,
            output_path: S3Uri::new(bucket, cfg.output_prefix.as_str()).to_string(),
        };
        let arn = self.review.create_flow_definition(&spec).await?;
        tracing::info!(flow = %spec.name, %arn, "flow definition requested");

        let mut watch = FlowDefinitionWatch::new(self.review, spec.name.as_str());
        let mut record = self
            .waiter
            .wait_observed(&mut watch, on_poll)
            .await
            .map_err(|e| JobwatchError::from_wait(&spec.name, e))?
            .record;

        if record.status == FlowStatus::Failed {
            return Err(JobwatchError::RemoteFailure {
                name: record.name,
                status: record.status.to_string(),
                reason: record.failure_reason,
            });
        }
        record.arn.get_or_insert(arn);
        Ok(record)
    }

    /// Score every text; start a human loop for each low-confidence result.
    ///
    /// A failure after some loops were started is reported as
    /// [`JobwatchError::AnalysisInterrupted`] so their names are not lost.
    pub async fn analyze(
        &self,
        texts: &[String],
        flow_definition_arn: &str,
        threshold: f32,
    ) -> Result<Vec<AnalyzedText>, JobwatchError> {
        let mut analyzed = Vec::with_capacity(texts.len());
        for text in texts {
            match self.analyze_one(text, flow_definition_arn, threshold).await {
                Ok(item) => analyzed.push(item),
                Err(err) => {
                    let started: Vec<String> = analyzed
                        .into_iter()
                        .filter_map(|a: AnalyzedText| a.human_loop)
                        .collect();
                    if started.is_empty() {
                        return Err(err);
                    }
                    return Err(JobwatchError::AnalysisInterrupted {
                        started,
                        source: Box::new(err),
                    });
                }
            }
        }
        Ok(analyzed)
    }

    async fn analyze_one(
        &self,
        text: &str,
        flow_definition_arn: &str,
        threshold: f32,
    ) -> Result<AnalyzedText, JobwatchError> {
        let result = self
            .sentiment
            .detect(text, &self.config.review.language)
            .await?;

        let human_loop = if result.confidence() < threshold {
            let name = Uuid::new_v4().to_string();
            let input = json!({
                "taskObject": text,
                "initialValue": result.sentiment.to_string(),
            });
            self.review
                .start_human_loop(&name, flow_definition_arn, &input.to_string())
                .await?;
            tracing::info!(
                human_loop = %name,
                sentiment = %result.sentiment,
                confidence = result.confidence(),
                "low confidence, sent to human review"
            );
            Some(name)
        } else {
            tracing::debug!(
                sentiment = %result.sentiment,
                confidence = result.confidence(),
                "confident prediction"
            );
            None
        };

        Ok(AnalyzedText {
            text: text.to_string(),
            result,
            human_loop,
        })
    }

    /// Wait for one loop to finish. `Failed`/`Stopped` become [`JobwatchError::RemoteFailure`].
    pub async fn wait_loop(
        &self,
        name: &str,
        on_poll: impl FnMut(u32, &HumanLoopRecord),
    ) -> Result<HumanLoopRecord, JobwatchError> {
        let mut watch = HumanLoopWatch::new(self.review, name);
        let record = self
            .waiter
            .wait_observed(&mut watch, on_poll)
            .await
            .map_err(|e| JobwatchError::from_wait(name, e))?
            .record;

        if record.status.is_failure() {
            return Err(JobwatchError::RemoteFailure {
                name: record.name,
                status: record.status.to_string(),
                reason: record.failure_reason,
            });
        }
        Ok(record)
    }

    /// Read the reviewers' answers for a completed loop.
    pub async fn fetch_outcome(&self, record: &HumanLoopRecord) -> Result<ReviewOutcome, JobwatchError> {
        let uri: S3Uri = record
            .output_uri
            .as_deref()
            .ok_or_else(|| JobwatchError::MissingOutput(record.name.clone()))?
            .parse()?;
        let raw = self.store.get(&uri).await?;
        ReviewOutcome::parse(&record.name, &raw)
    }
}
