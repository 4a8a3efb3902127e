use std::path::Path;

use chrono::Utc;

use super::timestamped_name;
use crate::aws::{
    ObjectStore, ProcessingApi, ProcessingChannel, ProcessingJobSpec, ProcessingJobWatch, S3Uri,
};
use crate::config::JobwatchConfig;
use crate::error::JobwatchError;
use crate::waiter::{AsyncJobWaiter, ProcessingJobRecord};

const CONTAINER_INPUT: &str = "/opt/ml/processing/input";
const CONTAINER_CODE: &str = "/opt/ml/processing/input/code";

/// Submits the preprocessing job described by `[processing]` and waits on it.
pub struct ProcessingPipeline<'a, P, S> {
    api: &'a P,
    store: &'a S,
    config: &'a JobwatchConfig,
    waiter: AsyncJobWaiter,
}

impl<'a, P: ProcessingApi, S: ObjectStore> ProcessingPipeline<'a, P, S> {
    pub fn new(
        api: &'a P,
        store: &'a S,
        config: &'a JobwatchConfig,
        waiter: AsyncJobWaiter,
    ) -> Self {
        Self {
            api,
            store,
            config,
            waiter,
        }
    }

    fn base_uri(&self) -> Result<S3Uri, JobwatchError> {
        let bucket = JobwatchConfig::require("bucket", &self.config.bucket)?;
        Ok(S3Uri::new(bucket, self.config.processing.prefix.as_str()))
    }

    /// Where the preprocessing script lives in S3.
    pub fn code_uri(&self) -> Result<S3Uri, JobwatchError> {
        Ok(self
            .base_uri()?
            .join("code")
            .join(&self.config.processing.script_name))
    }

    /// Build the `CreateProcessingJob` request for a job called `name`.
    pub fn build_spec(&self, name: &str) -> Result<ProcessingJobSpec, JobwatchError> {
        let cfg = &self.config.processing;
        let role_arn = JobwatchConfig::require("role_arn", &self.config.role_arn)?;
        let input: S3Uri = cfg.input_uri.parse()?;
        let code = self.code_uri()?;
        let output = self.base_uri()?.join(name).join("output");

        Ok(ProcessingJobSpec {
            name: name.to_string(),
            role_arn: role_arn.to_string(),
            image_uri: cfg.image_uri.clone(),
            entrypoint: vec![
                "python3".to_string(),
                format!("{CONTAINER_CODE}/{}", cfg.script_name),
            ],
            arguments: vec![
                "--train-test-split-ratio".to_string(),
                cfg.train_test_split_ratio.to_string(),
            ],
            instance_type: cfg.instance_type.clone(),
            instance_count: cfg.instance_count,
            volume_size_gb: cfg.volume_size_gb,
            inputs: vec![
                ProcessingChannel {
                    name: "input-1".to_string(),
                    s3_uri: input.to_string(),
                    local_path: CONTAINER_INPUT.to_string(),
                },
                ProcessingChannel {
                    name: "code".to_string(),
                    s3_uri: code.to_string(),
                    local_path: CONTAINER_CODE.to_string(),
                },
            ],
            outputs: ["train", "test"]
                .into_iter()
                .map(|split| ProcessingChannel {
                    name: format!("{split}_data"),
                    s3_uri: output.join(&format!("{split}_data")).to_string(),
                    local_path: format!("/opt/ml/processing/{split}"),
                })
                .collect(),
            max_runtime_secs: cfg.max_runtime_secs,
        })
    }

    /// Upload a local preprocessing script to [`code_uri`](Self::code_uri).
    pub async fn upload_code(&self, path: &Path) -> Result<S3Uri, JobwatchError> {
        let body = tokio::fs::read(path).await?;
        let uri = self.code_uri()?;
        self.store.put(&uri, body, "text/x-python").await?;
        tracing::info!(%uri, "uploaded preprocessing script");
        Ok(uri)
    }

    /// Submit a freshly named job; returns its spec.
    pub async fn submit(&self) -> Result<ProcessingJobSpec, JobwatchError> {
        let name = timestamped_name(&self.config.processing.job_prefix, Utc::now());
        let spec = self.build_spec(&name)?;
        let arn = self.api.submit(&spec).await?;
        tracing::info!(job = %name, %arn, "processing job submitted");
        Ok(spec)
    }

    /// Wait for `name` to finish. `Failed`/`Stopped` become [`JobwatchError::RemoteFailure`].
    pub async fn wait(
        &self,
        name: &str,
        on_poll: impl FnMut(u32, &ProcessingJobRecord),
    ) -> Result<ProcessingJobRecord, JobwatchError> {
        tracing::debug!(
            job = %name,
            budget_secs = self.waiter.policy.budget().as_secs(),
            "waiting for processing job"
        );
        let mut watch = ProcessingJobWatch::new(self.api, name);
        let waited = self
            .waiter
            .wait_observed(&mut watch, on_poll)
            .await
            .map_err(|e| JobwatchError::from_wait(name, e))?;

        let record = waited.record;
        tracing::info!(
            job = %name,
            status = %record.status,
            attempts = waited.attempts,
            elapsed_ms = waited.elapsed.as_millis() as u64,
            "processing job finished"
        );
        if record.status.is_failure() {
            return Err(JobwatchError::RemoteFailure {
                name: record.name,
                status: record.status.to_string(),
                reason: record.failure_reason,
            });
        }
        Ok(record)
    }

    /// One `DescribeProcessingJob`, no waiting.
    pub async fn status(&self, name: &str) -> Result<ProcessingJobRecord, JobwatchError> {
        Ok(self.api.describe(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::aws::storage::tests::MemoryStore;
    use crate::pipeline::fakes::FakeProcessing;
    use crate::waiter::{JobStatus, WaitPolicy};

    fn config() -> JobwatchConfig {
        let mut config = JobwatchConfig::default();
        config.bucket = "ml-bucket".into();
        config.role_arn = "arn:aws:iam::123456789012:role/SageMakerRole".into();
        config
    }

    fn waiter(max_attempts: u32) -> AsyncJobWaiter {
        AsyncJobWaiter::new(WaitPolicy::new(Duration::from_millis(1), max_attempts))
    }

    #[test]
    fn spec_wires_inputs_outputs_and_arguments() {
        let config = config();
        let api = FakeProcessing::new(&[JobStatus::Completed]);
        let store = MemoryStore::default();
        let pipeline = ProcessingPipeline::new(&api, &store, &config, waiter(3));

        let spec = pipeline.build_spec("job-1").unwrap();

        assert_eq!(
            spec.entrypoint,
            vec!["python3", "/opt/ml/processing/input/code/preprocessing.py"]
        );
        assert_eq!(spec.arguments, vec!["--train-test-split-ratio", "0.2"]);
        assert_eq!(spec.inputs[0].local_path, "/opt/ml/processing/input");
        assert_eq!(
            spec.inputs[1].s3_uri,
            "s3://ml-bucket/sagemaker/sklearn-processing/code/preprocessing.py"
        );
        assert_eq!(spec.outputs.len(), 2);
        assert_eq!(spec.outputs[0].name, "train_data");
        assert_eq!(
            spec.outputs[0].s3_uri,
            "s3://ml-bucket/sagemaker/sklearn-processing/job-1/output/train_data"
        );
        assert_eq!(spec.outputs[1].local_path, "/opt/ml/processing/test");
    }

    #[test]
    fn spec_requires_role() {
        let mut config = config();
        config.role_arn.clear();
        let api = FakeProcessing::new(&[JobStatus::Completed]);
        let store = MemoryStore::default();
        let pipeline = ProcessingPipeline::new(&api, &store, &config, waiter(3));

        let err = pipeline.build_spec("job-1").unwrap_err();
        assert!(matches!(err, JobwatchError::Config(ref m) if m.contains("role_arn")));
    }

    #[tokio::test]
    async fn submit_then_wait_returns_outputs() {
        let config = config();
        let api = FakeProcessing::new(&[
            JobStatus::InProgress,
            JobStatus::InProgress,
            JobStatus::Completed,
        ]);
        let store = MemoryStore::default();
        let pipeline = ProcessingPipeline::new(&api, &store, &config, waiter(10));

        let spec = pipeline.submit().await.unwrap();
        assert!(spec.name.starts_with("sklearn-preprocessing-"));

        let mut polls = 0;
        let record = pipeline.wait(&spec.name, |_, _| polls += 1).await.unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.outputs.len(), 2);
        assert_eq!(polls, 3);
        assert_eq!(*api.describes.borrow(), 3);
    }

    #[tokio::test]
    async fn failed_job_is_reported_with_reason() {
        let config = config();
        let mut api = FakeProcessing::new(&[JobStatus::InProgress, JobStatus::Failed]);
        api.failure_reason = Some("ClientError: no such key".into());
        let store = MemoryStore::default();
        let pipeline = ProcessingPipeline::new(&api, &store, &config, waiter(10));

        let err = pipeline.wait("job-9", |_, _| {}).await.unwrap_err();
        match err {
            JobwatchError::RemoteFailure { name, status, reason } => {
                assert_eq!(name, "job-9");
                assert_eq!(status, "Failed");
                assert_eq!(reason.as_deref(), Some("ClientError: no such key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn wait_times_out_with_last_status() {
        let config = config();
        let api = FakeProcessing::new(&[JobStatus::InProgress]);
        let store = MemoryStore::default();
        let pipeline = ProcessingPipeline::new(&api, &store, &config, waiter(3));

        let err = pipeline.wait("job-slow", |_, _| {}).await.unwrap_err();
        assert!(matches!(
            err,
            JobwatchError::WaitTimeout { ref status, attempts: 3, .. } if status == "InProgress"
        ));
        assert_eq!(*api.describes.borrow(), 3);
    }

    #[tokio::test]
    async fn upload_code_puts_script_under_prefix() {
        let config = config();
        let api = FakeProcessing::new(&[JobStatus::Completed]);
        let store = MemoryStore::default();
        let pipeline = ProcessingPipeline::new(&api, &store, &config, waiter(3));

        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "print('preprocessing')").unwrap();

        let uri = pipeline.upload_code(script.path()).await.unwrap();
        let objects = store.objects.borrow();
        let (body, content_type) = objects.get(&uri).unwrap();
        assert_eq!(body, b"print('preprocessing')\n");
        assert_eq!(content_type, "text/x-python");
    }
}
