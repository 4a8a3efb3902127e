use aws_sdk_sagemaker::Client;
use aws_sdk_sagemaker::types::{
    AppSpecification, ProcessingClusterConfig, ProcessingInput, ProcessingInstanceType,
    ProcessingJobStatus, ProcessingOutput, ProcessingOutputConfig, ProcessingResources,
    ProcessingS3DataType, ProcessingS3Input, ProcessingS3InputMode, ProcessingS3Output,
    ProcessingS3UploadMode, ProcessingStoppingCondition,
};
use serde::{Deserialize, Serialize};

use super::error::ServiceError;
use crate::waiter::{JobStatus, ProcessingJobRecord, StatusSource};

/// One S3 location mounted into (or collected from) the processing container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingChannel {
    pub name: String,
    pub s3_uri: String,
    pub local_path: String,
}

/// Everything `CreateProcessingJob` needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJobSpec {
    pub name: String,
    pub role_arn: String,
    pub image_uri: String,
    pub entrypoint: Vec<String>,
    pub arguments: Vec<String>,
    pub instance_type: String,
    pub instance_count: i32,
    pub volume_size_gb: i32,
    pub inputs: Vec<ProcessingChannel>,
    pub outputs: Vec<ProcessingChannel>,
    pub max_runtime_secs: Option<i32>,
}

/// Managed batch-processing job service.
#[allow(async_fn_in_trait)]
pub trait ProcessingApi {
    /// Submit the job; returns its ARN.
    async fn submit(&self, spec: &ProcessingJobSpec) -> Result<String, ServiceError>;

    async fn describe(&self, name: &str) -> Result<ProcessingJobRecord, ServiceError>;
}

/// [`ProcessingApi`] backed by SageMaker Processing.
pub struct SageMakerProcessing {
    client: Client,
}

impl SageMakerProcessing {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn input_of(channel: &ProcessingChannel) -> ProcessingInput {
    let s3 = ProcessingS3Input::builder()
        .s3_uri(&channel.s3_uri)
        .local_path(&channel.local_path)
        .s3_data_type(ProcessingS3DataType::from("S3Prefix"))
        .s3_input_mode(ProcessingS3InputMode::from("File"))
        .build();
    ProcessingInput::builder()
        .input_name(&channel.name)
        .s3_input(s3)
        .build()
}

fn output_of(channel: &ProcessingChannel) -> ProcessingOutput {
    let s3 = ProcessingS3Output::builder()
        .s3_uri(&channel.s3_uri)
        .local_path(&channel.local_path)
        .s3_upload_mode(ProcessingS3UploadMode::from("EndOfJob"))
        .build();
    ProcessingOutput::builder()
        .output_name(&channel.name)
        .s3_output(s3)
        .build()
}

impl ProcessingApi for SageMakerProcessing {
    async fn submit(&self, spec: &ProcessingJobSpec) -> Result<String, ServiceError> {
        let app = AppSpecification::builder()
            .image_uri(&spec.image_uri)
            .set_container_entrypoint(Some(spec.entrypoint.clone()))
            .set_container_arguments(Some(spec.arguments.clone()))
            .build();

        let cluster = ProcessingClusterConfig::builder()
            .instance_count(spec.instance_count)
            .instance_type(ProcessingInstanceType::from(spec.instance_type.as_str()))
            .volume_size_in_gb(spec.volume_size_gb)
            .build();
        let resources = ProcessingResources::builder().cluster_config(cluster).build();

        let inputs = spec.inputs.iter().map(input_of).collect();
        let outputs = spec.outputs.iter().map(output_of).collect();
        let output_config = ProcessingOutputConfig::builder()
            .set_outputs(Some(outputs))
            .build();

        let mut req = self
            .client
            .create_processing_job()
            .processing_job_name(&spec.name)
            .role_arn(&spec.role_arn)
            .app_specification(app)
            .processing_resources(resources)
            .set_processing_inputs(Some(inputs))
            .processing_output_config(output_config);
        if let Some(secs) = spec.max_runtime_secs {
            let stop = ProcessingStoppingCondition::builder()
                .max_runtime_in_seconds(secs)
                .build();
            req = req.stopping_condition(stop);
        }

        tracing::info!(job = %spec.name, instance_type = %spec.instance_type, "submitting processing job");
        let out = req
            .send()
            .await
            .map_err(ServiceError::sdk("CreateProcessingJob"))?;

        let arn: Option<&str> = out.processing_job_arn().into();
        arn.map(str::to_string).ok_or(ServiceError::MissingField {
            operation: "CreateProcessingJob",
            field: "ProcessingJobArn",
        })
    }

    async fn describe(&self, name: &str) -> Result<ProcessingJobRecord, ServiceError> {
        let out = self
            .client
            .describe_processing_job()
            .processing_job_name(name)
            .send()
            .await
            .map_err(ServiceError::sdk("DescribeProcessingJob"))?;

        // Required members come back as plain references, optional ones as Option.
        let status: Option<&ProcessingJobStatus> = out.processing_job_status().into();
        let status = status.ok_or(ServiceError::MissingField {
            operation: "DescribeProcessingJob",
            field: "ProcessingJobStatus",
        })?;

        let config: Option<&ProcessingOutputConfig> = out.processing_output_config().into();
        let outputs = config
            .map(|c| {
                c.outputs()
                    .iter()
                    .filter_map(|o| {
                        let name: Option<&str> = o.output_name().into();
                        let s3: Option<&ProcessingS3Output> = o.s3_output().into();
                        let uri: Option<&str> = s3.and_then(|s| s.s3_uri().into());
                        Some((name?.to_string(), uri?.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ProcessingJobRecord {
            name: name.to_string(),
            status: JobStatus::from_service(status.as_str()),
            outputs,
            failure_reason: out.failure_reason().map(str::to_string),
        })
    }
}

/// Polls one processing job by name.
pub struct ProcessingJobWatch<'a, P> {
    api: &'a P,
    name: String,
}

impl<'a, P: ProcessingApi> ProcessingJobWatch<'a, P> {
    pub fn new(api: &'a P, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }
}

impl<P: ProcessingApi> StatusSource for ProcessingJobWatch<'_, P> {
    type Record = ProcessingJobRecord;
    type Error = ServiceError;

    async fn fetch(&mut self) -> Result<Self::Record, Self::Error> {
        self.api.describe(&self.name).await
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_sagemaker::config::{BehaviorVersion, Credentials, Region};
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> SageMakerProcessing {
        let config = aws_sdk_sagemaker::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKID", "secret", None, None, "test"))
            .endpoint_url(server.uri())
            .build();
        SageMakerProcessing::new(Client::from_conf(config))
    }

    #[tokio::test]
    async fn describe_maps_status_and_outputs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{
                    "ProcessingJobName": "sklearn-preprocessing-1",
                    "ProcessingJobArn": "arn:aws:sagemaker:us-east-1:123456789012:processing-job/sklearn-preprocessing-1",
                    "ProcessingJobStatus": "Completed",
                    "CreationTime": 1700000000,
                    "AppSpecification": {"ImageUri": "683313688378.dkr.ecr.us-east-1.amazonaws.com/sagemaker-scikit-learn:0.20.0-cpu-py3"},
                    "ProcessingResources": {"ClusterConfig": {"InstanceCount": 1, "InstanceType": "ml.m5.xlarge", "VolumeSizeInGB": 30}},
                    "ProcessingOutputConfig": {"Outputs": [
                        {"OutputName": "train_data", "S3Output": {"S3Uri": "s3://bucket/out/train", "LocalPath": "/opt/ml/processing/train", "S3UploadMode": "EndOfJob"}},
                        {"OutputName": "test_data", "S3Output": {"S3Uri": "s3://bucket/out/test", "LocalPath": "/opt/ml/processing/test", "S3UploadMode": "EndOfJob"}}
                    ]}
                }"#,
                "application/x-amz-json-1.1",
            ))
            .mount(&server)
            .await;

        let record = client_for(&server)
            .describe("sklearn-preprocessing-1")
            .await
            .unwrap();

        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(
            record.outputs,
            vec![
                ("train_data".to_string(), "s3://bucket/out/train".to_string()),
                ("test_data".to_string(), "s3://bucket/out/test".to_string()),
            ]
        );
        assert_eq!(record.failure_reason, None);
    }

    #[tokio::test]
    async fn describe_keeps_failure_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{
                    "ProcessingJobName": "job-2",
                    "ProcessingJobArn": "arn:aws:sagemaker:us-east-1:123456789012:processing-job/job-2",
                    "ProcessingJobStatus": "Failed",
                    "FailureReason": "AlgorithmError: script exited with 1",
                    "CreationTime": 1700000000,
                    "AppSpecification": {"ImageUri": "image"},
                    "ProcessingResources": {"ClusterConfig": {"InstanceCount": 1, "InstanceType": "ml.m5.xlarge", "VolumeSizeInGB": 30}}
                }"#,
                "application/x-amz-json-1.1",
            ))
            .mount(&server)
            .await;

        let record = client_for(&server).describe("job-2").await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.outputs.is_empty());
        assert_eq!(
            record.failure_reason.as_deref(),
            Some("AlgorithmError: script exited with 1")
        );
    }

    #[tokio::test]
    async fn submit_sends_channels_and_stopping_condition() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", "SageMaker.CreateProcessingJob"))
            .and(body_partial_json(serde_json::json!({
                "ProcessingJobName": "job-3",
                "RoleArn": "arn:aws:iam::123456789012:role/SageMakerRole",
                "AppSpecification": {
                    "ContainerEntrypoint": ["python3", "/opt/ml/processing/input/code/preprocessing.py"],
                    "ContainerArguments": ["--train-test-split-ratio", "0.2"]
                },
                "ProcessingResources": {"ClusterConfig": {"InstanceCount": 1, "InstanceType": "ml.m5.xlarge", "VolumeSizeInGB": 30}},
                "ProcessingInputs": [{
                    "InputName": "input-1",
                    "S3Input": {"S3Uri": "s3://bucket/raw", "LocalPath": "/opt/ml/processing/input", "S3DataType": "S3Prefix", "S3InputMode": "File"}
                }],
                "ProcessingOutputConfig": {"Outputs": [{
                    "OutputName": "train_data",
                    "S3Output": {"S3Uri": "s3://bucket/out/train_data", "LocalPath": "/opt/ml/processing/train", "S3UploadMode": "EndOfJob"}
                }]},
                "StoppingCondition": {"MaxRuntimeInSeconds": 3600}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"ProcessingJobArn": "arn:aws:sagemaker:us-east-1:123456789012:processing-job/job-3"}"#,
                "application/x-amz-json-1.1",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let spec = ProcessingJobSpec {
            name: "job-3".into(),
            role_arn: "arn:aws:iam::123456789012:role/SageMakerRole".into(),
            image_uri: "image".into(),
            entrypoint: vec![
                "python3".into(),
                "/opt/ml/processing/input/code/preprocessing.py".into(),
            ],
            arguments: vec!["--train-test-split-ratio".into(), "0.2".into()],
            instance_type: "ml.m5.xlarge".into(),
            instance_count: 1,
            volume_size_gb: 30,
            inputs: vec![ProcessingChannel {
                name: "input-1".into(),
                s3_uri: "s3://bucket/raw".into(),
                local_path: "/opt/ml/processing/input".into(),
            }],
            outputs: vec![ProcessingChannel {
                name: "train_data".into(),
                s3_uri: "s3://bucket/out/train_data".into(),
                local_path: "/opt/ml/processing/train".into(),
            }],
            max_runtime_secs: Some(3600),
        };

        let arn = client_for(&server).submit(&spec).await.unwrap();
        assert_eq!(
            arn,
            "arn:aws:sagemaker:us-east-1:123456789012:processing-job/job-3"
        );
    }
}
