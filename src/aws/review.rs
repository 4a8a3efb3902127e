use aws_sdk_sagemaker::types::{
    FlowDefinitionOutputConfig, FlowDefinitionStatus, HumanLoopConfig, UiTemplate,
};
use aws_sdk_sagemakera2iruntime::types as a2i;
use serde::{Deserialize, Serialize};

use super::error::ServiceError;
use crate::waiter::{
    FlowDefinitionRecord, FlowStatus, HumanLoopRecord, HumanLoopStatus, StatusSource,
};

/// Everything `CreateFlowDefinition` needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinitionSpec {
    pub name: String,
    pub role_arn: String,
    pub workteam_arn: String,
    pub human_task_ui_arn: String,
    pub task_title: String,
    pub task_description: String,
    pub task_count: i32,
    pub output_path: String,
}

/// Human-review workflow service (SageMaker flow definitions + A2I runtime).
#[allow(async_fn_in_trait)]
pub trait ReviewApi {
    /// Register a worker task template; returns the task UI ARN.
    async fn create_task_ui(&self, name: &str, template: &str) -> Result<String, ServiceError>;

    /// Returns the flow definition ARN.
    async fn create_flow_definition(
        &self,
        spec: &FlowDefinitionSpec,
    ) -> Result<String, ServiceError>;

    async fn describe_flow_definition(
        &self,
        name: &str,
    ) -> Result<FlowDefinitionRecord, ServiceError>;

    /// Start a loop with a JSON input document; returns the loop ARN.
    async fn start_human_loop(
        &self,
        name: &str,
        flow_definition_arn: &str,
        input_json: &str,
    ) -> Result<String, ServiceError>;

    async fn describe_human_loop(&self, name: &str) -> Result<HumanLoopRecord, ServiceError>;
}

/// [`ReviewApi`] backed by SageMaker and the Augmented AI runtime.
pub struct A2iClient {
    sagemaker: aws_sdk_sagemaker::Client,
    runtime: aws_sdk_sagemakera2iruntime::Client,
}

impl A2iClient {
    pub fn new(
        sagemaker: aws_sdk_sagemaker::Client,
        runtime: aws_sdk_sagemakera2iruntime::Client,
    ) -> Self {
        Self { sagemaker, runtime }
    }
}

impl ReviewApi for A2iClient {
    async fn create_task_ui(&self, name: &str, template: &str) -> Result<String, ServiceError> {
        let template = UiTemplate::builder().content(template).build();
        let out = self
            .sagemaker
            .create_human_task_ui()
            .human_task_ui_name(name)
            .ui_template(template)
            .send()
            .await
            .map_err(ServiceError::sdk("CreateHumanTaskUi"))?;

        let arn: Option<&str> = out.human_task_ui_arn().into();
        arn.map(str::to_string).ok_or(ServiceError::MissingField {
            operation: "CreateHumanTaskUi",
            field: "HumanTaskUiArn",
        })
    }

    async fn create_flow_definition(
        &self,
        spec: &FlowDefinitionSpec,
    ) -> Result<String, ServiceError> {
        let loop_config = HumanLoopConfig::builder()
            .workteam_arn(&spec.workteam_arn)
            .human_task_ui_arn(&spec.human_task_ui_arn)
            .task_title(&spec.task_title)
            .task_description(&spec.task_description)
            .task_count(spec.task_count)
            .build();
        let output = FlowDefinitionOutputConfig::builder()
            .s3_output_path(&spec.output_path)
            .build();

        tracing::info!(flow = %spec.name, "creating flow definition");
        let out = self
            .sagemaker
            .create_flow_definition()
            .flow_definition_name(&spec.name)
            .role_arn(&spec.role_arn)
            .human_loop_config(loop_config)
            .output_config(output)
            .send()
            .await
            .map_err(ServiceError::sdk("CreateFlowDefinition"))?;

        let arn: Option<&str> = out.flow_definition_arn().into();
        arn.map(str::to_string).ok_or(ServiceError::MissingField {
            operation: "CreateFlowDefinition",
            field: "FlowDefinitionArn",
        })
    }

    async fn describe_flow_definition(
        &self,
        name: &str,
    ) -> Result<FlowDefinitionRecord, ServiceError> {
        let out = self
            .sagemaker
            .describe_flow_definition()
            .flow_definition_name(name)
            .send()
            .await
            .map_err(ServiceError::sdk("DescribeFlowDefinition"))?;

        let status: Option<&FlowDefinitionStatus> = out.flow_definition_status().into();
        let status = status.ok_or(ServiceError::MissingField {
            operation: "DescribeFlowDefinition",
            field: "FlowDefinitionStatus",
        })?;
        let arn: Option<&str> = out.flow_definition_arn().into();

        Ok(FlowDefinitionRecord {
            name: name.to_string(),
            arn: arn.map(str::to_string),
            status: FlowStatus::from_service(status.as_str()),
            failure_reason: out.failure_reason().map(str::to_string),
        })
    }

    async fn start_human_loop(
        &self,
        name: &str,
        flow_definition_arn: &str,
        input_json: &str,
    ) -> Result<String, ServiceError> {
        let input = a2i::HumanLoopInput::builder().input_content(input_json).build();
        let out = self
            .runtime
            .start_human_loop()
            .human_loop_name(name)
            .flow_definition_arn(flow_definition_arn)
            .human_loop_input(input)
            .send()
            .await
            .map_err(ServiceError::sdk("StartHumanLoop"))?;

        let arn: Option<&str> = out.human_loop_arn().into();
        arn.map(str::to_string).ok_or(ServiceError::MissingField {
            operation: "StartHumanLoop",
            field: "HumanLoopArn",
        })
    }

    async fn describe_human_loop(&self, name: &str) -> Result<HumanLoopRecord, ServiceError> {
        let out = self
            .runtime
            .describe_human_loop()
            .human_loop_name(name)
            .send()
            .await
            .map_err(ServiceError::sdk("DescribeHumanLoop"))?;

        let status: Option<&a2i::HumanLoopStatus> = out.human_loop_status().into();
        let status = status.ok_or(ServiceError::MissingField {
            operation: "DescribeHumanLoop",
            field: "HumanLoopStatus",
        })?;
        let output: Option<&a2i::HumanLoopOutput> = out.human_loop_output().into();
        let output_uri: Option<&str> = output.and_then(|o| o.output_s3_uri().into());

        Ok(HumanLoopRecord {
            name: name.to_string(),
            status: HumanLoopStatus::from_service(status.as_str()),
            output_uri: output_uri.map(str::to_string),
            failure_reason: out.failure_reason().map(str::to_string),
        })
    }
}

/// Polls one human loop by name.
pub struct HumanLoopWatch<'a, R> {
    api: &'a R,
    name: String,
}

impl<'a, R: ReviewApi> HumanLoopWatch<'a, R> {
    pub fn new(api: &'a R, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }
}

impl<R: ReviewApi> StatusSource for HumanLoopWatch<'_, R> {
    type Record = HumanLoopRecord;
    type Error = ServiceError;

    async fn fetch(&mut self) -> Result<Self::Record, Self::Error> {
        self.api.describe_human_loop(&self.name).await
    }
}

/// Polls a flow definition until it leaves `Initializing`.
pub struct FlowDefinitionWatch<'a, R> {
    api: &'a R,
    name: String,
}

impl<'a, R: ReviewApi> FlowDefinitionWatch<'a, R> {
    pub fn new(api: &'a R, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }
}

impl<R: ReviewApi> StatusSource for FlowDefinitionWatch<'_, R> {
    type Record = FlowDefinitionRecord;
    type Error = ServiceError;

    async fn fetch(&mut self) -> Result<Self::Record, Self::Error> {
        self.api.describe_flow_definition(&self.name).await
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_sagemaker::config::{BehaviorVersion, Credentials, Region};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> A2iClient {
        let credentials = Credentials::new("AKID", "secret", None, None, "test");
        let sagemaker = aws_sdk_sagemaker::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials.clone())
            .endpoint_url(server.uri())
            .build();
        let runtime = aws_sdk_sagemakera2iruntime::Config::builder()
            .behavior_version(aws_sdk_sagemakera2iruntime::config::BehaviorVersion::latest())
            .region(aws_sdk_sagemakera2iruntime::config::Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(server.uri())
            .build();
        A2iClient::new(
            aws_sdk_sagemaker::Client::from_conf(sagemaker),
            aws_sdk_sagemakera2iruntime::Client::from_conf(runtime),
        )
    }

    #[tokio::test]
    async fn task_ui_sends_template_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", "SageMaker.CreateHumanTaskUi"))
            .and(body_partial_json(serde_json::json!({
                "HumanTaskUiName": "ui-1",
                "UiTemplate": {"Content": "<crowd-form></crowd-form>"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"HumanTaskUiArn": "arn:aws:sagemaker:us-east-1:123456789012:human-task-ui/ui-1"}"#,
                "application/x-amz-json-1.1",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let arn = client_for(&server)
            .create_task_ui("ui-1", "<crowd-form></crowd-form>")
            .await
            .unwrap();
        assert!(arn.ends_with("human-task-ui/ui-1"));
    }

    #[tokio::test]
    async fn flow_definition_sends_loop_and_output_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", "SageMaker.CreateFlowDefinition"))
            .and(body_partial_json(serde_json::json!({
                "FlowDefinitionName": "flow-1",
                "RoleArn": "arn:aws:iam::123456789012:role/SageMakerRole",
                "HumanLoopConfig": {
                    "WorkteamArn": "arn:aws:sagemaker:us-east-1:123456789012:workteam/private-crowd/team",
                    "HumanTaskUiArn": "arn:aws:sagemaker:us-east-1:123456789012:human-task-ui/ui-1",
                    "TaskCount": 1
                },
                "OutputConfig": {"S3OutputPath": "s3://bucket/a2i-results"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"FlowDefinitionArn": "arn:aws:sagemaker:us-east-1:123456789012:flow-definition/flow-1"}"#,
                "application/x-amz-json-1.1",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let spec = FlowDefinitionSpec {
            name: "flow-1".into(),
            role_arn: "arn:aws:iam::123456789012:role/SageMakerRole".into(),
            workteam_arn: "arn:aws:sagemaker:us-east-1:123456789012:workteam/private-crowd/team"
                .into(),
            human_task_ui_arn: "arn:aws:sagemaker:us-east-1:123456789012:human-task-ui/ui-1"
                .into(),
            task_title: "Classify sentiment".into(),
            task_description: "Pick the sentiment of the text".into(),
            task_count: 1,
            output_path: "s3://bucket/a2i-results".into(),
        };

        let arn = client_for(&server)
            .create_flow_definition(&spec)
            .await
            .unwrap();
        assert!(arn.ends_with("flow-definition/flow-1"));
    }

    #[tokio::test]
    async fn human_loop_sends_input_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/human-loops"))
            .and(body_partial_json(serde_json::json!({
                "HumanLoopName": "loop-1",
                "FlowDefinitionArn": "arn:flow",
                "HumanLoopInput": {"InputContent": r#"{"taskObject":"meh"}"#}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"HumanLoopArn": "arn:aws:sagemaker:us-east-1:123456789012:human-loop/loop-1"}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let arn = client_for(&server)
            .start_human_loop("loop-1", "arn:flow", r#"{"taskObject":"meh"}"#)
            .await
            .unwrap();
        assert!(arn.ends_with("human-loop/loop-1"));
    }
}
