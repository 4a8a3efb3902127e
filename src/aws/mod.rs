pub mod error;
pub mod processing;
pub mod review;
pub mod sentiment;
pub mod storage;

pub use error::ServiceError;
pub use processing::{
    ProcessingApi, ProcessingChannel, ProcessingJobSpec, ProcessingJobWatch, SageMakerProcessing,
};
pub use review::{A2iClient, FlowDefinitionSpec, FlowDefinitionWatch, HumanLoopWatch, ReviewApi};
pub use sentiment::{ComprehendClient, Sentiment, SentimentApi, SentimentResult, SentimentScores};
pub use storage::{InvalidS3Uri, ObjectStore, S3Store, S3Uri};

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};

/// Service clients sharing one resolved AWS configuration.
pub struct AwsClients {
    pub processing: SageMakerProcessing,
    pub review: A2iClient,
    pub sentiment: ComprehendClient,
    pub store: S3Store,
}

impl AwsClients {
    /// Resolve credentials and region the standard way (env, profile, IMDS).
    /// An explicit `region` wins over the provider chain.
    pub async fn load(region: Option<&str>) -> Self {
        let region = RegionProviderChain::first_try(region.map(|r| Region::new(r.to_string())))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;
        tracing::debug!(region = ?shared.region(), "loaded AWS configuration");

        let sagemaker = aws_sdk_sagemaker::Client::new(&shared);
        Self {
            processing: SageMakerProcessing::new(sagemaker.clone()),
            review: A2iClient::new(sagemaker, aws_sdk_sagemakera2iruntime::Client::new(&shared)),
            sentiment: ComprehendClient::new(aws_sdk_comprehend::Client::new(&shared)),
            store: S3Store::new(aws_sdk_s3::Client::new(&shared)),
        }
    }
}
