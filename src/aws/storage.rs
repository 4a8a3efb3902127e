use std::fmt;
use std::str::FromStr;

use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use super::error::ServiceError;

/// A parsed `s3://bucket/key` location. The key may be empty (bucket root).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct S3Uri {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not an s3:// URI: {0}")]
pub struct InvalidS3Uri(pub String);

impl S3Uri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into().trim_start_matches('/').to_string(),
        }
    }

    /// Append a path segment, inserting exactly one `/` between parts.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        let key = if self.key.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", self.key.trim_end_matches('/'), segment)
        };
        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }
}

impl FromStr for S3Uri {
    type Err = InvalidS3Uri;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("s3://")
            .ok_or_else(|| InvalidS3Uri(s.to_string()))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(InvalidS3Uri(s.to_string()));
        }
        Ok(Self::new(bucket, key))
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Read/write access to object storage.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn get(&self, uri: &S3Uri) -> Result<Vec<u8>, ServiceError>;

    async fn put(&self, uri: &S3Uri, body: Vec<u8>, content_type: &str)
    -> Result<(), ServiceError>;
}

/// [`ObjectStore`] backed by Amazon S3.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for S3Store {
    async fn get(&self, uri: &S3Uri) -> Result<Vec<u8>, ServiceError> {
        tracing::debug!(%uri, "downloading object");
        let resp = self
            .client
            .get_object()
            .bucket(&uri.bucket)
            .key(&uri.key)
            .send()
            .await
            .map_err(ServiceError::sdk("GetObject"))?;

        let mut data = Vec::new();
        let mut stream = resp.body.into_async_read();
        stream
            .read_to_end(&mut data)
            .await
            .map_err(ServiceError::sdk("GetObject"))?;
        Ok(data)
    }

    async fn put(
        &self,
        uri: &S3Uri,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ServiceError> {
        tracing::debug!(%uri, bytes = body.len(), "uploading object");
        self.client
            .put_object()
            .bucket(&uri.bucket)
            .key(&uri.key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(ServiceError::sdk("PutObject"))?;
        Ok(())
    }
}

/// First `lines` lines of a UTF-8 object (lossy on invalid bytes).
pub async fn preview(
    store: &impl ObjectStore,
    uri: &S3Uri,
    lines: usize,
) -> Result<Vec<String>, ServiceError> {
    let bytes = store.get(uri).await?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .take(lines)
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// In-memory store used across the crate's tests.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub objects: RefCell<HashMap<S3Uri, (Vec<u8>, String)>>,
    }

    impl MemoryStore {
        pub fn with(uri: &str, body: &str) -> Self {
            let store = Self::default();
            store.objects.borrow_mut().insert(
                uri.parse().unwrap(),
                (body.as_bytes().to_vec(), "application/json".into()),
            );
            store
        }
    }

    impl ObjectStore for MemoryStore {
        async fn get(&self, uri: &S3Uri) -> Result<Vec<u8>, ServiceError> {
            self.objects
                .borrow()
                .get(uri)
                .map(|(body, _)| body.clone())
                .ok_or_else(|| ServiceError::Sdk {
                    operation: "GetObject",
                    message: format!("NoSuchKey: {uri}"),
                })
        }

        async fn put(
            &self,
            uri: &S3Uri,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<(), ServiceError> {
            self.objects
                .borrow_mut()
                .insert(uri.clone(), (body, content_type.to_string()));
            Ok(())
        }
    }

    #[test]
    fn parses_bucket_and_key() {
        let uri: S3Uri = "s3://my-bucket/a2i-results/flow/output.json".parse().unwrap();
        assert_eq!(uri.bucket, "my-bucket");
        assert_eq!(uri.key, "a2i-results/flow/output.json");
    }

    #[test]
    fn parses_bucket_root() {
        let uri: S3Uri = "s3://my-bucket".parse().unwrap();
        assert_eq!(uri.key, "");
        assert_eq!(uri.to_string(), "s3://my-bucket/");
    }

    #[test]
    fn rejects_non_s3_uris() {
        assert!("https://example.com/x".parse::<S3Uri>().is_err());
        assert!("s3:///key-only".parse::<S3Uri>().is_err());
    }

    #[test]
    fn join_normalises_slashes() {
        let base = S3Uri::new("b", "sagemaker/processing/");
        assert_eq!(
            base.join("/train").to_string(),
            "s3://b/sagemaker/processing/train"
        );
        assert_eq!(S3Uri::new("b", "").join("code").key, "code");
    }

    #[tokio::test]
    async fn preview_returns_leading_lines() {
        let store = MemoryStore::with("s3://b/train/train_features.csv", "a,b\n1,2\n3,4\n5,6\n");
        let uri: S3Uri = "s3://b/train/train_features.csv".parse().unwrap();
        let lines = preview(&store, &uri, 2).await.unwrap();
        assert_eq!(lines, vec!["a,b", "1,2"]);
    }
}
