// S3 blob store backed by the AWS SDK
//
// Works against AWS S3 and S3-compatible gateways (MinIO, Supabase storage,
// LocalStack). Custom endpoints use path-style addressing.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::{Blob, BlobStore, StorageError};
use crate::config::S3StorageConfig;

/// Cache-Control stored on rendered objects (one year)
const OBJECT_CACHE_CONTROL: &str = "max-age=31536000";

pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub fn new(config: &S3StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "catalog-image-proxy",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn download(&self, namespace: &str, key: &str) -> Result<Option<Blob>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(namespace)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                // Some gateways answer a bare 404 without the NoSuchKey code
                if err
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(StorageError::Transport(
                    DisplayErrorContext(&err).to_string(),
                ));
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transport(format!("failed to read S3 body: {}", e)))?;

        Ok(Some(Blob::new(data.into_bytes(), content_type)))
    }

    async fn upload(
        &self,
        namespace: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(namespace)
            .key(key)
            .content_type(content_type)
            .cache_control(OBJECT_CACHE_CONTROL)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Transport(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_store_with_custom_endpoint() {
        let config = S3StorageConfig {
            region: "us-east-1".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key: "minio".to_string(),
            secret_key: "minio123".to_string(),
        };
        let store = S3BlobStore::new(&config);
        assert_eq!(store.backend_name(), "s3");
    }
}
