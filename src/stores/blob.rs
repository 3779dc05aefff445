use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;

use super::StoreError;
use crate::config::S3Config;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Delete a set of keys. Keys that no longer exist are ignored.
    async fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Delete one key, tolerating a missing object.
    async fn delete_one(&self, key: &str) -> Result<(), StoreError>;
}

/// S3-compatible blob store (used with SeaweedFS/MinIO in development).
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub async fn connect(config: &S3Config) -> Self {
        let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
        let base = aws_config::from_env().region(region_provider).load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&base)
            .endpoint_url(&config.endpoint)
            .credentials_provider(Credentials::new(
                &config.access_key,
                &config.secret_key,
                None,
                None,
                "atelier",
            ))
            .region(Region::new("us-east-1"))
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("list objects: {e}")))?;

            keys.extend(output.contents().iter().filter_map(|o| o.key().map(String::from)));

            match output.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        // DeleteObjects takes at most 1000 keys per request.
        for chunk in keys.chunks(1000) {
            let objects = chunk
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| StoreError::Backend(format!("object identifier: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(|e| StoreError::Backend(format!("delete spec: {e}")))?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("delete objects: {e}")))?;
        }
        Ok(())
    }

    async fn delete_one(&self, key: &str) -> Result<(), StoreError> {
        // S3 DeleteObject succeeds for keys that do not exist.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("delete object {key}: {e}")))?;
        Ok(())
    }
}
