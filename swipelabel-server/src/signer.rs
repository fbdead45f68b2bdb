//! Time-limited download URLs for image objects.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;

/// Issues credential-free URLs for objects in image storage.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// A `GET` URL for `object_key`, valid for `expires_in`.
    async fn signed_url(&self, object_key: &str, expires_in: Duration) -> Result<String>;
}

/// Presigns S3 `GetObject` requests against a single bucket.
///
/// The object key is signed exactly as given: no segment normalization and no
/// escaping beyond what the request URI itself needs.
pub struct S3UrlSigner {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3UrlSigner {
    pub fn new(
        region: &str,
        bucket: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<Self> {
        if bucket.is_empty() {
            bail!("S3 bucket name must not be empty");
        }
        if region.is_empty() {
            bail!("AWS region must not be empty");
        }

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "swipelabel-config",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl UrlSigner for S3UrlSigner {
    async fn signed_url(&self, object_key: &str, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .with_context(|| format!("Invalid URL validity {:?}", expires_in))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .presigned(presigning)
            .await
            .with_context(|| format!("Failed to presign s3://{}/{}", self.bucket, object_key))?;
        Ok(request.uri().to_string())
    }
}
