//! Blob storage for feedback images.
//!
//! [`S3BlobStore`] writes objects with a `public-read` ACL and returns the
//! public URL built from the configured base URL and the object key.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use rand::distr::Alphanumeric;
use rand::Rng;

/// Prefix every feedback image key is written under.
pub const FEEDBACK_IMAGE_PREFIX: &str = "feedback-images";

/// Length of the random part of a generated key.
const KEY_SUFFIX_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Errors from a [`BlobStore`].
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The storage service rejected or failed the write.
    #[error("Blob upload failed: {0}")]
    Upload(String),
}

/// One object to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    /// Object key inside the bucket.
    pub key: String,
    /// MIME type stored as the object's `Content-Type`.
    pub content_type: String,
    /// Raw object bytes.
    pub bytes: Vec<u8>,
    /// Whether the object should be publicly readable.
    pub public: bool,
}

/// Blob storage collaborator.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `object` and return its public URL.
    async fn upload(&self, object: BlobObject) -> Result<String, BlobError>;
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

/// Generate a unique key: `feedback-images/<unix-millis>-<random>.<ext>`.
pub fn generate_blob_key(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(KEY_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{FEEDBACK_IMAGE_PREFIX}/{millis}-{suffix}.{extension}")
}

/// Join a public base URL and an object key.
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key.trim_start_matches('/'))
}

// ---------------------------------------------------------------------------
// S3BlobStore
// ---------------------------------------------------------------------------

/// [`BlobStore`] backed by an S3-compatible bucket.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3BlobStore {
    /// Wrap an existing S3 client.
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Build a client from the standard AWS environment (credentials,
    /// region, endpoint overrides).
    pub async fn from_env(bucket: String, public_base_url: String) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&sdk_config), bucket, public_base_url)
    }

    /// Bucket objects are written to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, object: BlobObject) -> Result<String, BlobError> {
        let size = object.bytes.len();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&object.key)
            .content_type(&object.content_type)
            .body(ByteStream::from(object.bytes));
        if object.public {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request
            .send()
            .await
            .map_err(|e| BlobError::Upload(DisplayErrorContext(&e).to_string()))?;

        tracing::info!(bucket = %self.bucket, key = %object.key, size, "Uploaded blob");
        Ok(public_url(&self.public_base_url, &object.key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_has_prefix_timestamp_suffix_and_extension() {
        let key = generate_blob_key("png");
        let rest = key.strip_prefix("feedback-images/").unwrap();
        let (stem, ext) = rest.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        let (millis, suffix) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), KEY_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_blob_key("png"), generate_blob_key("png"));
    }

    #[test]
    fn public_url_joins_without_double_slashes() {
        assert_eq!(
            public_url("https://bucket.s3.amazonaws.com/", "/feedback-images/a.png"),
            "https://bucket.s3.amazonaws.com/feedback-images/a.png"
        );
    }

    #[test]
    fn upload_error_display() {
        let err = BlobError::Upload("AccessDenied".into());
        assert_eq!(err.to_string(), "Blob upload failed: AccessDenied");
    }
}
