use lumiere_core::feedback::DEFAULT_FEEDBACK_COLLECTION;

/// Default timeout for outbound HTTP requests (seconds).
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Collaborator configuration loaded from environment variables.
///
/// Every endpoint is optional; a missing one leaves the matching
/// collaborator unconfigured instead of failing startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudConfig {
    /// Base URL of the image-generation service.
    pub generation_api_url: Option<String>,
    /// Base URL of the document store REST API.
    pub document_store_url: Option<String>,
    /// Bearer credential for the document store.
    pub document_store_token: Option<String>,
    /// Bucket feedback images are uploaded to.
    pub feedback_bucket: Option<String>,
    /// Public URL prefix for uploaded objects. Defaults to the bucket's
    /// virtual-hosted S3 URL.
    pub feedback_public_base_url: Option<String>,
    /// Collection feedback records are written to.
    pub feedback_collection: String,
    /// Timeout applied to each outbound HTTP request.
    pub http_timeout_secs: u64,
}

impl CloudConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Default                              |
    /// |----------------------------|--------------------------------------|
    /// | `GENERATION_API_URL`       | unset                                |
    /// | `DOCUMENT_STORE_URL`       | unset                                |
    /// | `DOCUMENT_STORE_TOKEN`     | unset                                |
    /// | `FEEDBACK_BUCKET`          | unset                                |
    /// | `FEEDBACK_PUBLIC_BASE_URL` | `https://{bucket}.s3.amazonaws.com`  |
    /// | `FEEDBACK_COLLECTION`      | `imageFeedback`                      |
    /// | `HTTP_TIMEOUT_SECS`        | `120`                                |
    pub fn from_env() -> Self {
        let http_timeout_secs = non_empty_env("HTTP_TIMEOUT_SECS")
            .and_then(|v| match v.parse() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    tracing::warn!(value = %v, "HTTP_TIMEOUT_SECS is not a valid integer, using default");
                    None
                }
            })
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            generation_api_url: non_empty_env("GENERATION_API_URL"),
            document_store_url: non_empty_env("DOCUMENT_STORE_URL"),
            document_store_token: non_empty_env("DOCUMENT_STORE_TOKEN"),
            feedback_bucket: non_empty_env("FEEDBACK_BUCKET"),
            feedback_public_base_url: non_empty_env("FEEDBACK_PUBLIC_BASE_URL"),
            feedback_collection: non_empty_env("FEEDBACK_COLLECTION")
                .unwrap_or_else(|| DEFAULT_FEEDBACK_COLLECTION.to_string()),
            http_timeout_secs,
        }
    }

    /// Public URL prefix for the feedback bucket, if a bucket is set.
    pub fn public_base_url(&self) -> Option<String> {
        self.feedback_public_base_url.clone().or_else(|| {
            self.feedback_bucket
                .as_ref()
                .map(|bucket| format!("https://{bucket}.s3.amazonaws.com"))
        })
    }
}

/// Read `name`, treating an empty or whitespace-only value as unset.
fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_base_url_defaults_to_bucket_host() {
        let config = CloudConfig {
            feedback_bucket: Some("shots".into()),
            ..CloudConfig::default()
        };
        assert_eq!(
            config.public_base_url().as_deref(),
            Some("https://shots.s3.amazonaws.com")
        );
    }

    #[test]
    fn explicit_public_base_url_wins() {
        let config = CloudConfig {
            feedback_bucket: Some("shots".into()),
            feedback_public_base_url: Some("https://cdn.example.com".into()),
            ..CloudConfig::default()
        };
        assert_eq!(config.public_base_url().as_deref(), Some("https://cdn.example.com"));
    }

    #[test]
    fn no_bucket_no_public_url() {
        assert_eq!(CloudConfig::default().public_base_url(), None);
    }
}
