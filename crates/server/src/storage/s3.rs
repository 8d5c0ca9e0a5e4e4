use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};

use super::ObjectStore;

fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| std::env::var(n).ok().filter(|v| !v.is_empty()))
}

/// S3-compatible bucket (AWS, MinIO, RustFS) addressed path-style.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    pub fn from_env() -> Result<Self, String> {
        let endpoint = env_any(&["S3_ENDPOINT", "AWS_ENDPOINT_URL_S3"])
            .ok_or("S3_ENDPOINT must be set")?;
        let access_key = env_any(&["AWS_ACCESS_KEY_ID", "S3_ACCESS_KEY"])
            .ok_or("AWS_ACCESS_KEY_ID must be set")?;
        let secret_key = env_any(&["AWS_SECRET_ACCESS_KEY", "S3_SECRET_KEY"])
            .ok_or("AWS_SECRET_ACCESS_KEY must be set")?;
        let region = env_any(&["S3_REGION", "AWS_REGION"]).unwrap_or_else(|| "us-east-1".into());
        let bucket = env_any(&["S3_BUCKET"]).unwrap_or_else(|| "elsy-documents".into());

        let creds = Credentials::new(&access_key, &secret_key, None, None, "env");
        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(&endpoint)
            .region(Region::new(region))
            .credentials_provider(creds)
            .force_path_style(true)
            .behavior_version_latest()
            .build();

        let public_base = env_any(&["PUBLIC_FILES_URL"])
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));

        Ok(Self {
            client: Client::from_conf(config),
            bucket,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    pub async fn ensure_bucket(&self) {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            tracing::info!(bucket = %self.bucket, "S3 bucket exists");
            return;
        }
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => tracing::info!(bucket = %self.bucket, "S3 bucket created"),
            Err(e) => tracing::warn!(bucket = %self.bucket, error = %e, "Failed to create S3 bucket"),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                tracing::error!(key, error = ?svc, "S3 PutObject failed");
                format!("S3 upload failed: {svc}")
            })?;
        Ok(format!("{}/{}", self.public_base, key))
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("S3 delete failed: {}", e.into_service_error()))?;
        Ok(())
    }
}
