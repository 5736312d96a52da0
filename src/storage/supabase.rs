use super::ObjectStorage;
use crate::config::BackendConfig;
use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

/// Supabase Storage client for the evidence bucket.
pub struct SupabaseStorage {
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            base_url: config
                .url
                .clone()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            bucket: config.bucket.clone(),
        }
    }
}

impl ObjectStorage for SupabaseStorage {
    fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/{}/{path}",
            self.base_url, self.bucket
        );

        debug!(path, size = bytes.len(), "Uploading object");

        ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            // Never overwrite an existing object; paths carry a millisecond
            // timestamp so collisions mean a caller bug.
            .header("x-upsert", "false")
            .send(bytes)
            .with_context(|| format!("Upload to {path} failed"))?;

        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{path}",
            self.base_url, self.bucket
        )
    }

    fn signed_url(&self, path: &str, ttl_seconds: u32) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{path}",
            self.base_url, self.bucket
        );

        let response = ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
            .send_json(&json!({ "expiresIn": ttl_seconds }))
            .with_context(|| format!("Signed URL request for {path} failed"))?;

        let body: serde_json::Value = response
            .into_body()
            .read_json()
            .context("Failed to parse signed URL response")?;

        // The API returns a path relative to /storage/v1, e.g.
        // "/object/sign/imagenes/a.jpg?token=..."
        let signed = body["signedURL"]
            .as_str()
            .context("Missing signedURL in response")?;

        Ok(format!("{}/storage/v1{signed}", self.base_url))
    }
}
