//! Image rehosting — anonymous imgur uploads.
//!
//! Only used when the image policy is `rehost`; the `placeholder` policy
//! never touches image bytes.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::MediaError;

const UPLOAD_URL: &str = "https://api.imgur.com/3/image";

/// Turns raw image bytes into a durable public URL.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, MediaError>;
}

/// `MediaHost` backed by the imgur anonymous upload API.
pub struct ImgurClient {
    client_id: String,
    client: reqwest::Client,
}

impl ImgurClient {
    pub fn new(client_id: String) -> Self {
        Self {
            client_id,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MediaHost for ImgurClient {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, MediaError> {
        let form = Form::new().part("image", Part::bytes(bytes).file_name("reply-image"));

        let resp = self
            .client
            .post(UPLOAD_URL)
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::UploadFailed {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(MediaError::UploadFailed {
                reason: format!("status {status}: {detail}"),
            });
        }

        let data: Value = resp.json().await.map_err(|e| MediaError::MalformedResponse {
            reason: e.to_string(),
        })?;

        data.get("data")
            .and_then(|d| d.get("link"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| MediaError::MalformedResponse {
                reason: "upload response has no data.link".into(),
            })
    }
}
