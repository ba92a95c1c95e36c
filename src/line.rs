//! LINE Messaging API client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::MessagingError;

const API_BASE: &str = "https://api.line.me/v2/bot";
const DATA_API_BASE: &str = "https://api-data.line.me/v2/bot";

/// Messaging-platform capabilities the orchestrator depends on.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Look up a sender's display name.
    async fn get_profile(&self, user_id: &str) -> Result<String, MessagingError>;

    /// Send a text reply for the given one-shot reply token.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), MessagingError>;

    /// Download the raw content of a media message.
    async fn download_media(&self, message_id: &str) -> Result<Vec<u8>, MessagingError>;
}

/// `Messenger` backed by the LINE Messaging API.
pub struct LineClient {
    token: SecretString,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn get_profile(&self, user_id: &str) -> Result<String, MessagingError> {
        let resp = self
            .client
            .get(format!("{API_BASE}/profile/{user_id}"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| MessagingError::ProfileLookup {
                user_id: user_id.into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(MessagingError::ProfileLookup {
                user_id: user_id.into(),
                reason: format!("status {}", resp.status()),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| MessagingError::ProfileLookup {
                user_id: user_id.into(),
                reason: e.to_string(),
            })?;

        data.get("displayName")
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .ok_or_else(|| MessagingError::ProfileLookup {
                user_id: user_id.into(),
                reason: "displayName missing from profile response".into(),
            })
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), MessagingError> {
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": [{ "type": "text", "text": text }],
        });

        let resp = self
            .client
            .post(format!("{API_BASE}/message/reply"))
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| MessagingError::ReplyFailed {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(MessagingError::ReplyFailed {
                reason: format!("status {status}: {detail}"),
            });
        }

        Ok(())
    }

    async fn download_media(&self, message_id: &str) -> Result<Vec<u8>, MessagingError> {
        let resp = self
            .client
            .get(format!("{DATA_API_BASE}/message/{message_id}/content"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| MessagingError::DownloadFailed {
                message_id: message_id.into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(MessagingError::DownloadFailed {
                message_id: message_id.into(),
                reason: format!("status {}", resp.status()),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| MessagingError::DownloadFailed {
            message_id: message_id.into(),
            reason: e.to_string(),
        })?;

        Ok(bytes.to_vec())
    }
}
