//! Shared test doubles and event builders for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{MediaError, MessagingError, StoreError};
use crate::event::{
    DeliveryContext, EventKind, EventSource, InboundEvent, InboundMessage, MessageKind,
};
use crate::line::Messenger;
use crate::media::MediaHost;
use crate::notion::{NewQuestionRecord, QuestionRecord, QuestionStore};

// ── Event builders ──────────────────────────────────────────────────

pub fn text_event(text: &str) -> InboundEvent {
    build_event(Some(text), MessageKind::Text, None)
}

pub fn quoted_text_event(text: &str, quoted_text: Option<&str>) -> InboundEvent {
    build_event(Some(text), MessageKind::Text, Some(quoted_text))
}

pub fn quoted_image_event() -> InboundEvent {
    build_event(None, MessageKind::Image, Some(None))
}

pub fn redelivered(mut event: InboundEvent) -> InboundEvent {
    event.delivery_context = Some(DeliveryContext { is_redelivery: true });
    event
}

/// `quote`: `None` = no quote at all, `Some(None)` = id-only quote,
/// `Some(Some(text))` = quote with surfaced text.
fn build_event(
    text: Option<&str>,
    kind: MessageKind,
    quote: Option<Option<&str>>,
) -> InboundEvent {
    InboundEvent {
        kind: EventKind::Message,
        message: Some(InboundMessage {
            id: "m-test".into(),
            kind,
            text: text.map(String::from),
            quoted_message_id: quote.map(|_| "m-quoted".into()),
            quoted_message_text: quote.flatten().map(String::from),
        }),
        reply_token: Some("tok".into()),
        source: Some(EventSource {
            user_id: Some("U1".into()),
        }),
        delivery_context: None,
    }
}

// ── Messenger double ────────────────────────────────────────────────

pub struct MockMessenger {
    /// `None` makes profile lookups fail.
    pub profile: Option<String>,
    pub fail_reply: bool,
    pub fail_download: bool,
    pub replies: Mutex<Vec<(String, String)>>,
    pub downloads: Mutex<Vec<String>>,
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self {
            profile: Some("Alice".into()),
            fail_reply: false,
            fail_download: false,
            replies: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
        }
    }
}

impl MockMessenger {
    pub fn reply_texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn get_profile(&self, user_id: &str) -> Result<String, MessagingError> {
        self.profile
            .clone()
            .ok_or_else(|| MessagingError::ProfileLookup {
                user_id: user_id.into(),
                reason: "mock failure".into(),
            })
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), MessagingError> {
        if self.fail_reply {
            return Err(MessagingError::ReplyFailed {
                reason: "mock failure".into(),
            });
        }
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.into(), text.into()));
        Ok(())
    }

    async fn download_media(&self, message_id: &str) -> Result<Vec<u8>, MessagingError> {
        if self.fail_download {
            return Err(MessagingError::DownloadFailed {
                message_id: message_id.into(),
                reason: "mock failure".into(),
            });
        }
        self.downloads.lock().unwrap().push(message_id.into());
        Ok(vec![0xFF, 0xD8])
    }
}

// ── Store double ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub fail_create: bool,
    pub fail_update: bool,
    pub records: Mutex<Vec<QuestionRecord>>,
    pub created: Mutex<Vec<NewQuestionRecord>>,
    pub updates: Mutex<Vec<(String, String)>>,
}

impl MockStore {
    pub fn with_record(question: &str, answer: &str) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().push(QuestionRecord {
            id: "rec-0".into(),
            question: question.into(),
            answer: answer.into(),
        });
        store
    }

    pub fn answer_of(&self, id: &str) -> String {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.answer.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QuestionStore for MockStore {
    async fn create_question(&self, record: &NewQuestionRecord) -> Result<String, StoreError> {
        if self.fail_create {
            return Err(StoreError::Api {
                op: "create_question",
                status: 500,
                message: "mock failure".into(),
            });
        }
        self.created.lock().unwrap().push(record.clone());
        let mut records = self.records.lock().unwrap();
        let id = format!("rec-{}", records.len());
        records.push(QuestionRecord {
            id: id.clone(),
            question: record.question.clone(),
            answer: String::new(),
        });
        Ok(id)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<QuestionRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.question == title)
            .cloned())
    }

    async fn most_recent(&self) -> Result<Option<QuestionRecord>, StoreError> {
        Ok(self.records.lock().unwrap().last().cloned())
    }

    async fn update_answer(&self, id: &str, answer: &str) -> Result<(), StoreError> {
        if self.fail_update {
            return Err(StoreError::Api {
                op: "update_answer",
                status: 500,
                message: "mock failure".into(),
            });
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::MalformedResponse {
                op: "update_answer",
                reason: "unknown record id".into(),
            })?;
        record.answer = answer.to_string();
        self.updates.lock().unwrap().push((id.into(), answer.into()));
        Ok(())
    }

    async fn validate_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ── Media double ────────────────────────────────────────────────────

pub struct MockMedia {
    /// `None` makes uploads fail.
    pub url: Option<String>,
    pub uploads: Mutex<Vec<Vec<u8>>>,
}

impl Default for MockMedia {
    fn default() -> Self {
        Self {
            url: Some("https://img.example/abc".into()),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaHost for MockMedia {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, MediaError> {
        let url = self.url.clone().ok_or_else(|| MediaError::UploadFailed {
            reason: "mock failure".into(),
        })?;
        self.uploads.lock().unwrap().push(bytes);
        Ok(url)
    }
}
