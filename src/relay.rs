//! Sync orchestrator — executes classified intents against the store
//! and the messaging platform.
//!
//! **Core invariant: the answer thread only grows.** Every append reads
//! the current answer and writes back `old + separator + new` in a single
//! update; prior content is never truncated or overwritten.
//!
//! Events within one delivery are processed strictly in arrival order,
//! each intent awaited before the next, so two quick replies to the same
//! question land in sender-observed order. Concurrent deliveries are not
//! serialized against each other; a read-modify-write race on the answer
//! field across two simultaneous deliveries is an accepted limitation.
//!
//! Failure policy (per step):
//! - profile lookup → degrade to the bare user id, keep going
//! - store create/update → notify the sender, no retry
//! - image download/upload → notify the sender, abort the store write
//! - acknowledgement send → log and swallow; never undoes a store write

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{ImagePolicy, ReplyMatchStrategy};
use crate::error::{Error, MediaError, StoreError};
use crate::event::InboundEvent;
use crate::interpret::{self, AnswerContent, IgnoreCause, Intent, PendingImage};
use crate::line::Messenger;
use crate::media::MediaHost;
use crate::notion::{NewQuestionRecord, QuestionRecord, QuestionStore};

/// Separator line between appended answer entries.
pub const ANSWER_SEPARATOR: &str = "\n---\n";

/// Project stored when no `project:` label was given.
pub const DEFAULT_PROJECT: &str = "uncategorized";

// User-facing acknowledgements and notices.
pub const ACK_CREATED: &str = "Question saved to Notion!";
pub const ACK_UPDATED: &str = "Answer updated in Notion!";
pub const NOTICE_CREATE_FAILED: &str = "Could not save the question, please try again later.";
pub const NOTICE_UPDATE_FAILED: &str = "Could not update the answer, please try again later.";
pub const NOTICE_NO_MATCH: &str = "Could not find a matching question for that reply.";
pub const NOTICE_IMAGE_FAILED: &str = "Could not store the image, please try again later.";
pub const USAGE_HINT: &str =
    "Please use the format:\nproject: <project name>\nQA: <your question>";

/// Terminal state of one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A record was created and the sender acknowledged.
    Created { record_id: String },
    /// An answer was appended and the sender acknowledged.
    Updated { record_id: String },
    /// No record matched the reply; the sender was notified.
    NotFound,
    /// A fatal step failed; the sender was notified, nothing written.
    Failed { notice: &'static str },
    /// Nothing done. Format errors get a usage hint first; redeliveries
    /// and unhandled events are deliberately silent.
    Ignored(IgnoreCause),
}

/// The orchestrator. Collaborators are injected at construction so tests
/// can substitute doubles.
pub struct Relay {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn QuestionStore>,
    media: Option<Arc<dyn MediaHost>>,
    reply_match: ReplyMatchStrategy,
    image_policy: ImagePolicy,
}

impl Relay {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn QuestionStore>,
        media: Option<Arc<dyn MediaHost>>,
        reply_match: ReplyMatchStrategy,
        image_policy: ImagePolicy,
    ) -> Self {
        Self {
            messenger,
            store,
            media,
            reply_match,
            image_policy,
        }
    }

    /// Process one webhook delivery's events, strictly in arrival order.
    pub async fn process_delivery(&self, events: &[InboundEvent]) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let outcome = self.handle_event(event).await;
            debug!(?outcome, "Event handled");
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn handle_event(&self, event: &InboundEvent) -> Outcome {
        match interpret::classify(event) {
            Intent::NewQuestion { project, question } => {
                self.handle_new_question(event, project, question).await
            }
            Intent::Reply {
                quoted_text,
                content,
            } => self.handle_reply(event, quoted_text.as_deref(), content).await,
            Intent::Ignore(cause) => {
                if cause == IgnoreCause::BadFormat {
                    // Recoverable usage error: tell the sender what we expected.
                    self.ack(event, USAGE_HINT).await;
                }
                Outcome::Ignored(cause)
            }
        }
    }

    async fn handle_new_question(
        &self,
        event: &InboundEvent,
        project: Option<String>,
        question: String,
    ) -> Outcome {
        let record = NewQuestionRecord {
            question,
            project: project.unwrap_or_else(|| DEFAULT_PROJECT.into()),
            submitter: self.submitter(event.sender_id()).await,
            created_at: Utc::now(),
        };

        match self.store.create_question(&record).await {
            Ok(record_id) => {
                info!(%record_id, question = %record.question, "Question record created");
                self.ack(event, ACK_CREATED).await;
                Outcome::Created { record_id }
            }
            Err(e) => {
                error!(error = %e, "Failed to create question record");
                self.ack(event, NOTICE_CREATE_FAILED).await;
                Outcome::Failed {
                    notice: NOTICE_CREATE_FAILED,
                }
            }
        }
    }

    async fn handle_reply(
        &self,
        event: &InboundEvent,
        quoted_text: Option<&str>,
        content: AnswerContent,
    ) -> Outcome {
        let target = match self.resolve_target(quoted_text).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(?quoted_text, "No record matched the reply");
                self.ack(event, NOTICE_NO_MATCH).await;
                return Outcome::NotFound;
            }
            Err(e) => {
                error!(error = %e, "Reply target lookup failed");
                self.ack(event, NOTICE_UPDATE_FAILED).await;
                return Outcome::Failed {
                    notice: NOTICE_UPDATE_FAILED,
                };
            }
        };

        let new_content = match self.resolve_content(content).await {
            Ok(text) => text,
            Err(e) => {
                // Image path failed before the write; do not store a
                // partial or placeholder answer in its place.
                error!(error = %e, record_id = %target.id, "Image content resolution failed");
                self.ack(event, NOTICE_IMAGE_FAILED).await;
                return Outcome::Failed {
                    notice: NOTICE_IMAGE_FAILED,
                };
            }
        };

        let merged = merge_answer(&target.answer, &new_content);
        match self.store.update_answer(&target.id, &merged).await {
            Ok(()) => {
                info!(record_id = %target.id, "Answer appended");
                self.ack(event, ACK_UPDATED).await;
                Outcome::Updated {
                    record_id: target.id,
                }
            }
            Err(e) => {
                error!(error = %e, record_id = %target.id, "Failed to update answer");
                self.ack(event, NOTICE_UPDATE_FAILED).await;
                Outcome::Failed {
                    notice: NOTICE_UPDATE_FAILED,
                }
            }
        }
    }

    /// Locate the record a reply targets, per the configured strategy.
    async fn resolve_target(
        &self,
        quoted_text: Option<&str>,
    ) -> Result<Option<QuestionRecord>, StoreError> {
        match (self.reply_match, quoted_text) {
            (ReplyMatchStrategy::QuotedTitle, Some(title)) => {
                self.store.find_by_title(title).await
            }
            (ReplyMatchStrategy::QuotedTitle, None) => {
                // The platform gave us an id-only quote; exact matching
                // has nothing to match on.
                warn!("Reply quote carries no text, cannot match by title");
                Ok(None)
            }
            // Best-effort fallback: ambiguous when several questions are
            // open concurrently.
            (ReplyMatchStrategy::MostRecent, _) => self.store.most_recent().await,
        }
    }

    /// Resolve reply content to the text that gets appended.
    async fn resolve_content(&self, content: AnswerContent) -> Result<String, Error> {
        match content {
            AnswerContent::Text(text) => Ok(text),
            AnswerContent::Image(pending) => match self.image_policy {
                ImagePolicy::Placeholder => Ok(placeholder_line(Utc::now())),
                ImagePolicy::Rehost => self.rehost_image(&pending).await,
            },
        }
    }

    async fn rehost_image(&self, pending: &PendingImage) -> Result<String, Error> {
        let Some(media) = &self.media else {
            return Err(MediaError::UploadFailed {
                reason: "no media host configured".into(),
            }
            .into());
        };
        let bytes = self.messenger.download_media(&pending.message_id).await?;
        let url = media.upload(bytes).await?;
        Ok(url)
    }

    /// Submitter identity for a new record. Lookup failure degrades to
    /// the bare user id rather than aborting the create.
    async fn submitter(&self, sender_id: Option<&str>) -> String {
        let Some(user_id) = sender_id else {
            return "unknown".into();
        };
        match self.messenger.get_profile(user_id).await {
            Ok(name) => format!("{name} ({user_id})"),
            Err(e) => {
                warn!(error = %e, "Profile lookup failed, storing bare user id");
                user_id.to_string()
            }
        }
    }

    /// Best-effort acknowledgement. Send failures are logged and
    /// swallowed; a successful store write stands regardless.
    async fn ack(&self, event: &InboundEvent, text: &str) {
        let Some(token) = event.reply_token.as_deref() else {
            debug!("Event has no reply token, skipping acknowledgement");
            return;
        };
        if let Err(e) = self.messenger.reply(token, text).await {
            warn!(error = %e, "Failed to send acknowledgement");
        }
    }
}

/// Merge a new entry into an answer thread.
pub fn merge_answer(old: &str, new: &str) -> String {
    if old.is_empty() {
        new.to_string()
    } else {
        format!("{old}{ANSWER_SEPARATOR}{new}")
    }
}

/// Placeholder stored for image replies under the `placeholder` policy.
fn placeholder_line(at: DateTime<Utc>) -> String {
    format!(
        "[{}] Image reply received (see LINE chat)",
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
