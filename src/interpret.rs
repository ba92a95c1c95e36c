//! Message interpreter — pure classification of inbound events.
//!
//! Maps one [`InboundEvent`] to exactly one [`Intent`], with no I/O:
//! - redelivered events → `Ignore(Redelivery)`
//! - a "new question" trigger (leading `!`, a `QA:` label, or a
//!   `project:` label) → `NewQuestion`
//! - a quoted message without a question trigger → `Reply`
//! - everything else → `Ignore`
//!
//! A message that matches the question trigger is never treated as a
//! reply, even when it also quotes something.

use std::sync::LazyLock;

use regex::Regex;

use crate::event::{EventKind, InboundEvent, MessageKind};

/// Reserved prefix character marking a bare new question.
pub const QUESTION_SENTINEL: char = '!';

/// `QA:` label in any form, used for trigger detection only. A matched
/// trigger whose extraction comes up empty is a usage error, not a miss.
static QA_TRIGGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)qa:").unwrap());

/// `QA:` label with content on the same or the next line (extraction).
static QA_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)qa:[ \t]*\r?\n?[ \t]*([^\r\n]+)").unwrap());

/// `project:` label at the start of a line.
static PROJECT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^project:[ \t]*([^\r\n]+)").unwrap());

/// Leading question label on a quoted title (for normalization).
static LEADING_QA_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^qa:\s*").unwrap());

/// The classified meaning of one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    NewQuestion {
        project: Option<String>,
        question: String,
    },
    Reply {
        /// Normalized text of the quoted question, when the platform
        /// surfaced it. `None` means the quote was id-only.
        quoted_text: Option<String>,
        content: AnswerContent,
    },
    Ignore(IgnoreCause),
}

/// Content carried by a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerContent {
    Text(String),
    /// An image whose bytes have not been fetched yet. The orchestrator
    /// resolves it to a URL or a placeholder line.
    Image(PendingImage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    /// Platform message id, used to download the image content.
    pub message_id: String,
}

/// Why an event was ignored. Determines the orchestrator's reaction:
/// `BadFormat` gets a usage hint, the others are silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreCause {
    /// Duplicate delivery of an already-processed event.
    Redelivery,
    /// A question trigger matched but no question text could be extracted.
    BadFormat,
    /// Not a message we act on.
    Unhandled,
}

/// Classify one inbound event. Deterministic, no side effects.
pub fn classify(event: &InboundEvent) -> Intent {
    if event.is_redelivery() {
        return Intent::Ignore(IgnoreCause::Redelivery);
    }
    if event.kind != EventKind::Message {
        return Intent::Ignore(IgnoreCause::Unhandled);
    }
    let Some(message) = &event.message else {
        return Intent::Ignore(IgnoreCause::Unhandled);
    };

    match message.kind {
        MessageKind::Text => {
            let text = message.text.as_deref().unwrap_or("").trim();
            if has_question_trigger(text) {
                // Question trigger wins over the quote, if any.
                match extract_question(text) {
                    Some(question) => Intent::NewQuestion {
                        project: extract_project(text),
                        question,
                    },
                    None => Intent::Ignore(IgnoreCause::BadFormat),
                }
            } else if message.has_quote() && !text.is_empty() {
                Intent::Reply {
                    quoted_text: quoted_title(message.quoted_message_text.as_deref()),
                    content: AnswerContent::Text(text.to_string()),
                }
            } else {
                Intent::Ignore(IgnoreCause::Unhandled)
            }
        }
        MessageKind::Image => {
            if message.has_quote() {
                Intent::Reply {
                    quoted_text: quoted_title(message.quoted_message_text.as_deref()),
                    content: AnswerContent::Image(PendingImage {
                        message_id: message.id.clone(),
                    }),
                }
            } else {
                Intent::Ignore(IgnoreCause::Unhandled)
            }
        }
        MessageKind::Other => Intent::Ignore(IgnoreCause::Unhandled),
    }
}

/// Whether the text matches any "new question" trigger.
fn has_question_trigger(text: &str) -> bool {
    text.starts_with(QUESTION_SENTINEL) || QA_TRIGGER.is_match(text) || PROJECT_LABEL.is_match(text)
}

/// Extract the question text, or `None` if the trigger carried no content.
fn extract_question(text: &str) -> Option<String> {
    if let Some(captures) = QA_LABEL.captures(text) {
        return non_empty(captures[1].trim());
    }
    if let Some(rest) = text.strip_prefix(QUESTION_SENTINEL) {
        // Bare sentinel form: the question is the rest of the first line.
        let first_line = rest.lines().next().unwrap_or("");
        return non_empty(first_line.trim());
    }
    None
}

/// Extract the project name, if a `project:` label is present.
fn extract_project(text: &str) -> Option<String> {
    PROJECT_LABEL
        .captures(text)
        .and_then(|captures| non_empty(captures[1].trim()))
}

/// Strip the question trigger from a stored/quoted title so lookups match
/// regardless of which trigger form created the record.
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    let stripped = trimmed
        .strip_prefix(QUESTION_SENTINEL)
        .unwrap_or(trimmed);
    LEADING_QA_LABEL.replace(stripped, "").trim().to_string()
}

fn quoted_title(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_title).filter(|t| !t.is_empty())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}
