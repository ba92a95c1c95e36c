//! Notion database client — the external store for question records.
//!
//! Field names come from a validated [`FieldMap`] resolved at startup;
//! `validate_schema` checks the mapped properties against the live
//! database once and fails fast, so no per-request schema discovery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::FieldMap;
use crate::error::StoreError;

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// One question/answer record, as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: String,
    pub question: String,
    /// Current answer thread. Append-only; the orchestrator always reads
    /// this before writing a merged value back.
    pub answer: String,
}

/// Fields for a record about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestionRecord {
    pub question: String,
    pub project: String,
    pub submitter: String,
    pub created_at: DateTime<Utc>,
}

/// Store capabilities the orchestrator depends on.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Create one record with an empty answer. Returns the new record id.
    async fn create_question(&self, record: &NewQuestionRecord) -> Result<String, StoreError>;

    /// Exact lookup by (normalized) question title.
    async fn find_by_title(&self, title: &str) -> Result<Option<QuestionRecord>, StoreError>;

    /// The most recently created record, if any.
    async fn most_recent(&self) -> Result<Option<QuestionRecord>, StoreError>;

    /// Overwrite the answer field with a pre-merged value.
    async fn update_answer(&self, id: &str, answer: &str) -> Result<(), StoreError>;

    /// Verify the configured field map against the live schema.
    async fn validate_schema(&self) -> Result<(), StoreError>;
}

/// `QuestionStore` backed by the Notion REST API.
pub struct NotionClient {
    token: SecretString,
    database_id: String,
    fields: FieldMap,
    client: reqwest::Client,
}

impl NotionClient {
    pub fn new(token: SecretString, database_id: String, fields: FieldMap) -> Self {
        Self {
            token,
            database_id,
            fields,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{API_BASE}{path}"))
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn execute(
        &self,
        op: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, StoreError> {
        let resp = request
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed {
                op,
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                op,
                status: status.as_u16(),
                message,
            });
        }

        resp.json().await.map_err(|e| StoreError::MalformedResponse {
            op,
            reason: e.to_string(),
        })
    }

    async fn query_one(&self, op: &'static str, body: Value) -> Result<Option<QuestionRecord>, StoreError> {
        let data = self
            .execute(
                op,
                self.request(
                    reqwest::Method::POST,
                    &format!("/databases/{}/query", self.database_id),
                )
                .json(&body),
            )
            .await?;

        let Some(page) = data
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
        else {
            return Ok(None);
        };

        parse_record(page, &self.fields)
            .map(Some)
            .ok_or(StoreError::MalformedResponse {
                op,
                reason: "page missing id or mapped properties".into(),
            })
    }
}

#[async_trait]
impl QuestionStore for NotionClient {
    async fn create_question(&self, record: &NewQuestionRecord) -> Result<String, StoreError> {
        let body = serde_json::json!({
            "parent": { "database_id": self.database_id },
            "properties": create_properties(&self.fields, record),
        });

        let data = self
            .execute(
                "create_question",
                self.request(reqwest::Method::POST, "/pages").json(&body),
            )
            .await?;

        data.get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or(StoreError::MalformedResponse {
                op: "create_question",
                reason: "created page has no id".into(),
            })
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<QuestionRecord>, StoreError> {
        let body = serde_json::json!({
            "filter": {
                "property": self.fields.question,
                "title": { "equals": title },
            },
            "page_size": 1,
        });
        self.query_one("find_by_title", body).await
    }

    async fn most_recent(&self) -> Result<Option<QuestionRecord>, StoreError> {
        let body = serde_json::json!({
            "sorts": [{ "timestamp": "created_time", "direction": "descending" }],
            "page_size": 1,
        });
        self.query_one("most_recent", body).await
    }

    async fn update_answer(&self, id: &str, answer: &str) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "properties": {
                (self.fields.answer.as_str()): {
                    "rich_text": [{ "text": { "content": answer } }],
                },
            },
        });

        self.execute(
            "update_answer",
            self.request(reqwest::Method::PATCH, &format!("/pages/{id}"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn validate_schema(&self) -> Result<(), StoreError> {
        let data = self
            .execute(
                "validate_schema",
                self.request(
                    reqwest::Method::GET,
                    &format!("/databases/{}", self.database_id),
                ),
            )
            .await?;

        let properties = data.get("properties").cloned().unwrap_or(Value::Null);
        let issues = schema_issues(&properties, &self.fields);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(StoreError::SchemaMismatch(issues.join("; ")))
        }
    }
}

/// Build the Notion property payload for a new record. The answer
/// property is deliberately absent: a missing rich_text property reads
/// back as empty.
fn create_properties(fields: &FieldMap, record: &NewQuestionRecord) -> Value {
    serde_json::json!({
        (fields.question.as_str()): {
            "title": [{ "text": { "content": record.question } }],
        },
        (fields.project.as_str()): {
            "rich_text": [{ "text": { "content": record.project } }],
        },
        (fields.user.as_str()): {
            "rich_text": [{ "text": { "content": record.submitter } }],
        },
        (fields.date.as_str()): {
            "date": { "start": record.created_at.to_rfc3339() },
        },
    })
}

/// Extract a `QuestionRecord` from one Notion page object.
fn parse_record(page: &Value, fields: &FieldMap) -> Option<QuestionRecord> {
    let id = page.get("id")?.as_str()?.to_string();
    let properties = page.get("properties")?;
    let question = rich_text_content(properties.get(&fields.question)?, "title");
    let answer = properties
        .get(&fields.answer)
        .map(|prop| rich_text_content(prop, "rich_text"))
        .unwrap_or_default();
    Some(QuestionRecord {
        id,
        question,
        answer,
    })
}

/// Concatenate the plain text of a title/rich_text property.
fn rich_text_content(property: &Value, key: &str) -> String {
    property
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("plain_text")
                        .or_else(|| item.get("text").and_then(|t| t.get("content")))
                        .and_then(Value::as_str)
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Compare the configured field map against a database's property
/// descriptors. Returns one message per missing or mistyped field.
fn schema_issues(properties: &Value, fields: &FieldMap) -> Vec<String> {
    let expectations = [
        (&fields.question, "title"),
        (&fields.answer, "rich_text"),
        (&fields.project, "rich_text"),
        (&fields.user, "rich_text"),
        (&fields.date, "date"),
    ];

    let mut issues = Vec::new();
    for (name, expected) in expectations {
        match properties.get(name).and_then(|p| p.get("type")).and_then(Value::as_str) {
            None => issues.push(format!("property {name:?} not found in database")),
            Some(actual) if actual != expected => issues.push(format!(
                "property {name:?} has type {actual:?}, expected {expected:?}"
            )),
            Some(_) => {}
        }
    }
    issues
}
