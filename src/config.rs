//! Env-driven configuration, validated once at startup.

use std::net::SocketAddr;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;

/// How replies are matched to an existing question record.
///
/// `QuotedTitle` does an exact lookup on the normalized quoted text.
/// `MostRecent` assumes the reply targets the newest record; under
/// concurrent open questions this is ambiguous and can append to the
/// wrong thread. It exists for platform modes that do not surface the
/// quoted text at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMatchStrategy {
    QuotedTitle,
    MostRecent,
}

impl FromStr for ReplyMatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quoted-title" => Ok(Self::QuotedTitle),
            "most-recent" => Ok(Self::MostRecent),
            other => Err(format!(
                "unknown strategy {other:?}, expected \"quoted-title\" or \"most-recent\""
            )),
        }
    }
}

/// What to do with image replies.
///
/// `Rehost` downloads the image and uploads it to the image host, storing
/// the public URL. `Placeholder` stores a timestamped note instead and
/// never touches the image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePolicy {
    Rehost,
    Placeholder,
}

impl FromStr for ImagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rehost" => Ok(Self::Rehost),
            "placeholder" => Ok(Self::Placeholder),
            other => Err(format!(
                "unknown policy {other:?}, expected \"rehost\" or \"placeholder\""
            )),
        }
    }
}

/// Mapping of logical record fields to Notion property names.
///
/// Resolved from configuration and checked against the live database
/// schema at startup, instead of re-discovering the answer property on
/// every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub question: String,
    pub answer: String,
    pub project: String,
    pub user: String,
    pub date: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            question: "question".into(),
            answer: "answer".into(),
            project: "project".into(),
            user: "user".into(),
            date: "date".into(),
        }
    }
}

/// Full relay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub line_token: SecretString,
    pub notion_token: SecretString,
    pub notion_database_id: String,
    pub fields: FieldMap,
    pub reply_match: ReplyMatchStrategy,
    pub image_policy: ImagePolicy,
    /// Required when `image_policy` is `Rehost`.
    pub imgur_client_id: Option<String>,
}

impl Config {
    /// Load configuration from the environment, failing fast on anything
    /// missing or unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = parse_var(
            "QA_RELAY_BIND",
            &optional("QA_RELAY_BIND", "0.0.0.0:3000"),
        )?;
        let reply_match = parse_var(
            "QA_RELAY_REPLY_MATCH",
            &optional("QA_RELAY_REPLY_MATCH", "quoted-title"),
        )?;
        let image_policy = parse_var(
            "QA_RELAY_IMAGE_POLICY",
            &optional("QA_RELAY_IMAGE_POLICY", "placeholder"),
        )?;

        let imgur_client_id = std::env::var("IMGUR_CLIENT_ID").ok();
        if image_policy == ImagePolicy::Rehost && imgur_client_id.is_none() {
            return Err(ConfigError::InvalidValue {
                key: "QA_RELAY_IMAGE_POLICY".into(),
                message: "\"rehost\" requires IMGUR_CLIENT_ID to be set".into(),
            });
        }

        Ok(Self {
            bind_addr,
            line_token: SecretString::from(required("LINE_CHANNEL_ACCESS_TOKEN")?),
            notion_token: SecretString::from(required("NOTION_TOKEN")?),
            notion_database_id: required("NOTION_DATABASE_ID")?,
            fields: FieldMap {
                question: optional("QA_RELAY_QUESTION_FIELD", "question"),
                answer: optional("QA_RELAY_ANSWER_FIELD", "answer"),
                project: optional("QA_RELAY_PROJECT_FIELD", "project"),
                user: optional("QA_RELAY_USER_FIELD", "user"),
                date: optional("QA_RELAY_DATE_FIELD", "date"),
            },
            reply_match,
            image_policy,
            imgur_client_id,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.into()))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.into(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_match_strategy_parses() {
        assert_eq!(
            "quoted-title".parse::<ReplyMatchStrategy>().unwrap(),
            ReplyMatchStrategy::QuotedTitle
        );
        assert_eq!(
            " Most-Recent ".parse::<ReplyMatchStrategy>().unwrap(),
            ReplyMatchStrategy::MostRecent
        );
        assert!("newest".parse::<ReplyMatchStrategy>().is_err());
    }

    #[test]
    fn image_policy_parses() {
        assert_eq!("rehost".parse::<ImagePolicy>().unwrap(), ImagePolicy::Rehost);
        assert_eq!(
            "PLACEHOLDER".parse::<ImagePolicy>().unwrap(),
            ImagePolicy::Placeholder
        );
        assert!("inline".parse::<ImagePolicy>().is_err());
    }

    #[test]
    fn field_map_defaults() {
        let fields = FieldMap::default();
        assert_eq!(fields.question, "question");
        assert_eq!(fields.answer, "answer");
        assert_eq!(fields.project, "project");
        assert_eq!(fields.user, "user");
        assert_eq!(fields.date, "date");
    }

    #[test]
    fn parse_var_wraps_error_with_key() {
        let err = parse_var::<ImagePolicy>("QA_RELAY_IMAGE_POLICY", "bogus").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, message } => {
                assert_eq!(key, "QA_RELAY_IMAGE_POLICY");
                assert!(message.contains("bogus"));
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
