//! Chat completion request and response envelopes.
//!
//! Field names follow the OpenAI chat-completions wire format so existing
//! clients can talk to the server unchanged.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::message::{Message, Role};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
/// Upper bound accepted for `temperature`.
pub const MAX_TEMPERATURE: f32 = 2.0;

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

// Clients may send `null` for an unset sampling field; treat it as absent.
fn nullable_temperature<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f32, D::Error> {
    Ok(Option::deserialize(d)?.unwrap_or(DEFAULT_TEMPERATURE))
}

fn nullable_max_tokens<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    Ok(Option::deserialize(d)?.unwrap_or(DEFAULT_MAX_TOKENS))
}

fn nullable_flag<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    Ok(Option::deserialize(d)?.unwrap_or_default())
}

/// An inbound `POST /v1/chat/completions` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier, echoed back in the response
    pub model: String,

    /// The conversation, oldest first
    pub messages: Vec<Message>,

    #[serde(default = "default_temperature", deserialize_with = "nullable_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens", deserialize_with = "nullable_max_tokens")]
    pub max_tokens: u32,

    /// Deliver the completion as server-sent event chunks
    #[serde(default, deserialize_with = "nullable_flag")]
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            stream: false,
        }
    }

    /// Content of the most recent message, or `""` for an empty conversation.
    pub fn last_content(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or("")
    }

    /// Reject sampling parameters no backend can honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::InvalidRequest(
                "max_tokens must be a positive integer".into(),
            ));
        }
        if !self.temperature.is_finite()
            || self.temperature < 0.0
            || self.temperature > MAX_TEMPERATURE
        {
            return Err(Error::InvalidRequest(format!(
                "temperature must be between 0.0 and {MAX_TEMPERATURE}"
            )));
        }
        Ok(())
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: FinishReason,
}

/// The non-streamed completion envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub object: String,
    /// Seconds since the Unix epoch
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
}

impl CompletionResponse {
    /// Wrap `text` as the single assistant choice of a fresh completion.
    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            object: "chat.completion".into(),
            created: Utc::now().timestamp(),
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(text),
                finish_reason: FinishReason::Stop,
            }],
        }
    }

    /// Text of the first choice.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("")
    }

    /// Split the completion into the chunk sequence a streaming client expects:
    /// role delta, content delta, then the terminating chunk.
    pub fn into_chunks(self) -> Vec<CompletionChunk> {
        let mut chunks = Vec::with_capacity(self.choices.len() * 2 + 1);
        let mut finish = None;
        for choice in self.choices {
            chunks.push(CompletionChunk::new(
                &self.id,
                self.created,
                &self.model,
                ChunkChoice {
                    index: choice.index,
                    delta: Delta {
                        role: Some(choice.message.role),
                        content: None,
                    },
                    finish_reason: None,
                },
            ));
            chunks.push(CompletionChunk::new(
                &self.id,
                self.created,
                &self.model,
                ChunkChoice {
                    index: choice.index,
                    delta: Delta {
                        role: None,
                        content: Some(choice.message.content),
                    },
                    finish_reason: None,
                },
            ));
            finish = Some((choice.index, choice.finish_reason));
        }
        let (index, reason) = finish.unwrap_or((0, FinishReason::Stop));
        chunks.push(CompletionChunk::new(
            &self.id,
            self.created,
            &self.model,
            ChunkChoice {
                index,
                delta: Delta::default(),
                finish_reason: Some(reason),
            },
        ));
        chunks
    }
}

/// Partial message carried by a stream chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<FinishReason>,
}

/// One `chat.completion.chunk` server-sent event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

impl CompletionChunk {
    fn new(id: &str, created: i64, model: &str, choice: ChunkChoice) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".into(),
            created,
            model: model.to_string(),
            choices: vec![choice],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_apply() {
        let req: CompletionRequest = serde_json::from_str(
            r#"{"model":"phi-3-mini","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, 500);
        assert!(!req.stream);
        assert_eq!(req.last_content(), "hi");
    }

    #[test]
    fn null_sampling_fields_fall_back_to_defaults() {
        let req: CompletionRequest = serde_json::from_str(
            r#"{"model":"m","messages":[{"role":"user","content":"hi"}],"temperature":null,"max_tokens":null,"stream":null}"#,
        )
        .unwrap();
        assert!((req.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(!req.stream);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn explicit_sampling_fields_are_kept() {
        let req: CompletionRequest = serde_json::from_str(
            r#"{"model":"m","messages":[],"temperature":0.2,"max_tokens":64,"stream":true}"#,
        )
        .unwrap();
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, 64);
        assert!(req.stream);
    }

    #[test]
    fn missing_messages_is_rejected() {
        let result = serde_json::from_str::<CompletionRequest>(r#"{"model":"m"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_zero_max_tokens() {
        let mut req = CompletionRequest::new("m", vec![Message::user("hi")]);
        req.max_tokens = 0;
        assert!(matches!(req.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let mut req = CompletionRequest::new("m", vec![Message::user("hi")]);
        req.temperature = 2.5;
        assert!(req.validate().is_err());
        req.temperature = -0.1;
        assert!(req.validate().is_err());
        req.temperature = f32::NAN;
        assert!(req.validate().is_err());
        req.temperature = 0.0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_conversation_has_empty_last_content() {
        let req = CompletionRequest::new("m", vec![]);
        assert_eq!(req.last_content(), "");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn single_choice_envelope() {
        let resp = CompletionResponse::single("phi-3-mini", "Woof.");
        assert!(resp.id.starts_with("chatcmpl-"));
        assert_eq!(resp.object, "chat.completion");
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].index, 0);
        assert_eq!(resp.choices[0].message.role, Role::Assistant);
        assert_eq!(resp.choices[0].finish_reason, FinishReason::Stop);
        assert_eq!(resp.content(), "Woof.");

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn ids_are_unique() {
        let a = CompletionResponse::single("m", "x");
        let b = CompletionResponse::single("m", "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn chunks_carry_role_content_then_finish() {
        let resp = CompletionResponse::single("m", "Hello");
        let id = resp.id.clone();
        let chunks = resp.into_chunks();

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.id == id && c.object == "chat.completion.chunk"));
        assert_eq!(chunks[0].choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunks[1].choices[0].delta.content.as_deref(), Some("Hello"));
        assert_eq!(chunks[2].choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(chunks[2].choices[0].delta, Delta::default());

        let json = serde_json::to_value(&chunks[0]).unwrap();
        assert!(json["choices"][0]["finish_reason"].is_null());
        assert!(json["choices"][0]["delta"].get("content").is_none());
    }
}
