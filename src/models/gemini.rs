// Gemini generateContent response type definitions
// Author: kelexine (https://github.com/kelexine)
// Covers both the public v1beta shape and the internal API envelope

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Gemini response, optionally wrapped by the internal API envelope.
///
/// The internal API nests the payload under `response`; the public API puts
/// `candidates` and `usageMetadata` at the top level. Both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Internal API envelope.
    #[serde(default)]
    pub response: Option<ResponseWrapper>,

    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,

    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// Response wrapper from internal API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseWrapper {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// Response candidate
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Content of a model turn
///
/// Parts stay untyped here so a single malformed part cannot fail the
/// whole response; each one is validated with [`Part::try_from`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Value>,
}

fn default_role() -> String {
    "model".to_string()
}

/// A part exactly as it appears on the wire.
///
/// Gemini encodes the variant by which field is present. Use
/// [`Part::try_from`] to obtain the validated form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thought: Option<bool>,
    #[serde(default)]
    pub thought_signature: Option<String>,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
    #[serde(default)]
    pub function_response: Option<FunctionResponse>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

/// Individual part of a Gemini candidate with exactly one variant populated.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Visible text.
    Text { text: String },

    /// Thinking text (`thought: true`), possibly signed.
    Thought {
        text: String,
        signature: Option<String>,
    },

    /// Model requesting to call a function.
    FunctionCall {
        call: FunctionCall,
        signature: Option<String>,
    },

    /// Inline data (generated images, etc).
    InlineData { inline_data: InlineData },

    /// Result of a function call. Only valid in user turns.
    FunctionResponse { response: FunctionResponse },
}

/// Why a wire part could not be turned into a [`Part`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartError {
    /// No variant field was present.
    Empty,
    /// More than one variant field was present.
    Ambiguous(Vec<&'static str>),
    /// The part did not match the wire schema, e.g. inlineData without mimeType.
    Malformed(String),
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartError::Empty => write!(f, "part has no content field"),
            PartError::Ambiguous(fields) => {
                write!(f, "part has multiple content fields: {}", fields.join(", "))
            }
            PartError::Malformed(e) => write!(f, "malformed part: {}", e),
        }
    }
}

impl std::error::Error for PartError {}

impl TryFrom<Value> for Part {
    type Error = PartError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let raw: RawPart =
            serde_json::from_value(value).map_err(|e| PartError::Malformed(e.to_string()))?;
        Part::try_from(raw)
    }
}

impl TryFrom<RawPart> for Part {
    type Error = PartError;

    fn try_from(raw: RawPart) -> Result<Self, Self::Error> {
        let mut present = Vec::new();
        if raw.text.is_some() {
            present.push("text");
        }
        if raw.function_call.is_some() {
            present.push("functionCall");
        }
        if raw.function_response.is_some() {
            present.push("functionResponse");
        }
        if raw.inline_data.is_some() {
            present.push("inlineData");
        }
        if present.len() > 1 {
            return Err(PartError::Ambiguous(present));
        }

        let signature = raw.thought_signature;
        if let Some(text) = raw.text {
            return Ok(if raw.thought.unwrap_or(false) {
                Part::Thought { text, signature }
            } else {
                Part::Text { text }
            });
        }
        if let Some(call) = raw.function_call {
            return Ok(Part::FunctionCall { call, signature });
        }
        if let Some(inline_data) = raw.inline_data {
            return Ok(Part::InlineData { inline_data });
        }
        if let Some(response) = raw.function_response {
            return Ok(Part::FunctionResponse { response });
        }
        Err(PartError::Empty)
    }
}

/// Inline binary payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String, // base64 encoded
}

/// Function call from model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Option<Value>,
}

/// Function response from user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    #[serde(default)]
    pub response: Value,
}

/// Candidate finish reason.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    /// Explicit tool invocation reported by some backends.
    ToolUse,
    MalformedFunctionCall,
    UnexpectedToolCall,
    TooManyToolCalls,
    Other,
    Unknown(String),
}

impl FinishReason {
    /// Whether the backend stopped in order to invoke a tool.
    pub fn is_tool_invocation(&self) -> bool {
        matches!(self, FinishReason::ToolUse | FinishReason::UnexpectedToolCall)
    }
}

impl From<String> for FinishReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            "TOOL_USE" | "TOOL_CALL" | "FUNCTION_CALL" => FinishReason::ToolUse,
            "MALFORMED_FUNCTION_CALL" => FinishReason::MalformedFunctionCall,
            "UNEXPECTED_TOOL_CALL" => FinishReason::UnexpectedToolCall,
            "TOO_MANY_TOOL_CALLS" => FinishReason::TooManyToolCalls,
            "OTHER" => FinishReason::Other,
            _ => FinishReason::Unknown(value),
        }
    }
}

/// Token usage metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the input prompt, cached tokens included.
    #[serde(default)]
    pub prompt_token_count: Option<u32>,

    /// Tokens in the generated response.
    #[serde(default)]
    pub candidates_token_count: Option<u32>,

    /// Total tokens (prompt + candidates).
    #[serde(default)]
    pub total_token_count: Option<u32>,

    /// Number of prompt tokens served from the context cache.
    #[serde(default)]
    pub cached_content_token_count: Option<u32>,
}
