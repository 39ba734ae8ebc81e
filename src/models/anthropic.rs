//! Anthropic Messages API type definitions.
//!
//! This module defines the response structures of the [Anthropic Messages API](https://docs.anthropic.com/en/api/messages)
//! produced by the response translator and serialized back to Claude clients.

// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content block types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text content block.
    Text { text: String },
    /// Extended thinking block, optionally signed by the model that produced it.
    Thinking {
        thinking: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        signature: Option<String>,
    },
    /// An image content block.
    Image { source: ImageSource },
    /// A tool use request from the model.
    ToolUse {
        id: String,
        name: String,
        input: Value,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        signature: Option<String>,
    },
}

impl ContentBlock {
    /// The `type` discriminant as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::Image { .. } => "image",
            ContentBlock::ToolUse { .. } => "tool_use",
        }
    }
}

/// Image source for vision content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageSource {
    #[serde(rename = "base64")]
    Base64 {
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
        data: String,
    },
}

/// The reason why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::ToolUse => "tool_use",
        }
    }
}

/// Anthropic Messages API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    /// Unique object identifier.
    pub id: String,

    /// Object type (always "message").
    #[serde(rename = "type")]
    pub response_type: String,

    /// Conversational role of the generated message (always "assistant").
    pub role: String,

    /// Content generated by the model.
    pub content: Vec<ContentBlock>,

    /// The model that handled the request.
    pub model: String,

    /// The reason why the model stopped generating.
    pub stop_reason: Option<StopReason>,

    /// The sequence that caused the model to stop (if applicable).
    pub stop_sequence: Option<String>,

    /// Billing and rate-limit usage.
    pub usage: Usage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Usage {
    /// The number of input tokens which were used, excluding cache reads.
    pub input_tokens: u32,

    /// The number of output tokens which were used.
    pub output_tokens: u32,

    /// The number of input tokens used to create the cache.
    #[serde(default)]
    pub cache_creation_input_tokens: u32,

    /// The number of input tokens read from the cache.
    #[serde(default)]
    pub cache_read_input_tokens: u32,
}

impl MessagesResponse {
    /// Create a new assistant message with the given id and content
    pub fn new(id: String, model: String, content: Vec<ContentBlock>, usage: Usage) -> Self {
        Self {
            id,
            response_type: "message".to_string(),
            role: "assistant".to_string(),
            content,
            model,
            stop_reason: None,
            stop_sequence: None,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_serialization_tags() {
        let block = ContentBlock::Thinking {
            thinking: "hmm".to_string(),
            signature: None,
        };
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "thinking", "thinking": "hmm"})
        );

        let block = ContentBlock::ToolUse {
            id: "toolu_1".to_string(),
            name: "ls".to_string(),
            input: json!({}),
            signature: Some("s".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "tool_use", "id": "toolu_1", "name": "ls", "input": {}, "signature": "s"})
        );
        assert_eq!(block.kind(), "tool_use");
    }

    #[test]
    fn test_response_shape() {
        let mut resp = MessagesResponse::new(
            "msg_1".to_string(),
            "gemini-2.5-pro".to_string(),
            vec![ContentBlock::Text { text: "hi".to_string() }],
            Usage::default(),
        );
        resp.stop_reason = Some(StopReason::EndTurn);

        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["stop_reason"], "end_turn");
        assert_eq!(value["stop_sequence"], Value::Null);
        assert_eq!(value["usage"]["cache_creation_input_tokens"], 0);
        assert_eq!(value["content"][0]["type"], "text");
    }
}
