//! Data models for Anthropic and Gemini APIs.
//!
//! This module contains the type definitions used by the translation core:
//! - The outbound Anthropic Messages response (`anthropic`)
//! - The upstream Google Gemini response (`gemini`)
//! - Model family classification (`mapping`)

// Author: kelexine (https://github.com/kelexine)

pub mod anthropic;
pub mod gemini;
pub mod mapping;

pub use anthropic::{ContentBlock, ImageSource, MessagesResponse, StopReason, Usage};
pub use gemini::{GenerateContentResponse, Part, RawPart};
pub use mapping::{model_family, ModelFamily};
