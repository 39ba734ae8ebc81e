// Response translation (Gemini → Anthropic)
// Author: kelexine (https://github.com/kelexine)

use crate::cache::{SignatureCache, SignatureCapture};
use crate::metrics;
use crate::models::anthropic::{ContentBlock, ImageSource, MessagesResponse, StopReason, Usage};
use crate::models::gemini::{FinishReason, GenerateContentResponse, Part, UsageMetadata};
use crate::models::{model_family, ModelFamily};
use crate::translation::parse::{normalize, parse_vendor_result, ParseDiagnostic, ParsedResult};
use crate::utils::ids;
use serde_json::{json, Value};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

/// Output of the pure conversion step.
#[derive(Debug, Clone)]
pub struct Translation {
    /// The message to hand to the client.
    pub message: MessagesResponse,
    /// Signatures to persist for later turns.
    pub captures: Vec<SignatureCapture>,
    /// What was missing or dropped from the input.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Translation {
    /// Hand back the message at once and persist captured signatures on a
    /// background task.
    ///
    /// The message is already final; cache failures only cost future turns
    /// the ability to replay these signatures. Abort the returned task to
    /// cancel writes that have not landed yet.
    pub fn spawn_persist(self, cache: &SignatureCache) -> (MessagesResponse, PersistTask) {
        if self.captures.is_empty() {
            return (self.message, PersistTask { handle: None });
        }

        let cache = cache.clone();
        let captures = self.captures;
        let message_id = self.message.id.clone();
        let handle = tokio::spawn(async move {
            let stored = cache.record_captures(&captures).await;
            debug!(
                "Persisted {}/{} signature captures for {}",
                stored,
                captures.len(),
                message_id
            );
            stored
        });
        (self.message, PersistTask { handle: Some(handle) })
    }
}

/// Background signature writes of one translated response.
///
/// Dropping the task detaches it; the writes keep running.
#[derive(Debug)]
pub struct PersistTask {
    handle: Option<JoinHandle<usize>>,
}

impl PersistTask {
    /// Whether there was anything to persist.
    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
    }

    /// Handle for cancelling the writes from elsewhere, e.g. when the
    /// originating request is cancelled.
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        self.handle.as_ref().map(JoinHandle::abort_handle)
    }

    /// Cancel writes still in flight.
    pub fn abort(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    /// Wait for the writes and return how many landed. Aborted or
    /// panicked tasks count as zero.
    pub async fn finished(self) -> usize {
        match self.handle {
            Some(handle) => match handle.await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Signature persist task did not complete: {}", e);
                    0
                }
            },
            None => 0,
        }
    }
}

/// Translate Gemini response to Anthropic format.
///
/// Returns without waiting on the cache: captured signatures are written by
/// a detached task. Must be called from within a Tokio runtime.
pub async fn translate_response(
    gemini_resp: GenerateContentResponse,
    model: &str,
    cache: &SignatureCache,
) -> MessagesResponse {
    spawn_translate_response(gemini_resp, model, cache).0
}

/// Same as [`translate_response`] starting from the raw response body.
pub async fn translate_body(body: &str, model: &str, cache: &SignatureCache) -> MessagesResponse {
    spawn_translate_body(body, model, cache).0
}

/// Like [`translate_response`], also returning the background write task so
/// the caller can tie it to the request's lifetime or wait for it.
pub fn spawn_translate_response(
    gemini_resp: GenerateContentResponse,
    model: &str,
    cache: &SignatureCache,
) -> (MessagesResponse, PersistTask) {
    convert_response(normalize(gemini_resp), model, cache.min_signature_length())
        .spawn_persist(cache)
}

/// Like [`translate_body`], also returning the background write task.
pub fn spawn_translate_body(
    body: &str,
    model: &str,
    cache: &SignatureCache,
) -> (MessagesResponse, PersistTask) {
    convert_response(parse_vendor_result(body), model, cache.min_signature_length())
        .spawn_persist(cache)
}

/// Build the Anthropic message from a normalized response. Never fails.
///
/// Signatures shorter than `min_signature_length` are kept on thinking blocks
/// but neither copied onto tool_use blocks nor captured.
pub fn convert_response(
    parsed: ParsedResult,
    model: &str,
    min_signature_length: usize,
) -> Translation {
    debug!("Translating Gemini response to Anthropic format");

    for diagnostic in &parsed.diagnostics {
        warn!("Degraded Gemini response for {}: {}", model, diagnostic);
        metrics::record_diagnostic(diagnostic.kind());
    }

    // 1. Convert parts in order
    let mut converter = PartConverter::new(model_family(model), min_signature_length);
    let mut content: Vec<ContentBlock> = parsed
        .parts
        .into_iter()
        .filter_map(|part| converter.convert(part))
        .collect();

    // 2. Target protocol requires non-empty content
    if content.is_empty() {
        content.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    // 3. Stop reason and usage
    let stop_reason = derive_stop_reason(converter.has_tool_calls, parsed.finish_reason.as_ref());
    let usage = derive_usage(&parsed.usage);

    let mut message = MessagesResponse::new(ids::message_id(), model.to_string(), content, usage);
    message.stop_reason = Some(stop_reason);

    metrics::record_translation(stop_reason.as_str());
    metrics::record_tokens(
        model,
        usage.input_tokens,
        usage.output_tokens,
        usage.cache_read_input_tokens,
    );
    debug!(
        "Translated response: {} content blocks, stop_reason: {}, usage: {:?}",
        message.content.len(),
        stop_reason.as_str(),
        usage
    );

    Translation {
        message,
        captures: converter.captures,
        diagnostics: parsed.diagnostics,
    }
}

/// Per-response conversion state.
struct PartConverter {
    family: ModelFamily,
    min_signature_length: usize,
    has_tool_calls: bool,
    captures: Vec<SignatureCapture>,
}

impl PartConverter {
    fn new(family: ModelFamily, min_signature_length: usize) -> Self {
        Self {
            family,
            min_signature_length,
            has_tool_calls: false,
            captures: Vec::new(),
        }
    }

    fn trusted(&self, signature: Option<String>) -> Option<String> {
        signature.filter(|sig| sig.len() >= self.min_signature_length)
    }

    fn convert(&mut self, part: Part) -> Option<ContentBlock> {
        match part {
            Part::Text { text } => Some(ContentBlock::Text { text }),

            Part::Thought { text, signature } => {
                if let Some(sig) = self.trusted(signature.clone()) {
                    self.captures.push(SignatureCapture::Thinking {
                        signature: sig,
                        family: self.family,
                    });
                }
                Some(ContentBlock::Thinking {
                    thinking: text,
                    signature,
                })
            }

            Part::FunctionCall { call, signature } => {
                debug!("Translating function call: {}", call.name);
                self.has_tool_calls = true;

                let id = call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(ids::tool_use_id);
                let input = call
                    .args
                    .filter(Value::is_object)
                    .unwrap_or_else(|| json!({}));
                let signature = self.trusted(signature);
                if let Some(sig) = &signature {
                    self.captures.push(SignatureCapture::Tool {
                        id: id.clone(),
                        signature: sig.clone(),
                    });
                }

                Some(ContentBlock::ToolUse {
                    id,
                    name: call.name,
                    input,
                    signature,
                })
            }

            Part::InlineData { inline_data } => {
                debug!(
                    "Translating Gemini-generated image: {} ({} bytes)",
                    inline_data.mime_type,
                    inline_data.data.len()
                );
                Some(ContentBlock::Image {
                    source: ImageSource::Base64 {
                        media_type: Some(inline_data.mime_type),
                        data: inline_data.data,
                    },
                })
            }

            Part::FunctionResponse { response } => {
                // Tool results come from the user, never from the assistant
                warn!(
                    "Unexpected function response in model output: {}",
                    response.name
                );
                None
            }
        }
    }
}

/// Map Gemini finish reason to Anthropic stop reason.
/// Any tool call in the output wins over the reported finish reason.
fn derive_stop_reason(has_tool_calls: bool, finish_reason: Option<&FinishReason>) -> StopReason {
    if has_tool_calls || finish_reason.is_some_and(FinishReason::is_tool_invocation) {
        return StopReason::ToolUse;
    }
    match finish_reason {
        Some(FinishReason::MaxTokens) => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

/// Split Gemini's cache-inclusive prompt count into Anthropic's fields.
/// Inconsistent reports (cached > prompt) clamp input tokens to zero.
fn derive_usage(usage: &UsageMetadata) -> Usage {
    let prompt = usage.prompt_token_count.unwrap_or(0);
    let cached = usage.cached_content_token_count.unwrap_or(0);
    Usage {
        input_tokens: prompt.saturating_sub(cached),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
        cache_creation_input_tokens: 0,
        cache_read_input_tokens: cached,
    }
}
