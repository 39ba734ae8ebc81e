// Best-effort normalization of Gemini responses
// Author: kelexine (https://github.com/kelexine)

use crate::models::gemini::{FinishReason, GenerateContentResponse, Part, UsageMetadata};
use std::fmt;
use tracing::debug;

/// Something that was missing or malformed in the upstream response.
///
/// Diagnostics never stop a translation; they explain why the result is
/// smaller than the input looked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDiagnostic {
    /// The body was not a JSON generateContent response.
    MalformedJson(String),
    NoCandidates,
    /// The first candidate had no `content`.
    MissingContent,
    MissingUsage,
    /// A part was dropped because it had zero or several variants.
    InvalidPart { index: usize, reason: String },
    /// A functionResponse part showed up in model output and was dropped.
    UnexpectedFunctionResponse { index: usize, name: String },
    /// Function call arguments were not a JSON object and were replaced by `{}`.
    NonObjectArguments { index: usize, name: String },
    /// More cached tokens than prompt tokens were reported.
    InconsistentUsage { prompt: u32, cached: u32 },
}

impl ParseDiagnostic {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseDiagnostic::MalformedJson(_) => "malformed_json",
            ParseDiagnostic::NoCandidates => "no_candidates",
            ParseDiagnostic::MissingContent => "missing_content",
            ParseDiagnostic::MissingUsage => "missing_usage",
            ParseDiagnostic::InvalidPart { .. } => "invalid_part",
            ParseDiagnostic::UnexpectedFunctionResponse { .. } => "unexpected_function_response",
            ParseDiagnostic::NonObjectArguments { .. } => "non_object_arguments",
            ParseDiagnostic::InconsistentUsage { .. } => "inconsistent_usage",
        }
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDiagnostic::MalformedJson(e) => write!(f, "malformed response body: {}", e),
            ParseDiagnostic::NoCandidates => write!(f, "response has no candidates"),
            ParseDiagnostic::MissingContent => write!(f, "first candidate has no content"),
            ParseDiagnostic::MissingUsage => write!(f, "response has no usage metadata"),
            ParseDiagnostic::InvalidPart { index, reason } => {
                write!(f, "dropped part {}: {}", index, reason)
            }
            ParseDiagnostic::UnexpectedFunctionResponse { index, name } => write!(
                f,
                "dropped part {}: functionResponse '{}' in model output",
                index, name
            ),
            ParseDiagnostic::NonObjectArguments { index, name } => write!(
                f,
                "part {}: arguments of '{}' are not an object; using {{}}",
                index, name
            ),
            ParseDiagnostic::InconsistentUsage { prompt, cached } => write!(
                f,
                "cached tokens ({}) exceed prompt tokens ({}); input tokens clamped to 0",
                cached, prompt
            ),
        }
    }
}

/// Normalized first candidate of a Gemini response.
#[derive(Debug, Clone, Default)]
pub struct ParsedResult {
    /// Valid parts in their original order.
    pub parts: Vec<Part>,
    pub finish_reason: Option<FinishReason>,
    pub usage: UsageMetadata,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parse a raw response body. Never fails: a body that cannot be read yields
/// an empty result carrying a [`ParseDiagnostic::MalformedJson`].
pub fn parse_vendor_result(body: &str) -> ParsedResult {
    match serde_json::from_str::<GenerateContentResponse>(body) {
        Ok(resp) => normalize(resp),
        Err(e) => ParsedResult {
            diagnostics: vec![ParseDiagnostic::MalformedJson(e.to_string())],
            ..ParsedResult::default()
        },
    }
}

/// Flatten the envelope and validate the first candidate's parts.
///
/// Fields of the internal API envelope win over top-level ones.
pub fn normalize(resp: GenerateContentResponse) -> ParsedResult {
    let (candidates, usage) = match resp.response {
        Some(inner) => (
            inner.candidates.or(resp.candidates),
            inner.usage_metadata.or(resp.usage_metadata),
        ),
        None => (resp.candidates, resp.usage_metadata),
    };

    let mut parsed = ParsedResult::default();

    match usage {
        Some(usage) => parsed.usage = usage,
        None => parsed.diagnostics.push(ParseDiagnostic::MissingUsage),
    }
    let prompt = parsed.usage.prompt_token_count.unwrap_or(0);
    let cached = parsed.usage.cached_content_token_count.unwrap_or(0);
    if cached > prompt {
        parsed
            .diagnostics
            .push(ParseDiagnostic::InconsistentUsage { prompt, cached });
    }

    let Some(candidate) = candidates.and_then(|c| c.into_iter().next()) else {
        parsed.diagnostics.push(ParseDiagnostic::NoCandidates);
        return parsed;
    };
    parsed.finish_reason = candidate.finish_reason;

    let Some(content) = candidate.content else {
        parsed.diagnostics.push(ParseDiagnostic::MissingContent);
        return parsed;
    };

    for (index, raw) in content.parts.into_iter().enumerate() {
        match Part::try_from(raw) {
            Ok(Part::FunctionResponse { response }) => {
                parsed
                    .diagnostics
                    .push(ParseDiagnostic::UnexpectedFunctionResponse {
                        index,
                        name: response.name,
                    });
            }
            Ok(Part::FunctionCall { mut call, signature }) => {
                // tool_use.input must be an object; null counts as absent
                if call
                    .args
                    .as_ref()
                    .is_some_and(|args| !args.is_null() && !args.is_object())
                {
                    parsed
                        .diagnostics
                        .push(ParseDiagnostic::NonObjectArguments {
                            index,
                            name: call.name.clone(),
                        });
                    call.args = None;
                }
                parsed.parts.push(Part::FunctionCall { call, signature });
            }
            Ok(part) => parsed.parts.push(part),
            Err(e) => parsed.diagnostics.push(ParseDiagnostic::InvalidPart {
                index,
                reason: e.to_string(),
            }),
        }
    }

    debug!(
        "Normalized response: {} parts, finish_reason: {:?}, {} diagnostics",
        parsed.parts.len(),
        parsed.finish_reason,
        parsed.diagnostics.len()
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize_json(value: serde_json::Value) -> ParsedResult {
        normalize(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_inner_envelope_preferred() {
        let parsed = normalize_json(json!({
            "response": {
                "candidates": [{"content": {"parts": [{"text": "inner"}]}}],
                "usageMetadata": {"promptTokenCount": 7}
            },
            "candidates": [{"content": {"parts": [{"text": "outer"}]}}],
            "usageMetadata": {"promptTokenCount": 99}
        }));

        assert_eq!(parsed.parts, vec![Part::Text { text: "inner".to_string() }]);
        assert_eq!(parsed.usage.prompt_token_count, Some(7));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_top_level_used_without_envelope() {
        let parsed = normalize_json(json!({
            "candidates": [{"content": {"parts": [{"text": "outer"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 1}
        }));

        assert_eq!(parsed.parts.len(), 1);
        assert_eq!(parsed.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_only_first_candidate_is_used() {
        let parsed = normalize_json(json!({
            "candidates": [
                {"content": {"parts": [{"text": "first"}]}},
                {"content": {"parts": [{"text": "second"}]}}
            ],
            "usageMetadata": {}
        }));
        assert_eq!(parsed.parts, vec![Part::Text { text: "first".to_string() }]);
    }

    #[test]
    fn test_empty_input_degrades_with_diagnostics() {
        let parsed = normalize_json(json!({}));
        assert!(parsed.parts.is_empty());
        assert_eq!(
            parsed.diagnostics,
            vec![ParseDiagnostic::MissingUsage, ParseDiagnostic::NoCandidates]
        );

        let parsed = normalize_json(json!({"response": {"candidates": [{"finishReason": "STOP"}]}}));
        assert!(parsed.diagnostics.contains(&ParseDiagnostic::MissingContent));
        assert_eq!(parsed.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_bad_parts_dropped_in_order() {
        let parsed = normalize_json(json!({
            "candidates": [{"content": {"parts": [
                {"text": "a"},
                {"text": "b", "functionCall": {"name": "f"}},
                {"functionResponse": {"name": "f", "response": {}}},
                {"text": "c"}
            ]}}],
            "usageMetadata": {}
        }));

        assert_eq!(
            parsed.parts,
            vec![
                Part::Text { text: "a".to_string() },
                Part::Text { text: "c".to_string() }
            ]
        );
        let kinds: Vec<_> = parsed.diagnostics.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec!["invalid_part", "unexpected_function_response"]);
    }

    #[test]
    fn test_malformed_part_keeps_rest_of_body() {
        let body = json!({
            "candidates": [{"content": {"parts": [
                {"text": "Hello world"},
                {"inlineData": {"data": "AAAA"}},
                {"functionCall": {"args": {"x": 1}}},
                {"text": "after"}
            ]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
        })
        .to_string();

        let parsed = parse_vendor_result(&body);
        assert_eq!(
            parsed.parts,
            vec![
                Part::Text { text: "Hello world".to_string() },
                Part::Text { text: "after".to_string() }
            ]
        );
        assert_eq!(parsed.usage.prompt_token_count, Some(10));
        assert_eq!(parsed.usage.candidates_token_count, Some(5));
        assert_eq!(parsed.finish_reason, Some(FinishReason::Stop));
        let kinds: Vec<_> = parsed.diagnostics.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec!["invalid_part", "invalid_part"]);
    }

    #[test]
    fn test_non_object_arguments_replaced() {
        let parsed = normalize_json(json!({
            "candidates": [{"content": {"parts": [
                {"functionCall": {"name": "a", "args": [1, 2]}},
                {"functionCall": {"name": "b", "args": "go"}},
                {"functionCall": {"name": "c", "args": null}},
                {"functionCall": {"name": "d", "args": {"k": "v"}}}
            ]}}],
            "usageMetadata": {}
        }));

        let args: Vec<_> = parsed
            .parts
            .iter()
            .map(|part| match part {
                Part::FunctionCall { call, .. } => call.args.clone(),
                other => panic!("Expected FunctionCall part, got {:?}", other),
            })
            .collect();
        assert_eq!(args, vec![None, None, None, Some(json!({"k": "v"}))]);
        assert_eq!(
            parsed.diagnostics,
            vec![
                ParseDiagnostic::NonObjectArguments { index: 0, name: "a".to_string() },
                ParseDiagnostic::NonObjectArguments { index: 1, name: "b".to_string() }
            ]
        );
    }

    #[test]
    fn test_inconsistent_usage_flagged() {
        let parsed = normalize_json(json!({
            "candidates": [],
            "usageMetadata": {"promptTokenCount": 10, "cachedContentTokenCount": 30}
        }));
        assert!(parsed.diagnostics.contains(&ParseDiagnostic::InconsistentUsage {
            prompt: 10,
            cached: 30
        }));
    }

    #[test]
    fn test_malformed_body() {
        let parsed = parse_vendor_result("{not json");
        assert!(parsed.parts.is_empty());
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].kind(), "malformed_json");
    }
}
