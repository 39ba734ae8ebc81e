// Translation module - Gemini → Anthropic response translation
// Author: kelexine (https://github.com/kelexine)

pub mod parse;
pub mod response;

pub use parse::{normalize, parse_vendor_result, ParseDiagnostic, ParsedResult};
pub use response::{
    convert_response, spawn_translate_body, spawn_translate_response, translate_body,
    translate_response, PersistTask, Translation,
};
