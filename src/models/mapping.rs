// Model family classification
// Author: kelexine (https://github.com/kelexine)

use crate::error::ProxyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse model lineage that minted a thought signature.
///
/// Signatures are only safe to replay to a model of the same family; the
/// tag is persisted next to every cached thinking signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Claude,
    Gemini,
    Unknown,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Claude => "claude",
            ModelFamily::Gemini => "gemini",
            ModelFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(ModelFamily::Claude),
            "gemini" => Ok(ModelFamily::Gemini),
            "unknown" => Ok(ModelFamily::Unknown),
            other => Err(ProxyError::InvalidFamily(other.to_string())),
        }
    }
}

/// Classify a model identifier, e.g. "gemini-3-pro-preview" or
/// "claude-sonnet-4-5-20250929". Routing prefixes such as "models/" or a
/// provider path are tolerated.
pub fn model_family(model: &str) -> ModelFamily {
    let normalized = model.trim().to_ascii_lowercase();
    let name = normalized.rsplit('/').next().unwrap_or(&normalized);

    if name.contains("claude") {
        ModelFamily::Claude
    } else if name.contains("gemini") {
        ModelFamily::Gemini
    } else {
        ModelFamily::Unknown
    }
}
