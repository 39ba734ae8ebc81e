// Identifier generation for messages and tool calls
// Author: kelexine (https://github.com/kelexine)

use uuid::Uuid;

/// Prefix of synthesized tool_use ids.
pub const TOOL_USE_PREFIX: &str = "toolu_";

/// Prefix of synthesized message ids.
pub const MESSAGE_PREFIX: &str = "msg_";

/// Random identifier with a namespace prefix.
///
/// Backed by v4 UUIDs, which draw 122 bits from the OS CSPRNG, rendered as
/// 32 lowercase hex characters.
pub fn generate_id(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple())
}

pub fn tool_use_id() -> String {
    generate_id(TOOL_USE_PREFIX)
}

pub fn message_id() -> String {
    generate_id(MESSAGE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prefix_and_shape() {
        let id = tool_use_id();
        assert!(id.starts_with("toolu_"));
        let suffix = &id[TOOL_USE_PREFIX.len()..];
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

        assert!(message_id().starts_with("msg_"));
    }

    #[test]
    fn test_ids_do_not_repeat_in_tight_loop() {
        let ids: HashSet<String> = (0..10_000).map(|_| tool_use_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
