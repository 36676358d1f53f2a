//! Credential scrubbing for log lines and error messages

/// Replacement text for a scrubbed secret
pub const REDACTED: &str = "[REDACTED]";

/// Replace every exact occurrence of `api_key` in `text` with [`REDACTED`]
///
/// An empty key leaves the input unchanged.
pub fn redact_api_key(text: &str, api_key: &str) -> String {
    if api_key.is_empty() {
        return text.to_string();
    }
    text.replace(api_key, REDACTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_api_key() {
        assert_eq!(
            redact_api_key("Error: key sk-ABC123 invalid", "sk-ABC123"),
            "Error: key [REDACTED] invalid"
        );
    }

    #[test]
    fn test_redact_every_occurrence() {
        assert_eq!(
            redact_api_key("sk-1 then sk-1 again", "sk-1"),
            "[REDACTED] then [REDACTED] again"
        );
    }

    #[test]
    fn test_redact_empty_key() {
        assert_eq!(
            redact_api_key("Error: key sk-ABC123 invalid", ""),
            "Error: key sk-ABC123 invalid"
        );
    }

    #[test]
    fn test_redact_absent_key() {
        assert_eq!(redact_api_key("all clear", "sk-ABC123"), "all clear");
    }
}
