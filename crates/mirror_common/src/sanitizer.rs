//! Credential masking for operator-facing output
//!
//! Installation tokens travel through log lines and error messages (failed
//! endpoint attempts carry request context). Everything written to logs goes
//! through this sanitizer first.

use regex::Regex;
use std::sync::OnceLock;

static PATTERNS: OnceLock<Vec<(Regex, String)>> = OnceLock::new();

pub struct LogSanitizer {
    patterns: Vec<(Regex, String)>,
}

impl LogSanitizer {
    pub fn new() -> Self {
        let patterns = PATTERNS.get_or_init(|| {
            vec![
                // Integration tokens (dit_...) and company tokens (cdrtkn_...)
                (
                    Regex::new(r"\b(dit|cdrtkn)_[a-zA-Z0-9]{8,}").unwrap(),
                    "${1}_***".to_string(),
                ),
                // Webhook secrets
                (
                    Regex::new(r"\bwhsec_[a-zA-Z0-9]{8,}").unwrap(),
                    "whsec_***".to_string(),
                ),
                // Authorization headers echoed in transport errors
                (
                    Regex::new(r"(?i)bearer\s+[a-zA-Z0-9._-]{8,}").unwrap(),
                    "Bearer ***".to_string(),
                ),
                // Merchant emails occasionally present in order payloads
                (
                    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
                    "***@***.***".to_string(),
                ),
            ]
        });

        Self {
            patterns: patterns.clone(),
        }
    }

    pub fn sanitize(&self, message: &str) -> String {
        let mut result = message.to_string();
        for (pattern, replacement) in &self.patterns {
            result = pattern.replace_all(&result, replacement).to_string();
        }
        result
    }
}

impl Default for LogSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_token_redaction() {
        let sanitizer = LogSanitizer::new();
        let log = "resolved token dit_a1b2c3d4e5f6 for acme";
        assert_eq!(sanitizer.sanitize(log), "resolved token dit_*** for acme");
    }

    #[test]
    fn test_company_token_redaction() {
        let sanitizer = LogSanitizer::new();
        let log = "using cdrtkn_ZZ99aa88bb77";
        assert_eq!(sanitizer.sanitize(log), "using cdrtkn_***");
    }

    #[test]
    fn test_bearer_header_redaction() {
        let sanitizer = LogSanitizer::new();
        let log = "request failed: Authorization: Bearer abcdef123456";
        let sanitized = sanitizer.sanitize(log);
        assert!(sanitized.contains("Bearer ***"));
        assert!(!sanitized.contains("abcdef123456"));
    }

    #[test]
    fn test_email_redaction() {
        let sanitizer = LogSanitizer::new();
        let log = "order for buyer@example.com skipped";
        assert_eq!(sanitizer.sanitize(log), "order for ***@***.*** skipped");
    }

    #[test]
    fn test_short_prefixes_untouched() {
        // A bare "dit_" prefix with no token body is not credential material
        let sanitizer = LogSanitizer::new();
        let log = "token kind dit_ preferred";
        assert_eq!(sanitizer.sanitize(log), log);
    }
}
