// Helper functions for safe logging

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            let first = parts[0].chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```ignore
/// let masked = safe_token_log("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
/// // Returns: "eyJh...CJ9"
/// ```
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_masking() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("a@b"), "***@***.***");
        assert_eq!(safe_email_log("no-at-sign"), "***@***.***");
    }

    #[test]
    fn test_token_masking() {
        assert_eq!(safe_token_log("abcdefghijkl"), "abcd...ijkl");
        assert_eq!(safe_token_log("short"), "***");
        assert_eq!(safe_token_log("ünïcödé-tökén"), "***");
    }
}
