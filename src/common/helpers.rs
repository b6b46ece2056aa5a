// Helper functions for safe logging

use axum::http::Uri;

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            format!("{}***@{}", &parts[0][..1.min(parts[0].len())], parts[1])
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
/// ```
/// let masked = safe_token_log("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
/// // Returns: "eyJh...kpXVCJ9"
/// ```
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Masks any `token` query parameter in a request URI
///
/// Subscription streams authenticate via `?token=`, which would otherwise
/// land verbatim in request spans and body logs.
pub fn safe_uri_log(uri: &Uri) -> String {
    match uri.query() {
        None => uri.path().to_string(),
        Some(query) => {
            let masked: Vec<String> = query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some(("token", value)) => format!("token={}", safe_token_log(value)),
                    _ => pair.to_string(),
                })
                .collect();
            format!("{}?{}", uri.path(), masked.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("a@b"), "***@***.***");
        assert_eq!(safe_email_log("not-an-email"), "***@***.***");
    }

    #[test]
    fn test_safe_token_log() {
        assert_eq!(safe_token_log("abcdefghij"), "abcd...ghij");
        assert_eq!(safe_token_log("short"), "***");
    }

    #[test]
    fn test_safe_uri_log_masks_stream_tokens() {
        let uri: Uri = "/ws/tasks?token=eyJhbGciOiJIUzI1NiJ9.payload.sig"
            .parse()
            .expect("valid uri");
        let logged = safe_uri_log(&uri);
        assert!(!logged.contains("payload"), "token must not appear: {}", logged);
        assert_eq!(logged, "/ws/tasks?token=eyJh....sig");

        let mixed: Uri = "/ws/tasks/T_ABC123?other=1&token=abcdefghijkl"
            .parse()
            .expect("valid uri");
        assert_eq!(
            safe_uri_log(&mixed),
            "/ws/tasks/T_ABC123?other=1&token=abcd...ijkl"
        );

        let plain: Uri = "/api/tasks".parse().expect("valid uri");
        assert_eq!(safe_uri_log(&plain), "/api/tasks");
    }
}
