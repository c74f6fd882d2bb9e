pub mod client;

use reqwest::Client;
use serde_json::Value;

/// Create a standardized HTTP client with security best practices
pub fn create_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .use_rustls_tls() // Use rustls with system certificate store
        .build()
}

/// Pull the human-readable messages out of a Vault error body. Vault wraps
/// failures as {"errors": ["..."]}; anything else is returned verbatim.
pub fn extract_error_messages(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(errors) = parsed.get("errors").and_then(|e| e.as_array()) {
            let messages: Vec<&str> = errors.iter().filter_map(|e| e.as_str()).collect();
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_vault_errors_array() {
        let body = r#"{"errors": ["no handler for route", "path unknown"]}"#;
        assert_eq!(
            extract_error_messages(body),
            "no handler for route; path unknown"
        );
    }

    #[test]
    fn test_extract_falls_back_to_raw_body() {
        assert_eq!(extract_error_messages("connection refused"), "connection refused");
    }

    #[test]
    fn test_extract_empty_body() {
        assert_eq!(extract_error_messages(""), "Unknown error");
        assert_eq!(extract_error_messages(r#"{"errors": []}"#), r#"{"errors": []}"#);
    }
}
