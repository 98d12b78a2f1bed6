use thiserror::Error;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Status { code: u16, message: String },
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Build the error for a non-2xx response, preferring the server's own message.
    pub fn from_status(code: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["message", "error"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
            })
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {code}"));
        ApiError::Status { code, message }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Build the error for a 2xx body that reported `success: false`.
    pub fn rejected(error: Option<String>, fallback: &str) -> Self {
        ApiError::Rejected(
            error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_prefers_body_message() {
        let err = ApiError::from_status(400, r#"{"message":"instance_id is required"}"#);
        assert_eq!(err.to_string(), "instance_id is required");

        let err = ApiError::from_status(500, r#"{"error":"boom"}"#);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn status_error_falls_back_to_code() {
        assert_eq!(ApiError::from_status(502, "<html>").to_string(), "HTTP 502");
        assert_eq!(ApiError::from_status(404, "{}").to_string(), "HTTP 404");
    }

    #[test]
    fn rejected_uses_fallback_for_blank_errors() {
        let err = ApiError::rejected(Some("  ".into()), "start rejected");
        assert_eq!(err.to_string(), "start rejected");
        let err = ApiError::rejected(Some("simulation not found".into()), "x");
        assert_eq!(err.to_string(), "simulation not found");
    }
}
