//! Error handling for GerryDB API operations.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error bodies longer than this are truncated.
const MAX_RAW_DETAIL: usize = 512;

/// The status and server provided detail of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub detail: Option<String>,
}

#[derive(Deserialize)]
struct DetailBody {
    detail: serde_json::Value,
}

impl ErrorResponse {
    /// Parse an error body.
    ///
    /// The API reports errors as `{"detail": ...}` where detail is either
    /// a message or a list of validation failures.
    /// Anything else is kept as plain text, truncated to [MAX_RAW_DETAIL] bytes.
    pub(crate) fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let detail = match serde_json::from_slice::<DetailBody>(body) {
            Ok(DetailBody {
                detail: serde_json::Value::String(message),
            }) => Some(message),
            Ok(DetailBody { detail }) => Some(detail.to_string()),
            Err(_) => {
                let text = String::from_utf8_lossy(body);
                let text = text.trim();
                (!text.is_empty()).then(|| truncate(text, MAX_RAW_DETAIL))
            },
        };
        Self { status, detail }
    }
}

/// Cut `text` to at most `max` bytes on a character boundary.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let end = (0..=max)
        .rev()
        .find(|index| text.is_char_boundary(*index))
        .unwrap_or(0);
    format!("{}...", &text[..end])
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Common error type for GerryDB API operations.
///
/// Non-success responses are classified by status,
/// so consumers don't need to inspect raw responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found ({0})")]
    NotFound(ErrorResponse),
    #[error("conflict ({0})")]
    Conflict(ErrorResponse),
    #[error("access denied ({0})")]
    Forbidden(ErrorResponse),
    #[error("request rejected ({0})")]
    Validation(ErrorResponse),
    #[error("server error ({0})")]
    Server(ErrorResponse),
    #[error("unexpected response ({0})")]
    UnexpectedStatus(ErrorResponse),
    #[error("request failed")]
    Connection(#[source] reqwest::Error),
    #[error("failed to parse response")]
    Decode(#[source] serde_json::Error),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
}

impl ApiError {
    /// Classify a non-success response.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let response = ErrorResponse::from_body(status, body);
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(response),
            StatusCode::CONFLICT => ApiError::Conflict(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Forbidden(response),
            status if status.is_client_error() => ApiError::Validation(response),
            status if status.is_server_error() => ApiError::Server(response),
            _ => ApiError::UnexpectedStatus(response),
        }
    }

    /// The response that caused this error, if the server answered.
    pub fn response(&self) -> Option<&ErrorResponse> {
        match self {
            ApiError::NotFound(response)
            | ApiError::Conflict(response)
            | ApiError::Forbidden(response)
            | ApiError::Validation(response)
            | ApiError::Server(response)
            | ApiError::UnexpectedStatus(response) => Some(response),
            _ => None,
        }
    }

    /// Whether the failure lies with the server or the network
    /// rather than with the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Server(_) | ApiError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn detail_message_is_extracted() {
        let response =
            ErrorResponse::from_body(StatusCode::CONFLICT, br#"{"detail": "already exists"}"#);
        assert_eq!(response.detail.as_deref(), Some("already exists"));
        assert_eq!(response.to_string(), "409 Conflict: already exists");
    }

    #[test]
    fn structured_detail_is_kept_as_json() {
        let response = ErrorResponse::from_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            br#"{"detail": [{"loc": ["body", "path"], "msg": "field required"}]}"#,
        );
        assert_eq!(
            response.detail.as_deref(),
            Some(r#"[{"loc":["body","path"],"msg":"field required"}]"#)
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = format!("<html>{}</html>", "x".repeat(1000));
        let response = ErrorResponse::from_body(StatusCode::BAD_GATEWAY, body.as_bytes());
        let detail = response.detail.unwrap();
        assert!(detail.starts_with("<html>xxx"));
        assert!(detail.ends_with("..."));
        assert_eq!(detail.len(), MAX_RAW_DETAIL + 3);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(MAX_RAW_DETAIL);
        let truncated = truncate(&text, MAX_RAW_DETAIL);
        assert_eq!(truncated, format!("{}...", "é".repeat(MAX_RAW_DETAIL / 2)));
    }

    #[test]
    fn statuses_are_classified() {
        let classify = |code: u16| ApiError::from_response(StatusCode::from_u16(code).unwrap(), b"");
        assert!(matches!(classify(404), ApiError::NotFound(_)));
        assert!(matches!(classify(409), ApiError::Conflict(_)));
        assert!(matches!(classify(401), ApiError::Forbidden(_)));
        assert!(matches!(classify(403), ApiError::Forbidden(_)));
        assert!(matches!(classify(400), ApiError::Validation(_)));
        assert!(matches!(classify(422), ApiError::Validation(_)));
        assert!(matches!(classify(500), ApiError::Server(_)));
        assert!(matches!(classify(503), ApiError::Server(_)));
        assert!(matches!(classify(304), ApiError::UnexpectedStatus(_)));
        assert!(classify(502).is_transient());
        assert!(!classify(409).is_transient());
    }

    proptest! {
        #[test]
        fn other_client_errors_are_validation_errors(code in 400_u16..500) {
            prop_assume!(![401, 403, 404, 409].contains(&code));
            let err = ApiError::from_response(StatusCode::from_u16(code).unwrap(), b"");
            prop_assert!(matches!(err, ApiError::Validation(_)));
            prop_assert!(!err.is_transient());
        }
    }
}
