use thiserror::Error;

/// Errors that can occur when talking to a user's Notion workspace.
///
/// The split between transient and permanent failures is load-bearing:
/// retrying a malformed payload burns rate-limit budget without any chance
/// of success, so only [`is_transient`](NotionError::is_transient) errors
/// go back through the retry executor.
#[derive(Debug, Error)]
pub enum NotionError {
    /// No integration token was provided for this workspace.
    #[error("missing Notion integration token")]
    MissingToken,

    /// The token was rejected (revoked, or the integration lost access).
    #[error("Notion API rejected the token (unauthorized)")]
    Unauthorized,

    /// A page, database, or block does not exist or is not shared with
    /// the integration.
    #[error("not found: {0}")]
    NotFound(String),

    /// The workspace's rate limit was hit (HTTP 429). Retryable.
    #[error("Notion API rate limit hit")]
    RateLimited,

    /// A server-side failure (HTTP 5xx). Retryable.
    #[error("transient Notion API failure: {0}")]
    Transient(String),

    /// The request itself is malformed (4xx other than 401/403/404/429).
    /// Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse a response body.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A retryable operation still failed after every allowed attempt.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<NotionError>,
    },
}

impl NotionError {
    /// `true` for failures where a later identical attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NotionError::RateLimited | NotionError::Transient(_) => true,
            NotionError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Classify an HTTP status code returned by the Notion API.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> NotionError {
        match status.as_u16() {
            401 | 403 => NotionError::Unauthorized,
            404 => NotionError::NotFound(truncate(body)),
            429 => NotionError::RateLimited,
            500..=599 => NotionError::Transient(format!("{status}: {}", truncate(body))),
            _ => NotionError::InvalidRequest(format!("{status}: {}", truncate(body))),
        }
    }
}

/// Keep error bodies readable in log lines.
fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        let cut: String = body.chars().take(MAX).collect();
        format!("{cut}…")
    } else {
        body.to_string()
    }
}

pub type Result<T> = std::result::Result<T, NotionError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_classification() {
        assert!(matches!(
            NotionError::from_status(StatusCode::UNAUTHORIZED, ""),
            NotionError::Unauthorized
        ));
        assert!(matches!(
            NotionError::from_status(StatusCode::FORBIDDEN, ""),
            NotionError::Unauthorized
        ));
        assert!(matches!(
            NotionError::from_status(StatusCode::NOT_FOUND, "no such page"),
            NotionError::NotFound(_)
        ));
        assert!(matches!(
            NotionError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            NotionError::RateLimited
        ));
        assert!(matches!(
            NotionError::from_status(StatusCode::BAD_GATEWAY, ""),
            NotionError::Transient(_)
        ));
        assert!(matches!(
            NotionError::from_status(StatusCode::BAD_REQUEST, "bad filter"),
            NotionError::InvalidRequest(_)
        ));
    }

    #[test]
    fn transient_split() {
        assert!(NotionError::RateLimited.is_transient());
        assert!(NotionError::Transient("502".into()).is_transient());
        assert!(!NotionError::Unauthorized.is_transient());
        assert!(!NotionError::InvalidRequest("bad".into()).is_transient());
        assert!(!NotionError::NotFound("gone".into()).is_transient());
        assert!(!NotionError::MissingToken.is_transient());
    }
}
