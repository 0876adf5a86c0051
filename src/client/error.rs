use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server refused the credentials or the token; the session has
    /// already been cleared and the caller should ask for a fresh login.
    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: StatusCode, message: String },

    #[error("request failed ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base url: {0}")]
    BaseUrl(String),

    #[error("no card with id {0} on the board")]
    UnknownCard(i32),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized { status, .. } | ClientError::Api { status, .. } => {
                Some(*status)
            }
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}
