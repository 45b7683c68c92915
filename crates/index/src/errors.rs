use reqwest::StatusCode;
use searchsync_source::SourceError;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to build the http client")]
    Client(#[source] reqwest::Error),
    #[error("request to `{url}` failed")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{url}` responded with {status}: {body}")]
    Status {
        url: Url,
        status: StatusCode,
        body: String,
    },
    #[error("`{url}` returned an unexpected body")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize bulk operation for `{id}`")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid url `{value}`")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to read from source")]
    Source(#[from] SourceError),
    #[error("operation cancelled")]
    Cancelled,
}

impl IndexError {
    /// Whether this error is, or was caused by, cancellation.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Source(SourceError::Cancelled))
    }
}
