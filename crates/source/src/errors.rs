use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SourceError {
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
    #[error("`{url}` returned a body that is not valid JSON")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid url `{value}`")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to mint access token")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("object type `{0}` not found")]
    ObjectTypeNotFound(&'static str),
    #[error("operation cancelled")]
    Cancelled,
}
