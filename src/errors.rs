#[cfg(feature = "server")]
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("No such top-level domain '{0}'")]
    SuffixNotFound(String),

    #[error("No WHOIS server found for '{0}'")]
    NoWhoisServer(String),

    #[error("Network timeout")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] tokio::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[source] reqwest::Error),

    #[error("Response too large")]
    ResponseTooLarge,

    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<tokio::time::error::Elapsed> for WhoisError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        WhoisError::Timeout
    }
}

impl From<reqwest::Error> for WhoisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WhoisError::Timeout
        } else {
            WhoisError::HttpError(e)
        }
    }
}

impl WhoisError {
    /// Short label used for logging and the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            WhoisError::InvalidDomain(_) => "invalid_domain",
            WhoisError::SuffixNotFound(_) => "suffix_not_found",
            WhoisError::NoWhoisServer(_) => "no_whois_server",
            WhoisError::Timeout => "timeout",
            WhoisError::IoError(_) => "io_error",
            WhoisError::HttpError(_) => "http_error",
            WhoisError::ResponseTooLarge => "response_too_large",
            WhoisError::InvalidUtf8 => "invalid_utf8",
            WhoisError::ConfigError(_) => "config_error",
            WhoisError::Internal(_) => "other",
        }
    }

    /// Plain-text diagnostic: the message, the debug form and every source in the chain.
    pub fn diagnostic(&self) -> String {
        let mut out = format!("{}\n\n{:?}\n", self, self);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\ncaused by: {}", cause));
            source = cause.source();
        }
        out
    }
}

#[cfg(feature = "server")]
impl IntoResponse for WhoisError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            WhoisError::SuffixNotFound(_) | WhoisError::NoWhoisServer(_) => {
                tracing::info!("{}", self);
                (StatusCode::NOT_FOUND, self.to_string())
            }
            WhoisError::Timeout => {
                tracing::warn!("Upstream timed out");
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            _ => {
                tracing::error!("Lookup failed ({}): {:?}", self.kind(), self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.diagnostic())
            }
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
