//! Error types for talking to the volunteer API and loading configuration.

use miette::Diagnostic;

/// Errors surfaced by the remote API client.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ApiError {
    /// Transport-level failure (connection refused, timeout, aborted fetch)
    #[error(transparent)]
    #[diagnostic(code(volunteer::api::http))]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("api returned {status}: {message}")]
    #[diagnostic(code(volunteer::api::status))]
    Status { status: u16, message: String },

    /// The body did not decode into the expected record
    #[error("failed to decode api response: {0}")]
    #[diagnostic(
        code(volunteer::api::decode),
        help("the server may be running an incompatible version")
    )]
    Decode(#[from] serde_json::Error),

    /// An endpoint could not be built from the configured base url
    #[error("invalid endpoint url: {0}")]
    #[diagnostic(code(volunteer::api::url))]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Build a status error from a response body, pulling out the server's
    /// `error` or `message` field when one is present.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    "no response body".to_owned()
                } else {
                    body.trim().to_owned()
                }
            });
        Self::Status { status, message }
    }

    /// Status code of the failed request, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Configuration loading errors
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    #[diagnostic(code(volunteer::config::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config file: {0}")]
    #[diagnostic(code(volunteer::config::parse))]
    Parse(#[from] toml::de::Error),
}
