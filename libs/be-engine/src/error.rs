use std::time::Duration;

use be_api::SinkError;

use crate::session::SessionState;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config ({context}): {detail}")]
    Invalid { context: &'static str, detail: String },

    #[error("config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("no token: pass --token or set `token` in the config file")]
    MissingToken,

    #[error("unknown sink kind '{kind}' (available: {})", available.join(", "))]
    UnknownSink { kind: String, available: Vec<&'static str> },

    #[error("sink '{name}': {source}")]
    Sink {
        name: String,
        #[source]
        source: SinkError,
    },
}

/// Terminal failure of a stream session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no token given")]
    MissingToken,

    #[error("invalid credentials")]
    Unauthorized,

    #[error("{url}: unexpected status {status}")]
    Status { status: u16, url: String },

    #[error("failed to connect: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("stream read failed: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("no data for {0:?}")]
    ReadTimeout(Duration),

    #[error("{count} consecutive malformed units, last: {last}")]
    Decode { count: u32, last: String },

    #[error("cancelled")]
    Cancelled,

    #[error("http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("session cannot start again from state {0:?}")]
    AlreadyStarted(SessionState),
}

/// Coarse classification used for exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Usage,
    Auth,
    Transport,
    Decode,
    Cancelled,
}

impl SessionError {
    pub fn failure(&self) -> Failure {
        match self {
            SessionError::MissingToken | SessionError::AlreadyStarted(_) => Failure::Usage,
            SessionError::Unauthorized => Failure::Auth,
            SessionError::Decode { .. } => Failure::Decode,
            SessionError::Cancelled => Failure::Cancelled,
            SessionError::Status { .. }
            | SessionError::Connect(_)
            | SessionError::ConnectTimeout(_)
            | SessionError::Read(_)
            | SessionError::ReadTimeout(_)
            | SessionError::Client(_) => Failure::Transport,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("no targets given")]
    NoTargets,

    #[error("targets must be all IP addresses or all CIDR ranges: {0}")]
    InvalidTargets(String),

    #[error("failed to make request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid credentials")]
    Unauthorized,

    #[error("received invalid json: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("error in creating job: {0}")]
    Rejected(String),
}
