use std::path::PathBuf;

use serde::Serialize;

/// Core error type.
///
/// The transport adapter maps reqwest / IO failures into this type; outbound
/// calls then fold it into an [`ApiFailure`] so callers see one failure shape.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error: HTTP {status}: {description}")]
    Protocol { status: u16, description: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("malformed update: {0}")]
    MalformedUpdate(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable class of an [`ApiFailure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Protocol,
    Decode,
    FileNotFound,
    Other,
}

/// Uniform failure value returned by every outbound API call.
///
/// Serializes as `{"ok": false, "error": "<description>"}`.
#[derive(Clone, Debug, Serialize, thiserror::Error)]
#[error("{error}")]
pub struct ApiFailure {
    ok: bool,
    pub error: String,
    #[serde(skip)]
    pub kind: FailureKind,
}

impl ApiFailure {
    pub fn new(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
            kind,
        }
    }

    /// Always `false`; kept so the value mirrors the API envelope.
    pub fn ok(&self) -> bool {
        self.ok
    }
}

impl From<Error> for ApiFailure {
    fn from(e: Error) -> Self {
        let kind = match &e {
            Error::Transport(_) => FailureKind::Transport,
            Error::Protocol { .. } => FailureKind::Protocol,
            Error::Decode(_) | Error::Json(_) => FailureKind::Decode,
            Error::FileNotFound(_) => FailureKind::FileNotFound,
            Error::Config(_) | Error::MalformedUpdate(_) | Error::Io(_) => FailureKind::Other,
        };
        Self::new(kind, e.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiFailure>;
