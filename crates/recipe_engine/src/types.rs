use std::io;

use thiserror::Error;

use crate::PersistError;

/// Failure while turning one stream line into an event.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed event line {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("event line is not a JSON object: {line:?}")]
    NotAnObject { line: String },
    #[error("event stream is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("io error while reading event stream: {0}")]
    Io(#[from] io::Error),
    #[error("cancelled")]
    Cancelled,
}

/// Failure talking to the remote generation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service responded with status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("could not decode service response: {0}")]
    Decode(String),
    #[error(transparent)]
    Ingest(IngestError),
    #[error("cancelled")]
    Cancelled,
}

impl From<IngestError> for ServiceError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Cancelled => ServiceError::Cancelled,
            other => ServiceError::Ingest(other),
        }
    }
}

impl ServiceError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Cancelled)
    }
}

/// Failure to hand a recipe to the executor. An unsuccessful run is not an error.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("execution unit has no key")]
    MissingKey,
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("could not encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },
}
