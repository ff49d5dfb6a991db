use reqwest::StatusCode;
use thiserror::Error;

/// A pattern tree or clause that cannot be rendered as valid query text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("VALUES row {row} has {found} terms but the header binds {expected} variables")]
    ValuesRowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("UNION needs at least two branches, got {0}")]
    UnionBranches(usize),

    #[error("SELECT clause has no items")]
    EmptySelect,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("request to {endpoint} failed")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx answer. The body is kept verbatim for display.
    #[error("endpoint answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("endpoint returned a malformed result document")]
    Malformed {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// The message shown in place of a result table.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Status { body, .. } if !body.trim().is_empty() => body.clone(),
            ClientError::Malformed { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}
