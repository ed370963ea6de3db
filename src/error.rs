use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a call to the maze backend.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("maze backend request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid maze backend payload (status {status}): {source}")]
    Parse {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Transport(err) if err.is_timeout())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("action requires a signed-in account")]
    Unauthenticated,
}

#[derive(Error, Debug)]
pub enum NearError {
    #[error("NEAR RPC request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("NEAR RPC returned an error: {0}")]
    Rpc(String),

    #[error("invalid NEAR view payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid token amount {0:?}")]
    Amount(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no account is signed in")]
    NotSignedIn,
}
