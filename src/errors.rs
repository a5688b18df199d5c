//! Typed errors for the sync core.
//!
//! The binary layers `anyhow` on top of these; inside the library the
//! variants matter because the engine's retry policy depends on them:
//! node and decode failures abandon the current cycle, fatal store errors
//! terminate the process.

use std::time::Duration;

use thiserror::Error;

/// Failures talking to the Ethereum node.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("rpc transport error: {0}")]
    Transport(String),
    #[error("rpc call timed out after {0:?}")]
    Timeout(Duration),
    #[error("contract call failed: {0}")]
    Call(String),
}

/// Failures talking to PostgreSQL.
///
/// `Transient` covers connection loss and pool exhaustion; the window is
/// abandoned and retried on the next polling cycle. `Fatal` covers missing
/// schema and malformed SQL, which need operator intervention.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transient database error: {0}")]
    Transient(String),
    #[error("fatal database error: {0}")]
    Fatal(String),
}

/// Top-level error for the sync engine and its collaborators.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("invalid contract abi: {0}")]
    InvalidAbi(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no matching event for {0}")]
    UnknownEvent(String),
    #[error("log does not match abi: {0}")]
    DecodeMismatch(String),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// True when retrying the cycle cannot help and the process should stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidAbi(_)
                | SyncError::Config(_)
                | SyncError::Store(StoreError::Fatal(_))
        )
    }
}
