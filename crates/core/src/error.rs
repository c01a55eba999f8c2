use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that must reach the operator.
///
/// Soft failures are deliberately not represented here: a missing or
/// malformed document reads as empty, and a failed stats fetch is an
/// absent value.
#[derive(Debug, Error)]
pub enum Error {
    /// The lemonade server could not be reached at all (connection
    /// refused, DNS, timeout).
    #[error("cannot reach lemonade server: {0}")]
    UpstreamUnavailable(#[source] reqwest::Error),

    /// The lemonade server answered with a non-success status.
    #[error("{operation} rejected by lemonade server ({status}): {body}")]
    UpstreamRejected {
        operation: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    /// A persisted document could not be written.
    #[error("failed to write {path}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
