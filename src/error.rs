use std::io;

use thiserror::Error;

/// Errors of a single submission attempt. None of them is retried.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Failed to parse the problem URL {0}")]
    MalformedUrl(String),
    #[error("Another submission is still running")]
    Busy,
    #[error("Could not start cf tool at {path}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cf tool is not available at {0}. Check the path with `cfsubmit check`.")]
    ToolUnavailable(String),
}
