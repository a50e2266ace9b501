//! Client-side upload errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("You can upload a maximum of {max} files at a time.")]
    TooManyFiles { max: usize },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server answered the upload with a non-success status.
    #[error("{message}")]
    Status { message: String },

    #[error("Response body is empty, cannot read SSE stream.")]
    EmptyBody,

    /// The request could not be sent or built.
    #[error("{0}")]
    Transport(String),

    /// The event stream broke after it started.
    #[error("{0}")]
    Stream(String),
}
