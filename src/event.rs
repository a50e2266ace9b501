//! Stream event wire types.
//!
//! The server emits [`StreamEvent`] as the JSON body of each `data:` line. The
//! client reads events back leniently through [`EventPayload`], which also
//! accepts servers that only send the legacy completion message.

use serde::{Deserialize, Serialize};

/// Message text carried by the completion event.
pub const COMPLETE_MESSAGE: &str = "Processing complete";

/// Event emitted by the ingest server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    /// The model produced output for one file.
    FileResult {
        file_name: String,
        processed_data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    /// Processing one file failed.
    FileError {
        file_name: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    /// Every file in the upload has been handled.
    Complete { message: String },
}

impl StreamEvent {
    pub fn complete() -> Self {
        Self::Complete {
            message: COMPLETE_MESSAGE.to_string(),
        }
    }
}

/// Lenient view of an event payload as received by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    /// Usually a string holding (possibly fenced) JSON, but any JSON value is accepted.
    #[serde(default)]
    pub processed_data: Option<serde_json::Value>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl EventPayload {
    /// Whether this payload signals that the whole upload finished.
    pub fn is_complete(&self) -> bool {
        self.kind.as_deref() == Some("complete") || self.message.as_deref() == Some(COMPLETE_MESSAGE)
    }
}
