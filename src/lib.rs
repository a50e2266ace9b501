//! Document ingestion: upload files, let a language model extract structured
//! data, and follow the results as a server-sent-event stream.
//!
//! The server half lives in [`server`] and [`pipeline`]. The client half is
//! [`upload`] (request orchestration), [`reconcile`] (stream → state) and
//! [`render`] (state → text).

pub mod config;
pub mod decode;
pub mod error;
pub mod event;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod reconcile;
pub mod record;
pub mod render;
pub mod server;
pub mod sse;
pub mod state;
pub mod upload;

pub use error::UploadError;
pub use record::{Batch, FileRecord, RecordStatus};
pub use state::{Banner, StateHandle, UploadState};
pub use upload::{SelectedFile, UploadClient};
