//! Upload orchestration: selection → multipart request → event stream.

use crate::config::ClientConfig;
use crate::error::UploadError;
use crate::reconcile::Reconciler;
use crate::record::Batch;
use crate::state::StateHandle;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::path::Path;
use tracing::{info, warn};

/// A file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl SelectedFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, naming it after its last path component.
    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let data = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self { file_name, data })
    }
}

/// Drives uploads and feeds their event streams into shared state.
#[derive(Clone)]
pub struct UploadClient {
    http: Client,
    config: ClientConfig,
    state: StateHandle,
}

impl UploadClient {
    pub fn new(config: ClientConfig, state: StateHandle) -> Self {
        Self {
            http: Client::new(),
            config,
            state,
        }
    }

    /// Upload `files` and reconcile the response stream until it ends.
    ///
    /// Placeholders appear in state before the request is sent. Any transport
    /// failure fails the whole batch; per-file failures only touch their record.
    pub async fn upload(
        &self,
        files: Vec<SelectedFile>,
        custom_prompt: Option<&str>,
    ) -> Result<(), UploadError> {
        if files.is_empty() {
            return Ok(());
        }
        if files.len() > self.config.max_files {
            let err = UploadError::TooManyFiles {
                max: self.config.max_files,
            };
            warn!("Rejected selection of {} files: {}", files.len(), err);
            let message = err.to_string();
            self.state.update(|s| s.reject(message));
            return Err(err);
        }

        let custom_prompt = custom_prompt.map(str::trim).filter(|p| !p.is_empty());
        let (batch, placeholders) =
            Batch::from_selection(files.iter().map(|f| f.file_name.as_str()), custom_prompt);
        let retention = self.config.retention;
        self.state
            .update(|s| s.seed_batch(&batch, &placeholders, retention));

        info!(
            "Uploading {} files to {}",
            files.len(),
            self.config.endpoint
        );
        let mut reconciler = Reconciler::new(batch, self.state.clone());

        let response = match self.send(files, custom_prompt).await {
            Ok(response) => response,
            Err(err) => {
                reconciler.fail(&err.to_string());
                return Err(err);
            }
        };

        reconciler.consume(response.bytes_stream()).await
    }

    async fn send(
        &self,
        files: Vec<SelectedFile>,
        custom_prompt: Option<&str>,
    ) -> Result<Response, UploadError> {
        let mut form = Form::new();
        for file in files {
            form = form.part("files", Part::bytes(file.data).file_name(file.file_name));
        }
        if let Some(prompt) = custom_prompt {
            form = form.text("prompt", prompt.to_string());
        }

        let response = self
            .http
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let fallback = format!(
                "Initial request failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string();
            let message = match response.json::<serde_json::Value>().await {
                Ok(body) => ["message", "error"]
                    .iter()
                    .filter_map(|k| body.get(*k).and_then(|v| v.as_str()))
                    .find(|m| !m.is_empty())
                    .map(str::to_string)
                    .unwrap_or(fallback),
                Err(_) => fallback,
            };
            return Err(UploadError::Status { message });
        }

        if response.content_length() == Some(0) {
            return Err(UploadError::EmptyBody);
        }

        Ok(response)
    }
}
