//! Server-side processing of one upload.
//!
//! Files are handled in upload order. Each yields one [`StreamEvent`]; a final
//! completion event closes the batch.

use crate::event::StreamEvent;
use crate::extract::{extract_text, truncate_for_context, MAX_CONTEXT_BYTES};
use crate::llm::{LanguageModel, Message};
use crate::prompt::PromptGenerator;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Runs extraction for uploaded files against a language model.
#[derive(Clone)]
pub struct Pipeline {
    model: Arc<dyn LanguageModel>,
    prompts: PromptGenerator,
}

impl Pipeline {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            prompts: PromptGenerator::new(model.clone()),
            model,
        }
    }

    /// Process every file, sending events to `tx`. Stops early if the receiver is gone.
    pub async fn run(
        &self,
        files: Vec<UploadedFile>,
        custom_prompt: Option<String>,
        tx: mpsc::Sender<StreamEvent>,
    ) {
        let total = files.len();
        for (index, file) in files.into_iter().enumerate() {
            info!("Processing {} ({}/{})", file.file_name, index + 1, total);
            let event = self.process_file(file, custom_prompt.as_deref()).await;
            if tx.send(event).await.is_err() {
                warn!("Client disconnected; abandoning remaining files");
                return;
            }
        }

        if tx.send(StreamEvent::complete()).await.is_err() {
            debug!("Client disconnected before completion event");
        } else {
            info!("Processing complete for {} files", total);
        }
    }

    /// Extract, prompt and run one file. Failures become a `FileError` event.
    pub async fn process_file(&self, file: UploadedFile, custom_prompt: Option<&str>) -> StreamEvent {
        let UploadedFile { file_name, data } = file;
        let text = {
            let file_name = file_name.clone();
            // lopdf parsing is CPU bound
            tokio::task::spawn_blocking(move || extract_text(&file_name, &data))
                .await
                .unwrap_or_else(|e| {
                    warn!("Text extraction task failed: {}", e);
                    String::new()
                })
        };
        if text.trim().is_empty() {
            return StreamEvent::FileError {
                file_name,
                error: "Could not extract text from document".to_string(),
                prompt: None,
            };
        }
        let text = truncate_for_context(&text, MAX_CONTEXT_BYTES);

        let prompt = match custom_prompt {
            Some(prompt) => prompt.to_string(),
            None => match self.prompts.generate(text).await {
                Ok(prompt) => prompt.trim().to_string(),
                Err(e) => {
                    return StreamEvent::FileError {
                        file_name: file_name.clone(),
                        error: format!("Prompt generation failed: {:#}", e),
                        prompt: None,
                    }
                }
            },
        };

        let messages = vec![Message::system(prompt.clone()), Message::user(text)];
        match self.model.chat(messages).await {
            Ok(processed_data) => {
                debug!(
                    "{}: model returned {} chars",
                    file_name,
                    processed_data.len()
                );
                StreamEvent::FileResult {
                    file_name: file_name.clone(),
                    processed_data,
                    prompt: Some(prompt),
                }
            }
            Err(e) => {
                warn!("Extraction failed for {}: {:#}", file_name, e);
                StreamEvent::FileError {
                    file_name: file_name.clone(),
                    error: format!("Extraction failed: {:#}", e),
                    prompt: Some(prompt),
                }
            }
        }
    }
}
