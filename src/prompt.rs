//! Generation of per-document extraction prompts.

use crate::llm::{LanguageModel, Message};
use std::sync::Arc;
use tracing::{debug, error};

/// Asks a model to write the prompt that will extract key-value pairs from a document.
#[derive(Clone)]
pub struct PromptGenerator {
    model: Arc<dyn LanguageModel>,
}

impl PromptGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Returns the model's prompt text. Model errors are returned unchanged.
    pub async fn generate(&self, extracted_text: &str) -> anyhow::Result<String> {
        debug!(
            "Generating extraction prompt with {} ({} chars of text)",
            self.model.name(),
            extracted_text.len()
        );
        match self
            .model
            .chat(vec![Message::user(meta_prompt(extracted_text))])
            .await
        {
            Ok(prompt) => Ok(prompt),
            Err(e) => {
                error!("Error generating prompt response: {:#}", e);
                Err(e)
            }
        }
    }
}

fn meta_prompt(extracted_text: &str) -> String {
    format!(
        "You are a prompt generator. Given the following text, generate a clear and concise \
         prompt that instructs an AI to identify the type of text document, extract relevant \
         key-value pairs, and return them in JSON format. Do NOT include any sample JSON or \
         explanations - only return the prompt string. Text: {} Only return the prompt:",
        extracted_text
    )
}
