//! Language model abstraction.
//!
//! Defines the [`LanguageModel`] trait and chat message types so the hosted
//! OpenRouter backend and scripted test models can be swapped freely.

pub mod openrouter;

use serde::{Deserialize, Serialize};

pub use openrouter::OpenRouterClient;

/// Async trait implemented by each chat-completion backend.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;
    async fn chat(&self, messages: Vec<Message>) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}
