//! Language model backend abstraction.
//!
//! The mediator only needs "messages in, text out". Provider implementations
//! live under [`providers`] and translate that into their own wire format.

pub use crate::core_types::{LLMResponse, Message, Role};
use crate::errors::AssistantError;
use async_trait::async_trait;

pub mod providers;

pub use providers::create_llm_client;

#[async_trait]
pub trait LLM: Send + Sync {
    async fn generate(&self, messages: Vec<Message>) -> Result<LLMResponse, AssistantError>;
}
