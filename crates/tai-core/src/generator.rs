//! Code generation mediator.
//!
//! Wraps the user's request in a fixed instruction template, sends it to the
//! backend and hands back the response text. The response is only trimmed;
//! code fences or language tags the model adds are left in place.

use crate::core_types::{GeneratedCode, GenerationRequest, Message};
use crate::errors::{AssistantError, GenerationError};
use crate::llm::LLM;
use std::sync::Arc;

/// Render the instruction template around a user request.
pub fn format_prompt(prompt_text: &str) -> String {
    format!(
        "Generate Python code for the following request:\n\
         {}\n\
         \n\
         Consider that this code will run in Termux on Android.\n\
         Only include the code implementation, no explanations.",
        prompt_text
    )
}

pub struct CodeGenerator {
    backend: Arc<dyn LLM>,
}

impl CodeGenerator {
    pub fn new(backend: Arc<dyn LLM>) -> Self {
        Self { backend }
    }

    /// Ask the backend for code. Any backend fault, including an empty
    /// response, comes back as a single [`GenerationError`]. No retries.
    pub async fn generate_code(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedCode, GenerationError> {
        let messages = vec![Message::user(format_prompt(&request.prompt_text))];

        let response = self.backend.generate(messages).await.map_err(|e| {
            log::error!("Code generation failed: {}", e);
            GenerationError::from(e)
        })?;

        let text = response.content.unwrap_or_default();
        let source_text = text.trim();
        if source_text.is_empty() {
            log::warn!(
                "Backend returned no code (finish reason: {:?})",
                response.finish_reason
            );
            return Err(GenerationError::from(AssistantError::LLMError(
                "backend returned an empty response".to_string(),
            )));
        }

        log::info!("Generated {} bytes of code", source_text.len());
        Ok(GeneratedCode::new(source_text))
    }
}
