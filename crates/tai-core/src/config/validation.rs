//! Sanity checks applied after a configuration is parsed.

use crate::config::types::AssistantConfig;
use crate::errors::AssistantError;
use crate::llm::providers::validate_provider_config;

impl AssistantConfig {
    pub fn validate(&self) -> Result<(), AssistantError> {
        validate_provider_config(&self.llm)?;

        let execution = &self.execution;
        if execution.timeout == 0 {
            return Err(AssistantError::ValidationError(
                "execution.timeout must be at least 1 second".to_string(),
            ));
        }

        if execution.workspace.as_os_str().is_empty() {
            return Err(AssistantError::ValidationError(
                "execution.workspace must not be empty".to_string(),
            ));
        }

        if let Some(interpreter) = &execution.interpreter {
            if interpreter.as_os_str().is_empty() {
                return Err(AssistantError::ValidationError(
                    "execution.interpreter must not be empty when set".to_string(),
                ));
            }
        }

        for name in &execution.inherit_env {
            if name.is_empty() || name.contains('=') {
                return Err(AssistantError::ValidationError(format!(
                    "execution.inherit_env contains an invalid variable name: '{}'",
                    name
                )));
            }
        }

        Ok(())
    }
}
