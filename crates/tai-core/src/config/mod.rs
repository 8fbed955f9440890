//! Configuration module for the assistant
//!
//! Settings live in a YAML file under `~/.config/termux_ai_assistant`, created
//! with defaults on first run. Backend credentials are kept in a separate JSON
//! file the settings point at.

pub mod credentials;
pub mod loader;
pub mod types;
pub mod validation;

pub use credentials::*;
pub use loader::*;
pub use types::*;
