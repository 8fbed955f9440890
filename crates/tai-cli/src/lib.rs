//! Terminal front end for the Termux AI Assistant
//!
//! The `tai` binary reads requests at a `TAI> ` prompt, shows the generated
//! Python with syntax highlighting and runs it in the sandbox once the user
//! confirms. `--task` handles a single request non-interactively.

pub mod frontend;
pub mod session;

pub use frontend::{ConsoleFrontend, Frontend, ResultView};
pub use session::{InputCommand, Session, TurnOutcome};
