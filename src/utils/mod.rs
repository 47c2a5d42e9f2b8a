pub mod logger;
pub mod prompt;

pub use logger::{error, header, info, step, success, warning};
pub use prompt::{InteractivePrompt, PromptHandler};
