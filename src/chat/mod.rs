pub mod completion;
pub mod dtos;
pub mod handlers;
pub mod prompt;

pub use completion::{CompletionClient, CompletionError, OpenAiCompatClient};
pub use dtos::{ChatMessage, ChatRequest, ChatResponse, ErrorResponse, Role};
