use regex::Regex;
use std::sync::LazyLock;

use crate::chat::dtos::{ChatMessage, Role};
use crate::extractor::normalize_whitespace;

/// Prior turns forwarded to the completion backend.
pub const MAX_HISTORY: usize = 10;

/// Prepended to every conversation sent to the completion backend.
pub const SYSTEM_PROMPT: &str = "You are an expert search engine. You will give answers based on the context given to you and you will always cite your sources.";

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("Failed to compile url regex"));

/// A user message split into the first URL it mentions and the remaining text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitMessage {
    pub url: Option<String>,
    pub text: String,
}

/// Pulls the first `http(s)://` URL out of `message`. The URL is removed from
/// the text and the surrounding whitespace collapsed.
pub fn split_message(message: &str) -> SplitMessage {
    match URL_PATTERN.find(message) {
        Some(found) => {
            let remainder = format!("{}{}", &message[..found.start()], &message[found.end()..]);
            SplitMessage {
                url: Some(found.as_str().to_string()),
                text: normalize_whitespace(&remainder),
            }
        }
        None => SplitMessage {
            url: None,
            text: message.trim().to_string(),
        },
    }
}

pub fn build_user_prompt(text: &str, content: &str) -> String {
    format!(
        "Answer the question or perform: \"{text}\".\n\
         Using the following content\n\
         <content>\n\
         {content}\n\
         </content>,\n\
         DO NOT mention anything about the content or context provided to you."
    )
}

/// The most recent `MAX_HISTORY` prior turns followed by the new user turn.
pub fn build_messages(history: &[ChatMessage], user_prompt: String) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(MAX_HISTORY);
    let mut messages = Vec::with_capacity(history.len() - start + 1);
    messages.extend_from_slice(&history[start..]);
    messages.push(ChatMessage::new(Role::User, user_prompt));
    messages
}
