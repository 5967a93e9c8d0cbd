//! Chat transcript and log viewer

use super::{Controller, ViewEvent};
use crate::api::LogSource;
use crate::models::{ChatMessage, ChatRequest, ChatRole};
use serde::{Deserialize, Serialize};

/// Shown in place of an empty log
pub const NO_LOGS: &str = "No logs";

/// Connection and sampling settings for the chat panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Base URL of the OpenAI-compatible server
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            model: "default-model".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct ChatState {
    pub(super) settings: ChatSettings,
    pub(super) transcript: Vec<ChatMessage>,
}

/// Result of sending one chat message
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// Blank input; nothing was sent
    Ignored,
    Replied(String),
    /// An error entry was appended to the transcript
    Errored(String),
}

impl Controller {
    pub async fn chat_settings(&self) -> ChatSettings {
        self.chat.read().await.settings.clone()
    }

    pub async fn set_chat_settings(&self, settings: ChatSettings) {
        self.chat.write().await.settings = settings;
    }

    /// Append the user message, post the conversation and append the reply
    pub async fn send_chat(&self, text: &str) -> ChatOutcome {
        let text = text.trim();
        if text.is_empty() {
            return ChatOutcome::Ignored;
        }

        let request = {
            let mut chat = self.chat.write().await;
            chat.transcript.push(ChatMessage::new(ChatRole::User, text));
            ChatRequest {
                messages: chat
                    .transcript
                    .iter()
                    .filter(|m| m.role != ChatRole::Error)
                    .cloned()
                    .collect(),
                model: chat.settings.model.clone(),
                temperature: chat.settings.temperature,
                max_tokens: chat.settings.max_tokens,
                url: chat.settings.url.clone(),
            }
        };
        self.emit(ViewEvent::Chat);

        let outcome = match self.api.chat(&request).await {
            Ok(response) => match response.first_content() {
                Some(content) => ChatOutcome::Replied(content.to_string()),
                None => ChatOutcome::Errored("No reply received".to_string()),
            },
            Err(e) => ChatOutcome::Errored(format!("Error: {}", e)),
        };

        let entry = match &outcome {
            ChatOutcome::Replied(content) => ChatMessage::new(ChatRole::Assistant, content.clone()),
            ChatOutcome::Errored(message) => ChatMessage::new(ChatRole::Error, message.clone()),
            ChatOutcome::Ignored => return outcome,
        };
        self.chat.write().await.transcript.push(entry);
        self.emit(ViewEvent::Chat);
        outcome
    }

    /// Drop the whole transcript at once
    pub async fn clear_chat(&self) {
        self.chat.write().await.transcript.clear();
        self.emit(ViewEvent::Chat);
    }

    /// Ask the chat server for its models and adopt the first one
    pub async fn fetch_chat_models(&self) -> Option<String> {
        let url = self.chat.read().await.settings.url.clone();
        match self.api.chat_models(&url).await {
            Ok(list) => {
                if let Some(first) = list.data.first() {
                    let id = first.id.clone();
                    self.chat.write().await.settings.model = id.clone();
                    self.notifications.success(format!("Found model: {}", id));
                    Some(id)
                } else if let Some(error) = list.error {
                    self.notifications
                        .error(format!("Failed to list models: {}", error));
                    None
                } else {
                    self.notifications.info("No models available");
                    None
                }
            }
            Err(e) => {
                self.notifications
                    .error(format!("Failed to list models: {}", e));
                None
            }
        }
    }

    /// Fetch log text, substituting a marker when the log is empty
    pub async fn fetch_logs(&self, source: &LogSource, lines: Option<u32>) -> Option<String> {
        if let LogSource::Container(name) = source {
            if name.trim().is_empty() {
                self.notifications.warning("Select a container first");
                return None;
            }
        }

        let lines = lines.unwrap_or_else(|| source.default_lines());
        match self.api.logs(source, lines).await {
            Ok(text) if text.trim().is_empty() => Some(NO_LOGS.to_string()),
            Ok(text) => Some(text),
            Err(e) => {
                self.notifications.error(format!("Failed to load logs: {}", e));
                None
            }
        }
    }
}
