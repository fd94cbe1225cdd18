pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;
pub mod session;

use serde::{Deserialize, Serialize};

pub use backend::{ChatBackend, FragmentStream};
pub use config::ChatConfig;
pub use credentials::{is_ready, Credentials};
pub use error::ChatError;
pub use openai::OpenAiBackend;
pub use session::{ChatSession, StreamEvent, StreamTranscript};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "DeepSeek-R1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

/// A single chat turn sent to the backend. Built fresh per call; the model
/// is never blank and the message list never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChatRequest")]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct RawChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

impl TryFrom<RawChatRequest> for ChatRequest {
    type Error = ChatError;

    fn try_from(raw: RawChatRequest) -> Result<Self, Self::Error> {
        ChatRequest::new(raw.model, raw.messages)
    }
}

impl ChatRequest {
    /// Fails if the model is blank or there are no messages.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Result<Self, ChatError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ChatError::InvalidRequest("model identifier is not set".into()));
        }
        if messages.is_empty() {
            return Err(ChatError::InvalidRequest("message list is empty".into()));
        }
        Ok(Self { model, messages })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_parts(self) -> (String, Vec<ChatMessage>) {
        (self.model, self.messages)
    }
}

/// Outcome of a blocking completion. `text` is `None` when the model
/// produced no choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub text: Option<String>,
}

impl ChatResult {
    pub const NO_RESPONSE: &'static str = "No response received from the model.";

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }

    /// The reply text, or the "no response" sentinel.
    pub fn text_or_sentinel(&self) -> &str {
        self.text.as_deref().unwrap_or(Self::NO_RESPONSE)
    }
}

/// One incremental update of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamFragment {
    pub fn role(role: MessageRole) -> Self {
        Self {
            role: Some(role),
            content: None,
        }
    }

    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            role: None,
            content: Some(delta.into()),
        }
    }
}

/// Prompt submitted by a client, over the form endpoint or the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default, rename = "systemPrompt")]
    pub system_prompt: Option<String>,
}

/// Frame pushed to socket clients while a reply streams in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    pub done: bool,
}

impl From<StreamFragment> for StreamFrame {
    fn from(fragment: StreamFragment) -> Self {
        Self {
            role: fragment.role,
            delta: fragment.content,
            done: false,
        }
    }
}

impl StreamFrame {
    pub fn done() -> Self {
        Self {
            done: true,
            ..Default::default()
        }
    }

    pub fn error(err: &ChatError) -> Self {
        Self {
            role: None,
            delta: Some(err.to_payload()),
            done: true,
        }
    }
}
