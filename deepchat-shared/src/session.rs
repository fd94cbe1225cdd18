//! Prompt assembly and credential-gated calls into a [`ChatBackend`].

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{error, info};

use crate::backend::{ChatBackend, FragmentStream};
use crate::config::ChatConfig;
use crate::credentials::Credentials;
use crate::error::ChatError;
use crate::openai::OpenAiBackend;
use crate::{ChatMessage, ChatRequest, ChatResult, MessageRole, StreamFragment, DEFAULT_MODEL};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

#[derive(Clone)]
pub struct ChatSession {
    backend: Option<Arc<dyn ChatBackend>>,
    credentials: Credentials,
    model: String,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, credentials: Credentials) -> Self {
        Self {
            backend: Some(backend),
            credentials,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Session over the OpenAI-compatible backend. Without credentials the
    /// session still builds, but every call is rejected by the gate.
    pub fn from_config(config: &ChatConfig) -> Self {
        let backend = match OpenAiBackend::new(&config.credentials) {
            Ok(backend) => Some(Arc::new(backend) as Arc<dyn ChatBackend>),
            Err(_) => None,
        };
        Self {
            backend,
            credentials: config.credentials.clone(),
            model: config.model.clone(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some() && self.credentials.is_ready()
    }

    /// System message first, then the user message. A missing or empty
    /// system prompt falls back to [`DEFAULT_SYSTEM_PROMPT`].
    pub fn build_messages(system_prompt: Option<&str>, user_prompt: &str) -> Vec<ChatMessage> {
        let system = match system_prompt {
            Some(prompt) if !prompt.is_empty() => prompt,
            _ => DEFAULT_SYSTEM_PROMPT,
        };
        vec![ChatMessage::system(system), ChatMessage::user(user_prompt)]
    }

    pub fn request(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
    ) -> Result<ChatRequest, ChatError> {
        ChatRequest::new(
            self.model.clone(),
            Self::build_messages(system_prompt, user_prompt),
        )
    }

    pub async fn complete_sync(&self, request: ChatRequest) -> Result<ChatResult, ChatError> {
        let backend = self.ready_backend()?;
        info!(
            "Sending chat request: model={} messages={}",
            request.model(),
            request.messages().len()
        );
        backend.complete_sync(request).await
    }

    pub async fn complete_stream(&self, request: ChatRequest) -> Result<FragmentStream, ChatError> {
        let backend = self.ready_backend()?;
        info!(
            "Opening chat stream: model={} messages={}",
            request.model(),
            request.messages().len()
        );
        backend.complete_stream(request).await
    }

    /// Runs one blocking turn and flattens every outcome into text. Failures
    /// come back as `Error: ...`, an empty result as the "no response" sentinel.
    pub async fn respond(&self, prompt: &str, system_prompt: Option<&str>) -> String {
        match self.try_respond(prompt, system_prompt).await {
            Ok(result) => result.text_or_sentinel().to_string(),
            Err(e) => e.to_payload(),
        }
    }

    pub async fn try_respond(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<ChatResult, ChatError> {
        let request = self.request(system_prompt, prompt)?;
        self.complete_sync(request).await.map_err(|e| {
            error!("Chat request failed: {}", e);
            e
        })
    }

    fn ready_backend(&self) -> Result<&Arc<dyn ChatBackend>, ChatError> {
        match &self.backend {
            Some(backend) if self.credentials.is_ready() => Ok(backend),
            _ => Err(ChatError::MissingCredentials),
        }
    }
}

/// What a consumer should surface for one fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Role(MessageRole),
    Content(String),
}

/// Consumer-side reconstruction of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamTranscript {
    pub role: Option<MessageRole>,
    pub content: String,
}

impl StreamTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one fragment in. A role is announced only the first time one
    /// arrives; empty content is a no-op.
    pub fn apply(&mut self, fragment: StreamFragment) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if let Some(role) = fragment.role {
            if self.role.is_none() {
                self.role = Some(role);
                events.push(StreamEvent::Role(role));
            }
        }
        if let Some(delta) = fragment.content {
            if !delta.is_empty() {
                self.content.push_str(&delta);
                events.push(StreamEvent::Content(delta));
            }
        }
        events
    }

    /// Drains the stream, stopping at the first error.
    pub async fn collect(mut stream: FragmentStream) -> Result<Self, ChatError> {
        let mut transcript = Self::new();
        while let Some(fragment) = stream.next().await {
            transcript.apply(fragment?);
        }
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    fn ready() -> Credentials {
        Credentials::new("https://models.example.test", "key")
    }

    #[test]
    fn default_system_prompt_when_absent() {
        let messages = ChatSession::build_messages(None, "hello");
        assert_eq!(
            messages,
            vec![ChatMessage::system(DEFAULT_SYSTEM_PROMPT), ChatMessage::user("hello")]
        );
        assert_eq!(messages[0].content, "You are a helpful AI assistant.");
    }

    #[test]
    fn default_system_prompt_when_empty() {
        let messages = ChatSession::build_messages(Some(""), "hello");
        assert_eq!(messages[0].content, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn custom_system_prompt_comes_first() {
        let messages = ChatSession::build_messages(Some("custom"), "hello");
        assert_eq!(
            messages,
            vec![ChatMessage::system("custom"), ChatMessage::user("hello")]
        );
    }

    #[tokio::test]
    async fn request_uses_session_model() {
        let session = ChatSession::new(Arc::new(MockBackend::new()), ready()).with_model("phi-4");
        let request = session.request(None, "hi").unwrap();
        assert_eq!(request.model(), "phi-4");
        assert_eq!(request.messages().len(), 2);
    }

    #[tokio::test]
    async fn blank_model_is_rejected_before_backend() {
        let backend = Arc::new(MockBackend::new());
        backend.push_reply("unused");
        let session = ChatSession::new(backend.clone(), ready()).with_model(" ");

        assert!(matches!(
            session.request(None, "hello"),
            Err(ChatError::InvalidRequest(_))
        ));
        let reply = session.respond("hello", None).await;
        assert_eq!(reply, "Error: invalid chat request: model identifier is not set");
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn session_from_config_without_credentials_rejects_calls() {
        let config = ChatConfig {
            credentials: Credentials::default(),
            model: "phi-4".into(),
        };
        let session = ChatSession::from_config(&config);
        assert!(!session.is_ready());
        assert_eq!(session.model(), "phi-4");
        assert_eq!(
            session.try_respond("hello", None).await,
            Err(ChatError::MissingCredentials)
        );
    }

    #[test]
    fn session_from_config_with_credentials_is_ready() {
        let config = ChatConfig {
            credentials: ready(),
            model: DEFAULT_MODEL.into(),
        };
        assert!(ChatSession::from_config(&config).is_ready());
    }

    #[tokio::test]
    async fn zero_choices_is_sentinel_not_error() {
        let backend = Arc::new(MockBackend::new());
        backend.push_empty();
        backend.push_empty();
        let session = ChatSession::new(backend, ready());

        let request = session.request(None, "hello").unwrap();
        assert_eq!(session.complete_sync(request).await, Ok(ChatResult::empty()));
        assert_eq!(
            session.respond("hello", None).await,
            "No response received from the model."
        );
    }

    #[tokio::test]
    async fn backend_failure_becomes_error_text() {
        let backend = Arc::new(MockBackend::new());
        backend.push_failure("connection reset by peer");
        let session = ChatSession::new(backend, ready());

        let reply = session.respond("hello", None).await;
        assert!(reply.starts_with("Error: "));
        assert!(reply.contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn reply_text_is_returned() {
        let backend = Arc::new(MockBackend::new());
        backend.push_reply("Paris");
        let session = ChatSession::new(backend.clone(), ready());

        assert_eq!(session.respond("capital of France?", Some("terse")).await, "Paris");

        let seen = backend.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model(), DEFAULT_MODEL);
        assert_eq!(
            seen[0].messages(),
            vec![ChatMessage::system("terse"), ChatMessage::user("capital of France?")]
        );
    }

    #[tokio::test]
    async fn missing_credentials_never_reach_backend() {
        let backend = Arc::new(MockBackend::new());
        backend.push_reply("unused");
        let session = ChatSession::new(backend.clone(), Credentials::default());

        assert!(!session.is_ready());
        assert_eq!(
            session.respond("hello", None).await,
            "Error: Azure OpenAI credentials are not set."
        );
        let request = session.request(None, "hello").unwrap();
        assert!(matches!(
            session.complete_stream(request).await,
            Err(ChatError::MissingCredentials)
        ));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn stream_reconstructs_role_and_content() {
        let backend = Arc::new(MockBackend::new());
        backend.push_stream(vec![
            StreamFragment::role(MessageRole::Assistant),
            StreamFragment::content("Hi"),
            StreamFragment::content(" there"),
        ]);
        let session = ChatSession::new(backend, ready());

        let request = session.request(None, "greet me").unwrap();
        let stream = session.complete_stream(request).await.unwrap();
        let transcript = StreamTranscript::collect(stream).await.unwrap();

        assert_eq!(transcript.role, Some(MessageRole::Assistant));
        assert_eq!(transcript.content, "Hi there");
    }

    #[tokio::test]
    async fn stream_is_single_pass() {
        let backend = Arc::new(MockBackend::new());
        backend.push_stream(vec![StreamFragment::content("once")]);
        let session = ChatSession::new(backend, ready());

        let request = session.request(None, "x").unwrap();
        let mut stream = session.complete_stream(request).await.unwrap();
        assert_eq!(
            stream.next().await,
            Some(Ok(StreamFragment::content("once")))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }

    #[test]
    fn role_is_announced_once() {
        let mut transcript = StreamTranscript::new();
        assert_eq!(
            transcript.apply(StreamFragment::role(MessageRole::Assistant)),
            vec![StreamEvent::Role(MessageRole::Assistant)]
        );
        let both = StreamFragment {
            role: Some(MessageRole::Assistant),
            content: Some("Hi".into()),
        };
        assert_eq!(transcript.apply(both), vec![StreamEvent::Content("Hi".into())]);
    }

    #[test]
    fn empty_fragments_are_no_ops() {
        let mut transcript = StreamTranscript::new();
        assert!(transcript.apply(StreamFragment::default()).is_empty());
        assert!(transcript.apply(StreamFragment::content("")).is_empty());
        assert_eq!(transcript, StreamTranscript::default());
    }

    #[tokio::test]
    async fn stream_error_stops_collection() {
        let backend = Arc::new(MockBackend::new());
        backend.push_stream_then_fail(vec![StreamFragment::content("partial")], "stream dropped");
        let session = ChatSession::new(backend, ready());

        let request = session.request(None, "x").unwrap();
        let stream = session.complete_stream(request).await.unwrap();
        assert_eq!(
            StreamTranscript::collect(stream).await,
            Err(ChatError::Backend("stream dropped".into()))
        );
    }
}
