use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionStreamResponse, Role,
    },
    Client,
};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tracing::{debug, error, info};

use crate::backend::{ChatBackend, FragmentStream};
use crate::credentials::Credentials;
use crate::error::ChatError;
use crate::{ChatMessage, ChatRequest, ChatResult, MessageRole, StreamFragment};

/// Backend for any OpenAI-compatible chat completions endpoint, including
/// Azure AI model inference deployments.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
}

impl OpenAiBackend {
    pub fn new(credentials: &Credentials) -> Result<Self, ChatError> {
        let (endpoint, api_key) = match (&credentials.endpoint, &credentials.api_key) {
            (Some(endpoint), Some(api_key)) if credentials.is_ready() => (endpoint, api_key),
            _ => return Err(ChatError::MissingCredentials),
        };

        info!("Initializing chat backend for endpoint: {}", endpoint);
        let config = OpenAIConfig::new()
            .with_api_base(endpoint.trim_end_matches('/'))
            .with_api_key(api_key.clone());
        let client = Client::with_config(config);
        Ok(Self { client })
    }

    fn build_request(
        &self,
        request: ChatRequest,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest, ChatError> {
        let (model, messages) = request.into_parts();
        let messages = messages
            .into_iter()
            .map(convert_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(model).messages(messages);
        if stream {
            args.stream(true);
        }
        let payload = args.build()?;

        if let Ok(json) = serde_json::to_string_pretty(&payload) {
            debug!("Chat completion payload:\n{}", json);
        }
        Ok(payload)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete_sync(&self, request: ChatRequest) -> Result<ChatResult, ChatError> {
        let payload = self.build_request(request, false)?;

        let response = self.client.chat().create(payload).await.map_err(|e| {
            error!("Chat completion failed: {:?}", e);
            ChatError::from(e)
        })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        Ok(ChatResult { text })
    }

    async fn complete_stream(&self, request: ChatRequest) -> Result<FragmentStream, ChatError> {
        let payload = self.build_request(request, true)?;

        let updates = self.client.chat().create_stream(payload).await.map_err(|e| {
            error!("Failed to open chat stream: {:?}", e);
            ChatError::from(e)
        })?;

        // The first transport error ends the stream.
        let fragments = stream::unfold(Some(updates), |state| async move {
            let mut updates = state?;
            loop {
                match updates.next().await? {
                    Ok(update) => {
                        if let Some(fragment) = fragment_from_update(update) {
                            return Some((Ok(fragment), Some(updates)));
                        }
                    }
                    Err(e) => {
                        error!("Chat stream error: {:?}", e);
                        return Some((Err(ChatError::from(e)), None));
                    }
                }
            }
        });

        Ok(Box::pin(fragments))
    }
}

fn convert_message(msg: ChatMessage) -> Result<ChatCompletionRequestMessage, ChatError> {
    let message = match msg.role {
        MessageRole::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content)
                .build()?,
        ),
        MessageRole::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content)
                .build()?,
        ),
        MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(msg.content)
                .build()?,
        ),
    };
    Ok(message)
}

/// Only the first choice is considered; updates without choices carry nothing.
fn fragment_from_update(update: CreateChatCompletionStreamResponse) -> Option<StreamFragment> {
    let choice = update.choices.into_iter().next()?;
    Some(StreamFragment {
        role: choice.delta.role.map(convert_role),
        content: choice.delta.content,
    })
}

fn convert_role(role: Role) -> MessageRole {
    match role {
        Role::System => MessageRole::System,
        Role::User => MessageRole::User,
        _ => MessageRole::Assistant,
    }
}
