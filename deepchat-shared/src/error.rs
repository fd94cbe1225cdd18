use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatError {
    #[error("Azure OpenAI credentials are not set.")]
    MissingCredentials,

    #[error("invalid chat request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Backend(String),
}

impl ChatError {
    /// Text form used by the lenient string channel: `Error: <description>`.
    pub fn to_payload(&self) -> String {
        format!("Error: {}", self)
    }
}

impl From<async_openai::error::OpenAIError> for ChatError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;
        match err {
            OpenAIError::InvalidArgument(msg) => ChatError::InvalidRequest(msg),
            OpenAIError::ApiError(api_err) => {
                ChatError::Backend(format!("{} (code: {:?})", api_err.message, api_err.code))
            }
            other => ChatError::Backend(other.to_string()),
        }
    }
}
