use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::ChatError;
use crate::{ChatRequest, ChatResult, StreamFragment};

/// Single-pass stream of fragments in arrival order. Dropping it releases
/// the underlying connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment, ChatError>> + Send>>;

/// An inference service that can answer a chat request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete_sync(&self, request: ChatRequest) -> Result<ChatResult, ChatError>;

    async fn complete_stream(&self, request: ChatRequest) -> Result<FragmentStream, ChatError>;
}
