//! Queue-driven backend for tests. Each call pops the next canned outcome;
//! an empty queue answers with no choices (or an empty stream).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::stream;

use crate::backend::{ChatBackend, FragmentStream};
use crate::error::ChatError;
use crate::{ChatRequest, ChatResult, StreamFragment};

#[derive(Debug, Clone)]
enum MockOutcome {
    Reply(ChatResult),
    Stream(Vec<StreamFragment>, Option<String>),
    Failure(String),
}

#[derive(Debug, Default)]
pub struct MockBackend {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    requests: Mutex<Vec<ChatRequest>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.push(MockOutcome::Reply(ChatResult::new(text)));
    }

    /// Simulates a response with zero choices.
    pub fn push_empty(&self) {
        self.push(MockOutcome::Reply(ChatResult::empty()));
    }

    pub fn push_failure(&self, description: impl Into<String>) {
        self.push(MockOutcome::Failure(description.into()));
    }

    pub fn push_stream(&self, fragments: Vec<StreamFragment>) {
        self.push(MockOutcome::Stream(fragments, None));
    }

    /// Yields `fragments`, then a backend error.
    pub fn push_stream_then_fail(&self, fragments: Vec<StreamFragment>, description: impl Into<String>) {
        self.push(MockOutcome::Stream(fragments, Some(description.into())));
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        guard(&self.requests).clone()
    }

    fn push(&self, outcome: MockOutcome) {
        guard(&self.outcomes).push_back(outcome);
    }

    fn next(&self, request: ChatRequest) -> Option<MockOutcome> {
        guard(&self.requests).push(request);
        guard(&self.outcomes).pop_front()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete_sync(&self, request: ChatRequest) -> Result<ChatResult, ChatError> {
        match self.next(request) {
            None => Ok(ChatResult::empty()),
            Some(MockOutcome::Reply(result)) => Ok(result),
            Some(MockOutcome::Failure(description)) => Err(ChatError::Backend(description)),
            Some(MockOutcome::Stream(fragments, _)) => {
                let text: String = fragments.into_iter().filter_map(|f| f.content).collect();
                Ok(ChatResult::new(text))
            }
        }
    }

    async fn complete_stream(&self, request: ChatRequest) -> Result<FragmentStream, ChatError> {
        let (fragments, failure) = match self.next(request) {
            None => (Vec::new(), None),
            Some(MockOutcome::Stream(fragments, failure)) => (fragments, failure),
            Some(MockOutcome::Reply(result)) => (
                result.text.map(StreamFragment::content).into_iter().collect(),
                None,
            ),
            Some(MockOutcome::Failure(description)) => return Err(ChatError::Backend(description)),
        };

        let items = fragments
            .into_iter()
            .map(Ok)
            .chain(failure.map(|d| Err(ChatError::Backend(d))));
        Ok(Box::pin(stream::iter(items)))
    }
}
