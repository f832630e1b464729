//! Scripted in-memory model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use contenize_shared::InlineImage;

use crate::{GenerativeModel, ImageRequest, StructuredRequest, StructuredResponse, UpstreamError};

type ImageScript =
    Box<dyn Fn(&ImageRequest) -> (Duration, Result<InlineImage, UpstreamError>) + Send + Sync>;

/// A [`GenerativeModel`] that replays queued structured responses and
/// answers image requests from a closure.
pub struct MockModel {
    structured: Mutex<VecDeque<Result<StructuredResponse, UpstreamError>>>,
    image: ImageScript,
    structured_requests: Mutex<Vec<StructuredRequest>>,
    image_requests: Mutex<Vec<ImageRequest>>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    /// A model with no scripted structured responses whose images always fail.
    pub fn new() -> Self {
        Self {
            structured: Mutex::new(VecDeque::new()),
            image: Box::new(|_| (Duration::ZERO, Err(UpstreamError::NoImage))),
            structured_requests: Mutex::new(Vec::new()),
            image_requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful structured response with the given text.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_structured(Ok(StructuredResponse {
            text: text.into(),
            finish_reason: Some("STOP".into()),
        }))
    }

    /// Queue an arbitrary structured outcome.
    pub fn with_structured(self, outcome: Result<StructuredResponse, UpstreamError>) -> Self {
        self.structured
            .lock()
            .expect("mock lock poisoned")
            .push_back(outcome);
        self
    }

    /// Answer image requests with `f`, which returns a delay and an outcome.
    pub fn with_images<F>(mut self, f: F) -> Self
    where
        F: Fn(&ImageRequest) -> (Duration, Result<InlineImage, UpstreamError>)
            + Send
            + Sync
            + 'static,
    {
        self.image = Box::new(f);
        self
    }

    pub fn structured_requests(&self) -> Vec<StructuredRequest> {
        self.structured_requests
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }

    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.image_requests
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<StructuredResponse, UpstreamError> {
        self.structured_requests
            .lock()
            .expect("mock lock poisoned")
            .push(request);
        self.structured
            .lock()
            .expect("mock lock poisoned")
            .pop_front()
            .unwrap_or(Err(UpstreamError::Transport("no scripted response".into())))
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<InlineImage, UpstreamError> {
        self.image_requests
            .lock()
            .expect("mock lock poisoned")
            .push(request.clone());
        let (delay, outcome) = (self.image)(&request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
