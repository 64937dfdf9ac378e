use async_trait::async_trait;
use hostlink_datalink::{DataLink, DataLinkError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

type MockQueue = VecDeque<Result<String, DataLinkError>>;

/// Scripted link: answers from a queue and records every frame it was given.
#[derive(Clone, Default)]
pub(crate) struct MockLink {
    responses: Arc<Mutex<MockQueue>>,
    frames: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl MockLink {
    pub(crate) fn with_responses(responses: Vec<Result<String, DataLinkError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            ..Self::default()
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub(crate) async fn frames(&self) -> Vec<String> {
        self.frames.lock().await.clone()
    }
}

#[async_trait]
impl DataLink for MockLink {
    async fn round_trip(&self, frame: &str) -> Result<String, DataLinkError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.frames.lock().await.push(frame.to_string());
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or(DataLinkError::InvalidResponse("no mock response"))?
    }
}
