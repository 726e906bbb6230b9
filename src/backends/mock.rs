//! Mock collaborators for testing and debugging
//!
//! These doubles let tests decide when and how each background-removal call
//! or preview decode resolves, so races between selections can be replayed
//! deterministically.

use crate::error::{Result, WorkflowError};
use crate::remover::BackgroundRemover;
use crate::services::{DataUriPreviewDecoder, DownloadSink, PreviewDecoder};
use crate::types::{FileCandidate, PreviewImage};
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch, Semaphore};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Succeed(Vec<u8>),
    Echo,
    Fail(String),
    Panic,
}

/// Remover that resolves every call the same way, after an optional delay
#[derive(Debug, Clone)]
pub struct MockRemover {
    behavior: MockBehavior,
    delay: Option<Duration>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockRemover {
    /// Succeed with `bytes` for every call
    #[must_use]
    pub fn succeeding(bytes: Vec<u8>) -> Self {
        Self::with_behavior(MockBehavior::Succeed(bytes))
    }

    /// Return the input bytes unchanged
    #[must_use]
    pub fn echoing() -> Self {
        Self::with_behavior(MockBehavior::Echo)
    }

    /// Fail every call with `message`
    #[must_use]
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self::with_behavior(MockBehavior::Fail(message.into()))
    }

    /// Panic inside every call
    #[must_use]
    pub fn panicking() -> Self {
        Self::with_behavior(MockBehavior::Panic)
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Delay every call by `delay`
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Names of the files this remover was called with
    pub fn get_call_history(&self) -> Vec<String> {
        lock(&self.call_history).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.call_history).len()
    }
}

#[async_trait]
impl BackgroundRemover for MockRemover {
    async fn remove_background(&self, file: &FileCandidate) -> anyhow::Result<Vec<u8>> {
        lock(&self.call_history).push(file.name().to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Succeed(bytes) => Ok(bytes.clone()),
            MockBehavior::Echo => Ok(file.bytes().to_vec()),
            MockBehavior::Fail(message) => Err(anyhow!(message.clone())),
            MockBehavior::Panic => panic!("mock remover panicked on {}", file.name()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct GatedCall {
    file_name: String,
    sender: Option<oneshot::Sender<anyhow::Result<Vec<u8>>>>,
}

/// Remover whose calls stay pending until the test resolves them
///
/// Calls are indexed in arrival order. Resolving them out of order replays a
/// superseded call finishing after a newer one.
pub struct GatedRemover {
    calls: Mutex<Vec<GatedCall>>,
    arrivals: watch::Sender<usize>,
}

impl GatedRemover {
    #[must_use]
    pub fn new() -> Self {
        let (arrivals, _) = watch::channel(0);
        Self {
            calls: Mutex::new(Vec::new()),
            arrivals,
        }
    }

    /// Wait until at least `count` calls have arrived
    pub async fn wait_for_calls(&self, count: usize) {
        let mut receiver = self.arrivals.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|arrived| *arrived >= count).await;
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// File names of all calls, in arrival order
    pub fn call_names(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.file_name.clone()).collect()
    }

    /// Resolve call `index` with `bytes`. Returns false if it was already resolved.
    pub fn succeed(&self, index: usize, bytes: Vec<u8>) -> bool {
        self.resolve(index, Ok(bytes))
    }

    /// Reject call `index` with `message`. Returns false if it was already resolved.
    pub fn fail<S: Into<String>>(&self, index: usize, message: S) -> bool {
        self.resolve(index, Err(anyhow!(message.into())))
    }

    fn resolve(&self, index: usize, outcome: anyhow::Result<Vec<u8>>) -> bool {
        let sender = lock(&self.calls)
            .get_mut(index)
            .and_then(|call| call.sender.take());
        match sender {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }
}

impl Default for GatedRemover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackgroundRemover for GatedRemover {
    async fn remove_background(&self, file: &FileCandidate) -> anyhow::Result<Vec<u8>> {
        let (sender, receiver) = oneshot::channel();
        let arrived = {
            let mut calls = lock(&self.calls);
            calls.push(GatedCall {
                file_name: file.name().to_string(),
                sender: Some(sender),
            });
            calls.len()
        };
        self.arrivals.send_replace(arrived);

        receiver
            .await
            .unwrap_or_else(|_| Err(anyhow!("gated call for {} was dropped", file.name())))
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Preview decoder that holds every decode until permits are released
pub struct GatedPreviewDecoder {
    permits: Semaphore,
    inner: DataUriPreviewDecoder,
}

impl GatedPreviewDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(0),
            inner: DataUriPreviewDecoder::new(false),
        }
    }

    /// Let `count` pending or future decodes finish
    pub fn release(&self, count: usize) {
        self.permits.add_permits(count);
    }
}

impl Default for GatedPreviewDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreviewDecoder for GatedPreviewDecoder {
    async fn decode(&self, file: &FileCandidate) -> Result<PreviewImage> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| WorkflowError::internal("preview gate closed"))?;
        permit.forget();
        Ok(self.inner.encode(file))
    }
}

/// A save recorded by [`MemoryDownloadSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDownload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Download sink that keeps saves in memory
#[derive(Default)]
pub struct MemoryDownloadSink {
    saves: Mutex<Vec<SavedDownload>>,
}

impl MemoryDownloadSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saves(&self) -> Vec<SavedDownload> {
        lock(&self.saves).clone()
    }
}

#[async_trait]
impl DownloadSink for MemoryDownloadSink {
    async fn save(&self, file_name: &str, media_type: &str, bytes: &[u8]) -> Result<String> {
        lock(&self.saves).push(SavedDownload {
            file_name: file_name.to_string(),
            media_type: media_type.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(format!("memory://{file_name}"))
    }
}
