//! Recording implementations of callbacks and listener handlers

use std::sync::Arc;

use parking_lot::Mutex;

use crate::kafka::error::DemoError;
use crate::kafka::listener::Handler;
use crate::kafka::messages::{OutboundMessage, ReceivedMessage, RecordHeaders, SendResult};
use crate::kafka::producer::DeliveryCallback;

/// DeliveryCallback that remembers every outcome
#[derive(Debug, Default)]
pub struct RecordingCallback {
    successes: Mutex<Vec<SendResult>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingCallback {
    pub fn successes(&self) -> usize {
        self.successes.lock().len()
    }

    pub fn failures(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn last_error(&self) -> Option<String> {
        self.failures.lock().last().cloned()
    }
}

impl DeliveryCallback for RecordingCallback {
    fn on_success(&self, _message: &OutboundMessage, result: &SendResult) {
        self.successes.lock().push(*result);
    }

    fn on_failure(&self, _message: &OutboundMessage, error: &DemoError) {
        self.failures.lock().push(error.to_string());
    }
}

/// Collects what a listener handler was invoked with
#[derive(Debug, Default, Clone)]
pub struct RecordingHandler {
    seen: Arc<Mutex<Vec<(ReceivedMessage, RecordHeaders)>>>,
}

impl RecordingHandler {
    /// Handler closure feeding this recorder
    pub fn handler(&self) -> Handler {
        let seen = self.seen.clone();
        Arc::new(move |message: &ReceivedMessage, headers: &RecordHeaders| {
            seen.lock().push((message.clone(), headers.clone()));
        })
    }

    pub fn payloads(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(m, _)| m.payload.clone()).collect()
    }

    pub fn headers(&self) -> Vec<RecordHeaders> {
        self.seen.lock().iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}
