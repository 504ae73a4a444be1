//! Progress events and cooperative cancellation

use crossbeam_channel::Sender;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// One progress update from a running job
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Overall completion, 0-100
    pub percent: u8,
    /// Stage description
    pub message: String,
    /// Downscaled copy of the most recent output frame
    pub preview: Option<RgbImage>,
}

/// Sends [`ProgressEvent`]s; a reporter without a channel discards them
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<Sender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Report into `sender`
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A reporter that drops every event
    pub fn silent() -> Self {
        Self::default()
    }

    /// Report a stage
    pub fn report(&self, percent: u8, message: impl Into<String>) {
        self.send(percent, message.into(), None);
    }

    /// Report a stage with a preview frame
    pub fn report_with_preview(&self, percent: u8, message: impl Into<String>, preview: RgbImage) {
        self.send(percent, message.into(), Some(preview));
    }

    fn send(&self, percent: u8, message: String, preview: Option<RgbImage>) {
        trace!("Progress {}%: {}", percent, message);
        if let Some(sender) = &self.sender {
            // The receiver going away must not fail the job
            let _ = sender.send(ProgressEvent {
                percent: percent.min(100),
                message,
                preview,
            });
        }
    }
}

/// Shared flag checked between frames
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_clamps_and_survives_dropped_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let reporter = ProgressReporter::new(tx);
        reporter.report(150, "done");
        let event = rx.recv().unwrap();
        assert_eq!(event.percent, 100);
        assert_eq!(event.message, "done");
        assert!(event.preview.is_none());

        drop(rx);
        reporter.report(10, "nobody listening");
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
