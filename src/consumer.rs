//! Queue consumption loop.
//!
//! Delivery is at-least-once: a message is deleted from the queue only after
//! its reading was decoded, archived and analyzed. Anything else leaves the
//! message in place and the queue's visibility timeout decides when it comes
//! back. There is no local retry, requeue or dead-lettering.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    analysis::{AnalysisError, ReadingAnalyzer, Verdict},
    payload::{decode_reading, PayloadError},
};

/// Largest batch a single poll asks for.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Long-poll wait per receive call.
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(20);
/// Fixed pause after a failed poll.
pub const DEFAULT_POLL_BACKOFF: Duration = Duration::from_secs(1);

/// One delivery of a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Transport identifier, used to correlate log lines.
    pub message_id: String,
    /// Token required to acknowledge (delete) this delivery.
    pub receipt_handle: String,
    pub body: String,
}

/// The two queue operations the consumer needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Long-poll for up to `max_messages`, waiting at most `wait` when empty.
    async fn receive(&self, max_messages: usize, wait: Duration) -> anyhow::Result<Vec<QueueMessage>>;

    /// Acknowledge a delivery so it is never redelivered.
    async fn delete(&self, receipt_handle: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSettings {
    pub batch_size: usize,
    pub wait_time: Duration,
    pub poll_backoff: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            wait_time: DEFAULT_WAIT_TIME,
            poll_backoff: DEFAULT_POLL_BACKOFF,
        }
    }
}

/// Result of handling one message. Only `Processed` is acknowledged.
#[derive(Debug)]
pub enum MessageOutcome {
    Processed(Verdict),
    PayloadRejected(PayloadError),
    AnalysisFailed { reading_id: Uuid, error: AnalysisError },
}

pub struct QueueConsumer {
    queue: Arc<dyn MessageQueue>,
    analyzer: Arc<dyn ReadingAnalyzer>,
    settings: ConsumerSettings,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        analyzer: Arc<dyn ReadingAnalyzer>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            queue,
            analyzer,
            settings,
        }
    }

    /// Polls and processes batches until `ctx` is cancelled.
    ///
    /// Cancellation is honoured between batches: a pending poll or backoff is
    /// abandoned, but a batch that has been received always runs to the end.
    /// Poll failures are logged and retried forever after a fixed backoff.
    pub async fn run(&self, ctx: CancellationToken) {
        info!(
            batch_size = self.settings.batch_size,
            wait_secs = self.settings.wait_time.as_secs(),
            backoff_ms = self.settings.poll_backoff.as_millis() as u64,
            "Starting queue consumer"
        );

        while !ctx.is_cancelled() {
            let received = tokio::select! {
                _ = ctx.cancelled() => break,
                result = self.queue.receive(self.settings.batch_size, self.settings.wait_time) => result,
            };

            match received {
                Ok(messages) => self.process_batch(&messages).await,
                Err(e) => {
                    error!(error = ?e, "Failed to poll queue");
                    tokio::select! {
                        _ = ctx.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.poll_backoff) => {}
                    }
                }
            }
        }

        info!("Queue consumer stopped");
    }

    async fn process_batch(&self, messages: &[QueueMessage]) {
        if messages.is_empty() {
            debug!("No messages in batch");
            return;
        }

        debug!(message_count = messages.len(), "Received message batch");

        for message in messages {
            match self.process_message(message).await {
                MessageOutcome::Processed(verdict) => self.acknowledge(message, verdict).await,
                MessageOutcome::PayloadRejected(e) => {
                    error!(
                        message_id = %message.message_id,
                        error = %e,
                        "Failed to decode message; leaving it for redelivery"
                    );
                }
                MessageOutcome::AnalysisFailed { reading_id, error } => {
                    error!(
                        message_id = %message.message_id,
                        reading_id = %reading_id,
                        error = %error,
                        "Failed to process message; leaving it for redelivery"
                    );
                }
            }
        }
    }

    /// Decode and analyze one message without touching the queue.
    pub async fn process_message(&self, message: &QueueMessage) -> MessageOutcome {
        let reading = match decode_reading(&message.body) {
            Ok(reading) => reading,
            Err(e) => return MessageOutcome::PayloadRejected(e),
        };

        match self.analyzer.analyze_and_persist(&reading).await {
            Ok(verdict) => MessageOutcome::Processed(verdict),
            Err(error) => MessageOutcome::AnalysisFailed {
                reading_id: reading.id,
                error,
            },
        }
    }

    async fn acknowledge(&self, message: &QueueMessage, verdict: Verdict) {
        match self.queue.delete(&message.receipt_handle).await {
            Ok(()) => debug!(
                message_id = %message.message_id,
                verdict = ?verdict,
                "Message processed and acknowledged"
            ),
            Err(e) => error!(
                message_id = %message.message_id,
                error = ?e,
                "Failed to acknowledge message; it will be redelivered"
            ),
        }
    }
}
