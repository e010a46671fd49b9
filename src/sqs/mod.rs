//! Amazon SQS implementation of [`MessageQueue`].
//!
//! Credentials and region come from the AWS default provider chain
//! (environment, shared profile, web identity, container role, instance
//! metadata), so the same binary runs with static keys locally and with a
//! task or instance role in AWS.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, SdkConfig};
use aws_sdk_sqs::{config::Region, error::DisplayErrorContext, types::Message, Client};
use tracing::{debug, warn};

use crate::{
    config::SqsConfig,
    consumer::{MessageQueue, QueueMessage},
};

/// Region used when neither configuration nor the provider chain names one.
pub const FALLBACK_REGION: &str = "us-east-1";
/// Hard SQS limit on `MaxNumberOfMessages`.
const MAX_BATCH: usize = 10;

#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Resolve region and credentials, then build the client.
    pub async fn connect(config: &SqsConfig) -> Self {
        let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new(FALLBACK_REGION));

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        Self::from_sdk_config(&shared, config)
    }

    pub fn from_sdk_config(shared: &SdkConfig, config: &SqsConfig) -> Self {
        let mut builder = aws_sdk_sqs::config::Builder::from(shared);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        Self::from_client(Client::from_conf(builder.build()), &config.queue_url)
    }

    pub fn from_client(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(|r| r.as_ref())
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    /// Long-poll for up to `max_messages` (clamped to 1..=10).
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, MAX_BATCH) as i32)
            .wait_time_seconds(wait.as_secs().min(20) as i32)
            .send()
            .await
            .map_err(|e| anyhow!("SQS ReceiveMessage failed: {}", DisplayErrorContext(&e)))?;

        let messages: Vec<QueueMessage> = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(to_queue_message)
            .collect();

        debug!(message_count = messages.len(), "ReceiveMessage returned");
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| anyhow!("SQS DeleteMessage failed: {}", DisplayErrorContext(&e)))?;
        Ok(())
    }
}

/// A delivery without a receipt handle can never be acknowledged; it is
/// skipped and comes back after its visibility timeout.
fn to_queue_message(message: Message) -> Option<QueueMessage> {
    let message_id = message.message_id.unwrap_or_default();
    let Some(receipt_handle) = message.receipt_handle else {
        warn!(message_id = %message_id, "SQS message without receipt handle; skipping");
        return None;
    };

    Some(QueueMessage {
        message_id,
        receipt_handle,
        body: message.body.unwrap_or_default(),
    })
}
