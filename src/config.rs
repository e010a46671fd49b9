use std::{str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

use crate::consumer::ConsumerSettings;

// ---------------------------------------------------------------------------
// HistoryBackend
// ---------------------------------------------------------------------------

/// Where archived readings go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackend {
    Postgres,
    /// Process-local store, lost on restart. Useful for local runs without a database.
    Memory,
}

impl FromStr for HistoryBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("unknown history backend: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Where to consume from. Credentials are not configured here; the AWS
/// default provider chain resolves them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqsConfig {
    pub queue_url: String,
    /// Falls back to the provider chain, then `us-east-1`.
    pub region: Option<String>,
    /// Overrides the SDK endpoint (LocalStack, ElasticMQ).
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sqs: SqsConfig,
    /// Max messages per poll, 1..=10.
    pub batch_size: usize,
    /// Long-poll wait in seconds, 0..=20.
    pub wait_time_secs: u64,
    pub poll_backoff_ms: u64,
    pub history_backend: HistoryBackend,
    /// Only required for the postgres backend.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let history_backend: HistoryBackend = optional(&lookup, "HISTORY_BACKEND", "postgres")
            .parse()
            .context("HISTORY_BACKEND must be 'postgres' or 'memory'")?;

        let database_url = present(&lookup, "DATABASE_URL");
        if history_backend == HistoryBackend::Postgres && database_url.is_none() {
            bail!("missing required env var: DATABASE_URL (HISTORY_BACKEND=postgres)");
        }

        let batch_size: usize = optional(&lookup, "SQS_BATCH_SIZE", "10")
            .parse()
            .context("SQS_BATCH_SIZE must be a positive integer")?;
        if !(1..=10).contains(&batch_size) {
            bail!("SQS_BATCH_SIZE must be between 1 and 10, got {batch_size}");
        }

        let wait_time_secs: u64 = optional(&lookup, "SQS_WAIT_TIME_SECS", "20")
            .parse()
            .context("SQS_WAIT_TIME_SECS must be a non-negative integer")?;
        if wait_time_secs > 20 {
            bail!("SQS_WAIT_TIME_SECS must be between 0 and 20, got {wait_time_secs}");
        }

        Ok(Self {
            sqs: SqsConfig {
                queue_url: required(&lookup, "SQS_QUEUE_URL")?,
                region: present(&lookup, "AWS_REGION"),
                endpoint_url: present(&lookup, "SQS_ENDPOINT_URL"),
            },
            batch_size,
            wait_time_secs,
            poll_backoff_ms: optional(&lookup, "POLL_BACKOFF_MS", "1000")
                .parse()
                .context("POLL_BACKOFF_MS must be a non-negative integer")?,
            history_backend,
            database_url,
            database_max_connections: optional(&lookup, "DATABASE_MAX_CONNECTIONS", "10")
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            server_host: optional(&lookup, "SERVER_HOST", "0.0.0.0"),
            server_port: optional(&lookup, "SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
        })
    }

    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            batch_size: self.batch_size,
            wait_time: Duration::from_secs(self.wait_time_secs),
            poll_backoff: Duration::from_millis(self.poll_backoff_ms),
        }
    }
}

fn required<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Result<String> {
    present(lookup, key).with_context(|| format!("missing required env var: {key}"))
}

fn optional<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    present(lookup, key).unwrap_or_else(|| default.to_owned())
}

/// Set and non-blank.
fn present<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}
