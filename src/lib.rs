pub mod analysis;
pub mod api;
pub mod config;
pub mod consumer;
pub mod db;
pub mod memory_store;
pub mod metrics;
pub mod payload;
pub mod sqs;

#[cfg(test)]
pub(crate) mod test_logs;
