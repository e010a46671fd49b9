use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SERVICE_NAME: &str = "agro-analysis-worker";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    /// Always `healthy` while the process is serving HTTP.
    pub status: String,
    pub service: String,
}

impl HealthDto {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_owned(),
            service: SERVICE_NAME.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDto {
    pub error: String,
}
