use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of measurement carried by a [`Reading`].
///
/// Parsed once at the boundary, case-insensitively. Values the worker has no
/// rules for are kept verbatim in `Other` and archived without evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SensorType {
    /// Soil humidity, percent.
    Humidity,
    /// Ambient temperature, degrees Celsius.
    Temperature,
    /// Atmospheric pressure, hPa.
    Pressure,
    Other(String),
}

impl SensorType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "humidity" | "umidade" => Self::Humidity,
            "temperature" | "temperatura" => Self::Temperature,
            "pressure" | "pressao" | "pressão" => Self::Pressure,
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SensorType::Humidity => "Humidity",
            SensorType::Temperature => "Temperature",
            SensorType::Pressure => "Pressure",
            SensorType::Other(raw) => raw,
        }
    }
}

impl From<String> for SensorType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<SensorType> for String {
    fn from(t: SensorType) -> Self {
        t.as_str().to_owned()
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sensor sample as produced upstream. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Producer-assigned sample id. Not a dedup key.
    pub id: Uuid,
    pub field_id: Uuid,
    pub sensor_type: SensorType,
    /// Unit implied by `sensor_type`.
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub sensor_device_id: Uuid,
    pub farmer_name: String,
    pub property_name: String,
    pub field_name: String,
}
