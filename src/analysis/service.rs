use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::rules::{self, AlertKind};
use crate::{
    db::{
        history::{HistoryStore, StoreError},
        models::{Reading, SensorType},
    },
    metrics::{FieldLabels, MetricsRegistry},
};

/// What the analyzer emitted for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Gauge updated, no threshold crossed.
    Nominal,
    /// Gauge updated and an alert counter incremented.
    Alert(AlertKind),
    /// Archived only; the sensor type has no rules.
    Unrouted,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to archive reading {reading_id}: {source}")]
    Archive {
        reading_id: Uuid,
        #[source]
        source: StoreError,
    },
}

/// Seam between the queue consumer and the analysis pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingAnalyzer: Send + Sync {
    async fn analyze_and_persist(&self, reading: &Reading) -> Result<Verdict, AnalysisError>;
}

pub struct TelemetryAnalyzer {
    store: Arc<dyn HistoryStore>,
    metrics: MetricsRegistry,
}

impl TelemetryAnalyzer {
    pub fn new(store: Arc<dyn HistoryStore>, metrics: MetricsRegistry) -> Self {
        Self { store, metrics }
    }

    fn raise(&self, kind: AlertKind, labels: &FieldLabels<'_>, reading: &Reading) {
        match kind {
            AlertKind::Drought => self.metrics.inc_drought_alerts(labels),
            AlertKind::Frost => self.metrics.inc_frost_alerts(labels),
            AlertKind::ExcessiveHeat => self.metrics.inc_heat_alerts(labels),
            AlertKind::Storm => self.metrics.inc_storm_alerts(labels),
        }

        warn!(
            alert = kind.tag(),
            field_id = %reading.field_id,
            field_name = %reading.field_name,
            farmer_name = %reading.farmer_name,
            property_name = %reading.property_name,
            value = reading.value,
            unit = kind.unit(),
            "[ALERT] {} detected in field {} | value: {}",
            kind.tag(),
            reading.field_id,
            kind.format_value(reading.value),
        );
    }
}

#[async_trait]
impl ReadingAnalyzer for TelemetryAnalyzer {
    /// Archives `reading`, then updates metrics and evaluates alert rules.
    ///
    /// Archiving is unconditional and comes first: if it fails nothing else
    /// runs, and the caller must leave the message for redelivery.
    #[instrument(skip_all, fields(reading_id = %reading.id, sensor_type = %reading.sensor_type))]
    async fn analyze_and_persist(&self, reading: &Reading) -> Result<Verdict, AnalysisError> {
        self.store
            .add(reading)
            .await
            .map_err(|source| AnalysisError::Archive {
                reading_id: reading.id,
                source,
            })?;

        self.metrics.inc_events_processed();

        let labels = FieldLabels::of(reading);
        match &reading.sensor_type {
            SensorType::Humidity => self.metrics.set_soil_humidity(&labels, reading.value),
            SensorType::Temperature => self.metrics.set_ambient_temperature(&labels, reading.value),
            SensorType::Pressure => self.metrics.set_atmospheric_pressure(&labels, reading.value),
            SensorType::Other(raw) => {
                warn!(
                    sensor_type = %raw,
                    reading_id = %reading.id,
                    "Unrecognized sensor type: {raw}; reading archived without evaluation"
                );
                return Ok(Verdict::Unrouted);
            }
        }

        match rules::evaluate(&reading.sensor_type, reading.value) {
            Some(kind) => {
                self.raise(kind, &labels, reading);
                Ok(Verdict::Alert(kind))
            }
            None => {
                debug!(value = reading.value, "Reading within thresholds");
                Ok(Verdict::Nominal)
            }
        }
    }
}
