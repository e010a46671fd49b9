//! Prometheus series emitted by the analyzer.
//!
//! The registry is owned by [`MetricsRegistry`] rather than the process-global
//! default one, so each instance (one per process, several in tests) starts
//! from zero. Cloning shares the underlying series.

use prometheus::{
    proto::MetricType, Encoder, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::db::models::Reading;

/// Label names shared by every per-field series.
pub const FIELD_LABEL_NAMES: [&str; 4] = ["farmer_name", "property_name", "field_name", "field_id"];

pub const EVENTS_PROCESSED: &str = "agro_events_processed_total";
pub const SOIL_HUMIDITY: &str = "agro_soil_humidity_percent";
pub const DROUGHT_ALERTS: &str = "agro_alert_drought_total";
pub const AMBIENT_TEMPERATURE: &str = "agro_temperature_celsius";
pub const FROST_ALERTS: &str = "agro_alert_frost_total";
pub const HEAT_ALERTS: &str = "agro_alert_heat_total";
pub const ATMOSPHERIC_PRESSURE: &str = "agro_pressure_hpa";
pub const STORM_ALERTS: &str = "agro_alert_storm_total";

/// Label tuple partitioning every per-field series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLabels<'a> {
    pub farmer_name: &'a str,
    pub property_name: &'a str,
    pub field_name: &'a str,
    pub field_id: String,
}

impl<'a> FieldLabels<'a> {
    pub fn of(reading: &'a Reading) -> Self {
        Self {
            farmer_name: &reading.farmer_name,
            property_name: &reading.property_name,
            field_name: &reading.field_name,
            field_id: reading.field_id.to_string(),
        }
    }

    fn values(&self) -> [&str; 4] {
        [
            self.farmer_name,
            self.property_name,
            self.field_name,
            &self.field_id,
        ]
    }
}

#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    events_processed: IntCounter,
    soil_humidity: GaugeVec,
    drought_alerts: IntCounterVec,
    ambient_temperature: GaugeVec,
    frost_alerts: IntCounterVec,
    heat_alerts: IntCounterVec,
    atmospheric_pressure: GaugeVec,
    storm_alerts: IntCounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_processed = IntCounter::new(
            EVENTS_PROCESSED,
            "Total sensor events processed",
        )?;
        let soil_humidity = GaugeVec::new(
            Opts::new(SOIL_HUMIDITY, "Current soil humidity (%)"),
            &FIELD_LABEL_NAMES,
        )?;
        let drought_alerts = IntCounterVec::new(
            Opts::new(DROUGHT_ALERTS, "Drought alerts raised (humidity < 30%)"),
            &FIELD_LABEL_NAMES,
        )?;
        let ambient_temperature = GaugeVec::new(
            Opts::new(AMBIENT_TEMPERATURE, "Current ambient temperature (°C)"),
            &FIELD_LABEL_NAMES,
        )?;
        let frost_alerts = IntCounterVec::new(
            Opts::new(FROST_ALERTS, "Frost alerts raised (temperature < 5°C)"),
            &FIELD_LABEL_NAMES,
        )?;
        let heat_alerts = IntCounterVec::new(
            Opts::new(HEAT_ALERTS, "Excessive heat alerts raised (temperature > 35°C)"),
            &FIELD_LABEL_NAMES,
        )?;
        let atmospheric_pressure = GaugeVec::new(
            Opts::new(ATMOSPHERIC_PRESSURE, "Current atmospheric pressure (hPa)"),
            &FIELD_LABEL_NAMES,
        )?;
        let storm_alerts = IntCounterVec::new(
            Opts::new(STORM_ALERTS, "Storm alerts raised (pressure < 1000 hPa)"),
            &FIELD_LABEL_NAMES,
        )?;

        registry.register(Box::new(events_processed.clone()))?;
        registry.register(Box::new(soil_humidity.clone()))?;
        registry.register(Box::new(drought_alerts.clone()))?;
        registry.register(Box::new(ambient_temperature.clone()))?;
        registry.register(Box::new(frost_alerts.clone()))?;
        registry.register(Box::new(heat_alerts.clone()))?;
        registry.register(Box::new(atmospheric_pressure.clone()))?;
        registry.register(Box::new(storm_alerts.clone()))?;

        Ok(Self {
            registry,
            events_processed,
            soil_humidity,
            drought_alerts,
            ambient_temperature,
            frost_alerts,
            heat_alerts,
            atmospheric_pressure,
            storm_alerts,
        })
    }

    pub fn inc_events_processed(&self) {
        self.events_processed.inc();
    }

    pub fn set_soil_humidity(&self, labels: &FieldLabels<'_>, percent: f64) {
        self.soil_humidity.with_label_values(&labels.values()).set(percent);
    }

    pub fn inc_drought_alerts(&self, labels: &FieldLabels<'_>) {
        self.drought_alerts.with_label_values(&labels.values()).inc();
    }

    pub fn set_ambient_temperature(&self, labels: &FieldLabels<'_>, celsius: f64) {
        self.ambient_temperature
            .with_label_values(&labels.values())
            .set(celsius);
    }

    pub fn inc_frost_alerts(&self, labels: &FieldLabels<'_>) {
        self.frost_alerts.with_label_values(&labels.values()).inc();
    }

    pub fn inc_heat_alerts(&self, labels: &FieldLabels<'_>) {
        self.heat_alerts.with_label_values(&labels.values()).inc();
    }

    pub fn set_atmospheric_pressure(&self, labels: &FieldLabels<'_>, hpa: f64) {
        self.atmospheric_pressure
            .with_label_values(&labels.values())
            .set(hpa);
    }

    pub fn inc_storm_alerts(&self, labels: &FieldLabels<'_>) {
        self.storm_alerts.with_label_values(&labels.values()).inc();
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.get()
    }

    /// Current value of the series `name` for `labels`, if it has ever been
    /// written. Reading does not create the series.
    pub fn sample(&self, name: &str, labels: &FieldLabels<'_>) -> Option<f64> {
        let wanted = labels.values();
        self.registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)
            .and_then(|family| {
                let kind = family.get_field_type();
                family
                    .get_metric()
                    .iter()
                    .find(|metric| {
                        FIELD_LABEL_NAMES.iter().zip(wanted.iter()).all(|(key, value)| {
                            metric
                                .get_label()
                                .iter()
                                .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                        })
                    })
                    .map(|metric| match kind {
                        MetricType::GAUGE => metric.get_gauge().get_value(),
                        _ => metric.get_counter().get_value(),
                    })
            })
    }

    /// Number of label sets written so far for the series `name`.
    pub fn series_count(&self, name: &str) -> usize {
        self.registry
            .gather()
            .iter()
            .find(|family| family.get_name() == name)
            .map_or(0, |family| family.get_metric().len())
    }

    /// Prometheus text exposition of every series in this registry.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
