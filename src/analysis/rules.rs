use std::fmt;

use crate::db::models::SensorType;

/// Soil humidity below this (percent) is a drought.
pub const DROUGHT_BELOW_PERCENT: f64 = 30.0;
/// Temperature below this (°C) risks frost.
pub const FROST_BELOW_CELSIUS: f64 = 5.0;
/// Temperature above this (°C) is thermal stress.
pub const HEAT_ABOVE_CELSIUS: f64 = 35.0;
/// Pressure below this (hPa) signals an incoming storm. Sea level is ~1013 hPa.
pub const STORM_BELOW_HPA: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Drought,
    Frost,
    ExcessiveHeat,
    Storm,
}

impl AlertKind {
    /// Tag used in alert log lines.
    pub fn tag(self) -> &'static str {
        match self {
            AlertKind::Drought => "DROUGHT",
            AlertKind::Frost => "FROST",
            AlertKind::ExcessiveHeat => "EXCESSIVE HEAT",
            AlertKind::Storm => "STORM / LOW PRESSURE",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            AlertKind::Drought => "%",
            AlertKind::Frost | AlertKind::ExcessiveHeat => "°C",
            AlertKind::Storm => "hPa",
        }
    }

    /// `value` with its unit, as printed in alert lines: `25%`, `36°C`, `990 hPa`.
    pub fn format_value(self, value: f64) -> String {
        match self {
            AlertKind::Storm => format!("{value} {}", self.unit()),
            _ => format!("{value}{}", self.unit()),
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Classify one value. All comparisons are strict; a value on a threshold
/// never alerts. Temperature checks frost before heat and at most one fires.
/// `Other` sensor types are never classified.
pub fn evaluate(sensor_type: &SensorType, value: f64) -> Option<AlertKind> {
    match sensor_type {
        SensorType::Humidity if value < DROUGHT_BELOW_PERCENT => Some(AlertKind::Drought),
        SensorType::Temperature if value < FROST_BELOW_CELSIUS => Some(AlertKind::Frost),
        SensorType::Temperature if value > HEAT_ABOVE_CELSIUS => Some(AlertKind::ExcessiveHeat),
        SensorType::Pressure if value < STORM_BELOW_HPA => Some(AlertKind::Storm),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humidity_thresholds() {
        assert_eq!(evaluate(&SensorType::Humidity, 25.0), Some(AlertKind::Drought));
        assert_eq!(evaluate(&SensorType::Humidity, 30.0), None);
        assert_eq!(evaluate(&SensorType::Humidity, 40.0), None);
        assert_eq!(evaluate(&SensorType::Humidity, -1.0), Some(AlertKind::Drought));
    }

    #[test]
    fn temperature_thresholds() {
        assert_eq!(evaluate(&SensorType::Temperature, 4.0), Some(AlertKind::Frost));
        assert_eq!(evaluate(&SensorType::Temperature, 36.0), Some(AlertKind::ExcessiveHeat));
        assert_eq!(evaluate(&SensorType::Temperature, 25.0), None);
        assert_eq!(evaluate(&SensorType::Temperature, 5.0), None);
        assert_eq!(evaluate(&SensorType::Temperature, 35.0), None);
    }

    #[test]
    fn pressure_thresholds() {
        assert_eq!(evaluate(&SensorType::Pressure, 990.0), Some(AlertKind::Storm));
        assert_eq!(evaluate(&SensorType::Pressure, 1000.0), None);
        assert_eq!(evaluate(&SensorType::Pressure, 1013.0), None);
    }

    #[test]
    fn other_types_never_alert() {
        let wind = SensorType::Other("Wind".to_owned());
        assert_eq!(evaluate(&wind, -1000.0), None);
        assert_eq!(evaluate(&wind, 1e9), None);
    }

    #[test]
    fn nan_never_alerts() {
        assert_eq!(evaluate(&SensorType::Humidity, f64::NAN), None);
        assert_eq!(evaluate(&SensorType::Temperature, f64::NAN), None);
        assert_eq!(evaluate(&SensorType::Pressure, f64::NAN), None);
    }

    #[test]
    fn tags_and_units() {
        assert_eq!(AlertKind::Drought.to_string(), "DROUGHT");
        assert_eq!(AlertKind::Frost.tag(), "FROST");
        assert_eq!(AlertKind::ExcessiveHeat.tag(), "EXCESSIVE HEAT");
        assert_eq!(AlertKind::Storm.tag(), "STORM / LOW PRESSURE");
        assert_eq!(AlertKind::Frost.unit(), "°C");
        assert_eq!(AlertKind::Storm.unit(), "hPa");
    }

    #[test]
    fn values_format_with_units() {
        assert_eq!(AlertKind::Drought.format_value(25.0), "25%");
        assert_eq!(AlertKind::Frost.format_value(-2.5), "-2.5°C");
        assert_eq!(AlertKind::ExcessiveHeat.format_value(36.0), "36°C");
        assert_eq!(AlertKind::Storm.format_value(990.0), "990 hPa");
    }
}
