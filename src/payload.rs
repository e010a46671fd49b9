//! Decoding of queue message bodies into [`Reading`]s.
//!
//! Producers are not consistent about key casing (`fieldId`, `FieldId`,
//! `FIELDID`), so top-level keys are folded to lowercase before the typed
//! decode. Extra keys are ignored.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{Reading, SensorType};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed reading payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reading payload is not a JSON object")]
    NotAnObject,
}

#[derive(Debug, Deserialize)]
struct WireReading {
    id: Uuid,
    #[serde(rename = "fieldid")]
    field_id: Uuid,
    #[serde(rename = "sensortype")]
    sensor_type: SensorType,
    value: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "sensordeviceid")]
    sensor_device_id: Uuid,
    #[serde(rename = "farmername", default)]
    farmer_name: Option<String>,
    #[serde(rename = "propertyname", default)]
    property_name: Option<String>,
    #[serde(rename = "fieldname", default)]
    field_name: Option<String>,
}

impl From<WireReading> for Reading {
    fn from(w: WireReading) -> Self {
        Self {
            id: w.id,
            field_id: w.field_id,
            sensor_type: w.sensor_type,
            value: w.value,
            timestamp: w.timestamp,
            sensor_device_id: w.sensor_device_id,
            farmer_name: w.farmer_name.unwrap_or_default(),
            property_name: w.property_name.unwrap_or_default(),
            field_name: w.field_name.unwrap_or_default(),
        }
    }
}

/// Decode a queue message body into a [`Reading`].
pub fn decode_reading(body: &str) -> Result<Reading, PayloadError> {
    let Value::Object(fields) = serde_json::from_str::<Value>(body)? else {
        return Err(PayloadError::NotAnObject);
    };

    // Keys that collide once folded: the original key sorting last in byte
    // order wins, whatever order the map iterates in.
    let mut entries: Vec<(String, Value)> = fields.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    let folded: Map<String, Value> = entries
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();

    let wire: WireReading = serde_json::from_value(Value::Object(folded))?;
    Ok(wire.into())
}

/// RFC 3339 first; an offset-less ISO-8601 date-time is taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    const ID: &str = "6f1c1f9e-3f0a-4c55-9b7e-2d7f1f3b9a10";
    const FIELD_ID: &str = "0b6f2a4e-8d2c-4c1e-a0b4-5c3f7e9d1a22";
    const DEVICE_ID: &str = "9a3e5c7b-1d2f-4e6a-8b0c-3d5f7a9c1e33";

    fn body(sensor_type: &str, value: &str) -> String {
        format!(
            r#"{{"id":"{ID}","fieldId":"{FIELD_ID}","sensorType":"{sensor_type}","value":{value},
               "timestamp":"2025-03-14T09:26:53Z","sensorDeviceId":"{DEVICE_ID}",
               "farmerName":"Ana","propertyName":"Fazenda Boa Vista","fieldName":"Talhao 3"}}"#
        )
    }

    #[test]
    fn decodes_camel_case_payload() {
        let r = decode_reading(&body("Temperature", "21.5")).unwrap();
        assert_eq!(r.id.to_string(), ID);
        assert_eq!(r.field_id.to_string(), FIELD_ID);
        assert_eq!(r.sensor_device_id.to_string(), DEVICE_ID);
        assert_eq!(r.sensor_type, SensorType::Temperature);
        assert_eq!(r.value, 21.5);
        assert_eq!(r.farmer_name, "Ana");
        assert_eq!(r.property_name, "Fazenda Boa Vista");
        assert_eq!(r.field_name, "Talhao 3");
        assert_eq!(r.timestamp.year(), 2025);
        assert_eq!(r.timestamp.hour(), 9);
    }

    #[test]
    fn field_names_are_case_insensitive() {
        let json = format!(
            r#"{{"ID":"{ID}","FieldId":"{FIELD_ID}","SENSORTYPE":"humidity","Value":40,
               "TimeStamp":"2025-03-14T09:26:53+00:00","SensorDeviceID":"{DEVICE_ID}",
               "FarmerName":"Ana","PROPERTYNAME":"Boa Vista","fieldname":"North"}}"#
        );
        let r = decode_reading(&json).unwrap();
        assert_eq!(r.sensor_type, SensorType::Humidity);
        assert_eq!(r.value, 40.0);
        assert_eq!(r.property_name, "Boa Vista");
        assert_eq!(r.field_name, "North");
    }

    #[test]
    fn colliding_keys_resolve_to_the_last_in_byte_order() {
        let winner = "11111111-1111-1111-1111-111111111111";
        let loser = "22222222-2222-2222-2222-222222222222";
        for json in [
            format!(
                r#"{{"id":"{ID}","fieldId":"{winner}","FIELDID":"{loser}","sensorType":"Humidity",
                   "value":40,"timestamp":"2025-03-14T09:26:53Z","sensorDeviceId":"{DEVICE_ID}"}}"#
            ),
            format!(
                r#"{{"id":"{ID}","FIELDID":"{loser}","fieldId":"{winner}","sensorType":"Humidity",
                   "value":40,"timestamp":"2025-03-14T09:26:53Z","sensorDeviceId":"{DEVICE_ID}"}}"#
            ),
        ] {
            let r = decode_reading(&json).unwrap();
            assert_eq!(r.field_id.to_string(), winner);
        }
    }

    #[test]
    fn integer_value_is_accepted() {
        let r = decode_reading(&body("Pressure", "1013")).unwrap();
        assert_eq!(r.value, 1013.0);
    }

    #[test]
    fn unknown_sensor_type_is_not_an_error() {
        let r = decode_reading(&body("Luminosity", "300")).unwrap();
        assert_eq!(r.sensor_type, SensorType::Other("Luminosity".to_owned()));
    }

    #[test]
    fn negative_humidity_is_legal_input() {
        let r = decode_reading(&body("Humidity", "-4.0")).unwrap();
        assert_eq!(r.value, -4.0);
    }

    #[test]
    fn missing_labels_default_to_empty() {
        let json = format!(
            r#"{{"id":"{ID}","fieldId":"{FIELD_ID}","sensorType":"Humidity","value":12.0,
               "timestamp":"2025-03-14T09:26:53Z","sensorDeviceId":"{DEVICE_ID}","farmerName":null}}"#
        );
        let r = decode_reading(&json).unwrap();
        assert!(r.farmer_name.is_empty());
        assert!(r.property_name.is_empty());
        assert!(r.field_name.is_empty());
    }

    #[test]
    fn extra_keys_are_ignored() {
        let json = body("Humidity", "50").replacen('{', r#"{"schemaVersion":3,"#, 1);
        assert!(decode_reading(&json).is_ok());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = decode_reading("invalid-json").unwrap_err();
        assert!(matches!(err, PayloadError::Json(_)));
    }

    #[test]
    fn non_object_is_rejected() {
        let err = decode_reading("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, PayloadError::NotAnObject));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let json = format!(r#"{{"id":"{ID}","sensorType":"Humidity","value":1.0}}"#);
        let err = decode_reading(&json).unwrap_err();
        assert!(err.to_string().contains("malformed reading payload"));
    }

    #[test]
    fn malformed_uuid_is_rejected() {
        let json = body("Humidity", "10").replace(FIELD_ID, "not-a-uuid");
        assert!(matches!(decode_reading(&json), Err(PayloadError::Json(_))));
    }

    #[test]
    fn timestamp_without_offset_is_utc() {
        let ts = parse_timestamp("2025-01-10T12:30:00.1234567").unwrap();
        assert_eq!(ts.hour(), 12);
        assert_eq!(ts.minute(), 30);
        assert_eq!(ts.nanosecond(), 123_456_700);

        let whole = parse_timestamp("2025-01-10T12:30:00").unwrap();
        assert_eq!(whole.second(), 0);
    }

    #[test]
    fn timestamp_with_offset_is_normalised_to_utc() {
        let ts = parse_timestamp("2025-01-10T09:30:00-03:00").unwrap();
        assert_eq!(ts.hour(), 12);
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp("yesterday").is_err());
        let json = body("Humidity", "10").replace("2025-03-14T09:26:53Z", "soon");
        assert!(decode_reading(&json).is_err());
    }
}
