//! Records as they are delivered by the upstream sensor platform.
//!
//! These are read-only here; they only exist long enough to be projected into
//! SensorThings entities by the [`crate::translate`] module.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A GeoJSON point, `[longitude, latitude]` optionally followed by height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

fn point_type() -> String {
    "Point".to_string()
}

impl Point {
    pub fn new(coordinates: Vec<f64>) -> Self {
        Self { kind: point_type(), coordinates }
    }
}

/// The current location of a box: a point plus when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLocation {
    #[serde(flatten)]
    pub point: Point,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMeasurement {
    #[serde(deserialize_with = "text_or_number")]
    pub value: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSensor {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub sensor_type: String,
    #[serde(default, deserialize_with = "reading_or_reference")]
    pub last_measurement: Option<LastMeasurement>,
}

// Depending on the endpoint the platform sends either the embedded reading or
// only its id; the latter carries nothing we can project.
fn reading_or_reference<'de, D>(deserializer: D) -> std::result::Result<Option<LastMeasurement>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::String(_)) => None,
        Some(v) => match serde_json::from_value(v) {
            Ok(reading) => Some(reading),
            Err(e) => {
                debug!(error = %e, "lastMeasurement dropped");
                None
            }
        },
    })
}

// Readings are strings on the wire, but some firmwares report bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("reading is neither text nor number: {other}"))),
    }
}

/// A sensor box, the platform's unit of deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenseBox {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub exposure: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub grouptag: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_measurement_at: Option<String>,
    #[serde(default)]
    pub current_location: Option<CurrentLocation>,
    #[serde(default)]
    pub sensors: Vec<NativeSensor>,
}

impl SenseBox {
    pub fn sensor(&self, sensor_id: &str) -> Option<&NativeSensor> {
        self.sensors.iter().find(|s| s.id == sensor_id)
    }

    /// Lifts the last reading of one of this box's sensors into a full measurement.
    pub fn last_measurement_of(&self, sensor: &NativeSensor) -> Option<Measurement> {
        sensor.last_measurement.as_ref().map(|last| Measurement {
            id: format!("{}-{}", sensor.id, last.created_at),
            value: last.value.clone(),
            location: self.current_location.as_ref().map(|l| l.point.clone()),
            created_at: last.created_at.clone(),
            sensor_id: sensor.id.clone(),
            box_id: self.id.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    #[serde(rename = "_id")]
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub location: Option<Point>,
    pub created_at: String,
    pub sensor_id: String,
    pub box_id: String,
}

impl Measurement {
    /// The upstream has no single-observation fetch, so observation paths are
    /// answered from this fixed stand-in.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            value: "0".to_string(),
            location: Some(Point::new(vec![0.0, 0.0])),
            created_at: "1970-01-01T00:00:00.000Z".to_string(),
            sensor_id: String::new(),
            box_id: String::new(),
        }
    }
}

/// Native records tagged at the point they are fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeRecord {
    Box(SenseBox),
    Measurement(Measurement),
}

impl From<SenseBox> for NativeRecord {
    fn from(b: SenseBox) -> Self { NativeRecord::Box(b) }
}
impl From<Measurement> for NativeRecord {
    fn from(m: Measurement) -> Self { NativeRecord::Measurement(m) }
}
