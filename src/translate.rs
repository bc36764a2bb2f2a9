//! Projection of native records into SensorThings entities.
//!
//! Every projection copies what it needs from the native record, adds the
//! `@iot.id`/`@iot.selflink` pair and one navigation link per related entity
//! set. Links are built from the configured service root and the entity's own
//! id. Only Datastream ids are persisted (see [`crate::identity`]); Location,
//! HistoricalLocation, Observation, ObservedProperty and FeatureOfInterest ids
//! are synthesized per request and therefore differ between requests.

use std::collections::HashSet;
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use seahash::SeaHasher;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identity::IdentityStore;
use crate::native::{CurrentLocation, Measurement, NativeRecord, NativeSensor, Point, SenseBox};
use crate::persist::DatastreamId;
use crate::units::{self, UnitOfMeasurement, NO_METADATA};

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub const OM_MEASUREMENT: &str = "OM_Measurement";
pub const OM_OBSERVATION: &str = "OM_Observation";
pub const GEO_JSON: &str = "application/vnd.geo+json";

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Time based id for entities that have no stable identity upstream.
/// Ids are strictly increasing within the process, also when more than a
/// thousand are handed out in the same millisecond.
pub fn synthetic_id() -> u64 {
    let now = (Utc::now().timestamp_millis().max(0) as u64) * 1000;
    let (Ok(last) | Err(last)) =
        LAST_ID.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| Some(now.max(last + 1)));
    now.max(last + 1)
}

// ------------- Entities -------------
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingProperties {
    pub last_measurement_at: Option<String>,
    pub exposure: Option<String>,
    pub created_at: Option<String>,
    pub model: Option<String>,
    pub updated_at: Option<String>,
    pub grouptag: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Thing {
    #[serde(rename = "@iot.id")]
    pub id: String,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub name: String,
    pub description: String,
    pub properties: ThingProperties,
    #[serde(rename = "Locations@iot.navigationLink")]
    pub locations_link: String,
    #[serde(rename = "HistoricalLocations@iot.navigationLink")]
    pub historical_locations_link: String,
    #[serde(rename = "Datastreams@iot.navigationLink")]
    pub datastreams_link: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "@iot.id")]
    pub id: u64,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub name: String,
    pub description: String,
    pub encoding_type: String,
    pub location: Point,
    #[serde(rename = "Things@iot.navigationLink")]
    pub things_link: String,
    #[serde(rename = "HistoricalLocations@iot.navigationLink")]
    pub historical_locations_link: String,
}

/// Collection envelope used where a related set is embedded.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalLocation {
    #[serde(rename = "@iot.id")]
    pub id: u64,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub time: Option<String>,
    #[serde(rename = "Locations")]
    pub locations: Envelope<Location>,
    #[serde(rename = "Thing@iot.navigationLink")]
    pub thing_link: String,
    #[serde(rename = "Locations@iot.navigationLink")]
    pub locations_link: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    #[serde(rename = "@iot.id")]
    pub id: String,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub name: String,
    pub description: String,
    pub encoding_type: String,
    pub metadata: String,
    #[serde(rename = "Datastreams@iot.navigationLink")]
    pub datastreams_link: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datastream {
    #[serde(rename = "@iot.id")]
    pub id: DatastreamId,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub name: String,
    pub description: String,
    pub unit_of_measurement: UnitOfMeasurement,
    pub observation_type: String,
    #[serde(rename = "Thing@iot.navigationLink")]
    pub thing_link: String,
    #[serde(rename = "Sensor@iot.navigationLink")]
    pub sensor_link: String,
    #[serde(rename = "ObservedProperty@iot.navigationLink")]
    pub observed_property_link: String,
    #[serde(rename = "Observations@iot.navigationLink")]
    pub observations_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObservedProperty {
    #[serde(rename = "@iot.id")]
    pub id: u64,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub name: String,
    pub definition: String,
    pub description: String,
    #[serde(rename = "Datastreams@iot.navigationLink")]
    pub datastreams_link: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(rename = "@iot.id")]
    pub id: u64,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub phenomenon_time: String,
    pub result_time: String,
    pub result: Value,
    #[serde(rename = "Datastream@iot.navigationLink")]
    pub datastream_link: String,
    #[serde(rename = "FeatureOfInterest@iot.navigationLink")]
    pub feature_of_interest_link: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureOfInterest {
    #[serde(rename = "@iot.id")]
    pub id: u64,
    #[serde(rename = "@iot.selflink")]
    pub selflink: String,
    pub name: String,
    pub description: String,
    pub encoding_type: String,
    pub feature: Option<Point>,
    #[serde(rename = "Observations@iot.navigationLink")]
    pub observations_link: String,
}

// ------------- Translator -------------
pub struct Translator {
    root: String,
    store: Arc<IdentityStore>,
}

impl Translator {
    pub fn new(service_root: impl Into<String>, store: Arc<IdentityStore>) -> Self {
        let root = service_root.into().trim_end_matches('/').to_string();
        Self { root, store }
    }

    pub fn service_root(&self) -> &str {
        &self.root
    }

    pub fn store(&self) -> &Arc<IdentityStore> {
        &self.store
    }

    fn link(&self, set: &str, id: impl std::fmt::Display) -> String {
        format!("{}/{}({})", self.root, set, id)
    }

    fn nested(&self, set: &str, id: impl std::fmt::Display, nested: &str) -> String {
        format!("{}/{}", self.link(set, id), nested)
    }

    /// Tag dispatch over what was fetched: boxes become Things, measurements Observations.
    pub fn project(&self, record: &NativeRecord) -> Result<Value> {
        Ok(match record {
            NativeRecord::Box(b) => serde_json::to_value(self.thing(b))?,
            NativeRecord::Measurement(m) => serde_json::to_value(self.observation(m))?,
        })
    }

    pub fn thing(&self, sense_box: &SenseBox) -> Thing {
        let id = &sense_box.id;
        Thing {
            id: id.clone(),
            selflink: self.link("Things", id),
            name: sense_box.name.clone(),
            description: sense_box.description.clone().unwrap_or_default(),
            properties: ThingProperties {
                last_measurement_at: sense_box.last_measurement_at.clone(),
                exposure: sense_box.exposure.clone(),
                created_at: sense_box.created_at.clone(),
                model: sense_box.model.clone(),
                updated_at: sense_box.updated_at.clone(),
                grouptag: sense_box.grouptag.clone(),
            },
            locations_link: self.nested("Things", id, "Locations"),
            historical_locations_link: self.nested("Things", id, "HistoricalLocations"),
            datastreams_link: self.nested("Things", id, "Datastreams"),
        }
    }

    pub fn location(&self, current: &CurrentLocation) -> Location {
        let id = synthetic_id();
        Location {
            id,
            selflink: self.link("Locations", id),
            name: "Current location".to_string(),
            description: "Location the sensor box last reported".to_string(),
            encoding_type: GEO_JSON.to_string(),
            location: current.point.clone(),
            things_link: self.nested("Locations", id, "Things"),
            historical_locations_link: self.nested("Locations", id, "HistoricalLocations"),
        }
    }

    /// `None` when the box never reported a location.
    pub fn historical_location(&self, sense_box: &SenseBox) -> Option<HistoricalLocation> {
        let current = sense_box.current_location.as_ref()?;
        let id = synthetic_id();
        Some(HistoricalLocation {
            id,
            selflink: self.link("HistoricalLocations", id),
            time: current.timestamp.clone(),
            locations: Envelope { value: vec![self.location(current)] },
            thing_link: self.link("Things", &sense_box.id),
            locations_link: self.nested("HistoricalLocations", id, "Locations"),
        })
    }

    pub fn sensor(&self, sensor: &NativeSensor) -> Sensor {
        let metadata = units::metadata_for(&sensor.sensor_type);
        let encoding_type = if metadata == NO_METADATA { "text/plain" } else { "text/html" };
        let name = if sensor.sensor_type.is_empty() { &sensor.title } else { &sensor.sensor_type };
        Sensor {
            id: sensor.id.clone(),
            selflink: self.link("Sensors", &sensor.id),
            name: name.clone(),
            description: format!("{} sensor measuring {}", name, sensor.title),
            encoding_type: encoding_type.to_string(),
            metadata,
            datastreams_link: self.nested("Sensors", &sensor.id, "Datastreams"),
        }
    }

    /// Resolves the sensor's Datastream id and projects it. This touches the
    /// identity store; async callers resolve ids in bulk and use [`Self::datastream_with_id`].
    pub fn datastream(&self, sensor: &NativeSensor, box_id: &str) -> Result<Datastream> {
        let id = self.store.resolve(box_id, &sensor.id)?;
        Ok(self.datastream_with_id(sensor, id))
    }

    pub fn datastream_with_id(&self, sensor: &NativeSensor, id: DatastreamId) -> Datastream {
        let unit = units::lookup(&sensor.unit);
        let observation_type = if unit.is_specified() { OM_MEASUREMENT } else { OM_OBSERVATION };
        Datastream {
            id,
            selflink: self.link("Datastreams", id),
            name: sensor.title.clone(),
            description: format!("{} measured by {}", sensor.title, sensor.sensor_type),
            unit_of_measurement: unit,
            observation_type: observation_type.to_string(),
            thing_link: self.nested("Datastreams", id, "Thing"),
            sensor_link: self.nested("Datastreams", id, "Sensor"),
            observed_property_link: self.nested("Datastreams", id, "ObservedProperty"),
            observations_link: self.nested("Datastreams", id, "Observations"),
        }
    }

    pub fn observed_property(&self, sensor: &NativeSensor) -> ObservedProperty {
        let id = synthetic_id();
        let unit = units::lookup(&sensor.unit);
        ObservedProperty {
            id,
            selflink: self.link("ObservedProperties", id),
            name: sensor.title.clone(),
            description: format!("{} in {}", sensor.title, unit.name),
            definition: unit.definition,
            datastreams_link: self.nested("ObservedProperties", id, "Datastreams"),
        }
    }

    pub fn observation(&self, measurement: &Measurement) -> Observation {
        let id = synthetic_id();
        let result = measurement
            .value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(measurement.value.clone()));
        Observation {
            id,
            selflink: self.link("Observations", id),
            phenomenon_time: measurement.created_at.clone(),
            result_time: measurement.created_at.clone(),
            result,
            datastream_link: self.nested("Observations", id, "Datastream"),
            feature_of_interest_link: self.nested("Observations", id, "FeatureOfInterest"),
        }
    }

    pub fn feature_of_interest(&self, measurement: &Measurement) -> FeatureOfInterest {
        let id = synthetic_id();
        FeatureOfInterest {
            id,
            selflink: self.link("FeaturesOfInterest", id),
            name: "Measurement location".to_string(),
            description: "Where the measurement was taken".to_string(),
            encoding_type: GEO_JSON.to_string(),
            feature: measurement.location.clone(),
            observations_link: self.nested("FeaturesOfInterest", id, "Observations"),
        }
    }
}

/// Sensors across all boxes, one per (sensorType, unit); first occurrence wins.
pub fn distinct_sensors(boxes: &[SenseBox]) -> Vec<&NativeSensor> {
    let mut seen = HashSet::<(&str, &str), OtherHasher>::default();
    boxes
        .iter()
        .flat_map(|b| b.sensors.iter())
        .filter(|s| seen.insert((s.sensor_type.as_str(), s.unit.as_str())))
        .collect()
}
