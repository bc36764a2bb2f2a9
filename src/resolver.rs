//! Resolution of SensorThings resource paths against the upstream platform.
//!
//! A request is parsed by [`crate::path::parse`], answered with at most one
//! upstream fetch, projected by the [`Translator`] and shaped into a [`Reply`].
//! Paths that parse but cannot be served (unknown sets, unsupported shapes,
//! missing attributes) are answered with an explanatory [`Reply::Message`];
//! only upstream and storage failures surface as errors.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{FacadeError, Result};
use crate::native::{Measurement, NativeRecord, NativeSensor, SenseBox};
use crate::path::{self, EntitySet, Nested, PathRejection, Qualifier, ResourcePath};
use crate::persist::DatastreamId;
use crate::translate::{self, Translator};
use crate::upstream::Upstream;

pub const NOT_EXIST: &str = "Unknown resource. Please check the resource path and try again.";
pub const NOT_IMPLEMENTED: &str =
    "Due to the internal structure of the sensor platform, this API function is not supported yet!";
pub const NESTED_ID: &str = "Nested requests only support bare entity sets, e.g. /Things(id)/Datastreams. \
    Request the related entity through its own entity set instead, e.g. /Datastreams(id).";
pub const INVALID_ID: &str = "Please submit a valid ID.";
pub const NO_ATTRIBUTE: &str = "Attribute does not exist.";
pub const REF_UNSUPPORTED: &str = "$ref is not supported yet.";

pub fn wrong_param(token: &str) -> String {
    format!("Wrong parameter: {token}")
}

/// What goes back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing matched.
    Empty,
    /// Exactly one entity, sent unwrapped.
    Entity(Value),
    /// More than one entity.
    Collection(Vec<Value>),
    /// A raw attribute value (`$value`).
    Raw(String),
    /// An explanatory message for a request that cannot be served.
    Message(String),
}

impl Reply {
    /// Zero results give the empty marker, one the bare entity, more a counted collection.
    pub fn from_entities(mut entities: Vec<Value>) -> Self {
        match entities.len() {
            0 => Reply::Empty,
            1 => Reply::Entity(entities.remove(0)),
            _ => Reply::Collection(entities),
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Reply::Message(text.into())
    }

    /// JSON body for the structured replies, `None` for the textual ones.
    pub fn body(&self) -> Option<Value> {
        match self {
            Reply::Empty => Some(json!({ "@iot.count": 0, "value": [] })),
            Reply::Entity(v) => Some(v.clone()),
            Reply::Collection(entities) => Some(json!({ "@iot.count": entities.len(), "value": entities })),
            Reply::Raw(_) | Reply::Message(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Raw(t) | Reply::Message(t) => Some(t),
            _ => None,
        }
    }
}

fn values<T: Serialize>(entities: impl IntoIterator<Item = T>) -> Result<Vec<Value>> {
    entities
        .into_iter()
        .map(|e| serde_json::to_value(e).map_err(FacadeError::from))
        .collect()
}

/// Reads a top-level attribute off a projected entity.
fn select(entity: &Value, attribute: &str, qualifier: Qualifier) -> Reply {
    match entity.get(attribute) {
        None => Reply::message(NO_ATTRIBUTE),
        Some(value) if qualifier == Qualifier::Value => Reply::Raw(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        Some(value) => {
            let mut selected = serde_json::Map::new();
            selected.insert(attribute.to_string(), value.clone());
            Reply::Entity(Value::Object(selected))
        }
    }
}

/// Nested sets each entity set can be navigated to.
fn allowed(set: EntitySet, nested: Nested) -> bool {
    matches!(
        (set, nested),
        (EntitySet::Things, Nested::Locations | Nested::HistoricalLocations | Nested::Datastreams)
            | (EntitySet::Sensors, Nested::Datastreams)
            | (EntitySet::Observations, Nested::FeatureOfInterest | Nested::Datastream)
            | (EntitySet::Datastreams, Nested::Thing | Nested::Sensor | Nested::ObservedProperty | Nested::Observations)
    )
}

pub struct Resolver {
    upstream: Arc<dyn Upstream>,
    translator: Translator,
}

impl Resolver {
    pub fn new(upstream: Arc<dyn Upstream>, translator: Translator) -> Self {
        Self { upstream, translator }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Projects the Datastreams of (box, sensor) pairs. The identity store does
    /// blocking file or database work, so it runs on the blocking pool, once per request.
    async fn datastreams_of(&self, pairs: Vec<(&str, &NativeSensor)>) -> Result<Reply> {
        let keys: Vec<(String, String)> = pairs
            .iter()
            .map(|(box_id, sensor)| (box_id.to_string(), sensor.id.clone()))
            .collect();
        let store = Arc::clone(self.translator.store());
        let ids = tokio::task::spawn_blocking(move || store.resolve_all(&keys)).await??;
        let t = &self.translator;
        Ok(Reply::from_entities(values(
            pairs.iter().zip(ids).map(|((_, sensor), id)| t.datastream_with_id(sensor, id)),
        )?))
    }

    async fn reference(&self, ds_id: DatastreamId) -> Result<Option<(String, String)>> {
        let store = Arc::clone(self.translator.store());
        tokio::task::spawn_blocking(move || store.by_id(ds_id)).await?
    }

    /// Entry point for the HTTP layer: `param`, `nest` and `subrequest` as routed.
    pub async fn resolve(&self, param: &str, nest: Option<&str>, subrequest: Option<&str>) -> Result<Reply> {
        let path = match path::parse(param, nest, subrequest) {
            Ok(path) => path,
            // an unknown entity set outranks whatever else is wrong with the path
            Err(_) if EntitySet::from_name(path::split_component(param.trim()).0).is_none() => {
                return Ok(Reply::message(NOT_EXIST));
            }
            Err(PathRejection::WrongParam(token)) => return Ok(Reply::message(wrong_param(&token))),
            Err(PathRejection::NestedId { .. }) => return Ok(Reply::message(NESTED_ID)),
        };
        debug!(?path, "resolving");
        self.resolve_path(&path).await
    }

    pub async fn resolve_path(&self, path: &ResourcePath) -> Result<Reply> {
        let Some(set) = EntitySet::from_name(&path.entity_set) else {
            return Ok(Reply::message(NOT_EXIST));
        };
        let nested = match path.nested() {
            None => None,
            Some((name, _)) => match Nested::from_name(name) {
                Some(nested) if allowed(set, nested) => Some(nested),
                _ => return Ok(Reply::message(NOT_EXIST)),
            },
        };
        if path.qualifier == Qualifier::Ref {
            return Ok(Reply::message(REF_UNSUPPORTED));
        }
        match set {
            EntitySet::Things => self.things(path, nested).await,
            EntitySet::Sensors => self.sensors(path, nested).await,
            EntitySet::Observations => self.observations(path, nested),
            EntitySet::Datastreams => self.datastreams(path, nested).await,
            EntitySet::Locations
            | EntitySet::HistoricalLocations
            | EntitySet::ObservedProperties
            | EntitySet::FeaturesOfInterest => Ok(Reply::message(NOT_IMPLEMENTED)),
        }
    }

    /// Bare entity sets can be listed only without a nested segment or attribute.
    fn needs_id(path: &ResourcePath) -> bool {
        path.segment.is_some()
    }

    /// Shapes the projection of the primary entity, applying an attribute selector if present.
    fn primary(path: &ResourcePath, entity: Value) -> Reply {
        match path.attribute() {
            Some(attribute) => select(&entity, attribute, path.qualifier),
            None => Reply::Entity(entity),
        }
    }

    async fn things(&self, path: &ResourcePath, nested: Option<Nested>) -> Result<Reply> {
        let t = &self.translator;
        if path.id.is_empty() {
            if Self::needs_id(path) {
                return Ok(Reply::message(INVALID_ID));
            }
            let boxes = self.upstream.fetch_boxes().await?;
            return Ok(Reply::from_entities(values(boxes.iter().map(|b| t.thing(b)))?));
        }
        let sense_box = self.upstream.fetch_box(&path.id).await?;
        match nested {
            None => {
                let entity = t.project(&NativeRecord::from(sense_box))?;
                Ok(Self::primary(path, entity))
            }
            Some(Nested::Locations) => Ok(Reply::from_entities(values(
                sense_box.current_location.iter().map(|l| t.location(l)),
            )?)),
            Some(Nested::HistoricalLocations) => {
                Ok(Reply::from_entities(values(t.historical_location(&sense_box))?))
            }
            Some(Nested::Datastreams) => {
                let pairs = sense_box.sensors.iter().map(|s| (sense_box.id.as_str(), s)).collect();
                self.datastreams_of(pairs).await
            }
            Some(_) => Ok(Reply::message(NOT_EXIST)),
        }
    }

    async fn sensors(&self, path: &ResourcePath, nested: Option<Nested>) -> Result<Reply> {
        let t = &self.translator;
        if path.id.is_empty() && Self::needs_id(path) {
            return Ok(Reply::message(INVALID_ID));
        }
        let boxes = self.upstream.fetch_boxes().await?;
        if path.id.is_empty() {
            let sensors = translate::distinct_sensors(&boxes);
            return Ok(Reply::from_entities(values(sensors.into_iter().map(|s| t.sensor(s)))?));
        }
        let holders: Vec<(&SenseBox, _)> = boxes
            .iter()
            .filter_map(|b| b.sensor(&path.id).map(|s| (b, s)))
            .collect();
        match nested {
            None => match holders.first() {
                None => Ok(Reply::Empty),
                Some((_, sensor)) => Ok(Self::primary(path, serde_json::to_value(t.sensor(sensor))?)),
            },
            Some(Nested::Datastreams) => {
                let pairs = holders.iter().map(|(b, s)| (b.id.as_str(), *s)).collect();
                self.datastreams_of(pairs).await
            }
            Some(_) => Ok(Reply::message(NOT_EXIST)),
        }
    }

    fn observations(&self, path: &ResourcePath, nested: Option<Nested>) -> Result<Reply> {
        let t = &self.translator;
        if path.id.is_empty() {
            return Ok(if Self::needs_id(path) {
                Reply::message(INVALID_ID)
            } else {
                Reply::message(NOT_IMPLEMENTED)
            });
        }
        let measurement = Measurement::placeholder(&path.id);
        match nested {
            None => {
                let entity = t.project(&NativeRecord::from(measurement))?;
                Ok(Self::primary(path, entity))
            }
            Some(Nested::FeatureOfInterest) => {
                Ok(Reply::Entity(serde_json::to_value(t.feature_of_interest(&measurement))?))
            }
            Some(Nested::Datastream) => Ok(Reply::message(NOT_IMPLEMENTED)),
            Some(_) => Ok(Reply::message(NOT_EXIST)),
        }
    }

    async fn datastreams(&self, path: &ResourcePath, nested: Option<Nested>) -> Result<Reply> {
        let t = &self.translator;
        if path.id.is_empty() {
            if Self::needs_id(path) {
                return Ok(Reply::message(INVALID_ID));
            }
            let boxes = self.upstream.fetch_boxes().await?;
            let pairs = boxes
                .iter()
                .flat_map(|b| b.sensors.iter().map(move |s| (b.id.as_str(), s)))
                .collect();
            return self.datastreams_of(pairs).await;
        }
        let Ok(ds_id) = path.id.parse::<DatastreamId>() else {
            return Ok(Reply::message(INVALID_ID));
        };
        let Some((box_id, sensor_id)) = self.reference(ds_id).await? else {
            return Ok(Reply::Empty);
        };
        let sense_box = match self.upstream.fetch_box(&box_id).await {
            Ok(b) => b,
            // the box is gone upstream, the reference outlives it
            Err(e) if e.is_upstream_not_found() => return Ok(Reply::Empty),
            Err(e) => return Err(e),
        };
        let Some(sensor) = sense_box.sensor(&sensor_id) else {
            return Ok(Reply::Empty);
        };
        match nested {
            None => Ok(Self::primary(path, serde_json::to_value(t.datastream_with_id(sensor, ds_id))?)),
            Some(Nested::Thing) => Ok(Reply::Entity(serde_json::to_value(t.thing(&sense_box))?)),
            Some(Nested::Sensor) => Ok(Reply::Entity(serde_json::to_value(t.sensor(sensor))?)),
            Some(Nested::ObservedProperty) => {
                Ok(Reply::Entity(serde_json::to_value(t.observed_property(sensor))?))
            }
            Some(Nested::Observations) => {
                let observations = sense_box
                    .last_measurement_of(sensor)
                    .map(|m| t.observation(&m));
                Ok(Reply::from_entities(values(observations)?))
            }
            Some(_) => Ok(Reply::message(NOT_EXIST)),
        }
    }
}
