#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use stafacade::error::{FacadeError, Result};
use stafacade::identity::IdentityStore;
use stafacade::native::SenseBox;
use stafacade::persist::PersistenceMode;
use stafacade::resolver::Resolver;
use stafacade::translate::Translator;
use stafacade::upstream::Upstream;

pub const ROOT: &str = "http://localhost:8000/v1.1";

/// Serves a fixed set of boxes and counts how often it was asked.
pub struct FakeUpstream {
    pub boxes: Vec<SenseBox>,
    pub calls: AtomicUsize,
}

impl FakeUpstream {
    pub fn new(boxes: Vec<SenseBox>) -> Self {
        Self { boxes, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn fetch_box(&self, id: &str) -> Result<SenseBox> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.boxes
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| FacadeError::Upstream { status: Some(404), message: format!("no box {id}") })
    }
    async fn fetch_boxes(&self) -> Result<Vec<SenseBox>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.boxes.clone())
    }
}

/// An upstream that is down.
pub struct DeadUpstream;

#[async_trait]
impl Upstream for DeadUpstream {
    async fn fetch_box(&self, _id: &str) -> Result<SenseBox> {
        Err(FacadeError::Upstream { status: None, message: "connection refused".into() })
    }
    async fn fetch_boxes(&self) -> Result<Vec<SenseBox>> {
        Err(FacadeError::Upstream { status: None, message: "connection refused".into() })
    }
}

pub fn abc123() -> SenseBox {
    serde_json::from_value(json!({
        "_id": "abc123",
        "name": "B1",
        "exposure": "outdoor",
        "model": "homeV2Wifi",
        "grouptag": ["school"],
        "createdAt": "2022-03-01T10:00:00.000Z",
        "updatedAt": "2024-05-01T10:00:00.000Z",
        "lastMeasurementAt": "2024-05-01T09:59:00.000Z",
        "currentLocation": {
            "type": "Point",
            "coordinates": [7.6261, 51.9607],
            "timestamp": "2022-03-01T10:00:00.000Z"
        },
        "sensors": [
            {
                "_id": "s1",
                "title": "Temperatur",
                "unit": "°C",
                "sensorType": "DHT22",
                "lastMeasurement": { "value": "21.4", "createdAt": "2024-05-01T09:59:00.000Z" }
            },
            { "_id": "s2", "title": "rel. Luftfeuchte", "unit": "%", "sensorType": "DHT22" },
            { "_id": "s3", "title": "Bodenfeuchte", "unit": "Skalenteile", "sensorType": "Truebner SMT50" }
        ]
    }))
    .unwrap()
}

pub fn def456() -> SenseBox {
    serde_json::from_value(json!({
        "_id": "def456",
        "name": "B2",
        "description": "On the balcony",
        "exposure": "indoor",
        "model": "custom",
        "sensors": [
            { "_id": "s4", "title": "Temperatur", "unit": "°C", "sensorType": "DHT22" },
            { "_id": "s5", "title": "PM10", "unit": "µg/m³", "sensorType": "SDS 011" }
        ]
    }))
    .unwrap()
}

pub fn resolver_with(boxes: Vec<SenseBox>) -> (Resolver, Arc<IdentityStore>) {
    let store = Arc::new(IdentityStore::open(&PersistenceMode::InMemory).unwrap());
    let translator = Translator::new(ROOT, Arc::clone(&store));
    (Resolver::new(Arc::new(FakeUpstream::new(boxes)), translator), store)
}

pub fn resolver() -> (Resolver, Arc<IdentityStore>) {
    resolver_with(vec![abc123(), def456()])
}
