//! The service root: which entity sets exist and which conformance classes apply.

use serde_json::{json, Value};

use crate::path::EntitySet;

pub const DATAMODEL_CONFORMANCE: &str = "http://www.opengis.net/spec/iot_sensing/1.1/req/datamodel";
pub const RESOURCE_PATH_CONFORMANCE: &str =
    "http://www.opengis.net/spec/iot_sensing/1.1/req/resource-path/resource-path-to-entities";

pub fn capabilities(service_root: &str) -> Value {
    let root = service_root.trim_end_matches('/');
    let sets: Vec<Value> = EntitySet::ALL
        .iter()
        .map(|set| json!({ "name": set.name(), "url": format!("{}/{}", root, set.name()) }))
        .collect();
    json!({
        "serverSettings": {
            "conformance": [DATAMODEL_CONFORMANCE, RESOURCE_PATH_CONFORMANCE]
        },
        "value": sets
    })
}
