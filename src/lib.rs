//! stafacade – an OGC SensorThings API (STA) façade over a sensor-box platform.
//!
//! The platform publishes *boxes*, each carrying a location and a list of
//! *sensors* with their last reading. This crate serves those records through
//! the STA resource model, so that clients can navigate paths such as
//! `/Things(id)/Datastreams` or `/Datastreams(7)/name/$value` and receive
//! OGC-shaped JSON. Nothing is stored apart from the identities of
//! Datastreams, which have no counterpart upstream.
//!
//! ## Modules
//! * [`path`] – The resource path grammar (entity set, id, nested set or
//!   attribute, `$value`/`$ref`).
//! * [`resolver`] – Dispatches a parsed path to one upstream fetch and shapes
//!   the [`resolver::Reply`].
//! * [`translate`] – Projections from native records to Things, Locations,
//!   HistoricalLocations, Sensors, Datastreams, Observations,
//!   ObservedProperties and FeaturesOfInterest.
//! * [`identity`] – The append-only [`identity::IdentityStore`] giving each
//!   (box, sensor) pair a stable Datastream id.
//! * [`persist`] – Storage backends for the identity store (JSON file, SQLite,
//!   memory).
//! * [`units`] – Unit of measurement and sensor metadata catalogs.
//! * [`upstream`] – The [`upstream::Upstream`] trait and its HTTP client.
//! * [`root`] – The service root capability document.
//! * [`server`] – Axum routes under `/v1.1`.
//! * [`config`] – Settings from `sta.toml` and `STA_*` variables.
//!
//! ## Identity
//! Things and Sensors reuse the platform's ids. Datastream ids are minted on
//! first sight of a (box, sensor) pair and persisted. Every other entity gets
//! a time based id per request, so for instance the same Location will carry a
//! different `@iot.id` on every request.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use stafacade::{identity::IdentityStore, persist::PersistenceMode, translate::Translator};
//! let store = Arc::new(IdentityStore::open(&PersistenceMode::InMemory).unwrap());
//! let translator = Translator::new("http://localhost:8000/v1.1", Arc::clone(&store));
//! let first = store.resolve("box-1", "sensor-1").unwrap();
//! assert_eq!(store.resolve("box-1", "sensor-1").unwrap(), first);
//! assert_eq!(translator.service_root(), "http://localhost:8000/v1.1");
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod native;
pub mod path;
pub mod persist;
pub mod resolver;
pub mod root;
pub mod server;
pub mod translate;
pub mod units;
pub mod upstream;

pub use error::{FacadeError, Result};
