//! Stable identities for Datastreams.
//!
//! The upstream platform has no notion of a Datastream; one is synthesized for
//! every (box, sensor) pair. Clients navigate to Datastreams by id, so the id
//! handed out for a pair must never change. The [`IdentityStore`] keeps an
//! append-only table of `(ds_id, box_id, sensor_id)` references behind a single
//! lock, so that the whole load → scan → mint → persist cycle is serialized and
//! two first requests for the same pair cannot mint two ids.

use std::sync::Mutex;
use tracing::info;

use crate::error::{FacadeError, Result};
use crate::persist::{DatastreamId, PersistenceMode, Reference, ReferenceBackend};

pub struct IdentityStore {
    backend: Mutex<Box<dyn ReferenceBackend>>,
}

impl IdentityStore {
    pub fn new(backend: Box<dyn ReferenceBackend>) -> Self {
        Self { backend: Mutex::new(backend) }
    }

    pub fn open(mode: &PersistenceMode) -> Result<Self> {
        Ok(Self::new(mode.open()?))
    }

    /// Returns the id of the Datastream for the pair, minting one if needed.
    pub fn resolve(&self, box_id: &str, sensor_id: &str) -> Result<DatastreamId> {
        let ids = self.resolve_all(&[(box_id.to_string(), sensor_id.to_string())])?;
        ids.first()
            .copied()
            .ok_or_else(|| FacadeError::Invariant("no id resolved for a single pair".to_string()))
    }

    /// Resolves every pair in one load and at most one persist, in order.
    pub fn resolve_all(&self, pairs: &[(String, String)]) -> Result<Vec<DatastreamId>> {
        let mut backend = self.backend.lock()?;
        let mut table = backend.load()?;
        let known = table.len();
        let mut ids = Vec::with_capacity(pairs.len());
        for (box_id, sensor_id) in pairs {
            if let Some(existing) = table.find_pair(box_id, sensor_id) {
                ids.push(existing.ds_id);
                continue;
            }
            let reference = Reference {
                ds_id: table.next_id(),
                box_id: box_id.clone(),
                sensor_id: sensor_id.clone(),
            };
            info!(ds_id = reference.ds_id, %box_id, %sensor_id, "minted datastream id");
            ids.push(reference.ds_id);
            table.references.push(reference);
        }
        if table.len() > known {
            backend.append(&table, &table.references[known..])?;
        }
        Ok(ids)
    }

    /// Reverse lookup: the (box, sensor) pair behind a Datastream id.
    pub fn by_id(&self, ds_id: DatastreamId) -> Result<Option<(String, String)>> {
        let mut backend = self.backend.lock()?;
        let table = backend.load()?;
        Ok(table
            .find_id(ds_id)
            .map(|r| (r.box_id.clone(), r.sensor_id.clone())))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.backend.lock()?.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
