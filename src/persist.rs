// used for persistence
use rusqlite::{params, Connection, Error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FacadeError, Result};

pub type DatastreamId = u64;

/// One persisted Datastream identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub ds_id: DatastreamId,
    pub box_id: String,
    pub sensor_id: String,
}

/// The full table, in the layout it has on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTable {
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl ReferenceTable {
    pub fn find_pair(&self, box_id: &str, sensor_id: &str) -> Option<&Reference> {
        self.references
            .iter()
            .find(|r| r.box_id == box_id && r.sensor_id == sensor_id)
    }
    pub fn find_id(&self, ds_id: DatastreamId) -> Option<&Reference> {
        self.references.iter().find(|r| r.ds_id == ds_id)
    }
    // ids are never reused, so the next one is one above the largest seen
    pub fn next_id(&self) -> DatastreamId {
        self.references.iter().map(|r| r.ds_id).max().unwrap_or(0) + 1
    }
    pub fn len(&self) -> usize {
        self.references.len()
    }
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Storage behind the identity store. Implementations are only ever called
/// from within the store's lock, one read-modify-write at a time.
pub trait ReferenceBackend: Send {
    /// Reads the complete table.
    fn load(&mut self) -> Result<ReferenceTable>;
    /// Persists `added`, which has already been pushed onto `table`.
    fn append(&mut self, table: &ReferenceTable, added: &[Reference]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    Json(PathBuf),
    Sqlite(PathBuf),
}

impl PersistenceMode {
    pub fn open(&self) -> Result<Box<dyn ReferenceBackend>> {
        Ok(match self {
            PersistenceMode::InMemory => Box::new(MemoryBackend::default()),
            PersistenceMode::Json(path) => Box::new(JsonFileBackend::new(path)),
            PersistenceMode::Sqlite(path) => Box::new(SqliteBackend::open(path)?),
        })
    }
}

// ------------- In memory -------------
#[derive(Debug, Default)]
pub struct MemoryBackend {
    table: ReferenceTable,
}

impl ReferenceBackend for MemoryBackend {
    fn load(&mut self) -> Result<ReferenceTable> {
        Ok(self.table.clone())
    }
    fn append(&mut self, table: &ReferenceTable, _added: &[Reference]) -> Result<()> {
        self.table = table.clone();
        Ok(())
    }
}

// ------------- JSON file -------------
/// Keeps the table in a single JSON file that is read in full on every access
/// and rewritten in full on every insert.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl ReferenceBackend for JsonFileBackend {
    fn load(&mut self) -> Result<ReferenceTable> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(ReferenceTable::default()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                FacadeError::Persistence(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ReferenceTable::default()),
            Err(e) => Err(e.into()),
        }
    }
    fn append(&mut self, table: &ReferenceTable, added: &[Reference]) -> Result<()> {
        // write beside the target and rename, so a crash never leaves half a table
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        let text = serde_json::to_vec_pretty(table).map_err(|e| FacadeError::Persistence(e.to_string()))?;
        fs::write(&staging, text)?;
        fs::rename(&staging, &self.path)?;
        debug!(added = added.len(), path = %self.path.display(), "reference table rewritten");
        Ok(())
    }
}

// ------------- SQLite -------------
pub struct SqliteBackend {
    db: Connection,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }
    fn with_connection(connection: Connection) -> Result<Self> {
        connection.execute_batch(
            "
            create table if not exists Reference (
                Datastream_Identity integer not null,
                Box_Identity text not null,
                Sensor_Identity text not null,
                constraint referenceable_Datastream_Identity primary key (
                    Datastream_Identity
                ),
                constraint unique_Reference unique (
                    Box_Identity,
                    Sensor_Identity
                )
            );
            ",
        )?;
        Ok(Self { db: connection })
    }
}

impl ReferenceBackend for SqliteBackend {
    fn load(&mut self) -> Result<ReferenceTable> {
        let mut statement = self.db.prepare_cached(
            "
            select Datastream_Identity, Box_Identity, Sensor_Identity
                from Reference
                order by Datastream_Identity
            ",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(Reference {
                ds_id: row.get::<_, i64>(0)? as DatastreamId,
                box_id: row.get(1)?,
                sensor_id: row.get(2)?,
            })
        })?;
        let references = rows.collect::<std::result::Result<Vec<_>, Error>>()?;
        Ok(ReferenceTable { references })
    }
    fn append(&mut self, _table: &ReferenceTable, added: &[Reference]) -> Result<()> {
        let transaction = self.db.transaction()?;
        {
            let mut statement = transaction.prepare_cached(
                "
                insert into Reference (
                    Datastream_Identity,
                    Box_Identity,
                    Sensor_Identity
                ) values (?, ?, ?)
                ",
            )?;
            for reference in added {
                statement.execute(params![reference.ds_id as i64, &reference.box_id, &reference.sensor_id])?;
            }
        }
        transaction.commit()?;
        Ok(())
    }
}
