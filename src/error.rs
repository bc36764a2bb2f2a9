use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacadeError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("Blocking task failed: {0}")]
    Task(String),
}

impl FacadeError {
    /// True when the upstream answered, but did not know the requested record.
    pub fn is_upstream_not_found(&self) -> bool {
        matches!(self, Self::Upstream { status: Some(404), .. })
    }
}

pub type Result<T> = std::result::Result<T, FacadeError>;

// Helper conversions
impl From<rusqlite::Error> for FacadeError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<std::io::Error> for FacadeError {
    fn from(e: std::io::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<serde_json::Error> for FacadeError {
    fn from(e: serde_json::Error) -> Self { Self::Decode(e.to_string()) }
}
impl From<config::ConfigError> for FacadeError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<reqwest::Error> for FacadeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream { status: e.status().map(|s| s.as_u16()), message: e.to_string() }
    }
}
impl From<tokio::task::JoinError> for FacadeError {
    fn from(e: tokio::task::JoinError) -> Self { Self::Task(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for FacadeError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
