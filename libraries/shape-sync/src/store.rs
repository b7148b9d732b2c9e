//! The remote store of record.

use std::future::Future;

use geo_utils::Record;
use geojson::Feature;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request could not be completed: {0}")]
    Network(String),

    #[error("server responded with status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("could not parse response body")]
    Decode(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// CRUD access to the geodata collection.
///
/// Every call is a single attempt: failures come straight back to the caller
/// and nothing is retried. The store knows nothing about map layers; keeping
/// those consistent is the caller's job.
pub trait GeoStore {
    /// Fetch the whole collection.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Record>, StoreError>>;

    /// Persist a new feature. Only succeeds when the server hands back a
    /// non-empty id; a 2xx response without one is a [`StoreError::Server`].
    fn create(&self, feature: &Feature) -> impl Future<Output = Result<Record, StoreError>>;

    /// Replace the stored feature for `id` wholesale.
    fn update(&self, id: &str, feature: &Feature) -> impl Future<Output = Result<(), StoreError>>;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>>;
}
