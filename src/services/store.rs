//! Record store interface and the in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AlertError;
use crate::models::{IncidentRecord, NewIncident};

/// Source of truth for incident records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every stored incident, in the store's iteration order.
    async fn fetch_all_incidents(&self) -> Result<Vec<IncidentRecord>, AlertError>;

    /// Insert a new incident and return its id.
    async fn insert_incident(&self, incident: NewIncident) -> Result<String, AlertError>;
}

/// Fetch a full snapshot, treating a slow store as unavailable.
pub async fn fetch_snapshot(
    store: &dyn RecordStore,
    timeout: Duration,
) -> Result<Vec<IncidentRecord>, AlertError> {
    match tokio::time::timeout(timeout, store.fetch_all_incidents()).await {
        Ok(result) => {
            let records = result?;
            debug!("Fetched {} incident records", records.len());
            Ok(records)
        }
        Err(_) => {
            warn!("Record store fetch timed out after {:?}", timeout);
            Err(AlertError::StoreUnavailable(format!(
                "fetch timed out after {} ms",
                timeout.as_millis()
            )))
        }
    }
}

/// Process-local record store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<IncidentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`
    pub fn with_records(records: Vec<IncidentRecord>) -> Self {
        info!("Seeding memory store with {} incidents", records.len());
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all_incidents(&self) -> Result<Vec<IncidentRecord>, AlertError> {
        Ok(self.records.read().await.clone())
    }

    async fn insert_incident(&self, incident: NewIncident) -> Result<String, AlertError> {
        incident.position.validate()?;

        let id = Uuid::new_v4().to_string();
        let record = incident.into_record(id.clone());
        info!(
            "Stored incident {} at {} ({})",
            id,
            record.position(),
            record.nearest_intersection
        );

        self.records.write().await.push(record);
        Ok(id)
    }
}
