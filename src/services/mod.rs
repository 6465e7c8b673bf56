//! External collaborators used by the alerting endpoints.
//!
//! Each collaborator is a narrow async trait so handlers receive explicit
//! handles instead of reaching for process-wide clients.

mod alerts;
mod directions;
mod geocoder;
mod seed;
mod store;

pub use alerts::{AlertDispatcher, ContactBook, DispatchReport, LogDispatcher};
pub use directions::{DirectionsProvider, PlannedRoute};
pub use geocoder::{Geocoder, IntersectionGeocoder};
pub use seed::{load_incidents_csv, read_incidents};
pub use store::{fetch_snapshot, MemoryStore, RecordStore};
