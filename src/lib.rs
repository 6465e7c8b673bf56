//! Crimewatch - location-based crime alerting
//!
//! This library provides the proximity engine, route sampler and collaborator
//! interfaces shared by the HTTP server binary.

pub mod config;
pub mod error;
pub mod models;
pub mod proximity;
pub mod route;
pub mod services;

pub use error::AlertError;
pub use models::{Coordinate, EncodedPath, IncidentRecord, ProximityMatch, Severity};
