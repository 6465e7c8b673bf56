//! Route sampler.
//!
//! Decodes encoded polylines from the directions provider and runs a
//! proximity search at every decoded sample.

mod polyline;
mod sampler;

pub use polyline::{decode, encode};
pub use sampler::{nearby_along_route, nearby_along_route_with, nearby_along_samples, sample_route};
