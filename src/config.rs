//! Service configuration loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::Severity;
use crate::proximity::{DedupeKey, MatchOrder, NearbyQuery};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub detection: DetectionConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Detection radii and alerting rules
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectionConfig {
    pub point_radius_km: f64,
    pub route_radius_km: f64,
    /// Severities that raise a point-check alert
    pub alert_severities: Vec<Severity>,
    pub order: MatchOrder,
    /// How far the reverse geocoder looks for a named intersection
    pub geocoder_radius_km: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            point_radius_km: 0.5,
            route_radius_km: 0.5,
            alert_severities: Severity::alerting().to_vec(),
            order: MatchOrder::Scan,
            geocoder_radius_km: 0.1,
        }
    }
}

impl DetectionConfig {
    /// Query used for live position checks
    pub fn point_query(&self) -> NearbyQuery {
        NearbyQuery::new(self.point_radius_km, DedupeKey::ByIntersection)
            .with_severities(self.alert_severities.iter().copied())
            .with_order(self.order)
    }

    /// Query used at each sample of a planned route
    pub fn route_query(&self) -> NearbyQuery {
        NearbyQuery::new(self.route_radius_km, DedupeKey::ById).with_order(self.order)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// CSV (or .csv.gz) file used to seed the store at startup
    pub incidents: Option<PathBuf>,
    pub fetch_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            incidents: None,
            fetch_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }
}
