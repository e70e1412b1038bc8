use std::{net::SocketAddr, path::PathBuf};

use serde::Deserialize;
use url::Url;

#[derive(Deserialize, Debug, Clone)]
pub struct PrometheusConfig {
    /// The URL of the Prometheus push gateway.
    pub url: Url,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MetricConfig {
    PrometheusPush(PrometheusConfig),
}

#[derive(Deserialize, Debug, Clone)]
pub struct UploadConfig {
    /// Flat directory holding uploaded complaint photos.
    pub path: PathBuf,
    /// Maximum photo size in bytes.
    #[serde(default = "default_upload_limit")]
    pub limit: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_resident_ttl")]
    pub resident_ttl_hours: i64,
    #[serde(default = "default_admin_ttl")]
    pub admin_ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resident_ttl_hours: default_resident_ttl(),
            admin_ttl_hours: default_admin_ttl(),
        }
    }
}

/// First-startup provisioning of the super-admin account.
#[derive(Deserialize, Debug, Clone)]
pub struct BootstrapConfig {
    pub super_admin_email: String,
    /// If unset, a random password is generated and printed once.
    pub super_admin_password: Option<String>,
}

/// A unit created at startup if no unit with the same name exists.
#[derive(Deserialize, Debug, Clone)]
pub struct UnitSeed {
    pub name: String,
    pub municipality: String,
    pub province: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub listen_address: Option<SocketAddr>,
    /// SQLite connection URL.
    pub db: String,
    pub uploads: UploadConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    pub bootstrap: Option<BootstrapConfig>,
    #[serde(default)]
    pub units: Vec<UnitSeed>,
    pub metrics: Option<MetricConfig>,
}

const fn default_upload_limit() -> u64 {
    5 * 1024 * 1024
}

const fn default_resident_ttl() -> i64 {
    7 * 24
}

const fn default_admin_ttl() -> i64 {
    24
}
