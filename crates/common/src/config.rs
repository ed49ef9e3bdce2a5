//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Token issuance configuration.
    pub auth: AuthConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Upload processing configuration.
    #[serde(default)]
    pub media: MediaSettings,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Administrator account ensured at startup.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access and refresh tokens.
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Local filesystem.
    #[default]
    Local,
    /// S3-compatible object storage.
    S3,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageKind,
    /// Local filesystem settings.
    #[serde(default)]
    pub local: LocalStorageSettings,
    /// Object storage settings, required when `backend = "s3"`.
    #[serde(default)]
    pub s3: Option<S3StorageSettings>,
}

/// Local filesystem storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageSettings {
    /// Directory files are written under.
    #[serde(default = "default_media_root")]
    pub base_path: PathBuf,
    /// URL prefix the directory is served at.
    #[serde(default = "default_media_url")]
    pub base_url: String,
}

impl Default for LocalStorageSettings {
    fn default() -> Self {
        Self {
            base_path: default_media_root(),
            base_url: default_media_url(),
        }
    }
}

/// S3-compatible object storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct S3StorageSettings {
    /// S3 endpoint URL (AWS or a compatible service such as `MinIO`).
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// Region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Custom domain objects are served from (CDN or bucket website).
    #[serde(default)]
    pub custom_domain: Option<String>,
    /// Path prefix within the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Upload processing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Longest edge, in pixels, stored images are scaled down to.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// JPEG re-encode quality.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Maximum accepted request body for uploads, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Administrator account created on startup if missing.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdminConfig {
    /// Login email.
    pub email: String,
    /// Username.
    #[serde(default = "default_admin_username")]
    pub username: String,
    /// Initial password.
    pub password: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_access_token_minutes() -> i64 {
    60
}

const fn default_refresh_token_days() -> i64 {
    1
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_media_url() -> String {
    "/media".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

const fn default_max_dimension() -> u32 {
    1024
}

const fn default_jpeg_quality() -> u8 {
    85
}

const fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_admin_username() -> String {
    "admin".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `COZUM_ENV`)
    /// 4. Environment variables with `COZUM_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("COZUM_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("COZUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("COZUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parse configuration from an inline TOML document.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
