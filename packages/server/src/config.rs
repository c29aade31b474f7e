use common::{StorageConfig, SupabaseConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Diagnostic mode: DEBUG logging, including fail-open image events.
    #[serde(default)]
    pub debug: bool,
    /// Accepted `Host` header values (port ignored). Empty allows any host.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    /// Staff account created at startup when it does not exist yet.
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

fn default_token_ttl_days() -> i64 {
    7
}

/// Where product records live.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CatalogBackend {
    #[default]
    Relational,
    Supabase,
}

/// What to do when a decodable upload cannot be re-encoded.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageFailurePolicy {
    /// Store the original upload bytes.
    #[default]
    FailOpen,
    /// Reject the request.
    FailClosed,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    /// Ceiling for a stored, encoded image. Default: 3 MiB.
    #[serde(default = "default_image_max_bytes")]
    pub max_bytes: u64,
    /// Largest upload accepted before decoding. Default: 10 MiB.
    #[serde(default = "default_image_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_image_max_width")]
    pub max_width: u32,
    #[serde(default = "default_image_max_height")]
    pub max_height: u32,
    #[serde(default)]
    pub failure_policy: ImageFailurePolicy,
}

fn default_image_max_bytes() -> u64 {
    3 * 1024 * 1024
}
fn default_image_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_image_max_width() -> u32 {
    1920
}
fn default_image_max_height() -> u32 {
    1080
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_image_max_bytes(),
            max_upload_bytes: default_image_max_upload_bytes(),
            max_width: default_image_max_width(),
            max_height: default_image_max_height(),
            failure_policy: ImageFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default)]
    pub backend: CatalogBackend,
    /// Default page size for product listings.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub image: ImageConfig,
}

fn default_page_size() -> u64 {
    20
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::default(),
            page_size: default_page_size(),
            image: ImageConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommentsConfig {
    /// Maximum comment length in characters.
    #[serde(default = "default_comment_max_length")]
    pub max_length: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_comment_max_length() -> usize {
    200
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            max_length: default_comment_max_length(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Required when either the catalog or the storage backend is "supabase".
    pub supabase: Option<SupabaseConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://catalog.db?mode=rwc")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CATALOG__STORAGE__BACKEND=s3)
            .add_source(Environment::with_prefix("CATALOG").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Whether any configured backend needs the Supabase client.
    pub fn uses_supabase(&self) -> bool {
        self.catalog.backend == CatalogBackend::Supabase
            || self.storage.backend == common::StorageBackend::Supabase
    }
}
