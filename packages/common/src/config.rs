use std::path::PathBuf;

use serde::Deserialize;

/// Which blob store backs product images.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
    Supabase,
}

/// App-level blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend selection. Default: "local".
    #[serde(default)]
    pub backend: StorageBackend,
    /// Largest single blob any backend accepts, in bytes. Default: 10 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// Required when `backend = "s3"`.
    pub s3: Option<S3StorageConfig>,
}

fn default_max_blob_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            max_blob_size: default_max_blob_size(),
            local: LocalStorageConfig::default(),
            s3: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalStorageConfig {
    /// Root directory for stored blobs. Default: "./media".
    #[serde(default = "default_local_base_path")]
    pub base_path: PathBuf,
    /// URL prefix under which the server exposes the blobs. Default: "/media".
    #[serde(default = "default_local_public_base_url")]
    pub public_base_url: String,
}

fn default_local_base_path() -> PathBuf {
    PathBuf::from("./media")
}
fn default_local_public_base_url() -> String {
    "/media".into()
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_local_base_path(),
            public_base_url: default_local_public_base_url(),
        }
    }
}

/// S3-compatible object store (AWS S3, MinIO, R2...).
#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    pub bucket: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint, e.g. "http://localhost:9000" for MinIO.
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    /// Use path-style addressing. MinIO needs this. Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    /// Overrides the bucket URL when building public links (CDN, custom domain).
    pub public_base_url: Option<String>,
}

fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_path_style() -> bool {
    true
}

/// Supabase project settings, shared by the storage bucket backend and the
/// PostgREST product repository.
#[derive(Debug, Deserialize, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. "https://xyzcompany.supabase.co".
    pub url: String,
    /// Service role key. Sent both as `apikey` and as the bearer token.
    pub service_key: String,
    /// Storage bucket holding product images. Default: "media".
    #[serde(default = "default_supabase_bucket")]
    pub bucket: String,
    /// PostgREST table holding products. Default: "productos".
    #[serde(default = "default_supabase_products_table")]
    pub products_table: String,
    /// Request timeout in seconds. Default: 10.
    #[serde(default = "default_supabase_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_supabase_bucket() -> String {
    "media".into()
}
fn default_supabase_products_table() -> String {
    "productos".into()
}
fn default_supabase_timeout_secs() -> u64 {
    10
}
