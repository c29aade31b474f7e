pub mod config;
pub mod storage;
pub mod supabase;

pub use config::{LocalStorageConfig, S3StorageConfig, StorageBackend, StorageConfig, SupabaseConfig};
