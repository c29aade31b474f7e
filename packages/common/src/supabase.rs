//! Typed client for a Supabase project: PostgREST tables and the storage API.
//!
//! The client is constructed once at startup from [`SupabaseConfig`] and
//! shared (it is cheap to clone) by whoever needs it.

use std::time::Duration;

use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, HeaderMap};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use thiserror::Error;

use crate::config::SupabaseConfig;

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Supabase request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Supabase returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected Supabase response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Supabase is not configured: {0}")]
    NotConfigured(String),
}

impl SupabaseError {
    /// Whether the remote side reported that the addressed row/object is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            // Older storage-api versions answer 400 with an embedded 404.
            Self::Status { status, body } => {
                *status == 404 || (*status == 400 && body.contains("not_found"))
            }
            _ => false,
        }
    }
}

/// A page of rows plus the exact total reported by PostgREST, when known.
#[derive(Debug)]
pub struct RowPage<T> {
    pub rows: Vec<T>,
    pub total: Option<u64>,
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SupabaseError::NotConfigured("url is empty".into()));
        }
        if config.service_key.trim().is_empty() {
            return Err(SupabaseError::NotConfigured("service_key is empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            service_key: config.service_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{path}", self.base_url)
    }

    /// `GET /rest/v1/{table}` with PostgREST query parameters, e.g.
    /// `[("activo", "eq.true"), ("order", "orden.asc")]`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SupabaseError> {
        let request = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", "*")])
            .query(query);
        let response = checked(self.authorize(request).send().await?).await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    /// Paginated select that also asks PostgREST for the exact row count.
    pub async fn select_page<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        offset: u64,
        limit: u64,
    ) -> Result<RowPage<T>, SupabaseError> {
        let request = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", "*")])
            .query(query)
            .query(&[("offset", offset), ("limit", limit)])
            .header("Prefer", "count=exact");
        let response = checked(self.authorize(request).send().await?).await?;
        let total = parse_content_range_total(response.headers());
        let rows = serde_json::from_slice(&response.bytes().await?)?;
        Ok(RowPage { rows, total })
    }

    /// `POST /rest/v1/{table}` returning the inserted row.
    pub async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, SupabaseError> {
        let request = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(body);
        let response = checked(self.authorize(request).send().await?).await?;
        let mut rows: Vec<T> = serde_json::from_slice(&response.bytes().await?)?;
        if rows.is_empty() {
            return Err(SupabaseError::Status {
                status: 500,
                body: format!("insert into {table} returned no rows"),
            });
        }
        Ok(rows.swap_remove(0))
    }

    /// `PATCH /rest/v1/{table}?id=eq.{id}` returning the updated row, if any.
    pub async fn update_by_id<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        id: i64,
        body: &B,
    ) -> Result<Option<T>, SupabaseError> {
        let request = self
            .http
            .patch(self.rest_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(body);
        let response = checked(self.authorize(request).send().await?).await?;
        let rows: Vec<T> = serde_json::from_slice(&response.bytes().await?)?;
        Ok(rows.into_iter().next())
    }

    /// `DELETE /rest/v1/{table}?id=eq.{id}`. Returns whether a row was removed.
    pub async fn delete_by_id(&self, table: &str, id: i64) -> Result<bool, SupabaseError> {
        let request = self
            .http
            .delete(self.rest_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        let response = checked(self.authorize(request).send().await?).await?;
        let rows: Vec<IgnoredAny> = serde_json::from_slice(&response.bytes().await?)?;
        Ok(!rows.is_empty())
    }

    /// Upload (upsert) an object into a storage bucket.
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), SupabaseError> {
        let request = self
            .http
            .post(self.object_url(bucket, path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data);
        checked(self.authorize(request).send().await?).await?;
        Ok(())
    }

    pub async fn download_object(&self, bucket: &str, path: &str) -> Result<Vec<u8>, SupabaseError> {
        let request = self.http.get(self.object_url(bucket, path));
        let response = checked(self.authorize(request).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Remove an object. Returns `false` when it did not exist.
    pub async fn delete_object(&self, bucket: &str, path: &str) -> Result<bool, SupabaseError> {
        let request = self.http.delete(self.object_url(bucket, path));
        match checked(self.authorize(request).send().await?).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Object size from `GET /storage/v1/object/info/{bucket}/{path}`.
    /// Returns `None` when the object does not exist.
    pub async fn object_size(&self, bucket: &str, path: &str) -> Result<Option<u64>, SupabaseError> {
        #[derive(serde::Deserialize)]
        struct ObjectInfo {
            size: Option<u64>,
            metadata: Option<ObjectMetadata>,
        }
        #[derive(serde::Deserialize)]
        struct ObjectMetadata {
            size: Option<u64>,
        }

        let url = format!(
            "{}/storage/v1/object/info/{bucket}/{path}",
            self.base_url
        );
        let response = match checked(self.authorize(self.http.get(url)).send().await?).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let info: ObjectInfo = serde_json::from_slice(&response.bytes().await?)?;
        Ok(Some(
            info.size
                .or(info.metadata.and_then(|m| m.size))
                .unwrap_or(0),
        ))
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }
}

/// Turn non-2xx responses into `SupabaseError::Status`, keeping the body.
async fn checked(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SupabaseError::Status {
        status: status.as_u16(),
        body,
    })
}

/// `Content-Range: 0-19/57` → `Some(57)`; `*/*` or missing → `None`.
fn parse_content_range_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit_once('/'))
        .and_then(|(_, total)| total.parse().ok())
}
