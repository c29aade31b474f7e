use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use catalog_server::config::{
    AppConfig, AuthConfig, CatalogConfig, CommentsConfig, CorsConfig, DatabaseConfig,
    ServerConfig,
};
use catalog_server::state::AppState;
use ::common::storage::{BlobPath, BlobStore};
use ::common::{LocalStorageConfig, StorageConfig};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tempfile::TempDir;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const PRODUCTS: &str = "/api/v1/products";
    pub const ADMIN_PRODUCTS: &str = "/api/v1/admin/products";

    pub fn product(id: i64) -> String {
        format!("/api/v1/products/{id}")
    }

    pub fn admin_product(id: i64) -> String {
        format!("/api/v1/admin/products/{id}")
    }

    pub fn votes(product_id: i64) -> String {
        format!("/api/v1/products/{product_id}/votes")
    }

    pub fn comments(product_id: i64) -> String {
        format!("/api/v1/products/{product_id}/comments")
    }

    pub fn comment(product_id: i64, comment_id: i64) -> String {
        format!("/api/v1/products/{product_id}/comments/{comment_id}")
    }

    pub fn media(path: &str) -> String {
        format!("/media/{path}")
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub blobs: Arc<dyn BlobStore>,
    _media_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Who sends a request: a bearer token, an anonymous forwarded address, or
/// nobody in particular (the loopback peer).
#[derive(Clone, Copy)]
pub enum Caller<'a> {
    Anonymous,
    Token(&'a str),
    Forwarded(&'a str),
}

fn test_config(media_dir: &TempDir) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            debug: false,
            allowed_hosts: vec![],
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-for-integration-tests".to_string(),
            token_ttl_days: 1,
            bootstrap_admin: None,
        },
        storage: StorageConfig {
            local: LocalStorageConfig {
                base_path: media_dir.path().to_path_buf(),
                public_base_url: "/media".to_string(),
            },
            ..Default::default()
        },
        supabase: None,
        catalog: CatalogConfig::default(),
        comments: CommentsConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a tweaked configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let media_dir = tempfile::tempdir().expect("Failed to create media dir");
        let mut config = test_config(&media_dir);
        configure(&mut config);

        // A single connection keeps every query on the same in-memory database.
        let mut opts = ConnectOptions::new(config.database.url.clone());
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to connect to test database");
        catalog_server::database::sync_schema(&db)
            .await
            .expect("Failed to create schema");
        catalog_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let state = AppState::from_config(config, db.clone())
            .await
            .expect("Failed to build app state");
        let blobs = state.blob_store.clone();
        let app = catalog_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            blobs,
            _media_dir: media_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn request(&self, method: Method, path: &str, caller: Caller<'_>) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match caller {
            Caller::Anonymous => builder,
            Caller::Token(token) => builder.header("Authorization", format!("Bearer {token}")),
            Caller::Forwarded(addr) => builder.header("X-Forwarded-For", addr),
        }
    }

    pub async fn get(&self, path: &str, caller: Caller<'_>) -> TestResponse {
        let res = self
            .request(Method::GET, path, caller)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn post_json(&self, path: &str, body: &Value, caller: Caller<'_>) -> TestResponse {
        let res = self
            .request(Method::POST, path, caller)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str, caller: Caller<'_>) -> TestResponse {
        let res = self
            .request(Method::DELETE, path, caller)
            .send()
            .await
            .expect("Failed to send DELETE request");
        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        self.get(path, Caller::Anonymous).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        self.get(path, Caller::Token(token)).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        self.post_json(path, body, Caller::Anonymous).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        self.delete(path, Caller::Token(token)).await
    }

    /// Send the admin product form as `multipart/form-data`.
    pub async fn send_product_form(
        &self,
        method: Method,
        path: &str,
        fields: &[(&str, &str)],
        image: Option<Vec<u8>>,
        token: &str,
    ) -> TestResponse {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }
        if let Some(bytes) = image {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name("upload.png")
                .mime_str("image/png")
                .expect("Failed to set MIME type");
            form = form.part("image", part);
        }

        let res = self
            .request(method, path, Caller::Token(token))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart request");
        TestResponse::from_response(res).await
    }

    /// Register a user and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        self.login(username, password).await
    }

    /// Create a staff account directly in the database and log in.
    pub async fn create_staff_user(&self, username: &str, password: &str) -> String {
        catalog_server::seed::ensure_staff_user(&self.db, username, password, true)
            .await
            .expect("Failed to create staff user");
        self.login(username, password).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Create a product through the admin API and return its `id`.
    pub async fn create_product(
        &self,
        token: &str,
        fields: &[(&str, &str)],
        image: Option<Vec<u8>>,
    ) -> i64 {
        let res = self
            .send_product_form(Method::POST, routes::ADMIN_PRODUCTS, fields, image, token)
            .await;
        assert_eq!(res.status, 201, "create_product failed: {}", res.text);
        res.id()
    }

    pub async fn blob_exists(&self, path: &str) -> bool {
        let path = BlobPath::parse(path).expect("invalid blob path");
        self.blobs.exists(&path).await.expect("exists failed")
    }

    pub async fn blob_size(&self, path: &str) -> Option<u64> {
        let path = BlobPath::parse(path).expect("invalid blob path");
        self.blobs.size(&path).await.expect("size failed")
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn id(&self) -> i64 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'")
    }
}

/// PNG of a single colour.
pub fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 60, 200]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf.into_inner()
}
