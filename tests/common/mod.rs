#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use admin_dashboard::config::{AdminSeed, Config};
use admin_dashboard::seed;
use admin_dashboard::state::SharedState;

pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const ADMIN_PASSWORD: &str = "password123";
pub const PASSWORD: &str = "secret-pass-1";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub state: SharedState,
    pub storage_dir: PathBuf,
}

async fn read(resp: reqwest::Response) -> (Value, StatusCode) {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(json!(null));
    (body, status)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Login and return the response body + status.
    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        read(resp).await
    }

    /// Login and return the bearer token.
    pub async fn token(&self, email: &str, password: &str) -> String {
        let (body, status) = self.login(email, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Token of the seeded Super Admin.
    pub async fn admin_token(&self) -> String {
        self.token(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Create a user through the API as the Super Admin, return the user JSON.
    pub async fn create_user(&self, name: &str, email: &str, roles: &[&str]) -> Value {
        let admin = self.admin_token().await;
        let (body, status) = self
            .post_auth(
                "/api/users",
                &admin,
                &json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                    "password_confirmation": PASSWORD,
                    "roles": roles,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {body}");
        body["data"].clone()
    }

    /// Create a user with the given roles and return (user JSON, token).
    pub async fn user_with_roles(&self, email: &str, roles: &[&str]) -> (Value, String) {
        let user = self.create_user("Test User", email, roles).await;
        let token = self.token(email, PASSWORD).await;
        (user, token)
    }

    /// Create a role through the API as the Super Admin, return the role JSON.
    pub async fn create_role(&self, name: &str, permissions: &[&str]) -> Value {
        let admin = self.admin_token().await;
        let (body, status) = self
            .post_auth(
                "/api/roles",
                &admin,
                &json!({ "name": name, "permissions": permissions }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create role failed: {body}");
        body["data"].clone()
    }

    pub async fn role_id(&self, name: &str) -> String {
        let id: Uuid = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .expect("role lookup failed");
        id.to_string()
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        read(resp).await
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        read(resp).await
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        read(resp).await
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        read(resp).await
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        read(resp).await
    }

    /// Upload raw bytes as the multipart `avatar` field.
    pub async fn upload_avatar(&self, token: &str, filename: &str, bytes: &[u8]) -> (Value, StatusCode) {
        let boundary = "----dashboard-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"avatar\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let resp = self
            .client
            .post(self.url("/api/avatar/upload"))
            .bearer_auth(token)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .expect("upload request failed");
        read(resp).await
    }
}

fn database_url() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").ok()
}

fn with_database(url: &str, db_name: &str) -> String {
    url.rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| url.to_string())
}

/// Spawn a test app with a fresh temporary database.
///
/// Returns `None` (and the calling test passes vacuously) when `DATABASE_URL` is unset.
pub async fn spawn_app() -> Option<TestApp> {
    let Some(base_url) = database_url() else {
        eprintln!("DATABASE_URL not set, skipping database-backed test");
        return None;
    };

    // Create a unique test database
    let db_name = format!(
        "dashboard_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&with_database(&base_url, "postgres"))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = with_database(&base_url, &db_name);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let storage_dir = std::env::temp_dir().join(&db_name);

    let config = Config {
        database_url: test_url,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:8000".to_string(),
        frontend_url: "http://localhost:9000".to_string(),
        storage_dir: storage_dir.clone(),
        token_ttl_minutes: None,
        max_body_size: 4 * 1024 * 1024,
        cors_origins: vec![],
        log_level: "warn".to_string(),
        smtp: None,
        admin: Some(AdminSeed {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Super Admin".to_string(),
        }),
    };
    let admin = config.admin.clone();

    let (app, state) = admin_dashboard::build_app(pool.clone(), config);

    seed::run(&pool, &state.permissions, admin.as_ref())
        .await
        .expect("Failed to seed test database");

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    Some(TestApp {
        addr,
        pool,
        client,
        db_name,
        state,
        storage_dir,
    })
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;
    let _ = tokio::fs::remove_dir_all(&app.storage_dir).await;

    let Some(base_url) = database_url() else {
        return;
    };

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&with_database(&base_url, "postgres"))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
