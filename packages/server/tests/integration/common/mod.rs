use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::Role;
use common::document::{Document, DocumentStore, MemoryDocumentStore};
use common::storage::filesystem::FilesystemBlobStore;
use reqwest::Client;
use reqwest::redirect::Policy;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};
use tempfile::TempDir;

use server::activity::ActivityDispatcher;
use server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, DocumentsConfig, MqAppConfig,
    ServerConfig, StorageConfig,
};
use server::entity::user;
use server::state::AppState;

pub const PASSWORD: &str = "correct-horse";
pub const MAX_IMAGE_SIZE: u64 = 64 * 1024;
pub const BOOTSTRAP_ADMIN: &str = "root@rollcall.test";

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const LOGOUT: &str = "/api/v1/auth/logout";
    pub const ME: &str = "/api/v1/auth/me";
    pub const EVENTS: &str = "/api/v1/events";
    pub const MY_RSVPS: &str = "/api/v1/me/rsvps";
    pub const USERS: &str = "/api/v1/admin/users";
    pub const LOGS: &str = "/api/v1/admin/logs";
    pub const AUDIT: &str = "/api/v1/admin/audit";
    pub const SUMMARIES: &str = "/api/v1/admin/summaries";

    pub fn event(id: i32) -> String {
        format!("/api/v1/events/{id}")
    }

    pub fn event_image(id: i32) -> String {
        format!("/api/v1/events/{id}/image")
    }

    pub fn rsvp(event_id: i32) -> String {
        format!("/api/v1/events/{event_id}/rsvp")
    }

    pub fn attendees(event_id: i32) -> String {
        format!("/api/v1/events/{event_id}/rsvps")
    }

    pub fn feedback(event_id: i32) -> String {
        format!("/api/v1/events/{event_id}/feedback")
    }

    pub fn user_role(id: i32) -> String {
        format!("/api/v1/admin/users/{id}/role")
    }

    pub fn user(id: i32) -> String {
        format!("/api/v1/admin/users/{id}")
    }

    pub fn summary(date: &str) -> String {
        format!("/api/v1/admin/summaries/{date}")
    }
}

/// A running test server backed by a throwaway SQLite file.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub documents: Arc<dyn DocumentStore>,
    dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub headers: reqwest::header::HeaderMap,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("rollcall.db").display());

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 5,
                min_connections: 1,
                sqlx_logging: false,
            },
            documents: DocumentsConfig::default(),
            storage: StorageConfig {
                path: dir.path().join("images"),
                max_image_size: MAX_IMAGE_SIZE,
                ..Default::default()
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_hours: 1,
                cookie_secure: false,
                bootstrap_admin_email: Some(BOOTSTRAP_ADMIN.to_string()),
            },
            mq: MqAppConfig::default(),
        };

        let db = server::database::init_db(&app_config.database)
            .await
            .expect("Failed to initialize test database");
        server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let blobs = FilesystemBlobStore::new(
            app_config.storage.path.clone(),
            app_config.storage.max_image_size,
        )
        .await
        .expect("Failed to open image storage");

        let state = AppState {
            db: db.clone(),
            config: app_config,
            documents: documents.clone(),
            blobs: Arc::new(blobs),
            activity: ActivityDispatcher::inline(documents.clone()),
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::builder().redirect(Policy::none()).build().unwrap(),
            db,
            documents,
            dir,
        }
    }

    /// Make every later image write fail by putting a file where the
    /// blob store's scratch directory should be.
    pub fn break_image_storage(&self) {
        let scratch = self.dir.path().join("images").join(".tmp");
        std::fs::remove_dir_all(&scratch).expect("Failed to remove scratch dir");
        std::fs::write(&scratch, b"").expect("Failed to block scratch dir");
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// A cookie-keeping browser-like client that does not follow redirects.
    pub fn browser(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap()
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_image(
        &self,
        event_id: i32,
        file_name: &str,
        bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);

        let res = self
            .client
            .put(self.url(&routes::event_image(event_id)))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Register an account through the API and return its id.
    pub async fn register(&self, first_name: &str, email: &str) -> i32 {
        let res = self
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "first_name": first_name,
                    "last_name": "Tester",
                    "email": email,
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "Registration failed: {}", res.text);
        res.id()
    }

    pub async fn login(&self, email: &str) -> String {
        let res = self
            .post_without_token(routes::LOGIN, &json!({"email": email, "password": PASSWORD}))
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);
        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Register a member and log in, returning the auth token.
    pub async fn create_member(&self, first_name: &str, email: &str) -> String {
        self.register(first_name, email).await;
        self.login(email).await
    }

    /// Register an account, set its role directly in the database, then log in.
    pub async fn create_user_with_role(&self, first_name: &str, email: &str, role: Role) -> String {
        self.register(first_name, email).await;
        self.set_role(email, role).await;
        self.login(email).await
    }

    pub async fn set_role(&self, email: &str, role: Role) {
        let db_user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");

        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(role);
        user::Entity::update(active)
            .exec(&self.db)
            .await
            .expect("Failed to update user role");
    }

    /// Create an event through the API and return its `id`.
    pub async fn create_event(&self, token: &str, title: &str, start_in_hours: i64) -> i32 {
        let start = chrono::Utc::now() + chrono::Duration::hours(start_in_hours);
        let end = start + chrono::Duration::hours(2);
        let res = self
            .post_with_token(
                routes::EVENTS,
                &json!({
                    "title": title,
                    "description": "Bring a friend.",
                    "location": "Main Hall",
                    "start_time": start.to_rfc3339(),
                    "end_time": end.to_rfc3339(),
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_event failed: {}", res.text);
        res.id()
    }

    pub async fn rsvp(&self, event_id: i32, going: bool, token: &str) -> TestResponse {
        self.post_with_token(&routes::rsvp(event_id), &json!({"going": going}), token)
            .await
    }

    /// Activity is recorded off the request path; poll until a matching document shows up.
    pub async fn wait_for_document<F>(&self, collection: &str, mut matches: F) -> Document
    where
        F: FnMut(&Document) -> bool,
    {
        for _ in 0..100 {
            let docs = self.documents.all(collection).await.expect("document query failed");
            if let Some(doc) = docs.into_iter().find(|d| matches(d)) {
                return doc;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("No matching document appeared in '{collection}'");
    }

    /// Poll until `event_stats/{event_id}` reports `going`.
    pub async fn wait_for_going_count(&self, event_id: i32, going: i64) -> Document {
        let id = event_id.to_string();
        self.wait_for_document(common::document::collections::EVENT_STATS, |doc| {
            doc.id == id && doc.data["going_count"] == going
        })
        .await
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
            text,
            body,
            headers,
        }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
