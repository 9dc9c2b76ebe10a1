//! Integration tests for Stockroom.
//!
//! # Running Tests
//!
//! ```bash
//! # HTTP tests (in-memory store, no external services)
//! cargo test -p stockroom-integration-tests
//!
//! # PostgreSQL tests
//! STOCKROOM_TEST_DATABASE_URL=postgres://... \
//!     cargo test -p stockroom-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `products` - Catalog endpoints
//! - `transactions` - Stock ledger endpoints
//! - `auth` - Registration and login
//! - `users` - Account management and guards
//! - `postgres_ledger` - Row locking against a real database
//!
//! Every HTTP test gets its own server on an ephemeral port via
//! [`TestContext::spawn`], so tests never share data.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::middleware;
use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use stockroom_api::db::MemoryStore;
use stockroom_api::middleware::{request_id_middleware, security_headers_middleware};
use stockroom_api::routes;
use stockroom_api::services::auth::{Passwords, Registration, TokenIssuer};
use stockroom_api::state::{AppState, Stores};

/// Password given to every account created through the helpers.
pub const PASSWORD: &str = "correct-horse-42";

const JWT_SECRET: &str = "integration-tests-signing-key-0123456789";

/// A running API server over a fresh in-memory store.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub state: AppState,
    pub store: MemoryStore,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Serve the API with admin self-registration disabled.
    pub async fn spawn() -> Self {
        Self::spawn_with(false).await
    }

    /// Serve the API, choosing whether anonymous callers may register admins.
    pub async fn spawn_with(allow_admin_signup: bool) -> Self {
        let store = MemoryStore::new();
        let tokens = TokenIssuer::new(
            &SecretString::from(JWT_SECRET.to_owned()),
            Duration::from_secs(3600),
        )
        .expect("token issuer");
        let passwords = Passwords::with_cost(1024, 1).expect("password hasher");
        let state = AppState::new(
            Stores::in_memory(store.clone()),
            tokens,
            passwords,
            allow_admin_signup,
        );

        let app = routes::routes()
            .with_state(state.clone())
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn(request_id_middleware));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("server error");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            state,
            store,
            server,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /auth/register` with a valid body for `username`.
    pub async fn register(&self, username: &str, role: Option<&str>) -> Response {
        let mut body = json!({
            "username": username,
            "password": PASSWORD,
            "email": format!("{username}@example.com"),
            "phone": "5550100199",
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        self.client
            .post(self.url("/auth/register"))
            .json(&body)
            .send()
            .await
            .expect("register request")
    }

    /// `POST /auth/login`, returning the raw response.
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request")
    }

    /// Register a regular user and return `(user id, bearer token)`.
    pub async fn user(&self, username: &str) -> (i64, String) {
        let resp = self.register(username, None).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        self.token_for(username).await
    }

    /// Create an admin directly through the auth service and log in over HTTP.
    pub async fn admin(&self, username: &str) -> (i64, String) {
        self.state
            .auth()
            .register(Registration {
                username: username.to_owned(),
                password: PASSWORD.to_owned(),
                email: format!("{username}@example.com"),
                phone: "5550100199".to_owned(),
                role: Some("admin".to_owned()),
            })
            .await
            .expect("admin registration");
        self.token_for(username).await
    }

    async fn token_for(&self, username: &str) -> (i64, String) {
        let resp = self.login(username, PASSWORD).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("login body");
        let id = body["user"]["id"].as_i64().expect("user id");
        let token = body["token"].as_str().expect("token").to_owned();
        (id, token)
    }

    /// Create a product and return its JSON.
    pub async fn product(&self, token: &str, sku: &str, price: &str, quantity: i32) -> Value {
        let resp = self
            .client
            .post(self.url("/products"))
            .bearer_auth(token)
            .json(&json!({
                "name": format!("Product {sku}"),
                "sku": sku,
                "price": price,
                "quantity": quantity,
            }))
            .send()
            .await
            .expect("create product request");
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.expect("product body")
    }

    /// `POST /transactions` for `product_id`, returning the raw response.
    pub async fn adjust(
        &self,
        token: &str,
        product_id: i64,
        transaction_type: &str,
        quantity: i64,
    ) -> Response {
        self.client
            .post(self.url("/transactions"))
            .bearer_auth(token)
            .json(&json!({
                "product_id": product_id,
                "quantity": quantity,
                "transaction_type": transaction_type,
            }))
            .send()
            .await
            .expect("adjust request")
    }

    /// `GET path` with a bearer token, returning status and JSON body.
    pub async fn get_json(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request");
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// The `error` kind of an error response body.
#[must_use]
pub fn error_kind(body: &Value) -> &str {
    body["error"].as_str().unwrap_or_default()
}
