//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use action_archive::{
    AppState, config,
    registry::HttpRegistry,
    service::FixedClock,
    storage::MemoryObjectStore,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, TimeZone, Utc};
use tokio::net::TcpListener;

pub const TEST_BUCKET: &str = "test-actions";
pub const TEST_PUBLIC_HOST: &str = "storage.example";

/// What the fake registry answers with
#[derive(Clone)]
pub enum RegistryReply {
    Actions(serde_json::Value),
    Status(StatusCode, &'static str),
    Malformed(&'static str),
}

#[derive(Clone)]
struct FakeRegistryState {
    reply: Arc<Mutex<RegistryReply>>,
    requested_dates: Arc<Mutex<Vec<String>>>,
}

#[derive(serde::Deserialize)]
struct ActionsQuery {
    date: String,
}

/// Registry stand-in served over HTTP on an ephemeral port
pub struct FakeRegistry {
    pub base_url: String,
    state: FakeRegistryState,
}

impl FakeRegistry {
    pub async fn start(reply: RegistryReply) -> Self {
        let state = FakeRegistryState {
            reply: Arc::new(Mutex::new(reply)),
            requested_dates: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/v1/actions", get(list_actions))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/v1", addr),
            state,
        }
    }

    pub fn set_reply(&self, reply: RegistryReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    /// `date` query values received so far
    pub fn requested_dates(&self) -> Vec<String> {
        self.state.requested_dates.lock().unwrap().clone()
    }
}

async fn list_actions(
    State(state): State<FakeRegistryState>,
    Query(query): Query<ActionsQuery>,
) -> Response {
    state.requested_dates.lock().unwrap().push(query.date);
    let reply = state.reply.lock().unwrap().clone();

    match reply {
        RegistryReply::Actions(body) => Json(body).into_response(),
        RegistryReply::Status(status, body) => (status, body).into_response(),
        RegistryReply::Malformed(body) => {
            ([(axum::http::header::CONTENT_TYPE, "application/json")], body).into_response()
        }
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub store: MemoryObjectStore,
    pub registry: FakeRegistry,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a test server whose clock reads 2023-06-02T10:00:00Z
    pub async fn new(reply: RegistryReply) -> Self {
        Self::with_clock(reply, Utc.with_ymd_and_hms(2023, 6, 2, 10, 0, 0).unwrap()).await
    }

    pub async fn with_clock(reply: RegistryReply, now: DateTime<Utc>) -> Self {
        let registry = FakeRegistry::start(reply).await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            storage: config::StorageConfig {
                bucket: TEST_BUCKET.to_string(),
                endpoint: "http://127.0.0.1:9".to_string(),
                region: "auto".to_string(),
                public_host: TEST_PUBLIC_HOST.to_string(),
                access_key_id: "test-key".to_string(),
                secret_access_key: "test-secret".to_string(),
            },
            registry: config::RegistryConfig {
                base_url: registry.base_url.clone(),
                timeout_seconds: 5,
            },
            report: config::ReportConfig::default(),
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let store = MemoryObjectStore::new(TEST_PUBLIC_HOST, TEST_BUCKET);
        let http_registry = HttpRegistry::new(&config.registry).unwrap();
        let state = AppState::with_components(
            config,
            Arc::new(http_registry),
            Arc::new(store.clone()),
            Arc::new(FixedClock(now)),
        );

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = action_archive::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            store,
            registry,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// PUT the upload route with an optional date
    pub async fn upload(&self, date: Option<&str>) -> reqwest::Response {
        let mut request = self.client.put(self.url("/actions:upload"));
        if let Some(date) = date {
            request = request.query(&[("date", date)]);
        }
        request.send().await.unwrap()
    }
}
