//! Common test utilities for E2E tests

#![allow(dead_code)]

use connecthub::{AppState, config};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
                max_connections: 5,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                cookie_name: "session".to_string(),
            },
            discovery: config::DiscoveryConfig::default(),
            connections: config::ConnectionsConfig::default(),
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        adjust(&mut config);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = connecthub::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a signed session token for `user_id`
    pub fn token_for(&self, user_id: &str, first_name: Option<&str>) -> String {
        use connecthub::auth::{Session, create_session_token};

        let mut session = Session::new(user_id, self.state.config.auth.session_max_age);
        session.email = Some(format!("{}@example.com", user_id));
        session.first_name = first_name.map(ToOwned::to_owned);

        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }

    /// Create a signed session token for a default test user
    pub async fn create_test_token(&self) -> String {
        self.token_for("testuser", Some("Test User"))
    }

    /// Sign a user in so their row exists, returning the bearer token
    pub async fn sign_in(&self, user_id: &str, first_name: &str) -> String {
        let token = self.token_for(user_id, Some(first_name));
        let response = self
            .client
            .get(self.url("/api/auth/user"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        token
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Create a catalog interest and return its id
    pub async fn create_interest(&self, token: &str, name: &str) -> String {
        let response = self
            .post(token, "/api/interests", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(response.status(), 200);
        let interest: Value = response.json().await.unwrap();
        interest["id"].as_str().unwrap().to_string()
    }

    /// Create a catalog hobby and return its id
    pub async fn create_hobby(&self, token: &str, name: &str) -> String {
        let response = self
            .post(
                token,
                "/api/hobbies",
                serde_json::json!({ "name": name, "category": "outdoors" }),
            )
            .await;
        assert_eq!(response.status(), 200);
        let hobby: Value = response.json().await.unwrap();
        hobby["id"].as_str().unwrap().to_string()
    }
}

/// Read the `message` field of an error body
pub async fn error_message(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["message"].as_str().unwrap_or_default().to_string()
}
