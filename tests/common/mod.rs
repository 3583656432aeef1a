use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use roster::config::{ChainPolicy, Config, ImportOptions};
use roster::store::MemoryDirectory;

pub const HEADER: &str = "Name,Email,Manager,Salary,Hire Date\n";

/// A running test server backed by its own in-memory directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Upload CSV rows (header prepended) as a raw text body.
    pub async fn upload(&self, rows: &str) -> (Value, StatusCode) {
        self.upload_raw(&format!("{HEADER}{rows}")).await
    }

    /// Upload a complete CSV document as a raw text body.
    pub async fn upload_raw(&self, csv: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/users/upload"))
            .header("content-type", "text/csv")
            .body(csv.to_string())
            .send()
            .await
            .expect("upload request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Upload CSV rows as a multipart `file` field.
    pub async fn upload_multipart(&self, rows: &str) -> (Value, StatusCode) {
        let part = reqwest::multipart::Part::text(format!("{HEADER}{rows}"))
            .file_name("employees.csv")
            .mime_str("text/csv")
            .expect("valid mime type");
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url("/api/v1/users/upload"))
            .multipart(form)
            .send()
            .await
            .expect("multipart upload failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Find a user in the listing by normalized email.
    pub async fn user_by_email(&self, email: &str) -> Value {
        let (users, status) = self.get("/api/v1/users").await;
        assert_eq!(status, StatusCode::OK, "list users failed: {users}");
        users
            .as_array()
            .expect("user list is an array")
            .iter()
            .find(|u| u["normalized_email"] == email)
            .cloned()
            .unwrap_or_else(|| panic!("no user with email {email}"))
    }

    /// Stored chain of command for a user, as a list of id strings.
    pub async fn chain_of(&self, email: &str) -> Vec<String> {
        let user = self.user_by_email(email).await;
        let id = user["id"].as_str().expect("user id");
        let (chain, status) = self.get(&format!("/api/v1/users/{id}/chain-of-command")).await;
        assert_eq!(status, StatusCode::OK, "chain lookup failed: {chain}");
        chain["managers"]
            .as_array()
            .expect("managers array")
            .iter()
            .map(|m| m.as_str().expect("manager id").to_string())
            .collect()
    }
}

pub fn test_config(max_body_size: usize) -> Config {
    Config {
        database_url: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size,
        log_level: "warn".to_string(),
        import: ImportOptions {
            initial_password: "password".to_string(),
            chain_policy: ChainPolicy::All,
        },
    }
}

/// Spawn a test app with a fresh in-memory directory.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(1_048_576)).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let app = roster::build_app(Arc::new(MemoryDirectory::new()), config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
    }
}
