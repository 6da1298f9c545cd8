use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use boardnotes::config::{GenerationConfig, ServerConfig};
use boardnotes::images::ImageStore;
use boardnotes::notes::NoteService;
use boardnotes::providers::{CompletionResponse, Message, Provider};
use boardnotes::server::{build_router, AppState};
use boardnotes::storage::SqliteStorage;
use boardnotes::BoardnotesError;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

#[allow(dead_code)]
pub const BOUNDARY: &str = "boardnotes-test-boundary";

#[allow(dead_code)]
pub const GOOD_PASSWORD: &str = "Chalk#Board9";

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("boardnotes.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Provider replying with fixed text, or failing when no reply is set
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedProvider {
    reply: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<usize>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    /// Reply only after `delay`, like a slow model
    pub fn replying_after(reply: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(reply)
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, _messages: &[Message]) -> anyhow::Result<CompletionResponse> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Some(reply) => Ok(CompletionResponse::new(Message::assistant(reply.clone()))),
            None => Err(BoardnotesError::Provider("upstream timed out".to_string()).into()),
        }
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

/// Router over temporary storage; keep the `TempDir` alive for the test
#[allow(dead_code)]
pub fn test_app(provider: Arc<ScriptedProvider>, cooldown_ms: u64) -> (TestClient, TempDir) {
    let dir = TempDir::new().expect("failed to create tempdir");
    let storage = SqliteStorage::new_with_path(dir.path().join("boardnotes.db"))
        .expect("failed to create storage");
    let images = ImageStore::new(dir.path().join("saved"), dir.path().join("uploads"))
        .expect("failed to create image store");
    let generation = GenerationConfig {
        max_images: 3,
        cooldown_ms,
    };
    let service = NoteService::new(provider, storage, images, &generation);
    let router = build_router(AppState::new(service), &ServerConfig::default());
    (TestClient::new(router), dir)
}

/// Buffered response
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// Drives the router like a browser that keeps the session cookie
///
/// Cloning gives a second tab of the same browser.
#[allow(dead_code)]
#[derive(Clone)]
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
        }
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    /// Forget the session, as a fresh browser would
    pub fn clear_cookie(&mut self) {
        self.cookie = None;
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::builder().uri(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn post_form(&mut self, uri: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(body.to_string())).await
    }

    pub async fn signup(&mut self, email: &str, password: &str) -> TestResponse {
        let body = format!("email={}&password={}", encode(email), encode(password));
        self.post_form("/signup", &body).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        let body = format!("email={}&password={}", encode(email), encode(password));
        self.post_form("/login", &body).await
    }

    /// Submit the upload form with `(filename, bytes)` image parts
    pub async fn upload(&mut self, mode: &str, files: &[(&str, &[u8])]) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri("/results")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        self.send(request, Body::from(multipart_body(mode, files)))
            .await
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie.clone());
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().trim();
            let expired = set_cookie.contains("Max-Age=0") || pair.ends_with('=');
            self.cookie = if expired {
                None
            } else {
                Some(pair.to_string())
            };
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

#[allow(dead_code)]
/// Build a `multipart/form-data` body with a `mode` field and image parts
pub fn multipart_body(mode: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"mode\"\r\n\r\n{mode}\r\n",
            b = BOUNDARY,
            mode = mode
        )
        .as_bytes(),
    );
    for (filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{f}\"\r\n\
Content-Type: application/octet-stream\r\n\r\n",
                b = BOUNDARY,
                f = filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

#[allow(dead_code)]
/// Minimal form-urlencoding for the characters the tests use
fn encode(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c.to_string(),
            ' ' => "+".to_string(),
            other => {
                let mut buf = [0u8; 4];
                other
                    .encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect()
}
