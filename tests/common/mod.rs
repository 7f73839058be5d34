#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::StatusCode as ReqwestStatus;
use serde_json::{json, Value};
use tokio::sync::Notify;
use travel_chat::config::AppConfig;
use travel_chat::services::transport_service::{ChatTransport, HistoryTurn, TransportError};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A request the fake backend received.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
pub struct FakeBackend {
    pub status: StatusCode,
    pub reply: Value,
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl FakeBackend {
    pub fn new(status: StatusCode, reply: Value) -> Self {
        FakeBackend {
            status,
            reply,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

async fn backend_handler(req: HttpRequest, body: web::Json<Value>, backend: web::Data<FakeBackend>) -> HttpResponse {
    backend.seen.lock().unwrap().push(SeenRequest {
        authorization: req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.into_inner(),
    });
    HttpResponse::build(backend.status).json(backend.reply.clone())
}

/// Starts a single-endpoint chat backend on an ephemeral port and returns its URL.
pub fn spawn_backend(backend: FakeBackend) -> String {
    let data = web::Data::new(backend);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/", web::post().to(backend_handler))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}/", addr)
}

pub fn id_token_for(email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": "user-1", "email": email}).to_string());
    format!("{}.{}.signature", header, payload)
}

#[derive(Clone)]
pub struct FakeTokenEndpoint {
    pub accept_code: String,
    pub forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn token_handler(form: web::Form<HashMap<String, String>>, endpoint: web::Data<FakeTokenEndpoint>) -> HttpResponse {
    let form = form.into_inner();
    let accepted = form.get("code") == Some(&endpoint.accept_code);
    endpoint.forms.lock().unwrap().push(form);
    if accepted {
        HttpResponse::Ok().json(json!({
            "access_token": "access-token-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "id_token": id_token_for("ana@example.com"),
        }))
    } else {
        HttpResponse::BadRequest().json(json!({"error": "invalid_grant"}))
    }
}

/// Starts a token endpoint that accepts exactly one authorization code; returns its URL.
pub fn spawn_token_endpoint(endpoint: FakeTokenEndpoint) -> String {
    let data = web::Data::new(endpoint);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/oauth2/token", web::post().to(token_handler))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}/oauth2/token", addr)
}

pub fn test_config(token_url: &str, extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("OIDC_CLIENT_ID".to_string(), "client-123".to_string()),
        ("OIDC_AUTH_URL".to_string(), "https://auth.example/oauth2/authorize".to_string()),
        ("OIDC_TOKEN_URL".to_string(), token_url.to_string()),
        ("OIDC_LOGOUT_URL".to_string(), "https://auth.example/logout".to_string()),
        ("CHAT_API_URL".to_string(), "http://127.0.0.1:1/".to_string()),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Lets a test hold a send in flight until it chooses to release it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// In-process transport that records calls and answers from a script.
#[derive(Default)]
pub struct StubTransport {
    pub calls: AtomicUsize,
    pub tokens: Mutex<Vec<String>>,
    pub fail: bool,
    pub history: Vec<HistoryTurn>,
    pub gate: Option<Gate>,
}

impl StubTransport {
    pub fn replying() -> Self {
        StubTransport::default()
    }

    pub fn failing() -> Self {
        StubTransport {
            fail: true,
            ..StubTransport::default()
        }
    }

    pub fn gated() -> Self {
        StubTransport {
            gate: Some(Gate::default()),
            ..StubTransport::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for StubTransport {
    async fn send_message(&self, access_token: &str, _session_id: &str, message: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(access_token.to_string());
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail {
            Err(TransportError::Status(ReqwestStatus::SERVICE_UNAVAILABLE))
        } else {
            Ok(format!("You asked about **{}**", message))
        }
    }

    async fn fetch_history(&self, _access_token: &str, _session_id: &str, _turns: u32) -> Result<Vec<HistoryTurn>, TransportError> {
        Ok(self.history.clone())
    }
}
