// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use mergequest::config::Config;
use mergequest::db::{Database, FirestoreDb, MemoryDb};
use mergequest::routes::create_router;
use mergequest::AppState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app on the in-process store with the given config.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (Router, Arc<AppState>) {
    let db = Database::Memory(MemoryDb::new());
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Test config pointing at a fake GitHub.
#[allow(dead_code)]
pub fn config_for(github: &FakeGitHub) -> Config {
    Config {
        github_oauth_url: format!("{}/login/oauth", github.base_url),
        github_api_url: github.base_url.clone(),
        ..Config::test_default()
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values of a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Canned reply for one fake endpoint.
#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: Value,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Default)]
struct Recorded {
    token_requests: Vec<HashMap<String, String>>,
    api_authorizations: Vec<String>,
}

struct FakeState {
    token: Mutex<Reply>,
    user: Mutex<Reply>,
    emails: Mutex<Reply>,
    recorded: Mutex<Recorded>,
}

/// GitHub OAuth + REST stand-in served on an ephemeral local port.
///
/// Defaults to the "alice" account: token `tok1`, profile id 42 and a
/// single primary email `a@x.com`.
#[derive(Clone)]
#[allow(dead_code)]
pub struct FakeGitHub {
    pub base_url: String,
    state: Arc<FakeState>,
}

#[allow(dead_code)]
impl FakeGitHub {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState {
            token: Mutex::new(Reply::ok(
                json!({"access_token": "tok1", "token_type": "bearer", "scope": "user:email"}),
            )),
            user: Mutex::new(Reply::ok(
                json!({"id": 42, "login": "alice", "avatar_url": "http://x/a.png"}),
            )),
            emails: Mutex::new(Reply::ok(
                json!([{"email": "a@x.com", "primary": true, "verified": true}]),
            )),
            recorded: Mutex::new(Recorded::default()),
        });

        let app = Router::new()
            .route("/login/oauth/access_token", post(access_token))
            .route("/user", get(user))
            .route("/user/emails", get(emails))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn set_token_response(&self, status: StatusCode, body: Value) {
        *self.state.token.lock().unwrap() = Reply { status, body };
    }

    pub fn set_user(&self, body: Value) {
        *self.state.user.lock().unwrap() = Reply::ok(body);
    }

    pub fn set_user_status(&self, status: StatusCode) {
        *self.state.user.lock().unwrap() = Reply {
            status,
            body: json!({"message": "Server Error"}),
        };
    }

    pub fn set_emails(&self, body: Value) {
        *self.state.emails.lock().unwrap() = Reply::ok(body);
    }

    /// Form bodies received by the token endpoint.
    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.recorded.lock().unwrap().token_requests.clone()
    }

    /// `Authorization` headers received by the REST endpoints.
    pub fn api_authorizations(&self) -> Vec<String> {
        self.state.recorded.lock().unwrap().api_authorizations.clone()
    }
}

async fn access_token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Reply {
    state.recorded.lock().unwrap().token_requests.push(form);
    state.token.lock().unwrap().clone()
}

fn record_authorization(state: &FakeState, headers: &HeaderMap) {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.recorded.lock().unwrap().api_authorizations.push(value);
}

async fn user(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Reply {
    record_authorization(&state, &headers);
    state.user.lock().unwrap().clone()
}

async fn emails(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Reply {
    record_authorization(&state, &headers);
    state.emails.lock().unwrap().clone()
}
