//! In-process mock of the Corporate AI backend.
//!
//! Accounts: `ada@corp.example` / `secret` gets token `tok-ada`. The token
//! `tok-expired` is rejected everywhere with `401 {"detail":"Token expired"}`.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

pub const EMAIL: &str = "ada@corp.example";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "tok-ada";
pub const EXPIRED_TOKEN: &str = "tok-expired";

/// One multipart field received by the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
    pub text: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    pub uploads: Mutex<Vec<UploadedPart>>,
    pub queries: Mutex<Vec<(String, String)>>,
}

pub struct MockServer {
    pub port: u16,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Mock backend did not become ready within 5 seconds");
}

pub async fn start() -> MockServer {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/admin/categories", get(categories))
        .route("/chat/query", post(query))
        .route("/admin/logs", get(logs))
        .route("/admin/train/start", post(train))
        .route("/admin/knowledge/upload", post(upload))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    wait_for_server(port).await;

    MockServer {
        port,
        state,
        handle,
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn detail(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "detail": text }))).into_response()
}

/// `Err` carries the response for a missing or expired token.
fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    match bearer(headers) {
        Some(TOKEN) => Ok(()),
        Some(EXPIRED_TOKEN) => Err(detail(StatusCode::UNAUTHORIZED, "Token expired")),
        _ => Err(detail(StatusCode::UNAUTHORIZED, "Not authenticated")),
    }
}

async fn login(Form(form): Form<HashMap<String, String>>) -> Response {
    let ok = form.get("username").map(String::as_str) == Some(EMAIL)
        && form.get("password").map(String::as_str) == Some(PASSWORD);
    if ok {
        Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
    } else {
        detail(StatusCode::UNAUTHORIZED, "Incorrect username or password")
    }
}

async fn me(headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    Json(json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": EMAIL,
        "department": "Sales",
        "position": "Manager"
    }))
    .into_response()
}

async fn categories() -> Json<Value> {
    Json(json!([
        { "name": "Sales", "description": "Orders and invoices" },
        { "name": "HR" }
    ]))
}

async fn query(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let text = body["query"].as_str().unwrap_or_default().to_string();
    let category = body["category"].as_str().unwrap_or_default().to_string();
    state
        .queries
        .lock()
        .unwrap()
        .push((text.clone(), category));

    match text.as_str() {
        "hello" => Json(json!({ "message": "Hi! Ask me about sales." })).into_response(),
        "show me Q1 sales" => Json(json!({
            "sql": "SELECT region, total FROM sales WHERE quarter = 1",
            "result": [
                { "region": "North", "total": 100 },
                { "region": "South", "total": null }
            ]
        }))
        .into_response(),
        "salaries" => detail(StatusCode::FORBIDDEN, "Access denied: HR data is restricted"),
        _ => Json(json!({ "sql": "SELECT 1 WHERE false", "result": [] })).into_response(),
    }
}

async fn logs(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let limit: usize = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(50);
    let entries = vec![
        json!({
            "id": 2,
            "timestamp": "2024-03-01T09:31:00",
            "user_email": EMAIL,
            "user_dept": "Sales",
            "user_query": "show me Q1 sales",
            "security_policy": "Row filter: department = 'Sales'",
            "generated_sql": "SELECT region, total FROM sales WHERE quarter = 1",
            "status": "SUCCESS",
            "execution_time_ms": 42.5,
            "full_context": "{\"system_prompt_snapshot\":\"You are a careful SQL analyst.\"}"
        }),
        json!({
            "id": 1,
            "timestamp": "2024-03-01T09:30:00Z",
            "user_email": "bob@corp.example",
            "user_dept": "Engineering",
            "user_query": "salaries",
            "security_policy": "HR tables restricted",
            "generated_sql": "",
            "status": "BLOCKED",
            "execution_time_ms": 3.0,
            "full_context": null
        }),
    ];
    Json(json!({ "data": entries.into_iter().take(limit).collect::<Vec<_>>() }))
}

/// NDJSON training transcript: five valid events, one malformed line and
/// an unterminated final line.
pub fn training_transcript() -> String {
    [
        r#"{"step":0,"status":"FETCHING","message":"Pulling 4 files"}"#,
        r#"{"step":1,"status":"CLEANING","message":"Nettoyage terminé ✓","report_data":[{"scope":"Column","target":"tdsls400.amount","issue":"12% null","severity":"Warning","action":"Dropped"}]}"#,
        "this is not json",
        r#"{"step":2,"status":"CLASSIFYING","message":"Grouped 3 tables","classification_data":[{"group":"Sales","tables":["tdsls400","cisli245"]},{"group":"Inventory","tables":["whinh430"]}]}"#,
        r#"{"step":3,"status":"EMBEDDING","message":"Indexed Sales","completed_vectors":["Sales"]}"#,
        r#"{"step":4,"status":"DONE","message":"Insight ready","report":"Revenue grew 4% in Q1."}"#,
        r#"{"step":5,"status":"DONE","message":"never terminated"#,
    ]
    .join("\n")
}

/// The transcript cut into chunks, two of them inside multi-byte characters.
pub fn training_chunks() -> Vec<Vec<u8>> {
    let text = training_transcript();
    let bytes = text.as_bytes();
    let mut cuts = vec![
        7,
        text.find('é').unwrap() + 1,
        text.find('✓').unwrap() + 2,
        bytes.len() - 10,
    ];
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

async fn train() -> Response {
    let chunks = training_chunks()
        .into_iter()
        .map(|c| Ok::<_, std::io::Error>(bytes::Bytes::from(c)));
    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(futures_util::stream::iter(chunks)))
        .unwrap()
}

async fn upload(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    let mut files = 0;
    let mut category = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap_or_default();

        let text = if file_name.is_none() {
            Some(String::from_utf8_lossy(&data).into_owned())
        } else {
            None
        };
        if name == "files" {
            files += 1;
        }
        if name == "category" {
            category = text.clone();
        }
        state.uploads.lock().unwrap().push(UploadedPart {
            name,
            file_name,
            content_type,
            len: data.len(),
            text,
        });
    }

    match category.as_deref() {
        None | Some("") => detail(StatusCode::BAD_REQUEST, "Category is required"),
        Some("Legal") => detail(StatusCode::BAD_REQUEST, "Unknown category: Legal"),
        Some(category) => Json(json!({
            "message": format!("Uploaded {} file(s) to {}", files, category)
        }))
        .into_response(),
    }
}
