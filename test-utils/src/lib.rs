/// Test utilities for integration tests
/// Runs an in-process fake of the detection service on a random local port
use anyhow::{Context, Result};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_PASSWORD: &str = "secret";
pub const TEST_EMAIL: &str = "kim@example.com";
pub const TAKEN_EMAIL: &str = "taken@example.com";
pub const NEWS_API_KEY: &str = "news-key";

/// One multipart field as the fake service received it
#[derive(Debug, Clone)]
pub struct RecordedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
    /// Body as text for non-file fields
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub fields: Vec<RecordedField>,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&RecordedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Canned behaviour of a [`FakeBackend`]
#[derive(Debug, Clone)]
pub struct BackendConfig {
    faces: Value,
    records: Value,
    delay: Option<Duration>,
    fail_statistics: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            faces: json!([
                {"face_id": 1, "is_deepfake": false, "rate": 0.1, "ResultUrl": "/media/results/1.png"},
                {"face_id": 2, "is_deepfake": false, "rate": 0.2, "ResultUrl": "/media/results/2.png"}
            ]),
            records: default_records(),
            delay: None,
            fail_statistics: false,
        }
    }
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-face results returned by the detection endpoints
    pub fn with_faces(mut self, faces: Value) -> Self {
        self.faces = faces;
        self
    }

    pub fn with_records(mut self, records: Value) -> Self {
        self.records = records;
        self
    }

    /// Delay every detection response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the statistics endpoint answer 500
    pub fn failing_statistics(mut self) -> Self {
        self.fail_statistics = true;
        self
    }

    /// Bind to 127.0.0.1 on a free port and serve in the background
    pub async fn start(self) -> Result<FakeBackend> {
        let shared = Arc::new(Shared {
            config: self,
            requests: Mutex::new(Vec::new()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind fake backend")?;
        let addr = listener
            .local_addr()
            .context("Failed to read fake backend address")?;

        let app = router(shared.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Fake backend stopped: {}", e);
            }
        });

        tracing::debug!("Fake backend listening on {}", addr);

        Ok(FakeBackend {
            base_url: format!("http://{}", addr),
            shared,
            handle,
        })
    }
}

struct Shared {
    config: BackendConfig,
    requests: Mutex<Vec<RecordedRequest>>,
}

type AppState = Arc<Shared>;

/// A running fake service; stops when dropped
pub struct FakeBackend {
    pub base_url: String,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Result<Self> {
        BackendConfig::default().start().await
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Most recent request to `path`
    pub fn last_request(&self, path: &str) -> Option<RecordedRequest> {
        self.requests().into_iter().rev().find(|r| r.path == path)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/login/", post(login_handler))
        .route("/api/users/register/", post(register_handler))
        .route("/api/users/profile/", get(profile_handler))
        .route("/api/users/profile/image/", post(profile_image_upload_handler))
        .route("/api/users/profile/image/get/", get(profile_image_handler))
        .route("/api/detection/image/", post(detect_image_handler))
        .route("/api/detection/video/", post(detect_video_handler))
        .route("/api/detection/records/", get(records_handler))
        .route("/api/detection/records/:id/", get(record_handler))
        .route("/api/detection/statistics/", get(statistics_handler))
        .route("/api/protection/images/", post(protect_handler))
        .route("/everything", get(news_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn test_user() -> Value {
    json!({
        "user_id": 7,
        "email": TEST_EMAIL,
        "nickname": "kim",
        "created_at": "2025-09-01T09:00:00+09:00"
    })
}

fn default_records() -> Value {
    json!([
        {
            "record_id": 1,
            "analysis_result": "safe",
            "confidence_score": 91.5,
            "analysis_type": "image",
            "file_format": "jpg",
            "created_at": "2025-09-13T23:30:00+00:00",
            "detection_details": [{"face_id": 1, "is_deepfake": false, "rate": 0.085}]
        },
        {
            "record_id": 2,
            "analysis_result": "deepfake",
            "confidence_score": 88.0,
            "analysis_type": "video",
            "file_format": "mp4",
            "created_at": "2025-09-14T08:15:00+09:00",
            "detection_details": [{"person_id": 1, "is_deepfake": true, "rate": 0.88}]
        },
        {
            "record_id": 3,
            "analysis_result": "suspicious",
            "confidence_score": 55.0,
            "analysis_type": "image",
            "created_at": "2025-09-12T10:00:00+00:00"
        }
    ])
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn check_token(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Token {}", TEST_TOKEN);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Invalid token."}),
        )),
    }
}

fn record(state: &AppState, uri: &Uri, headers: &HeaderMap, fields: Vec<RecordedField>) {
    let request = RecordedRequest {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        fields,
    };
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(request);
    }
}

async fn read_fields(mut multipart: Multipart) -> Result<Vec<RecordedField>, Response> {
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        error(StatusCode::BAD_REQUEST, json!({"error": e.to_string()}))
    };

    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(bad_request)?;
        let text = match file_name {
            Some(_) => None,
            None => Some(String::from_utf8_lossy(&bytes).into_owned()),
        };

        fields.push(RecordedField {
            name,
            file_name,
            content_type,
            len: bytes.len(),
            text,
        });
    }
    Ok(fields)
}

async fn login_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, &uri, &headers, Vec::new());

    if body["password"] != TEST_PASSWORD {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["Invalid email or password."]}),
        );
    }

    let mut user = test_user();
    user["email"] = body["email"].clone();
    Json(json!({"token": TEST_TOKEN, "user": user})).into_response()
}

async fn register_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, &uri, &headers, Vec::new());

    if body["email"] == TAKEN_EMAIL {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"email": ["user with this email already exists."]}),
        );
    }

    let mut user = test_user();
    user["email"] = body["email"].clone();
    user["nickname"] = body["nickname"].clone();
    (
        StatusCode::CREATED,
        Json(json!({"token": TEST_TOKEN, "user": user})),
    )
        .into_response()
}

async fn profile_handler(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    record(&state, &uri, &headers, Vec::new());
    if let Err(response) = check_token(&headers) {
        return response;
    }

    let mut user = test_user();
    user["nickname"] = json!("kim-updated");
    Json(user).into_response()
}

async fn profile_image_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, &uri, &headers, Vec::new());
    if let Err(response) = check_token(&headers) {
        return response;
    }

    Json(json!({"profile_image": null, "profile_image_url": null})).into_response()
}

async fn profile_image_upload_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let fields = match read_fields(multipart).await {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    record(&state, &uri, &headers, fields);
    if let Err(response) = check_token(&headers) {
        return response;
    }

    Json(json!({
        "profile_image": "/media/profiles/7.png",
        "profile_image_url": "http://testserver/media/profiles/7.png"
    }))
    .into_response()
}

async fn detect(
    state: AppState,
    uri: Uri,
    headers: HeaderMap,
    multipart: Multipart,
    record_id: u64,
) -> Response {
    let fields = match read_fields(multipart).await {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    record(&state, &uri, &headers, fields);
    if let Err(response) = check_token(&headers) {
        return response;
    }

    if let Some(delay) = state.config.delay {
        tokio::time::sleep(delay).await;
    }

    let faces = state.config.faces.clone();
    let face_count = faces.as_array().map(|f| f.len()).unwrap_or(0);
    Json(json!({
        "record_id": record_id,
        "face_count": face_count,
        "face_quality_scores": faces,
        "processing_time": 1.25
    }))
    .into_response()
}

async fn detect_image_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    detect(state, uri, headers, multipart, 42).await
}

async fn detect_video_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    detect(state, uri, headers, multipart, 43).await
}

async fn records_handler(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    record(&state, &uri, &headers, Vec::new());
    if let Err(response) = check_token(&headers) {
        return response;
    }

    let results = state.config.records.clone();
    let count = results.as_array().map(|r| r.len()).unwrap_or(0);
    Json(json!({
        "count": count,
        "next": null,
        "previous": null,
        "results": results
    }))
    .into_response()
}

async fn record_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, &uri, &headers, Vec::new());
    if let Err(response) = check_token(&headers) {
        return response;
    }

    let found = state
        .config
        .records
        .as_array()
        .and_then(|records| records.iter().find(|r| r["record_id"] == id))
        .cloned();

    match found {
        Some(found) => Json(found).into_response(),
        None => error(StatusCode::NOT_FOUND, json!({"error": "Record not found"})),
    }
}

async fn statistics_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, &uri, &headers, Vec::new());
    if let Err(response) = check_token(&headers) {
        return response;
    }

    if state.config.fail_statistics {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "statistics unavailable"}),
        );
    }

    Json(json!({
        "total_analyses": 10,
        "safe_count": 6,
        "suspicious_count": 1,
        "deepfake_count": 3,
        "recent_analyses": []
    }))
    .into_response()
}

async fn protect_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let fields = match read_fields(multipart).await {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    record(&state, &uri, &headers, fields.clone());
    if let Err(response) = check_token(&headers) {
        return response;
    }

    let job_type = fields
        .iter()
        .find(|f| f.name == "job_type")
        .and_then(|f| f.text.clone())
        .unwrap_or_default();

    let versions: Vec<&str> = match job_type.as_str() {
        "watermark" => vec!["Watermark"],
        "adversarial_noise" => vec!["Noise"],
        "both" => vec!["Noise", "Watermark"],
        _ => {
            return error(
                StatusCode::BAD_REQUEST,
                json!({"job_type": ["Not a valid choice."]}),
            )
        }
    };

    let files: Vec<Value> = versions
        .iter()
        .map(|v| {
            let name = v.to_lowercase();
            json!({
                "request_version": v,
                "ResultUrl": format!("http://testserver/media/protected/{}.png", name),
                "file_name": format!("{}.png", name)
            })
        })
        .collect();

    Json(json!({"job_id": 7, "status": "completed", "protected_files": files})).into_response()
}

async fn news_handler(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    record(&state, &uri, &headers, Vec::new());

    let authorized = uri
        .query()
        .map(|q| q.split('&').any(|pair| pair == format!("apiKey={}", NEWS_API_KEY)))
        .unwrap_or(false);
    if !authorized {
        return error(
            StatusCode::UNAUTHORIZED,
            json!({"status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid."}),
        );
    }

    Json(json!({
        "status": "ok",
        "totalResults": 25,
        "articles": [
            {
                "source": {"id": null, "name": "Daily"},
                "title": "Deepfake crackdown",
                "url": "https://news.example.com/1",
                "urlToImage": null,
                "publishedAt": "2025-09-13T01:00:00Z"
            }
        ]
    }))
    .into_response()
}
