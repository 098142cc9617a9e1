use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use memento_core::date::{self, is_valid_date_string, now_timestamp};
use memento_core::{
    AppData, DayRecord, EveningAnswers, Journal, LogFilter, LogView, MorningAnswers, Schema,
    Settings, Status, StorageError,
};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    journal: Arc<Mutex<Journal>>,
    api_key: Option<String>,
}

impl AppState {
    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetSettingsRequest {
    target_date: String,
    passcode: Option<String>,
}

#[derive(Deserialize)]
struct LogQuery {
    #[serde(default)]
    filter: LogFilter,
    q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    imported_records: usize,
    records_replaced: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    Rejected(JsonRejection),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Rejected(rejection) => return rejection.into_response(),
            Self::Internal(err) => {
                log::error!("event=api_error module=server err={err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.into())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_)
            | JsonRejection::JsonSyntaxError(_)
            | JsonRejection::MissingJsonContentType(_) => Self::BadRequest(rejection.body_text()),
            // body limit and read failures keep their own status
            other => Self::Rejected(other),
        }
    }
}

fn check_date(date: &str) -> Result<(), ApiError> {
    if is_valid_date_string(date) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid date '{date}'. Use YYYY-MM-DD"
        )))
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn get_status(State(state): State<AppState>) -> Result<Json<Status>, ApiError> {
    let status = state.journal().status(date::today())?;
    Ok(Json(status))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.journal().settings()?))
}

async fn put_settings(
    State(state): State<AppState>,
    body: Result<Json<SetSettingsRequest>, JsonRejection>,
) -> Result<Json<Settings>, ApiError> {
    let Json(req) = body?;
    let settings = state
        .journal()
        .set_target_date(&req.target_date, req.passcode, date::today())?;
    Ok(Json(settings))
}

async fn list_days(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogView>, ApiError> {
    let view = state.journal().log(query.filter, query.q.as_deref())?;
    Ok(Json(view))
}

async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayRecord>, ApiError> {
    check_date(&date)?;
    Ok(Json(state.journal().day(&date)?))
}

async fn put_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<DayRecord>, ApiError> {
    check_date(&date)?;
    let Json(body) = body?;
    let record = DayRecord::parse(&body).map_err(StorageError::from)?;
    if record.date != date {
        return Err(ApiError::BadRequest(format!(
            "Record date '{}' does not match '{date}'",
            record.date
        )));
    }
    state.journal().save_day(&record)?;
    Ok(Json(record))
}

async fn put_morning(
    State(state): State<AppState>,
    Path(date): Path<String>,
    body: Result<Json<MorningAnswers>, JsonRejection>,
) -> Result<Json<DayRecord>, ApiError> {
    check_date(&date)?;
    let Json(answers) = body?;
    let day = state
        .journal()
        .save_morning(&date, answers, &now_timestamp())?;
    Ok(Json(day))
}

async fn put_evening(
    State(state): State<AppState>,
    Path(date): Path<String>,
    body: Result<Json<EveningAnswers>, JsonRejection>,
) -> Result<Json<DayRecord>, ApiError> {
    check_date(&date)?;
    let Json(answers) = body?;
    let day = state
        .journal()
        .save_evening(&date, answers, &now_timestamp())?;
    Ok(Json(day))
}

async fn export_data(State(state): State<AppState>) -> Result<Json<AppData>, ApiError> {
    Ok(Json(state.journal().export()?))
}

async fn import_data(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let Json(body) = body?;
    let data = AppData::parse(&body).map_err(StorageError::from)?;
    state.journal().import(&data)?;
    Ok(Json(ImportResponse {
        imported_records: data.records.len(),
        records_replaced: !data.records.is_empty(),
    }))
}

async fn clear_data(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.journal().clear_all()?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/days", get(list_days))
        .route("/api/days/{date}", get(get_day).put(put_day))
        .route("/api/days/{date}/morning", put(put_morning))
        .route("/api/days/{date}/evening", put(put_evening))
        .route("/api/export", get(export_data))
        .route("/api/import", post(import_data))
        .route("/api/data", delete(clear_data))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four bytes of `key`, or a mask when they do not split cleanly.
fn key_hint(key: &str) -> String {
    match (key.get(..4), key.get(key.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if key.len() > 8 => format!("{head}...{tail}"),
        _ => "****".to_string(),
    }
}

pub async fn start_server(
    journal: Journal,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        journal: Arc::new(Mutex::new(journal)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            key_hint(key)
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if new_api_key {
        if let Some(ref key) = api_key {
            eprintln!("Generated a new API key. Send it as `Authorization: Bearer {key}`");
        }
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    log::info!("event=server_start module=server bind={bind} port={port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use memento_core::{Backend, MemoryStore};
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            journal: Arc::new(Mutex::new(Journal::open(Backend::Local, MemoryStore::new()).unwrap())),
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    async fn send(app: &Router, request: axum::http::Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn put_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::put(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let (status, json) = send(&app, get_req("/api/settings")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let request = axum::http::Request::get("/api/settings")
            .header("Authorization", "Bearer wrong-key")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let request = axum::http::Request::get("/api/settings")
            .header("Authorization", "Bearer test-key-abc123")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["targetDate"], "");
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);
        let response = app.oneshot(get_req("/api/status")).await.unwrap();
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);
        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/import")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret database path /home/user/memento.db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn status_unconfigured() {
        let app = test_app(None);
        let (status, json) = send(&app, get_req("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("targetDate").is_none());
        assert_eq!(json["morningDone"], false);
        assert_eq!(json["expired"], false);
    }

    #[tokio::test]
    async fn put_settings_validates_date() {
        let app = test_app(None);
        let (status, json) = send(
            &app,
            put_json("/api/settings", &serde_json::json!({ "targetDate": "2024-02-30" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Invalid date"));

        let (status, json) = send(
            &app,
            put_json("/api/settings", &serde_json::json!({ "targetDate": "2999-12-31" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["targetDate"], "2999-12-31");

        let (_, json) = send(&app, get_req("/api/status")).await;
        assert_eq!(json["targetDate"], "2999-12-31");
        assert!(json["remainingDays"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn morning_then_get_day() {
        let app = test_app(None);
        let (status, _) = send(
            &app,
            put_json(
                "/api/days/2024-05-01/morning",
                &serde_json::json!({ "usage": "write", "regret": "no" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, get_req("/api/days/2024-05-01")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["morning"]["answers"]["usage"], "write");
        assert!(json.get("evening").is_none());

        let (_, json) = send(&app, get_req("/api/days?filter=incomplete&q=WRITE")).await;
        assert_eq!(json["records"].as_array().unwrap().len(), 1);
        assert_eq!(json["incomplete"], 1);
    }

    #[tokio::test]
    async fn empty_answer_returns_400() {
        let app = test_app(None);
        let (status, json) = send(
            &app,
            put_json(
                "/api/days/2024-05-01/evening",
                &serde_json::json!({ "mostVital": "", "waste": "x", "tomorrow": "y" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("mostVital"));
    }

    #[tokio::test]
    async fn invalid_path_date_returns_400() {
        let app = test_app(None);
        let (status, _) = send(&app, get_req("/api/days/2023-02-29")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn put_day_date_mismatch_returns_400() {
        let app = test_app(None);
        let (status, _) = send(
            &app,
            put_json("/api/days/2024-05-01", &serde_json::json!({ "date": "2024-05-02" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn import_missing_version_leaves_data() {
        let app = test_app(None);
        send(
            &app,
            put_json("/api/settings", &serde_json::json!({ "targetDate": "2999-12-31" })),
        )
        .await;

        let request = axum::http::Request::post("/api/import")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "settings": { "targetDate": "2998-01-01" },
                    "records": []
                })
                .to_string(),
            ))
            .unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("version"));

        let (_, json) = send(&app, get_req("/api/settings")).await;
        assert_eq!(json["targetDate"], "2999-12-31");
    }

    #[tokio::test]
    async fn export_import_and_clear() {
        let app = test_app(None);
        send(
            &app,
            put_json(
                "/api/days/2024-05-01/morning",
                &serde_json::json!({ "usage": "write", "regret": "no" }),
            ),
        )
        .await;
        let (status, exported) = send(&app, get_req("/api/export")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(exported["version"], "1.0.0");

        let delete_req = axum::http::Request::delete("/api/data")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete_req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        assert_eq!(exported["settings"]["targetDate"], "");
        let request = axum::http::Request::post("/api/import")
            .header("content-type", "application/json")
            .body(Body::from(exported.to_string()))
            .unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["importedRecords"], 1);
        assert_eq!(json["recordsReplaced"], true);

        let (_, json) = send(&app, get_req("/api/days/2024-05-01")).await;
        assert_eq!(json["morning"]["answers"]["usage"], "write");
        let (_, json) = send(&app, get_req("/api/settings")).await;
        assert_eq!(json["targetDate"], "");
    }

    #[tokio::test]
    async fn missing_answer_field_returns_400() {
        let app = test_app(None);
        let (status, json) = send(
            &app,
            put_json(
                "/api/days/2024-05-01/morning",
                &serde_json::json!({ "regret": "no" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("usage"));

        let (_, json) = send(&app, get_req("/api/days/2024-05-01")).await;
        assert!(json.get("morning").is_none());
    }

    #[tokio::test]
    async fn non_string_target_date_returns_400() {
        let app = test_app(None);
        let (status, json) = send(
            &app,
            put_json("/api/settings", &serde_json::json!({ "targetDate": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let app = test_app(None);
        let request = axum::http::Request::post("/api/import")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn key_hint_never_panics() {
        assert_eq!(key_hint("abcd1234efgh5678"), "abcd...5678");
        assert_eq!(key_hint("abc"), "****");
        assert_eq!(key_hint("日本語のキー"), "****");
        assert_eq!(key_hint(""), "****");
    }
}
