// Statement Ingest - Web Server
// Upload a bank statement over multipart, store its transactions, query them back

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use statement_ingest::{
    get_account_stats, get_all_transactions, get_transactions_by_account, init_tracing, AccountStat,
    Config, ImportService, ImportSummary, IngestError, SqliteStore, StorageError,
    StoredTransaction, UploadPolicy, UploadRejection,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: ImportService,
    store: Arc<Mutex<SqliteStore>>,
    upload: UploadPolicy,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(_) => ApiError::Unprocessable(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        warn!(error = %err, "storage failure");
        ApiError::Internal(err.to_string())
    }
}

impl From<UploadRejection> for ApiError {
    fn from(err: UploadRejection) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

type ApiResult<T> = Result<T, ApiError>;

impl AppState {
    fn lock_store(&self) -> ApiResult<std::sync::MutexGuard<'_, SqliteStore>> {
        self.store
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    banks: Vec<String>,
}

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        version: statement_ingest::VERSION,
        banks: state
            .service
            .ingestor()
            .registry()
            .banks()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    bank: String,
    received: usize,
    inserted: usize,
}

impl From<ImportSummary> for UploadResponse {
    fn from(summary: ImportSummary) -> Self {
        Self {
            filename: summary.file_name,
            bank: summary.bank,
            received: summary.received,
            inserted: summary.inserted,
        }
    }
}

/// POST /api/v1/upload - multipart form with `bank` and `file`
async fn upload_statement(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut bank: Option<String> = None;
    let mut file: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("bank") => bank = Some(field.text().await?.trim().to_string()),
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let bank = bank
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing field: bank".to_string()))?;
    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("Missing field: file".to_string()))?;

    state.upload.check(file_name.as_deref(), bytes.len())?;
    // Metadata comes from the file name, so keep it but drop any directory part
    let file_name = file_name
        .as_deref()
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(UploadRejection::MissingFileName)?;

    info!(bank = %bank, file = %file_name, size = bytes.len(), "upload received");

    let summary = tokio::task::spawn_blocking(move || -> ApiResult<ImportSummary> {
        let dir = tempfile::tempdir().map_err(|e| ApiError::Internal(e.to_string()))?;
        let path = dir.path().join(&file_name);
        std::fs::write(&path, &bytes).map_err(|e| ApiError::Internal(e.to_string()))?;

        // Parse before locking; only the write needs the database
        let records = state.service.ingestor().ingest(&bank, &path)?;
        let mut store = state.lock_store()?;
        Ok(state.service.store(&bank, &file_name, &records, &mut *store)?)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(summary.into()))
}

#[derive(Deserialize)]
struct TransactionsQuery {
    account_id: Option<String>,
}

/// GET /api/v1/transactions[?account_id=] - stored transactions in row order
async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<Vec<StoredTransaction>>> {
    let store = state.lock_store()?;
    let transactions = match query.account_id.as_deref() {
        Some(account) => get_transactions_by_account(store.conn(), account)?,
        None => get_all_transactions(store.conn())?,
    };
    Ok(Json(transactions))
}

/// GET /api/v1/accounts - per-account totals
async fn list_accounts(State(state): State<AppState>) -> ApiResult<Json<Vec<AccountStat>>> {
    let store = state.lock_store()?;
    Ok(Json(get_account_stats(store.conn())?))
}

// ============================================================================
// Main Server
// ============================================================================

fn router(state: AppState) -> Router {
    // Multipart framing adds a little on top of the file itself
    let body_limit = state.upload.max_bytes + 64 * 1024;

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/upload", post(upload_statement))
        .route("/v1/transactions", get(list_transactions))
        .route("/v1/accounts", get(list_accounts))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    info!(path = %config.db_path.display(), "database opened");

    let state = AppState {
        service: ImportService::default(),
        store: Arc::new(Mutex::new(store)),
        upload: config.upload.clone(),
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;

    info!(addr = %config.listen_addr, "🚀 server running");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const REVOLUT_HEADER: &str =
        "Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State,Balance";

    fn test_state() -> AppState {
        AppState {
            service: ImportService::default(),
            store: Arc::new(Mutex::new(SqliteStore::open_in_memory().unwrap())),
            upload: UploadPolicy::default(),
        }
    }

    fn upload_request(bank: &str, file_name: &str, content: &str) -> Request<Body> {
        let boundary = "----statementboundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"bank\"\r\n\r\n\
             {bank}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/v1/upload")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn revolut_csv() -> String {
        format!(
            "{REVOLUT_HEADER}\n\
             TOPUP,Current,2024-03-01 08:00:00,2024-03-01 08:00:01,Top-up,50.00,0.00,EUR,COMPLETED,50.00\n\
             CARD_PAYMENT,Current,2024-03-02 12:30:00,2024-03-03 09:00:00,Cafe,-2.20,0.00,EUR,COMPLETED,47.80\n"
        )
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(test_state()).oneshot(get_request("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "OK");
        assert_eq!(json["banks"], serde_json::json!(["BPI", "CGD", "Revolut"]));
    }

    #[tokio::test]
    async fn test_upload_then_query() {
        let state = test_state();
        let file_name = "Revolut_LT001234_20240331.csv";

        let first = router(state.clone())
            .oneshot(upload_request("Revolut", file_name, &revolut_csv()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let json = json_body(first).await;
        assert_eq!(json["filename"], file_name);
        assert_eq!(json["received"], 2);
        assert_eq!(json["inserted"], 2);

        // Same statement again: nothing new
        let second = router(state.clone())
            .oneshot(upload_request("Revolut", file_name, &revolut_csv()))
            .await
            .unwrap();
        assert_eq!(json_body(second).await["inserted"], 0);

        let listed = router(state.clone())
            .oneshot(get_request("/api/v1/transactions?account_id=LT001234"))
            .await
            .unwrap();
        let json = json_body(listed).await;
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["description"], "Top-up");
        assert_eq!(json[1]["entity_code"], "revolut");

        let accounts = router(state)
            .oneshot(get_request("/api/v1/accounts"))
            .await
            .unwrap();
        assert_eq!(json_body(accounts).await[0]["transaction_count"], 2);
    }

    #[tokio::test]
    async fn test_unknown_bank_is_bad_request() {
        let response = router(test_state())
            .oneshot(upload_request("XYZ", "XYZ_1_20240101.csv", &revolut_csv()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["code"], 400);
        assert_eq!(json["message"], "No handler available for bank: XYZ");
    }

    #[tokio::test]
    async fn test_empty_statement_is_unprocessable() {
        let response = router(test_state())
            .oneshot(upload_request("Revolut", "Revolut_LT001234_20240331.csv", REVOLUT_HEADER))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["message"], "validation failed: Empty file");
    }

    #[tokio::test]
    async fn test_disallowed_extension_is_bad_request() {
        let response = router(test_state())
            .oneshot(upload_request("Revolut", "Revolut_LT001234_20240331.pdf", "x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parsing_does_not_wait_for_database_lock() {
        let state = test_state();
        let _held = state.store.lock().unwrap();

        let response = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            router(state.clone()).oneshot(upload_request(
                "Revolut",
                "Revolut_LT001234_20240331.csv",
                REVOLUT_HEADER,
            )),
        )
        .await
        .expect("upload blocked on the database lock")
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
