//! HTTP surface: health, status, and the two upload endpoints.
//!
//! Upload handlers only read the attachment bytes and queue a background
//! job, so the caller gets its answer before any parsing starts.

use anyhow::{Context, Result};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use log::{error, info, warn};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::delivery::{ReportSink, WebhookSink};
use crate::processing::{UploadJob, process_upload};
use crate::signature::SignatureVerifier;
use crate::stats::StatsHandle;

pub const SERVICE_NAME: &str = "Income Statement Processing Service";

pub struct AppState {
    pub config: RelayConfig,
    pub verifier: SignatureVerifier,
    pub sink: Arc<dyn ReportSink>,
    pub stats: StatsHandle,
}

impl AppState {
    pub fn new(config: RelayConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            verifier: SignatureVerifier::new(&config.mailgun_secret),
            config,
            sink,
            stats: StatsHandle::new(),
        }
    }

    /// Hand an upload to the background and return its job description.
    fn enqueue(&self, filename: String, bytes: Vec<u8>) -> Value {
        let size_bytes = bytes.len();
        let job = UploadJob::new(filename, bytes);
        let reply = json!({
            "status": "success",
            "message": "Income statement CSV received and queued for processing",
            "filename": job.filename,
            "size_bytes": size_bytes,
            "batch_id": job.batch_id,
            "timestamp": Utc::now().to_rfc3339(),
        });
        tokio::spawn(process_upload(self.sink.clone(), self.stats.clone(), job));
        reply
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        error!("Error reading upload form: {e}");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(health))
        .route("/status", get(status))
        .route("/webhook/mailgun", post(mailgun_webhook))
        .route("/ingest-income-statement", post(ingest_upload))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

pub async fn serve(config: RelayConfig) -> Result<()> {
    config.report_gaps();
    let sink = WebhookSink::new(
        &config.webhook_url,
        &config.webhook_token,
        Duration::from_secs(config.delivery_timeout_secs),
    )?;
    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(config, Arc::new(sink)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("Starting {SERVICE_NAME} on {addr}");
    axum::serve(listener, router(state))
        .await
        .context("server exited")?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "build": env!("PNL_RELAY_BUILD_SHA"),
        "status": "running",
        "config": {
            "webhook_configured": state.config.webhook_configured(),
            "webhook_token_configured": state.config.webhook_token_configured(),
            "mailgun_secret_configured": state.config.mailgun_secret_configured(),
        },
        "stats": state.stats.snapshot(),
    }))
}

/// Income statement exports arrive as e.g. `Income_Statement_2025.csv`.
pub fn is_income_statement_attachment(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.ends_with(".csv") && (lower.contains("income") || lower.contains("statement"))
}

#[derive(Debug, Default)]
struct InboundEmail {
    token: String,
    timestamp: String,
    signature: String,
    attachment: Option<(String, Vec<u8>)>,
}

async fn read_inbound_email(mut multipart: Multipart) -> Result<InboundEmail, ApiError> {
    let mut email = InboundEmail::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "token" => email.token = field.text().await?,
            "timestamp" => email.timestamp = field.text().await?,
            "signature" => email.signature = field.text().await?,
            n if n.starts_with("attachment-") && email.attachment.is_none() => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                if is_income_statement_attachment(&filename) {
                    let bytes = field.bytes().await?;
                    info!("Found CSV attachment: {filename} ({} bytes)", bytes.len());
                    email.attachment = Some((filename, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }
    Ok(email)
}

async fn mailgun_webhook(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    info!("Received webhook from Mailgun");
    let email = read_inbound_email(multipart).await?;

    let check = state
        .verifier
        .verify(&email.token, &email.timestamp, &email.signature);
    if !check.accepted() {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid signature"));
    }

    let Some((filename, bytes)) = email.attachment else {
        warn!("No income statement CSV found in attachments");
        return Ok(Json(json!({
            "status": "success",
            "message": "No income statement CSV found in email",
        })));
    };

    let reply = state.enqueue(filename, bytes);
    info!("Queued {} for background processing", reply["batch_id"]);
    Ok(Json(reply))
}

async fn ingest_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    info!("Received direct CSV upload");
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field.bytes().await?;
        info!("Received file: {filename} ({} bytes)", bytes.len());
        return Ok(Json(state.enqueue(filename, bytes.to_vec())));
    }
    Err(ApiError::new(StatusCode::BAD_REQUEST, "No file provided"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use futures_util::future::BoxFuture;
    use hmac::{Hmac, Mac};
    use pnl_core::RelayPayload;
    use sha2::Sha256;
    use tower::ServiceExt;

    struct NullSink;

    impl ReportSink for NullSink {
        fn deliver<'a>(&'a self, _payload: &'a RelayPayload) -> BoxFuture<'a, Result<u16>> {
            Box::pin(async { Err::<u16, _>(anyhow::anyhow!("not wired")) })
        }
    }

    fn state(config: RelayConfig) -> Arc<AppState> {
        Arc::new(AppState::new(config, Arc::new(NullSink)))
    }

    #[test]
    fn test_attachment_filter() {
        assert!(is_income_statement_attachment("Income Statement - 2025.csv"));
        assert!(is_income_statement_attachment("STATEMENT.CSV"));
        assert!(!is_income_statement_attachment("balance_sheet.csv"));
        assert!(!is_income_statement_attachment("income_statement.xlsx"));
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
    }

    #[tokio::test]
    async fn test_status_reports_config_and_stats() {
        let config = RelayConfig {
            webhook_url: "https://hooks.example.com/in".to_string(),
            ..RelayConfig::default()
        };
        let st = state(config);
        st.stats.record_failure("Failed to send to webhook");

        let Json(body) = status(State(st)).await;
        assert_eq!(body["status"], "running");
        assert!(body["build"].as_str().is_some_and(|b| !b.is_empty()));
        assert_eq!(body["config"]["webhook_configured"], true);
        assert_eq!(body["config"]["webhook_token_configured"], false);
        assert_eq!(body["config"]["mailgun_secret_configured"], false);
        assert_eq!(body["stats"]["total_processed"], 0);
        assert_eq!(body["stats"]["last_error"], "Failed to send to webhook");
    }

    #[tokio::test]
    async fn test_enqueue_reply_shape() {
        let st = state(RelayConfig::default());
        let reply = st.enqueue("income.csv".to_string(), b"Account\n".to_vec());
        assert_eq!(reply["status"], "success");
        assert_eq!(reply["filename"], "income.csv");
        assert_eq!(reply["size_bytes"], 8);
        assert_eq!(reply["batch_id"].as_str().map(str::len), Some(15));
    }

    const BOUNDARY: &str = "relay-test-boundary";
    const SECRET: &str = "key-test-signing";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                            .as_bytes(),
                    );
                }
                Part::File(name, filename, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: text/csv\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn sign(timestamp: &str, token: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}{token}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_app() -> Router {
        router(state(RelayConfig {
            mailgun_secret: SECRET.to_string(),
            ..RelayConfig::default()
        }))
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const CSV: &[u8] = b"Account,Jan 2025\nNet Income,10\n";

    #[tokio::test]
    async fn test_mailgun_bad_signature_is_unauthorized() {
        let sig = sign("1700000000", "tok");
        let req = multipart_request(
            "/webhook/mailgun",
            &[
                Part::Text("token", "tok"),
                Part::Text("timestamp", "1700000001"),
                Part::Text("signature", &sig),
                Part::File("attachment-1", "income.csv", CSV),
            ],
        );
        let (status, body) = call(signed_app(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "detail": "Invalid signature" }));
    }

    #[tokio::test]
    async fn test_mailgun_takes_first_matching_attachment() {
        let sig = sign("1700000000", "tok");
        let req = multipart_request(
            "/webhook/mailgun",
            &[
                Part::Text("token", "tok"),
                Part::Text("timestamp", "1700000000"),
                Part::Text("signature", &sig),
                Part::File("attachment-1", "balance_sheet.csv", b"Account\n"),
                Part::File("attachment-2", "Income Statement.csv", CSV),
                Part::File("attachment-3", "statement_copy.csv", b"Account\n"),
            ],
        );
        let (status, body) = call(signed_app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["filename"], "Income Statement.csv");
        assert_eq!(body["size_bytes"], CSV.len());
        assert!(body["batch_id"].is_string());
    }

    #[tokio::test]
    async fn test_mailgun_without_matching_attachment() {
        let sig = sign("1700000000", "tok");
        let req = multipart_request(
            "/webhook/mailgun",
            &[
                Part::Text("token", "tok"),
                Part::Text("timestamp", "1700000000"),
                Part::Text("signature", &sig),
                Part::File("attachment-1", "income.xlsx", b"PK"),
                Part::Text("subject", "Monthly statement"),
            ],
        );
        let (status, body) = call(signed_app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "success",
                "message": "No income statement CSV found in email",
            })
        );
    }

    #[tokio::test]
    async fn test_mailgun_unsigned_accepted_without_secret() {
        let app = router(state(RelayConfig::default()));
        let req = multipart_request(
            "/webhook/mailgun",
            &[Part::File("attachment-1", "income.csv", CSV)],
        );
        let (status, body) = call(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "income.csv");
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let req = multipart_request(
            "/ingest-income-statement",
            &[Part::File("document", "income.csv", CSV)],
        );
        let (status, body) = call(signed_app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "detail": "No file provided" }));
    }

    #[tokio::test]
    async fn test_upload_queues_file() {
        let req = multipart_request(
            "/ingest-income-statement",
            &[Part::File("file", "march.csv", CSV)],
        );
        let (status, body) = call(signed_app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            "Income statement CSV received and queued for processing"
        );
        assert_eq!(body["filename"], "march.csv");
        assert_eq!(body["size_bytes"], CSV.len());
    }

    #[tokio::test]
    async fn test_health_route() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = call(signed_app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[test]
    fn test_api_error_response_status() {
        let resp = ApiError::new(StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
