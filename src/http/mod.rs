//! HTTP surface
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/` | Liveness message |
//! | GET | `/logs` | Dataset names |
//! | GET | `/log_props/{name}` | Default properties of a dataset |
//! | POST | `/encode_event_log` | Streamed ZIP of the three splits |
//!
//! Errors are returned as `{"detail": "..."}`.

use crate::encoding::EncodingRequest;
use crate::error::{LogprepError, LogprepResult};
use crate::service::EncodeService;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

type AppState = Arc<EncodeService>;

/// Error response carrying a [`LogprepError`]
#[derive(Debug)]
pub struct ApiError(pub LogprepError);

impl From<LogprepError> for ApiError {
    fn from(err: LogprepError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error
pub fn status_code(err: &LogprepError) -> StatusCode {
    match err {
        LogprepError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LogprepError::DatasetNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(&self.0);
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

/// `Content-Disposition` for a download, with an RFC 5987 fallback for
/// names that are not plain ASCII
fn content_disposition(file_name: &str) -> HeaderValue {
    let plain = file_name
        .chars()
        .all(|c| c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\'));
    let value = if plain {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        let encoded: String = file_name
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{:02X}", b),
            })
            .collect();
        format!("attachment; filename*=utf-8''{}", encoded)
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Application started" }))
}

async fn list_logs(State(service): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let logs = service.list_datasets().await?;
    Ok(Json(json!({ "logs": logs })))
}

async fn log_properties(
    State(service): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let properties = service.dataset_properties(&name).await?;
    Ok(Json(json!({
        "event_log_name": name,
        "properties": properties,
    })))
}

async fn encode_event_log(
    State(service): State<AppState>,
    payload: Result<Json<EncodingRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| LogprepError::invalid(e.body_text()))?;
    info!("Encode request for {}", request.dataset_name);

    let archive = service.encode(request).await?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
        (header::CONTENT_DISPOSITION, content_disposition(&archive.file_name)),
    ];
    Ok((headers, Body::from_stream(archive.body)).into_response())
}

/// Build the router over `service`
pub fn router(service: Arc<EncodeService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/logs", get(list_logs))
        .route("/logs/", get(list_logs))
        .route("/log_props/:name", get(log_properties))
        .route("/log_props/:name/", get(log_properties))
        .route("/encode_event_log", post(encode_event_log))
        .route("/encode_event_log/", post(encode_event_log))
        .with_state(service)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    service: Arc<EncodeService>,
    shutdown: F,
) -> LogprepResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| LogprepError::io("serving HTTP", e))
}

/// Bind `addr` and serve until SIGINT or SIGTERM
pub async fn serve(service: Arc<EncodeService>, addr: &str) -> LogprepResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| LogprepError::io(format!("binding {}", addr), e))?;
    let local = listener
        .local_addr()
        .map_err(|e| LogprepError::io("reading listener address", e))?;
    info!("Listening on http://{}", local);

    serve_with_shutdown(listener, service, shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::read_zip;
    use crate::builder::fake::FakeBuilder;
    use crate::config::Config;
    use std::net::SocketAddr;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    struct TestServer {
        _root: TempDir,
        addr: SocketAddr,
        stop: Option<oneshot::Sender<()>>,
    }

    impl TestServer {
        async fn start() -> Self {
            let root = TempDir::new().unwrap();
            let dir = root.path().join("Sepsis");
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join("Sepsis.csv"), "CaseID,Activity\n").unwrap();
            std::fs::write(
                dir.join("default_props.json"),
                r#"{"case_name": "CaseID", "concept_name": "Activity", "timestamp_name": "Timestamp"}"#,
            )
            .unwrap();

            let mut config = Config::default();
            config.storage.data_dir = root.path().to_path_buf();
            config.general.audit_log = false;
            let service = Arc::new(EncodeService::with_builder(&config, Arc::new(FakeBuilder::new())));

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (tx, rx) = oneshot::channel();
            tokio::spawn(serve_with_shutdown(listener, service, async move {
                let _ = rx.await;
            }));

            Self {
                _root: root,
                addr,
                stop: Some(tx),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(tx) = self.stop.take() {
                let _ = tx.send(());
            }
        }
    }

    fn agent() -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into()
    }

    /// (status, content type, body) of a blocking request
    async fn fetch(url: String, body: Option<&'static str>) -> (u16, String, Vec<u8>) {
        tokio::task::spawn_blocking(move || {
            let agent = agent();
            let mut resp = match body {
                Some(body) => agent
                    .post(&url)
                    .header("content-type", "application/json")
                    .send(body)
                    .unwrap(),
                None => agent.get(&url).call().unwrap(),
            };
            let content_type = resp
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let bytes = resp.body_mut().read_to_vec().unwrap();
            (resp.status().as_u16(), content_type, bytes)
        })
        .await
        .unwrap()
    }

    fn json_body(bytes: &[u8]) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn root_and_logs() {
        let server = TestServer::start().await;

        let (status, _, body) = fetch(server.url("/"), None).await;
        assert_eq!(status, 200);
        assert_eq!(json_body(&body)["message"], "Application started");

        let (status, _, body) = fetch(server.url("/logs/"), None).await;
        assert_eq!(status, 200);
        assert_eq!(json_body(&body)["logs"], json!(["Sepsis"]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn log_props_found_and_missing() {
        let server = TestServer::start().await;

        let (status, _, body) = fetch(server.url("/log_props/Sepsis"), None).await;
        assert_eq!(status, 200);
        let body = json_body(&body);
        assert_eq!(body["event_log_name"], "Sepsis");
        assert_eq!(body["properties"]["case_name"], "CaseID");
        assert_eq!(body["properties"]["window_size"], "auto");

        let (status, _, body) = fetch(server.url("/log_props/Helpdesk"), None).await;
        assert_eq!(status, 404);
        assert!(json_body(&body)["detail"].as_str().unwrap().contains("Helpdesk"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn encode_streams_zip() {
        let server = TestServer::start().await;
        let request = r#"{"event_log_name": "Sepsis", "event_log_properties": {"min_suffix_size": 5}}"#;

        let (status, content_type, body) = fetch(server.url("/encode_event_log"), Some(request)).await;

        assert_eq!(status, 200);
        assert_eq!(content_type, "application/zip");
        let names: Vec<String> = read_zip(&body).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Sepsis_5_train.pkl", "Sepsis_5_val.pkl", "Sepsis_5_test.pkl"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn encode_rejects_bad_requests() {
        let server = TestServer::start().await;

        let fractions = r#"{"event_log_name": "Sepsis", "event_log_properties": {"train_validation_size": 0.6, "test_validation_size": 0.6}}"#;
        let (status, content_type, body) = fetch(server.url("/encode_event_log/"), Some(fractions)).await;
        assert_eq!(status, 422);
        assert_eq!(content_type, "application/json");
        assert!(json_body(&body)["detail"].is_string());

        let (status, _, _) = fetch(server.url("/encode_event_log"), Some("{not json")).await;
        assert_eq!(status, 422);

        let unknown = r#"{"event_log_name": "Helpdesk"}"#;
        let (status, _, _) = fetch(server.url("/encode_event_log"), Some(unknown)).await;
        assert_eq!(status, 404);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_code(&LogprepError::invalid("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_code(&LogprepError::build_failed("Sepsis", "boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn disposition_quotes_plain_names() {
        assert_eq!(
            content_disposition("Sepsis.zip"),
            "attachment; filename=\"Sepsis.zip\""
        );
        assert_eq!(
            content_disposition("Café.zip"),
            "attachment; filename*=utf-8''Caf%C3%A9.zip"
        );
    }
}
