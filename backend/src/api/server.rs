//! HTTP Server for the specsplit API.
//!
//! The upload endpoint replaces the file picker of an interactive session:
//! post a specification file, get both tables back.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/convert`    | Upload a specification CSV           |
//! | POST   | `/api/labels`     | Derive labels from descriptions      |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, ConvertResponse, LabelsResponse};
use crate::error::{ServerError, ServerResult};
use crate::transform::labels::labels_from_json;
use crate::transform::pipeline::{convert_bytes, ConvertOptions};

type ApiError = (StatusCode, Json<Value>);

/// Build the application router
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/convert", post(upload_spec))
        .route("/api/labels", post(labels))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    eprintln!("🚀 specsplit server running on http://localhost:{}", port);
    eprintln!("   POST /api/convert - Upload specification CSV");
    eprintln!("   POST /api/labels  - Derive labels");
    eprintln!("   GET  /api/logs    - SSE log stream");
    eprintln!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "specsplit",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "convert": "POST /api/convert",
            "labels": "POST /api/labels",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: multipart form with a `file` field
async fn upload_spec(mut multipart: Multipart) -> Result<Json<ConvertResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request("No file provided".to_string()))?;

    log_info(format!(
        "📄 New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    convert_upload(&bytes, file_name).map(Json).map_err(|e| {
        log_error(format!("Conversion failed: {}", e));
        api_error(e)
    })
}

/// Run the pipeline on an uploaded file.
pub fn convert_upload(bytes: &[u8], file_name: Option<String>) -> ServerResult<ConvertResponse> {
    let result = convert_bytes(bytes, &ConvertOptions::default())?;
    ConvertResponse::new(result, file_name)
        .map_err(|e| ServerError::Internal(e.to_string()))
}

/// Label endpoint: JSON array of descriptions
async fn labels(Json(body): Json<Value>) -> Result<Json<LabelsResponse>, ApiError> {
    let labels = labels_from_json(&body).map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(LabelsResponse { labels }))
}

fn bad_request(message: String) -> ApiError {
    api_error(ServerError::BadRequest(message))
}

fn api_error(err: ServerError) -> ApiError {
    (status_for(&err), Json(error_response(&err.to_string())))
}

/// HTTP status for a server error
pub fn status_for(err: &ServerError) -> StatusCode {
    match err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(e) if e.is_input_error() => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
