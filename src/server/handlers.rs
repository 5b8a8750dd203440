//! Request handlers and error rendering

use crate::downloader::locator::ResolvedArtifact;
use crate::extractor::models::{AcquisitionRequest, VideoInfo};
use crate::server::AppState;
use crate::utils::error::{AcquireError, FailureKind};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct FormatsQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
    pub mode: Option<String>,
    pub quality: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    classification: FailureKind,
}

/// JSON error response carrying the failure classification
#[derive(Debug)]
pub struct ApiError(pub AcquireError);

impl From<AcquireError> for ApiError {
    fn from(e: AcquireError) -> Self {
        ApiError(e)
    }
}

pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::InvalidRequest => StatusCode::BAD_REQUEST,
        FailureKind::AuthRequired => StatusCode::FORBIDDEN,
        FailureKind::FormatUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::NetworkError => StatusCode::BAD_GATEWAY,
        FailureKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        FailureKind::EngineCrash
        | FailureKind::Unknown
        | FailureKind::NoArtifactProduced
        | FailureKind::Workspace => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody {
            error: self.0.to_string(),
            classification: kind,
        };
        (status_for(kind), Json(body)).into_response()
    }
}

/// Static service description
pub async fn home_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "online",
        "endpoints": {
            "formats": "/formats?url=VIDEO_URL",
            "download": "/download?url=VIDEO_URL&mode=video|audio&quality=low|standard|high"
        }
    }))
}

/// Metadata and available formats for a URL
pub async fn formats_handler(
    State(state): State<AppState>,
    Query(query): Query<FormatsQuery>,
) -> Result<Json<VideoInfo>, ApiError> {
    let url = query
        .url
        .ok_or_else(|| AcquireError::InvalidRequest("URL parameter missing".to_string()))?;
    let info = state.orchestrator.probe(&url).await?;
    Ok(Json(info))
}

/// Acquire and stream the artifact as an attachment
pub async fn download_handler(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let request = AcquisitionRequest::parse(
        query.url.as_deref(),
        query.mode.as_deref(),
        query.quality.as_deref(),
    )?;

    let acquisition = state
        .orchestrator
        .acquire_with_cancel(&request, state.shutdown.child_token())
        .await?;
    let (artifact, workspace) = acquisition.into_parts();

    let file = tokio::fs::File::open(&artifact.path)
        .await
        .map_err(AcquireError::from)?;

    // The workspace rides along with the body and goes away once the
    // transfer finishes or the client disconnects.
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _workspace = &workspace;
        chunk
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(&artifact))
        .header(header::CONTENT_LENGTH, artifact.size)
        .header(header::CONTENT_DISPOSITION, content_disposition(&artifact.filename))
        .body(Body::from_stream(stream))
        .map_err(|e| {
            error!("Failed to build download response: {}", e);
            AcquireError::Unknown(format!("failed to build response: {}", e))
        })?;
    Ok(response)
}

fn content_type(artifact: &ResolvedArtifact) -> &'static str {
    match artifact.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("opus") | Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form
pub fn content_disposition(filename: &str) -> HeaderValue {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .filter(|c| *c != '"' && *c != '\\')
        .collect();

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii, encoded
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
