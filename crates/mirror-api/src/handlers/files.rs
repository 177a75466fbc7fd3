//! Signed file route for the local storage backend.
//!
//! Temporary URLs issued by local storage point here and carry `expires` and
//! `signature` query parameters.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use mirror_core::AppError;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SignedFileQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// Serve a stored object when its signature is valid and unexpired.
#[tracing::instrument(skip(state, query), fields(operation = "get_file"))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedFileQuery>,
) -> Result<Response, HttpAppError> {
    #[cfg(feature = "storage-local")]
    {
        let local = state
            .local_files
            .as_ref()
            .ok_or_else(|| AppError::NotFound("File serving is not enabled".to_string()))?;

        let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
            return Err(AppError::Forbidden("Missing URL signature".to_string()).into());
        };
        if !local.verify_signature(&key, expires, signature) {
            return Err(AppError::Forbidden("Invalid or expired URL signature".to_string()).into());
        }

        let data = local.read_key(&key).await?;

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type_for(&key))
            .header(header::CACHE_CONTROL, "private, max-age=3600")
            .body(Body::from(data))
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build response");
                HttpAppError::from(AppError::Internal(e.to_string()))
            })
    }

    #[cfg(not(feature = "storage-local"))]
    {
        let _ = (state, key, query);
        Err(AppError::NotFound("File serving is not enabled".to_string()).into())
    }
}

/// Content type from the key's extension.
fn content_type_for(key: &str) -> &'static str {
    let ext = mirror_storage::keys::key_extension(key)
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".pdf" => "application/pdf",
        ".zip" => "application/zip",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
