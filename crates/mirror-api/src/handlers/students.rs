//! Student detail and attachment bundle handlers.

use crate::constants::{ORIGIN_API_KEY_OVERRIDE_HEADER, ORIGIN_BASE_URL_OVERRIDE_HEADER};
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use mirror_core::{AttachmentBundle, OriginOverrides, StudentDetail};
use std::sync::Arc;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn origin_overrides(headers: &HeaderMap) -> OriginOverrides {
    OriginOverrides {
        base_url: header_value(headers, ORIGIN_BASE_URL_OVERRIDE_HEADER),
        api_key: header_value(headers, ORIGIN_API_KEY_OVERRIDE_HEADER),
    }
}

#[tracing::instrument(skip(state, headers), fields(operation = "get_student_detail"))]
pub async fn get_student_detail(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<StudentDetail>, HttpAppError> {
    let detail = state
        .students
        .get_student_detail(&student_id, &origin_overrides(&headers))
        .await?;
    Ok(Json(detail))
}

#[tracing::instrument(skip(state, headers), fields(operation = "bundle_attachments"))]
pub async fn bundle_attachments(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AttachmentBundle>, HttpAppError> {
    let bundle = state
        .students
        .bundle_attachments(&student_id, &origin_overrides(&headers))
        .await?;
    Ok(Json(bundle))
}
