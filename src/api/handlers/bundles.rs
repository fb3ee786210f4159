use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;

use super::require_admin;
use crate::api::response::{ApiError, JSend};
use crate::ingestion::{self, IngestError, IngestReport};
use crate::AppState;

/// Ingest an uploaded ZIP bundle of documents into the free pool.
pub async fn upload_bundle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<JSend<IngestReport>>, ApiError> {
    let acting = require_admin(&state, &headers)?;

    let mut bundle = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some("bundle") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        if !filename.to_lowercase().ends_with(".zip") {
            return Err(ApiError::bad_request("bundle must be a ZIP archive"));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read bundle: {e}")))?;
        bundle = Some(data);
    }

    let bundle = bundle.ok_or_else(|| ApiError::bad_request("bundle field is required"))?;

    tracing::info!(acting, bytes = bundle.len(), "bundle upload received");

    match ingestion::ingest_bundle(&state, bundle).await {
        Ok(report) => Ok(JSend::success(report)),
        Err(IngestError::BadArchive(e)) => {
            Err(ApiError::bad_request(format!("Unreadable ZIP archive: {e}")))
        }
        Err(IngestError::Store(e)) => Err(ApiError::internal(e.to_string())),
    }
}
