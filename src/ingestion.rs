//! Bundle ingestion: unpack an uploaded ZIP of documents into the free pool.

use std::io::{Cursor, Read};

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::ident;
use crate::object_store::ObjectStore;
use crate::storage::models::PoolFile;
use crate::AppState;

/// Document extensions accepted from a bundle; anything else is skipped.
pub const DOCUMENT_EXTENSIONS: [&str; 4] = ["pdf", "txt", "doc", "docx"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Bundle is not a readable ZIP archive: {0}")]
    BadArchive(#[from] zip::result::ZipError),
    #[error("Store error: {0}")]
    Store(#[from] crate::storage::DatabaseError),
}

#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub ingested: u64,
    pub skipped: u64,
}

/// The lowercased extension of an accepted document name, if any.
fn accepted_extension(name: &str) -> Option<String> {
    let ext = std::path::Path::new(name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    DOCUMENT_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Unpack a bundle into the pool. Every accepted entry gets a fresh alias,
/// its payload stored under `{alias}.{ext}`, and a PoolFile record; records
/// for the whole bundle are inserted in one transaction at the end.
/// Per-entry failures are logged and skipped, never fatal to the bundle.
/// An unopenable archive is an error with nothing written.
pub async fn ingest_bundle(state: &AppState, bundle: Bytes) -> Result<IngestReport, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bundle))?;

    let mut records: Vec<PoolFile> = Vec::new();
    let mut skipped = 0u64;

    for index in 0..archive.len() {
        let extracted = {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping unreadable bundle entry");
                    skipped += 1;
                    continue;
                }
            };

            if entry.is_dir() {
                skipped += 1;
                continue;
            }

            let entry_name = entry.name().to_string();
            let Some(ext) = accepted_extension(&entry_name) else {
                tracing::debug!(entry = %entry_name, "skipping non-document bundle entry");
                skipped += 1;
                continue;
            };

            let original_name = std::path::Path::new(&entry_name)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or(entry_name.clone());

            let mut payload = Vec::with_capacity(entry.size() as usize);
            if let Err(e) = entry.read_to_end(&mut payload) {
                tracing::warn!(entry = %entry_name, error = %e, "skipping bundle entry that failed to extract");
                skipped += 1;
                continue;
            }

            (original_name, ext, payload)
        };

        let (original_name, ext, payload) = extracted;
        let alias = ident::file_alias();
        let storage_key = format!("{alias}.{ext}");
        let byte_size = payload.len() as u64;

        if let Err(e) = state
            .pool_store
            .put(&storage_key, Bytes::from(payload))
            .await
        {
            tracing::warn!(entry = %original_name, error = %e, "skipping bundle entry that failed to store");
            skipped += 1;
            continue;
        }

        let mime_type = mime_guess::from_path(&original_name)
            .first_or_octet_stream()
            .to_string();

        records.push(PoolFile {
            original_name,
            alias,
            storage_key,
            backup_key: None,
            mime_type,
            byte_size,
            distributed: false,
            distributed_to: None,
            distributed_at: None,
            created_at: Utc::now(),
        });
    }

    let ingested = match state.db.insert_pool_files(&records) {
        Ok(count) => count,
        Err(e) => {
            // Best-effort cleanup of blobs whose records never landed.
            for record in &records {
                let _ = state.pool_store.delete(&record.storage_key).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(ingested, skipped, "bundle processed");
    Ok(IngestReport { ingested, skipped })
}
