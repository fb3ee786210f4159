//! The distribution engine: pairs pending subscribers with free files,
//! performs handoffs through the transport, records every outcome, and
//! re-delivers from backup on request.

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::models::{PoolFile, Subscriber};
use crate::storage::{DatabaseError, HandoffCommit};
use crate::transport::Transport;
use crate::AppState;

/// Result of a batch distribution run.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// No pending subscribers or no free files; nothing was written.
    Idle,
    /// Fewer free files than pending subscribers; nothing was written.
    Shortage { pending: usize, free: usize },
    /// Every pending subscriber was paired and a handoff attempted.
    Completed {
        sent: usize,
        failed: Vec<FailedHandoff>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FailedHandoff {
    pub principal: i64,
    pub error: String,
}

/// Result of a single handoff. Failures are already recorded in the
/// delivery log by the time this is returned.
#[derive(Debug, PartialEq)]
pub enum HandoffOutcome {
    Delivered,
    Failed { error: String },
}

/// Result of a recovery request.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Delivered { attempt: u32 },
    NoSubscription,
    NoPriorDelivery,
    PayloadMissing,
    TransmissionFailed { error: String },
    StoreFailed { error: String },
}

/// Pair the pending queue against the free pool positionally and hand off
/// each pair in order. All-or-nothing guard: a shortage of free files makes
/// no writes at all. Within a run, one failed handoff never blocks the
/// remaining pairs.
pub async fn distribute_pending(state: &AppState) -> Result<BatchOutcome, DatabaseError> {
    let pending = state.db.pending_subscribers()?;
    let free = state.db.free_files()?;

    if pending.is_empty() || free.is_empty() {
        tracing::info!(
            pending = pending.len(),
            free = free.len(),
            "distribution: nothing to do"
        );
        return Ok(BatchOutcome::Idle);
    }

    if free.len() < pending.len() {
        tracing::warn!(
            pending = pending.len(),
            free = free.len(),
            "distribution: not enough free files"
        );
        return Ok(BatchOutcome::Shortage {
            pending: pending.len(),
            free: free.len(),
        });
    }

    let mut sent = 0;
    let mut failed = Vec::new();

    for ((_, sub), (file_seq, file)) in pending.iter().zip(free.iter()) {
        match send_file_to_subscriber(state, sub, *file_seq, file).await {
            HandoffOutcome::Delivered => sent += 1,
            HandoffOutcome::Failed { error } => failed.push(FailedHandoff {
                principal: sub.principal,
                error,
            }),
        }
    }

    tracing::info!(sent, failed = failed.len(), "distribution batch finished");
    Ok(BatchOutcome::Completed { sent, failed })
}

/// Hand one file to one subscriber: best-effort backup, bounded transmit
/// under the anonymous filename, then a single commit covering the file
/// latch, the delivery record, and the subscriber counters. Never
/// propagates an error past its boundary.
pub async fn send_file_to_subscriber(
    state: &AppState,
    sub: &Subscriber,
    file_seq: u64,
    file: &PoolFile,
) -> HandoffOutcome {
    let payload = match state.pool_store.get(&file.storage_key).await {
        Ok(payload) => payload,
        Err(e) => {
            let error = format!("payload unavailable: {e}");
            tracing::error!(principal = sub.principal, file = %file.alias, %error, "handoff aborted");
            record_failure(state, sub.principal, file_seq, &error);
            return HandoffOutcome::Failed { error };
        }
    };

    let ext = storage_extension(&file.storage_key);

    // Backup copy keyed by the subscriber's alias. Best-effort: a failure
    // here is logged and the handoff continues without a backup key.
    let backup_key = format!("{}_backup{ext}", sub.alias);
    let backup_key = match state.backup_store.put(&backup_key, payload.clone()).await {
        Ok(()) => Some(backup_key),
        Err(e) => {
            tracing::warn!(principal = sub.principal, error = %e, "backup copy failed");
            None
        }
    };

    let filename = format!("{}{ext}", sub.alias);
    let caption = handoff_caption(sub, file);

    if let Err(error) = transmit(state, sub.principal, payload, &filename, &caption).await {
        tracing::error!(principal = sub.principal, file = %file.alias, %error, "transmission failed");
        record_failure(state, sub.principal, file_seq, &error);
        return HandoffOutcome::Failed { error };
    }

    match state
        .db
        .commit_handoff(file_seq, sub.principal, backup_key.as_deref(), Utc::now())
    {
        Ok(HandoffCommit::Committed) => {
            tracing::info!(principal = sub.principal, file = %file.alias, "file delivered");
            HandoffOutcome::Delivered
        }
        Ok(refused) => {
            let error = match refused {
                HandoffCommit::AlreadyDistributed => "file already claimed by another delivery",
                HandoffCommit::MissingFile => "file record missing at commit",
                HandoffCommit::MissingSubscriber => "subscriber record missing at commit",
                HandoffCommit::Committed => unreachable!(),
            }
            .to_string();
            tracing::error!(principal = sub.principal, file = %file.alias, %error, "handoff commit refused");
            record_failure(state, sub.principal, file_seq, &error);
            HandoffOutcome::Failed { error }
        }
        Err(e) => {
            let error = format!("store failure: {e}");
            tracing::error!(principal = sub.principal, %error, "handoff commit failed");
            HandoffOutcome::Failed { error }
        }
    }
}

/// Re-deliver the most recently delivered file to a subscriber, reading the
/// payload from its backup copy (falling back to the live pool). Appends a
/// `recovered` record; the file's assignment and the subscriber's counters
/// are untouched.
pub async fn recover_latest(state: &AppState, principal: i64) -> RecoveryOutcome {
    let sub = match state.db.get_subscriber(principal) {
        Ok(Some(sub)) if sub.has_access => sub,
        Ok(_) => return RecoveryOutcome::NoSubscription,
        Err(e) => {
            return RecoveryOutcome::StoreFailed {
                error: e.to_string(),
            }
        }
    };

    let latest = match state.db.latest_successful_delivery(principal) {
        Ok(Some(record)) => record,
        Ok(None) => return RecoveryOutcome::NoPriorDelivery,
        Err(e) => {
            return RecoveryOutcome::StoreFailed {
                error: e.to_string(),
            }
        }
    };

    let file = match state.db.get_pool_file(latest.file_seq) {
        Ok(Some(file)) => file,
        Ok(None) => return RecoveryOutcome::PayloadMissing,
        Err(e) => {
            return RecoveryOutcome::StoreFailed {
                error: e.to_string(),
            }
        }
    };

    let payload = match load_for_recovery(state, &file).await {
        Some(payload) => payload,
        None => {
            tracing::error!(principal, file = %file.alias, "no payload found for recovery");
            return RecoveryOutcome::PayloadMissing;
        }
    };

    let ext = storage_extension(&file.storage_key);
    let filename = format!("{}{ext}", sub.alias);
    let caption = recovery_caption(&sub, &file);

    if let Err(error) = transmit(state, principal, payload, &filename, &caption).await {
        tracing::error!(principal, file = %file.alias, %error, "recovery transmission failed");
        return RecoveryOutcome::TransmissionFailed { error };
    }

    match state.db.commit_recovery(principal, latest.file_seq, Utc::now()) {
        Ok(attempt) => {
            tracing::info!(principal, file = %file.alias, attempt, "file recovered");
            RecoveryOutcome::Delivered { attempt }
        }
        Err(e) => RecoveryOutcome::StoreFailed {
            error: e.to_string(),
        },
    }
}

/// One bounded transmission. A timeout counts as a transmission failure.
async fn transmit(
    state: &AppState,
    principal: i64,
    payload: Bytes,
    filename: &str,
    caption: &str,
) -> Result<(), String> {
    let timeout = Duration::from_secs(state.config.transport.send_timeout_secs);
    let send = state
        .transport
        .send_document(principal, payload, filename, caption);

    match tokio::time::timeout(timeout, send).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "transmission timed out after {}s",
            timeout.as_secs()
        )),
    }
}

async fn load_for_recovery(state: &AppState, file: &PoolFile) -> Option<Bytes> {
    if let Some(ref backup_key) = file.backup_key {
        match state.backup_store.get(backup_key).await {
            Ok(payload) => return Some(payload),
            Err(ObjectStoreError::NotFound(_)) => {
                tracing::warn!(file = %file.alias, "backup copy missing, trying live pool");
            }
            Err(e) => {
                tracing::warn!(file = %file.alias, error = %e, "backup read failed, trying live pool");
            }
        }
    }
    state.pool_store.get(&file.storage_key).await.ok()
}

fn record_failure(state: &AppState, principal: i64, file_seq: u64, error: &str) {
    if let Err(e) = state
        .db
        .record_failed_handoff(principal, file_seq, error, Utc::now())
    {
        tracing::error!(principal, error = %e, "could not record failed handoff");
    }
}

fn storage_extension(key: &str) -> String {
    std::path::Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

fn handoff_caption(sub: &Subscriber, file: &PoolFile) -> String {
    format!(
        "Your unique file.\n\n\
         ID: {}\n\
         Original name: {}\n\n\
         Keep it somewhere safe. If it is ever lost, request recovery and it will be re-sent.",
        sub.alias, file.original_name
    )
}

fn recovery_caption(sub: &Subscriber, file: &PoolFile) -> String {
    format!(
        "Recovered copy of your file.\n\n\
         ID: {}\n\
         Original name: {}",
        sub.alias, file.original_name
    )
}

#[cfg(test)]
mod tests {
    use super::storage_extension;

    #[test]
    fn storage_extension_keeps_the_dot() {
        assert_eq!(storage_extension("abcd1234.pdf"), ".pdf");
        assert_eq!(storage_extension("abcd1234"), "");
    }
}
