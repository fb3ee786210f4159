use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subscriber, created on first successful link redemption. Never deleted;
/// revoking access clears `has_access` but the record (and its alias) stay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub principal: i64,
    pub display_name: String,
    pub has_access: bool,
    pub subscribed_at: Option<DateTime<Utc>>,
    /// Permanent anonymous identifier. Assigned once, immutable.
    pub alias: String,
    pub files_received: u32,
    /// True while the subscriber is owed a file.
    pub pending_file: bool,
    pub last_file_sent: Option<DateTime<Utc>>,
}

/// A distributable file in the pool. `distributed` is a one-way latch:
/// once set, `distributed_to` is permanent and the file is never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolFile {
    pub original_name: String,
    /// Generated anonymous identifier, unique across the pool.
    pub alias: String,
    /// Key of the live payload in the pool object store.
    pub storage_key: String,
    /// Key of the backup copy, set during handoff (best-effort).
    pub backup_key: Option<String>,
    pub mime_type: String,
    pub byte_size: u64,
    pub distributed: bool,
    pub distributed_to: Option<i64>,
    pub distributed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A single-use activation token. Mutated exactly once (consumed) or never.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionLink {
    pub token: String,
    pub issued_by: i64,
    pub created_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_by: Option<i64>,
    pub consumed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Recovered,
    Failed,
}

impl DeliveryStatus {
    /// Whether the payload reached the subscriber.
    pub fn is_successful(self) -> bool {
        matches!(self, DeliveryStatus::Sent | DeliveryStatus::Recovered)
    }
}

/// One delivery attempt. The log is append-only: every send or resend adds
/// a record, nothing is overwritten in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub principal: i64,
    pub file_seq: u64,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub recovery_attempts: u32,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRecord {
    pub principal: i64,
    pub display_name: String,
    pub added_by: i64,
    pub added_at: DateTime<Utc>,
}

/// Aggregate counters for the operator panel.
#[derive(Debug, Default, Serialize)]
pub struct Stats {
    pub subscribers: u64,
    pub active_subscribers: u64,
    pub pending_subscribers: u64,
    pub files: u64,
    pub distributed_files: u64,
    pub free_files: u64,
    pub links_issued: u64,
    pub links_consumed: u64,
    pub delivery_records: u64,
}
