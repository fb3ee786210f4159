use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{next_seq, Database, DatabaseError};
use super::models::{DeliveryRecord, DeliveryStatus, PoolFile, Subscriber};
use super::tables::*;

/// Result of attempting to commit a successful handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffCommit {
    Committed,
    /// The file's distributed latch was already set; nothing was written.
    AlreadyDistributed,
    MissingFile,
    MissingSubscriber,
}

impl Database {
    /// Append a delivery-attempt record to the audit log.
    pub fn append_delivery(&self, record: &DeliveryRecord) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let seq = {
            let mut table = write_txn.open_table(DELIVERIES)?;
            let seq = next_seq(&table)?;
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(seq, data.as_slice())?;
            seq
        };
        write_txn.commit()?;
        Ok(seq)
    }

    /// All delivery records for a principal, oldest first.
    pub fn deliveries_for(&self, principal: i64) -> Result<Vec<DeliveryRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DELIVERIES)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let record: DeliveryRecord = rmp_serde::from_slice(value.value())?;
            if record.principal == principal {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// The most recent sent-or-recovered record for a principal, if any.
    pub fn latest_successful_delivery(
        &self,
        principal: i64,
    ) -> Result<Option<DeliveryRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DELIVERIES)?;

        let mut latest = None;
        for result in table.iter()? {
            let (_, value) = result?;
            let record: DeliveryRecord = rmp_serde::from_slice(value.value())?;
            if record.principal == principal && record.status.is_successful() {
                latest = Some(record);
            }
        }
        Ok(latest)
    }

    /// Number of distinct files with a successful delivery record for a
    /// principal. Reconciles against `Subscriber::files_received`.
    pub fn delivered_file_count(&self, principal: i64) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DELIVERIES)?;

        let mut files = std::collections::HashSet::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let record: DeliveryRecord = rmp_serde::from_slice(value.value())?;
            if record.principal == principal && record.status.is_successful() {
                files.insert(record.file_seq);
            }
        }
        Ok(files.len() as u64)
    }

    /// Commit a successful handoff as one transaction: set the file's
    /// distributed latch (refusing if it is already set), append a `sent`
    /// record, and advance the subscriber's counters. Either all of it
    /// lands or none of it does.
    pub fn commit_handoff(
        &self,
        file_seq: u64,
        principal: i64,
        backup_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<HandoffCommit, DatabaseError> {
        let write_txn = self.begin_write()?;

        let outcome = {
            let mut files = write_txn.open_table(POOL_FILES)?;
            let file: Option<PoolFile> = match files.get(file_seq)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match file {
                None => HandoffCommit::MissingFile,
                Some(file) if file.distributed => HandoffCommit::AlreadyDistributed,
                Some(mut file) => {
                    let indexed_seq = {
                        let index = write_txn.open_table(SUBSCRIBER_INDEX)?;
                        let seq = index.get(principal)?.map(|v| v.value());
                        seq
                    };
                    let mut subscribers = write_txn.open_table(SUBSCRIBERS)?;
                    let sub: Option<(u64, Subscriber)> = match indexed_seq {
                        Some(seq) => match subscribers.get(seq)? {
                            Some(data) => Some((seq, rmp_serde::from_slice(data.value())?)),
                            None => None,
                        },
                        None => None,
                    };

                    match sub {
                        None => HandoffCommit::MissingSubscriber,
                        Some((sub_seq, mut sub)) => {
                            file.distributed = true;
                            file.distributed_to = Some(principal);
                            file.distributed_at = Some(now);
                            file.backup_key = backup_key.map(|k| k.to_string());
                            let data = rmp_serde::to_vec_named(&file)?;
                            files.insert(file_seq, data.as_slice())?;

                            sub.files_received += 1;
                            sub.last_file_sent = Some(now);
                            sub.pending_file = false;
                            let data = rmp_serde::to_vec_named(&sub)?;
                            subscribers.insert(sub_seq, data.as_slice())?;

                            let record = DeliveryRecord {
                                principal,
                                file_seq,
                                status: DeliveryStatus::Sent,
                                error: None,
                                recovery_attempts: 0,
                                attempted_at: now,
                            };
                            let mut deliveries = write_txn.open_table(DELIVERIES)?;
                            let seq = next_seq(&deliveries)?;
                            let data = rmp_serde::to_vec_named(&record)?;
                            deliveries.insert(seq, data.as_slice())?;

                            HandoffCommit::Committed
                        }
                    }
                }
            }
        };

        match outcome {
            HandoffCommit::Committed => write_txn.commit()?,
            _ => write_txn.abort()?,
        }
        Ok(outcome)
    }

    /// Record a failed transmission. Only the audit record is written; the
    /// file stays free and the subscriber stays pending.
    pub fn record_failed_handoff(
        &self,
        principal: i64,
        file_seq: u64,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let record = DeliveryRecord {
            principal,
            file_seq,
            status: DeliveryStatus::Failed,
            error: Some(error.to_string()),
            recovery_attempts: 0,
            attempted_at: now,
        };
        self.append_delivery(&record)?;
        Ok(())
    }

    /// Append a `recovered` record for a re-delivery, carrying the lineage's
    /// attempt counter forward. Returns the attempt number. Touches neither
    /// the file's latch nor the subscriber's counters.
    pub fn commit_recovery(
        &self,
        principal: i64,
        file_seq: u64,
        now: DateTime<Utc>,
    ) -> Result<u32, DatabaseError> {
        let write_txn = self.begin_write()?;
        let attempt = {
            let mut table = write_txn.open_table(DELIVERIES)?;

            let mut prior_attempts = 0;
            for result in table.iter()? {
                let (_, value) = result?;
                let record: DeliveryRecord = rmp_serde::from_slice(value.value())?;
                if record.principal == principal && record.file_seq == file_seq {
                    prior_attempts = prior_attempts.max(record.recovery_attempts);
                }
            }
            let attempt = prior_attempts + 1;

            let record = DeliveryRecord {
                principal,
                file_seq,
                status: DeliveryStatus::Recovered,
                error: None,
                recovery_attempts: attempt,
                attempted_at: now,
            };
            let seq = next_seq(&table)?;
            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(seq, data.as_slice())?;
            attempt
        };
        write_txn.commit()?;
        Ok(attempt)
    }
}
