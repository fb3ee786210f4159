use redb::{ReadableTable, ReadableTableMetadata};

use super::db::{Database, DatabaseError};
use super::models::{PoolFile, Stats, Subscriber, SubscriptionLink};
use super::tables::*;

impl Database {
    /// Aggregate counters for the operator panel, from one read snapshot.
    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        let read_txn = self.begin_read()?;
        let mut stats = Stats::default();

        let subscribers = read_txn.open_table(SUBSCRIBERS)?;
        stats.subscribers = subscribers.len()?;
        for result in subscribers.iter()? {
            let (_, value) = result?;
            let sub: Subscriber = rmp_serde::from_slice(value.value())?;
            if sub.has_access {
                stats.active_subscribers += 1;
                if sub.files_received == 0 {
                    stats.pending_subscribers += 1;
                }
            }
        }

        let files = read_txn.open_table(POOL_FILES)?;
        stats.files = files.len()?;
        for result in files.iter()? {
            let (_, value) = result?;
            let file: PoolFile = rmp_serde::from_slice(value.value())?;
            if file.distributed {
                stats.distributed_files += 1;
            } else {
                stats.free_files += 1;
            }
        }

        let links = read_txn.open_table(LINKS)?;
        stats.links_issued = links.len()?;
        for result in links.iter()? {
            let (_, value) = result?;
            let link: SubscriptionLink = rmp_serde::from_slice(value.value())?;
            if link.consumed {
                stats.links_consumed += 1;
            }
        }

        let deliveries = read_txn.open_table(DELIVERIES)?;
        stats.delivery_records = deliveries.len()?;

        Ok(stats)
    }
}
