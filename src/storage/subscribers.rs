use redb::ReadableTable;

use super::db::{next_seq, Database, DatabaseError};
use super::models::Subscriber;
use super::tables::*;

impl Database {
    /// Append a subscriber at the tail of the queue and index it by principal.
    /// Returns the assigned sequence.
    pub fn insert_subscriber(&self, sub: &Subscriber) -> Result<u64, DatabaseError> {
        debug_assert!(!sub.alias.is_empty(), "subscriber alias must not be empty");

        let write_txn = self.begin_write()?;
        let seq = {
            let mut table = write_txn.open_table(SUBSCRIBERS)?;
            let seq = next_seq(&table)?;
            let data = rmp_serde::to_vec_named(sub)?;
            table.insert(seq, data.as_slice())?;

            let mut index = write_txn.open_table(SUBSCRIBER_INDEX)?;
            index.insert(sub.principal, seq)?;
            seq
        };
        write_txn.commit()?;
        Ok(seq)
    }

    /// Look up a subscriber by principal id.
    pub fn get_subscriber(&self, principal: i64) -> Result<Option<Subscriber>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(SUBSCRIBER_INDEX)?;

        let seq = match index.get(principal)? {
            Some(v) => v.value(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(SUBSCRIBERS)?;
        match table.get(seq)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Overwrite a subscriber record in place (the principal and alias never change).
    pub fn update_subscriber(&self, sub: &Subscriber) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let seq = {
            let index = write_txn.open_table(SUBSCRIBER_INDEX)?;
            let seq = index.get(sub.principal)?.map(|v| v.value());
            seq
        };

        let updated = match seq {
            Some(seq) => {
                let mut table = write_txn.open_table(SUBSCRIBERS)?;
                let data = rmp_serde::to_vec_named(sub)?;
                table.insert(seq, data.as_slice())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// The pending queue: subscribers with access who have not yet received a
    /// file, in insertion order (FIFO). Returned with their sequence keys.
    pub fn pending_subscribers(&self) -> Result<Vec<(u64, Subscriber)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SUBSCRIBERS)?;

        let mut pending = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let sub: Subscriber = rmp_serde::from_slice(value.value())?;
            if sub.has_access && sub.files_received == 0 {
                pending.push((key.value(), sub));
            }
        }
        Ok(pending)
    }

    /// All subscribers with the access flag set, in insertion order.
    pub fn active_subscribers(&self) -> Result<Vec<Subscriber>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SUBSCRIBERS)?;

        let mut subs = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let sub: Subscriber = rmp_serde::from_slice(value.value())?;
            if sub.has_access {
                subs.push(sub);
            }
        }
        Ok(subs)
    }
}
