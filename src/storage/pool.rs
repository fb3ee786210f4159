use redb::ReadableTable;

use super::db::{next_seq, Database, DatabaseError};
use super::models::PoolFile;
use super::tables::*;

impl Database {
    /// Insert a batch of ingested files in a single transaction, maintaining
    /// the alias index. The whole batch commits or none of it does.
    pub fn insert_pool_files(&self, files: &[PoolFile]) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(POOL_FILES)?;
            let mut aliases = write_txn.open_table(FILE_ALIASES)?;
            let mut seq = next_seq(&table)?;

            for file in files {
                debug_assert!(!file.alias.is_empty(), "file alias must not be empty");
                let data = rmp_serde::to_vec_named(file)?;
                table.insert(seq, data.as_slice())?;
                aliases.insert(file.alias.as_str(), seq)?;
                seq += 1;
            }
        }
        write_txn.commit()?;
        Ok(files.len() as u64)
    }

    /// Get a pool file by its sequence key.
    pub fn get_pool_file(&self, seq: u64) -> Result<Option<PoolFile>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(POOL_FILES)?;
        match table.get(seq)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve a file alias to its sequence and record.
    pub fn get_pool_file_by_alias(
        &self,
        alias: &str,
    ) -> Result<Option<(u64, PoolFile)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let aliases = read_txn.open_table(FILE_ALIASES)?;

        let seq = match aliases.get(alias)? {
            Some(v) => v.value(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(POOL_FILES)?;
        match table.get(seq)? {
            Some(data) => Ok(Some((seq, rmp_serde::from_slice(data.value())?))),
            None => Ok(None),
        }
    }

    /// Files not yet assigned to any subscriber, in insertion order.
    pub fn free_files(&self) -> Result<Vec<(u64, PoolFile)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(POOL_FILES)?;

        let mut free = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let file: PoolFile = rmp_serde::from_slice(value.value())?;
            if !file.distributed {
                free.push((key.value(), file));
            }
        }
        Ok(free)
    }

    /// Check whether a file alias is already in use.
    pub fn file_alias_exists(&self, alias: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILE_ALIASES)?;
        Ok(table.get(alias)?.is_some())
    }
}
