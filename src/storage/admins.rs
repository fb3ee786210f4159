use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::AdminRecord;
use super::tables::*;

impl Database {
    /// Add or refresh an administrator.
    pub fn put_admin(&self, admin: &AdminRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(ADMINS)?;
            let data = rmp_serde::to_vec_named(admin)?;
            table.insert(admin.principal, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove an administrator. Returns false if there was none.
    pub fn remove_admin(&self, principal: i64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ADMINS)?;
            let removed = table.remove(principal)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn admin_exists(&self, principal: i64) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ADMINS)?;
        Ok(table.get(principal)?.is_some())
    }

    pub fn list_admins(&self) -> Result<Vec<AdminRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ADMINS)?;

        let mut admins = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            admins.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(admins)
    }
}
