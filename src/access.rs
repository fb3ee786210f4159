//! Access-control checks. Both are pure reads; a store failure is logged
//! and answered with "denied" rather than surfaced to the caller.

use crate::config::Config;
use crate::storage::Database;

/// True if the principal is in the static allow-list or the admin table.
pub fn is_admin(config: &Config, db: &Database, principal: i64) -> bool {
    if config.admin_ids.contains(&principal) {
        return true;
    }
    match db.admin_exists(principal) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(principal, error = %e, "admin lookup failed, denying");
            false
        }
    }
}

/// True iff a subscriber record exists for the principal with access set.
pub fn has_active_subscription(db: &Database, principal: i64) -> bool {
    match db.get_subscriber(principal) {
        Ok(Some(sub)) => sub.has_access,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(principal, error = %e, "subscription lookup failed, denying");
            false
        }
    }
}
