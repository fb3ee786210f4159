use redb::TableDefinition;

/// Subscribers: insertion sequence -> Subscriber (msgpack).
/// Sequence order is the FIFO order of the pending queue.
pub const SUBSCRIBERS: TableDefinition<u64, &[u8]> = TableDefinition::new("subscribers");

/// Principal index: principal id -> subscriber sequence
pub const SUBSCRIBER_INDEX: TableDefinition<i64, u64> = TableDefinition::new("subscriber_index");

/// Pool files: insertion sequence -> PoolFile (msgpack)
pub const POOL_FILES: TableDefinition<u64, &[u8]> = TableDefinition::new("pool_files");

/// Alias index: file alias -> pool file sequence
pub const FILE_ALIASES: TableDefinition<&str, u64> = TableDefinition::new("file_aliases");

/// One-time subscription links: token -> SubscriptionLink (msgpack)
pub const LINKS: TableDefinition<&str, &[u8]> = TableDefinition::new("subscription_links");

/// Delivery audit log, append-only: sequence -> DeliveryRecord (msgpack)
pub const DELIVERIES: TableDefinition<u64, &[u8]> = TableDefinition::new("deliveries");

/// Administrators: principal id -> AdminRecord (msgpack)
pub const ADMINS: TableDefinition<i64, &[u8]> = TableDefinition::new("admins");
