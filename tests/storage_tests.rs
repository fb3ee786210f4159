use chrono::Utc;

use file_courier::storage::models::{
    AdminRecord, DeliveryRecord, DeliveryStatus, PoolFile, Subscriber, SubscriptionLink,
};
use file_courier::storage::{Database, HandoffCommit, RedeemOutcome};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_link(token: &str) -> SubscriptionLink {
    SubscriptionLink {
        token: token.to_string(),
        issued_by: 1,
        created_at: Utc::now(),
        consumed: false,
        consumed_by: None,
        consumed_at: None,
    }
}

fn sample_file(alias: &str, name: &str) -> PoolFile {
    PoolFile {
        original_name: name.to_string(),
        alias: alias.to_string(),
        storage_key: format!("{alias}.pdf"),
        backup_key: None,
        mime_type: "application/pdf".to_string(),
        byte_size: 1024,
        distributed: false,
        distributed_to: None,
        distributed_at: None,
        created_at: Utc::now(),
    }
}

fn sample_subscriber(principal: i64, alias: &str) -> Subscriber {
    Subscriber {
        principal,
        display_name: format!("user-{principal}"),
        has_access: true,
        subscribed_at: Some(Utc::now()),
        alias: alias.to_string(),
        files_received: 0,
        pending_file: true,
        last_file_sent: None,
    }
}

// ============================================================================
// Redemption
// ============================================================================

#[test]
fn test_redeem_creates_subscriber_and_consumes_link() {
    let (_dir, db) = test_db();
    db.insert_link(&sample_link("tok-1")).unwrap();

    let outcome = db
        .redeem_link("tok-1", 100, "Alice", "aaaa000011112222", Utc::now())
        .unwrap();
    assert_eq!(
        outcome,
        RedeemOutcome::Granted {
            alias: "aaaa000011112222".to_string(),
            newly_created: true,
        }
    );

    let sub = db.get_subscriber(100).unwrap().expect("subscriber created");
    assert!(sub.has_access);
    assert!(sub.pending_file);
    assert_eq!(sub.files_received, 0);
    assert_eq!(sub.display_name, "Alice");
    assert_eq!(sub.alias, "aaaa000011112222");

    let link = db.get_link("tok-1").unwrap().unwrap();
    assert!(link.consumed);
    assert_eq!(link.consumed_by, Some(100));
    assert!(link.consumed_at.is_some());
}

#[test]
fn test_redeem_unknown_token() {
    let (_dir, db) = test_db();
    let outcome = db
        .redeem_link("nope", 100, "Alice", "aaaa000011112222", Utc::now())
        .unwrap();
    assert_eq!(outcome, RedeemOutcome::InvalidOrUsed);
    assert!(db.get_subscriber(100).unwrap().is_none());
}

#[test]
fn test_redeem_same_token_twice_is_rejected_without_writes() {
    let (_dir, db) = test_db();
    db.insert_link(&sample_link("tok-2")).unwrap();

    db.redeem_link("tok-2", 100, "Alice", "a1", Utc::now())
        .unwrap();
    let sub_before = db.get_subscriber(100).unwrap().unwrap();
    let link_before = db.get_link("tok-2").unwrap().unwrap();

    // A different principal trying the same token changes nothing.
    let outcome = db
        .redeem_link("tok-2", 200, "Bob", "b2", Utc::now())
        .unwrap();
    assert_eq!(outcome, RedeemOutcome::InvalidOrUsed);

    assert!(db.get_subscriber(200).unwrap().is_none());
    let sub_after = db.get_subscriber(100).unwrap().unwrap();
    let link_after = db.get_link("tok-2").unwrap().unwrap();
    assert_eq!(sub_after.alias, sub_before.alias);
    assert_eq!(sub_after.subscribed_at, sub_before.subscribed_at);
    assert_eq!(link_after.consumed_by, link_before.consumed_by);
    assert_eq!(link_after.consumed_at, link_before.consumed_at);
}

#[test]
fn test_redeem_rejected_when_already_subscribed_leaves_link_fresh() {
    let (_dir, db) = test_db();
    db.insert_link(&sample_link("tok-3")).unwrap();
    db.insert_link(&sample_link("tok-4")).unwrap();

    db.redeem_link("tok-3", 100, "Alice", "a1", Utc::now())
        .unwrap();
    let outcome = db
        .redeem_link("tok-4", 100, "Alice", "a2", Utc::now())
        .unwrap();
    assert_eq!(outcome, RedeemOutcome::AlreadySubscribed);

    // The rejected redemption must not burn the second link.
    let link = db.get_link("tok-4").unwrap().unwrap();
    assert!(!link.consumed);
}

#[test]
fn test_redeem_regrants_revoked_subscriber_keeping_alias() {
    let (_dir, db) = test_db();
    db.insert_link(&sample_link("tok-5")).unwrap();
    db.insert_link(&sample_link("tok-6")).unwrap();

    db.redeem_link("tok-5", 100, "Alice", "original-alias", Utc::now())
        .unwrap();

    let mut sub = db.get_subscriber(100).unwrap().unwrap();
    sub.has_access = false;
    db.update_subscriber(&sub).unwrap();

    let outcome = db
        .redeem_link("tok-6", 100, "Alice A.", "candidate-alias", Utc::now())
        .unwrap();
    assert_eq!(
        outcome,
        RedeemOutcome::Granted {
            alias: "original-alias".to_string(),
            newly_created: false,
        }
    );

    let sub = db.get_subscriber(100).unwrap().unwrap();
    assert!(sub.has_access);
    assert!(sub.pending_file);
    assert_eq!(sub.alias, "original-alias");
    assert_eq!(sub.display_name, "Alice A.");
}

// ============================================================================
// Pending queue and pool
// ============================================================================

#[test]
fn test_pending_subscribers_fifo_order() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(300, "c")).unwrap();
    db.insert_subscriber(&sample_subscriber(100, "a")).unwrap();
    db.insert_subscriber(&sample_subscriber(200, "b")).unwrap();

    let pending = db.pending_subscribers().unwrap();
    let order: Vec<i64> = pending.iter().map(|(_, s)| s.principal).collect();
    assert_eq!(order, vec![300, 100, 200]);
}

#[test]
fn test_pending_excludes_served_and_revoked() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(1, "a")).unwrap();

    let mut served = sample_subscriber(2, "b");
    served.files_received = 1;
    db.insert_subscriber(&served).unwrap();

    let mut revoked = sample_subscriber(3, "c");
    revoked.has_access = false;
    db.insert_subscriber(&revoked).unwrap();

    let pending = db.pending_subscribers().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1.principal, 1);
}

#[test]
fn test_insert_pool_files_batch_and_free_listing() {
    let (_dir, db) = test_db();
    let batch = vec![sample_file("f1", "one.pdf"), sample_file("f2", "two.pdf")];
    assert_eq!(db.insert_pool_files(&batch).unwrap(), 2);

    let free = db.free_files().unwrap();
    assert_eq!(free.len(), 2);
    assert_eq!(free[0].1.alias, "f1");
    assert_eq!(free[1].1.alias, "f2");

    assert!(db.file_alias_exists("f1").unwrap());
    assert!(!db.file_alias_exists("f9").unwrap());

    let (seq, file) = db.get_pool_file_by_alias("f2").unwrap().unwrap();
    assert_eq!(file.original_name, "two.pdf");
    assert_eq!(db.get_pool_file(seq).unwrap().unwrap().alias, "f2");
}

// ============================================================================
// Handoff commits
// ============================================================================

#[test]
fn test_commit_handoff_updates_all_three_records() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(100, "sub-alias"))
        .unwrap();
    db.insert_pool_files(&[sample_file("f1", "one.pdf")]).unwrap();
    let (seq, _) = db.get_pool_file_by_alias("f1").unwrap().unwrap();

    let outcome = db
        .commit_handoff(seq, 100, Some("sub-alias_backup.pdf"), Utc::now())
        .unwrap();
    assert_eq!(outcome, HandoffCommit::Committed);

    let file = db.get_pool_file(seq).unwrap().unwrap();
    assert!(file.distributed);
    assert_eq!(file.distributed_to, Some(100));
    assert!(file.distributed_at.is_some());
    assert_eq!(file.backup_key.as_deref(), Some("sub-alias_backup.pdf"));

    let sub = db.get_subscriber(100).unwrap().unwrap();
    assert_eq!(sub.files_received, 1);
    assert!(!sub.pending_file);
    assert!(sub.last_file_sent.is_some());

    let records = db.deliveries_for(100).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeliveryStatus::Sent);
    assert_eq!(records[0].file_seq, seq);
}

#[test]
fn test_commit_handoff_refuses_distributed_file() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(100, "a")).unwrap();
    db.insert_subscriber(&sample_subscriber(200, "b")).unwrap();
    db.insert_pool_files(&[sample_file("f1", "one.pdf")]).unwrap();
    let (seq, _) = db.get_pool_file_by_alias("f1").unwrap().unwrap();

    assert_eq!(
        db.commit_handoff(seq, 100, None, Utc::now()).unwrap(),
        HandoffCommit::Committed
    );

    // Second claim on the same file must be refused without any writes.
    assert_eq!(
        db.commit_handoff(seq, 200, None, Utc::now()).unwrap(),
        HandoffCommit::AlreadyDistributed
    );

    let file = db.get_pool_file(seq).unwrap().unwrap();
    assert_eq!(file.distributed_to, Some(100));
    let second = db.get_subscriber(200).unwrap().unwrap();
    assert_eq!(second.files_received, 0);
    assert!(db.deliveries_for(200).unwrap().is_empty());
}

#[test]
fn test_failed_handoff_records_only_the_audit_row() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(100, "a")).unwrap();
    db.insert_pool_files(&[sample_file("f1", "one.pdf")]).unwrap();
    let (seq, _) = db.get_pool_file_by_alias("f1").unwrap().unwrap();

    db.record_failed_handoff(100, seq, "connection reset", Utc::now())
        .unwrap();

    let file = db.get_pool_file(seq).unwrap().unwrap();
    assert!(!file.distributed);
    let sub = db.get_subscriber(100).unwrap().unwrap();
    assert_eq!(sub.files_received, 0);
    assert!(sub.pending_file);

    let records = db.deliveries_for(100).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeliveryStatus::Failed);
    assert_eq!(records[0].error.as_deref(), Some("connection reset"));
}

#[test]
fn test_commit_recovery_advances_attempt_counter() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(100, "a")).unwrap();
    db.insert_pool_files(&[sample_file("f1", "one.pdf")]).unwrap();
    let (seq, _) = db.get_pool_file_by_alias("f1").unwrap().unwrap();
    db.commit_handoff(seq, 100, None, Utc::now()).unwrap();

    assert_eq!(db.commit_recovery(100, seq, Utc::now()).unwrap(), 1);
    assert_eq!(db.commit_recovery(100, seq, Utc::now()).unwrap(), 2);

    // Recovery never touches the counter, but still reconciles: one
    // distinct file was delivered.
    let sub = db.get_subscriber(100).unwrap().unwrap();
    assert_eq!(sub.files_received, 1);
    assert_eq!(db.delivered_file_count(100).unwrap(), 1);

    let latest = db.latest_successful_delivery(100).unwrap().unwrap();
    assert_eq!(latest.status, DeliveryStatus::Recovered);
    assert_eq!(latest.recovery_attempts, 2);
}

#[test]
fn test_latest_successful_delivery_skips_failures() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(100, "a")).unwrap();
    db.insert_pool_files(&[sample_file("f1", "one.pdf")]).unwrap();
    let (seq, _) = db.get_pool_file_by_alias("f1").unwrap().unwrap();

    db.commit_handoff(seq, 100, None, Utc::now()).unwrap();
    db.record_failed_handoff(100, seq, "later failure", Utc::now())
        .unwrap();

    let latest = db.latest_successful_delivery(100).unwrap().unwrap();
    assert_eq!(latest.status, DeliveryStatus::Sent);
}

#[test]
fn test_append_delivery_is_append_only() {
    let (_dir, db) = test_db();
    let record = DeliveryRecord {
        principal: 100,
        file_seq: 1,
        status: DeliveryStatus::Failed,
        error: Some("x".to_string()),
        recovery_attempts: 0,
        attempted_at: Utc::now(),
    };
    let first = db.append_delivery(&record).unwrap();
    let second = db.append_delivery(&record).unwrap();
    assert_eq!(second, first + 1);
    assert_eq!(db.deliveries_for(100).unwrap().len(), 2);
}

// ============================================================================
// Admins and stats
// ============================================================================

#[test]
fn test_admin_roster() {
    let (_dir, db) = test_db();
    let admin = AdminRecord {
        principal: 42,
        display_name: "Op".to_string(),
        added_by: 1,
        added_at: Utc::now(),
    };
    db.put_admin(&admin).unwrap();

    assert!(db.admin_exists(42).unwrap());
    assert_eq!(db.list_admins().unwrap().len(), 1);

    assert!(db.remove_admin(42).unwrap());
    assert!(!db.remove_admin(42).unwrap());
    assert!(!db.admin_exists(42).unwrap());
}

#[test]
fn test_stats_counters() {
    let (_dir, db) = test_db();
    db.insert_subscriber(&sample_subscriber(1, "a")).unwrap();
    let mut revoked = sample_subscriber(2, "b");
    revoked.has_access = false;
    db.insert_subscriber(&revoked).unwrap();

    db.insert_pool_files(&[sample_file("f1", "one.pdf"), sample_file("f2", "two.pdf")])
        .unwrap();
    let (seq, _) = db.get_pool_file_by_alias("f1").unwrap().unwrap();
    db.commit_handoff(seq, 1, None, Utc::now()).unwrap();

    db.insert_link(&sample_link("t1")).unwrap();
    db.insert_link(&sample_link("t2")).unwrap();
    db.redeem_link("t1", 3, "C", "c", Utc::now()).unwrap();

    let stats = db.stats().unwrap();
    assert_eq!(stats.subscribers, 3);
    assert_eq!(stats.active_subscribers, 2);
    assert_eq!(stats.pending_subscribers, 1); // principal 3; principal 1 was served
    assert_eq!(stats.files, 2);
    assert_eq!(stats.distributed_files, 1);
    assert_eq!(stats.free_files, 1);
    assert_eq!(stats.links_issued, 2);
    assert_eq!(stats.links_consumed, 1);
    assert_eq!(stats.delivery_records, 1);
}
