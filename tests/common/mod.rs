//! Shared helpers for file-courier integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use file_courier::config::{Config, NodeConfig, StorageConfig, TransportConfig};
use file_courier::object_store::{LocalStore, ObjectStore};
use file_courier::storage::models::{PoolFile, Subscriber};
use file_courier::storage::Database;
use file_courier::transport::{Transport, TransportError};
use file_courier::AppState;

/// One document captured by the mock transport.
#[derive(Debug, Clone)]
pub struct SentDocument {
    pub principal: i64,
    pub payload: Bytes,
    pub filename: String,
    pub caption: String,
}

/// Scripted transport: records every send, and can be told to reject or
/// hang for specific principals.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<SentDocument>>,
    reject: Mutex<HashSet<i64>>,
    hang: Mutex<HashSet<i64>>,
}

impl MockTransport {
    pub fn reject_for(&self, principal: i64) {
        self.reject.lock().unwrap().insert(principal);
    }

    pub fn stop_rejecting(&self, principal: i64) {
        self.reject.lock().unwrap().remove(&principal);
    }

    pub fn hang_for(&self, principal: i64) {
        self.hang.lock().unwrap().insert(principal);
    }

    pub fn sent(&self) -> Vec<SentDocument> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, principal: i64) -> Vec<SentDocument> {
        self.sent()
            .into_iter()
            .filter(|d| d.principal == principal)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_document(
        &self,
        principal: i64,
        payload: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        if self.hang.lock().unwrap().contains(&principal) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.reject.lock().unwrap().contains(&principal) {
            return Err(TransportError::Rejected {
                status: 403,
                detail: "blocked by peer".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentDocument {
            principal,
            payload,
            filename: filename.to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// Create a test AppState with a temporary store and a mock transport.
pub fn test_state(temp_dir: &tempfile::TempDir) -> (Arc<AppState>, Arc<MockTransport>) {
    let data_dir = temp_dir.path().join("data");
    let pool_dir = temp_dir.path().join("pool");
    let backup_dir = temp_dir.path().join("backup");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            pool_path: pool_dir.to_string_lossy().to_string(),
            backup_path: backup_dir.to_string_lossy().to_string(),
        },
        transport: TransportConfig {
            api_base: "http://127.0.0.1:0".to_string(),
            token: "test-token".to_string(),
            send_timeout_secs: 1,
        },
        admin_ids: vec![1],
        link_base: "https://t.me/courier_bot".to_string(),
        max_bundle_size: 10 * 1024 * 1024,
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let pool_store = LocalStore::new(&pool_dir).expect("Failed to create test pool store");
    let backup_store = LocalStore::new(&backup_dir).expect("Failed to create test backup store");
    let transport = Arc::new(MockTransport::default());

    let state = Arc::new(AppState {
        config,
        db,
        pool_store: Arc::new(pool_store),
        backup_store: Arc::new(backup_store),
        transport: Arc::clone(&transport) as Arc<dyn Transport>,
    });
    (state, transport)
}

/// Insert an active, pending subscriber.
pub fn seed_subscriber(db: &Database, principal: i64, alias: &str) -> Subscriber {
    let sub = Subscriber {
        principal,
        display_name: format!("user-{principal}"),
        has_access: true,
        subscribed_at: Some(Utc::now()),
        alias: alias.to_string(),
        files_received: 0,
        pending_file: true,
        last_file_sent: None,
    };
    db.insert_subscriber(&sub).expect("Failed to seed subscriber");
    sub
}

/// Store a payload in the pool and insert its record. Returns the file's
/// sequence key.
pub async fn seed_file(state: &AppState, original_name: &str, alias: &str, content: &[u8]) -> u64 {
    let storage_key = format!("{alias}.pdf");
    state
        .pool_store
        .put(&storage_key, Bytes::copy_from_slice(content))
        .await
        .expect("Failed to store seed payload");

    let file = PoolFile {
        original_name: original_name.to_string(),
        alias: alias.to_string(),
        storage_key,
        backup_key: None,
        mime_type: "application/pdf".to_string(),
        byte_size: content.len() as u64,
        distributed: false,
        distributed_to: None,
        distributed_at: None,
        created_at: Utc::now(),
    };
    state
        .db
        .insert_pool_files(std::slice::from_ref(&file))
        .expect("Failed to seed file record");

    let (seq, _) = state
        .db
        .get_pool_file_by_alias(alias)
        .expect("Failed to look up seed file")
        .expect("seed file should exist");
    seq
}
