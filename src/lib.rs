//! file-courier - Subscription-gated one-to-one file distribution
//!
//! An administrator issues one-time activation links; redeeming a link
//! grants access and queues the subscriber to receive one unique file from
//! a shared pool. Files are handed off anonymously (alias filenames, never
//! originals), every attempt is recorded in an append-only delivery log,
//! and lost files can be re-delivered from backup copies.
//!
//! - redb embedded database for records (ACID, MVCC, crash-safe)
//! - Blob storage behind an `ObjectStore` trait (live pool + backup area)
//! - Chat delivery behind a `Transport` trait (bot-API HTTP client)
//! - REST control surface for the operator and the chat frontend

pub mod access;
pub mod api;
pub mod config;
pub mod distribution;
pub mod ident;
pub mod ingestion;
pub mod object_store;
pub mod storage;
pub mod transport;

use std::sync::Arc;

use config::Config;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    /// Live payloads, keyed by file alias
    pub pool_store: Arc<dyn object_store::ObjectStore>,
    /// Handoff-time backup copies, keyed by subscriber alias
    pub backup_store: Arc<dyn object_store::ObjectStore>,
    pub transport: Arc<dyn transport::Transport>,
}
