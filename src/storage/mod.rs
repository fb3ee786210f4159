mod admins;
pub mod db;
mod deliveries;
mod links;
pub mod models;
mod pool;
mod stats;
mod subscribers;
mod tables;

pub use db::{Database, DatabaseError};
pub use deliveries::HandoffCommit;
pub use links::RedeemOutcome;
pub use tables::*;
