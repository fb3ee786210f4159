mod bot_api;

pub use bot_api::BotApiTransport;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Delivery rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Boundary to the chat platform that carries payloads to principals.
/// Implementations confirm delivery or return a failure; they never retry --
/// retries belong to the distribution engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` to `principal` under the given presentation
    /// filename, with an accompanying caption.
    async fn send_document(
        &self,
        principal: i64,
        payload: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), TransportError>;
}
