use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use super::{Transport, TransportError};

/// Bot-API HTTP transport: delivers documents through the chat platform's
/// `sendDocument` endpoint as multipart uploads.
pub struct BotApiTransport {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl BotApiTransport {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

#[async_trait]
impl Transport for BotApiTransport {
    async fn send_document(
        &self,
        principal: i64,
        payload: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        let mime = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();

        let part = Part::bytes(payload.to_vec())
            .file_name(filename.to_string())
            .mime_str(&mime)
            .map_err(|e| TransportError::InvalidPayload(e.to_string()))?;

        let form = Form::new()
            .text("chat_id", principal.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The API reports failures as {"ok": false, "description": "..."}.
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("description")?.as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(())
    }
}
