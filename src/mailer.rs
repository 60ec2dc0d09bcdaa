use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::DispatchError;
use crate::models::OutboundEmail;

// Something that can hand a finished email to a delivery service.
// Called once per submission, implementations must not retry.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, api_key: &str, email: &OutboundEmail) -> Result<(), DispatchError>;
}

// Resend REST client
pub struct ResendSender {
    client: reqwest::Client,
    url: String,
}

impl ResendSender {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, api_key: &str, email: &OutboundEmail) -> Result<(), DispatchError> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(email)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            // body is only for the logs
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "Email provider accepted message");
        Ok(())
    }
}
