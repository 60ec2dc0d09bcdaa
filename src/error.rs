//! Error types for the contact endpoint.
//!
//! Every variant carries a fixed, client-facing message. Internal detail
//! (provider responses, serde errors) stays in the logs.

use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub const RATE_LIMITED_MESSAGE: &str = "Muitas requisições. Tente novamente em breve.";
pub const SEND_FAILED_MESSAGE: &str = "Erro ao enviar o e-mail.";
pub const SENT_MESSAGE: &str = "E-mail enviado com sucesso!";

/// The client used up its allowance for the current window.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rate limit exceeded, retry in {}s", .retry_after.as_secs())]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

/// Required server configuration is absent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("RESEND_API_KEY não definida!")]
    MissingApiKey,

    #[error("CONTACT_RECEIVER_EMAIL não definida!")]
    MissingReceiver,
}

/// Submission rejected by validation. Display is the message sent to the client.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Campos obrigatórios ausentes.")]
    MissingField,

    #[error("Máximo de 5 arquivos permitidos.")]
    TooManyAttachments,

    #[error("Cada arquivo deve ter no máximo 1MB.")]
    AttachmentTooLarge,
}

/// Failure between reading the body and the provider accepting the email.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("could not read request body: {0}")]
    Body(String),

    #[error("malformed submission: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("email provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Everything the contact handler can fail with.
#[derive(Error, Debug)]
pub enum ContactError {
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ContactError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Config(_) | Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::RateLimited(_) => RATE_LIMITED_MESSAGE.to_string(),
            Self::Config(e) => e.to_string(),
            Self::Validation(e) => e.to_string(),
            Self::Dispatch(_) => SEND_FAILED_MESSAGE.to_string(),
        }
    }
}
