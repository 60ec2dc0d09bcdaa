//! Contact form relay: rate-limits, validates and forwards website contact
//! submissions to a transactional email provider.

pub mod config;
pub mod cors;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod validator;

pub use config::{Args, Config};
pub use state::AppState;
