use std::sync::Arc;
use crate::config::Config;
use crate::cors::CorsPolicy;
use crate::dispatch::{Dispatcher, Route};
use crate::error::ConfigError;
use crate::mailer::EmailSender;
use crate::rate_limit::RateLimiter;
// app's shared state

pub struct AppState {
    pub config: Config,
    pub rate_limiter: Arc<RateLimiter>,
    pub cors: CorsPolicy,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: Config, sender: Arc<dyn EmailSender>) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_window,
                config.max_tracked_clients,
            )),
            cors: CorsPolicy::new(config.allowed_origins.clone()),
            dispatcher: Dispatcher::new(sender, config.sender.clone()),
            config,
        }
    }

    // Key and receiver must both be set before any email can go out
    pub fn route(&self) -> Result<Route, ConfigError> {
        let api_key = self.config.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
        let receiver = self.config.receiver.clone().ok_or(ConfigError::MissingReceiver)?;
        Ok(Route { api_key, receiver })
    }
}
