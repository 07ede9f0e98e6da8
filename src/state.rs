use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::Bot;

use crate::config::AppConfig;
use crate::error::BotResult;
use crate::handler::TelegramChannel;
use crate::service::ServiceRegistry;

/// Shared state handed to every handler as a dispatcher dependency.
#[derive(Clone)]
pub struct AppState {
    pub services: ServiceRegistry,
}

impl AppState {
    pub async fn new(config: &AppConfig, bot: Throttle<Bot>) -> BotResult<Self> {
        let channel = Arc::new(TelegramChannel::new(bot));
        let services = ServiceRegistry::new(config, channel).await?;

        Ok(Self { services })
    }
}
