use teloxide::adaptors::throttle::Limits;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::Bot;

use crate::config::AppConfig;
use crate::error::{BotResult, HandlerResult};
use crate::handler::get_handler;
use crate::state::AppState;
use crate::utils::http;

pub struct BotService {
    pub bot: Throttle<Bot>,
    pub state: AppState,
    pub locale: String,
}

impl BotService {
    pub async fn new(config: &AppConfig) -> BotResult<Self> {
        let client = http::create_telegram_client(&config.http)?;
        let bot = Bot::with_client(config.telegram.0.clone(), client).throttle(Limits::default());

        info!("Initializing AppState...");
        let state = AppState::new(config, bot.clone()).await?;
        info!("AppState initialized");

        Ok(Self {
            bot,
            state,
            locale: config.locale.clone(),
        })
    }

    pub async fn start(&self) -> HandlerResult<()> {
        info!("Testing connection to Telegram API...");
        match self.bot.get_me().await {
            Ok(me) => info!("Connected to Telegram API as @{}", me.username()),
            Err(e) => {
                error!("Failed to connect to Telegram API: {:?}", e);
                return Err(anyhow::anyhow!("Failed to connect to Telegram API: {}", e).into());
            }
        }

        crate::command::setup_user_commands(&self.bot, &self.locale).await?;

        let handler = get_handler();

        info!("Starting dispatcher");
        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.state.clone()])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
