use std::sync::Arc;

use crate::{config::AppConfig, storage, utils::http};

pub mod channel;
pub mod dialogue;
mod error;
pub mod generator;
pub mod menu;
pub mod settings;

pub use error::ServiceError;

use channel::ChatChannel;
use dialogue::{DialogueService, GenerationPolicy, SessionRegistry};
use generator::OpenAiGenerator;

#[derive(Clone)]
pub struct ServiceRegistry {
    pub dialogue: DialogueService,
}

impl ServiceRegistry {
    pub async fn new(config: &AppConfig, channel: Arc<dyn ChatChannel>) -> Result<Self, ServiceError> {
        info!("Initializing service registry");

        let store = storage::open_settings_store(&config.storage, config.session.capacity).await?;

        let client = http::create_openai_client(&config.http)?;
        let generator = Arc::new(OpenAiGenerator::new(
            client,
            &config.openai.base_url,
            &config.openai.api_key,
        ));

        let dialogue = DialogueService::new(
            SessionRegistry::new(config.session.capacity),
            store,
            generator,
            channel,
            GenerationPolicy::from(&config.generation),
            &config.locale,
        );

        info!("Service registry initialized");

        Ok(Self { dialogue })
    }
}
