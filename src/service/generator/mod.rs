mod error;
mod openai;

pub use error::GeneratorError;
pub use openai::OpenAiGenerator;

use async_trait::async_trait;

use crate::service::settings::{Model, Quantity, Settings, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: Model,
    pub size: Size,
    pub quantity: Quantity,
}

impl GenerationRequest {
    pub fn new(prompt: &str, settings: &Settings) -> Self {
        Self {
            prompt: prompt.to_string(),
            model: settings.model,
            size: settings.size,
            quantity: settings.quantity,
        }
    }
}

/// Image generation backend. Returns the URLs of the generated images.
#[async_trait]
pub trait ImageGenerator: Send + Sync + 'static {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>, GeneratorError>;
}
