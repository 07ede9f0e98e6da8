use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use super::{GenerationRequest, GeneratorError, ImageGenerator};

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Image generator for the OpenAI images API and compatible proxies.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/images/generations", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    async fn request_batch(&self, request: &GenerationRequest, n: u8) -> Result<Vec<String>, GeneratorError> {
        let body = ImagesRequest {
            model: request.model.as_str(),
            prompt: &request.prompt,
            n,
            size: request.size.as_str(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let images = response.json::<ImagesResponse>().await?;
        Ok(images.data.into_iter().filter_map(|image| image.url).collect())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>, GeneratorError> {
        let quantity = request.quantity.get();
        let limit = request.model.batch_limit();

        if quantity <= limit {
            return self.request_batch(request, quantity).await;
        }

        // Models limited to fewer images per call get one request per batch, run concurrently.
        let mut batches = JoinSet::new();
        let mut remaining = quantity;
        let mut index = 0;
        while remaining > 0 {
            let n = remaining.min(limit);
            let generator = self.clone();
            let request = request.clone();
            batches.spawn(async move { (index, generator.request_batch(&request, n).await) });
            remaining -= n;
            index += 1;
        }

        let mut results = Vec::with_capacity(index);
        while let Some(joined) = batches.join_next().await {
            let (index, urls) = joined.map_err(|e| GeneratorError::Task(e.to_string()))?;
            results.push((index, urls?));
        }
        results.sort_by_key(|(index, _)| *index);

        Ok(results.into_iter().flat_map(|(_, urls)| urls).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        service::settings::{Model, Quantity, Settings, Size},
        utils::test::{local_client, serve},
    };
    use std::sync::atomic::Ordering;

    fn request(model: Model, size: Size, quantity: i64) -> GenerationRequest {
        let settings = Settings {
            model,
            size,
            quantity: Quantity::new(quantity).unwrap(),
        };
        GenerationRequest::new("a red fox", &settings)
    }

    #[tokio::test]
    async fn test_generate_returns_urls() {
        let body = r#"{"created": 1, "data": [{"url": "https://img/1.png"}, {"url": "https://img/2.png"}]}"#;
        let (server, hits) = serve("200 OK", body.to_string()).await;
        let generator = OpenAiGenerator::new(local_client(), &format!("{}/v1", server), "sk-test");

        let urls = generator.generate(&request(Model::Dalle2, Size::S256, 2)).await.unwrap();

        assert_eq!(urls, vec!["https://img/1.png", "https://img/2.png"]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_image_model_splits_requests() {
        let body = r#"{"data": [{"url": "https://img/x.png"}]}"#;
        let (server, hits) = serve("200 OK", body.to_string()).await;
        let generator = OpenAiGenerator::new(local_client(), &format!("{}/v1", server), "sk-test");

        let urls = generator.generate(&request(Model::Dalle3, Size::S1024, 3)).await.unwrap();

        assert_eq!(urls.len(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let body = r#"{"error": {"message": "Your request was rejected", "type": "invalid_request_error"}}"#;
        let (server, _) = serve("400 Bad Request", body.to_string()).await;
        let generator = OpenAiGenerator::new(local_client(), &format!("{}/v1", server), "sk-test");

        let err = generator.generate(&request(Model::Dalle2, Size::S512, 1)).await.unwrap_err();

        match err {
            GeneratorError::Api { status, ref message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Your request was rejected");
            }
            ref other => panic!("unexpected error {:?}", other),
        }
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let (server, _) = serve("503 Service Unavailable", "upstream down".to_string()).await;
        let generator = OpenAiGenerator::new(local_client(), &format!("{}/v1", server), "sk-test");

        let err = generator.generate(&request(Model::Dalle2, Size::S256, 1)).await.unwrap_err();

        assert!(matches!(err, GeneratorError::Api { status: 503, ref message } if message == "upstream down"));
        assert!(err.is_retryable());
    }
}
