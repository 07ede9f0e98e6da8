use rand::Rng;
use std::time::Duration;

use crate::{
    config::GenerationConfig,
    service::generator::{GenerationRequest, GeneratorError, ImageGenerator},
};

/// Time bound and retry schedule for image generator calls.
#[derive(Debug, Clone)]
pub struct GenerationPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of a single backoff, jitter included.
    pub max_delay: Duration,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl From<&GenerationConfig> for GenerationPolicy {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_attempts: config.max_attempts.max(1),
            base_delay: config.retry_delay,
            max_delay: config.max_retry_delay.max(config.retry_delay),
        }
    }
}

impl GenerationPolicy {
    /// Delay before retrying after the given failed attempt: exponential, plus up to half the
    /// base delay of jitter, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let jitter_cap = (self.base_delay.as_millis() / 2) as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_cap)
        };

        (exponential + Duration::from_millis(jitter)).min(self.max_delay)
    }

    pub async fn run(
        &self,
        generator: &dyn ImageGenerator,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, GeneratorError> {
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.timeout, generator.generate(request)).await {
                Ok(result) => result,
                Err(_) => Err(GeneratorError::Timeout(self.timeout)),
            };

            match result {
                Ok(urls) => return Ok(urls),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "Generation attempt {}/{} failed, retrying in {:?}: {}",
                        attempt, self.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
