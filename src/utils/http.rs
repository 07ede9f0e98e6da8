use reqwest::{Client, ClientBuilder, Proxy};
use std::time::Duration;

use crate::config::HttpConfig;

pub const DEFAULT_USER_AGENT: &str = concat!("dalle-bot/", env!("CARGO_PKG_VERSION"));

pub fn create_telegram_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .user_agent(DEFAULT_USER_AGENT);

    build_client(builder, config.proxy_url.as_deref())
}

/// Client for the image API. The per-request deadline is enforced by the generation policy,
/// so only the connect phase is bounded here.
pub fn create_openai_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(DEFAULT_USER_AGENT);

    build_client(builder, config.proxy_url.as_deref())
}

fn build_client(builder: ClientBuilder, proxy_url: Option<&str>) -> Result<Client, reqwest::Error> {
    match proxy_url {
        Some(proxy_url) => {
            info!("Configuring HTTP client with proxy");
            builder.proxy(Proxy::all(proxy_url)?).build()
        }
        None => builder.build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_clients() {
        assert!(create_telegram_client(&HttpConfig::default()).is_ok());

        let config = HttpConfig {
            proxy_url: Some("socks5://127.0.0.1:1080".to_string()),
        };
        assert!(create_openai_client(&config).is_ok());
    }

    #[test]
    fn test_invalid_proxy() {
        let config = HttpConfig {
            proxy_url: Some("not a url".to_string()),
        };
        assert!(create_openai_client(&config).is_err());
    }
}
