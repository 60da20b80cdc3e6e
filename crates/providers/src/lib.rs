//! Model provider implementations for Stepwise.
//!
//! All providers implement the `stepwise_core::Provider` trait.

pub mod anthropic;

use std::sync::Arc;
use std::time::Duration;

use stepwise_config::AppConfig;
use stepwise_core::error::ProviderError;
use stepwise_core::provider::Provider;

pub use anthropic::AnthropicProvider;

/// Build the configured provider.
///
/// Fails when the provider is unknown or no API key is available.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

    match config.provider.as_str() {
        "anthropic" | "claude" => {
            let mut provider = AnthropicProvider::new(api_key)
                .with_timeout(Duration::from_secs(config.agent.request_timeout_secs));
            if let Some(url) = &config.api_url {
                provider = provider.with_base_url(url);
            }
            tracing::debug!(provider = "anthropic", model = %config.model, "Provider ready");
            Ok(Arc::new(provider))
        }
        other => Err(ProviderError::NotConfigured(format!(
            "unknown provider '{other}' (supported: anthropic)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_api_key() {
        let config = AppConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn build_anthropic() {
        let config = AppConfig {
            api_key: Some("sk-ant-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            provider: "mystery".into(),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("mystery"));
    }
}
