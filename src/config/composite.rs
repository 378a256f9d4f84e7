//! Layered configuration: earlier providers take priority.

use std::collections::BTreeSet;

use super::ConfigResult;
use super::provider::ConfigProvider;

pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a lower-priority layer.
    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl Default for CompositeConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for CompositeConfigProvider {
    fn name(&self) -> &str {
        "composite"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        for provider in &self.providers {
            if let Some(value) = provider.get_raw(key).await? {
                tracing::trace!(key, provider = provider.name(), "config value resolved");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Writes go to the highest-priority layer only.
    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        if let Some(provider) = self.providers.first() {
            provider.set_raw(key, value).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        let mut deleted = false;
        for provider in &self.providers {
            if provider.delete(key).await? {
                deleted = true;
            }
        }
        Ok(deleted)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut all = BTreeSet::new();
        for provider in &self.providers {
            all.extend(provider.list_keys(prefix).await?);
        }
        Ok(all.into_iter().collect())
    }
}

impl std::fmt::Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeConfigProvider")
            .field("providers", &self.provider_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;

    #[tokio::test]
    async fn test_first_layer_wins() {
        let composite = CompositeConfigProvider::new()
            .provider(Box::new(
                MemoryConfigProvider::named("overrides").value("max_turns", "2"),
            ))
            .provider(Box::new(
                MemoryConfigProvider::named("defaults")
                    .value("max_turns", "10")
                    .value("fail_fast", "true"),
            ));

        assert_eq!(
            composite.get_raw("max_turns").await.unwrap().as_deref(),
            Some("2")
        );
        assert_eq!(
            composite.get_raw("fail_fast").await.unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(composite.list_keys("").await.unwrap(), vec!["fail_fast", "max_turns"]);
    }

    #[tokio::test]
    async fn test_set_and_delete() {
        let composite = CompositeConfigProvider::new()
            .provider(Box::new(MemoryConfigProvider::new()))
            .provider(Box::new(MemoryConfigProvider::new().value("model", "m")));

        composite.set_raw("model", "override").await.unwrap();
        assert_eq!(
            composite.get_raw("model").await.unwrap().as_deref(),
            Some("override")
        );

        assert!(composite.delete("model").await.unwrap());
        assert_eq!(composite.get_raw("model").await.unwrap(), None);
    }
}
