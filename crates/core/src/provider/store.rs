//! Provider persistence.
//!
//! The store is injected into everything that reads or mutates providers.
//! Mutations go through [`ProviderStore::update`], a read-modify-write under
//! the store's lock, so concurrent aggregation rounds never overwrite each
//! other's field changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::{normalize_host, Provider};
use crate::config::validate_providers;

/// Errors from provider persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Provider not found: {0}")]
    NotFound(String),

    #[error("Failed to access provider file: {0}")]
    Io(String),

    #[error("Failed to encode providers: {0}")]
    Serialize(String),

    #[error("Invalid provider file: {0}")]
    Invalid(String),
}

/// In-place change applied to a stored provider.
pub type ProviderMutation<'a> = Box<dyn FnOnce(&mut Provider) + Send + 'a>;

/// Persisted provider list.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// All providers, in configuration order.
    async fn list(&self) -> Vec<Provider>;

    /// Look up a provider by name.
    async fn get(&self, name: &str) -> Option<Provider>;

    /// Insert a provider, or replace the one with the same name in place.
    async fn put(&self, provider: Provider) -> Result<(), StoreError>;

    /// Atomically mutate the named provider and return the stored result.
    async fn update<'a>(
        &self,
        name: &str,
        mutation: ProviderMutation<'a>,
    ) -> Result<Provider, StoreError>;

    /// Find a provider by host identity (scheme and trailing slash ignored).
    async fn find_by_host(&self, host: &str) -> Option<Provider> {
        let wanted = normalize_host(host);
        self.list()
            .await
            .into_iter()
            .find(|p| normalize_host(&p.host) == wanted)
    }
}

fn upsert(providers: &mut Vec<Provider>, provider: Provider) {
    match providers.iter_mut().find(|p| p.name == provider.name) {
        Some(existing) => *existing = provider,
        None => providers.push(provider),
    }
}

fn apply(
    providers: &mut [Provider],
    name: &str,
    mutation: ProviderMutation<'_>,
) -> Result<Provider, StoreError> {
    let provider = providers
        .iter_mut()
        .find(|p| p.name == name)
        .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
    mutation(provider);
    Ok(provider.clone())
}

/// Store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryProviderStore {
    providers: RwLock<Vec<Provider>>,
}

impl MemoryProviderStore {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            providers: RwLock::new(providers),
        }
    }
}

#[async_trait]
impl ProviderStore for MemoryProviderStore {
    async fn list(&self) -> Vec<Provider> {
        self.providers.read().await.clone()
    }

    async fn get(&self, name: &str) -> Option<Provider> {
        self.providers
            .read()
            .await
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    async fn put(&self, provider: Provider) -> Result<(), StoreError> {
        upsert(&mut *self.providers.write().await, provider);
        Ok(())
    }

    async fn update<'a>(
        &self,
        name: &str,
        mutation: ProviderMutation<'a>,
    ) -> Result<Provider, StoreError> {
        apply(&mut self.providers.write().await, name, mutation)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProvidersFile {
    #[serde(default)]
    providers: Vec<Provider>,
}

/// Store backed by a TOML file of `[[providers]]` tables.
///
/// Every mutation rewrites the file (temp file + rename) while the write
/// lock is held.
#[derive(Debug)]
pub struct TomlProviderStore {
    path: PathBuf,
    providers: RwLock<Vec<Provider>>,
}

impl TomlProviderStore {
    /// Open the store, starting empty when the file doesn't exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let providers = if path.exists() {
            let text =
                std::fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;
            let file: ProvidersFile =
                toml::from_str(&text).map_err(|e| StoreError::Invalid(e.to_string()))?;
            validate_providers(&file.providers)
                .map_err(|e| StoreError::Invalid(e.to_string()))?;
            file.providers
        } else {
            debug!(path = %path.display(), "Provider file missing, starting empty");
            Vec::new()
        };

        Ok(Self {
            path,
            providers: RwLock::new(providers),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, providers: &[Provider]) -> Result<(), StoreError> {
        let file = ProvidersFile {
            providers: providers.to_vec(),
        };
        let text = toml::to_string(&file).map_err(|e| StoreError::Serialize(e.to_string()))?;

        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        debug!(path = %self.path.display(), count = providers.len(), "Provider file written");
        Ok(())
    }
}

#[async_trait]
impl ProviderStore for TomlProviderStore {
    async fn list(&self) -> Vec<Provider> {
        self.providers.read().await.clone()
    }

    async fn get(&self, name: &str) -> Option<Provider> {
        self.providers
            .read()
            .await
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    async fn put(&self, provider: Provider) -> Result<(), StoreError> {
        let mut providers = self.providers.write().await;
        let mut next = providers.clone();
        upsert(&mut next, provider);
        self.persist(&next).await?;
        *providers = next;
        Ok(())
    }

    async fn update<'a>(
        &self,
        name: &str,
        mutation: ProviderMutation<'a>,
    ) -> Result<Provider, StoreError> {
        let mut providers = self.providers.write().await;
        let mut next = providers.clone();
        let updated = apply(&mut next, name, mutation)?;
        self.persist(&next).await?;
        *providers = next;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{IndexerSettings, Protocol};
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn newznab(name: &str, host: &str) -> Provider {
        Provider {
            name: name.to_string(),
            host: host.to_string(),
            enabled: true,
            priority: 0,
            protocol: Protocol::Newznab(IndexerSettings::default()),
        }
    }

    #[tokio::test]
    async fn test_memory_store_put_replaces_in_place() {
        let store = MemoryProviderStore::new(vec![
            newznab("a", "http://a.example"),
            newznab("b", "http://b.example"),
        ]);

        let mut replacement = newznab("a", "http://a2.example");
        replacement.priority = 9;
        store.put(replacement).await.unwrap();

        let list = store.list().await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "a");
        assert_eq!(list[0].priority, 9);
        assert_eq!(list[1].name, "b");
    }

    #[tokio::test]
    async fn test_memory_store_update_missing() {
        let store = MemoryProviderStore::default();
        let result = store.update("nope", Box::new(|p: &mut Provider| p.enabled = false)).await;
        assert!(matches!(result, Err(StoreError::NotFound(name)) if name == "nope"));
    }

    #[tokio::test]
    async fn test_find_by_host_ignores_scheme_and_slash() {
        let store = MemoryProviderStore::new(vec![newznab("a", "indexer.example/")]);
        let found = store.find_by_host("http://indexer.example").await;
        assert_eq!(found.map(|p| p.name), Some("a".to_string()));
        assert!(store.find_by_host("http://other.example").await.is_none());
    }

    #[tokio::test]
    async fn test_toml_store_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = TomlProviderStore::open(dir.path().join("providers.toml")).unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_toml_store_update_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("providers.toml");
        let store = assert_ok!(TomlProviderStore::open(&path));
        assert_ok!(store.put(newznab("a", "http://a.example")).await);

        let updated = assert_ok!(
            store
                .update(
                    "a",
                    Box::new(|p: &mut Provider| {
                        if let Some(settings) = p.indexer_mut() {
                            settings.caps.book_search = Some("book".to_string());
                        }
                    }),
                )
                .await
        );
        assert_eq!(updated.caps().unwrap().book_search.as_deref(), Some("book"));

        let reopened = TomlProviderStore::open(&path).unwrap();
        let a = reopened.get("a").await.unwrap();
        assert_eq!(a.caps().unwrap().book_search.as_deref(), Some("book"));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[tokio::test]
    async fn test_toml_store_rejects_duplicate_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("providers.toml");
        std::fs::write(
            &path,
            r#"
[[providers]]
name = "dup"
host = "http://a.example"
kind = "rss"

[[providers]]
name = "dup"
host = "http://b.example"
kind = "rss"
"#,
        )
        .unwrap();

        let result = TomlProviderStore::open(&path);
        assert!(matches!(result, Err(StoreError::Invalid(_))));
    }
}
