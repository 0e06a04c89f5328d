//! Role mapping persistence.
//!
//! The rule model itself is synchronous. Loading and saving role mappings is the
//! only async boundary, behind the [`RoleMappingStore`] trait.

use crate::role_mapping::RoleMapping;
use crate::Result;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A place where role mappings are persisted.
#[async_trait]
pub trait RoleMappingStore: Send + Sync {
    /// Load a mapping by name.
    async fn load(&self, name: &str) -> Result<RoleMapping>;

    /// Create or update a mapping.
    async fn save(&self, mapping: &RoleMapping) -> Result<()>;

    /// List all mappings, sorted by name.
    async fn list(&self) -> Result<Vec<RoleMapping>>;

    /// Delete a mapping by name.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// A store that keeps mappings in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoleMappingStore {
    mappings: Arc<RwLock<HashMap<String, RoleMapping>>>,
}

impl InMemoryRoleMappingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given mappings.
    pub fn with_mappings(mappings: impl IntoIterator<Item = RoleMapping>) -> Self {
        let store = Self::new();
        {
            let mut map = store.mappings.write();
            for mapping in mappings {
                map.insert(mapping.name.clone(), mapping);
            }
        }
        store
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.mappings.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.mappings.read().is_empty()
    }
}

#[async_trait]
impl RoleMappingStore for InMemoryRoleMappingStore {
    async fn load(&self, name: &str) -> Result<RoleMapping> {
        self.mappings
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| crate::Error::not_found(name))
    }

    async fn save(&self, mapping: &RoleMapping) -> Result<()> {
        mapping.validate()?;
        self.mappings
            .write()
            .insert(mapping.name.clone(), mapping.clone());
        tracing::info!(name = %mapping.name, "Saved role mapping");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RoleMapping>> {
        let mut mappings: Vec<_> = self.mappings.read().values().cloned().collect();
        mappings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(mappings)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        match self.mappings.write().remove(name) {
            Some(_) => {
                tracing::info!(name = %name, "Deleted role mapping");
                Ok(())
            }
            None => Err(crate::Error::not_found(name)),
        }
    }
}
