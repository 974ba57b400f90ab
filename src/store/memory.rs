use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::RwLock;

use crate::store::{Binding, CredentialStore};

#[derive(Debug, Default)]
struct Rows {
    next_id: u64,
    bindings: Vec<Binding>,
}

/// In-process store, used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Rows>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    async fn insert(&self, mut binding: Binding) -> Result<Binding> {
        let mut rows = self.inner.write().await;
        rows.next_id += 1;
        binding.id = rows.next_id;
        rows.bindings.push(binding.clone());
        Ok(binding)
    }

    async fn update(&self, binding: &Binding) -> Result<()> {
        let mut rows = self.inner.write().await;
        let slot = rows
            .bindings
            .iter_mut()
            .find(|b| b.id == binding.id)
            .ok_or_else(|| anyhow!("binding {} not found", binding.id))?;
        *slot = binding.clone();
        Ok(())
    }

    async fn query_by_principal(&self, chat_identity: &str) -> Result<Vec<Binding>> {
        let rows = self.inner.read().await;
        Ok(rows
            .bindings
            .iter()
            .filter(|b| b.chat_identity == chat_identity)
            .cloned()
            .collect())
    }

    async fn query_all(&self) -> Result<Vec<Binding>> {
        Ok(self.inner.read().await.bindings.clone())
    }
}
