//! Credential store module
//!
//! Durable keyed storage for bindings. The workflows only see the
//! `CredentialStore` trait; the concrete engine is picked at startup.

use anyhow::Result;

pub mod binding;
pub mod file;
pub mod memory;

pub use binding::{subject_digest, Binding};
pub use file::JsonFileStore;
pub use memory::MemoryStore;

pub trait CredentialStore: Send + Sync {
    /// Persists a new binding, returns it with its store-assigned id.
    fn insert(&self, binding: Binding) -> impl std::future::Future<Output = Result<Binding>> + Send;

    /// Replaces the stored binding with the same id.
    fn update(&self, binding: &Binding) -> impl std::future::Future<Output = Result<()>> + Send;

    fn query_by_principal(
        &self,
        chat_identity: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Binding>>> + Send;

    fn query_all(&self) -> impl std::future::Future<Output = Result<Vec<Binding>>> + Send;
}
