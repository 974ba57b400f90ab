use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use fd_lock::RwLock as FileLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::store::{Binding, CredentialStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    next_id: u64,
    bindings: Vec<Binding>,
}

/// Bindings kept in one JSON document on disk.
///
/// The document is the only copy: every operation takes an exclusive lock on a
/// sibling `.lock` file, reads the document, and for writes replaces it through
/// a per-process `.tmp` file (created 0600 on unix) renamed over the original.
/// Separate processes on one path (`serve` and `bind`) always see each other's
/// writes and never hand out the same id.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    serial: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store and checks the document parses; a missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self { path: path.as_ref().to_path_buf(), serial: Mutex::new(()) };
        let count = store.transact(false, |doc| Ok(doc.bindings.len())).await?;
        debug!("credential store '{}' opened with {} bindings", store.path.display(), count);
        Ok(store)
    }

    /// Runs `apply` on a fresh read of the document under the file lock,
    /// writing the result back when `write` is set and `apply` succeeded.
    async fn transact<T, F>(&self, write: bool, apply: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut StoreDocument) -> Result<T> + Send + 'static,
    {
        let _serial = self.serial.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || locked_transact(&path, write, apply)).await?
    }
}

fn locked_transact<T>(
    path: &Path,
    write: bool,
    apply: impl FnOnce(&mut StoreDocument) -> Result<T>,
) -> Result<T> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating '{}'", parent.display()))?;
    }
    let lock_path = path.with_extension("lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("opening lock '{}'", lock_path.display()))?;
    let mut lock = FileLock::new(lock_file);
    let _guard = lock.write()?;

    let mut document = read_document(path)?;
    let value = apply(&mut document)?;
    if write {
        write_document(path, &document).with_context(|| format!("writing '{}'", path.display()))?;
    }
    Ok(value)
}

fn read_document(path: &Path) -> Result<StoreDocument> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(StoreDocument::default()),
        Ok(content) => serde_json::from_str(&content)
            .with_context(|| format!("corrupt credential store '{}'", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("credential store '{}' not found, starting empty", path.display());
            Ok(StoreDocument::default())
        }
        Err(err) => Err(err).with_context(|| format!("reading '{}'", path.display())),
    }
}

fn write_document(path: &Path, document: &StoreDocument) -> Result<()> {
    let content = serde_json::to_vec_pretty(document)?;
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    let mut file = create_private(&tmp)?;
    file.write_all(&content)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new().create(true).truncate(true).write(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).truncate(true).write(true).open(path)
}

impl CredentialStore for JsonFileStore {
    async fn insert(&self, mut binding: Binding) -> Result<Binding> {
        self.transact(true, move |doc| {
            doc.next_id += 1;
            binding.id = doc.next_id;
            doc.bindings.push(binding.clone());
            Ok(binding)
        })
        .await
    }

    async fn update(&self, binding: &Binding) -> Result<()> {
        let binding = binding.clone();
        self.transact(true, move |doc| {
            let slot = doc
                .bindings
                .iter_mut()
                .find(|b| b.id == binding.id)
                .ok_or_else(|| anyhow!("binding {} not found", binding.id))?;
            *slot = binding;
            Ok(())
        })
        .await
    }

    async fn query_by_principal(&self, chat_identity: &str) -> Result<Vec<Binding>> {
        let chat_identity = chat_identity.to_owned();
        self.transact(false, move |doc| {
            Ok(doc
                .bindings
                .iter()
                .filter(|b| b.chat_identity == chat_identity)
                .cloned()
                .collect())
        })
        .await
    }

    async fn query_all(&self) -> Result<Vec<Binding>> {
        self.transact(false, |doc| Ok(doc.bindings.clone())).await
    }
}
