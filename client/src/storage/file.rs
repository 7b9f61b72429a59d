use crate::error::{ClientError, ClientResult};
use crate::storage::traits::KeyValueStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Key-value store backed by a single JSON object on disk
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> ClientResult<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    // Start over empty; the next save replaces the file
                    let aside = self.path.with_extension("corrupt");
                    tracing::warn!(
                        "Store {} is unreadable ({}), moving it to {}",
                        self.path.display(),
                        e,
                        aside.display()
                    );
                    if let Err(e) = tokio::fs::rename(&self.path, &aside).await {
                        tracing::warn!("Could not move aside {}: {}", self.path.display(), e);
                    }
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(ClientError::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Write to a sibling temp file, then rename over the store
    async fn save(&self, entries: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let contents = serde_json::to_vec_pretty(entries)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, contents).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn set_many(&self, pairs: &[(&str, &str)]) -> ClientResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.to_string());
        }
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        self.remove_many(&[key]).await
    }

    async fn remove_many(&self, keys: &[&str]) -> ClientResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.save(&entries).await
    }
}
