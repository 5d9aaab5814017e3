use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::error::ClipstackResult;

/// Object-storage seam for the pipeline's ingest/finalize boundary. The core
/// transform and encode stages never see this trait; only the coordinator
/// moves bytes in and out of a store.
pub trait ObjectStore: Send + Sync {
    fn list(&self, prefix: &str) -> ClipstackResult<Vec<String>>;
    fn download(&self, key: &str, local_path: &Path) -> ClipstackResult<()>;
    fn upload(&self, local_path: &Path, key: &str) -> ClipstackResult<()>;
    fn delete(&self, key: &str) -> ClipstackResult<()>;
}

/// Directory-rooted store. Keys are relative paths under the root; it stands
/// in for a bucket in local and test runs.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FsObjectStore {
    fn list(&self, prefix: &str) -> ClipstackResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) if dir == self.root => return Ok(keys),
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("list '{}'", dir.display()))
                        .into());
                }
            };
            for entry in entries {
                let path = entry
                    .with_context(|| format!("read entry under '{}'", dir.display()))?
                    .path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let key = path
                    .strip_prefix(&self.root)
                    .expect("entry is under the store root")
                    .to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "/");
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn download(&self, key: &str, local_path: &Path) -> ClipstackResult<()> {
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create '{}'", parent.display()))?;
        }
        std::fs::copy(self.key_path(key), local_path)
            .with_context(|| format!("download object '{key}'"))?;
        Ok(())
    }

    fn upload(&self, local_path: &Path, key: &str) -> ClipstackResult<()> {
        let dest = self.key_path(key);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create '{}'", parent.display()))?;
        }
        std::fs::copy(local_path, &dest)
            .with_context(|| format!("upload '{}' as '{key}'", local_path.display()))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> ClipstackResult<()> {
        std::fs::remove_file(self.key_path(key))
            .with_context(|| format!("delete object '{key}'"))?;
        Ok(())
    }
}
