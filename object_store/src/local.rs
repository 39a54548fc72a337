//! Filesystem-backed `ObjectStore`, used in development and in tests
//! where no real bucket is configured.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{error::ObjectStoreError, ObjectMeta, ObjectStore};

#[derive(Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), ObjectStoreError> {
        let path = self.path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        Ok(())
    }

    async fn signed_url(&self, bucket: &str, key: &str, _ttl_days: u32) -> Result<String, ObjectStoreError> {
        let path = self.path(bucket, key);
        Ok(format!("file://{}", path.display()))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.path(bucket, key);
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|_| ObjectStoreError::NotFound(bucket.to_string(), key.to_string()))
    }

    async fn list(&self, bucket: &str) -> Result<Vec<ObjectMeta>, ObjectStoreError> {
        let dir = self.root.join(bucket);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            let modified: DateTime<Utc> = metadata.modified()?.into();
            objects.push(ObjectMeta {
                key: entry.file_name().to_string_lossy().into_owned(),
                last_modified: modified,
            });
        }
        Ok(objects)
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.path(bucket, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("smi-images", "a.png", Bytes::from_static(b"\x89PNG")).await.unwrap();
        let bytes = store.get("smi-images", "a.png").await.unwrap();
        assert_eq!(&bytes[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn signed_url_points_at_the_written_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("smi-images", "a.png", Bytes::from_static(b"x")).await.unwrap();
        let url = store.signed_url("smi-images", "a.png", 7).await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("a.png"));
    }

    #[tokio::test]
    async fn list_is_empty_for_an_unwritten_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.list("smi-images").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("smi-images", "a.png", Bytes::from_static(b"x")).await.unwrap();
        store.delete("smi-images", "a.png").await.unwrap();
        store.delete("smi-images", "a.png").await.unwrap();
        assert!(store.get("smi-images", "a.png").await.is_err());
    }
}
