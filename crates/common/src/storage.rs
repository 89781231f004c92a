//! File storage for uploaded post images.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::{AppError, AppResult, IdGenerator};

/// Stored file metadata.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Storage key (path relative to the media root), e.g. `posts/cat.gif`.
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write a file under an exact key unless that key is already taken.
    ///
    /// Returns `None` when a file with the key exists; it is left untouched.
    async fn upload_new(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<Option<StoredFile>>;

    /// Delete a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Write a file into `dir` under its own (sanitized) name, adding a
    /// random suffix when that name is already taken.
    async fn save_available(
        &self,
        dir: &str,
        file_name: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<StoredFile> {
        let id_gen = IdGenerator::new();
        let name = sanitize_file_name(file_name);
        let mut key = format!("{}/{name}", dir.trim_end_matches('/'));

        loop {
            if let Some(stored) = self.upload_new(&key, data, content_type).await? {
                return Ok(stored);
            }
            key = unique_storage_key(dir, &name, &id_gen.generate_suffix());
        }
    }
}

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Root directory files are written under.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(AppError::BadRequest(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload_new(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<Option<StoredFile>> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(AppError::Storage(format!("Failed to create file: {e}"))),
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::Storage(format!("Failed to write file: {e}")));
        }

        let md5 = format!("{:x}", md5::compute(data));
        tracing::debug!(key = %key, size = data.len(), "Stored file");

        Ok(Some(StoredFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        }))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// Reduce an uploaded file name to a safe base name.
///
/// Directory components are dropped, whitespace becomes `_` and anything
/// outside `[A-Za-z0-9._-]` is removed.
#[must_use]
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Build `dir/stem_suffix.ext` for a name that is already taken.
#[must_use]
pub fn unique_storage_key(dir: &str, file_name: &str, suffix: &str) -> String {
    let dir = dir.trim_end_matches('/');
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => {
            let (stem, ext) = file_name.split_at(pos);
            format!("{dir}/{stem}_{suffix}{ext}")
        }
        _ => format!("{dir}/{file_name}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> LocalStorage {
        let dir = std::env::temp_dir().join(format!("yatube-storage-{}", IdGenerator::new().generate()));
        LocalStorage::new(dir, "/media".to_string())
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("image.gif"), "image.gif");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_file_name("кот.jpg"), "jpg");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn test_unique_storage_key() {
        assert_eq!(
            unique_storage_key("posts", "image.gif", "abc1234"),
            "posts/image_abc1234.gif"
        );
        assert_eq!(
            unique_storage_key("posts/", "README", "abc1234"),
            "posts/README_abc1234"
        );
    }

    #[test]
    fn test_public_url() {
        let storage = LocalStorage::new(PathBuf::from("/tmp"), "/media/".to_string());
        assert_eq!(storage.public_url("posts/a.gif"), "/media/posts/a.gif");
    }

    #[tokio::test]
    async fn test_save_available_keeps_existing_files() {
        let storage = temp_storage();

        let first = storage
            .save_available("posts", "image.gif", b"GIF89a", "image/gif")
            .await
            .unwrap();
        let second = storage
            .save_available("posts", "image.gif", b"GIF89a", "image/gif")
            .await
            .unwrap();

        assert_eq!(first.key, "posts/image.gif");
        assert_ne!(second.key, first.key);
        assert!(second.key.starts_with("posts/image_"));
        let root = storage.base_path();
        assert!(tokio::fs::try_exists(root.join(&first.key)).await.unwrap());
        assert!(tokio::fs::try_exists(root.join(&second.key)).await.unwrap());

        storage.delete(&first.key).await.unwrap();
        assert!(!tokio::fs::try_exists(root.join(&first.key)).await.unwrap());

        let _ = tokio::fs::remove_dir_all(storage.base_path()).await;
    }

    #[tokio::test]
    async fn test_upload_new_never_overwrites() {
        let storage = temp_storage();

        let first = storage
            .upload_new("posts/a.gif", b"first", "image/gif")
            .await
            .unwrap();
        let second = storage
            .upload_new("posts/a.gif", b"second", "image/gif")
            .await
            .unwrap();

        assert_eq!(first.unwrap().key, "posts/a.gif");
        assert!(second.is_none());
        let data = tokio::fs::read(storage.base_path().join("posts/a.gif"))
            .await
            .unwrap();
        assert_eq!(data, b"first");

        let _ = tokio::fs::remove_dir_all(storage.base_path()).await;
    }

    #[tokio::test]
    async fn test_concurrent_saves_get_distinct_keys() {
        let storage = temp_storage();

        let (a, b) = tokio::join!(
            storage.save_available("posts", "race.gif", b"aaaa", "image/gif"),
            storage.save_available("posts", "race.gif", b"bbbb", "image/gif"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.key, b.key);
        let root = storage.base_path();
        assert_eq!(tokio::fs::read(root.join(&a.key)).await.unwrap(), b"aaaa");
        assert_eq!(tokio::fs::read(root.join(&b.key)).await.unwrap(), b"bbbb");

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let storage = temp_storage();
        let result = storage.upload_new("../escape.txt", b"x", "text/plain").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
