use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// Flat directory of uploaded files, addressed by generated names.
///
/// Files are stored at `{dir}/{name}` and handed back to callers as
/// `{public_prefix}{name}`, the path the server exposes them under.
pub struct UploadStore {
    dir: PathBuf,
    public_prefix: String,
}

impl UploadStore {
    pub async fn new(dir: PathBuf, public_prefix: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        info!("Upload directory: {}", dir.display());
        Ok(Self {
            dir,
            public_prefix: public_prefix.into(),
        })
    }

    /// Write `data` under `name` (already sanitized) and return its public path.
    /// An existing file with the same name is replaced.
    pub async fn save(&self, name: &str, data: &[u8]) -> Result<String> {
        let path = self.dir.join(name);
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(format!("{}{}", self.public_prefix, name))
    }
}

/// Reduce a client-supplied file name to a safe flat name: only the last path
/// component is kept, whitespace becomes `_`, and anything outside
/// `[A-Za-z0-9._-]` is dropped. Leading and trailing dots and underscores
/// are stripped.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c),
            '.' | '-' | '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name("cat.png"), "cat.png");
        assert_eq!(sanitize_file_name("my-photo_2.jpeg"), "my-photo_2.jpeg");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic.png"), "pic.png");
    }

    #[test]
    fn sanitize_replaces_whitespace_and_drops_the_rest() {
        assert_eq!(sanitize_file_name("my cat.png"), "my_cat.png");
        assert_eq!(sanitize_file_name("фото.png"), "png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name("dir/"), "file");
    }

    #[tokio::test]
    async fn save_returns_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), "static/uploads/")
            .await
            .unwrap();

        let public = store.save("a.txt", b"hello").await.unwrap();
        assert_eq!(public, "static/uploads/a.txt");
        assert_eq!(
            std::fs::read(dir.path().join("uploads").join("a.txt")).unwrap(),
            b"hello"
        );
    }
}
