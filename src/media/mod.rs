use std::path::PathBuf;

use crate::utils::error::AppError;

/// Subdirectories under the media root.
pub const COVERS: &str = "covers";
pub const GUESTS: &str = "guests";
pub const GALLERY: &str = "gallery";
pub const VOUCHERS: &str = "vouchers";

/// Disk-backed store for uploaded and generated images. Stored paths are
/// relative to the media root; URL resolution happens at projection time.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Writes `bytes` under `<root>/<subdir>/<file_name>` and returns the
    /// relative path to persist.
    pub async fn save(
        &self,
        subdir: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(file_name), bytes).await?;
        Ok(format!("{}/{}", subdir, file_name))
    }
}

/// Resolves a stored media path to the URL clients should fetch: absolute
/// when a public base URL is configured, relative otherwise.
pub fn media_url(public_base: Option<&str>, path: &str) -> String {
    let relative = format!("/media/{}", path);
    match public_base {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), relative),
        None => relative,
    }
}

/// Keeps the original extension but replaces the stem with a fresh UUID, so
/// uploads can never collide or escape the media directory.
pub fn unique_file_name(original: &str) -> String {
    let extension = original
        .rsplit('.')
        .next()
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= 8
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && original.contains('.')
        })
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
        None => uuid::Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_is_relative_without_base() {
        assert_eq!(
            media_url(None, "vouchers/booking_1_qr.png"),
            "/media/vouchers/booking_1_qr.png"
        );
    }

    #[test]
    fn media_url_absolutizes_and_trims_trailing_slash() {
        assert_eq!(
            media_url(Some("http://localhost:3001/"), "covers/a.png"),
            "http://localhost:3001/media/covers/a.png"
        );
    }

    #[test]
    fn unique_file_name_keeps_safe_extension() {
        let name = unique_file_name("party.PNG");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn unique_file_name_drops_suspicious_extension() {
        let name = unique_file_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
    }

    #[test]
    fn unique_file_name_handles_no_extension() {
        let name = unique_file_name("cover");
        assert_eq!(name.len(), 36);
    }
}
