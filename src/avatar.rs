//! Avatar storage.
//!
//! An upload is written to the temp directory, decoded, resized to a square,
//! encoded into a second temp file, and only then renamed into the avatars
//! directory. A failure at any step leaves no file under the final name.

use crate::config::AppConfig;
use crate::error::ApiError;

use image::{imageops::FilterType, ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Public URL prefix avatars are served under.
pub const AVATARS_URL_PREFIX: &str = "avatars";

/// A file received from the client
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Default avatar for a new account: a Gravatar identicon keyed on the email.
pub fn default_avatar_url(email: &str, size: u32) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?s={}&d=identicon",
        hex::encode(digest),
        size
    )
}

/// Decode `source`, resize it to exactly `width`x`height`, and write it to
/// `destination` in the format detected from its content, which is returned.
pub fn normalize(
    source: &Path,
    destination: &Path,
    width: u32,
    height: u32,
) -> Result<ImageFormat, image::ImageError> {
    let reader = ImageReader::open(source)?.with_guessed_format()?;
    let format = reader.format().unwrap_or(ImageFormat::Png);
    let resized = reader.decode()?.resize_exact(width, height, FilterType::Lanczos3);
    resized.save_with_format(destination, format)?;
    Ok(format)
}

/// Keep only the final path component and a conservative character set.
fn sanitize_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "avatar".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Published file name: the sanitized stem with the extension of the format
/// actually written, so the served content type matches the bytes.
fn published_name(user_id: Uuid, original: &str, format: ImageFormat) -> String {
    let sanitized = sanitize_file_name(original);
    let stem = Path::new(&sanitized)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("avatar");
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    format!("{user_id}_{stem}.{extension}")
}

/// Writes normalized avatars into the public avatars directory
#[derive(Debug, Clone)]
pub struct AvatarStorage {
    avatars_dir: PathBuf,
    temp_dir: PathBuf,
    size: u32,
}

impl AvatarStorage {
    pub fn new(avatars_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            avatars_dir: avatars_dir.into(),
            temp_dir: temp_dir.into(),
            size,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.avatars_dir, &config.temp_dir, config.avatar_size)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.avatars_dir).await?;
        tokio::fs::create_dir_all(&self.temp_dir).await
    }

    /// Store `upload` for `user_id`; returns the public avatar reference.
    pub async fn store(&self, user_id: Uuid, upload: AvatarUpload) -> Result<String, ApiError> {
        self.ensure_dirs().await?;

        let scratch = Uuid::new_v4().simple().to_string();
        let raw_path = self.temp_dir.join(format!("{scratch}.upload"));
        let staged_path = self.temp_dir.join(format!("{scratch}.staged"));

        tokio::fs::write(&raw_path, &upload.bytes).await?;

        let size = self.size;
        let (source, destination) = (raw_path.clone(), staged_path.clone());
        let normalized =
            tokio::task::spawn_blocking(move || normalize(&source, &destination, size, size)).await;

        remove_quietly(&raw_path).await;

        let outcome = match normalized {
            Ok(Ok(format)) => {
                let file_name = published_name(user_id, &upload.file_name, format);
                tokio::fs::rename(&staged_path, self.avatars_dir.join(&file_name))
                    .await
                    .map(|()| file_name)
                    .map_err(ApiError::from)
            }
            Ok(Err(err)) => Err(err.into()),
            Err(err) => Err(err.into()),
        };

        match outcome {
            Ok(file_name) => Ok(format!("{AVATARS_URL_PREFIX}/{file_name}")),
            Err(err) => {
                remove_quietly(&staged_path).await;
                Err(err)
            }
        }
    }

    /// Delete a previously published avatar. References outside the avatars
    /// directory, such as the Gravatar default, are left alone.
    pub async fn discard(&self, reference: &str) {
        let Some(file_name) = reference
            .strip_prefix(AVATARS_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return;
        };

        if file_name.is_empty() || Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
            tracing::warn!(reference = %reference, "Refusing to discard avatar outside the avatars directory");
            return;
        }

        remove_quietly(&self.avatars_dir.join(file_name)).await;
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "Failed to remove temp file: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 30, 30]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn storage(root: &Path) -> AvatarStorage {
        AvatarStorage::new(root.join("avatars"), root.join("tmp"), 250)
    }

    #[test]
    fn test_default_avatar_is_deterministic() {
        let a = default_avatar_url("User@Example.com ", 250);
        let b = default_avatar_url("user@example.com", 250);
        assert_eq!(a, b);
        assert!(a.contains("d=identicon"));
        assert_ne!(a, default_avatar_url("other@example.com", 250));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("photo.png"), "photo.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name(""), "avatar");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }

    #[tokio::test]
    async fn test_store_resizes_and_publishes() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());
        let user_id = Uuid::new_v4();

        let url = storage
            .store(
                user_id,
                AvatarUpload {
                    file_name: "me.png".into(),
                    bytes: png_bytes(640, 480),
                },
            )
            .await
            .unwrap();

        assert_eq!(url, format!("avatars/{user_id}_me.png"));
        let stored = image::open(root.path().join("avatars").join(format!("{user_id}_me.png"))).unwrap();
        assert_eq!((stored.width(), stored.height()), (250, 250));

        let leftovers = std::fs::read_dir(root.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_published_name_follows_detected_format() {
        let user_id = Uuid::new_v4();
        assert_eq!(published_name(user_id, "me.gif", ImageFormat::Png), format!("{user_id}_me.png"));
        assert_eq!(published_name(user_id, "me.png", ImageFormat::Jpeg), format!("{user_id}_me.jpg"));
        assert_eq!(published_name(user_id, "selfie", ImageFormat::Png), format!("{user_id}_selfie.png"));
        assert_eq!(published_name(user_id, "", ImageFormat::Png), format!("{user_id}_avatar.png"));
    }

    #[tokio::test]
    async fn test_store_names_file_after_content_format() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());
        let user_id = Uuid::new_v4();

        let url = storage
            .store(
                user_id,
                AvatarUpload {
                    file_name: "me.gif".into(),
                    bytes: png_bytes(32, 32),
                },
            )
            .await
            .unwrap();

        assert_eq!(url, format!("avatars/{user_id}_me.png"));
        let stored = root.path().join("avatars").join(format!("{user_id}_me.png"));
        assert_eq!(ImageFormat::from_path(&stored).unwrap(), ImageFormat::Png);
        assert_eq!(image::open(&stored).unwrap().width(), 250);
    }

    #[tokio::test]
    async fn test_discard_only_touches_published_avatars() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());
        let user_id = Uuid::new_v4();

        let url = storage
            .store(
                user_id,
                AvatarUpload {
                    file_name: "me.png".into(),
                    bytes: png_bytes(16, 16),
                },
            )
            .await
            .unwrap();
        let outside = root.path().join("keep.txt");
        std::fs::write(&outside, b"keep").unwrap();

        storage.discard("https://www.gravatar.com/avatar/abc?s=250&d=identicon").await;
        storage.discard("avatars/../keep.txt").await;
        assert!(outside.exists());

        storage.discard(&url).await;
        assert_eq!(std::fs::read_dir(root.path().join("avatars")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_store_fails_atomically_on_bad_image() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());
        let user_id = Uuid::new_v4();

        let err = storage
            .store(
                user_id,
                AvatarUpload {
                    file_name: "me.png".into(),
                    bytes: b"definitely not an image".to_vec(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(std::fs::read_dir(root.path().join("avatars")).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(root.path().join("tmp")).unwrap().count(), 0);
    }
}
