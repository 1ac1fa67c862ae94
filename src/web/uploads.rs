//! Upload sink for record images.
//!
//! Validates the extension against an allow-list, stores the bytes under a
//! prefixed, timestamped name and returns the URL that gets written
//! verbatim into the owning record. Content is not inspected; only the
//! extension string is checked.

use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, SiteError};

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Extension of the filename if it is on the allow-list
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit_once('.')?.1.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Strip a client-supplied filename down to a safe name
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Leading dots would make hidden files
    cleaned.trim_start_matches('.').to_string()
}

/// Store uploaded bytes and return the public URL.
///
/// The stored name is `{prefix}_{owner_id}_{ts}_{sanitized}`; the timestamp
/// keeps browser caches from serving a replaced image.
pub async fn store_upload(
    upload_dir: &Path,
    prefix: &str,
    owner_id: &str,
    original_name: &str,
    bytes: &[u8],
) -> Result<String> {
    if original_name.is_empty() {
        return Err(SiteError::UploadRejected {
            reason: "no file name".to_string(),
        });
    }
    if allowed_extension(original_name).is_none() {
        return Err(SiteError::UploadRejected {
            reason: format!(
                "file type not allowed (only {})",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        });
    }

    let filename = format!(
        "{}_{}_{}_{}",
        prefix,
        owner_id,
        chrono::Utc::now().timestamp(),
        sanitize_filename(original_name)
    );

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| SiteError::StoreSave {
            path: upload_dir.display().to_string(),
            source: e,
        })?;

    let filepath = upload_dir.join(&filename);
    tokio::fs::write(&filepath, bytes)
        .await
        .map_err(|e| SiteError::StoreSave {
            path: filepath.display().to_string(),
            source: e,
        })?;

    info!("Stored upload {}", filepath.display());
    Ok(format!("/uploads/{}", filename))
}

/// Delete a stored asset by its public URL, e.g. after a rejected
/// moderation. Unknown URLs are ignored.
pub async fn remove_upload(upload_dir: &Path, url: &str) {
    let Some(filename) = url.strip_prefix("/uploads/") else {
        return;
    };
    // The stored name was sanitized, so a path separator means tampering
    if filename.contains('/') || filename.contains("..") {
        warn!("Refusing to remove suspicious upload url: {}", url);
        return;
    }
    if let Err(e) = tokio::fs::remove_file(upload_dir.join(filename)).await {
        warn!("Could not remove upload {}: {}", filename, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_allow_list() {
        assert_eq!(allowed_extension("car.PNG").as_deref(), Some("png"));
        assert_eq!(allowed_extension("photo.webp").as_deref(), Some("webp"));
        assert!(allowed_extension("script.svg").is_none());
        assert!(allowed_extension("noextension").is_none());
        assert!(allowed_extension("archive.tar.gz").is_none());
    }

    #[test]
    fn test_sanitize_strips_paths_and_hidden_prefix() {
        let traversal = sanitize_filename("../../etc/passwd");
        assert!(!traversal.contains('/'));
        assert!(!traversal.starts_with('.'));
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename("räce day!.jpg"), "r_ce_day_.jpg");
    }

    #[tokio::test]
    async fn test_store_and_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let url = store_upload(dir.path(), "driver", "42", "face.png", b"fake")
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/driver_42_"));
        assert!(url.ends_with("_face.png"));
        let filename = url.strip_prefix("/uploads/").unwrap();
        assert!(dir.path().join(filename).exists());

        remove_upload(dir.path(), &url).await;
        assert!(!dir.path().join(filename).exists());
    }

    #[tokio::test]
    async fn test_bad_extension_rejected_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let result = store_upload(dir.path(), "driver", "42", "payload.exe", b"x").await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
