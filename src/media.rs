use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::{error::Error, IMAGE_EXTENSIONS, RECIPE_IMAGE_DIR};

/// Recipe pictures on disk, below the media root. Stored paths are relative
/// to the root so they can be served from `/media`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decodes a `data:image/<ext>;base64,<payload>` value and writes it under a
    /// fresh name. Returns the stored path relative to the root.
    pub async fn save_data_uri(&self, data: &str) -> Result<String, Error> {
        let (extension, bytes) = decode_data_uri(data)?;
        let relative = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", Uuid::new_v4());
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Fatal(format!("Could not create {parent:?}: {e}")))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Fatal(format!("Could not write {path:?}: {e}")))?;

        log::debug!("Stored image {relative}");
        Ok(relative)
    }

    /// Best effort; a missing file is not an error.
    pub async fn remove(&self, relative: &str) {
        if relative.is_empty() || relative.contains("..") {
            return;
        }
        let path = self.root.join(relative);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::debug!("Removed image {relative}"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove {path:?}: {e}"),
        }
    }
}

pub fn decode_data_uri(data: &str) -> Result<(String, Vec<u8>), Error> {
    let invalid = || Error::field("image", "Expected a base64 encoded data:image/... value.");

    let (header, payload) = data.trim().split_once(";base64,").ok_or_else(invalid)?;
    let extension = header
        .strip_prefix("data:image/")
        .ok_or_else(invalid)?
        .to_lowercase();

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::field(
            "image",
            &format!("Unsupported image type \"{extension}\"."),
        ));
    }

    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(Error::field("image", "The submitted image is empty."));
    }

    Ok((extension, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn data_uris_are_decoded() {
        let (extension, bytes) = decode_data_uri(PIXEL).unwrap();
        assert_eq!(extension, "png");
        assert_eq!(bytes, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn foreign_payloads_are_field_errors() {
        for data in [
            "iVBORw0KGgo=",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png;base64,!!!",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(decode_data_uri(data), Err(Error::Validation(_))),
                "{data} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn images_land_below_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let relative = store.save_data_uri(PIXEL).await.unwrap();
        assert!(relative.starts_with(RECIPE_IMAGE_DIR));
        assert!(relative.ends_with(".png"));

        let stored = dir.path().join(&relative);
        assert_eq!(std::fs::read(&stored).unwrap(), b"\x89PNG\r\n\x1a\n");

        store.remove(&relative).await;
        assert!(!stored.exists());
        store.remove(&relative).await;
    }
}
