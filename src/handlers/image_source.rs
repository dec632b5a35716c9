use anyhow::Result;
use std::path::Path;

use crate::models::{ChosenImage, SessionState, MAX_UPLOAD_BYTES};

/// Single entry point for changing the chosen image.
///
/// File picker, drag-and-drop and camera confirmation all go through
/// `set_image`, so a new image always invalidates the previous result.
#[derive(Debug, Clone, Copy)]
pub struct ImageSourceManager {
    max_upload_bytes: usize,
}

impl Default for ImageSourceManager {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl ImageSourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the chosen image and clear message + result.
    /// Returns false (and changes nothing) when `image` is `None`.
    pub fn set_image(&self, session: &mut SessionState, image: Option<ChosenImage>) -> bool {
        let Some(image) = image else {
            return false;
        };

        log::info!(
            "🖼️ Chosen image: {} ({} bytes, {})",
            image.display_name(),
            image.size(),
            image.media_type
        );
        if image.size() > self.max_upload_bytes {
            // Servis 10MB üstünü reddediyor, yine de denemeye izin ver
            log::warn!(
                "⚠️ {} is {:.2} MB, larger than the service accepts",
                image.display_name(),
                image.size_mb()
            );
        }

        if log::log_enabled!(log::Level::Debug) {
            let data_url = image.data_url();
            log::debug!(
                "🖼️ Preview data URL: {}... (first 100 chars)",
                &data_url[..100.min(data_url.len())]
            );
        }

        session.image = Some(image);
        session.clear_feedback();
        true
    }

    /// File picker path: read the file and publish it as-is.
    pub async fn select_file(&self, session: &mut SessionState, path: &Path) -> Result<bool> {
        let image = ChosenImage::from_path(path).await?;
        Ok(self.set_image(session, Some(image)))
    }

    /// Drag-and-drop path: only the first item is considered, and only if it
    /// declares an `image/*` media type. Anything else is ignored silently.
    pub fn accept_drop(&self, session: &mut SessionState, items: Vec<ChosenImage>) -> bool {
        let Some(first) = items.into_iter().next() else {
            return false;
        };

        if !first.is_image() {
            log::debug!(
                "Ignoring dropped {} ({})",
                first.display_name(),
                first.media_type
            );
            return false;
        }

        self.set_image(session, Some(first))
    }

    /// Drop a file from disk, declaring its media type from the extension.
    pub async fn drop_file(&self, session: &mut SessionState, path: &Path) -> Result<bool> {
        let image = ChosenImage::from_path(path).await?;
        Ok(self.accept_drop(session, vec![image]))
    }
}
