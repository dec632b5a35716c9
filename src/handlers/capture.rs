use chrono::Utc;
use std::sync::Arc;

use crate::error::SessionError;
use crate::handlers::ImageSourceManager;
use crate::models::{CapturedStill, SessionState};
use crate::services::camera::{
    encode_jpeg, CameraDevice, CameraError, StreamRequest, VideoFrame, VideoStream, JPEG_QUALITY,
};

pub const STILL_READY_MESSAGE: &str = "Preview captured. Click \"Use Photo\" to attach.";
pub const STILL_ATTACHED_MESSAGE: &str = "Camera photo attached.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Closed,
    Open,
    OpenWithStill,
}

/// Owns the camera stream and the pending still.
///
/// `Closed -> start -> Open -> capture_still -> OpenWithStill -> confirm_still -> Open`,
/// and `stop` returns to `Closed` from any state.
pub struct MediaCaptureController {
    device: Arc<dyn CameraDevice>,
    sources: ImageSourceManager,
    stream: Option<Box<dyn VideoStream>>,
    still: Option<CapturedStill>,
    quality: u8,
}

impl MediaCaptureController {
    pub fn new(device: Arc<dyn CameraDevice>, sources: ImageSourceManager) -> Self {
        Self {
            device,
            sources,
            stream: None,
            still: None,
            quality: JPEG_QUALITY,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    pub fn state(&self) -> CaptureState {
        match (&self.stream, &self.still) {
            (None, _) => CaptureState::Closed,
            (Some(_), None) => CaptureState::Open,
            (Some(_), Some(_)) => CaptureState::OpenWithStill,
        }
    }

    pub fn still(&self) -> Option<&CapturedStill> {
        self.still.as_ref()
    }

    /// Ask the device for a rear-facing video stream.
    ///
    /// Already open: nothing happens. Device failures land in the session
    /// status and leave the chosen image and result alone.
    pub async fn start(&mut self, session: &mut SessionState) -> bool {
        if self.stream.is_some() {
            log::debug!("📷 Camera already open, ignoring start");
            return true;
        }

        match self.device.open(StreamRequest::rear_camera()).await {
            Ok(stream) => {
                log::info!("📷 Camera started: {}", stream.label());
                self.stream = Some(stream);
                session.clear_message();
                true
            }
            Err(e) => {
                log::warn!("⚠️ Camera failed to start: {}", e);
                session.fail(SessionError::Camera(e));
                false
            }
        }
    }

    /// Release the device and forget any pending still. Safe to repeat.
    pub fn stop(&mut self) -> bool {
        self.still = None;
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop_tracks();
                log::info!("🛑 Camera stopped: {}", stream.label());
                true
            }
            None => false,
        }
    }

    /// Phase one of a capture: copy the current frame at native size.
    /// `None` when closed or while the stream has no dimensions yet.
    pub fn grab_frame(&mut self) -> Option<VideoFrame> {
        let stream = self.stream.as_mut()?;
        let (width, height) = stream.dimensions()?;
        if width == 0 || height == 0 {
            return None;
        }

        let frame = stream.read_frame()?;
        if frame.width != width || frame.height != height || !frame.is_complete() {
            log::debug!(
                "Skipping frame {}x{} from a {}x{} stream",
                frame.width,
                frame.height,
                width,
                height
            );
            return None;
        }
        Some(frame)
    }

    /// Phase two: JPEG-encode off the event loop.
    pub async fn encode(&self, frame: VideoFrame) -> Result<CapturedStill, CameraError> {
        let quality = self.quality;
        let (width, height) = (frame.width, frame.height);

        let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&frame, quality))
            .await
            .map_err(|e| CameraError::Encode(e.to_string()))??;

        log::debug!("🗜️ Encoded {}x{} still ({} bytes)", width, height, jpeg.len());
        Ok(CapturedStill {
            jpeg,
            width,
            height,
            captured_at: Utc::now(),
        })
    }

    /// Phase three: keep the still, replacing any earlier one.
    /// Dropped if the camera was stopped while encoding.
    pub fn commit_still(&mut self, still: CapturedStill, session: &mut SessionState) -> bool {
        if self.stream.is_none() {
            log::debug!("Camera closed during encode, discarding still");
            return false;
        }

        self.still = Some(still);
        session.notice(STILL_READY_MESSAGE);
        true
    }

    /// Grab, encode and commit in one go. Silently does nothing when there
    /// is no live frame to capture.
    pub async fn capture_still(&mut self, session: &mut SessionState) -> bool {
        let Some(frame) = self.grab_frame() else {
            return false;
        };

        match self.encode(frame).await {
            Ok(still) => self.commit_still(still, session),
            Err(e) => {
                log::error!("❌ Could not encode still: {}", e);
                session.fail(SessionError::Camera(e));
                false
            }
        }
    }

    /// Promote the pending still to the chosen image ("use photo").
    pub fn confirm_still(&mut self, session: &mut SessionState) -> bool {
        let Some(still) = self.still.take() else {
            return false;
        };

        let published = self.sources.set_image(session, Some(still.into_chosen_image()));
        if published {
            session.notice(STILL_ATTACHED_MESSAGE);
        }
        published
    }
}

impl Drop for MediaCaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}
