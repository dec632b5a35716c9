use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use std::path::PathBuf;
use thiserror::Error;

/// Default JPEG quality for camera stills (0-100)
pub const JPEG_QUALITY: u8 = 92;

/// Camera failures, each with its own user-facing description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("permission to use the camera was denied")]
    PermissionDenied,

    #[error("no camera device was found")]
    NotFound,

    #[error("the camera is already in use by another application")]
    InUse,

    #[error("could not encode the captured frame: {0}")]
    Encode(String),

    #[error("{0}")]
    Other(String),
}

impl CameraError {
    fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::ResourceBusy => Self::InUse,
            _ => Self::Other(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    Environment,
}

/// Constraints passed to the device when asking for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: FacingMode,
    pub audio: bool,
}

impl StreamRequest {
    /// Environment-facing video, no audio
    pub fn rear_camera() -> Self {
        Self {
            facing: FacingMode::Environment,
            audio: false,
        }
    }
}

/// One RGB8 frame at the stream's native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl VideoFrame {
    pub fn is_complete(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgb.len() == self.width as usize * self.height as usize * 3
    }
}

/// A live device stream, exclusively owned by the capture controller.
pub trait VideoStream: Send {
    fn label(&self) -> &str;

    /// Native frame size, `None` while the stream is still negotiating
    fn dimensions(&self) -> Option<(u32, u32)>;

    fn read_frame(&mut self) -> Option<VideoFrame>;

    /// Halt every track of the stream
    fn stop_tracks(&mut self);
}

/// Host camera access (permission prompt + stream negotiation)
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self, request: StreamRequest) -> Result<Box<dyn VideoStream>, CameraError>;
}

/// Encode an RGB frame as baseline JPEG.
pub fn encode_jpeg(frame: &VideoFrame, quality: u8) -> Result<Vec<u8>, CameraError> {
    if !frame.is_complete() {
        return Err(CameraError::Encode(format!(
            "frame buffer does not match {}x{}",
            frame.width, frame.height
        )));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(&frame.rgb, frame.width, frame.height, ColorType::Rgb8)
        .map_err(|e| CameraError::Encode(e.to_string()))?;

    Ok(jpeg)
}

/// Virtual camera that serves a still image file as its live picture.
///
/// Useful on machines without a capture device and for exercising the
/// capture flow end to end.
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraDevice for FileCamera {
    async fn open(&self, request: StreamRequest) -> Result<Box<dyn VideoStream>, CameraError> {
        log::debug!(
            "📷 Opening file camera {} ({:?}, audio={})",
            self.path.display(),
            request.facing,
            request.audio
        );

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CameraError::from_io(&e))?;

        let picture = image::load_from_memory(&bytes)
            .map_err(|e| CameraError::Other(format!("unreadable source {}: {}", self.path.display(), e)))?
            .to_rgb8();

        let frame = VideoFrame {
            width: picture.width(),
            height: picture.height(),
            rgb: picture.into_raw(),
        };

        Ok(Box::new(FileStream {
            label: self.path.display().to_string(),
            frame,
            live: true,
        }))
    }
}

struct FileStream {
    label: String,
    frame: VideoFrame,
    live: bool,
}

impl VideoStream for FileStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.live.then_some((self.frame.width, self.frame.height))
    }

    fn read_frame(&mut self) -> Option<VideoFrame> {
        self.live.then(|| self.frame.clone())
    }

    fn stop_tracks(&mut self) {
        self.live = false;
    }
}
