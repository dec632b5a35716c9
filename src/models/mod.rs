use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::error::{ErrorCategory, SessionError};

/// File name given to stills promoted from the camera
pub const CAMERA_FILE_NAME: &str = "camera.jpg";
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";
/// Upload limit enforced by the analysis service
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// The single image currently queued for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ChosenImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub name: String,
}

impl ChosenImage {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            name: name.into(),
        }
    }

    /// Read a picked file, declaring its media type from the extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(bytes, media_type_for_path(path), name))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0 / 1024.0
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            CAMERA_FILE_NAME
        } else {
            &self.name
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Inline preview URL (`data:<type>;base64,...`)
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Declared media type for a file, from its extension only.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// JPEG produced from a camera frame, waiting for "use photo".
#[derive(Debug, Clone)]
pub struct CapturedStill {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl CapturedStill {
    pub fn into_chosen_image(self) -> ChosenImage {
        ChosenImage::new(self.jpeg, JPEG_MEDIA_TYPE, CAMERA_FILE_NAME)
    }
}

/// Serving-size scale factor; always finite and > 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortionMultiplier(f64);

impl Default for PortionMultiplier {
    fn default() -> Self {
        Self(1.0)
    }
}

impl PortionMultiplier {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    /// Parse the raw portion field. An empty field means one serving.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| SessionError::invalid_portion(input))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Decimal string sent as the `portion` form field
    pub fn as_form_value(self) -> String {
        self.0.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Body of a successful `/analyze` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub food_name: String,
    pub confidence: f64,
    // Servis bazen sayı (porsiyon çarpanı), bazen etiket döndürüyor
    #[serde(deserialize_with = "portion_label")]
    pub portion_size: String,
    #[serde(default)]
    pub nutrition: Nutrition,
    #[serde(default)]
    pub ai_insights: Option<String>,
    #[serde(default)]
    pub top_k: Vec<Prediction>,
}

fn portion_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "portion_size must be a string or number, got {}",
            other
        ))),
    }
}

impl AnalysisResult {
    pub fn display_name(&self) -> String {
        capitalize(&self.food_name)
    }

    /// e.g. `0.87` -> `"87.0%"`
    pub fn confidence_label(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    /// Ranked predictions after the primary one
    pub fn alternatives(&self) -> impl Iterator<Item = &Prediction> {
        self.top_k.iter().skip(1)
    }

    pub fn insights(&self) -> Option<&str> {
        self.ai_insights.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Upper-case the first character, leave the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum StatusKind {
    #[default]
    Idle,
    Validating,
    Probing,
    Submitting,
    Succeeded,
    Failed(SessionError),
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusKind::Idle => "idle",
            StatusKind::Validating => "validating",
            StatusKind::Probing => "probing",
            StatusKind::Submitting => "submitting",
            StatusKind::Succeeded => "succeeded",
            StatusKind::Failed(_) => "failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl SessionStatus {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn failed(error: SessionError) -> Self {
        let message = error.to_string();
        Self::new(StatusKind::Failed(error), message)
    }

    pub fn error(&self) -> Option<&SessionError> {
        match &self.kind {
            StatusKind::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Everything the presentation layer renders from.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub image: Option<ChosenImage>,
    /// Raw portion field, parsed at submit time
    pub portion: String,
    pub status: SessionStatus,
    pub result: Option<AnalysisResult>,
    pub busy: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            image: None,
            portion: "1".to_string(),
            status: SessionStatus::default(),
            result: None,
            busy: false,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_portion(mut self, portion: impl Into<String>) -> Self {
        self.portion = portion.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.status.message
    }

    pub fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        log::debug!("Session status -> {}", kind);
        self.status = SessionStatus::new(kind, message);
    }

    /// Informational message outside of a submission
    pub fn notice(&mut self, message: impl Into<String>) {
        let kind = match self.status.kind {
            StatusKind::Succeeded => StatusKind::Succeeded,
            _ => StatusKind::Idle,
        };
        self.set_status(kind, message);
    }

    pub fn fail(&mut self, error: SessionError) {
        match error.category() {
            ErrorCategory::Validation => log::info!("🚫 {}", error),
            category => log::warn!("⚠️ {:?} failure: {}", category, error),
        }
        self.status = SessionStatus::failed(error);
    }

    /// Drop the message; a shown result keeps its Succeeded kind
    pub fn clear_message(&mut self) {
        self.notice(String::new());
    }

    /// Drop the message and any result
    pub fn clear_feedback(&mut self) {
        self.status = SessionStatus::default();
        self.result = None;
    }
}
