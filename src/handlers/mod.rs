pub mod capture;
pub mod image_source;
pub mod submission;

pub use capture::MediaCaptureController;
pub use image_source::ImageSourceManager;
pub use submission::SubmissionOrchestrator;
