pub mod analysis; // Meal analysis HTTP API
pub mod camera; // Camera device + JPEG stills

pub use analysis::{AnalysisClient, AnalysisService};
pub use camera::{CameraDevice, FileCamera};
