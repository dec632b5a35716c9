mod config;
mod error;
mod handlers;
mod models;
mod report;
mod services;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use config::AppConfig;
use handlers::{ImageSourceManager, MediaCaptureController, SubmissionOrchestrator};
use models::SessionState;
use services::{AnalysisClient, AnalysisService, CameraDevice, FileCamera};

#[derive(Parser)]
#[command(name = "meal-estimator", version, about = "Estimate nutrition from a food photo")]
struct Cli {
    /// Analysis service base URL (overrides MEAL_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Analyze request timeout in seconds (overrides MEAL_REQUEST_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Liveness probe timeout in seconds (overrides MEAL_PROBE_TIMEOUT_SECS)
    #[arg(long, global = true)]
    probe_timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pick an image file and analyze it
    Analyze {
        path: PathBuf,

        /// Serving-size multiplier
        #[arg(long, default_value = "1")]
        portion: String,

        /// Treat the file as drag-and-dropped (non-images are ignored)
        #[arg(long)]
        dropped: bool,
    },
    /// Capture a still from a virtual camera fed by SOURCE and analyze it
    Capture {
        source: PathBuf,

        #[arg(long, default_value = "1")]
        portion: String,

        /// JPEG quality for the captured still (1-100)
        #[arg(long, default_value_t = services::camera::JPEG_QUALITY)]
        jpeg_quality: u8,
    },
    /// Check that the analysis service is reachable
    Health,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(base) = cli.api_base {
        config = config.with_api_base(base);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.probe_timeout {
        config = config.with_probe_timeout(Duration::from_secs(secs));
    }
    config.validate()?;
    log::info!("🚀 Using analysis service at {}", config.api_base);

    let client = Arc::new(AnalysisClient::new(&config)?);
    let sources = ImageSourceManager::new();
    let orchestrator = SubmissionOrchestrator::new(client.clone());

    let ok = match cli.command {
        Command::Health => check_health(&client, &config).await,
        Command::Analyze {
            path,
            portion,
            dropped,
        } => {
            let mut session = SessionState::new().with_portion(portion);
            let accepted = if dropped {
                sources.drop_file(&mut session, &path).await?
            } else {
                sources.select_file(&mut session, &path).await?
            };
            if !accepted {
                log::info!("📭 {} was not accepted as an image", path.display());
            }

            let ok = orchestrator.submit(&mut session).await;
            log_outcome(&session);
            print!("{}", report::format_session_report(&session));
            ok
        }
        Command::Capture {
            source,
            portion,
            jpeg_quality,
        } => {
            let mut session = SessionState::new().with_portion(portion);
            let camera: Arc<dyn CameraDevice> = Arc::new(FileCamera::new(source));
            let mut capture = MediaCaptureController::new(camera, sources).with_quality(jpeg_quality);

            if capture.start(&mut session).await {
                if capture.capture_still(&mut session).await {
                    if let Some(still) = capture.still() {
                        log::info!(
                            "📸 Captured {}x{} still at {}",
                            still.width,
                            still.height,
                            still.captured_at.format("%H:%M:%S")
                        );
                    }
                }
                capture.confirm_still(&mut session);
                capture.stop();
            }
            log::debug!("📷 Camera state after capture: {:?}", capture.state());

            let ok = session.image.is_some() && orchestrator.submit(&mut session).await;
            log_outcome(&session);
            print!("{}", report::format_session_report(&session));
            ok
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn check_health(client: &AnalysisClient, config: &AppConfig) -> bool {
    match client.check_health().await {
        Ok(health) => {
            println!("✅ {} is reachable", client.health_url());
            if let Some(status) = health.status {
                println!("   status: {}", status);
            }
            if let Some(mock) = health.mock {
                println!("   mock mode: {}", mock);
            }
            println!("📖 API docs: {}", config.docs_url());
            true
        }
        Err(e) => {
            println!("❌ Cannot reach {}: {}", client.health_url(), e);
            false
        }
    }
}

fn log_outcome(session: &SessionState) {
    match session.status.error() {
        Some(error) => log::debug!("🔚 Session ended with a {:?} error", error.category()),
        None => log::debug!("🔚 Session ended as {}", session.status.kind),
    }
}
