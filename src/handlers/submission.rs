use std::sync::Arc;

use crate::error::SessionError;
use crate::models::{ChosenImage, PortionMultiplier, SessionState, StatusKind};
use crate::services::AnalysisService;

pub const PROBING_MESSAGE: &str = "Checking server connection...";
pub const ANALYZING_MESSAGE: &str = "Analyzing image...";
pub const COMPLETE_MESSAGE: &str = "Analysis complete!";

/// Validates a session, gates the upload behind `/health`, and writes the
/// outcome back into the session.
pub struct SubmissionOrchestrator {
    service: Arc<dyn AnalysisService>,
}

impl SubmissionOrchestrator {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }

    /// Run one submission. Returns true only when the session ends in
    /// `Succeeded`.
    ///
    /// A session that is already busy is left untouched. Every other path
    /// ends with `busy == false`.
    pub async fn submit(&self, session: &mut SessionState) -> bool {
        if session.busy {
            log::warn!("⚠️ Submission already in flight, ignoring");
            return false;
        }

        session.clear_feedback();
        session.set_status(StatusKind::Validating, "");

        let (image, portion) = match Self::validate(session) {
            Ok(inputs) => inputs,
            Err(e) => {
                session.fail(e);
                return false;
            }
        };

        session.busy = true;
        session.set_status(StatusKind::Probing, PROBING_MESSAGE);

        // Analyze isteği ancak probe bittikten sonra gider
        if let Err(e) = self.service.check_health().await {
            log::warn!("⚠️ Liveness probe failed for {}: {}", self.service.base_url(), e);
            session.fail(SessionError::Unreachable {
                base: self.service.base_url().to_string(),
            });
            session.busy = false;
            return false;
        }

        session.set_status(StatusKind::Submitting, ANALYZING_MESSAGE);
        let outcome = self.service.analyze(&image, portion).await;
        session.busy = false;

        match outcome {
            Ok(result) => {
                log::info!(
                    "✅ Analysis complete: {} ({})",
                    result.display_name(),
                    result.confidence_label()
                );
                session.result = Some(result);
                session.set_status(StatusKind::Succeeded, COMPLETE_MESSAGE);
                true
            }
            Err(e) => {
                log::error!("❌ Analysis failed: {}", e);
                session.fail(e.into());
                false
            }
        }
    }

    fn validate(session: &SessionState) -> Result<(ChosenImage, PortionMultiplier), SessionError> {
        let image = session.image.clone().ok_or(SessionError::NoImage)?;
        let portion = PortionMultiplier::parse(&session.portion)?;
        Ok((image, portion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisResult;
    use crate::services::analysis::{HealthStatus, ServiceError};
    use crate::services::AnalysisService;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        ProbeStarted,
        ProbeFinished,
        Analyze { name: String, portion: f64 },
    }

    struct FakeService {
        probe: Result<(), ServiceError>,
        analyze: Result<AnalysisResult, ServiceError>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeService {
        fn new(
            probe: Result<(), ServiceError>,
            analyze: Result<AnalysisResult, ServiceError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                probe,
                analyze,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn healthy(analyze: Result<AnalysisResult, ServiceError>) -> Arc<Self> {
            Self::new(Ok(()), analyze)
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnalysisService for FakeService {
        fn base_url(&self) -> &str {
            "http://meals.test"
        }

        async fn check_health(&self) -> Result<HealthStatus, ServiceError> {
            self.calls.lock().unwrap().push(Call::ProbeStarted);
            tokio::task::yield_now().await;
            self.calls.lock().unwrap().push(Call::ProbeFinished);
            self.probe.clone().map(|_| HealthStatus::default())
        }

        async fn analyze(
            &self,
            image: &ChosenImage,
            portion: PortionMultiplier,
        ) -> Result<AnalysisResult, ServiceError> {
            self.calls.lock().unwrap().push(Call::Analyze {
                name: image.name.clone(),
                portion: portion.value(),
            });
            self.analyze.clone()
        }
    }

    fn pizza() -> AnalysisResult {
        serde_json::from_value(serde_json::json!({
            "food_name": "pizza",
            "confidence": 0.87,
            "portion_size": "1 serving",
            "nutrition": {"calories": 285, "protein": 12, "carbs": 36, "fat": 10}
        }))
        .unwrap()
    }

    fn session_with_photo(portion: &str) -> SessionState {
        let mut session = SessionState::default().with_portion(portion);
        session.image = Some(ChosenImage::new(
            vec![0xAB; 2 * 1024 * 1024],
            "image/jpeg",
            "pizza.jpg",
        ));
        session
    }

    fn orchestrator(service: &Arc<FakeService>) -> SubmissionOrchestrator {
        SubmissionOrchestrator::new(service.clone())
    }

    #[tokio::test]
    async fn test_successful_submission() {
        let service = FakeService::healthy(Ok(pizza()));
        let mut session = session_with_photo("1");

        assert!(orchestrator(&service).submit(&mut session).await);

        assert_eq!(session.status.kind, StatusKind::Succeeded);
        assert_eq!(session.message(), "Analysis complete!");
        assert!(!session.busy);
        let result = session.result.as_ref().unwrap();
        assert_eq!(result.display_name(), "Pizza");
        assert_eq!(result.confidence_label(), "87.0%");
    }

    #[tokio::test]
    async fn test_probe_completes_before_analyze() {
        let service = FakeService::healthy(Ok(pizza()));
        let mut session = session_with_photo("2.5");

        orchestrator(&service).submit(&mut session).await;

        assert_eq!(
            service.calls(),
            vec![
                Call::ProbeStarted,
                Call::ProbeFinished,
                Call::Analyze {
                    name: "pizza.jpg".to_string(),
                    portion: 2.5
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_no_image_makes_no_calls() {
        let service = FakeService::healthy(Ok(pizza()));
        let mut session = SessionState::default();

        assert!(!orchestrator(&service).submit(&mut session).await);

        assert!(service.calls().is_empty());
        assert_eq!(
            session.status.kind,
            StatusKind::Failed(SessionError::NoImage)
        );
        assert_eq!(session.message(), "Choose or capture an image first.");
        assert!(!session.busy);
    }

    #[tokio::test]
    async fn test_invalid_portion_makes_no_calls() {
        for portion in ["-1", "0", "abc", "NaN"] {
            let service = FakeService::healthy(Ok(pizza()));
            let mut session = session_with_photo(portion);

            assert!(!orchestrator(&service).submit(&mut session).await);

            assert!(service.calls().is_empty(), "portion {:?}", portion);
            assert!(matches!(
                session.status.kind,
                StatusKind::Failed(SessionError::InvalidPortion { .. })
            ));
            assert_eq!(session.message(), "Portion must be > 0.");
            assert!(!session.busy);
        }
    }

    #[tokio::test]
    async fn test_unreachable_probe_skips_analyze() {
        let service = FakeService::new(
            Err(ServiceError::Transport("operation timed out".to_string())),
            Ok(pizza()),
        );
        let mut session = session_with_photo("1");

        assert!(!orchestrator(&service).submit(&mut session).await);

        assert_eq!(
            service.calls(),
            vec![Call::ProbeStarted, Call::ProbeFinished]
        );
        assert_eq!(
            session.message(),
            "Error: Cannot reach /health at http://meals.test."
        );
        assert!(matches!(
            session.status.kind,
            StatusKind::Failed(SessionError::Unreachable { .. })
        ));
        assert!(session.result.is_none());
        assert!(!session.busy);
    }

    #[tokio::test]
    async fn test_probe_non_success_is_same_as_unreachable() {
        let service = FakeService::new(
            Err(ServiceError::Status {
                status: 503,
                body: String::new(),
            }),
            Ok(pizza()),
        );
        let mut session = session_with_photo("1");

        orchestrator(&service).submit(&mut session).await;
        assert!(session.message().contains("/health"));
        assert!(!service
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Analyze { .. })));
    }

    #[tokio::test]
    async fn test_server_error_names_status() {
        let service = FakeService::healthy(Err(ServiceError::Status {
            status: 500,
            body: "Failed to parse AI response".to_string(),
        }));
        let mut session = session_with_photo("1");

        assert!(!orchestrator(&service).submit(&mut session).await);

        assert_eq!(
            session.status.kind,
            StatusKind::Failed(SessionError::ServerError { status: 500 })
        );
        assert!(session.message().contains("500"));
        assert!(session.result.is_none());
        assert!(!session.busy);
    }

    #[tokio::test]
    async fn test_transport_error_uses_description() {
        let service = FakeService::healthy(Err(ServiceError::Transport(
            "connection reset by peer".to_string(),
        )));
        let mut session = session_with_photo("1");

        orchestrator(&service).submit(&mut session).await;
        assert_eq!(session.message(), "connection reset by peer");

        let service = FakeService::healthy(Err(ServiceError::Transport(String::new())));
        let mut session = session_with_photo("1");

        orchestrator(&service).submit(&mut session).await;
        assert_eq!(session.message(), "Analysis failed");
    }

    #[tokio::test]
    async fn test_new_submission_clears_previous_result() {
        let service = FakeService::healthy(Err(ServiceError::Status {
            status: 502,
            body: String::new(),
        }));
        let mut session = session_with_photo("1");
        session.result = Some(pizza());
        session.set_status(StatusKind::Succeeded, COMPLETE_MESSAGE);

        orchestrator(&service).submit(&mut session).await;
        assert!(session.result.is_none());
        assert!(session.message().contains("502"));
    }

    #[tokio::test]
    async fn test_busy_session_is_left_alone() {
        let service = FakeService::healthy(Ok(pizza()));
        let mut session = session_with_photo("1");
        session.busy = true;
        session.set_status(StatusKind::Submitting, ANALYZING_MESSAGE);

        assert!(!orchestrator(&service).submit(&mut session).await);

        assert!(service.calls().is_empty());
        assert!(session.busy);
        assert_eq!(session.status.kind, StatusKind::Submitting);
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let failing = FakeService::new(
            Err(ServiceError::Transport("refused".to_string())),
            Ok(pizza()),
        );
        let mut session = session_with_photo("1");
        orchestrator(&failing).submit(&mut session).await;
        assert!(session.status.error().is_some());

        let healthy = FakeService::healthy(Ok(pizza()));
        assert!(orchestrator(&healthy).submit(&mut session).await);
        assert_eq!(session.status.kind, StatusKind::Succeeded);
    }
}
