use crate::error::{RelayError, Result};
use crate::extract::{self, MAX_CARD_DIGITS};
use crate::metrics;
use crate::qr;
use crate::recognizer::Recognizer;
use crate::session::{SessionRegistry, SessionStatus};
use crate::types::{mask_card_number, CardRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Everything the desktop needs to start a handoff: the session id, the two
/// URLs, and a scannable encoding of the mobile one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandles {
    pub session_id: String,
    pub mobile_url: String,
    pub desktop_url: String,
    pub qr_code: String,
    pub expires_in_sec: i64,
}

/// Outcome of one desktop poll.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Pending,
    Ready(CardRecord),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub active_sessions: usize,
    pub base_url: Option<String>,
}

/// Orchestrates the handoff: session creation, the upload path (recognize,
/// extract, attach), and polling. Holds no state of its own beyond its
/// collaborators.
pub struct HandoffCoordinator {
    registry: Arc<SessionRegistry>,
    recognizer: Arc<dyn Recognizer>,
    base_url: Option<String>,
}

impl HandoffCoordinator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        recognizer: Arc<dyn Recognizer>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            registry,
            recognizer,
            base_url,
        }
    }

    fn base_url(&self) -> Result<&str> {
        self.base_url.as_deref().ok_or_else(|| {
            RelayError::Config(
                "no public base URL configured; set server.public_base_url or PUBLIC_BASE_URL"
                    .to_string(),
            )
        })
    }

    /// Allocates a session and builds the pair of handoff URLs, plus the QR
    /// encoding of the mobile one.
    pub fn create_session(&self) -> Result<SessionHandles> {
        let base = self.base_url()?;
        let session = self.registry.create();
        let desktop_url = format!("{}/session/{}", base, session.id);
        let mobile_url = format!("{}/scan/{}?return={}", base, session.id, desktop_url);
        let qr_code = qr::render_qr_data_uri(&mobile_url)?;
        Ok(SessionHandles {
            session_id: session.id,
            mobile_url,
            desktop_url,
            qr_code,
            expires_in_sec: self.registry.ttl_secs(),
        })
    }

    /// Runs the upload path for one submitted image.
    ///
    /// Session existence is checked before the recognizer call and the
    /// attach re-validates it, so the long-latency recognition never holds
    /// the registry lock and an expiry mid-flight is still honored.
    pub async fn handle_upload(&self, session_id: &str, image: &[u8]) -> Result<CardRecord> {
        if image.is_empty() {
            return Err(RelayError::InvalidInput("image is empty".to_string()));
        }
        self.registry.get_checked(session_id)?;

        let recognize_started = Instant::now();
        let text = match self.recognizer.recognize(image).await {
            Ok(text) => text,
            Err(e) => {
                metrics::scan::upstream_failed();
                warn!(session_id = %session_id, error = %e, "recognizer call failed");
                return Err(e);
            }
        };
        metrics::scan::recognize_duration(recognize_started.elapsed().as_secs_f64());

        let extract_started = Instant::now();
        let fields = match extract::extract_fields(&text) {
            Ok(fields) => fields,
            Err(e) => {
                metrics::scan::extraction_failed();
                info!(session_id = %session_id, error = %e, "extraction failed");
                return Err(e);
            }
        };
        metrics::scan::extract_duration(extract_started.elapsed().as_secs_f64());

        // extractor invariant, enforced independently at this boundary
        if fields.card_number.len() > MAX_CARD_DIGITS {
            metrics::scan::extraction_failed();
            return Err(RelayError::ExtractionFailed(
                "detected number exceeds 16 digits".to_string(),
            ));
        }

        let record = CardRecord {
            masked_card_number: mask_card_number(&fields.card_number),
            card_number: fields.card_number,
            cardholder_name: fields.cardholder_name,
            expiry_date: fields.expiry_date,
            card_type: fields.card_type,
            scanned_at: self.registry.now(),
        };
        self.registry.attach_record(session_id, record.clone())?;
        metrics::scan::accepted();
        info!(session_id = %session_id, card_type = record.card_type.as_str(), "scan accepted");
        Ok(record)
    }

    /// Serves one desktop poll. The first ready poll stamps the delivery
    /// time.
    pub fn poll(&self, session_id: &str) -> Result<PollOutcome> {
        let session = self.registry.get_checked(session_id)?;
        match (session.status, session.record) {
            (SessionStatus::Ready, Some(record)) => {
                self.registry.mark_delivered(session_id);
                Ok(PollOutcome::Ready(record))
            }
            _ => Ok(PollOutcome::Pending),
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            active_sessions: self.registry.active_count(),
            base_url: self.base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubRecognizer(String);

    #[async_trait]
    impl Recognizer for StubRecognizer {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingRecognizer;

    #[async_trait]
    impl Recognizer for FailingRecognizer {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Err(RelayError::Upstream("recognizer timed out".to_string()))
        }
    }

    fn coordinator(text: &str) -> HandoffCoordinator {
        HandoffCoordinator::new(
            Arc::new(SessionRegistry::new(300, 60)),
            Arc::new(StubRecognizer(text.to_string())),
            Some("https://relay.example.com".to_string()),
        )
    }

    #[test]
    fn create_session_builds_urls_and_qr() {
        let coordinator = coordinator("");
        let handles = coordinator.create_session().unwrap();
        assert_eq!(
            handles.desktop_url,
            format!("https://relay.example.com/session/{}", handles.session_id)
        );
        assert!(handles
            .mobile_url
            .starts_with(&format!("https://relay.example.com/scan/{}", handles.session_id)));
        assert!(handles.mobile_url.contains("return="));
        assert!(handles.qr_code.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(handles.expires_in_sec, 300);
    }

    #[test]
    fn create_session_without_base_url_is_a_config_error() {
        let coordinator = HandoffCoordinator::new(
            Arc::new(SessionRegistry::new(300, 60)),
            Arc::new(StubRecognizer(String::new())),
            None,
        );
        assert!(matches!(
            coordinator.create_session(),
            Err(RelayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn upload_attaches_record_and_poll_sees_it() {
        let coordinator =
            coordinator("4111 1111 1111 1111\nJOHN MICHAEL SMITH\nVALID THRU 09/26");
        let handles = coordinator.create_session().unwrap();

        assert!(matches!(
            coordinator.poll(&handles.session_id).unwrap(),
            PollOutcome::Pending
        ));

        let record = coordinator
            .handle_upload(&handles.session_id, b"fake image bytes")
            .await
            .unwrap();
        assert_eq!(record.masked_card_number, "XXXXXXXXXXXX1111");
        assert_eq!(record.cardholder_name, "JOHN MICHAEL SMITH");

        match coordinator.poll(&handles.session_id).unwrap() {
            PollOutcome::Ready(polled) => {
                assert_eq!(polled.card_number, "4111111111111111");
                assert_eq!(polled.expiry_date, "09/26");
            }
            PollOutcome::Pending => panic!("expected ready poll"),
        }
    }

    #[tokio::test]
    async fn upload_with_no_valid_number_is_extraction_failure() {
        let coordinator = coordinator("JUST SOME TEXT\nNO CARD HERE");
        let handles = coordinator.create_session().unwrap();
        let err = coordinator
            .handle_upload(&handles.session_id, b"img")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::ExtractionFailed(_)));
        // session stays pending and reusable
        assert!(matches!(
            coordinator.poll(&handles.session_id).unwrap(),
            PollOutcome::Pending
        ));
    }

    #[tokio::test]
    async fn upload_to_unknown_session_is_not_found() {
        let coordinator = coordinator("4111 1111 1111 1111");
        let err = coordinator
            .handle_upload("no-such-session", b"img")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::SessionNotFound));
    }

    #[tokio::test]
    async fn recognizer_failure_does_not_mutate_session_state() {
        let coordinator = HandoffCoordinator::new(
            Arc::new(SessionRegistry::new(300, 60)),
            Arc::new(FailingRecognizer),
            Some("https://relay.example.com".to_string()),
        );
        let handles = coordinator.create_session().unwrap();
        let err = coordinator
            .handle_upload(&handles.session_id, b"img")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Upstream(_)));
        assert!(matches!(
            coordinator.poll(&handles.session_id).unwrap(),
            PollOutcome::Pending
        ));
    }

    #[tokio::test]
    async fn empty_image_is_an_input_error() {
        let coordinator = coordinator("4111 1111 1111 1111");
        let handles = coordinator.create_session().unwrap();
        let err = coordinator
            .handle_upload(&handles.session_id, b"")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }
}
