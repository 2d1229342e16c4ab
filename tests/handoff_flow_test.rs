use anyhow::Result;
use async_trait::async_trait;
use card_relay::error::RelayError;
use card_relay::handoff::{HandoffCoordinator, PollOutcome};
use card_relay::recognizer::Recognizer;
use card_relay::session::{Clock, SessionRegistry};
use card_relay::types::CardType;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Manually advanced clock so the TTL path runs without sleeping.
struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc::now())))
    }

    fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

struct StubRecognizer(&'static str);

#[async_trait]
impl Recognizer for StubRecognizer {
    async fn recognize(&self, _image: &[u8]) -> card_relay::error::Result<String> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn full_handoff_flow_from_creation_to_expiry() -> Result<()> {
    let clock = ManualClock::new();
    let registry = Arc::new(SessionRegistry::with_clock(300, 60, clock.clone()));
    let coordinator = HandoffCoordinator::new(
        registry,
        Arc::new(StubRecognizer(
            "4111 1111 1111 1111\nJOHN MICHAEL SMITH\nVALID THRU 09/26",
        )),
        Some("https://relay.example.com".to_string()),
    );

    // create session, immediately poll: pending
    let handles = coordinator.create_session()?;
    assert!(matches!(
        coordinator.poll(&handles.session_id)?,
        PollOutcome::Pending
    ));

    // mobile submits an image; recognized text yields the full record
    let record = coordinator
        .handle_upload(&handles.session_id, b"jpeg bytes")
        .await?;
    assert_eq!(record.card_type, CardType::Visa);
    assert_eq!(record.expiry_date, "09/26");
    assert_eq!(record.cardholder_name, "JOHN MICHAEL SMITH");

    // desktop poll now sees the ready record with the masked number
    match coordinator.poll(&handles.session_id)? {
        PollOutcome::Ready(polled) => {
            assert!(polled.masked_card_number.ends_with("1111"));
            assert!(polled.masked_card_number.starts_with("XXXX"));
            assert_eq!(polled.card_number, "4111111111111111");
        }
        PollOutcome::Pending => panic!("expected ready poll"),
    }

    // past the TTL the session is gone, sweep or no sweep
    clock.advance(301);
    assert!(matches!(
        coordinator.poll(&handles.session_id),
        Err(RelayError::SessionExpired)
    ));
    // and after the lazy eviction it is indistinguishable from never existing
    assert!(matches!(
        coordinator.poll(&handles.session_id),
        Err(RelayError::SessionNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn rescan_replaces_the_record_within_the_same_session() -> Result<()> {
    let registry = Arc::new(SessionRegistry::new(300, 60));

    let first = HandoffCoordinator::new(
        registry.clone(),
        Arc::new(StubRecognizer("5500 0000 0000 0004")),
        Some("https://relay.example.com".to_string()),
    );
    let handles = first.create_session()?;
    first.handle_upload(&handles.session_id, b"img").await?;

    // second capture on the same session, e.g. after reframing the card
    let second = HandoffCoordinator::new(
        registry,
        Arc::new(StubRecognizer("4111 1111 1111 1111")),
        Some("https://relay.example.com".to_string()),
    );
    second.handle_upload(&handles.session_id, b"img").await?;

    match second.poll(&handles.session_id)? {
        PollOutcome::Ready(record) => {
            assert_eq!(record.card_number, "4111111111111111");
            assert_eq!(record.card_type, CardType::Visa);
        }
        PollOutcome::Pending => panic!("expected ready poll"),
    }
    Ok(())
}
