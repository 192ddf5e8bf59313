//! End-to-end consent flows: bridge command in, platform signals through
//! the session machine, exactly one bridge event out.
//!
//! A recording test platform stands in for the broker/prompt/picker so the
//! tests can steer every branch and observe release ordering; the final
//! test runs the same loop against the shipped simulated platform.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use sms_consent::bridge::{self, BridgeHandle, ConsentEvent};
use sms_consent::consent::ConsentService;
use sms_consent::core::config::{BridgeConfig, BrokerConfig};
use sms_consent::platform::{
    ComponentIdentity, ConsentBroker, HintPicker, HostCompletion, HostResultCode, ListenFilter,
    PlatformError, PrivilegeFlags, PromptHandle, PromptHost, RawBroadcast, SMS_RETRIEVED_ACTION,
    SignalSender, Subscription, subscription_pair,
};

const RECV_WINDOW: Duration = Duration::from_secs(2);
const QUIET_WINDOW: Duration = Duration::from_millis(100);

// ── Test platform ────────────────────────────────────────────────────────────

enum BrokerScript {
    Accept,
    Refuse,
}

enum PromptScript {
    Approve(&'static str),
    Cancel,
    NotFound,
}

enum PickerScript {
    Pick(&'static str),
    Cancel,
}

struct TestPlatform {
    broker: BrokerScript,
    prompt: PromptScript,
    picker: PickerScript,
    senders: Mutex<Vec<SignalSender>>,
    prompt_launches: AtomicUsize,
}

impl TestPlatform {
    fn new(broker: BrokerScript, prompt: PromptScript, picker: PickerScript) -> Arc<Self> {
        Arc::new(Self {
            broker,
            prompt,
            picker,
            senders: Mutex::new(Vec::new()),
            prompt_launches: AtomicUsize::new(0),
        })
    }

    /// Broker-side sender of the `n`-th listen subscription.
    fn sender(&self, n: usize) -> SignalSender {
        self.senders.lock().unwrap()[n].clone()
    }

    fn prompt_launches(&self) -> usize {
        self.prompt_launches.load(Ordering::SeqCst)
    }
}

impl ConsentBroker for TestPlatform {
    fn start_listening(&self, _filter: &ListenFilter) -> Result<Subscription, PlatformError> {
        match self.broker {
            BrokerScript::Refuse => Err(PlatformError::Unavailable("broker offline".into())),
            BrokerScript::Accept => {
                let (sender, subscription) = subscription_pair(4);
                self.senders.lock().unwrap().push(sender);
                Ok(subscription)
            }
        }
    }
}

impl PromptHost for TestPlatform {
    fn launch_prompt(
        &self,
        _handle: PromptHandle,
    ) -> Result<oneshot::Receiver<HostCompletion>, PlatformError> {
        self.prompt_launches.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        match self.prompt {
            PromptScript::NotFound => return Err(PlatformError::LaunchNotFound),
            PromptScript::Cancel => {
                let _ = tx.send(HostCompletion {
                    code: HostResultCode::Canceled,
                    extras: None,
                });
            }
            PromptScript::Approve(message) => {
                let _ = tx.send(HostCompletion {
                    code: HostResultCode::Ok,
                    extras: Some(serde_json::json!({ "sms_message": message })),
                });
            }
        }
        Ok(rx)
    }
}

impl HintPicker for TestPlatform {
    fn open_picker(&self) -> Result<oneshot::Receiver<HostCompletion>, PlatformError> {
        let (tx, rx) = oneshot::channel();
        match self.picker {
            PickerScript::Cancel => {
                let _ = tx.send(HostCompletion {
                    code: HostResultCode::Canceled,
                    extras: None,
                });
            }
            PickerScript::Pick(id) => {
                let _ = tx.send(HostCompletion {
                    code: HostResultCode::Ok,
                    extras: Some(serde_json::json!({ "credential": { "id": id } })),
                });
            }
        }
        Ok(rx)
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

struct Harness {
    handle: BridgeHandle,
    events: mpsc::Receiver<ConsentEvent>,
    shutdown: CancellationToken,
    service: JoinHandle<()>,
}

fn broker_config() -> BrokerConfig {
    BrokerConfig {
        trusted_namespace: sms_consent::platform::TRUSTED_PROMPT_NAMESPACE.into(),
        trusted_name: sms_consent::platform::TRUSTED_PROMPT_NAME.into(),
        listen_to_other_apps: true,
    }
}

fn start(platform: Arc<TestPlatform>) -> Harness {
    let (bus, handle, events) = bridge::channel(&BridgeConfig {
        command_buffer: 4,
        event_buffer: 4,
    });
    let service = ConsentService::new(
        platform.clone(),
        platform.clone(),
        platform,
        bus,
        &broker_config(),
    );
    let shutdown = CancellationToken::new();
    let service = tokio::spawn(service.run(shutdown.clone()));
    Harness {
        handle,
        events,
        shutdown,
        service,
    }
}

impl Harness {
    async fn next_event(&mut self) -> ConsentEvent {
        timeout(RECV_WINDOW, self.events.recv())
            .await
            .expect("no event within window")
            .expect("event channel closed")
    }

    async fn expect_quiet(&mut self) {
        assert!(
            timeout(QUIET_WINDOW, self.events.recv()).await.is_err(),
            "unexpected extra event"
        );
    }

    async fn finish(self) {
        self.shutdown.cancel();
        self.service.await.unwrap();
    }
}

fn trusted_handle() -> PromptHandle {
    PromptHandle {
        target: ComponentIdentity::trusted_consent_prompt(),
        flags: PrivilegeFlags::empty(),
    }
}

// ── SmsConsent scenarios ─────────────────────────────────────────────────────

#[tokio::test]
async fn approved_consent_delivers_message() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("123456"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(Some("+15551234567".into())).await.unwrap();
    let sender = platform.sender(0);
    assert!(sender.deliver(RawBroadcast::success(&trusted_handle())));

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(Some("123456".into())));
    // The subscription must already be gone when the event is observed.
    assert!(sender.is_released());
    assert_eq!(platform.prompt_launches(), 1);

    // Exactly one event per session.
    h.expect_quiet().await;
    h.finish().await;
}

#[tokio::test]
async fn untrusted_identity_is_silently_rejected() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("123456"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    let forged = PromptHandle {
        target: ComponentIdentity::new("org.evil", "org.evil.FakePrompt"),
        flags: PrivilegeFlags::empty(),
    };
    platform.sender(0).deliver(RawBroadcast::success(&forged));

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    assert_eq!(platform.prompt_launches(), 0, "rejected handle must never launch");
    assert!(platform.sender(0).is_released());
    h.finish().await;
}

#[tokio::test]
async fn grant_bit_is_rejected_like_a_mismatch() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("123456"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    let escalating = PromptHandle {
        target: ComponentIdentity::trusted_consent_prompt(),
        flags: PrivilegeFlags::GRANT_WRITE,
    };
    platform.sender(0).deliver(RawBroadcast::success(&escalating));

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    assert_eq!(platform.prompt_launches(), 0);
    h.finish().await;
}

#[tokio::test]
async fn broker_timeout_denies_and_releases() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("123456"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    platform.sender(0).deliver(RawBroadcast::timeout());

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    assert!(platform.sender(0).is_released());
    assert_eq!(platform.prompt_launches(), 0);
    h.finish().await;
}

#[tokio::test]
async fn unknown_terminal_status_denies() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("123456"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    platform.sender(0).deliver(RawBroadcast::status(13));

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    h.finish().await;
}

#[tokio::test]
async fn malformed_and_unrelated_broadcasts_are_dropped() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("654321"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    let sender = platform.sender(0);

    // Wrong action tag: ignored without decoding.
    sender.deliver(RawBroadcast::new("org.example.UNRELATED", serde_json::json!({})));
    // Right action, no status: dropped, session keeps listening.
    sender.deliver(RawBroadcast::new(SMS_RETRIEVED_ACTION, serde_json::json!({ "noise": 1 })));
    // A later genuine signal still completes the session.
    sender.deliver(RawBroadcast::success(&trusted_handle()));

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(Some("654321".into())));
    h.finish().await;
}

#[tokio::test]
async fn prompt_launch_not_found_degrades_to_denial() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::NotFound,
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    platform.sender(0).deliver(RawBroadcast::success(&trusted_handle()));

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    h.finish().await;
}

#[tokio::test]
async fn prompt_cancellation_denies() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Cancel,
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    platform.sender(0).deliver(RawBroadcast::success(&trusted_handle()));

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    assert_eq!(platform.prompt_launches(), 1);
    h.finish().await;
}

#[tokio::test]
async fn refused_broker_yields_immediate_denial() {
    let platform = TestPlatform::new(
        BrokerScript::Refuse,
        PromptScript::Approve("123456"),
        PickerScript::Cancel,
    );
    let mut h = start(platform);

    h.handle.request_sms(None).await.unwrap();
    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    h.finish().await;
}

#[tokio::test]
async fn second_request_supersedes_the_first() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("222222"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    h.handle.request_sms(Some("+15551234567".into())).await.unwrap();

    // The superseded session flushes its null event before the new session
    // produces anything.
    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    assert!(platform.sender(0).is_released());

    platform.sender(1).deliver(RawBroadcast::success(&trusted_handle()));
    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(Some("222222".into())));
    h.finish().await;
}

#[tokio::test]
async fn shutdown_flushes_listening_session() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("123456"),
        PickerScript::Cancel,
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    h.shutdown.cancel();

    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(None));
    assert!(platform.sender(0).is_released());
    h.service.await.unwrap();
}

// ── PhoneHint scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn picked_number_is_delivered() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Cancel,
        PickerScript::Pick("+15551234567"),
    );
    let mut h = start(platform);

    h.handle.request_phone_number().await.unwrap();
    assert_eq!(
        h.next_event().await,
        ConsentEvent::SelectedPhoneNumber(Some("+15551234567".into()))
    );
    h.finish().await;
}

#[tokio::test]
async fn cancelled_picker_delivers_null() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Cancel,
        PickerScript::Cancel,
    );
    let mut h = start(platform);

    h.handle.request_phone_number().await.unwrap();
    assert_eq!(h.next_event().await, ConsentEvent::SelectedPhoneNumber(None));
    h.expect_quiet().await;
    h.finish().await;
}

#[tokio::test]
async fn hint_and_sms_sessions_are_independent() {
    let platform = TestPlatform::new(
        BrokerScript::Accept,
        PromptScript::Approve("123456"),
        PickerScript::Pick("+15557654321"),
    );
    let mut h = start(platform.clone());

    h.handle.request_sms(None).await.unwrap();
    h.handle.request_phone_number().await.unwrap();

    // The hint session resolves on its own; the sms session keeps listening.
    assert_eq!(
        h.next_event().await,
        ConsentEvent::SelectedPhoneNumber(Some("+15557654321".into()))
    );

    platform.sender(0).deliver(RawBroadcast::success(&trusted_handle()));
    assert_eq!(h.next_event().await, ConsentEvent::ReceivedSms(Some("123456".into())));
    h.finish().await;
}

// ── Simulated platform round-trip ────────────────────────────────────────────

#[cfg(feature = "sim")]
#[tokio::test]
async fn sim_platform_full_round_trip() {
    use sms_consent::core::config::{SimConfig, SimScenario};
    use sms_consent::platform::sim::SimPlatform;

    let sim = SimPlatform::new(SimConfig {
        scenario: SimScenario::Approve,
        message: "Your verification code is 123456".into(),
        phone_number: "+15551234567".into(),
        deliver_after_ms: 0,
    });

    let (bus, handle, mut events) = bridge::channel(&BridgeConfig {
        command_buffer: 4,
        event_buffer: 4,
    });
    let service = ConsentService::new(sim.clone(), sim.clone(), sim, bus, &broker_config());
    let shutdown = CancellationToken::new();
    let service = tokio::spawn(service.run(shutdown.clone()));

    handle.request_sms(Some("+15551234567".into())).await.unwrap();
    assert_eq!(
        timeout(RECV_WINDOW, events.recv()).await.unwrap().unwrap(),
        ConsentEvent::ReceivedSms(Some("Your verification code is 123456".into()))
    );

    handle.request_phone_number().await.unwrap();
    assert_eq!(
        timeout(RECV_WINDOW, events.recv()).await.unwrap().unwrap(),
        ConsentEvent::SelectedPhoneNumber(Some("+15551234567".into()))
    );

    shutdown.cancel();
    service.await.unwrap();
}
