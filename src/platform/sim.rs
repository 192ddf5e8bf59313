//! Simulated platform — scripted broker, prompt host and hint picker.
//!
//! Drives the full consent round-trip without a real platform attached:
//! the console binary wires it in behind the collaborator traits, and the
//! integration suite uses it for the happy path. Behaviour is scripted by
//! [`SimConfig`]: which terminal the broker reaches, what message the
//! "user" approves, and how long delivery takes.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::core::config::{SimConfig, SimScenario};

use super::{
    ComponentIdentity, ConsentBroker, HintPicker, HostCompletion, HostResultCode, ListenFilter,
    PlatformError, PrivilegeFlags, PromptHandle, PromptHost, RawBroadcast, Subscription,
    subscription_pair,
};

const SIM_SIGNAL_BUFFER: usize = 8;

pub struct SimPlatform {
    config: SimConfig,
}

impl SimPlatform {
    pub fn new(config: SimConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }
}

impl ConsentBroker for SimPlatform {
    fn start_listening(&self, filter: &ListenFilter) -> Result<Subscription, PlatformError> {
        let (sender, subscription) = subscription_pair(SIM_SIGNAL_BUFFER);
        let scenario = self.config.scenario;
        let delay = std::time::Duration::from_millis(self.config.deliver_after_ms);

        info!(sender_filter = ?filter.sender, exported = filter.exported, ?scenario,
            "sim broker listening");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let broadcast = match scenario {
                SimScenario::Timeout => RawBroadcast::timeout(),
                SimScenario::Approve | SimScenario::Deny => RawBroadcast::success(&PromptHandle {
                    target: ComponentIdentity::trusted_consent_prompt(),
                    flags: PrivilegeFlags::empty(),
                }),
            };

            if !sender.deliver(broadcast) {
                debug!("sim broadcast discarded — subscription already released");
            }
        });

        Ok(subscription)
    }
}

impl PromptHost for SimPlatform {
    fn launch_prompt(
        &self,
        handle: PromptHandle,
    ) -> Result<oneshot::Receiver<HostCompletion>, PlatformError> {
        debug!(component = %handle.target, "sim prompt shown");

        let completion = match self.config.scenario {
            SimScenario::Approve => HostCompletion {
                code: HostResultCode::Ok,
                extras: Some(serde_json::json!({ "sms_message": self.config.message })),
            },
            _ => HostCompletion {
                code: HostResultCode::Canceled,
                extras: None,
            },
        };

        let (tx, rx) = oneshot::channel();
        let _ = tx.send(completion);
        Ok(rx)
    }
}

impl HintPicker for SimPlatform {
    fn open_picker(&self) -> Result<oneshot::Receiver<HostCompletion>, PlatformError> {
        debug!("sim hint picker shown");

        let completion = match self.config.scenario {
            SimScenario::Approve => HostCompletion {
                code: HostResultCode::Ok,
                extras: Some(serde_json::json!({
                    "credential": { "id": self.config.phone_number }
                })),
            },
            _ => HostCompletion {
                code: HostResultCode::Canceled,
                extras: None,
            },
        };

        let (tx, rx) = oneshot::channel();
        let _ = tx.send(completion);
        Ok(rx)
    }
}
