//! Owned listen subscription — the session side of a broker registration.
//!
//! A [`Subscription`] bundles the broadcast receiver with a release guard.
//! Release is a first-class, idempotent operation: calling it any number of
//! times is a no-op after the first, and a late broadcast delivered after
//! release is discarded on the sender side. Dropping a subscription releases
//! it too, so a cancelled session can never leak its registration.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::signal::RawBroadcast;

/// Create a connected broker-side sender / session-side subscription pair.
///
/// `buffer` bounds how many undelivered broadcasts may queue; the broker
/// emits at most a handful per session, so a small buffer suffices.
pub fn subscription_pair(buffer: usize) -> (SignalSender, Subscription) {
    let (tx, rx) = mpsc::channel(buffer);
    let guard = CancellationToken::new();
    (
        SignalSender {
            tx,
            guard: guard.clone(),
        },
        Subscription { signals: rx, guard },
    )
}

// ── SignalSender ─────────────────────────────────────────────────────────────

/// Broker-side handle for delivering broadcasts into a subscription.
#[derive(Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<RawBroadcast>,
    guard: CancellationToken,
}

impl SignalSender {
    /// Deliver a broadcast. Returns `false` when the subscription has been
    /// released (or its buffer is full) and the broadcast was discarded.
    pub fn deliver(&self, broadcast: RawBroadcast) -> bool {
        if self.guard.is_cancelled() {
            trace!(action = %broadcast.action, "discarding broadcast for released subscription");
            return false;
        }
        self.tx.try_send(broadcast).is_ok()
    }

    /// Whether the session has released the subscription.
    pub fn is_released(&self) -> bool {
        self.guard.is_cancelled()
    }

    /// Resolves once the session releases the subscription — lets a broker
    /// implementation stop its platform-side registration promptly.
    pub async fn released(&self) {
        self.guard.cancelled().await;
    }
}

// ── Subscription ─────────────────────────────────────────────────────────────

/// Session-owned listen registration.
pub struct Subscription {
    signals: mpsc::Receiver<RawBroadcast>,
    guard: CancellationToken,
}

impl Subscription {
    /// Receive the next broadcast. Returns `None` once the subscription has
    /// been released or the broker side has gone away.
    pub async fn next(&mut self) -> Option<RawBroadcast> {
        if self.guard.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;

            _ = self.guard.cancelled() => None,
            broadcast = self.signals.recv() => broadcast,
        }
    }

    /// Release the subscription. Idempotent: a second (or concurrent) call
    /// is a no-op, never a fault.
    pub fn release(&self) {
        self.guard.cancel();
    }

    pub fn is_released(&self) -> bool {
        self.guard.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.guard.cancel();
    }
}
