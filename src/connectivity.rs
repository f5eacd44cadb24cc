//! Connectivity gate.
//!
//! Two flags (network link, broker session) written by the transport
//! adapters and read by the unit before every outbound send.  The handle is
//! cheap to clone and safe to move into the MQTT callback thread.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Flags {
    network_up: AtomicBool,
    session_up: AtomicBool,
}

/// Shared readiness handle.  Both flags start `false`.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityState {
    flags: Arc<Flags>,
}

impl ConnectivityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the WiFi / network link state.
    pub fn set_network_up(&self, up: bool) {
        self.flags.network_up.store(up, Ordering::Release);
    }

    /// Record the broker session state.
    pub fn set_session_up(&self, up: bool) {
        self.flags.session_up.store(up, Ordering::Release);
    }

    pub fn network_up(&self) -> bool {
        self.flags.network_up.load(Ordering::Acquire)
    }

    pub fn session_up(&self) -> bool {
        self.flags.session_up.load(Ordering::Acquire)
    }

    /// Outbound traffic is allowed only with both link and session up.
    pub fn is_ready(&self) -> bool {
        self.network_up() && self.session_up()
    }

    /// Suspend until [`is_ready`](Self::is_ready).
    ///
    /// Busy-polls with a scheduler yield per iteration and has no timeout.
    pub async fn wait_ready(&self) {
        while !self.is_ready() {
            futures_lite::future::yield_now().await;
        }
    }
}
