//! Unit service, the orchestration core.
//!
//! [`UnitService`] owns the module set and runs two cooperative loops on
//! the caller's executor: a periodic status broadcaster and an inbound
//! message processor.  All outbound traffic is gated on the connectivity
//! handle; every error observed here terminates in [`UnitService::report`].
//!
//! ```text
//!  incoming ──▶ ┌─────────────────────────┐ ──▶ outgoing
//!               │       UnitService       │
//!  Connectivity │  status loop · inbound  │
//!  (read-only)  │  dispatch · error sink  │
//!               └──────────┬──────────────┘
//!                          ▼
//!               Module set (sensor, relays)
//! ```

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use log::{debug, error, info, warn};

use super::payload::{self, ControlCommand};
use crate::config::{TopicConfig, UnitIdentity};
use crate::connectivity::ConnectivityState;
use crate::error::{Error, UnitError};
use crate::modules::{Module, ModuleStatus};
use crate::transport::{Message, MessageQueues};

/// Result of one control dispatch, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlOutcome {
    /// Commands a module accepted.
    pub applied: usize,
    /// Commands a module matched but rejected.
    pub rejected: usize,
    /// Commands no module matched.
    pub unmatched: usize,
}

/// The orchestration core.  All methods take `&self` so both loops can
/// share one instance.
pub struct UnitService<'q> {
    identity: UnitIdentity,
    topics: TopicConfig,
    status_interval: Duration,
    modules: Mutex<NoopRawMutex, Vec<Module>>,
    queues: &'q MessageQueues,
    connectivity: ConnectivityState,
}

impl<'q> UnitService<'q> {
    /// Construct the service.  Module order is the status report order.
    ///
    /// Fails if two modules share a `(type, name)` identity.
    pub fn new(
        identity: UnitIdentity,
        topics: TopicConfig,
        status_interval: Duration,
        modules: Vec<Module>,
        queues: &'q MessageQueues,
        connectivity: ConnectivityState,
    ) -> Result<Self, Error> {
        for (i, module) in modules.iter().enumerate() {
            if modules[..i].iter().any(|m| m.id() == module.id()) {
                return Err(Error::DuplicateModule(module.id().clone()));
            }
        }
        info!(
            "UnitService: {} module(s), status every {:?}",
            modules.len(),
            status_interval
        );
        Ok(Self {
            identity,
            topics,
            status_interval,
            modules: Mutex::new(modules),
            queues,
            connectivity,
        })
    }

    // ── Loops ─────────────────────────────────────────────────

    /// Drive both loops forever.
    pub async fn run(&self) {
        futures_lite::future::zip(self.status_loop(), self.inbound_loop()).await;
    }

    /// Broadcast status, sleep the configured interval, repeat.
    pub async fn status_loop(&self) {
        loop {
            self.send_status().await;
            async_io_mini::Timer::after(self.status_interval).await;
        }
    }

    /// Process inbound messages one at a time, in arrival order.
    pub async fn inbound_loop(&self) {
        loop {
            let message = self.queues.incoming.receive().await;
            self.process_message(message).await;
        }
    }

    /// Route one inbound message by topic.
    pub async fn process_message(&self, message: Message) {
        let topic = message.topic.as_str();
        info!(
            "UnitService: message received on '{}' with payload: {}",
            topic, message.body
        );
        if topic == self.topics.status_request {
            self.send_status().await;
        } else if topic == self.topics.control {
            self.handle_control(&message.body).await;
            futures_lite::future::yield_now().await;
            self.send_status().await;
        } else {
            self.report(UnitError::UnrecognizedTopic {
                topic: topic.to_owned(),
            })
            .await;
        }
    }

    // ── Status ────────────────────────────────────────────────

    /// Snapshot every module in registration order.
    pub async fn collect_status(&self) -> Vec<ModuleStatus> {
        let mut modules = self.modules.lock().await;
        let mut snapshots = Vec::with_capacity(modules.len());
        for module in modules.iter_mut() {
            snapshots.push(module.status().await);
        }
        snapshots
    }

    /// Wait for connectivity, then enqueue one status document.
    pub async fn send_status(&self) {
        self.connectivity.wait_ready().await;
        let snapshots = self.collect_status().await;
        let body = payload::status_document(&self.identity, &snapshots);
        debug!("UnitService: status {}", body);
        self.enqueue(&self.topics.status, body).await;
    }

    // ── Control dispatch ──────────────────────────────────────

    /// Apply a control payload.  Every failure is reported, none escapes.
    pub async fn handle_control(&self, body: &str) -> ControlOutcome {
        let commands = match payload::decode_control(body) {
            Ok(c) => c,
            Err(e) => {
                self.report(e).await;
                return ControlOutcome::default();
            }
        };

        let (outcome, rejections) = self.dispatch(&commands).await;

        for rejection in rejections {
            self.report(rejection).await;
        }
        if outcome.unmatched > 0 {
            self.report(UnitError::UnrecognizedModule {
                payload: body.to_owned(),
            })
            .await;
        }
        info!(
            "UnitService: control applied={} rejected={} unmatched={}",
            outcome.applied, outcome.rejected, outcome.unmatched
        );
        outcome
    }

    async fn dispatch(&self, commands: &[ControlCommand]) -> (ControlOutcome, Vec<UnitError>) {
        let mut outcome = ControlOutcome::default();
        let mut rejections = Vec::new();
        let mut modules = self.modules.lock().await;

        for cmd in commands {
            let target = modules
                .iter_mut()
                .find(|m| m.accepts_control() && m.id().matches(&cmd.kind, &cmd.name));
            let Some(module) = target else {
                warn!("UnitService: no module {}/{}", cmd.kind, cmd.name);
                outcome.unmatched += 1;
                continue;
            };
            match module.handle_control(&cmd.value) {
                Ok(()) => outcome.applied += 1,
                Err(reason) => {
                    outcome.rejected += 1;
                    rejections.push(UnitError::InvalidControlValue {
                        module: module.id().clone(),
                        value: serde_json::to_string(&cmd.value).unwrap_or_default(),
                        reason,
                    });
                }
            }
        }
        (outcome, rejections)
    }

    // ── Error sink ────────────────────────────────────────────

    /// Publish a typed error.
    pub async fn report(&self, err: UnitError) {
        self.send_error(&err.to_string()).await;
    }

    /// Wait for connectivity, enqueue an error document, mirror to the log.
    pub async fn send_error(&self, message: &str) {
        self.connectivity.wait_ready().await;
        let body = payload::error_document(&self.identity, message);
        self.enqueue(&self.topics.error, body).await;
        error!("UnitService: {}", message);
    }

    async fn enqueue(&self, topic: &str, body: String) {
        match Message::new(topic, body) {
            Ok(message) => self.queues.outgoing.send(message).await,
            Err(e) => error!("UnitService: dropping message for '{}': {}", topic, e),
        }
    }
}
