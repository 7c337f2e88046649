//! Workspace Poller: turns "is the service URL reachable yet" into a
//! loading / ready / error signal.
//!
//! [`ProbeMachine`] is the pure transition function; [`WorkspacePoller`]
//! drives it on a timer in a background task. Starting a new probe cancels
//! the previous one, and every status write is checked against the probe
//! generation so a cancelled probe can never publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dojo_api::{Probe, ProbeOutcome};
use dojo_common::{Event, EventBus, Service};
use dojo_config::schema::WorkspaceConfig;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerStatus {
    Idle,
    Loading { service: Service, attempt: u32 },
    Ready { service: Service, url: String },
    Error { service: Service, message: String },
}

impl PollerStatus {
    pub fn service(&self) -> Option<Service> {
        match self {
            PollerStatus::Idle => None,
            PollerStatus::Loading { service, .. }
            | PollerStatus::Ready { service, .. }
            | PollerStatus::Error { service, .. } => Some(*service),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Probing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Consecutive unverifiable outcomes after which the service is
    /// assumed reachable.
    pub fail_open_after: u32,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
            fail_open_after: 3,
        }
    }
}

impl From<&WorkspaceConfig> for ProbePolicy {
    fn from(config: &WorkspaceConfig) -> Self {
        Self {
            interval: config.probe_interval(),
            max_attempts: config.probe_max_attempts,
            fail_open_after: config.fail_open_after,
        }
    }
}

/// Probe state for one `(service, url)` pair.
#[derive(Debug, Clone)]
pub struct ProbeMachine {
    service: Service,
    policy: ProbePolicy,
    attempt: u32,
    unverifiable_streak: u32,
    state: ProbeState,
}

impl ProbeMachine {
    pub fn new(service: Service, policy: ProbePolicy) -> Self {
        Self {
            service,
            policy,
            attempt: 0,
            unverifiable_streak: 0,
            state: ProbeState::Probing,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Feed one probe outcome. Terminal states absorb further input.
    pub fn observe(&mut self, outcome: ProbeOutcome) -> ProbeState {
        if self.state != ProbeState::Probing {
            return self.state;
        }
        self.attempt += 1;

        match outcome {
            ProbeOutcome::Reachable => self.state = ProbeState::Ready,
            ProbeOutcome::NotReady => self.unverifiable_streak = 0,
            ProbeOutcome::Unverifiable => {
                self.unverifiable_streak += 1;
                if self.unverifiable_streak >= self.policy.fail_open_after {
                    self.state = ProbeState::Ready;
                }
            }
        }

        if self.state == ProbeState::Probing && self.attempt >= self.policy.max_attempts {
            self.state = ProbeState::Failed;
        }
        self.state
    }

    pub fn failure_message(&self) -> String {
        format!(
            "{} service timed out after {} attempts",
            self.service.label(),
            self.attempt
        )
    }
}

struct ActiveProbe {
    service: Service,
    url: String,
    cancel: CancellationToken,
}

/// Drives [`ProbeMachine`] against a real [`Probe`] in a background task.
///
/// Dropping the poller cancels any running probe.
pub struct WorkspacePoller {
    probe: Arc<dyn Probe>,
    policy: ProbePolicy,
    status: Arc<watch::Sender<PollerStatus>>,
    generation: Arc<AtomicU64>,
    active: Mutex<Option<ActiveProbe>>,
    events: Option<Arc<EventBus>>,
}

impl WorkspacePoller {
    pub fn new(probe: Arc<dyn Probe>, policy: ProbePolicy) -> Self {
        let (status, _) = watch::channel(PollerStatus::Idle);
        Self {
            probe,
            policy,
            status: Arc::new(status),
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
            events: None,
        }
    }

    /// Announce terminal probe results on `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn status(&self) -> PollerStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerStatus> {
        self.status.subscribe()
    }

    /// The `(service, url)` currently being watched.
    pub fn target(&self) -> Option<(Service, String)> {
        self.lock()
            .as_ref()
            .map(|active| (active.service, active.url.clone()))
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveProbe>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Watch `url` for `service`. Returns `false` when the inputs are
    /// unchanged; a timed-out probe stays failed until [`retry`](Self::retry).
    pub fn watch(&self, service: Service, url: impl Into<String>) -> bool {
        let url = url.into();
        let mut active = self.lock();
        if let Some(current) = active.as_ref() {
            if current.service == service && current.url == url {
                debug!(%service, url = %url, "probe inputs unchanged, skipping");
                return false;
            }
        }
        self.start(&mut active, service, url);
        true
    }

    /// Restart probing for the last inputs after an error.
    pub fn retry(&self) -> bool {
        let mut active = self.lock();
        let Some((service, url)) = active
            .as_ref()
            .map(|current| (current.service, current.url.clone()))
        else {
            return false;
        };
        if !matches!(*self.status.borrow(), PollerStatus::Error { .. }) {
            return false;
        }
        info!(%service, "retrying workspace probe");
        self.start(&mut active, service, url);
        true
    }

    /// Stop probing and return to `Idle`.
    pub fn cancel(&self) {
        let mut active = self.lock();
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
        }
        let generation = &self.generation;
        self.status.send_modify(|status| {
            generation.fetch_add(1, Ordering::AcqRel);
            *status = PollerStatus::Idle;
        });
    }

    fn start(&self, active: &mut Option<ActiveProbe>, service: Service, url: String) {
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
        }

        // Bumped under the status lock so a stale task cannot slip a write
        // in between.
        let mut generation = 0;
        self.status.send_modify(|status| {
            generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            *status = PollerStatus::Loading {
                service,
                attempt: 0,
            };
        });

        let cancel = CancellationToken::new();
        *active = Some(ActiveProbe {
            service,
            url: url.clone(),
            cancel: cancel.clone(),
        });

        info!(%service, url = %url, "probing workspace service");
        tokio::spawn(run_probe(
            self.probe.clone(),
            self.policy,
            self.status.clone(),
            self.generation.clone(),
            generation,
            self.events.clone(),
            cancel,
            service,
            url,
        ));
    }
}

impl Drop for WorkspacePoller {
    fn drop(&mut self) {
        if let Some(active) = self.lock().take() {
            active.cancel.cancel();
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_probe(
    probe: Arc<dyn Probe>,
    policy: ProbePolicy,
    status: Arc<watch::Sender<PollerStatus>>,
    current: Arc<AtomicU64>,
    generation: u64,
    events: Option<Arc<EventBus>>,
    cancel: CancellationToken,
    service: Service,
    url: String,
) {
    let mut machine = ProbeMachine::new(service, policy);

    loop {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = probe.probe(&url) => outcome,
        };
        let state = machine.observe(outcome);
        debug!(%service, attempt = machine.attempt(), ?outcome, "probe attempt");

        let (next, event) = match state {
            ProbeState::Probing => (
                PollerStatus::Loading {
                    service,
                    attempt: machine.attempt(),
                },
                None,
            ),
            ProbeState::Ready => (
                PollerStatus::Ready {
                    service,
                    url: url.clone(),
                },
                Some(Event::ServiceReady {
                    service,
                    url: url.clone(),
                }),
            ),
            ProbeState::Failed => {
                let message = machine.failure_message();
                (
                    PollerStatus::Error {
                        service,
                        message: message.clone(),
                    },
                    Some(Event::ServiceFailed { service, message }),
                )
            }
        };

        let published = status.send_if_modified(|status| {
            if current.load(Ordering::Acquire) != generation {
                return false;
            }
            *status = next;
            true
        });
        if !published {
            debug!(%service, "stale probe result discarded");
            return;
        }
        if let (Some(events), Some(event)) = (&events, event) {
            events.publish(event);
        }

        match state {
            ProbeState::Probing => {}
            ProbeState::Ready => {
                info!(%service, attempts = machine.attempt(), "workspace service ready");
                return;
            }
            ProbeState::Failed => {
                warn!(%service, attempts = machine.attempt(), "workspace service never became ready");
                return;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests;
