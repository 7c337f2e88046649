//! Session Store: the single record of which challenge or resource the
//! user is working on, independent of the route being viewed.
//!
//! Writes are last-write-wins. Every start is tagged with a generation and
//! its target; a start's completion is applied only if both still match,
//! so a slow confirmation for an earlier start never touches a later one.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dojo_api::{DojoApi, WorkspaceQuery};
use dojo_common::{new_correlation_id, ChallengeRef, Event, EventBus};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, DisplayNames};
use crate::guard::{BusyGuard, InFlight};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKind {
    Challenge,
    Resource { resource_type: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub target: ChallengeRef,
    pub dojo_name: String,
    pub module_name: String,
    pub challenge_name: String,
    pub kind: SessionKind,
    pub is_starting: bool,
}

impl Session {
    pub fn challenge(target: ChallengeRef, names: DisplayNames, is_starting: bool) -> Self {
        Self {
            target,
            dojo_name: names.dojo,
            module_name: names.module,
            challenge_name: names.challenge,
            kind: SessionKind::Challenge,
            is_starting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Failed(String),
    /// A newer start or a clear replaced this one before it completed.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Populated(ChallengeRef),
    NoRemoteSession,
    LocalSessionKept,
    StartInFlight,
    AlreadyInFlight,
    Failed(String),
}

pub struct SessionStore {
    state: watch::Sender<Option<Session>>,
    generation: AtomicU64,
    starts_in_flight: AtomicUsize,
    reconciling: AtomicBool,
    start_grace: Duration,
    events: Arc<EventBus>,
}

impl SessionStore {
    pub fn new(events: Arc<EventBus>, start_grace: Duration) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            generation: AtomicU64::new(0),
            starts_in_flight: AtomicUsize::new(0),
            reconciling: AtomicBool::new(false),
            start_grace,
            events,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub fn active_session(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn active_target(&self) -> Option<ChallengeRef> {
        self.state.borrow().as_ref().map(|s| s.target.clone())
    }

    pub fn is_starting(&self) -> bool {
        self.state.borrow().as_ref().is_some_and(|s| s.is_starting)
    }

    pub fn start_in_flight(&self) -> bool {
        self.starts_in_flight.load(Ordering::Acquire) > 0
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Replace the session unconditionally. Pending starts are superseded.
    pub fn set_active_session(&self, session: Session) {
        self.next_generation();
        self.replace(session);
    }

    fn replace(&self, session: Session) {
        let event = Event::SessionChanged {
            target: session.target.clone(),
            is_starting: session.is_starting,
        };
        self.state.send_replace(Some(session));
        self.events.publish(event);
    }

    /// Drop the session (termination, logout). Pending starts are superseded.
    pub fn clear_active_session(&self) {
        self.next_generation();
        if self.state.send_replace(None).is_some() {
            info!("active session cleared");
            self.events.publish(Event::SessionCleared);
        }
    }

    /// Optimistically start `target`, then confirm with the server.
    ///
    /// The grace delay applies only when there was no session before this
    /// start and the server accepted it.
    pub async fn start_challenge(
        &self,
        api: &dyn DojoApi,
        catalog: &Catalog,
        target: ChallengeRef,
        practice: bool,
    ) -> StartOutcome {
        let _in_flight = InFlight::enter(&self.starts_in_flight);
        let request_id = new_correlation_id();
        let names = catalog.display_names(&target).await;
        let had_session = self.state.borrow().is_some();

        let generation = self.next_generation();
        self.replace(Session::challenge(target.clone(), names, true));
        info!(request_id, challenge = %target, practice, "starting challenge");

        let result = api.start_challenge(&target, practice).await;
        if result.is_ok() && !had_session {
            tokio::time::sleep(self.start_grace).await;
        }

        let applied = self.state.send_if_modified(|state| match state {
            Some(session) if self.is_current(generation) && session.target == target => {
                session.is_starting = false;
                true
            }
            _ => false,
        });
        if !applied {
            debug!(request_id, challenge = %target, "start superseded, result discarded");
            return StartOutcome::Superseded;
        }

        match result {
            Ok(()) => {
                info!(request_id, challenge = %target, "challenge started");
                self.events.publish(Event::SessionChanged {
                    target,
                    is_starting: false,
                });
                StartOutcome::Started
            }
            Err(e) => {
                warn!(request_id, challenge = %target, "challenge start failed: {e}");
                let message = e.user_message();
                self.events.publish(Event::StartFailed {
                    target,
                    message: message.clone(),
                });
                StartOutcome::Failed(message)
            }
        }
    }

    /// Make a resource page the active session. Resources have no remote
    /// start step.
    pub async fn start_resource(
        &self,
        catalog: &Catalog,
        dojo_id: &str,
        module_id: &str,
        resource_id: &str,
    ) -> Session {
        let (names, resource_type) = catalog
            .resource_names(dojo_id, module_id, resource_id)
            .await;
        let session = Session {
            target: ChallengeRef::new(dojo_id, module_id, resource_id),
            dojo_name: names.dojo,
            module_name: names.module,
            challenge_name: names.challenge,
            kind: SessionKind::Resource { resource_type },
            is_starting: false,
        };
        self.set_active_session(session.clone());
        session
    }

    /// Adopt the remote workspace's challenge when nothing is active locally.
    ///
    /// Concurrent calls collapse into one; a start in flight or an existing
    /// local session always wins.
    pub async fn reconcile_from_remote(
        &self,
        api: &dyn DojoApi,
        catalog: &Catalog,
    ) -> ReconcileOutcome {
        let Some(_guard) = BusyGuard::try_acquire(&self.reconciling) else {
            debug!("reconcile already in flight");
            return ReconcileOutcome::AlreadyInFlight;
        };
        if let Some(outcome) = self.local_state_wins() {
            return outcome;
        }

        let status = match api.workspace_status(&WorkspaceQuery::default()).await {
            Ok(status) => status,
            Err(e) => {
                warn!("workspace status check failed: {e}");
                return ReconcileOutcome::Failed(e.to_string());
            }
        };
        let remote = match status.current_challenge {
            Some(remote) if status.active => remote,
            _ => return ReconcileOutcome::NoRemoteSession,
        };
        let target = remote.target();

        if let Err(e) = catalog.fetch_modules(api, &target.dojo_id).await {
            warn!(dojo = %target.dojo_id, "module prefetch failed, using raw ids: {e}");
        }
        let mut names = catalog.display_names(&target).await;
        if names.challenge == target.challenge_id {
            if let Some(name) = remote.challenge_name {
                names.challenge = name;
            }
        }
        let session = Session::challenge(target.clone(), names, false);

        if let Some(outcome) = self.local_state_wins() {
            return outcome;
        }
        let populated = self.state.send_if_modified(|state| {
            if state.is_none() && !self.start_in_flight() {
                *state = Some(session.clone());
                true
            } else {
                false
            }
        });
        if !populated {
            return ReconcileOutcome::LocalSessionKept;
        }

        info!(challenge = %target, "session restored from remote workspace");
        self.events.publish(Event::SessionChanged {
            target: target.clone(),
            is_starting: false,
        });
        ReconcileOutcome::Populated(target)
    }

    fn local_state_wins(&self) -> Option<ReconcileOutcome> {
        if self.start_in_flight() {
            Some(ReconcileOutcome::StartInFlight)
        } else if self.state.borrow().is_some() {
            Some(ReconcileOutcome::LocalSessionKept)
        } else {
            None
        }
    }
}
