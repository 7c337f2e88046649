//! Workspace core for the dojo client.
//!
//! Provides:
//! - [`catalog::Catalog`]: deduplicating cache of dojos, modules and solves
//! - [`session::SessionStore`]: the active challenge, with stale-start guards
//! - [`poller::WorkspacePoller`]: reachability polling for service URLs
//! - [`flag::FlagInput`]: debounced flag submission
//! - [`controller::WorkspaceController`]: composes all of the above into a view
//! - [`boot::initialize`]: startup reconciliation
//!
//! Shared state lives in a [`WorkspaceContext`] passed around explicitly.

pub mod boot;
pub mod catalog;
pub mod controller;
pub mod flag;
mod guard;
pub mod poller;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use dojo_api::{DojoApi, Probe};
use dojo_common::EventBus;
use dojo_config::DojoConfig;

pub use boot::{initialize, BootReport};
pub use catalog::{Catalog, DisplayNames, DojoStats, LoadState};
pub use controller::{ContentPane, MismatchBanner, Pane, WorkspaceController, WorkspaceView};
pub use flag::{Feedback, FlagInput, FlagResult};
pub use poller::{PollerStatus, ProbeMachine, ProbePolicy, ProbeState, WorkspacePoller};
pub use session::{ReconcileOutcome, Session, SessionKind, SessionStore, StartOutcome};

/// Handles shared by every view in one client process.
pub struct WorkspaceContext {
    pub api: Arc<dyn DojoApi>,
    pub probe: Arc<dyn Probe>,
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionStore>,
    pub events: Arc<EventBus>,
    pub config: Arc<DojoConfig>,
    booting: AtomicBool,
}

impl WorkspaceContext {
    pub fn new(api: Arc<dyn DojoApi>, probe: Arc<dyn Probe>, config: DojoConfig) -> Self {
        let events = Arc::new(EventBus::default());
        let sessions = Arc::new(SessionStore::new(
            events.clone(),
            config.workspace.start_grace(),
        ));
        Self {
            api,
            probe,
            catalog: Arc::new(Catalog::new()),
            sessions,
            events,
            config: Arc::new(config),
            booting: AtomicBool::new(false),
        }
    }
}
