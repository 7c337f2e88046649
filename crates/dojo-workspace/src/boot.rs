//! Startup: load the dojo list, then adopt any workspace already running
//! on the server.

use tracing::{info, warn};

use crate::guard::BusyGuard;
use crate::session::ReconcileOutcome;
use crate::WorkspaceContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub dojos_loaded: bool,
    /// `None` when another initialization was already running.
    pub reconcile: Option<ReconcileOutcome>,
}

/// Initialize the shared stores. Never fails; problems are logged and leave
/// the stores empty.
pub async fn initialize(ctx: &WorkspaceContext) -> BootReport {
    let Some(_guard) = BusyGuard::try_acquire(&ctx.booting) else {
        info!("initialization already running, skipping");
        return BootReport {
            dojos_loaded: false,
            reconcile: None,
        };
    };

    let dojos_loaded = match ctx.catalog.fetch_dojos(ctx.api.as_ref()).await {
        Ok(()) => true,
        Err(e) => {
            warn!("could not load dojos: {e}");
            false
        }
    };

    let outcome = ctx
        .sessions
        .reconcile_from_remote(ctx.api.as_ref(), &ctx.catalog)
        .await;
    info!(dojos_loaded, ?outcome, "workspace initialized");

    BootReport {
        dojos_loaded,
        reconcile: Some(outcome),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dojo_api::{ApiError, ProbeOutcome};
    use dojo_common::ChallengeRef;

    use super::*;
    use crate::catalog::LoadState;
    use crate::testing::{active_status, context, MockApi, ScriptedProbe};

    fn ctx(api: &Arc<MockApi>) -> Arc<WorkspaceContext> {
        context(api.clone(), Arc::new(ScriptedProbe::new(ProbeOutcome::Reachable)))
    }

    #[tokio::test]
    async fn adopts_running_workspace() {
        let api = Arc::new(MockApi::default());
        let target = ChallengeRef::new("intro", "shell", "ls");
        api.set_status(active_status(&target, None));
        let ctx = ctx(&api);

        let report = initialize(&ctx).await;

        assert!(report.dojos_loaded);
        assert_eq!(
            report.reconcile,
            Some(ReconcileOutcome::Populated(target.clone()))
        );
        let session = ctx.sessions.active_session().expect("session");
        assert_eq!(session.target, target);
        assert_eq!(session.dojo_name, "Intro to Cybersecurity");
        assert_eq!(session.challenge_name, "List Files");
        assert!(!session.is_starting);
    }

    #[tokio::test]
    async fn idle_server_leaves_store_empty() {
        let api = Arc::new(MockApi::default());
        let ctx = ctx(&api);

        let report = initialize(&ctx).await;

        assert_eq!(report.reconcile, Some(ReconcileOutcome::NoRemoteSession));
        assert_eq!(ctx.sessions.active_session(), None);
        assert_eq!(ctx.catalog.dojos_state().await, LoadState::Loaded);
    }

    #[tokio::test]
    async fn status_failure_is_reported_not_raised() {
        let api = Arc::new(MockApi::default());
        *api.status_error.lock().unwrap() = Some(ApiError::Network("refused".into()));
        let ctx = ctx(&api);

        let report = initialize(&ctx).await;

        assert!(report.dojos_loaded);
        assert!(matches!(report.reconcile, Some(ReconcileOutcome::Failed(_))));
        assert_eq!(ctx.sessions.active_session(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_initialization_runs_once() {
        let api = Arc::new(MockApi::default());
        *api.status_delay.lock().unwrap() = Duration::from_millis(200);
        let ctx = ctx(&api);

        let (first, second) = tokio::join!(initialize(&ctx), initialize(&ctx));

        assert!(first.reconcile.is_some());
        assert_eq!(second.reconcile, None);
        assert!(!second.dojos_loaded);
        assert_eq!(api.calls("dojos"), 1);
        assert_eq!(api.calls("status"), 1);

        let again = initialize(&ctx).await;
        assert!(again.reconcile.is_some());
    }
}
