//! Workspace View Controller.
//!
//! Composes the current route, the Session Store, the last workspace status
//! and the poller into a [`WorkspaceView`]. A remote workspace bound to a
//! different challenge than the one on screen produces a [`MismatchBanner`];
//! the controller never navigates or terminates on its own, and the only
//! corrective action is [`WorkspaceController::start_viewed_challenge`].

use std::collections::HashSet;
use std::sync::Arc;

use dojo_api::{workspace_url, ApiError, WorkspaceQuery, WorkspaceStatus};
use dojo_common::{ChallengeRef, Event, Notification, NotificationQueue, Route, Service};
use dojo_config::ClientState;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::flag::FlagInput;
use crate::poller::{PollerStatus, ProbePolicy, WorkspacePoller};
use crate::session::{Session, StartOutcome};
use crate::WorkspaceContext;

/// What the main pane is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Challenge,
    Service(Service),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPane {
    /// The route has no workspace (home, leaderboard, ...).
    Empty,
    Description {
        challenge: String,
        text: Option<String>,
    },
    Resource {
        name: String,
        resource_type: Option<String>,
    },
    NotStarted,
    Starting,
    Loading {
        service: Service,
        attempt: u32,
        max_attempts: u32,
    },
    Service {
        service: Service,
        url: String,
    },
    ServiceError {
        service: Service,
        message: String,
    },
    StatusUnavailable {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchBanner {
    pub viewing: ChallengeRef,
    pub running: ChallengeRef,
    pub running_name: String,
    pub running_module: String,
}

impl MismatchBanner {
    pub fn message(&self) -> String {
        format!(
            "Your workspace is running \"{}\" ({}). Start this challenge to switch.",
            self.running_name, self.running_module
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub title: String,
    pub dojo_name: Option<String>,
    pub module_name: Option<String>,
    pub solved: bool,
    pub pane: Pane,
    pub flag_enabled: bool,
    /// The active session, shown on every page.
    pub active: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItem {
    pub id: String,
    pub name: String,
    pub solved: bool,
    pub viewing: bool,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarModule {
    pub id: String,
    pub name: String,
    pub expanded: bool,
    pub challenges: Vec<SidebarItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidebarView {
    pub dojo_id: Option<String>,
    pub modules: Vec<SidebarModule>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceView {
    pub header: HeaderView,
    pub sidebar: SidebarView,
    pub content: ContentPane,
    pub banner: Option<MismatchBanner>,
    pub notices: Vec<Notification>,
}

pub struct WorkspaceController {
    ctx: Arc<WorkspaceContext>,
    route: Route,
    pane: Pane,
    expanded: HashSet<String>,
    status: Option<WorkspaceStatus>,
    status_error: Option<String>,
    announced_mismatch: Option<ChallengeRef>,
    poller: WorkspacePoller,
    flag: Option<FlagInput>,
    description: Option<(ChallengeRef, String)>,
    notices: NotificationQueue,
    client_state: ClientState,
    username: Option<String>,
}

impl WorkspaceController {
    pub fn new(
        ctx: Arc<WorkspaceContext>,
        client_state: ClientState,
        username: Option<String>,
    ) -> Self {
        let service = client_state
            .last_service()
            .unwrap_or(ctx.config.workspace.default_service);
        let poller = WorkspacePoller::new(
            ctx.probe.clone(),
            ProbePolicy::from(&ctx.config.workspace),
        )
        .with_events(ctx.events.clone());
        Self {
            ctx,
            route: Route::Home,
            pane: Pane::Service(service),
            expanded: HashSet::new(),
            status: None,
            status_error: None,
            announced_mismatch: None,
            poller,
            flag: None,
            description: None,
            notices: NotificationQueue::default(),
            client_state,
            username,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn poller(&self) -> &WorkspacePoller {
        &self.poller
    }

    pub fn flag(&self) -> Option<&FlagInput> {
        self.flag.as_ref()
    }

    pub fn client_state(&self) -> &ClientState {
        &self.client_state
    }

    pub fn workspace_status(&self) -> Option<&WorkspaceStatus> {
        self.status.as_ref()
    }

    /// Service used for status queries and the poller.
    pub fn current_service(&self) -> Service {
        match self.pane {
            Pane::Service(service) => service,
            Pane::Challenge => self
                .client_state
                .last_service()
                .unwrap_or(self.ctx.config.workspace.default_service),
        }
    }

    fn theme(&self) -> String {
        self.client_state
            .theme
            .clone()
            .unwrap_or_else(|| self.ctx.config.appearance.theme.clone())
    }

    pub async fn navigate(&mut self, route: Route) {
        debug!(%route, "navigate");
        if route.challenge() != self.route.challenge() {
            self.flag = route
                .challenge()
                .map(|target| FlagInput::new(&self.ctx, target.clone(), self.username.clone()));
            self.description = None;
        }
        if let Some(module_id) = route.module_id() {
            self.expanded.insert(module_id.to_string());
        }
        self.route = route;

        if let Some(dojo_id) = self.route.dojo_id().map(str::to_string) {
            let api = self.ctx.api.clone();
            if let Err(e) = self.ctx.catalog.fetch_dojos(api.as_ref()).await {
                warn!("could not load dojos: {e}");
            }
            if let Err(e) = self.ctx.catalog.fetch_modules(api.as_ref(), &dojo_id).await {
                warn!(dojo = %dojo_id, "could not load modules: {e}");
            }
            let user = self.username.as_deref();
            if let Err(e) = self.ctx.catalog.fetch_solves(api.as_ref(), &dojo_id, user).await {
                warn!(dojo = %dojo_id, "could not load solves: {e}");
            }
        }
        if let Some(target) = self.route.challenge().cloned() {
            self.load_description(target).await;
        }
    }

    async fn load_description(&mut self, target: ChallengeRef) {
        if self.description.as_ref().is_some_and(|(t, _)| *t == target) {
            return;
        }
        match self.ctx.api.challenge_description(&target).await {
            Ok(text) => self.description = Some((target, text)),
            Err(e) => warn!(challenge = %target, "could not load description: {e}"),
        }
    }

    pub fn toggle_module(&mut self, module_id: &str) {
        if !self.expanded.remove(module_id) {
            self.expanded.insert(module_id.to_string());
        }
    }

    /// Switch the main pane. Call [`refresh_status`](Self::refresh_status)
    /// afterwards to load the new service.
    pub fn select_service(&mut self, pane: Pane) {
        self.pane = pane;
        if let Pane::Service(service) = pane {
            let max = self.ctx.config.workspace.service_history_len;
            self.client_state.record_service(service, max);
            debug!(%service, "service selected");
        }
    }

    /// Fetch the workspace status and drive the poller from it.
    ///
    /// Returns `true` while the workspace is active but has not produced a
    /// service URL yet; callers should refresh again after the configured
    /// interval.
    pub async fn refresh_status(&mut self) -> Result<bool, ApiError> {
        let service = self.current_service();
        let query = WorkspaceQuery::for_service(service).with_theme(self.theme());
        let status = match self.ctx.api.workspace_status(&query).await {
            Ok(status) => status,
            Err(e) => {
                warn!(%service, "workspace status failed: {e}");
                self.status_error = Some(e.user_message());
                return Err(e);
            }
        };
        self.status_error = None;

        if status.active {
            if let Some(src) = status.iframe_src.as_deref() {
                let url = workspace_url(&self.ctx.config.api.workspace_origin, Some(src), service);
                self.poller.watch(service, url);
            }
        } else {
            self.poller.cancel();
        }

        let needs_refresh = status.active && status.iframe_src.is_none();
        self.status = Some(status);
        self.announce_mismatch();
        Ok(needs_refresh)
    }

    /// Refresh until the current service settles, then return the content.
    pub async fn wait_for_service(&mut self, cancel: &CancellationToken) -> ContentPane {
        let interval = self.ctx.config.workspace.status_refresh();
        loop {
            match self.refresh_status().await {
                Ok(true) => {}
                Ok(false) | Err(_) => break,
            }
            tokio::select! {
                _ = cancel.cancelled() => return self.content().await,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        let mut rx = self.poller.subscribe();
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = rx.wait_for(|s| !matches!(s, PollerStatus::Loading { .. })) => {}
        }
        self.content().await
    }

    fn mismatch_targets(&self) -> Option<(ChallengeRef, ChallengeRef)> {
        let viewing = self.route.challenge()?;
        let running = self.status.as_ref()?.current_challenge.as_ref()?.target();
        (running != *viewing).then(|| (viewing.clone(), running))
    }

    fn announce_mismatch(&mut self) {
        match self.mismatch_targets() {
            Some((viewing, running)) => {
                if self.announced_mismatch.as_ref() != Some(&running) {
                    info!(viewing = %viewing, running = %running, "workspace is running another challenge");
                    self.ctx.events.publish(Event::WorkspaceMismatch {
                        viewing,
                        running: running.clone(),
                    });
                    self.announced_mismatch = Some(running);
                }
            }
            None => self.announced_mismatch = None,
        }
    }

    /// Start whatever the route shows: a challenge (remote start) or a
    /// resource (local only).
    pub async fn start_viewed_challenge(&mut self, practice: bool) -> StartOutcome {
        match self.route.clone() {
            Route::Challenge(target) => {
                self.poller.cancel();
                let outcome = self
                    .ctx
                    .sessions
                    .start_challenge(self.ctx.api.as_ref(), &self.ctx.catalog, target, practice)
                    .await;
                match &outcome {
                    StartOutcome::Started => {
                        if let Err(e) = self.refresh_status().await {
                            self.notices
                                .push(Notification::warning("Workspace", e.user_message()));
                        }
                    }
                    StartOutcome::Failed(message) => {
                        self.notices
                            .push(Notification::error("Start failed", message.clone()));
                    }
                    StartOutcome::Superseded => {}
                }
                outcome
            }
            Route::Resource {
                dojo_id,
                module_id,
                resource_id,
            } => {
                self.ctx
                    .sessions
                    .start_resource(&self.ctx.catalog, &dojo_id, &module_id, &resource_id)
                    .await;
                StartOutcome::Started
            }
            _ => StartOutcome::Failed("Not viewing a challenge".into()),
        }
    }

    pub fn retry(&mut self) -> bool {
        self.poller.retry()
    }

    pub async fn terminate(&mut self) -> Result<(), ApiError> {
        match self.ctx.api.terminate_workspace().await {
            Ok(()) => {
                self.ctx.sessions.clear_active_session();
                self.poller.cancel();
                self.status = None;
                self.announced_mismatch = None;
                self.notices
                    .push(Notification::success("Workspace", "Workspace terminated"));
                Ok(())
            }
            Err(e) => {
                warn!("terminate failed: {e}");
                self.notices
                    .push(Notification::error("Terminate failed", e.user_message()));
                Err(e)
            }
        }
    }

    pub async fn reset_home(&mut self) -> Result<(), ApiError> {
        match self.ctx.api.reset_home().await {
            Ok(()) => {
                info!("home directory reset");
                self.notices
                    .push(Notification::success("Workspace", "Home directory reset"));
                Ok(())
            }
            Err(e) => {
                warn!("reset home failed: {e}");
                self.notices
                    .push(Notification::error("Reset failed", e.user_message()));
                Err(e)
            }
        }
    }

    /// Forget the user: session, token, and per-user flag state.
    pub fn logout(&mut self) {
        self.ctx.sessions.clear_active_session();
        self.client_state.clear_token();
        self.username = None;
        self.poller.cancel();
        self.status = None;
        self.flag = self
            .route
            .challenge()
            .map(|target| FlagInput::new(&self.ctx, target.clone(), None));
    }

    pub async fn view(&mut self) -> WorkspaceView {
        let header = self.header().await;
        let sidebar = self.sidebar().await;
        let content = self.content().await;
        let banner = self.banner().await;
        let notices = self.notices.visible().into_iter().cloned().collect();
        WorkspaceView {
            header,
            sidebar,
            content,
            banner,
            notices,
        }
    }

    async fn header(&self) -> HeaderView {
        let catalog = &self.ctx.catalog;
        let (title, dojo_name, module_name) = match &self.route {
            Route::Challenge(target) => {
                let names = catalog.display_names(target).await;
                (names.challenge, Some(names.dojo), Some(names.module))
            }
            Route::Resource {
                dojo_id,
                module_id,
                resource_id,
            } => {
                let (names, _) = catalog.resource_names(dojo_id, module_id, resource_id).await;
                (names.challenge, Some(names.dojo), Some(names.module))
            }
            Route::Module { dojo_id, module_id } => {
                let names = catalog
                    .display_names(&ChallengeRef::new(dojo_id, module_id, ""))
                    .await;
                (names.module.clone(), Some(names.dojo), Some(names.module))
            }
            Route::Dojo { dojo_id } => {
                let name = catalog
                    .dojo(dojo_id)
                    .await
                    .map(|d| d.name)
                    .unwrap_or_else(|| dojo_id.clone());
                (name.clone(), Some(name), None)
            }
            other => (other.to_string(), None, None),
        };

        let solved = match self.route.challenge() {
            Some(target) => catalog.is_solved(target, self.username.as_deref()).await,
            None => false,
        };

        HeaderView {
            title,
            dojo_name,
            module_name,
            solved,
            pane: self.pane,
            flag_enabled: self.flag.is_some(),
            active: self.ctx.sessions.active_session(),
        }
    }

    async fn sidebar(&self) -> SidebarView {
        let Some(dojo_id) = self.route.dojo_id() else {
            return SidebarView::default();
        };
        let catalog = &self.ctx.catalog;
        let viewing = self.route.challenge();
        let running = self.ctx.sessions.active_target();
        let user = self.username.as_deref();

        let mut modules = Vec::new();
        for module in catalog.modules(dojo_id).await {
            let solved = catalog.solved_in_module(dojo_id, &module.id, user).await;
            let challenges = module
                .challenges
                .iter()
                .map(|c| {
                    let target = ChallengeRef::new(dojo_id, &module.id, &c.id);
                    SidebarItem {
                        id: c.id.clone(),
                        name: c.name.clone(),
                        solved: solved.contains(&c.id),
                        viewing: viewing == Some(&target),
                        running: running.as_ref() == Some(&target),
                    }
                })
                .collect();
            modules.push(SidebarModule {
                expanded: self.expanded.contains(&module.id),
                id: module.id,
                name: module.name,
                challenges,
            });
        }

        SidebarView {
            dojo_id: Some(dojo_id.to_string()),
            modules,
        }
    }

    async fn content(&self) -> ContentPane {
        let target = match &self.route {
            Route::Challenge(target) => target,
            Route::Resource {
                dojo_id,
                module_id,
                resource_id,
            } => {
                let (names, resource_type) = self
                    .ctx
                    .catalog
                    .resource_names(dojo_id, module_id, resource_id)
                    .await;
                return ContentPane::Resource {
                    name: names.challenge,
                    resource_type,
                };
            }
            _ => return ContentPane::Empty,
        };

        let service = match self.pane {
            Pane::Challenge => {
                let names = self.ctx.catalog.display_names(target).await;
                return ContentPane::Description {
                    challenge: names.challenge,
                    text: self
                        .description
                        .as_ref()
                        .filter(|(t, _)| t == target)
                        .map(|(_, text)| text.clone()),
                };
            }
            Pane::Service(service) => service,
        };

        if let Some(session) = self.ctx.sessions.active_session() {
            if session.target == *target && session.is_starting {
                return ContentPane::Starting;
            }
        }

        let loading = |attempt| ContentPane::Loading {
            service,
            attempt,
            max_attempts: self.ctx.config.workspace.probe_max_attempts,
        };

        let Some(status) = &self.status else {
            return match &self.status_error {
                Some(message) => ContentPane::StatusUnavailable {
                    message: message.clone(),
                },
                None => loading(0),
            };
        };
        if !status.active {
            return ContentPane::NotStarted;
        }

        match self.poller.status() {
            PollerStatus::Loading { service: s, attempt } if s == service => loading(attempt),
            PollerStatus::Ready { service: s, url } if s == service => {
                ContentPane::Service { service, url }
            }
            PollerStatus::Error { service: s, message } if s == service => {
                ContentPane::ServiceError { service, message }
            }
            _ => loading(0),
        }
    }

    async fn banner(&self) -> Option<MismatchBanner> {
        let (viewing, running) = self.mismatch_targets()?;
        let mut names = self.ctx.catalog.display_names(&running).await;
        if names.challenge == running.challenge_id {
            let remote_name = self
                .status
                .as_ref()
                .and_then(|s| s.current_challenge.as_ref())
                .and_then(|c| c.challenge_name.clone());
            if let Some(name) = remote_name {
                names.challenge = name;
            }
        }
        Some(MismatchBanner {
            viewing,
            running,
            running_name: names.challenge,
            running_module: names.module,
        })
    }
}
