use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dojo_api::{HttpApiConfig, HttpDojoApi, HttpProbe, RegisterRequest};
use dojo_common::{ChallengeRef, DojoError, Route, Service};
use dojo_config::{save_state_to_path, ClientState, DojoConfig, ENV_TOKEN};
use dojo_workspace::{
    initialize, ContentPane, FlagResult, LoadState, Pane, StartOutcome, WorkspaceContext,
    WorkspaceController,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::Command;
use crate::render;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse a route path or the `dojo/module/challenge` short form.
pub(crate) fn parse_route(input: &str) -> Result<Route, DojoError> {
    let route = if input.starts_with('/') {
        Route::parse(input)
    } else {
        match ChallengeRef::parse(input) {
            Some(target) => Route::Challenge(target),
            None => Route::parse(&format!("/dojo/{input}")),
        }
    };
    match route {
        Route::NotFound(path) => Err(DojoError::Route(path)),
        route => Ok(route),
    }
}

pub(crate) fn parse_challenge(input: &str) -> Result<ChallengeRef, DojoError> {
    match parse_route(input)? {
        Route::Challenge(target) => Ok(target),
        other => Err(DojoError::Route(format!("{other} is not a challenge"))),
    }
}

pub struct App {
    http: Arc<HttpDojoApi>,
    ctx: Arc<WorkspaceContext>,
    state: ClientState,
    state_path: Option<PathBuf>,
}

impl App {
    pub fn new(
        config: DojoConfig,
        state: ClientState,
        state_path: Option<PathBuf>,
    ) -> Result<Self, DojoError> {
        let api_config = HttpApiConfig::new(config.api.base_url.clone()).with_timeouts(
            Duration::from_secs(config.api.connect_timeout_secs.into()),
            Duration::from_secs(config.api.request_timeout_secs.into()),
        );
        let http = Arc::new(HttpDojoApi::new(api_config)?);
        let token = std::env::var(ENV_TOKEN)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| state.auth_token.clone());
        if let Some(token) = token {
            http.set_token(token);
        }
        let probe = Arc::new(HttpProbe::new(PROBE_TIMEOUT)?);
        let ctx = Arc::new(WorkspaceContext::new(http.clone(), probe, config));
        Ok(Self {
            http,
            ctx,
            state,
            state_path,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<(), DojoError> {
        match command {
            Command::Dojos => self.dojos().await,
            Command::Modules { dojo } => self.modules(&dojo).await,
            Command::Solves { dojo, user } => self.solves(&dojo, user.as_deref()).await,
            Command::Describe { challenge } => {
                let target = parse_challenge(&challenge)?;
                let text = self.ctx.api.challenge_description(&target).await?;
                println!("{text}");
                Ok(())
            }
            Command::Status { route } => self.status(route.as_deref()).await,
            Command::Start {
                challenge,
                practice,
            } => self.start(&challenge, practice).await,
            Command::Open { service, route } => self.open(service, route.as_deref()).await,
            Command::Submit { challenge, flag } => self.submit(&challenge, &flag).await,
            Command::Terminate => {
                let mut ctl = self.controller();
                ctl.terminate().await?;
                self.print_notices(&mut ctl).await;
                Ok(())
            }
            Command::ResetHome => {
                let mut ctl = self.controller();
                ctl.reset_home().await?;
                self.print_notices(&mut ctl).await;
                Ok(())
            }
            Command::Login { name, password } => {
                let session = self.http.login(&name, &password).await?;
                self.state.auth_token = session.token;
                self.state.username = Some(session.username.unwrap_or(name));
                self.save_state();
                println!(
                    "Logged in as {}",
                    self.state.username.as_deref().unwrap_or_default()
                );
                Ok(())
            }
            Command::Register {
                name,
                email,
                password,
                affiliation,
                country,
            } => {
                let request = RegisterRequest {
                    name: name.clone(),
                    email,
                    password,
                    affiliation,
                    country,
                };
                let session = self.http.register(&request).await?;
                if session.token.is_some() {
                    self.state.auth_token = session.token;
                    self.state.username = Some(session.username.unwrap_or(name));
                    self.save_state();
                }
                println!("Account created");
                Ok(())
            }
            Command::ForgotPassword { email } => {
                let message = self.http.forgot_password(&email).await?;
                println!("{message}");
                Ok(())
            }
            Command::Logout => {
                self.http.logout();
                let mut ctl = self.controller();
                ctl.logout();
                self.persist(&ctl);
                println!("Logged out");
                Ok(())
            }
        }
    }

    fn controller(&self) -> WorkspaceController {
        WorkspaceController::new(
            self.ctx.clone(),
            self.state.clone(),
            self.state.username.clone(),
        )
    }

    fn persist(&mut self, ctl: &WorkspaceController) {
        self.state = ctl.client_state().clone();
        self.save_state();
    }

    fn save_state(&self) {
        if let Some(path) = &self.state_path {
            if let Err(e) = save_state_to_path(&self.state, path) {
                warn!("Failed to save client state: {e}");
            }
        }
    }

    async fn print_notices(&self, ctl: &mut WorkspaceController) {
        for notice in &ctl.view().await.notices {
            println!("{}", render::notice_line(notice));
        }
    }

    async fn dojos(&self) -> Result<(), DojoError> {
        let catalog = &self.ctx.catalog;
        catalog.fetch_dojos(self.ctx.api.as_ref()).await?;
        for dojo in catalog.dojos().await {
            println!("{}", render::dojo_line(&dojo));
        }
        Ok(())
    }

    async fn modules(&self, dojo: &str) -> Result<(), DojoError> {
        let catalog = &self.ctx.catalog;
        if let Err(e) = catalog.fetch_dojos(self.ctx.api.as_ref()).await {
            debug!("dojo names unavailable: {e}");
        }
        let mut ctl = self.controller();
        ctl.navigate(Route::Dojo {
            dojo_id: dojo.to_string(),
        })
        .await;
        if let LoadState::Failed(message) = catalog.modules_state(dojo).await {
            return Err(DojoError::Api(message));
        }

        let view = ctl.view().await;
        println!("{}", view.header.title);
        print!("{}", render::sidebar(&view.sidebar, true));

        match catalog.fetch_solves(self.ctx.api.as_ref(), dojo, None).await {
            Ok(()) => println!("{}", render::stats_line(&catalog.stats(dojo).await)),
            Err(e) => debug!("dojo stats unavailable: {e}"),
        }
        Ok(())
    }

    async fn solves(&self, dojo: &str, user: Option<&str>) -> Result<(), DojoError> {
        let catalog = &self.ctx.catalog;
        let api = self.ctx.api.as_ref();
        catalog.fetch_solves(api, dojo, user).await?;
        if let Err(e) = catalog.fetch_modules(api, dojo).await {
            debug!("module names unavailable: {e}");
        }
        for solve in catalog.solves(dojo, user).await {
            let target = ChallengeRef::new(dojo, &solve.module_id, &solve.challenge_id);
            let names = catalog.display_names(&target).await;
            println!(
                "{}  {} / {}",
                solve.timestamp.format("%Y-%m-%d %H:%M"),
                names.module,
                names.challenge
            );
        }
        Ok(())
    }

    async fn status(&mut self, route: Option<&str>) -> Result<(), DojoError> {
        let report = initialize(&self.ctx).await;
        debug!(?report, "boot finished");

        let route = match route {
            Some(route) => Some(parse_route(route)?),
            None => self.ctx.sessions.active_target().map(Route::Challenge),
        };
        let mut ctl = self.controller();
        if let Some(route) = route {
            ctl.navigate(route).await;
        }
        if ctl.route().is_workspace() {
            if let Err(e) = ctl.refresh_status().await {
                debug!("status refresh failed: {e}");
            }
        }
        print!("{}", render::view(&ctl.view().await));
        Ok(())
    }

    async fn start(&mut self, challenge: &str, practice: bool) -> Result<(), DojoError> {
        let route = parse_route(challenge)?;
        initialize(&self.ctx).await;

        let mut ctl = self.controller();
        ctl.navigate(route).await;
        let outcome = ctl.start_viewed_challenge(practice).await;
        self.persist(&ctl);
        match outcome {
            StartOutcome::Started => {
                print!("{}", render::view(&ctl.view().await));
                Ok(())
            }
            StartOutcome::Failed(message) => Err(DojoError::Workspace(message)),
            StartOutcome::Superseded => {
                println!("Start superseded by a newer request");
                Ok(())
            }
        }
    }

    async fn open(&mut self, service: Service, route: Option<&str>) -> Result<(), DojoError> {
        initialize(&self.ctx).await;
        let route = match route {
            Some(route) => parse_route(route)?,
            None => self
                .ctx
                .sessions
                .active_target()
                .map(Route::Challenge)
                .ok_or_else(|| {
                    DojoError::Workspace(
                        "no active challenge; pass a route or run `dojo start`".into(),
                    )
                })?,
        };

        let mut ctl = self.controller();
        ctl.navigate(route).await;
        ctl.select_service(Pane::Service(service));

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let content = ctl.wait_for_service(&cancel).await;
        if let Some(banner) = ctl.view().await.banner {
            eprintln!("{}", banner.message());
        }
        self.persist(&ctl);

        match content {
            ContentPane::Service { url, .. } => {
                println!("{url}");
                Ok(())
            }
            ContentPane::ServiceError { message, .. } => Err(DojoError::Workspace(message)),
            other => Err(DojoError::Workspace(render::content_line(&other))),
        }
    }

    async fn submit(&mut self, challenge: &str, text: &str) -> Result<(), DojoError> {
        let target = parse_challenge(challenge)?;
        let mut ctl = self.controller();
        ctl.navigate(Route::Challenge(target)).await;
        let flag = ctl
            .flag()
            .ok_or_else(|| DojoError::Workspace("flag input unavailable".into()))?;

        flag.input(text);
        match flag.press_enter().await {
            Some(FlagResult::Error(message)) => Err(DojoError::Api(message)),
            Some(result) => {
                println!("{}", result.message());
                Ok(())
            }
            None => Err(DojoError::Other("nothing to submit".into())),
        }
    }
}
