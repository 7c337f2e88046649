//! In-memory `DojoApi` and `Probe` doubles for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dojo_api::{
    ApiError, Challenge, Dojo, DojoApi, Module, Probe, ProbeOutcome, Resource, Solve, SolveStatus,
    WorkspaceQuery, WorkspaceStatus,
};
use dojo_common::ChallengeRef;
use dojo_config::DojoConfig;

use crate::WorkspaceContext;

pub(crate) struct MockApi {
    pub dojos: Mutex<Vec<Dojo>>,
    pub modules: Mutex<HashMap<String, Vec<Module>>>,
    pub solves: Mutex<Vec<Solve>>,
    pub status: Mutex<WorkspaceStatus>,
    pub status_error: Mutex<Option<ApiError>>,
    pub status_delay: Mutex<Duration>,
    pub modules_error: Mutex<Option<ApiError>>,
    pub start_delays: Mutex<HashMap<String, Duration>>,
    pub start_error: Mutex<Option<ApiError>>,
    pub solve_result: Mutex<Result<SolveStatus, ApiError>>,
    pub submit_delay: Mutex<Duration>,
    pub terminate_error: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            dojos: Mutex::new(vec![Dojo {
                id: "intro".into(),
                name: "Intro to Cybersecurity".into(),
                description: None,
                official: true,
            }]),
            modules: Mutex::new(HashMap::from([("intro".to_string(), intro_modules())])),
            solves: Mutex::new(Vec::new()),
            status: Mutex::new(WorkspaceStatus::default()),
            status_error: Mutex::new(None),
            status_delay: Mutex::new(Duration::ZERO),
            modules_error: Mutex::new(None),
            start_delays: Mutex::new(HashMap::new()),
            start_error: Mutex::new(None),
            solve_result: Mutex::new(Ok(SolveStatus::Correct)),
            submit_delay: Mutex::new(Duration::from_millis(50)),
            terminate_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

pub(crate) fn intro_modules() -> Vec<Module> {
    vec![
        Module {
            id: "shell".into(),
            name: "Using the Shell".into(),
            description: None,
            challenges: vec![
                challenge("cat", "Cat a File"),
                challenge("ls", "List Files"),
                challenge("pipe", "Pipes"),
            ],
            resources: vec![Resource {
                id: "lecture".into(),
                name: "Shell Lecture".into(),
                resource_type: "lecture".into(),
            }],
        },
        Module {
            id: "web".into(),
            name: "Web Security".into(),
            description: None,
            challenges: vec![challenge("xss", "Cross-Site Scripting")],
            resources: Vec::new(),
        },
    ]
}

fn challenge(id: &str, name: &str) -> Challenge {
    Challenge {
        id: id.into(),
        name: name.into(),
        required: true,
        description: None,
    }
}

pub(crate) fn active_status(target: &ChallengeRef, iframe_src: Option<&str>) -> WorkspaceStatus {
    WorkspaceStatus {
        active: true,
        iframe_src: iframe_src.map(str::to_string),
        current_challenge: Some(dojo_api::RemoteChallenge {
            dojo_id: target.dojo_id.clone(),
            module_id: target.module_id.clone(),
            challenge_id: target.challenge_id.clone(),
            challenge_name: None,
        }),
    }
}

impl MockApi {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn set_status(&self, status: WorkspaceStatus) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait]
impl DojoApi for MockApi {
    async fn list_dojos(&self) -> Result<Vec<Dojo>, ApiError> {
        self.record("dojos");
        Ok(self.dojos.lock().unwrap().clone())
    }

    async fn list_modules(&self, dojo_id: &str) -> Result<Vec<Module>, ApiError> {
        self.record(format!("modules:{dojo_id}"));
        tokio::task::yield_now().await;
        if let Some(err) = self.modules_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .modules
            .lock()
            .unwrap()
            .get(dojo_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_solves(
        &self,
        dojo_id: &str,
        username: Option<&str>,
    ) -> Result<Vec<Solve>, ApiError> {
        self.record(format!("solves:{dojo_id}:{}", username.unwrap_or("all")));
        Ok(self.solves.lock().unwrap().clone())
    }

    async fn challenge_description(&self, target: &ChallengeRef) -> Result<String, ApiError> {
        self.record(format!("description:{target}"));
        Ok(format!("Description of {}", target.challenge_id))
    }

    async fn submit_solve(
        &self,
        target: &ChallengeRef,
        submission: &str,
    ) -> Result<SolveStatus, ApiError> {
        self.record(format!("submit:{target}:{submission}"));
        let delay = *self.submit_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.solve_result.lock().unwrap().clone()
    }

    async fn start_challenge(&self, target: &ChallengeRef, practice: bool) -> Result<(), ApiError> {
        self.record(format!("start:{target}:{practice}"));
        let delay = self
            .start_delays
            .lock()
            .unwrap()
            .get(&target.challenge_id)
            .copied()
            .unwrap_or(Duration::from_millis(100));
        tokio::time::sleep(delay).await;
        match self.start_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn workspace_status(&self, query: &WorkspaceQuery) -> Result<WorkspaceStatus, ApiError> {
        let service = query.service.map(|s| s.as_str()).unwrap_or("none");
        self.record(format!("status:{service}"));
        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.status_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.status.lock().unwrap().clone())
    }

    async fn reset_home(&self) -> Result<(), ApiError> {
        self.record("reset_home");
        Ok(())
    }

    async fn terminate_workspace(&self) -> Result<(), ApiError> {
        self.record("terminate");
        match self.terminate_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Probe that replays a per-URL script, then repeats a default outcome.
pub(crate) struct ScriptedProbe {
    scripts: Mutex<HashMap<String, Vec<ProbeOutcome>>>,
    delays: Mutex<HashMap<String, Duration>>,
    default: ProbeOutcome,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProbe {
    pub fn new(default: ProbeOutcome) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            default,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, url: &str, outcomes: Vec<ProbeOutcome>) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), outcomes);
        self
    }

    pub fn delay(self, url: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(script) if !script.is_empty() => script.remove(0),
            _ => self.default,
        }
    }
}

pub(crate) fn solve(module: &str, challenge: &str, user: &str, hours_ago: i64) -> Solve {
    Solve {
        module_id: module.into(),
        challenge_id: challenge.into(),
        timestamp: Utc::now() - chrono::Duration::hours(hours_ago),
        user_id: Some(user.into()),
    }
}

pub(crate) fn context(api: Arc<MockApi>, probe: Arc<ScriptedProbe>) -> Arc<WorkspaceContext> {
    Arc::new(WorkspaceContext::new(api, probe, DojoConfig::default()))
}

/// Let spawned tasks run without advancing the paused clock.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
