//! Flag input with debounced auto-submit.
//!
//! Text matching `pwn.college{...}` is submitted after a quiet period;
//! Enter submits immediately and Escape clears. At most one submission is
//! in flight at a time. An auto-submit that comes due while another
//! submission is running waits for it to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use dojo_api::{DojoApi, SolveStatus};
use dojo_common::{ChallengeRef, Event, EventBus, Notification};
use dojo_config::schema::FlagConfig;
use regex::Regex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::guard::BusyGuard;
use crate::WorkspaceContext;

static FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pwn\.college\{[^}]+\}$").unwrap());

/// Whether `text` looks like a complete flag.
pub fn is_flag(text: &str) -> bool {
    FLAG_RE.is_match(text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagResult {
    Correct,
    Incorrect,
    AlreadySolved,
    Error(String),
}

impl FlagResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FlagResult::Correct | FlagResult::AlreadySolved)
    }

    pub fn message(&self) -> String {
        match self {
            FlagResult::Correct => "Correct flag!".to_string(),
            FlagResult::AlreadySolved => "Already solved.".to_string(),
            FlagResult::Incorrect => "Incorrect flag. Try again!".to_string(),
            FlagResult::Error(msg) if msg.is_empty() => {
                "Failed to submit flag. Please try again.".to_string()
            }
            FlagResult::Error(msg) => msg.clone(),
        }
    }
}

/// Auto-dismissing result of the last submission.
#[derive(Debug, Clone)]
pub struct Feedback {
    pub result: FlagResult,
    pub notice: Notification,
}

impl Feedback {
    fn new(result: FlagResult, config: &FlagConfig) -> Self {
        let notice = if result.is_success() {
            Notification::success("Flag", result.message()).with_ttl(config.success_ttl())
        } else {
            Notification::error("Flag", result.message()).with_ttl(config.failure_ttl())
        };
        Self { result, notice }
    }

    pub fn message(&self) -> &str {
        &self.notice.body
    }

    pub fn is_visible(&self) -> bool {
        !self.notice.is_expired()
    }
}

#[derive(Default)]
struct FlagState {
    value: String,
    debounce: Option<CancellationToken>,
    feedback: Option<Feedback>,
}

impl FlagState {
    fn cancel_debounce(&mut self) {
        if let Some(token) = self.debounce.take() {
            token.cancel();
        }
    }
}

struct FlagShared {
    api: Arc<dyn DojoApi>,
    catalog: Arc<Catalog>,
    events: Arc<EventBus>,
    target: ChallengeRef,
    user: Option<String>,
    config: FlagConfig,
    state: Mutex<FlagState>,
    submitting: AtomicBool,
    idle: Notify,
}

impl FlagShared {
    fn lock(&self) -> MutexGuard<'_, FlagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn submit(&self, flag: String) -> Option<FlagResult> {
        if flag.trim().is_empty() {
            return None;
        }
        let result = {
            let Some(_busy) = BusyGuard::try_acquire(&self.submitting) else {
                debug!(challenge = %self.target, "submission already in flight");
                return None;
            };
            self.send(flag).await
        };
        self.idle.notify_waiters();
        Some(result)
    }

    /// Debounced submit: waits out any in-flight submission, then sends
    /// whatever the field holds unless the timer was re-armed meanwhile.
    async fn submit_when_idle(&self, token: CancellationToken) {
        {
            let _busy = loop {
                let idle = self.idle.notified();
                tokio::pin!(idle);
                idle.as_mut().enable();
                if let Some(busy) = BusyGuard::try_acquire(&self.submitting) {
                    break busy;
                }
                debug!(challenge = %self.target, "auto-submit waiting for in-flight submission");
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = idle => {}
                }
            };

            let flag = {
                let mut state = self.lock();
                if token.is_cancelled() {
                    None
                } else {
                    state.debounce = None;
                    Some(state.value.clone()).filter(|value| is_flag(value))
                }
            };
            if let Some(flag) = flag {
                self.send(flag).await;
            }
        }
        self.idle.notify_waiters();
    }

    /// Caller holds the `submitting` flag.
    async fn send(&self, flag: String) -> FlagResult {
        info!(challenge = %self.target, "submitting flag");
        let result = match self.api.submit_solve(&self.target, &flag).await {
            Ok(SolveStatus::Correct) => FlagResult::Correct,
            Ok(SolveStatus::AlreadySolved) => FlagResult::AlreadySolved,
            Ok(SolveStatus::Incorrect) => FlagResult::Incorrect,
            Err(e) => {
                warn!(challenge = %self.target, "flag submission failed: {e}");
                FlagResult::Error(e.user_message())
            }
        };

        if result.is_success() {
            let target = &self.target;
            let recorded = self
                .catalog
                .add_solve(
                    &target.dojo_id,
                    &target.module_id,
                    &target.challenge_id,
                    self.user.as_deref(),
                )
                .await;
            if recorded {
                self.events.publish(Event::SolveRecorded(target.clone()));
            }
        }

        let mut state = self.lock();
        if result.is_success() && state.value == flag {
            state.value.clear();
        }
        state.feedback = Some(Feedback::new(result.clone(), &self.config));
        result
    }
}

/// Flag field for one challenge.
///
/// Dropping the input cancels a pending auto-submit.
pub struct FlagInput {
    shared: Arc<FlagShared>,
}

impl FlagInput {
    pub fn new(ctx: &WorkspaceContext, target: ChallengeRef, user: Option<String>) -> Self {
        Self {
            shared: Arc::new(FlagShared {
                api: ctx.api.clone(),
                catalog: ctx.catalog.clone(),
                events: ctx.events.clone(),
                target,
                user,
                config: ctx.config.flag.clone(),
                state: Mutex::new(FlagState::default()),
                submitting: AtomicBool::new(false),
                idle: Notify::new(),
            }),
        }
    }

    pub fn target(&self) -> &ChallengeRef {
        &self.shared.target
    }

    pub fn value(&self) -> String {
        self.shared.lock().value.clone()
    }

    pub fn is_valid(&self) -> bool {
        is_flag(&self.shared.lock().value)
    }

    pub fn is_submitting(&self) -> bool {
        self.shared.submitting.load(Ordering::Acquire)
    }

    /// The last result, until its display time runs out.
    pub fn feedback(&self) -> Option<Feedback> {
        let mut state = self.shared.lock();
        if state.feedback.as_ref().is_some_and(|f| !f.is_visible()) {
            state.feedback = None;
        }
        state.feedback.clone()
    }

    /// Replace the field value, re-arming the auto-submit timer when the
    /// new value is a complete flag.
    pub fn input(&self, text: impl Into<String>) {
        let mut state = self.shared.lock();
        state.value = text.into();
        state.cancel_debounce();
        if !is_flag(&state.value) {
            return;
        }

        let token = CancellationToken::new();
        state.debounce = Some(token.clone());
        let shared = self.shared.clone();
        let delay = shared.config.debounce();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            shared.submit_when_idle(token).await;
        });
    }

    /// Submit now, whatever the value looks like.
    pub async fn press_enter(&self) -> Option<FlagResult> {
        let flag = {
            let mut state = self.shared.lock();
            state.cancel_debounce();
            state.value.clone()
        };
        self.shared.submit(flag).await
    }

    pub fn press_escape(&self) {
        let mut state = self.shared.lock();
        state.cancel_debounce();
        state.value.clear();
        state.feedback = None;
    }
}

impl Drop for FlagInput {
    fn drop(&mut self) {
        self.shared.lock().cancel_debounce();
    }
}
