//! Client-side cache of dojos, modules and solves.
//!
//! Every fetch is deduplicated per key: a request is only issued when the
//! key is neither loaded nor already loading. Readers go through the
//! selector methods; `subscribe()` yields a revision counter that bumps on
//! every change.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dojo_api::{ApiError, Dojo, DojoApi, Module, Solve};
use dojo_common::ChallengeRef;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

/// Load state of one cached key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

struct Slot<T> {
    data: Option<T>,
    /// `data` was written locally and has not been fetched yet.
    provisional: bool,
    loading: bool,
    error: Option<String>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            data: None,
            provisional: false,
            loading: false,
            error: None,
        }
    }
}

impl<T> Slot<T> {
    /// Mark the slot loading. Returns `false` if it is loaded or loading.
    fn begin(&mut self) -> bool {
        if self.loading || self.is_loaded() {
            return false;
        }
        self.loading = true;
        self.error = None;
        true
    }

    fn finish(&mut self, result: Result<T, ApiError>) -> Result<(), ApiError> {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.provisional = false;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.data.is_some() && !self.provisional
    }

    fn state(&self) -> LoadState {
        if self.loading {
            LoadState::Loading
        } else if self.is_loaded() {
            LoadState::Loaded
        } else if let Some(err) = &self.error {
            LoadState::Failed(err.clone())
        } else {
            LoadState::Idle
        }
    }
}

/// Solves are cached per dojo and per user; `user: None` is the dojo-wide list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SolvesKey {
    dojo_id: String,
    user: Option<String>,
}

impl SolvesKey {
    fn new(dojo_id: &str, user: Option<&str>) -> Self {
        Self {
            dojo_id: dojo_id.to_string(),
            user: user.map(str::to_string),
        }
    }
}

#[derive(Default)]
struct CatalogState {
    dojos: Slot<Vec<Dojo>>,
    modules: HashMap<String, Slot<Vec<Module>>>,
    solves: HashMap<SolvesKey, Slot<Vec<Solve>>>,
}

/// Human-readable names for a challenge, falling back to raw IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNames {
    pub dojo: String,
    pub module: String,
    pub challenge: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DojoStats {
    pub total_challenges: usize,
    pub total_solves: usize,
    pub unique_hackers: usize,
    /// Distinct solvers in the last 24 hours.
    pub hacking_now: usize,
}

pub struct Catalog {
    state: RwLock<CatalogState>,
    revision: watch::Sender<u64>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(CatalogState::default()),
            revision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    pub async fn fetch_dojos(&self, api: &dyn DojoApi) -> Result<(), ApiError> {
        if !self.state.write().await.dojos.begin() {
            debug!("dojos already loaded or loading");
            return Ok(());
        }
        let result = api.list_dojos().await;
        let outcome = self.state.write().await.dojos.finish(result);
        self.bump();
        outcome
    }

    pub async fn fetch_modules(&self, api: &dyn DojoApi, dojo_id: &str) -> Result<(), ApiError> {
        {
            let mut state = self.state.write().await;
            if !state.modules.entry(dojo_id.to_string()).or_default().begin() {
                debug!(dojo = dojo_id, "modules already loaded or loading");
                return Ok(());
            }
        }
        let result = api.list_modules(dojo_id).await;
        if let Err(e) = &result {
            warn!(dojo = dojo_id, "failed to fetch modules: {e}");
        }
        let outcome = self
            .state
            .write()
            .await
            .modules
            .entry(dojo_id.to_string())
            .or_default()
            .finish(result);
        self.bump();
        outcome
    }

    pub async fn fetch_solves(
        &self,
        api: &dyn DojoApi,
        dojo_id: &str,
        user: Option<&str>,
    ) -> Result<(), ApiError> {
        let key = SolvesKey::new(dojo_id, user);
        if !self.state.write().await.solves.entry(key.clone()).or_default().begin() {
            debug!(dojo = dojo_id, ?user, "solves already loaded or loading");
            return Ok(());
        }
        let result = api.list_solves(dojo_id, user).await;
        let outcome = {
            let mut state = self.state.write().await;
            let slot = state.solves.entry(key).or_default();
            // Keep solves recorded locally while the fetch was pending.
            let local = if result.is_ok() { slot.data.take() } else { None };
            let result = result.map(|mut fetched| {
                for solve in local.into_iter().flatten() {
                    let known = fetched.iter().any(|s| {
                        s.module_id == solve.module_id && s.challenge_id == solve.challenge_id
                    });
                    if !known {
                        fetched.push(solve);
                    }
                }
                fetched
            });
            slot.finish(result)
        };
        self.bump();
        outcome
    }

    /// Record a solve locally. Returns `false` if it was already recorded.
    pub async fn add_solve(
        &self,
        dojo_id: &str,
        module_id: &str,
        challenge_id: &str,
        user: Option<&str>,
    ) -> bool {
        let inserted = {
            let mut state = self.state.write().await;
            let slot = state
                .solves
                .entry(SolvesKey::new(dojo_id, user))
                .or_default();
            if slot.data.is_none() {
                slot.provisional = true;
            }
            let solves = slot.data.get_or_insert_with(Vec::new);
            if solves
                .iter()
                .any(|s| s.module_id == module_id && s.challenge_id == challenge_id)
            {
                false
            } else {
                solves.push(Solve {
                    module_id: module_id.to_string(),
                    challenge_id: challenge_id.to_string(),
                    timestamp: Utc::now(),
                    user_id: Some(user.unwrap_or("current-user").to_string()),
                });
                true
            }
        };
        if inserted {
            self.bump();
        }
        inserted
    }

    pub async fn dojos(&self) -> Vec<Dojo> {
        self.state.read().await.dojos.data.clone().unwrap_or_default()
    }

    pub async fn dojo(&self, dojo_id: &str) -> Option<Dojo> {
        self.state
            .read()
            .await
            .dojos
            .data
            .as_ref()?
            .iter()
            .find(|d| d.id == dojo_id)
            .cloned()
    }

    pub async fn modules(&self, dojo_id: &str) -> Vec<Module> {
        self.state
            .read()
            .await
            .modules
            .get(dojo_id)
            .and_then(|slot| slot.data.clone())
            .unwrap_or_default()
    }

    pub async fn solves(&self, dojo_id: &str, user: Option<&str>) -> Vec<Solve> {
        self.state
            .read()
            .await
            .solves
            .get(&SolvesKey::new(dojo_id, user))
            .and_then(|slot| slot.data.clone())
            .unwrap_or_default()
    }

    pub async fn dojos_state(&self) -> LoadState {
        self.state.read().await.dojos.state()
    }

    pub async fn modules_state(&self, dojo_id: &str) -> LoadState {
        self.state
            .read()
            .await
            .modules
            .get(dojo_id)
            .map(Slot::state)
            .unwrap_or(LoadState::Idle)
    }

    pub async fn solves_state(&self, dojo_id: &str, user: Option<&str>) -> LoadState {
        self.state
            .read()
            .await
            .solves
            .get(&SolvesKey::new(dojo_id, user))
            .map(Slot::state)
            .unwrap_or(LoadState::Idle)
    }

    pub async fn is_solved(&self, target: &ChallengeRef, user: Option<&str>) -> bool {
        self.state
            .read()
            .await
            .solves
            .get(&SolvesKey::new(&target.dojo_id, user))
            .and_then(|slot| slot.data.as_ref())
            .is_some_and(|solves| {
                solves.iter().any(|s| {
                    s.module_id == target.module_id && s.challenge_id == target.challenge_id
                })
            })
    }

    /// Solved challenge IDs in one module, for sidebar rendering.
    pub async fn solved_in_module(
        &self,
        dojo_id: &str,
        module_id: &str,
        user: Option<&str>,
    ) -> HashSet<String> {
        self.solves(dojo_id, user)
            .await
            .into_iter()
            .filter(|s| s.module_id == module_id)
            .map(|s| s.challenge_id)
            .collect()
    }

    /// Resolve display names, falling back to the raw IDs for anything not
    /// cached yet.
    pub async fn display_names(&self, target: &ChallengeRef) -> DisplayNames {
        let leaf = |module: &Module| {
            module
                .challenge(&target.challenge_id)
                .map(|c| c.name.clone())
        };
        self.names_for(&target.dojo_id, &target.module_id, leaf, &target.challenge_id)
            .await
    }

    /// Display names for a resource page plus the resource type, if known.
    pub async fn resource_names(
        &self,
        dojo_id: &str,
        module_id: &str,
        resource_id: &str,
    ) -> (DisplayNames, Option<String>) {
        let resource_type = self
            .modules(dojo_id)
            .await
            .iter()
            .find(|m| m.id == module_id)
            .and_then(|m| m.resource(resource_id))
            .map(|r| r.resource_type.clone());
        let leaf = |module: &Module| module.resource(resource_id).map(|r| r.name.clone());
        let names = self.names_for(dojo_id, module_id, leaf, resource_id).await;
        (names, resource_type)
    }

    async fn names_for(
        &self,
        dojo_id: &str,
        module_id: &str,
        leaf: impl Fn(&Module) -> Option<String>,
        leaf_id: &str,
    ) -> DisplayNames {
        let state = self.state.read().await;
        let dojo = state
            .dojos
            .data
            .as_ref()
            .and_then(|dojos| dojos.iter().find(|d| d.id == dojo_id))
            .map(|d| d.name.clone());
        let module = state
            .modules
            .get(dojo_id)
            .and_then(|slot| slot.data.as_ref())
            .and_then(|modules| modules.iter().find(|m| m.id == module_id));

        DisplayNames {
            dojo: dojo.unwrap_or_else(|| dojo_id.to_string()),
            module: module
                .map(|m| m.name.clone())
                .unwrap_or_else(|| module_id.to_string()),
            challenge: module
                .and_then(leaf)
                .unwrap_or_else(|| leaf_id.to_string()),
        }
    }

    pub async fn stats(&self, dojo_id: &str) -> DojoStats {
        self.stats_at(dojo_id, Utc::now()).await
    }

    /// Stats over the dojo-wide solve list as of `now`.
    pub async fn stats_at(&self, dojo_id: &str, now: DateTime<Utc>) -> DojoStats {
        let state = self.state.read().await;
        let total_challenges = state
            .modules
            .get(dojo_id)
            .and_then(|slot| slot.data.as_ref())
            .map(|modules| modules.iter().map(|m| m.challenges.len()).sum())
            .unwrap_or(0);
        let empty = Vec::new();
        let solves = state
            .solves
            .get(&SolvesKey::new(dojo_id, None))
            .and_then(|slot| slot.data.as_ref())
            .unwrap_or(&empty);

        let since = now - ChronoDuration::hours(24);
        let unique_hackers: HashSet<_> = solves.iter().map(|s| s.user_id.as_deref()).collect();
        let hacking_now: HashSet<_> = solves
            .iter()
            .filter(|s| s.timestamp >= since)
            .map(|s| s.user_id.as_deref())
            .collect();

        DojoStats {
            total_challenges,
            total_solves: solves.len(),
            unique_hackers: unique_hackers.len(),
            hacking_now: hacking_now.len(),
        }
    }
}
