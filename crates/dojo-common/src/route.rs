//! Client routes.
//!
//! The workspace controller derives "which challenge is being viewed" from
//! the current route, so routes are parsed into a typed form rather than
//! compared as strings.

use std::fmt;
use std::str::FromStr;

use crate::errors::DojoError;
use crate::id::ChallengeRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Dojo {
        dojo_id: String,
    },
    Module {
        dojo_id: String,
        module_id: String,
    },
    Challenge(ChallengeRef),
    Resource {
        dojo_id: String,
        module_id: String,
        resource_id: String,
    },
    Leaderboard,
    Community,
    Login,
    Register,
    ForgotPassword,
    NotFound(String),
}

impl Route {
    /// Parse a browser-style path. Query strings and fragments are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["leaderboard"] => Route::Leaderboard,
            ["community"] => Route::Community,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["forgot-password"] => Route::ForgotPassword,
            ["dojo", dojo] => Route::Dojo {
                dojo_id: dojo.to_string(),
            },
            ["dojo", dojo, "module", module] => Route::Module {
                dojo_id: dojo.to_string(),
                module_id: module.to_string(),
            },
            ["dojo", dojo, "module", module, "challenge", challenge] => {
                Route::Challenge(ChallengeRef::new(*dojo, *module, *challenge))
            }
            ["dojo", dojo, "module", module, "resource", resource] => Route::Resource {
                dojo_id: dojo.to_string(),
                module_id: module.to_string(),
                resource_id: resource.to_string(),
            },
            _ => Route::NotFound(path.to_string()),
        }
    }

    /// The challenge identity implied by this route, if any.
    pub fn challenge(&self) -> Option<&ChallengeRef> {
        match self {
            Route::Challenge(c) => Some(c),
            _ => None,
        }
    }

    /// The dojo this route belongs to, if any.
    pub fn dojo_id(&self) -> Option<&str> {
        match self {
            Route::Dojo { dojo_id }
            | Route::Module { dojo_id, .. }
            | Route::Resource { dojo_id, .. } => Some(dojo_id),
            Route::Challenge(c) => Some(&c.dojo_id),
            _ => None,
        }
    }

    /// The module this route belongs to, if any.
    pub fn module_id(&self) -> Option<&str> {
        match self {
            Route::Module { module_id, .. } | Route::Resource { module_id, .. } => Some(module_id),
            Route::Challenge(c) => Some(&c.module_id),
            _ => None,
        }
    }

    pub fn is_workspace(&self) -> bool {
        matches!(self, Route::Challenge(_) | Route::Resource { .. })
    }

    pub fn for_challenge(challenge: &ChallengeRef) -> Self {
        Route::Challenge(challenge.clone())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::Dojo { dojo_id } => write!(f, "/dojo/{dojo_id}"),
            Route::Module { dojo_id, module_id } => {
                write!(f, "/dojo/{dojo_id}/module/{module_id}")
            }
            Route::Challenge(c) => write!(
                f,
                "/dojo/{}/module/{}/challenge/{}",
                c.dojo_id, c.module_id, c.challenge_id
            ),
            Route::Resource {
                dojo_id,
                module_id,
                resource_id,
            } => write!(f, "/dojo/{dojo_id}/module/{module_id}/resource/{resource_id}"),
            Route::Leaderboard => write!(f, "/leaderboard"),
            Route::Community => write!(f, "/community"),
            Route::Login => write!(f, "/login"),
            Route::Register => write!(f, "/register"),
            Route::ForgotPassword => write!(f, "/forgot-password"),
            Route::NotFound(path) => write!(f, "{path}"),
        }
    }
}

impl FromStr for Route {
    type Err = DojoError;

    /// Strict parse: unknown paths are an error instead of `NotFound`.
    /// Also accepts the `dojo/module/challenge` short form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('/') {
            if let Some(challenge) = ChallengeRef::parse(s) {
                return Ok(Route::Challenge(challenge));
            }
        }
        match Route::parse(s) {
            Route::NotFound(path) => Err(DojoError::Route(path)),
            route => Ok(route),
        }
    }
}
