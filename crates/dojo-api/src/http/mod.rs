//! reqwest implementation of [`DojoApi`](crate::DojoApi).
//!
//! Requests go to `base_url` + endpoint path, carrying an
//! `Authorization: Bearer` header when a token is set.

mod api;
mod auth;
mod client;
mod config;

#[cfg(test)]
mod tests;

pub use auth::{AuthSession, RegisterRequest};
pub use client::HttpDojoApi;
pub use config::HttpApiConfig;
