//! Volunteer console session core.
//!
//! [`AuthService`] is the context object handed to the UI tree: it owns the
//! logged-in flag, role, identity, onboarding flag and the cached profile,
//! and mirrors all but the profile to durable storage so a reload picks the
//! session back up. [`RouteGuard`] gates protected pages on it.

use std::sync::LazyLock;

pub mod auth;
pub mod guard;
pub mod observable;
pub mod route;

pub use auth::{AuthError, AuthService, PersistedStore, RestoreResult, SessionState};
pub use guard::{GuardDecision, Navigator, RouteGuard};
pub use observable::{Observable, Subscription};
pub use route::Route;
pub use volunteer_common::{ApiConfig, HttpApi, Profile, Role};

pub static CONFIG: LazyLock<ApiConfig> = LazyLock::new(ApiConfig::from_env);

impl AuthService<HttpApi> {
    /// The service as the running app uses it: the HTTP API from
    /// [`CONFIG`] and the platform's durable storage.
    pub fn platform() -> Self {
        AuthService::new(HttpApi::new(CONFIG.clone()), PersistedStore::platform())
    }
}
