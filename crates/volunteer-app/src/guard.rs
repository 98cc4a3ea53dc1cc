//! Navigation gate for pages that need a session.

use std::sync::Arc;

use crate::observable::Subscription;
use crate::route::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigation denied; go here instead
    Redirect(Route),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }
}

/// Whatever performs navigation (the router).
pub trait Navigator {
    fn navigate(&mut self, to: Route);
}

/// Allows protected routes only while a session is live.
///
/// Each check takes a fresh subscription, reads its current value once and
/// drops it. Nothing is cached between checks. A closed stream (torn down
/// service) counts as logged out.
#[derive(Clone)]
pub struct RouteGuard {
    sample: Arc<dyn Fn() -> Subscription<bool> + Send + Sync>,
    login: Route,
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl RouteGuard {
    pub fn new(sample: impl Fn() -> Subscription<bool> + Send + Sync + 'static) -> Self {
        Self {
            sample: Arc::new(sample),
            login: Route::Login,
        }
    }

    fn logged_in(&self) -> bool {
        let subscription = (self.sample)();
        !subscription.is_closed() && subscription.current()
    }

    pub fn check(&self, target: &Route) -> GuardDecision {
        if !target.is_protected() {
            return GuardDecision::Allow;
        }
        if self.logged_in() {
            GuardDecision::Allow
        } else {
            tracing::debug!(%target, "not logged in, redirecting to {}", self.login);
            GuardDecision::Redirect(self.login.clone())
        }
    }

    pub fn can_activate(&self, target: &Route) -> bool {
        self.check(target).is_allowed()
    }

    /// Check `target`, sending `navigator` to the login page on denial.
    /// Returns whether the original navigation may proceed.
    pub fn activate(&self, target: &Route, navigator: &mut impl Navigator) -> bool {
        match self.check(target) {
            GuardDecision::Allow => true,
            GuardDecision::Redirect(to) => {
                navigator.navigate(to);
                false
            }
        }
    }
}
