//! The session's single owner.
//!
//! [`AuthService`] holds the in-memory session, mirrors it to durable
//! storage and keeps the profile cache. Everything else reads through it.
//! It is a cheap handle: clones share one session, and the spawned profile
//! fetch after a login holds one too.
//!
//! Every login and logout starts a new session generation. A profile fetch
//! only lands in the cache if the generation it was started under is still
//! current, so a slow fetch from an earlier login can't leak its profile
//! into a later session or repopulate the cache after a logout. The same
//! fence covers profile submission.
//!
//! Session transitions hold the session lock across their storage writes
//! and stream pushes, so clones driven from several threads can't leave
//! storage, memory and the streams disagreeing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use volunteer_common::{ApiError, LoginApi, Profile, ProfileApi, Role};

use super::storage::{PersistedStore, StorageError, StorageKey};
use super::{AuthError, RestoreResult, SessionState};
use crate::guard::RouteGuard;
use crate::observable::{Observable, Subscription};
use crate::route::Route;

struct Session {
    state: SessionState,
    generation: u64,
}

struct AuthInner<A> {
    api: A,
    store: PersistedStore,
    session: Mutex<Session>,
    logged_in: Observable<bool>,
    profile: Observable<Option<Profile>>,
}

pub struct AuthService<A> {
    inner: Arc<AuthInner<A>>,
}

impl<A> Clone for AuthService<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> std::fmt::Debug for AuthService<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("session", &self.session().state)
            .field("store", &self.inner.store)
            .finish()
    }
}

/// Log an absorbed storage failure. The in-memory session stays
/// authoritative either way.
fn absorb(op: &'static str, result: Result<(), StorageError>) {
    match result {
        Ok(()) => tracing::debug!(op, "session persisted"),
        Err(StorageError::Unavailable) => {
            tracing::debug!(op, "durable storage unavailable, not persisted")
        }
        Err(e) => tracing::warn!(op, "failed to persist session: {e}"),
    }
}

impl<A> AuthService<A> {
    /// Build the service, seeding the session from `store` before anyone can
    /// observe it.
    pub fn new(api: A, store: PersistedStore) -> Self {
        let state = SessionState::seed(&store);
        tracing::debug!(
            logged_in = state.logged_in,
            available = store.is_available(),
            "session seeded"
        );
        Self {
            inner: Arc::new(AuthInner {
                api,
                logged_in: Observable::new(state.logged_in),
                profile: Observable::new(None),
                session: Mutex::new(Session {
                    state,
                    generation: 0,
                }),
                store,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// Snapshot of the whole session.
    pub fn state(&self) -> SessionState {
        self.session().state.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().state.logged_in
    }

    pub fn role(&self) -> Option<Role> {
        self.session().state.role.clone()
    }

    pub fn email(&self) -> String {
        self.session().state.email.clone()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.inner.profile.get()
    }

    pub fn subscribe_logged_in(&self) -> Subscription<bool> {
        self.inner.logged_in.subscribe()
    }

    pub fn subscribe_profile(&self) -> Subscription<Option<Profile>> {
        self.inner.profile.subscribe()
    }

    /// End the session and wipe its persisted keys. Calling this twice is
    /// the same as calling it once.
    pub fn logout(&self) {
        let mut session = self.session();
        session.state.clear();
        session.generation += 1;
        self.inner.logged_in.set(false);

        if self.inner.store.is_available() {
            absorb("logout", self.inner.store.clear(&StorageKey::SESSION));
        }

        self.inner.profile.set(None);
        drop(session);
        tracing::info!("logged out");
    }

    /// Read the onboarding flag. Durable storage is re-read on every call
    /// when present, so an outside change to it shows up here.
    pub fn is_profile_completed(&self) -> bool {
        if self.inner.store.is_available() {
            self.inner.store.read_flag(StorageKey::ProfileCompleted)
        } else {
            self.session().state.profile_completed
        }
    }

    pub fn set_profile_completed(&self, completed: bool) {
        let mut session = self.session();
        self.mark_completed(&mut session, completed);
    }

    /// Callers hold the session lock.
    fn mark_completed(&self, session: &mut Session, completed: bool) {
        session.state.profile_completed = completed;
        if self.inner.store.is_available() {
            absorb(
                "set_profile_completed",
                self.inner
                    .store
                    .write_flag(StorageKey::ProfileCompleted, completed),
            );
        }
    }

    /// Replace the cached profile without a round trip, for callers that
    /// already hold a fresher record.
    pub fn update_user_profile(&self, profile: Profile) {
        self.inner.profile.set(Some(profile));
    }

    /// Re-seed the session from durable storage, as a page reload would.
    /// The profile cache is not persisted, so it starts empty again.
    pub fn reload(&self) {
        let mut session = self.session();
        let state = SessionState::seed(&self.inner.store);
        session.generation += 1;
        self.inner.logged_in.set(state.logged_in);
        session.state = state;
        self.inner.profile.set(None);
    }

    /// Remember `username` for the login form. Survives logout.
    pub fn remember_me(&self, username: &str) {
        let store = &self.inner.store;
        if store.is_available() {
            absorb("remember_me", store.write_string(StorageKey::Username, username));
            absorb("remember_me", store.write_flag(StorageKey::RememberMe, true));
        }
    }

    pub fn forget_me(&self) {
        let store = &self.inner.store;
        if store.is_available() {
            absorb("forget_me", store.clear(&[StorageKey::Username]));
            absorb("forget_me", store.write_flag(StorageKey::RememberMe, false));
        }
    }

    pub fn remembered_username(&self) -> Option<String> {
        let store = &self.inner.store;
        if store.read_flag(StorageKey::RememberMe) {
            store.read_string(StorageKey::Username)
        } else {
            None
        }
    }

    /// Close both streams and fence off in-flight fetches. Subscribers see
    /// their stream end; other clones keep answering the sync getters.
    pub fn teardown(self) {
        self.session().generation += 1;
        self.inner.logged_in.close();
        self.inner.profile.close();
        tracing::debug!("auth service torn down");
    }
}

impl<A> AuthService<A>
where
    A: ProfileApi + Send + Sync + 'static,
{
    /// A guard sampling this session's logged-in stream on every check.
    pub fn guard(&self) -> RouteGuard {
        let auth = self.clone();
        RouteGuard::new(move || auth.subscribe_logged_in())
    }

    /// Start a session for `email`. Surrounding whitespace is dropped
    /// before the identity is stored.
    ///
    /// The in-memory session and the logged-in stream are updated before
    /// this returns. The profile fetch runs in the background, so
    /// [`current_profile`](Self::current_profile) is usually still `None`
    /// right after; wait on [`subscribe_profile`](Self::subscribe_profile)
    /// instead.
    pub fn login(&self, role: Role, email: impl Into<String>) -> Result<(), AuthError> {
        let email = email.into();
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        let email = email.to_owned();

        let generation = {
            let mut session = self.session();
            session.state.set_authenticated(role.clone(), email.clone());
            session.generation += 1;
            self.inner.logged_in.set(true);

            let store = &self.inner.store;
            if store.is_available() {
                absorb("login", store.write_flag(StorageKey::LoggedIn, true));
                absorb("login", store.write_string(StorageKey::Role, role.as_str()));
                absorb("login", store.write_string(StorageKey::Email, &email));
            }
            session.generation
        };
        tracing::info!(%role, %email, "logged in");

        self.spawn_profile_fetch(email, generation);
        Ok(())
    }

    fn spawn_profile_fetch(&self, email: String, generation: u64) {
        #[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
        {
            if tokio::runtime::Handle::try_current().is_err() {
                tracing::warn!(%email, "no async runtime, skipping profile fetch");
                return;
            }
        }

        let this = self.clone();
        n0_future::task::spawn(async move {
            // failures are already logged and the cache is left alone
            let _ = this.fetch_profile_at(&email, generation).await;
        });
    }

    /// Fetch the profile for `email` once, caching it when the server has
    /// one. On failure the cache keeps whatever it held.
    pub async fn fetch_profile(&self, email: &str) -> Result<Option<Profile>, ApiError> {
        let generation = self.session().generation;
        self.fetch_profile_at(email, generation).await
    }

    async fn fetch_profile_at(
        &self,
        email: &str,
        generation: u64,
    ) -> Result<Option<Profile>, ApiError> {
        match self.inner.api.get_profile(email).await {
            Ok(Some(profile)) if !profile.is_empty() => {
                let session = self.session();
                if session.generation == generation {
                    self.inner.profile.set(Some(profile.clone()));
                    tracing::debug!(email, "profile cached");
                } else {
                    tracing::debug!(email, "discarding profile fetched for an ended session");
                }
                drop(session);
                Ok(Some(profile))
            }
            Ok(_) => {
                tracing::debug!(email, "no profile on record");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(email, "profile fetch failed: {e}");
                Err(e)
            }
        }
    }

    /// Refill the profile cache for a session seeded from storage.
    pub async fn restore(&self) -> RestoreResult {
        let (logged_in, email, generation) = {
            let session = self.session();
            (
                session.state.logged_in,
                session.state.email.clone(),
                session.generation,
            )
        };
        if !logged_in {
            return RestoreResult::NoSession;
        }
        if self.current_profile().is_some() {
            return RestoreResult::Restored;
        }
        match self.fetch_profile_at(&email, generation).await {
            Ok(Some(_)) if self.current_profile().is_some() => {
                tracing::debug!("session restored");
                RestoreResult::Restored
            }
            _ => RestoreResult::ProfileUnavailable,
        }
    }

    /// Submit onboarding data and cache the stored record.
    ///
    /// If the session ends or changes while the submission is in flight,
    /// the stored record is still returned but neither the cache nor the
    /// onboarding flag is touched.
    pub async fn complete_profile(&self, profile: Profile) -> Result<Profile, AuthError> {
        let generation = self.session().generation;
        let returned = self.inner.api.complete_profile(&profile).await?;
        // some deployments only echo a status message back
        let stored = if returned.email.is_empty() {
            profile
        } else {
            returned
        };

        let mut session = self.session();
        if session.generation == generation {
            self.inner.profile.set(Some(stored.clone()));
            self.mark_completed(&mut session, true);
        } else {
            tracing::debug!(
                email = %stored.email,
                "discarding profile submitted for an ended session"
            );
        }
        Ok(stored)
    }
}

impl<A> AuthService<A>
where
    A: ProfileApi + LoginApi + Send + Sync + 'static,
{
    /// Check credentials with the API and start a session from its answer.
    /// Returns the page to land on. On failure the session is untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Route, AuthError> {
        let response = self.inner.api.login(email, password).await?;
        self.login(response.role.clone(), response.email)?;
        self.set_profile_completed(response.profile_completed);
        Ok(Route::landing_for(
            Some(&response.role),
            response.profile_completed,
        ))
    }
}
