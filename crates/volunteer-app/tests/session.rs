//! End-to-end session scenarios: login, reload, logout and the guard,
//! driven through the public API with a scripted profile backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use volunteer_app::auth::MemoryStore;
use volunteer_app::{
    AuthService, GuardDecision, Navigator, PersistedStore, Profile, Role, Route,
};
use volunteer_common::{ApiError, ProfileApi};

/// Profile backend whose answers are held until the test releases them.
/// Lookups and submissions wait on separate gates; submissions pass
/// straight through unless built with [`GatedApi::holding_submissions`].
struct GatedApi {
    profiles: HashMap<String, Profile>,
    gate: Arc<Semaphore>,
    submit_gate: Arc<Semaphore>,
    served: AtomicUsize,
}

impl GatedApi {
    fn new(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.email.clone(), p))
                .collect(),
            gate: Arc::new(Semaphore::new(0)),
            submit_gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS / 2)),
            served: AtomicUsize::new(0),
        }
    }

    fn holding_submissions(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            submit_gate: Arc::new(Semaphore::new(0)),
            ..Self::new(profiles)
        }
    }

    /// Answers immediately.
    fn open(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let api = Self::new(profiles);
        api.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        api
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

impl ProfileApi for GatedApi {
    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, ApiError> {
        let permit = self.gate.acquire().await.expect("gate never closes");
        permit.forget();
        self.served.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.get(email).cloned())
    }

    async fn complete_profile(&self, profile: &Profile) -> Result<Profile, ApiError> {
        let permit = self.submit_gate.acquire().await.expect("gate never closes");
        permit.forget();
        Ok(profile.clone())
    }
}

async fn until_served(auth: &AuthService<GatedApi>, n: usize) {
    while auth.api().served() < n {
        tokio::task::yield_now().await;
    }
    // let the fetch tasks finish writing to the cache
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn volunteer(email: &str, name: &str) -> Profile {
    Profile::new(email).with_full_name(name)
}

#[tokio::test]
async fn login_state_is_readable_immediately() {
    let auth = AuthService::new(GatedApi::new([]), PersistedStore::new(MemoryStore::new()));
    auth.login(Role::Other("coordinator".into()), "c@x.com").unwrap();

    let state = auth.state();
    assert!(state.logged_in);
    assert_eq!(state.role, Some(Role::Other("coordinator".into())));
    assert_eq!(state.email, "c@x.com");
    // the fetch is parked on the gate
    assert_eq!(auth.current_profile(), None);
}

#[tokio::test]
async fn session_survives_restart() {
    let mem = MemoryStore::new();
    {
        let auth = AuthService::new(GatedApi::new([]), PersistedStore::new(mem.clone()));
        auth.login(Role::Admin, "a@x.com").unwrap();
    }

    let auth = AuthService::new(GatedApi::new([]), PersistedStore::new(mem));
    assert!(auth.is_logged_in());
    assert_eq!(auth.role(), Some(Role::Admin));
    assert_eq!(auth.email(), "a@x.com");
    assert!(auth.subscribe_logged_in().current());
    assert_eq!(auth.current_profile(), None);
}

#[tokio::test]
async fn logout_survives_restart_too() {
    let mem = MemoryStore::new();
    let auth = AuthService::new(GatedApi::new([]), PersistedStore::new(mem.clone()));
    auth.login(Role::Admin, "a@x.com").unwrap();
    auth.logout();
    auth.logout();

    let auth = AuthService::new(GatedApi::new([]), PersistedStore::new(mem));
    assert!(!auth.is_logged_in());
    assert_eq!(auth.role(), None);
    assert_eq!(auth.email(), "");
}

#[tokio::test]
async fn no_storage_never_panics() {
    let auth = AuthService::new(GatedApi::new([]), PersistedStore::unavailable());
    auth.login(Role::Volunteer, "v@x.com").unwrap();
    auth.set_profile_completed(true);
    assert!(auth.is_logged_in());
    assert!(auth.is_profile_completed());

    auth.logout();
    assert!(!auth.is_logged_in());
    assert!(!auth.is_profile_completed());
}

#[tokio::test]
async fn fetched_profile_then_local_update() {
    let auth = AuthService::new(
        GatedApi::open([volunteer("v@x.com", "V")]),
        PersistedStore::new(MemoryStore::new()),
    );
    let mut profile = auth.subscribe_profile();
    assert_eq!(profile.next().await, Some(None));

    auth.login(Role::Volunteer, "v@x.com").unwrap();
    let fetched = profile.wait_for(Option::is_some).await.unwrap().unwrap();
    assert_eq!(fetched.full_name, "V");

    auth.update_user_profile(volunteer("v@x.com", "V2"));
    assert_eq!(auth.current_profile().unwrap().full_name, "V2");
    assert_eq!(profile.next().await.unwrap().unwrap().full_name, "V2");
}

#[tokio::test]
async fn logout_during_fetch_keeps_cache_empty() {
    let auth = AuthService::new(
        GatedApi::new([volunteer("v@x.com", "V")]),
        PersistedStore::new(MemoryStore::new()),
    );
    auth.login(Role::Volunteer, "v@x.com").unwrap();
    auth.logout();

    auth.api().release(1);
    until_served(&auth, 1).await;
    assert_eq!(auth.current_profile(), None);
}

#[tokio::test]
async fn racing_logins_keep_the_latest_identity() {
    let auth = AuthService::new(
        GatedApi::new([volunteer("a@x.com", "A"), volunteer("b@x.com", "B")]),
        PersistedStore::new(MemoryStore::new()),
    );
    auth.login(Role::Volunteer, "a@x.com").unwrap();
    auth.login(Role::Volunteer, "b@x.com").unwrap();
    assert_eq!(auth.email(), "b@x.com");

    auth.api().release(2);
    until_served(&auth, 2).await;
    assert_eq!(auth.current_profile().unwrap().email, "b@x.com");
}

#[tokio::test]
async fn logout_during_submission_keeps_cache_and_flag_clear() {
    let mem = MemoryStore::new();
    let auth = AuthService::new(
        GatedApi::holding_submissions([]),
        PersistedStore::new(mem.clone()),
    );
    auth.login(Role::Volunteer, "v@x.com").unwrap();

    let submitting = tokio::spawn({
        let auth = auth.clone();
        async move { auth.complete_profile(volunteer("v@x.com", "V")).await }
    });
    // let the submission park on its gate
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    auth.logout();

    auth.api().submit_gate.add_permits(1);
    let stored = submitting.await.unwrap().unwrap();
    assert_eq!(stored.full_name, "V");
    assert!(!auth.is_logged_in());
    assert_eq!(auth.current_profile(), None);
    assert_eq!(mem.raw("profileCompleted"), None);

    // the next user starts without the previous user's onboarding state
    auth.login(Role::Volunteer, "w@x.com").unwrap();
    assert!(!auth.is_profile_completed());
    assert_eq!(auth.current_profile(), None);
}

#[derive(Default)]
struct History(Vec<Route>);

impl Navigator for History {
    fn navigate(&mut self, to: Route) {
        self.0.push(to);
    }
}

#[tokio::test]
async fn guard_follows_the_session() {
    let auth = AuthService::new(GatedApi::new([]), PersistedStore::new(MemoryStore::new()));
    let guard = auth.guard();
    let mut history = History::default();

    assert_eq!(
        guard.check(&Route::Admin),
        GuardDecision::Redirect(Route::Login)
    );
    assert!(!guard.activate(&Route::VolunteerMatching, &mut history));
    assert_eq!(history.0, vec![Route::Login]);

    auth.login(Role::Admin, "a@x.com").unwrap();
    assert!(guard.activate(&Route::VolunteerMatching, &mut history));
    assert_eq!(history.0.len(), 1);

    auth.logout();
    assert!(!guard.can_activate(&Route::from_path("/admin")));
}
