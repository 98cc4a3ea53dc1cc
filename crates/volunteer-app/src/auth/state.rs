use volunteer_common::Role;

use super::storage::{PersistedStore, StorageKey};

/// The in-memory session. Only [`AuthService`](super::AuthService) writes it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    pub logged_in: bool,
    pub role: Option<Role>,
    pub email: String,
    pub profile_completed: bool,
}

impl SessionState {
    /// Rebuild state from durable storage. With no storage everything is
    /// at its default, i.e. logged out.
    ///
    /// A stored login flag without a stored email is treated as logged out:
    /// there is no identity to fetch a profile for.
    pub fn seed(store: &PersistedStore) -> Self {
        if !store.is_available() {
            return Self::default();
        }

        let email = store.read_string(StorageKey::Email).unwrap_or_default();
        let mut logged_in = store.read_flag(StorageKey::LoggedIn);
        if logged_in && email.is_empty() {
            tracing::warn!("stored session has no email, starting logged out");
            logged_in = false;
        }

        Self {
            logged_in,
            role: store
                .read_string(StorageKey::Role)
                .and_then(|r| Role::parse(&r)),
            email,
            profile_completed: store.read_flag(StorageKey::ProfileCompleted),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.logged_in
    }

    pub fn set_authenticated(&mut self, role: Role, email: String) {
        self.logged_in = true;
        self.role = Some(role);
        self.email = email;
    }

    pub fn clear(&mut self) {
        self.logged_in = false;
        self.role = None;
        self.email.clear();
        self.profile_completed = false;
    }
}
