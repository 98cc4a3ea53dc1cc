mod storage;
pub use storage::{KeyValueStore, MemoryStore, PersistedStore, StorageError, StorageKey};
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use storage::LocalStore;

mod state;
pub use state::SessionState;

mod service;
pub use service::AuthService;

use miette::Diagnostic;
use volunteer_common::ApiError;

/// Result of attempting to restore a session after a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreResult {
    /// Session was restored and its profile is cached
    Restored,
    /// No saved session was found
    NoSession,
    /// Session was restored but the profile could not be fetched
    ProfileUnavailable,
}

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum AuthError {
    /// A session always has an identity to fetch the profile with
    #[error("cannot log in without an email")]
    #[diagnostic(code(volunteer::auth::missing_identity))]
    MissingIdentity,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(#[from] ApiError),
}
