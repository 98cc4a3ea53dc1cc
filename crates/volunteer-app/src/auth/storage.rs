//! Durable key/value persistence for the session.
//!
//! In the browser this is `localStorage`; native builds (tests, server-side
//! rendering) either get an in-memory store or no store at all. Values are
//! stored raw, so a flag is the literal string `"true"` and a role is its
//! free-text name.
//!
//! Reads never fail from the caller's point of view: a missing key, a
//! missing store and an access error all read as "not set". Writes report a
//! typed [`StorageError`] and leave the decision to log or surface it to the
//! caller.

use miette::Diagnostic;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    LoggedIn,
    Role,
    Email,
    ProfileCompleted,
    RememberMe,
    Username,
}

impl StorageKey {
    /// Keys owned by the session and wiped on logout.
    pub const SESSION: [StorageKey; 4] = [
        StorageKey::LoggedIn,
        StorageKey::Role,
        StorageKey::Email,
        StorageKey::ProfileCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedIn => "isLoggedIn",
            Self::Role => "userRole",
            Self::Email => "userEmail",
            Self::ProfileCompleted => "profileCompleted",
            Self::RememberMe => "rememberMe",
            Self::Username => "username",
        }
    }
}

#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No durable storage in this context (server render, storage disabled)
    #[error("durable storage is unavailable")]
    #[diagnostic(code(volunteer::storage::unavailable))]
    Unavailable,

    /// The store exists but refused the operation (quota, security policy)
    #[error("storage access failed for {key}: {message}")]
    #[diagnostic(code(volunteer::storage::access))]
    Access { key: &'static str, message: String },
}

/// A raw string key/value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;
}

/// Process-local store. Clones share the same map, so a clone outlives a
/// dropped service the way `localStorage` outlives a page.
#[derive(Clone, Default, Debug)]
pub struct MemoryStore(Arc<Mutex<HashMap<String, String>>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.map().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.map().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.map().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.map().remove(key);
        Ok(())
    }
}

/// `window.localStorage`, looked up on every access since it can vanish
/// (private browsing, storage cleared by the user).
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
#[derive(Clone, Copy, Default, Debug)]
pub struct LocalStore;

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
impl LocalStore {
    fn storage() -> Result<web_sys::Storage, String> {
        let window = web_sys::window().ok_or_else(|| "no window".to_owned())?;
        window
            .local_storage()
            .map_err(|e| format!("{e:?}"))?
            .ok_or_else(|| "localStorage disabled".to_owned())
    }

    pub fn is_available() -> bool {
        Self::storage().is_ok()
    }
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        Self::storage()?.get_item(key).map_err(|e| format!("{e:?}"))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| format!("{e:?}"))
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| format!("{e:?}"))
    }
}

/// The session's view of durable storage.
///
/// Holds no backend when storage isn't available; every read then returns
/// the default and every write returns [`StorageError::Unavailable`]
/// without touching anything.
#[derive(Clone)]
pub struct PersistedStore {
    backend: Option<Arc<dyn KeyValueStore>>,
}

impl std::fmt::Debug for PersistedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedStore")
            .field("available", &self.is_available())
            .finish()
    }
}

impl PersistedStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Some(Arc::new(backend)),
        }
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// The platform default: `localStorage` in the browser when it can be
    /// reached, nothing elsewhere.
    #[cfg(all(target_family = "wasm", target_os = "unknown"))]
    pub fn platform() -> Self {
        if LocalStore::is_available() {
            Self::new(LocalStore)
        } else {
            tracing::warn!("localStorage unavailable, session will not survive a reload");
            Self::unavailable()
        }
    }

    #[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
    pub fn platform() -> Self {
        Self::unavailable()
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn read_string(&self, key: StorageKey) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get(key.as_str()) {
            Ok(value) => value,
            Err(message) => {
                tracing::warn!(key = key.as_str(), "storage read failed: {message}");
                None
            }
        }
    }

    /// A flag is set only when the stored value is exactly `"true"`.
    pub fn read_flag(&self, key: StorageKey) -> bool {
        self.read_string(key).as_deref() == Some("true")
    }

    pub fn write_string(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        let backend = self.backend.as_ref().ok_or(StorageError::Unavailable)?;
        backend
            .set(key.as_str(), value)
            .map_err(|message| StorageError::Access {
                key: key.as_str(),
                message,
            })
    }

    pub fn write_flag(&self, key: StorageKey, value: bool) -> Result<(), StorageError> {
        self.write_string(key, if value { "true" } else { "false" })
    }

    /// Remove every listed key. All removals are attempted; the first
    /// failure is reported.
    pub fn clear(&self, keys: &[StorageKey]) -> Result<(), StorageError> {
        let backend = self.backend.as_ref().ok_or(StorageError::Unavailable)?;
        let mut first_err = None;
        for key in keys {
            if let Err(message) = backend.remove(key.as_str()) {
                first_err.get_or_insert(StorageError::Access {
                    key: key.as_str(),
                    message,
                });
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A store that refuses every operation, like a browser with storage
    /// blocked by policy.
    pub(crate) struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, String> {
            Err("SecurityError".into())
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), String> {
            Err("QuotaExceededError".into())
        }

        fn remove(&self, _key: &str) -> Result<(), String> {
            Err("SecurityError".into())
        }
    }

    #[test]
    fn key_names_match_stored_layout() {
        let names: Vec<_> = StorageKey::SESSION.iter().map(StorageKey::as_str).collect();
        assert_eq!(
            names,
            ["isLoggedIn", "userRole", "userEmail", "profileCompleted"]
        );
    }

    #[test]
    fn flags_round_trip_through_raw_strings() {
        let mem = MemoryStore::new();
        let store = PersistedStore::new(mem.clone());

        assert!(!store.read_flag(StorageKey::LoggedIn));
        store.write_flag(StorageKey::LoggedIn, true).unwrap();
        assert_eq!(mem.raw("isLoggedIn").as_deref(), Some("true"));
        assert!(store.read_flag(StorageKey::LoggedIn));

        store.write_flag(StorageKey::LoggedIn, false).unwrap();
        assert!(!store.read_flag(StorageKey::LoggedIn));
    }

    #[test]
    fn anything_but_true_reads_as_unset() {
        let mem = MemoryStore::new();
        mem.set("profileCompleted", "TRUE").unwrap();
        let store = PersistedStore::new(mem);
        assert!(!store.read_flag(StorageKey::ProfileCompleted));
    }

    #[test]
    fn clear_removes_listed_keys_only() {
        let mem = MemoryStore::new();
        let store = PersistedStore::new(mem.clone());
        store.write_string(StorageKey::Email, "a@x.com").unwrap();
        store.write_string(StorageKey::Username, "a@x.com").unwrap();

        store.clear(&StorageKey::SESSION).unwrap();
        assert_eq!(mem.raw("userEmail"), None);
        assert_eq!(mem.raw("username").as_deref(), Some("a@x.com"));
    }

    #[test]
    fn unavailable_store_reads_defaults_and_refuses_writes() {
        let store = PersistedStore::unavailable();
        assert!(!store.is_available());
        assert!(!store.read_flag(StorageKey::LoggedIn));
        assert_eq!(store.read_string(StorageKey::Role), None);
        assert_eq!(
            store.write_flag(StorageKey::LoggedIn, true),
            Err(StorageError::Unavailable)
        );
        assert_eq!(
            store.clear(&StorageKey::SESSION),
            Err(StorageError::Unavailable)
        );
    }

    #[test]
    fn failing_store_is_typed_not_thrown() {
        let store = PersistedStore::new(FailingStore);
        assert!(store.is_available());
        assert_eq!(store.read_string(StorageKey::Email), None);
        assert!(!store.read_flag(StorageKey::LoggedIn));

        let err = store.write_string(StorageKey::Email, "a@x.com").unwrap_err();
        assert_eq!(
            err,
            StorageError::Access {
                key: "userEmail",
                message: "QuotaExceededError".into()
            }
        );

        let err = store.clear(&StorageKey::SESSION).unwrap_err();
        assert!(matches!(err, StorageError::Access { key: "isLoggedIn", .. }));
    }
}
