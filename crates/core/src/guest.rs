//! Guest checkout sessions.
//!
//! A guest session is an anonymous checkout identity that lives in
//! client-local storage for 24 hours. Nothing is persisted or validated
//! server-side; the storage and the clock are pluggable so the same logic
//! runs against browser-like storage, a file, or an in-memory map in tests.
//!
//! ```
//! use neyisek_core::guest::{GuestSessionManager, MemoryStorage, SystemClock};
//!
//! let manager = GuestSessionManager::new(MemoryStorage::default(), SystemClock);
//! let first = manager.get_or_create_session().unwrap();
//! let again = manager.get_or_create_session().unwrap();
//! assert_eq!(first.session_id, again.session_id);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Storage key for the serialized session.
pub const SESSION_STORAGE_KEY: &str = "neyisek_guest_session";

/// Guest sessions expire this many hours after creation.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Errors from guest session operations.
#[derive(Debug, Error)]
pub enum GuestSessionError {
    /// No valid session exists.
    #[error("no active guest session")]
    NoSession,

    /// Session could not be serialized.
    #[error("failed to serialize guest session: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Backing storage failed.
    #[error("guest session storage error: {0}")]
    Storage(String),
}

/// Key-value storage holding the serialized session (browser local storage
/// on the client).
pub trait SessionStorage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the write.
    fn set(&self, key: &str, value: String) -> Result<(), GuestSessionError>;

    /// Delete a value.
    fn remove(&self, key: &str);
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory [`SessionStorage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), GuestSessionError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Contact and delivery details collected from a guest at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestUser {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Partial update for [`GuestUser`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestUserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A stored guest session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub guest_user: Option<GuestUser>,
}

impl GuestSession {
    /// Whether the session is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Manages the guest session in a [`SessionStorage`].
pub struct GuestSessionManager<S, C> {
    storage: S,
    clock: C,
}

impl<S: SessionStorage, C: Clock> GuestSessionManager<S, C> {
    /// Create a manager over the given storage and clock.
    pub const fn new(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    /// Load the current session, discarding it if it expired or is unreadable.
    #[must_use]
    pub fn current_session(&self) -> Option<GuestSession> {
        let raw = self.storage.get(SESSION_STORAGE_KEY)?;
        match serde_json::from_str::<GuestSession>(&raw) {
            Ok(session) if session.is_valid_at(self.clock.now()) => Some(session),
            _ => {
                self.storage.remove(SESSION_STORAGE_KEY);
                None
            }
        }
    }

    /// Return the current session, creating a new one if none is valid.
    ///
    /// # Errors
    ///
    /// Returns an error if a new session cannot be stored.
    pub fn get_or_create_session(&self) -> Result<GuestSession, GuestSessionError> {
        if let Some(session) = self.current_session() {
            return Ok(session);
        }

        let now = self.clock.now();
        let session = GuestSession {
            session_id: format!("guest_{}", Uuid::new_v4().simple()),
            created_at: now,
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
            guest_user: None,
        };
        self.save(&session)?;
        Ok(session)
    }

    /// Merge contact details into the session's guest user.
    ///
    /// # Errors
    ///
    /// Returns [`GuestSessionError::NoSession`] if there is no valid session.
    pub fn update_guest_user(
        &self,
        update: GuestUserUpdate,
    ) -> Result<GuestUser, GuestSessionError> {
        let mut session = self.current_session().ok_or(GuestSessionError::NoSession)?;

        let mut user = session.guest_user.take().unwrap_or_else(|| GuestUser {
            id: format!("guest_user_{}", Uuid::new_v4().simple()),
            name: None,
            email: None,
            phone: None,
            address: None,
        });
        if update.name.is_some() {
            user.name = update.name;
        }
        if update.email.is_some() {
            user.email = update.email;
        }
        if update.phone.is_some() {
            user.phone = update.phone;
        }
        if update.address.is_some() {
            user.address = update.address;
        }

        session.guest_user = Some(user.clone());
        self.save(&session)?;
        Ok(user)
    }

    /// Remove the session.
    pub fn clear_session(&self) {
        self.storage.remove(SESSION_STORAGE_KEY);
    }

    /// Whether a valid session exists.
    #[must_use]
    pub fn is_guest_session_active(&self) -> bool {
        self.current_session().is_some()
    }

    /// Time left before the current session expires.
    #[must_use]
    pub fn time_remaining(&self) -> Option<Duration> {
        self.current_session()
            .map(|session| session.expires_at - self.clock.now())
    }

    fn save(&self, session: &GuestSession) -> Result<(), GuestSessionError> {
        let raw = serde_json::to_string(session)?;
        self.storage.set(SESSION_STORAGE_KEY, raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn manager() -> (GuestSessionManager<MemoryStorage, ManualClock>, ManualClock, MemoryStorage) {
        let clock = ManualClock::new(Utc::now());
        let storage = MemoryStorage::default();
        (
            GuestSessionManager::new(storage.clone(), clock.clone()),
            clock,
            storage,
        )
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (manager, clock, _) = manager();
        let first = manager.get_or_create_session().unwrap();
        clock.advance(Duration::hours(23));
        let second = manager.get_or_create_session().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expired_session_is_replaced() {
        let (manager, clock, _) = manager();
        let first = manager.get_or_create_session().unwrap();
        clock.advance(Duration::hours(SESSION_TTL_HOURS) + Duration::seconds(1));

        assert!(!manager.is_guest_session_active());
        let second = manager.get_or_create_session().unwrap();
        assert_ne!(first.session_id, second.session_id);
    }

    #[test]
    fn test_update_requires_session() {
        let (manager, _, _) = manager();
        let result = manager.update_guest_user(GuestUserUpdate::default());
        assert!(matches!(result, Err(GuestSessionError::NoSession)));
    }

    #[test]
    fn test_update_merges_fields() {
        let (manager, _, _) = manager();
        manager.get_or_create_session().unwrap();

        let user = manager
            .update_guest_user(GuestUserUpdate {
                name: Some("Ayşe".to_string()),
                phone: Some("05551234567".to_string()),
                ..Default::default()
            })
            .unwrap();
        let updated = manager
            .update_guest_user(GuestUserUpdate {
                address: Some("Kadıköy, İstanbul".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(user.id, updated.id);
        assert_eq!(updated.name.as_deref(), Some("Ayşe"));
        assert_eq!(updated.address.as_deref(), Some("Kadıköy, İstanbul"));
        assert_eq!(
            manager.current_session().unwrap().guest_user,
            Some(updated)
        );
    }

    #[test]
    fn test_corrupt_storage_is_discarded() {
        let (manager, _, storage) = manager();
        storage.set(SESSION_STORAGE_KEY, "{not json".to_string()).unwrap();
        assert!(manager.current_session().is_none());
        assert!(storage.get(SESSION_STORAGE_KEY).is_none());
    }

    #[test]
    fn test_clear_and_time_remaining() {
        let (manager, clock, _) = manager();
        manager.get_or_create_session().unwrap();
        clock.advance(Duration::hours(4));
        assert_eq!(manager.time_remaining(), Some(Duration::hours(20)));

        manager.clear_session();
        assert!(manager.time_remaining().is_none());
    }
}
