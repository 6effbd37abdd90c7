//! Session state: the persisted access token and its resolution to a user.
//!
//! [`SessionStore`] is the single source of truth for "is a request
//! authorized". It holds one token string, persisted to a file so the
//! session survives restarts, and notifies subscribers on change.
//! [`SessionManager`] resolves the stored token to a [`SessionState`]; every
//! failure mode collapses to signed-out rather than an error.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;

use crate::auth::{AuthClient, AuthUser};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to persist token at {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
    #[error("Failed to clear token at {path}: {source}")]
    Clear { path: PathBuf, source: io::Error },
}

/// Authenticated identity attached to the current token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

impl From<AuthUser> for SessionUser {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// What consumers gate their views on. `loading` is true only until the
/// initial session check completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<SessionUser>,
    pub loading: bool,
}

impl SessionState {
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }

    #[must_use]
    pub const fn authenticated(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

struct StoreInner {
    path: PathBuf,
    token: watch::Sender<Option<String>>,
}

/// Process-wide token holder with `get`/`set`/`subscribe`.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Open the store backed by `path`. An unreadable or missing file means
    /// no session; it must never fail the caller.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = fs::read_to_string(&path)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());
        let (sender, _) = watch::channel(token);
        Self {
            inner: Arc::new(StoreInner {
                path,
                token: sender,
            }),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner.token.borrow().clone()
    }

    /// Write or clear the token, persisting the change before notifying
    /// subscribers. `None` signs the process out.
    pub fn set(&self, token: Option<&str>) -> Result<(), SessionError> {
        let path = &self.inner.path;
        match token {
            Some(value) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|source| SessionError::Persist {
                        path: path.clone(),
                        source,
                    })?;
                }
                fs::write(path, value).map_err(|source| SessionError::Persist {
                    path: path.clone(),
                    source,
                })?;
            }
            None => match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::Clear {
                        path: path.clone(),
                        source,
                    })
                }
            },
        }
        self.inner.token.send_replace(token.map(str::to_string));
        Ok(())
    }

    /// Watch the token for changes; consumers re-render on every update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.token.subscribe()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.inner.path)
            .field("token_present", &self.get().is_some())
            .finish()
    }
}

/// Resolves the stored token to a session, gating every other component.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: SessionStore,
    auth: Option<AuthClient>,
}

impl SessionManager {
    #[must_use]
    pub const fn new(store: SessionStore, auth: Option<AuthClient>) -> Self {
        Self { store, auth }
    }

    #[must_use]
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Resolve the current session. Unconfigured auth, a missing token, and
    /// a token the provider rejects all yield the signed-out state; a
    /// resolution failure is logged, never raised.
    pub async fn resolve(&self) -> SessionState {
        let Some(auth) = &self.auth else {
            return SessionState::unauthenticated();
        };
        let Some(token) = self.store.get() else {
            return SessionState::unauthenticated();
        };
        match auth.user_from_token(&token).await {
            Ok(Some(user)) => SessionState::authenticated(user.into()),
            Ok(None) => SessionState::unauthenticated(),
            Err(err) => {
                warn!("Session resolution failed: {err}");
                SessionState::unauthenticated()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("access_token"));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn set_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access_token");

        let store = SessionStore::open(&path);
        store.set(Some("tok-1")).unwrap();
        assert_eq!(store.get().as_deref(), Some("tok-1"));

        let reopened = SessionStore::open(&path);
        assert_eq!(reopened.get().as_deref(), Some("tok-1"));
    }

    #[test]
    fn clearing_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access_token");

        let store = SessionStore::open(&path);
        store.set(Some("tok-1")).unwrap();
        store.set(None).unwrap();
        assert_eq!(store.get(), None);
        assert!(!path.exists());
        // Clearing an already-cleared session stays fine.
        store.set(None).unwrap();
    }

    #[test]
    fn subscribers_observe_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("access_token"));
        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow_and_update(), None);

        store.set(Some("tok-2")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_deref(), Some("tok-2"));
    }

    #[tokio::test]
    async fn auth_disabled_resolves_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("access_token"));
        store.set(Some("tok-1")).unwrap();

        let manager = SessionManager::new(store, None);
        let state = manager.resolve().await;
        assert_eq!(state, SessionState::unauthenticated());
    }
}
