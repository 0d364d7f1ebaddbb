//! Committed credential state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use s3deck_protocol::{AuthTokens, AwsCredentials};

/// One committed session: the refresh token and the temporary credentials
/// issued with it.
///
/// Sessions are immutable; a refresh produces a new one with a higher
/// `generation`.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub credentials: AwsCredentials,
    pub refresh_token: String,
    pub generation: u64,
}

impl Session {
    /// The identity id the credentials were issued for.
    pub fn identity_id(&self) -> &str {
        &self.credentials.identity_id
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("refresh_token", &"<redacted>")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Holder of the current [`Session`].
///
/// Readers always see either no session or a complete one. Writes are
/// crate-private: only the coordinator commits or clears.
pub struct CredentialStore {
    current: RwLock<Option<Arc<Session>>>,
    next_generation: AtomicU64,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Returns the last committed session.
    pub fn snapshot(&self) -> Option<Arc<Session>> {
        self.current.read().unwrap().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().unwrap().is_some()
    }

    /// Generation of the current session, if any.
    pub fn generation(&self) -> Option<u64> {
        self.current.read().unwrap().as_ref().map(|s| s.generation)
    }

    /// Replaces whatever is stored with a session built from `tokens`.
    pub(crate) fn commit(&self, tokens: AuthTokens) -> Arc<Session> {
        let mut current = self.current.write().unwrap();
        let session = self.build(tokens);
        *current = Some(Arc::clone(&session));
        session
    }

    /// Replaces the session only if it is still generation `expected`.
    ///
    /// Returns `None` when the session was cleared or replaced meanwhile.
    pub(crate) fn replace_if_current(
        &self,
        expected: u64,
        tokens: AuthTokens,
    ) -> Option<Arc<Session>> {
        let mut current = self.current.write().unwrap();
        match current.as_ref() {
            Some(s) if s.generation == expected => {
                let session = self.build(tokens);
                *current = Some(Arc::clone(&session));
                Some(session)
            }
            _ => None,
        }
    }

    /// Drops the session. Returns `true` if there was one.
    pub(crate) fn clear(&self) -> bool {
        self.current.write().unwrap().take().is_some()
    }

    fn build(&self, tokens: AuthTokens) -> Arc<Session> {
        Arc::new(Session {
            credentials: tokens.credentials,
            refresh_token: tokens.refresh_token,
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(n: u32) -> AuthTokens {
        AuthTokens {
            refresh_token: format!("rt-{n}"),
            credentials: AwsCredentials {
                access_key_id: format!("key-{n}"),
                secret_access_key: "secret".into(),
                session_token: "session".into(),
                identity_id: "region:id".into(),
            },
        }
    }

    #[test]
    fn new_store_is_unauthenticated() {
        let store = CredentialStore::new();
        assert!(!store.is_authenticated());
        assert!(store.snapshot().is_none());
        assert!(store.generation().is_none());
    }

    #[test]
    fn commit_assigns_increasing_generations() {
        let store = CredentialStore::new();
        let a = store.commit(tokens(1));
        let b = store.commit(tokens(2));
        assert!(b.generation > a.generation);
        assert_eq!(store.snapshot().unwrap().refresh_token, "rt-2");
    }

    #[test]
    fn replace_if_current_checks_generation() {
        let store = CredentialStore::new();
        let first = store.commit(tokens(1));

        let second = store.replace_if_current(first.generation, tokens(2)).unwrap();
        assert_eq!(second.credentials.access_key_id, "key-2");

        // Stale expectation: nothing changes.
        assert!(store.replace_if_current(first.generation, tokens(3)).is_none());
        assert_eq!(store.snapshot().unwrap().credentials.access_key_id, "key-2");
    }

    #[test]
    fn replace_after_clear_is_refused() {
        let store = CredentialStore::new();
        let first = store.commit(tokens(1));
        assert!(store.clear());
        assert!(store.replace_if_current(first.generation, tokens(2)).is_none());
        assert!(!store.is_authenticated());
        assert!(!store.clear());
    }

    #[test]
    fn readers_never_see_partial_sessions() {
        use std::thread;

        let store = Arc::new(CredentialStore::new());
        store.commit(tokens(0));
        let mut handles = vec![];

        for i in 1..5 {
            let s = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    s.commit(tokens(i));
                }
            }));
        }
        for _ in 0..5 {
            let s = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    let snap = s.snapshot().unwrap();
                    let n = snap.refresh_token.trim_start_matches("rt-");
                    assert_eq!(snap.credentials.access_key_id, format!("key-{n}"));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn debug_hides_refresh_token() {
        let store = CredentialStore::new();
        let s = store.commit(tokens(7));
        assert!(!format!("{s:?}").contains("rt-7"));
    }
}
