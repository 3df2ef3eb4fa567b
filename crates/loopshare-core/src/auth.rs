//! Current-user lookup.
//!
//! Authentication itself happens elsewhere; the core only asks who is signed
//! in. "Nobody" gates every data-dependent operation.

use std::sync::RwLock;

use tracing::info;

use crate::models::User;

/// Source of the signed-in user and the token used to call the backend.
#[cfg_attr(test, mockall::automock)]
pub trait Session: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;

    /// Bearer token for backend calls made on behalf of the user.
    fn access_token(&self) -> Option<String>;
}

/// Session backed by values known up front (config file, tests).
#[derive(Debug, Default)]
pub struct StaticSession {
    inner: RwLock<Option<(User, Option<String>)>>,
}

impl StaticSession {
    /// A session with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session signed in as `user`.
    #[must_use]
    pub fn signed_in(user: User, access_token: Option<String>) -> Self {
        Self {
            inner: RwLock::new(Some((user, access_token))),
        }
    }

    /// Replace the signed-in user.
    pub fn sign_in(&self, user: User, access_token: Option<String>) {
        info!("Signed in as {}", user.email);
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some((user, access_token));
        }
    }

    /// Forget the signed-in user.
    pub fn sign_out(&self) {
        info!("Signed out");
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }
}

impl Session for StaticSession {
    fn current_user(&self) -> Option<User> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|(user, _)| user.clone()))
    }

    fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|(_, token)| token.clone()))
    }
}
