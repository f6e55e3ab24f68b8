//! Session/identity holder.
//!
//! Owns the persisted bearer token and the resolved user. Coordinators only
//! read [`SessionSnapshot`]s from it.
//!
//! ```text
//! Loading --restore--> Authenticated | Anonymous
//! any     --login-->   Authenticated | Anonymous (on failure)
//! any     --logout-->  Anonymous
//! ```
//!
//! Every transition bumps `resolution`, so observers can tell two resolutions
//! apart even when they land on the same identity.

mod claims;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use claims::TokenClaims;

#[cfg(test)]
pub(crate) use claims::unsigned_token;

use crate::api::{ApiClient, Profile};
use crate::clock::Clock;
use crate::error::{ApiError, SessionError};
use crate::storage::{keys, KvStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub selected_theme: String,
    pub roles: BTreeSet<String>,
}

impl User {
    /// Profile fields from `/users/me`, roles from the token.
    pub fn from_parts(profile: Profile, claims: &TokenClaims) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            name: profile.name,
            selected_theme: profile.selected_theme,
            roles: claims.roles.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "user", rename_all = "lowercase")]
pub enum Identity {
    Loading,
    Anonymous,
    Authenticated(User),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub identity: Identity,
    pub resolution: u64,
}

impl SessionSnapshot {
    pub fn loading() -> Self {
        Self {
            identity: Identity::Loading,
            resolution: 0,
        }
    }

    pub fn anonymous(resolution: u64) -> Self {
        Self {
            identity: Identity::Anonymous,
            resolution,
        }
    }

    pub fn authenticated(user: User, resolution: u64) -> Self {
        Self {
            identity: Identity::Authenticated(user),
            resolution,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.identity, Identity::Loading)
    }

    pub fn user(&self) -> Option<&User> {
        match &self.identity {
            Identity::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Roles of the current user; empty unless authenticated.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.user()
            .into_iter()
            .flat_map(|u| u.roles.iter().map(String::as_str))
    }
}

pub struct SessionHolder {
    store: Arc<dyn KvStore>,
    api: ApiClient,
    clock: Arc<dyn Clock>,
    token: Option<String>,
    snapshot: SessionSnapshot,
}

impl SessionHolder {
    /// A holder in the `Loading` state. Call [`restore`](Self::restore) next.
    pub fn new(store: Arc<dyn KvStore>, api: ApiClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            api,
            clock,
            token: None,
            snapshot: SessionSnapshot::loading(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.clone()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// API client carrying the session's bearer token, if any.
    pub fn client(&self) -> ApiClient {
        let mut client = self.api.clone();
        client.set_token(self.token.clone());
        client
    }

    /// Client for calls that need a signed-in user.
    pub fn authorized_client(&self) -> Result<ApiClient, SessionError> {
        if self.token.is_none() || !self.snapshot.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        Ok(self.client())
    }

    /// Rehydrate identity from the persisted token.
    ///
    /// Any failure (bad token, expiry, rejected by the backend) removes the
    /// token and resolves to `Anonymous`.
    pub async fn restore(&mut self) -> SessionSnapshot {
        let stored = match self.store.get(keys::AUTH_TOKEN) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "could not read stored token");
                None
            }
        };

        let Some(token) = stored else {
            return self.resolve_anonymous();
        };

        match self.resolve_token(&token).await {
            Ok(user) => {
                info!(user = %user.email, "session restored");
                self.resolve_authenticated(token, user)
            }
            Err(e) => {
                warn!(error = %e, "stored session rejected; signing out");
                self.forget_token();
                self.resolve_anonymous()
            }
        }
    }

    /// Sign in and persist the token.
    ///
    /// # Errors
    /// `InvalidCredentials` on HTTP 401; `LoginFailed` for other backend
    /// failures; token errors if the returned token cannot be read.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let response = match self.api.login(email, password).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail_login(login_error(e))),
        };

        let token = response.access_token;
        if let Err(e) = self.store.set(keys::AUTH_TOKEN, &token) {
            warn!(error = %e, "could not persist token; session lasts for this process only");
        }

        match self.resolve_token(&token).await {
            Ok(user) => {
                info!(user = %user.email, "signed in");
                Ok(self.resolve_authenticated(token, user))
            }
            Err(e) => Err(self.fail_login(e)),
        }
    }

    pub fn logout(&mut self) -> SessionSnapshot {
        self.forget_token();
        info!("signed out");
        self.resolve_anonymous()
    }

    async fn resolve_token(&self, token: &str) -> Result<User, SessionError> {
        let claims = TokenClaims::decode(token)?;
        claims.ensure_fresh(self.clock.now_ms())?;
        let profile = self.api.me_with(token).await.map_err(|e| match e.status() {
            Some(401) => SessionError::InvalidToken,
            _ => SessionError::LoginFailed(e),
        })?;
        Ok(User::from_parts(profile, &claims))
    }

    fn fail_login(&mut self, error: SessionError) -> SessionError {
        self.forget_token();
        self.resolve_anonymous();
        error
    }

    fn forget_token(&mut self) {
        self.token = None;
        if let Err(e) = self.store.remove(keys::AUTH_TOKEN) {
            warn!(error = %e, "could not remove stored token");
        }
    }

    fn resolve_anonymous(&mut self) -> SessionSnapshot {
        self.snapshot = SessionSnapshot::anonymous(self.snapshot.resolution + 1);
        self.snapshot()
    }

    fn resolve_authenticated(&mut self, token: String, user: User) -> SessionSnapshot {
        self.token = Some(token);
        self.snapshot = SessionSnapshot::authenticated(user, self.snapshot.resolution + 1);
        self.snapshot()
    }
}

fn login_error(e: ApiError) -> SessionError {
    match e.status() {
        Some(401) => SessionError::InvalidCredentials,
        _ => SessionError::LoginFailed(e),
    }
}
