//! Route guard over an [`AccessPolicy`].
//!
//! `decide` is pure. `authorize` and `landing` add the navigation side effect,
//! issued at most once per session resolution so repeated checks against the
//! same snapshot never loop.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::navigator::Navigator;
use super::policy::{has_any_role, AccessPolicy};
use crate::error::AccessError;
use crate::session::{Identity, SessionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Denied { redirect_to: String },
    Pending,
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    policy: Arc<AccessPolicy>,
    fallback_override: Option<String>,
    redirected_for: Option<u64>,
    landed_for: Option<u64>,
}

impl AccessGate {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self {
            policy,
            fallback_override: None,
            redirected_for: None,
            landed_for: None,
        }
    }

    /// Send denied users here instead of the policy fallback.
    pub fn with_fallback(mut self, path: impl Into<String>) -> Self {
        self.fallback_override = Some(path.into());
        self
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn decide(&self, required: &BTreeSet<String>, session: &SessionSnapshot) -> Decision {
        match &session.identity {
            Identity::Loading => Decision::Pending,
            Identity::Anonymous => Decision::Denied {
                redirect_to: self.policy.sign_in_path().to_string(),
            },
            Identity::Authenticated(user) => {
                if required.is_empty() || has_any_role(&user.roles, required) {
                    Decision::Allow
                } else {
                    let redirect_to = match &self.fallback_override {
                        Some(path) => path.clone(),
                        None => self.policy.fallback_destination(&user.roles).to_string(),
                    };
                    Decision::Denied { redirect_to }
                }
            }
        }
    }

    /// Decide and, on `Denied`, redirect once for this resolution.
    pub fn authorize(
        &mut self,
        required: &BTreeSet<String>,
        session: &SessionSnapshot,
        navigator: &mut dyn Navigator,
    ) -> Decision {
        let decision = self.decide(required, session);
        if let Decision::Denied { redirect_to } = &decision {
            if self.redirected_for != Some(session.resolution) {
                self.redirected_for = Some(session.resolution);
                debug!(to = %redirect_to, resolution = session.resolution, "access denied; redirecting");
                navigator.redirect(redirect_to);
            }
        }
        decision
    }

    /// Authorize with the roles the policy requires for `path`.
    pub fn authorize_path(
        &mut self,
        path: &str,
        session: &SessionSnapshot,
        navigator: &mut dyn Navigator,
    ) -> Decision {
        let required = self.policy.required_roles_for(path);
        self.authorize(&required, session, navigator)
    }

    /// [`authorize_path`](Self::authorize_path) for callers that cannot render
    /// a denied page: anything but `Allow` becomes an error.
    pub fn require_path(
        &mut self,
        path: &str,
        session: &SessionSnapshot,
        navigator: &mut dyn Navigator,
    ) -> Result<(), AccessError> {
        match self.authorize_path(path, session, navigator) {
            Decision::Allow => Ok(()),
            Decision::Denied { redirect_to } => Err(AccessError::Denied {
                path: path.to_string(),
                redirect_to,
            }),
            Decision::Pending => Err(AccessError::Pending(path.to_string())),
        }
    }

    /// Entry-page routing: once identity resolves, replace the location with
    /// the highest-priority destination the user can reach.
    ///
    /// Returns the destination when navigation happened.
    pub fn landing(
        &mut self,
        session: &SessionSnapshot,
        navigator: &mut dyn Navigator,
    ) -> Option<String> {
        let destination = match &session.identity {
            Identity::Loading => return None,
            Identity::Anonymous => self.policy.sign_in_path().to_string(),
            Identity::Authenticated(user) => self.policy.fallback_destination(&user.roles).to_string(),
        };
        if self.landed_for == Some(session.resolution) {
            return None;
        }
        self.landed_for = Some(session.resolution);
        navigator.replace(&destination);
        Some(destination)
    }
}
