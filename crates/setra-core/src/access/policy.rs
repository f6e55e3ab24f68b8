//! Role-destination policy.
//!
//! Grants and destinations are plain ordered data. Destination order is the
//! fallback priority: the first destination a user can reach wins.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Dashboard,
    Users,
    Chats,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Dashboard => "dashboard",
            Capability::Users => "users",
            Capability::Chats => "chats",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub capability: Capability,
    pub path: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    grants: Vec<(Capability, BTreeSet<String>)>,
    destinations: Vec<Destination>,
    sign_in: String,
    unknown_title: String,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new("/login")
            .grant(Capability::Dashboard, ["admin", "support"])
            .grant(Capability::Users, ["admin", "support"])
            .grant(Capability::Chats, ["admin", "support", "operator"])
            .destination(Capability::Dashboard, "/", "Dashboard")
            .destination(Capability::Users, "/users", "Team")
            .destination(Capability::Chats, "/chats", "Histórico de Conversas")
    }
}

impl AccessPolicy {
    /// Empty policy with the given sign-in path.
    pub fn new(sign_in: impl Into<String>) -> Self {
        Self {
            grants: Vec::new(),
            destinations: Vec::new(),
            sign_in: sign_in.into(),
            unknown_title: "Página".into(),
        }
    }

    pub fn grant<I, S>(mut self, capability: Capability, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles = roles.into_iter().map(Into::into).collect();
        self.grants.retain(|(c, _)| *c != capability);
        self.grants.push((capability, roles));
        self
    }

    /// Append a destination. Earlier destinations have higher fallback priority.
    pub fn destination(
        mut self,
        capability: Capability,
        path: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.destinations.push(Destination {
            capability,
            path: path.into(),
            title: title.into(),
        });
        self
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn roles_for(&self, capability: Capability) -> Option<&BTreeSet<String>> {
        self.grants
            .iter()
            .find(|(c, _)| *c == capability)
            .map(|(_, roles)| roles)
    }

    /// Capabilities without a grant are reachable by nobody.
    pub fn can(&self, capability: Capability, roles: &BTreeSet<String>) -> bool {
        self.roles_for(capability)
            .is_some_and(|allowed| has_any_role(roles, allowed))
    }

    /// First destination `roles` can reach, else the sign-in path.
    pub fn fallback_destination(&self, roles: &BTreeSet<String>) -> &str {
        self.destinations
            .iter()
            .find(|d| self.can(d.capability, roles))
            .map(|d| d.path.as_str())
            .unwrap_or(self.sign_in.as_str())
    }

    /// Every destination `roles` can reach, in priority order.
    pub fn available_destinations(&self, roles: &BTreeSet<String>) -> Vec<&Destination> {
        self.destinations
            .iter()
            .filter(|d| self.can(d.capability, roles))
            .collect()
    }

    pub fn capability_for(&self, path: &str) -> Option<Capability> {
        let path = strip_query(path);
        self.destinations
            .iter()
            .find(|d| d.path == path)
            .map(|d| d.capability)
    }

    /// Roles a path requires. Unknown paths require none (authenticated only).
    pub fn required_roles_for(&self, path: &str) -> BTreeSet<String> {
        self.capability_for(path)
            .and_then(|c| self.roles_for(c))
            .cloned()
            .unwrap_or_default()
    }

    pub fn title_for(&self, path: &str) -> &str {
        let path = strip_query(path);
        self.destinations
            .iter()
            .find(|d| d.path == path)
            .map(|d| d.title.as_str())
            .unwrap_or(self.unknown_title.as_str())
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

pub fn has_role(roles: &BTreeSet<String>, role: &str) -> bool {
    roles.contains(role)
}

pub fn has_any_role<I, S>(roles: &BTreeSet<String>, required: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    required.into_iter().any(|r| has_role(roles, r.as_ref()))
}
