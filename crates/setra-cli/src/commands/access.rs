use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;
use setra_core::access::{Navigation, RecordingNavigator};
use setra_core::{AccessGate, AccessPolicy, Decision, SessionSnapshot, User};

use super::{print_json, split_list, CmdResult, Console};

#[derive(Subcommand)]
pub enum AccessAction {
    /// Decide whether the session may open a page
    Check {
        /// Page path, e.g. /users
        path: String,
        /// Evaluate for these roles instead of the signed-in session
        #[arg(long)]
        roles: Option<String>,
    },
    /// Pages the session can reach, in priority order
    Pages {
        #[arg(long)]
        roles: Option<String>,
    },
    /// Where the entry page sends the session
    Landing {
        #[arg(long)]
        roles: Option<String>,
    },
}

#[derive(Serialize)]
struct CheckReport<'a> {
    path: &'a str,
    title: &'a str,
    required_roles: Vec<String>,
    #[serde(flatten)]
    decision: Decision,
    navigation: &'a [Navigation],
}

#[derive(Serialize)]
struct PageEntry<'a> {
    path: &'a str,
    title: &'a str,
    capability: setra_core::Capability,
}

/// The signed-in session, or a synthetic one carrying `roles`.
async fn resolve(roles: Option<String>) -> Result<SessionSnapshot, Box<dyn std::error::Error>> {
    if let Some(raw) = roles {
        let user = User {
            id: "cli".into(),
            email: "cli@localhost".into(),
            name: "cli".into(),
            selected_theme: "light".into(),
            roles: split_list(&raw).into_iter().collect(),
        };
        return Ok(SessionSnapshot::authenticated(user, 1));
    }
    let console = Console::open();
    let mut session = console.session()?;
    Ok(session.restore().await)
}

pub async fn run(action: AccessAction) -> CmdResult {
    let policy = Arc::new(AccessPolicy::default());
    match action {
        AccessAction::Check { path, roles } => {
            let session = resolve(roles).await?;
            let mut gate = AccessGate::new(Arc::clone(&policy));
            let mut navigator = RecordingNavigator::at(path.as_str());
            let decision = gate.authorize_path(&path, &session, &mut navigator);
            print_json(&CheckReport {
                path: &path,
                title: policy.title_for(&path),
                required_roles: policy.required_roles_for(&path).into_iter().collect(),
                decision,
                navigation: navigator.calls(),
            })?;
        }
        AccessAction::Pages { roles } => {
            let session = resolve(roles).await?;
            let roles = session.user().map(|u| u.roles.clone()).unwrap_or_default();
            let pages: Vec<PageEntry> = policy
                .available_destinations(&roles)
                .into_iter()
                .map(|d| PageEntry {
                    path: &d.path,
                    title: &d.title,
                    capability: d.capability,
                })
                .collect();
            print_json(&pages)?;
        }
        AccessAction::Landing { roles } => {
            let session = resolve(roles).await?;
            let mut gate = AccessGate::new(Arc::clone(&policy));
            let mut navigator = RecordingNavigator::at("/");
            match gate.landing(&session, &mut navigator) {
                Some(destination) => println!("{destination}"),
                None => println!("pending"),
            }
        }
    }
    Ok(())
}
