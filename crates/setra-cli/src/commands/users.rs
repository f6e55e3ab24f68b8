use clap::Subcommand;
use serde_json::json;
use setra_core::api::types::{NewUser, UserPatch};

use super::{print_json, CmdResult, Console};

#[derive(Subcommand)]
pub enum UsersAction {
    /// List users with their primary role
    List,
    /// Create a user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "operator")]
        role: String,
    },
    /// Update a user; only changed fields are sent
    Update {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Delete a user
    Delete { id: String },
}

pub async fn run(action: UsersAction) -> CmdResult {
    let console = Console::open();
    let client = console.guarded("/users").await?.authorized_client()?;

    match action {
        UsersAction::List => {
            let users = client.users().await?;
            let rows: Vec<_> = users
                .iter()
                .map(|u| {
                    json!({
                        "id": u.id,
                        "name": u.name,
                        "email": u.email,
                        "role": u.primary_role(),
                        "created_at": u.created_at,
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        UsersAction::Create {
            email,
            name,
            password,
            role,
        } => {
            let created = client
                .create_user(&NewUser {
                    email,
                    name,
                    password,
                    role,
                })
                .await?;
            println!("{}", created.id);
        }
        UsersAction::Update {
            id,
            email,
            name,
            role,
        } => {
            let users = client.users().await?;
            let current = users
                .iter()
                .find(|u| u.id == id)
                .ok_or_else(|| format!("user not found: {id}"))?;
            let patch = UserPatch { email, name, role }.against(current);
            if patch.is_empty() {
                println!("nothing to update");
                return Ok(());
            }
            client.update_user(&id, &patch).await?;
            println!("ok");
        }
        UsersAction::Delete { id } => {
            client.delete_user(&id).await?;
            println!("ok");
        }
    }
    Ok(())
}
