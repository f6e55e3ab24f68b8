use clap::Subcommand;

use super::{print_json, CmdResult, Console};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in and persist the session token
    Login {
        #[arg(long)]
        email: String,
        /// Password (falls back to SETRA_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the session token
    Logout,
    /// Print the resolved session as JSON
    Status,
}

pub async fn run(action: AuthAction) -> CmdResult {
    let console = Console::open();
    match action {
        AuthAction::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => std::env::var("SETRA_PASSWORD")
                    .map_err(|_| "--password or SETRA_PASSWORD required")?,
            };
            let mut session = console.session()?;
            let snapshot = session.login(&email, &password).await?;
            if let Some(user) = snapshot.user() {
                println!("signed in as {} ({})", user.name, user.email);
            }
        }
        AuthAction::Logout => {
            let mut session = console.session()?;
            session.logout();
            println!("signed out");
        }
        AuthAction::Status => {
            let mut session = console.session()?;
            let snapshot = session.restore().await;
            print_json(&snapshot)?;
        }
    }
    Ok(())
}
