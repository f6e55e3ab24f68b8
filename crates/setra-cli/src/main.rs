use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "setra", version, about = "SETRA support console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in / sign out / session status
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Page access checks
    Access {
        #[command(subcommand)]
        action: commands::access::AccessAction,
    },
    /// Persisted auto-refresh state
    Refresh {
        #[command(subcommand)]
        action: commands::refresh::RefreshAction,
    },
    /// Live dashboard with auto-refresh
    Watch(commands::watch::WatchArgs),
    /// Dashboard metrics snapshot
    Metrics {
        /// Timeseries window (7d, 30d, 90d)
        #[arg(long, default_value = "30d")]
        period: String,
    },
    /// Conversation history and transcript export
    Chats {
        #[command(subcommand)]
        action: commands::chats::ChatsAction,
    },
    /// Team management
    Users {
        #[command(subcommand)]
        action: commands::users::UsersAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SETRA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Access { action } => commands::access::run(action).await,
        Commands::Refresh { action } => commands::refresh::run(action),
        Commands::Watch(args) => commands::watch::run(args).await,
        Commands::Metrics { period } => commands::metrics::run(&period).await,
        Commands::Chats { action } => commands::chats::run(action).await,
        Commands::Users { action } => commands::users::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
