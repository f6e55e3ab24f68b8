use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use setra_core::export::{self, ExportContext, ExportFormat};

use super::{print_json, CmdResult, Console};

#[derive(Subcommand)]
pub enum ChatsAction {
    /// List conversations
    List,
    /// Show one conversation with its messages
    Show { id: String },
    /// Export a conversation transcript
    Export {
        id: String,
        /// csv or html
        #[arg(long, default_value = "csv")]
        format: String,
        /// Output file (defaults to a generated name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export the conversation list
    ExportList {
        /// csv or html
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub async fn run(action: ChatsAction) -> CmdResult {
    let console = Console::open();
    let session = console.guarded("/chats").await?;
    let client = session.authorized_client()?;

    match action {
        ChatsAction::List => {
            let conversations = client.conversations().await?;
            let rows: Vec<_> = conversations
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "participant": c.participant_name(),
                        "phone": c.participant_phone().map(export::format_phone),
                        "status": c.status_label(),
                        "updated_at": c.updated_at,
                        "message_count": c.message_count,
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        ChatsAction::Show { id } => {
            let (conversation, messages) =
                tokio::try_join!(client.conversation(&id), client.messages(&id))?;
            print_json(&json!({
                "conversation": conversation,
                "messages": export::sorted_messages(&messages),
            }))?;
        }
        ChatsAction::Export { id, format, out } => {
            let format: ExportFormat = format.parse()?;
            let (conversation, messages) =
                tokio::try_join!(client.conversation(&id), client.messages(&id))?;
            let ctx = export_context(&console, &session)?;
            let document = export::render(format, &conversation, &messages, &ctx);
            let path = out.unwrap_or_else(|| {
                PathBuf::from(export::file_name(&conversation, format, ctx.exported_at))
            });
            std::fs::write(&path, document)?;
            println!("{}", path.display());
        }
        ChatsAction::ExportList { format, out } => {
            let format: ExportFormat = format.parse()?;
            let conversations = client.conversations().await?;
            let ctx = export_context(&console, &session)?;
            let document = match format {
                ExportFormat::Csv => export::csv::conversation_list(&conversations, &ctx),
                ExportFormat::Html => export::html::conversation_list(&conversations, &ctx),
            };
            let path = out
                .unwrap_or_else(|| PathBuf::from(export::list_file_name(format, ctx.exported_at)));
            std::fs::write(&path, document)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn export_context(
    console: &Console,
    session: &setra_core::SessionHolder,
) -> Result<ExportContext, Box<dyn std::error::Error>> {
    let user = session
        .snapshot()
        .user()
        .cloned()
        .ok_or(setra_core::SessionError::NotAuthenticated)?;
    Ok(ExportContext::new(&console.config.export, user, Utc::now())?)
}
