use clap::Subcommand;
use serde_json::json;
use setra_core::Config;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dot path, e.g. "api.base_url" or "refresh.interval_ms"
        key: String,
    },
    /// Change one setting; the file is only written when the result validates
    Set {
        key: String,
        value: String,
    },
    /// Print the whole config file as JSON
    List,
    /// Settings as the console will use them, after environment overrides
    Effective,
    /// Where config.toml lives
    Path,
    /// Restore defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => print_json(&Config::load()?)?,
        ConfigAction::Effective => {
            let config = Config::load()?;
            print_json(&json!({
                "api_url": config.api.effective_base_url(),
                "api_timeout_secs": config.api.timeout().as_secs(),
                "auto_refresh": config.refresh.enabled,
                "refresh_interval_ms": config.refresh.interval().as_millis() as u64,
                "export_offset_hours": config.export.timezone_offset_hours,
            }))?;
        }
        ConfigAction::Path => println!("{}", Config::path()?.display()),
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
