//! Conversation transcript export.
//!
//! Two formats: a CSV with a legal header block ([`csv`]) and a standalone
//! printable HTML page ([`html`]). Human-readable timestamps use the
//! configured UTC offset (Brasília by default).

pub mod csv;
pub mod html;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Conversation, Message};
use crate::error::ValidationError;
use crate::session::User;
use crate::storage::ExportConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "html" => Ok(ExportFormat::Html),
            other => Err(ValidationError::InvalidValue {
                field: "format".into(),
                message: format!("unsupported export format '{other}'"),
            }),
        }
    }
}

/// Who exported, when, and how to render times.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub exported_by: User,
    pub exported_at: DateTime<Utc>,
    pub offset: FixedOffset,
    pub system_name: String,
}

impl ExportContext {
    pub fn new(
        config: &ExportConfig,
        exported_by: User,
        exported_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let offset = FixedOffset::east_opt(config.timezone_offset_hours * 3600).ok_or_else(|| {
            ValidationError::InvalidValue {
                field: "export.timezone_offset_hours".into(),
                message: format!("{} is out of range", config.timezone_offset_hours),
            }
        })?;
        Ok(Self {
            exported_by,
            exported_at,
            offset,
            system_name: config.system_name.clone(),
        })
    }

    /// `dd/mm/yyyy, HH:MM:SS` in the export offset.
    pub fn local_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%d/%m/%Y, %H:%M:%S")
            .to_string()
    }

    /// `GMT-3` style label for the export offset.
    pub fn offset_label(&self) -> String {
        let hours = self.offset.local_minus_utc() / 3600;
        if hours == 0 {
            "GMT".into()
        } else {
            format!("GMT{hours:+}")
        }
    }

    pub fn roles_label(&self) -> String {
        self.exported_by
            .roles
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Brazilian mobile format `+55 (XX) XXXXX-XXXX` for 11+ digit numbers;
/// anything shorter is returned as given.
pub fn format_phone(digits: &str) -> String {
    let digits = digits.trim();
    if digits.len() < 11 || !digits.is_ascii() {
        return digits.to_string();
    }
    format!(
        "+55 ({}) {}-{}",
        &digits[2..4],
        &digits[4..9],
        &digits[9..]
    )
}

/// Messages in chronological order.
pub fn sorted_messages(messages: &[Message]) -> Vec<&Message> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_key(|m| m.created_at);
    sorted
}

/// `relatorio-juridico-<participant>-<timestamp>.<ext>`
pub fn file_name(
    conversation: &Conversation,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> String {
    let name = conversation
        .participant_name()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    let name = if name.is_empty() {
        conversation.id.clone()
    } else {
        name
    };
    format!(
        "relatorio-juridico-{name}-{}.{}",
        exported_at.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

/// File name for a conversation list export.
pub fn list_file_name(format: ExportFormat, exported_at: DateTime<Utc>) -> String {
    format!(
        "relatorio-juridico-multiplas-conversas-{}.{}",
        exported_at.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

/// Render a single conversation in `format`.
pub fn render(
    format: ExportFormat,
    conversation: &Conversation,
    messages: &[Message],
    ctx: &ExportContext,
) -> String {
    match format {
        ExportFormat::Csv => csv::conversation(conversation, messages, ctx),
        ExportFormat::Html => html::conversation(conversation, messages, ctx),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn phone_formatting() {
        assert_eq!(format_phone("5511912345678"), "+55 (11) 91234-5678");
        assert_eq!(format_phone("12345"), "12345");
        assert_eq!(format_phone(""), "");
    }

    #[test]
    fn local_time_uses_offset() {
        let ctx = context();
        assert_eq!(ctx.local_time(at(12, 0, 0)), "01/03/2025, 09:00:00");
        assert_eq!(ctx.offset_label(), "GMT-3");
        assert_eq!(ctx.roles_label(), "admin, support");
    }

    #[test]
    fn invalid_offset_is_rejected() {
        let config = ExportConfig {
            timezone_offset_hours: 30,
            ..ExportConfig::default()
        };
        assert!(ExportContext::new(&config, context().exported_by, at(0, 0, 0)).is_err());
    }

    #[test]
    fn file_names() {
        let name = file_name(&conversation(), ExportFormat::Csv, at(15, 4, 5));
        assert_eq!(name, "relatorio-juridico-Maria-Souza-2025-03-01T15-04-05.csv");
        assert_eq!(
            list_file_name(ExportFormat::Csv, at(15, 4, 5)),
            "relatorio-juridico-multiplas-conversas-2025-03-01T15-04-05.csv"
        );
    }

    #[test]
    fn format_parsing() {
        assert_eq!("HTML".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn messages_sort_chronologically() {
        let messages = messages();
        let sorted = sorted_messages(&messages);
        assert_eq!(sorted[0].id, "m1");
        assert_eq!(sorted[1].id, "m2");
    }
}
