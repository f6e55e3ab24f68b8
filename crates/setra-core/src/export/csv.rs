//! CSV transcript with a legal header block.

use super::{format_phone, sorted_messages, ExportContext};
use crate::api::{Conversation, Message, MessageSource};

const RULE_WIDTH: usize = 80;

const MESSAGE_HEADERS: [&str; 13] = [
    "Número",
    "Data/Hora",
    "Data/Hora (ISO)",
    "Timestamp Unix",
    "Origem",
    "Nome do Operador",
    "Email do Operador",
    "ID do Operador",
    "ID da Mensagem",
    "Conteúdo",
    "Tamanho (caracteres)",
    "Tipo",
    "Status",
];

pub const CONVERSATION_HEADERS: [&str; 9] = [
    "ID da Conversa",
    "Cliente",
    "Telefone",
    "Data de Criação",
    "Última Atualização",
    "Status",
    "Total de Mensagens",
    "Última Mensagem",
    "Operador Responsável",
];

/// Message table header row; the local-time column names the export offset.
pub fn message_headers(ctx: &ExportContext) -> String {
    let local = format!("Data/Hora ({})", ctx.offset_label());
    let mut headers: Vec<&str> = MESSAGE_HEADERS.to_vec();
    headers[1] = &local;
    headers.join(",")
}

/// Quote a field when it holds a separator, quote or line break.
pub fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quoted(value)
    } else {
        value.to_string()
    }
}

/// Always quote, doubling embedded quotes.
pub fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn banner(title: &str) -> [String; 3] {
    [rule(), title.to_string(), rule()]
}

fn legal_notes(ctx: &ExportContext, lines: &[&str]) -> Vec<String> {
    let mut notes = vec![
        "OBSERVAÇÕES LEGAIS:".to_string(),
        format!(
            "- Este documento foi gerado automaticamente pelo sistema {}",
            ctx.system_name
        ),
    ];
    notes.extend(lines.iter().map(|l| l.to_string()));
    notes
}

/// Header block preceding the message table.
pub fn legal_header(
    conversation: &Conversation,
    messages: &[Message],
    ctx: &ExportContext,
) -> Vec<String> {
    let sorted = sorted_messages(messages);
    let local = |m: Option<&&Message>| {
        m.map(|m| ctx.local_time(m.created_at))
            .unwrap_or_else(|| "N/A".into())
    };
    let user = &ctx.exported_by;

    let mut lines = Vec::new();
    lines.extend(banner(&format!(
        "RELATÓRIO JURÍDICO DE CONVERSA - SISTEMA {}",
        ctx.system_name.to_uppercase()
    )));
    lines.extend([
        String::new(),
        "INFORMAÇÕES DA CONVERSA:".into(),
        format!("ID da Conversa: {}", conversation.id),
        format!("Participante: {}", conversation.participant_name()),
        format!(
            "Telefone: {}",
            conversation.participant_phone().map(format_phone).unwrap_or_default()
        ),
        format!("Data de Criação: {}", ctx.local_time(conversation.created_at)),
        format!("Última Atualização: {}", ctx.local_time(conversation.updated_at)),
        format!("Status: {}", conversation.status_label()),
        String::new(),
        "PERÍODO DAS MENSAGENS:".into(),
        format!("Primeira Mensagem: {}", local(sorted.first())),
        format!("Última Mensagem: {}", local(sorted.last())),
        format!("Total de Mensagens: {}", messages.len()),
        String::new(),
        "INFORMAÇÕES DA EXPORTAÇÃO:".into(),
        format!("Exportado por: {} ({})", user.name, user.email),
        format!("Cargo/Função: {}", ctx.roles_label()),
        format!("Data/Hora da Exportação: {}", ctx.local_time(ctx.exported_at)),
        format!("ID do Usuário Exportador: {}", user.id),
        String::new(),
    ]);
    let timezone_note = format!(
        "- As datas e horários estão no fuso horário configurado ({})",
        ctx.offset_label()
    );
    lines.extend(legal_notes(
        ctx,
        &[
            "- Todas as mensagens foram preservadas em sua forma original",
            timezone_note.as_str(),
            "- Este relatório possui valor jurídico e pode ser utilizado em processos legais",
            "- A integridade dos dados foi mantida durante a exportação",
        ],
    ));
    lines.push(String::new());
    lines.extend(banner("INÍCIO DAS MENSAGENS"));
    lines.push(String::new());
    lines
}

/// One row per message, chronological, numbered from 1.
pub fn message_rows(messages: &[Message], ctx: &ExportContext) -> Vec<String> {
    sorted_messages(messages)
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let operator = m.operator_sender.as_ref();
            let origin = match m.source {
                MessageSource::Operator => "Operador",
                MessageSource::External => "Cliente",
            };
            [
                (i + 1).to_string(),
                field(&ctx.local_time(m.created_at)),
                m.created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                m.created_at.timestamp().to_string(),
                origin.to_string(),
                field(operator.map(|o| o.name.as_str()).unwrap_or_default()),
                field(operator.map(|o| o.email.as_str()).unwrap_or_default()),
                field(operator.map(|o| o.id.as_str()).unwrap_or_default()),
                field(&m.id),
                quoted(&m.content),
                m.content.chars().count().to_string(),
                "Texto".to_string(),
                "Enviada".to_string(),
            ]
            .join(",")
        })
        .collect()
}

/// Full single-conversation CSV document.
pub fn conversation(
    conversation: &Conversation,
    messages: &[Message],
    ctx: &ExportContext,
) -> String {
    let mut lines = legal_header(conversation, messages, ctx);
    lines.push(message_headers(ctx));
    lines.extend(message_rows(messages, ctx));
    lines.join("\n")
}

/// Conversation list CSV, one row per conversation.
pub fn conversation_list(conversations: &[Conversation], ctx: &ExportContext) -> String {
    let user = &ctx.exported_by;
    let mut lines = Vec::new();
    lines.extend(banner(&format!(
        "RELATÓRIO JURÍDICO DE MÚLTIPLAS CONVERSAS - SISTEMA {}",
        ctx.system_name.to_uppercase()
    )));
    lines.extend([
        String::new(),
        "INFORMAÇÕES DA EXPORTAÇÃO:".into(),
        format!("Exportado por: {} ({})", user.name, user.email),
        format!("Cargo/Função: {}", ctx.roles_label()),
        format!("Data/Hora da Exportação: {}", ctx.local_time(ctx.exported_at)),
        format!("ID do Usuário Exportador: {}", user.id),
        format!("Total de Conversas: {}", conversations.len()),
        String::new(),
    ]);
    let timezone_note = format!(
        "- As datas estão no fuso horário configurado ({})",
        ctx.offset_label()
    );
    lines.extend(legal_notes(
        ctx,
        &[
            "- Lista de conversas com informações básicas para fins jurídicos",
            "- Para detalhes completos, exporte cada conversa individualmente",
            timezone_note.as_str(),
        ],
    ));
    lines.push(String::new());
    lines.extend(banner("LISTA DE CONVERSAS"));
    lines.push(String::new());
    lines.push(CONVERSATION_HEADERS.join(","));

    for c in conversations {
        lines.push(
            [
                field(&c.id),
                quoted(c.participant_name()),
                c.participant_phone().map(format_phone).unwrap_or_default(),
                field(&ctx.local_time(c.created_at)),
                field(&ctx.local_time(c.updated_at)),
                field(c.status_label()),
                c.message_count.unwrap_or(0).to_string(),
                field(c.last_message.as_deref().unwrap_or("N/A")),
                field(c.operator.as_deref().unwrap_or("N/A")),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}
