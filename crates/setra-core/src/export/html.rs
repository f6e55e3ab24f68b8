//! Printable HTML transcripts.
//!
//! Every interpolated value goes through [`escape`]; message bodies keep
//! their line breaks as `<br>`.

use super::{format_phone, sorted_messages, ExportContext};
use crate::api::{Conversation, Message, MessageSource};

const STYLE: &str = "\
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;line-height:1.6;\
color:#333;max-width:800px;margin:0 auto;padding:20px}\
.header{text-align:center;border-bottom:2px solid #007bff;padding-bottom:20px;margin-bottom:30px}\
.header h1{color:#007bff;margin:0 0 8px}\
.info-grid{display:grid;grid-template-columns:1fr 1fr;gap:10px;margin-bottom:20px}\
.info-label{font-size:12px;color:#666}.info-value{font-weight:600}\
.message{margin-bottom:10px}.message.operator{text-align:right}\
.message-header{font-size:12px;color:#666;margin-bottom:5px}\
.message-content{display:inline-block;max-width:60%;padding:8px 12px;border-radius:12px;\
white-space:pre-wrap;word-wrap:break-word;font-size:14px;text-align:left}\
.operator .message-content{background:#007bff;color:#fff}\
.client .message-content{background:#f1f3f4}\
.footer{margin-top:30px;font-size:11px;color:#999;text-align:center}\
@media print{body{padding:0}}";

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn info_item(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!(
        "<div class=\"info-item\"><div class=\"info-label\">{}</div>\
         <div class=\"info-value\">{}</div></div>",
        escape(label),
        escape(value)
    ));
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    )
}

fn footer(ctx: &ExportContext) -> String {
    format!(
        "<div class=\"footer\">Documento gerado automaticamente pelo sistema {}. \
         Horários em {}.</div>",
        escape(&ctx.system_name),
        escape(&ctx.offset_label())
    )
}

fn export_info(out: &mut String, ctx: &ExportContext) {
    let user = &ctx.exported_by;
    out.push_str("<div class=\"export-info\"><div class=\"info-grid\">");
    info_item(out, "Exportado por", &format!("{} ({})", user.name, user.email));
    info_item(out, "Data da Exportação", &ctx.local_time(ctx.exported_at));
    info_item(out, "Cargo/Função", &ctx.roles_label());
    info_item(out, "ID do Usuário Exportador", &user.id);
    out.push_str("</div></div>");
}

/// Standalone page for one conversation.
pub fn conversation(
    conversation: &Conversation,
    messages: &[Message],
    ctx: &ExportContext,
) -> String {
    let name = conversation.participant_name().trim();
    let phone = conversation
        .participant_phone()
        .map(format_phone)
        .unwrap_or_default();
    let sorted = sorted_messages(messages);
    let local = |m: Option<&&Message>| {
        m.map(|m| ctx.local_time(m.created_at))
            .unwrap_or_else(|| "N/A".into())
    };

    let mut body = String::new();
    body.push_str(&format!(
        "<div class=\"header\"><h1>Relatório de Conversa</h1><h2>{}</h2><h3>{}</h3></div>",
        escape(if name.is_empty() { "Cliente" } else { name }),
        escape(&phone)
    ));

    body.push_str("<div class=\"info-section\"><div class=\"info-grid\">");
    info_item(&mut body, "ID da Conversa", &conversation.id);
    info_item(&mut body, "Participante", if name.is_empty() { "Cliente" } else { name });
    info_item(&mut body, "Telefone", if phone.is_empty() { "N/A" } else { phone.as_str() });
    info_item(&mut body, "Status", conversation.status_label());
    info_item(&mut body, "Data de Criação", &ctx.local_time(conversation.created_at));
    info_item(&mut body, "Última Atualização", &ctx.local_time(conversation.updated_at));
    info_item(&mut body, "Primeira Mensagem", &local(sorted.first()));
    info_item(&mut body, "Última Mensagem", &local(sorted.last()));
    info_item(&mut body, "Total de Mensagens", &messages.len().to_string());
    info_item(&mut body, "Fuso Horário", &ctx.offset_label());
    body.push_str("</div></div>");

    body.push_str("<div class=\"messages-section\"><div class=\"messages-container\">");
    for m in &sorted {
        let (class, origin) = match m.source {
            MessageSource::Operator => ("operator", "Operador"),
            MessageSource::External => ("client", "Cliente"),
        };
        let sender = match (&m.source, &m.operator_sender) {
            (MessageSource::Operator, Some(op)) => format!(" ({})", escape(&op.name)),
            _ => String::new(),
        };
        body.push_str(&format!(
            "<div class=\"message {class}\"><div class=\"message-header\">{origin} - {}{sender}</div>\
             <div class=\"message-content\">{}</div></div>",
            escape(&ctx.local_time(m.created_at)),
            escape(&m.content).replace('\n', "<br>")
        ));
    }
    body.push_str("</div></div>");

    export_info(&mut body, ctx);
    body.push_str(&footer(ctx));

    let title = match (phone.is_empty(), name.is_empty()) {
        (false, false) => format!("Relatório de Conversa - {phone} - {name}"),
        (false, true) => format!("Relatório de Conversa - {phone}"),
        _ => format!("Relatório de Conversa - {}", conversation.id),
    };
    page(&title, &body)
}

/// Standalone page listing conversations.
pub fn conversation_list(conversations: &[Conversation], ctx: &ExportContext) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "<div class=\"header\"><h1>Relatório de Conversas</h1><h2>{} conversas</h2></div>",
        conversations.len()
    ));
    for c in conversations {
        body.push_str("<div class=\"conversation-item\"><div class=\"info-grid\">");
        info_item(&mut body, "Cliente", c.participant_name());
        info_item(
            &mut body,
            "Telefone",
            &c.participant_phone().map(format_phone).unwrap_or_else(|| "N/A".into()),
        );
        info_item(&mut body, "Status", c.status_label());
        info_item(&mut body, "Última Atualização", &ctx.local_time(c.updated_at));
        info_item(
            &mut body,
            "Total de Mensagens",
            &c.message_count.unwrap_or(0).to_string(),
        );
        info_item(&mut body, "Operador Responsável", c.operator.as_deref().unwrap_or("N/A"));
        body.push_str("</div>");
        if let Some(last) = &c.last_message {
            body.push_str(&format!("<div class=\"last-message\">{}</div>", escape(last)));
        }
        body.push_str("</div>");
    }
    export_info(&mut body, ctx);
    body.push_str(&footer(ctx));

    page(
        &format!(
            "Relatório de Conversas - {} conversas - Sistema {}",
            conversations.len(),
            ctx.system_name
        ),
        &body,
    )
}

#[cfg(test)]
mod tests {
    use super::super::fixtures as fx;
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn transcript_page_is_escaped_and_ordered() {
        let html = conversation(&fx::conversation(), &fx::messages(), &fx::context());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Relatório de Conversa - +55 (11) 91234-5678 - Maria Souza</title>"));
        assert!(html.contains("&lt;b&gt;Atendimento&lt;/b&gt;"));
        assert!(!html.contains("<b>Atendimento</b>"));
        assert!(html.contains("ajudar?<br>&lt;b&gt;"));
        assert!(html.contains("Operador - 01/03/2025, 09:05:00 (Ana)"));

        let client = html.find("Cliente - 01/03/2025, 09:00:30").unwrap();
        let operator = html.find("Operador - 01/03/2025, 09:05:00").unwrap();
        assert!(client < operator);
    }

    #[test]
    fn transcript_without_messages() {
        let html = conversation(&fx::conversation(), &[], &fx::context());
        assert!(html.contains("<div class=\"info-value\">N/A</div>"));
        assert!(!html.contains("class=\"message "));
    }

    #[test]
    fn list_page_escapes_last_message() {
        let html = conversation_list(&[fx::conversation()], &fx::context());
        assert!(html.contains("1 conversas"));
        assert!(html.contains("Obrigada, &quot;ótimo&quot;"));
        assert!(html.contains("Sistema SETRA"));
    }
}
