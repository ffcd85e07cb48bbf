//! Conversation export
//!
//! Renders a finalized conversation to a downloadable artifact. Export is
//! a pure formatting concern over the conversation model: nothing flows
//! back into the session or memory pipeline.

use crate::error::{ConfideError, Result};
use crate::session::{Conversation, Turn, TurnRole};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Structured JSON with human-readable timestamps
    Json,
    /// Plain text transcript with a header block
    Text,
    /// Self-contained printable HTML document
    Html,
}

impl ExportFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
            Self::Html => write!(f, "html"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ConfideError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            other => Err(ConfideError::Config(format!(
                "Unknown export format: {} (expected json, text, or html)",
                other
            ))),
        }
    }
}

/// Render a conversation in the requested format
///
/// # Arguments
///
/// * `conversation` - The conversation to render
/// * `format` - Output format
///
/// # Examples
///
/// ```
/// use confide::export::{render, ExportFormat};
/// use confide::session::Conversation;
///
/// let mut conv = Conversation::new("What's on your mind?");
/// conv.push_user("Just checking in");
/// let text = render(&conv, ExportFormat::Text).unwrap();
/// assert!(text.contains("You:"));
/// ```
pub fn render(conversation: &Conversation, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => render_json(conversation),
        ExportFormat::Text => Ok(render_text(conversation)),
        ExportFormat::Html => Ok(render_html(conversation)),
    }
}

/// Render a conversation and write it next to the given directory
///
/// The filename derives from the sanitized conversation title.
///
/// # Arguments
///
/// * `conversation` - The conversation to export
/// * `format` - Output format
/// * `output` - Explicit output path, or a directory to place the derived
///   filename in
///
/// # Returns
///
/// Returns the path written
pub fn export_to_file(
    conversation: &Conversation,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let rendered = render(conversation, format)?;

    let path = match output {
        Some(path) if path.extension().is_some() => path.to_path_buf(),
        Some(dir) => dir.join(default_filename(conversation, format)),
        None => PathBuf::from(default_filename(conversation, format)),
    };

    std::fs::write(&path, rendered)
        .map_err(|e| ConfideError::Storage(format!("Failed to write export: {}", e)))?;
    tracing::info!("Exported conversation {} to {}", conversation.id, path.display());
    Ok(path)
}

fn default_filename(conversation: &Conversation, format: ExportFormat) -> String {
    format!(
        "{}.{}",
        sanitize_filename(&conversation.title),
        format.extension()
    )
}

fn render_json(conversation: &Conversation) -> Result<String> {
    let export = serde_json::json!({
        "title": conversation.title,
        "createdAt": format_timestamp(&conversation.created_at),
        "updatedAt": format_timestamp(&conversation.updated_at),
        "messages": conversation
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": role_name(m),
                    "content": m.content,
                    "timestamp": format_timestamp(&m.timestamp),
                })
            })
            .collect::<Vec<_>>(),
    });

    Ok(serde_json::to_string_pretty(&export)?)
}

fn render_text(conversation: &Conversation) -> String {
    let mut out = format!(
        "Conversation: {}\nCreated: {}\nLast Updated: {}\n\n{}\n\n",
        conversation.title,
        format_timestamp(&conversation.created_at),
        format_timestamp(&conversation.updated_at),
        "=".repeat(50)
    );

    let body = conversation
        .messages
        .iter()
        .map(format_turn_for_text)
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&body);
    out
}

fn render_html(conversation: &Conversation) -> String {
    let messages_html = conversation
        .messages
        .iter()
        .map(|m| {
            let bg_color = match m.role {
                TurnRole::User => "#e3f2fd",
                TurnRole::Assistant => "#f5f5f5",
            };
            format!(
                "    <div style=\"margin-bottom: 16px; padding: 12px; background: {}; border-radius: 8px;\">\n\
                 \x20     <div style=\"font-size: 12px; color: #666; margin-bottom: 4px;\">{} - {}</div>\n\
                 \x20     <div style=\"white-space: pre-wrap;\">{}</div>\n\
                 \x20   </div>",
                bg_color,
                role_name(m),
                format_timestamp(&m.timestamp),
                escape_html(&m.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         \x20 <meta charset=\"utf-8\">\n\
         \x20 <title>{title}</title>\n\
         \x20 <style>\n\
         \x20   body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 0 auto; padding: 40px 20px; color: #333; }}\n\
         \x20   h1 {{ font-size: 24px; margin-bottom: 8px; }}\n\
         \x20   .meta {{ font-size: 14px; color: #666; margin-bottom: 24px; padding-bottom: 16px; border-bottom: 1px solid #ddd; }}\n\
         \x20   @media print {{ body {{ padding: 20px; }} }}\n\
         \x20 </style>\n\
         </head>\n\
         <body>\n\
         \x20 <h1>{title}</h1>\n\
         \x20 <div class=\"meta\">\n\
         \x20   Created: {created}<br>\n\
         \x20   Last Updated: {updated}\n\
         \x20 </div>\n\
         {messages}\n\
         </body>\n\
         </html>\n",
        title = escape_html(&conversation.title),
        created = format_timestamp(&conversation.created_at),
        updated = format_timestamp(&conversation.updated_at),
        messages = messages_html,
    )
}

fn format_turn_for_text(turn: &Turn) -> String {
    format!(
        "[{}] {}:\n{}\n",
        format_timestamp(&turn.timestamp),
        role_name(turn),
        turn.content
    )
}

fn role_name(turn: &Turn) -> &'static str {
    match turn.role {
        TurnRole::User => "You",
        TurnRole::Assistant => "Assistant",
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else if c.is_whitespace() {
                '_'
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "conversation".to_string()
    } else {
        cleaned.chars().take(60).collect()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
