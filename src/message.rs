// message.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who authored a message in the chat timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    /// Text typed by the person using the app.
    User,

    /// Text produced by the backend answer service (or a fallback).
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let role_str = match self {
            Role::User => "You",
            Role::Bot => "FloatChat",
        };
        write!(f, "{}", role_str)
    }
}

/// A single chat entry. Messages are never edited once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique key for rendering; carries no ordering meaning.
    pub id: String,
    pub role: Role,
    /// Raw text. Bot content may contain markup from the backend.
    pub content: String,
    /// Display-only timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content)
    }

    /// Content as it should appear in a terminal.
    ///
    /// User text is shown as typed. Bot text is treated as trusted markup and
    /// flattened to plain text, see [`markup_to_text`].
    pub fn display_text(&self) -> String {
        match self.role {
            Role::User => self.content.clone(),
            Role::Bot => markup_to_text(&self.content),
        }
    }
}

/// Flattens HTML-ish markup into terminal text.
///
/// Line-breaking tags become newlines, every other tag is dropped and the
/// handful of entities the backend actually emits are decoded. Anything that
/// does not look like a tag is kept verbatim.
pub fn markup_to_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        match after.find('>') {
            Some(end) if looks_like_tag(&after[1..end]) => {
                let tag = after[1..end].trim().to_ascii_lowercase();
                if is_line_break(&tag) {
                    out.push('\n');
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('<');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);

    decode_entities(&out)
}

fn looks_like_tag(inner: &str) -> bool {
    let inner = inner.trim_start_matches('/');
    inner
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
}

fn is_line_break(tag: &str) -> bool {
    let name: String = tag
        .trim_end_matches('/')
        .chars()
        .take_while(|c| *c == '/' || c.is_ascii_alphanumeric())
        .collect();
    matches!(
        name.as_str(),
        "br" | "/p" | "/li" | "/div" | "/h1" | "/h2" | "/h3" | "/h4" | "/tr"
    )
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
