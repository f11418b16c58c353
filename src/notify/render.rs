use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::text;
use crate::domain::{Summary, SummaryKind, UserId};

/// Markup dialect of rendered summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Html,
    /// Telegram-style MarkdownV2.
    Markdown,
}

const MARKDOWN_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

impl RenderMode {
    pub fn escape(&self, raw: &str) -> String {
        match self {
            RenderMode::Html => {
                let mut out = String::with_capacity(raw.len());
                for c in raw.chars() {
                    match c {
                        '&' => out.push_str("&amp;"),
                        '<' => out.push_str("&lt;"),
                        '>' => out.push_str("&gt;"),
                        '"' => out.push_str("&quot;"),
                        _ => out.push(c),
                    }
                }
                out
            }
            RenderMode::Markdown => {
                let mut out = String::with_capacity(raw.len());
                for c in raw.chars() {
                    if MARKDOWN_SPECIAL.contains(&c) {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out
            }
        }
    }

    fn bold(&self, raw: &str) -> String {
        match self {
            RenderMode::Html => format!("<b>{}</b>", self.escape(raw)),
            RenderMode::Markdown => format!("*{}*", self.escape(raw)),
        }
    }

    fn mention(&self, user_id: UserId, name: &str) -> String {
        match self {
            RenderMode::Html => format!("<a href=\"tg://user?id={}\">{}</a>", user_id, self.escape(name)),
            RenderMode::Markdown => format!("[{}](tg://user?id={})", self.escape(name), user_id),
        }
    }

    /// Renders a summary as seen from `now` in `tz`.
    pub fn summary(&self, summary: &Summary, tz: Tz, now: DateTime<Utc>) -> String {
        let order = &summary.order;
        let mut out = String::new();

        let title = match summary.kind {
            SummaryKind::Reminder => format!("REMINDER\n{}", order.title),
            _ => order.title.clone(),
        };
        out.push_str(&self.bold(&title));
        out.push('\n');

        let status = match summary.kind {
            SummaryKind::Closed => text::CLOSED.to_string(),
            kind => {
                let expiry = order.expiry_at.with_timezone(&tz);
                let mut deadline = expiry.format("%H:%M").to_string();
                if expiry.date_naive() > now.with_timezone(&tz).date_naive() {
                    deadline.push_str(" tomorrow");
                }
                if kind == SummaryKind::Reminder {
                    deadline.push_str(" in 5 minutes");
                }
                deadline
            }
        };
        out.push_str(&self.escape(&status));
        out.push_str("\n\n");

        if summary.is_empty() {
            out.push_str(&self.escape(text::NO_ITEMS_YET));
            out.push('\n');
        } else {
            for line in &summary.attribution {
                out.push_str(&self.mention(line.user_id, &line.user_name));
                out.push(' ');
                out.push_str(&self.escape(&format!("{} x {}", line.quantity, line.name)));
                out.push('\n');
            }

            out.push('\n');
            out.push_str(&self.bold(text::CONSOLIDATED));
            out.push('\n');
            for line in &summary.consolidated {
                out.push_str(&self.escape(&format!("{} x {}", line.quantity, line.name)));
                out.push('\n');
            }
        }

        if summary.kind != SummaryKind::Closed {
            out.push('\n');
            for hint in [text::USAGE_ADD, text::USAGE_REMOVE, text::USAGE_CLOSE] {
                out.push_str(&self.escape(hint));
                out.push('\n');
            }
        }

        out
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(RenderMode::Html),
            "markdown" | "md" => Ok(RenderMode::Markdown),
            other => Err(format!("unknown render mode '{}'", other)),
        }
    }
}
