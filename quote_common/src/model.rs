//! Quote records and the upstream post shape they are derived from.
//!
//! A `Quote` is the unit of data held by the quote manager: a text, a category,
//! a unique id and a last-modification timestamp in UTC epoch milliseconds.
//! Quotes that came from the remote API carry `origin_flag`, serialized as
//! `serverVersion` so exported documents stay compatible with older exports.
//!
//! The remote API speaks in `Post`s; `Post::to_quote` performs the
//! transformation (first body line becomes the text, first title word becomes
//! the category).
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::QuoteError;

/// Current UTC time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A single quote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Unique within a store.
    pub id: i64,
    /// Quote text.
    pub text: String,
    /// Free-form category label.
    pub category: String,
    /// Last modification time, UTC epoch milliseconds.
    pub timestamp: i64,
    /// Set on records that were sourced from the remote API.
    #[serde(
        rename = "serverVersion",
        alias = "originFlag",
        default,
        skip_serializing_if = "is_false"
    )]
    pub origin_flag: bool,
}

impl Quote {
    /// Short form of the text used in notifications.
    ///
    /// Returns the first `max_chars` characters followed by `...` when the text
    /// is longer than that.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// A validated `{text, category}` pair that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuote {
    text: String,
    category: String,
}

impl NewQuote {
    /// Trims both fields and rejects empty values.
    pub fn new(text: &str, category: &str) -> Result<Self, QuoteError> {
        let text = text.trim();
        let category = category.trim();
        if text.is_empty() || category.is_empty() {
            return Err(QuoteError::Validation(
                "Please fill in both the quote text and category".to_string(),
            ));
        }
        Ok(NewQuote {
            text: text.to_string(),
            category: category.to_string(),
        })
    }

    /// Trimmed quote text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trimmed category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Turns the draft into a stored record.
    pub fn into_quote(self, id: i64, timestamp: i64) -> Quote {
        Quote {
            id,
            text: self.text,
            category: self.category,
            timestamp,
            origin_flag: false,
        }
    }
}

/// Record shape served by the remote posts API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post id, reused as the quote id.
    pub id: i64,
    /// Author id.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Title; its first word becomes the category.
    pub title: String,
    /// Body; its first line becomes the quote text.
    pub body: String,
    /// Last revision time on the server, if the server tracks it.
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Post {
    /// Transforms the post into a remote-sourced quote.
    ///
    /// Posts without a revision time are stamped with `fetched_at`.
    pub fn to_quote(&self, fetched_at: i64) -> Quote {
        let text = self.body.split('\n').next().unwrap_or_default();
        let category = self.title.split(' ').next().unwrap_or_default();
        Quote {
            id: self.id,
            text: text.to_string(),
            category: category.to_string(),
            timestamp: self.updated_at.unwrap_or(fetched_at),
            origin_flag: true,
        }
    }
}

/// Payload for creating a post on the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    /// Category of the quote.
    pub title: String,
    /// Text of the quote.
    pub body: String,
    /// Author id; the quote manager always posts as user 1.
    #[serde(rename = "userId")]
    pub user_id: i64,
}

impl From<&NewQuote> for PostDraft {
    fn from(quote: &NewQuote) -> Self {
        PostDraft {
            title: quote.category.clone(),
            body: quote.text.clone(),
            user_id: 1,
        }
    }
}
