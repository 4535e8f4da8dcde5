//! Shared protocol types used by the quote manager and the mock posts API.
//!
//! A `Command` is either a fetch request (`FETCH_POSTS`) with a limit or a
//! create request (`CREATE_POST`) carrying a `PostDraft`. Each request is sent
//! as a single JSON line over a fresh TCP connection and answered with a single
//! JSON `Reply` line.
use serde::{Deserialize, Serialize};

use crate::error::QuoteError;
use crate::model::{Post, PostDraft};

/// Header value for fetch requests.
pub const FETCH_POSTS: &str = "FETCH_POSTS";
/// Header value for create requests.
pub const CREATE_POST: &str = "CREATE_POST";
/// Reply status for handled requests.
pub const STATUS_OK: &str = "OK";
/// Reply status for rejected requests.
pub const STATUS_ERROR: &str = "ERROR";

/// Request payload sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command kind. Either `FETCH_POSTS` or `CREATE_POST`.
    pub header: String,
    /// Maximum number of posts to return (fetch only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Post to create (create only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<PostDraft>,
}

impl Command {
    /// Creates a new fetch (`FETCH_POSTS`) command.
    pub fn new_fetch(limit: usize) -> Self {
        Command {
            header: String::from(FETCH_POSTS),
            limit: Some(limit),
            post: None,
        }
    }

    /// Creates a new create (`CREATE_POST`) command.
    pub fn new_create(post: PostDraft) -> Self {
        Command {
            header: String::from(CREATE_POST),
            limit: None,
            post: Some(post),
        }
    }

    /// Encode the command as one newline-terminated JSON line.
    pub fn to_json_line(&self) -> Result<Vec<u8>, QuoteError> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Response payload sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// `OK` or `ERROR`.
    pub status: String,
    /// Posts returned by a fetch.
    #[serde(default)]
    pub posts: Vec<Post>,
    /// Post stored by a create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Post>,
    /// Human-readable reason for an `ERROR` reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Reply {
    /// Successful fetch reply.
    pub fn ok_posts(posts: Vec<Post>) -> Self {
        Reply {
            status: String::from(STATUS_OK),
            posts,
            created: None,
            message: None,
        }
    }

    /// Successful create reply.
    pub fn ok_created(post: Post) -> Self {
        Reply {
            status: String::from(STATUS_OK),
            posts: Vec::new(),
            created: Some(post),
            message: None,
        }
    }

    /// Rejection with a reason.
    pub fn error(message: impl Into<String>) -> Self {
        Reply {
            status: String::from(STATUS_ERROR),
            posts: Vec::new(),
            created: None,
            message: Some(message.into()),
        }
    }

    /// Encode the reply as one newline-terminated JSON line.
    pub fn to_json_line(&self) -> Result<Vec<u8>, QuoteError> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Turns an `ERROR` reply into `QuoteError::Network`.
    pub fn into_result(self) -> Result<Self, QuoteError> {
        if self.status == STATUS_OK {
            Ok(self)
        } else {
            let reason = self
                .message
                .unwrap_or_else(|| "Network response was not ok".to_string());
            Err(QuoteError::Network(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_command_is_a_single_json_line() {
        let line = Command::new_fetch(5).to_json_line().unwrap();
        assert_eq!(line.last(), Some(&b'\n'));
        let text = String::from_utf8(line).unwrap();
        assert_eq!(text.trim_end(), r#"{"header":"FETCH_POSTS","limit":5}"#);
    }

    #[test]
    fn error_reply_maps_to_network_error() {
        let err = Reply::error("boom").into_result().unwrap_err();
        assert!(matches!(err, QuoteError::Network(ref m) if m == "boom"));
    }

    #[test]
    fn reply_without_optional_fields_parses() {
        let reply: Reply = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        assert!(reply.posts.is_empty());
        assert!(reply.into_result().is_ok());
    }
}
