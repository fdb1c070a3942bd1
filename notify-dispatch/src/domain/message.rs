//! Notification message value object.

use serde::{Deserialize, Serialize};

/// A message to deliver: optional title plus a required body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Optional headline (email subject, bold chat line).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Message body.
    pub message: String,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            title: None,
            message: body.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The title, if present and not blank.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn body(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.title() {
            Some(title) => write!(f, "{}: {}", title, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
