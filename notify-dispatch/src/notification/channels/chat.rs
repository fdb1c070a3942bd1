//! Chat (instant messenger) notification channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{NotificationChannel, truncate_text};
use crate::domain::{Address, AddressKind, Message};
use crate::notification::transport::{Envelope, SimulatedTransport, SimulationConfig, Transport};

/// Chat message text limit (UTF-8 characters).
const CHAT_MESSAGE_LIMIT: usize = 4096;

/// Chat channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Whether the channel is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Parse mode for message formatting (HTML or Markdown).
    #[serde(default = "default_parse_mode")]
    pub parse_mode: String,
    /// Simulated provider behaviour.
    #[serde(default = "default_chat_simulation")]
    pub simulation: SimulationConfig,
}

fn default_true() -> bool {
    true
}

fn default_parse_mode() -> String {
    "HTML".to_string()
}

fn default_chat_simulation() -> SimulationConfig {
    SimulationConfig::new(0.9, 2000)
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            parse_mode: default_parse_mode(),
            simulation: default_chat_simulation(),
        }
    }
}

/// Chat notification channel.
pub struct ChatChannel {
    config: ChatConfig,
    transport: Arc<dyn Transport>,
}

impl ChatChannel {
    /// Create a Chat channel on top of an arbitrary transport.
    pub fn new(config: ChatConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create a Chat channel backed by the simulated provider.
    pub fn simulated(config: ChatConfig) -> Self {
        let transport = Arc::new(SimulatedTransport::new("chat", config.simulation.clone()));
        Self::new(config, transport)
    }

    /// Build the message text.
    fn build_message(&self, message: &Message) -> String {
        let html = self.config.parse_mode.eq_ignore_ascii_case("HTML");
        let body = if html {
            escape_html(message.body())
        } else {
            message.body().to_string()
        };

        let text = match message.title() {
            Some(title) if html => format!("<b>{}</b>\n\n{}", escape_html(title), body),
            Some(title) => format!("*{title}*\n\n{body}"),
            None => body,
        };

        truncate_text(&text, CHAT_MESSAGE_LIMIT, "\n\n[truncated]")
    }
}

#[async_trait]
impl NotificationChannel for ChatChannel {
    fn channel_type(&self) -> &'static str {
        "chat"
    }

    fn address_kind(&self) -> AddressKind {
        AddressKind::Chat
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn attempt(&self, address: &Address, message: &Message) -> bool {
        let Address::Chat(handle) = address else {
            error!(
                address_kind = %address.kind(),
                "Chat channel received an address of the wrong kind"
            );
            return false;
        };

        let envelope = Envelope {
            target: handle.clone(),
            subject: None,
            body: self.build_message(message),
        };
        match self.transport.transmit(&envelope).await {
            Ok(()) => {
                info!(
                    to = %handle,
                    transport = self.transport.name(),
                    "Sent chat notification"
                );
                true
            }
            Err(e) => {
                debug!(
                    to = %handle,
                    transport = self.transport.name(),
                    error = %e,
                    "Chat transmission failed"
                );
                false
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_config_default() {
        let config = ChatConfig::default();
        assert!(config.enabled);
        assert_eq!(config.parse_mode, "HTML");
        assert_eq!(config.simulation.max_delay_ms, 2000);
    }

    #[test]
    fn test_build_message_html() {
        let channel = ChatChannel::simulated(ChatConfig::default());
        let msg = channel.build_message(&Message::new("a < b").with_title("Build"));
        assert_eq!(msg, "<b>Build</b>\n\na &lt; b");
    }

    #[test]
    fn test_build_message_markdown() {
        let channel = ChatChannel::simulated(ChatConfig {
            parse_mode: "Markdown".to_string(),
            ..Default::default()
        });
        let msg = channel.build_message(&Message::new("ok").with_title("Build"));
        assert_eq!(msg, "*Build*\n\nok");
    }

    #[test]
    fn test_long_message_truncated() {
        let channel = ChatChannel::simulated(ChatConfig::default());
        let msg = channel.build_message(&Message::new("a".repeat(5000)));
        assert!(msg.chars().count() <= CHAT_MESSAGE_LIMIT);
        assert!(msg.ends_with("[truncated]"));
    }

    #[tokio::test]
    async fn test_wrong_address_kind_is_a_failed_attempt() {
        let channel = ChatChannel::simulated(ChatConfig {
            simulation: SimulationConfig::new(0.0, 0),
            ..Default::default()
        });
        let address = Address::Email("ivan@gmail.com".to_string());
        assert!(!channel.attempt(&address, &Message::new("hi")).await);
    }
}
