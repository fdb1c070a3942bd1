//! SMS notification channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{NotificationChannel, truncate_text};
use crate::domain::{Address, AddressKind, Message};
use crate::notification::transport::{Envelope, SimulatedTransport, SimulationConfig, Transport};

/// Characters in a single SMS segment (GSM-7).
const SMS_SEGMENT_LENGTH: usize = 160;

/// SMS channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Whether the channel is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum number of concatenated segments per message.
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
    /// Simulated provider behaviour.
    #[serde(default = "default_sms_simulation")]
    pub simulation: SimulationConfig,
}

fn default_true() -> bool {
    true
}

fn default_max_segments() -> usize {
    5
}

fn default_sms_simulation() -> SimulationConfig {
    SimulationConfig::new(0.8, 3000)
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_segments: default_max_segments(),
            simulation: default_sms_simulation(),
        }
    }
}

/// SMS notification channel.
pub struct SmsChannel {
    config: SmsConfig,
    transport: Arc<dyn Transport>,
}

impl SmsChannel {
    /// Create an SMS channel on top of an arbitrary transport.
    pub fn new(config: SmsConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create an SMS channel backed by the simulated provider.
    pub fn simulated(config: SmsConfig) -> Self {
        let transport = Arc::new(SimulatedTransport::new("sms", config.simulation.clone()));
        Self::new(config, transport)
    }

    /// Build the SMS text: a single line, cut to the segment budget.
    fn build_text(&self, message: &Message) -> String {
        let text = match message.title() {
            Some(title) => format!("{}: {}", title, message.body()),
            None => message.body().to_string(),
        };
        let limit = SMS_SEGMENT_LENGTH * self.config.max_segments.max(1);
        truncate_text(&text, limit, "...")
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn channel_type(&self) -> &'static str {
        "sms"
    }

    fn address_kind(&self) -> AddressKind {
        AddressKind::Phone
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn attempt(&self, address: &Address, message: &Message) -> bool {
        let Address::Phone(phone_number) = address else {
            error!(
                address_kind = %address.kind(),
                "SMS channel received an address of the wrong kind"
            );
            return false;
        };

        let envelope = Envelope {
            target: phone_number.clone(),
            subject: None,
            body: self.build_text(message),
        };
        match self.transport.transmit(&envelope).await {
            Ok(()) => {
                info!(
                    to = %phone_number,
                    transport = self.transport.name(),
                    "Sent sms notification"
                );
                true
            }
            Err(e) => {
                debug!(
                    to = %phone_number,
                    transport = self.transport.name(),
                    error = %e,
                    "SMS transmission failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_config_default() {
        let config = SmsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_segments, 5);
        assert_eq!(config.simulation.fail_rate, 0.8);
    }

    #[test]
    fn test_build_text_respects_segment_budget() {
        let channel = SmsChannel::simulated(SmsConfig {
            max_segments: 1,
            ..Default::default()
        });
        let text = channel.build_text(&Message::new("x".repeat(400)));
        assert_eq!(text.chars().count(), SMS_SEGMENT_LENGTH);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_build_text_includes_title() {
        let channel = SmsChannel::simulated(SmsConfig::default());
        let text = channel.build_text(&Message::new("server down").with_title("Alert"));
        assert_eq!(text, "Alert: server down");
    }

    #[tokio::test]
    async fn test_wrong_address_kind_is_a_failed_attempt() {
        let channel = SmsChannel::simulated(SmsConfig {
            simulation: SimulationConfig::new(0.0, 0),
            ..Default::default()
        });
        let address = Address::Email("ivan@gmail.com".to_string());
        assert!(!channel.attempt(&address, &Message::new("hi")).await);
        assert!(
            channel
                .attempt(&Address::Phone("+100".to_string()), &Message::new("hi"))
                .await
        );
    }
}
