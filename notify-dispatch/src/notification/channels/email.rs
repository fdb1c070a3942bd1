//! Email notification channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::NotificationChannel;
use crate::domain::{Address, AddressKind, Message};
use crate::notification::transport::{Envelope, SimulatedTransport, SimulationConfig, Transport};

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Whether the channel is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Prefix put in front of every subject line.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    /// Simulated provider behaviour.
    #[serde(default = "default_email_simulation")]
    pub simulation: SimulationConfig,
}

fn default_true() -> bool {
    true
}

fn default_subject_prefix() -> String {
    "[notify]".to_string()
}

fn default_email_simulation() -> SimulationConfig {
    SimulationConfig::new(0.9, 5000)
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subject_prefix: default_subject_prefix(),
            simulation: default_email_simulation(),
        }
    }
}

/// Email notification channel.
pub struct EmailChannel {
    config: EmailConfig,
    transport: Arc<dyn Transport>,
}

impl EmailChannel {
    /// Create an Email channel on top of an arbitrary transport.
    pub fn new(config: EmailConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create an Email channel backed by the simulated provider.
    pub fn simulated(config: EmailConfig) -> Self {
        let transport = Arc::new(SimulatedTransport::new("email", config.simulation.clone()));
        Self::new(config, transport)
    }

    /// Build the email subject.
    fn build_subject(&self, message: &Message) -> String {
        let title = message.title().unwrap_or("Notification");
        if self.config.subject_prefix.is_empty() {
            title.to_string()
        } else {
            format!("{} {}", self.config.subject_prefix, title)
        }
    }

    /// Build the envelope for one mailbox.
    fn build_envelope(&self, mailbox: &str, message: &Message) -> Envelope {
        Envelope {
            target: mailbox.to_string(),
            subject: Some(self.build_subject(message)),
            body: message.body().to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn channel_type(&self) -> &'static str {
        "email"
    }

    fn address_kind(&self) -> AddressKind {
        AddressKind::Email
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn attempt(&self, address: &Address, message: &Message) -> bool {
        let Address::Email(mailbox) = address else {
            error!(
                address_kind = %address.kind(),
                "Email channel received an address of the wrong kind"
            );
            return false;
        };

        let envelope = self.build_envelope(mailbox, message);
        match self.transport.transmit(&envelope).await {
            Ok(()) => {
                info!(
                    to = %mailbox,
                    transport = self.transport.name(),
                    "Sent email notification"
                );
                true
            }
            Err(e) => {
                debug!(
                    to = %mailbox,
                    transport = self.transport.name(),
                    error = %e,
                    "Email transmission failed"
                );
                false
            }
        }
    }
}
