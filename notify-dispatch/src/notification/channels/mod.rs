//! Notification channels.
//!
//! This module provides one channel per address kind:
//! - Email
//! - SMS
//! - Chat (instant messenger handle)
//!
//! Every channel implements [`NotificationChannel`]; [`ChannelSet`] maps an
//! address kind to the channel that serves it.

mod chat;
mod email;
mod sms;

pub use chat::{ChatChannel, ChatConfig};
pub use email::{EmailChannel, EmailConfig};
pub use sms::{SmsChannel, SmsConfig};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Address, AddressKind, Message};
use crate::{Error, Result};

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// The only address kind this channel can deliver to.
    fn address_kind(&self) -> AddressKind;

    /// Check if the channel is enabled.
    fn is_enabled(&self) -> bool;

    /// Whether `address` has the kind this channel expects.
    fn accepts(&self, address: &Address) -> bool {
        address.kind() == self.address_kind()
    }

    /// Make one delivery attempt.
    ///
    /// Returns `false` for any failure, including an address of the wrong
    /// kind. Never panics.
    async fn attempt(&self, address: &Address, message: &Message) -> bool;
}

/// Configuration of all channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Channel factory: one channel per address kind.
#[derive(Clone)]
pub struct ChannelSet {
    email: Arc<dyn NotificationChannel>,
    sms: Arc<dyn NotificationChannel>,
    chat: Arc<dyn NotificationChannel>,
}

impl ChannelSet {
    /// Assemble a channel set, checking each channel serves its slot.
    pub fn new(
        email: Arc<dyn NotificationChannel>,
        sms: Arc<dyn NotificationChannel>,
        chat: Arc<dyn NotificationChannel>,
    ) -> Result<Self> {
        for (slot, channel) in [
            (AddressKind::Email, &email),
            (AddressKind::Phone, &sms),
            (AddressKind::Chat, &chat),
        ] {
            if channel.address_kind() != slot {
                return Err(Error::config(format!(
                    "channel '{}' serves {} addresses but was registered for {}",
                    channel.channel_type(),
                    channel.address_kind(),
                    slot
                )));
            }
        }
        Ok(Self { email, sms, chat })
    }

    /// Build channels backed by simulated transports.
    pub fn from_config(config: &ChannelsConfig) -> Self {
        Self {
            email: Arc::new(EmailChannel::simulated(config.email.clone())),
            sms: Arc::new(SmsChannel::simulated(config.sms.clone())),
            chat: Arc::new(ChatChannel::simulated(config.chat.clone())),
        }
    }

    /// The channel serving addresses of `kind`.
    pub fn for_kind(&self, kind: AddressKind) -> &Arc<dyn NotificationChannel> {
        match kind {
            AddressKind::Email => &self.email,
            AddressKind::Phone => &self.sms,
            AddressKind::Chat => &self.chat,
        }
    }

    /// The channel serving `address`.
    pub fn for_address(&self, address: &Address) -> &Arc<dyn NotificationChannel> {
        self.for_kind(address.kind())
    }
}

/// Truncate text to at most `limit` characters, appending `suffix` when cut.
pub(crate) fn truncate_text(text: &str, limit: usize, suffix: &str) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let budget = limit.saturating_sub(suffix.chars().count());
    let truncated: String = text.chars().take(budget).collect();
    format!("{truncated}{suffix}")
}
