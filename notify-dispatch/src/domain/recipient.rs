//! Recipients and their typed delivery addresses.

use serde::{Deserialize, Serialize};

/// Kind of delivery address, one per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Email,
    Phone,
    Chat,
}

impl AddressKind {
    /// Fallback order used by the dispatcher: email, then phone, then chat.
    pub const PRIORITY: [AddressKind; 3] = [Self::Email, Self::Phone, Self::Chat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete delivery target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Email(String),
    Phone(String),
    Chat(String),
}

impl Address {
    pub fn kind(&self) -> AddressKind {
        match self {
            Self::Email(_) => AddressKind::Email,
            Self::Phone(_) => AddressKind::Phone,
            Self::Chat(_) => AddressKind::Chat,
        }
    }

    /// The raw target string (mailbox, phone number, chat handle).
    pub fn value(&self) -> &str {
        match self {
            Self::Email(v) | Self::Phone(v) | Self::Chat(v) => v,
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// Someone who can be notified.
///
/// Every present address makes the matching channel eligible. A recipient
/// with no addresses is valid; dispatching to it simply fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_handle: Option<String>,
}

impl Recipient {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            phone_number: None,
            chat_handle: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn with_chat_handle(mut self, chat_handle: impl Into<String>) -> Self {
        self.chat_handle = Some(chat_handle.into());
        self
    }

    /// The address of the given kind, if present and non-empty.
    pub fn address(&self, kind: AddressKind) -> Option<Address> {
        let raw = match kind {
            AddressKind::Email => self.email.as_deref(),
            AddressKind::Phone => self.phone_number.as_deref(),
            AddressKind::Chat => self.chat_handle.as_deref(),
        }?;
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match kind {
            AddressKind::Email => Address::Email(raw.to_string()),
            AddressKind::Phone => Address::Phone(raw.to_string()),
            AddressKind::Chat => Address::Chat(raw.to_string()),
        })
    }

    /// All present addresses in dispatch priority order.
    pub fn addresses(&self) -> Vec<Address> {
        AddressKind::PRIORITY
            .iter()
            .filter_map(|kind| self.address(*kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_follow_priority_order() {
        let recipient = Recipient::new("u1", "Ivan")
            .with_chat_handle("987654321")
            .with_phone("+79001234567")
            .with_email("ivan@gmail.com");

        let kinds: Vec<AddressKind> = recipient.addresses().iter().map(Address::kind).collect();
        assert_eq!(
            kinds,
            vec![AddressKind::Email, AddressKind::Phone, AddressKind::Chat]
        );
    }

    #[test]
    fn test_missing_and_blank_addresses_are_skipped() {
        let recipient = Recipient::new("u2", "Divan")
            .with_email("  ")
            .with_chat_handle("987654321");

        assert_eq!(
            recipient.addresses(),
            vec![Address::Chat("987654321".to_string())]
        );
        assert!(recipient.address(AddressKind::Phone).is_none());
    }

    #[test]
    fn test_recipient_without_addresses() {
        let recipient = Recipient::new("u3", "Nobody");
        assert!(recipient.addresses().is_empty());
    }

    #[test]
    fn test_address_display() {
        let address = Address::Phone("+100".to_string());
        assert_eq!(address.to_string(), "phone:+100");
        assert_eq!(address.value(), "+100");
    }

    #[test]
    fn test_recipient_deserialize() {
        let json = r#"{"id":"u1","name":"Ivan","phone_number":"+7900"}"#;
        let recipient: Recipient = serde_json::from_str(json).unwrap();
        assert_eq!(recipient.phone_number.as_deref(), Some("+7900"));
        assert!(recipient.email.is_none());
    }
}
