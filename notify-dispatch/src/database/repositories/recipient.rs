//! Recipient repository.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::domain::Recipient;
use crate::{Error, Result};

/// Recipient repository trait.
#[async_trait]
pub trait RecipientRepository: Send + Sync {
    async fn get_recipient(&self, id: &str) -> Result<Recipient>;
    async fn recipient_exists(&self, id: &str) -> Result<bool>;
}

/// In-memory implementation of RecipientRepository.
#[derive(Debug, Default)]
pub struct InMemoryRecipientRepository {
    recipients: DashMap<String, Recipient>,
}

impl InMemoryRecipientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository seeded with two demo recipients.
    pub fn with_demo_data() -> Self {
        Self::from_recipients(vec![
            Recipient::new("user_1", "Ivan")
                .with_phone("+79001234567")
                .with_email("ivan@gmail.com"),
            Recipient::new("user_2", "Divan").with_chat_handle("987654321"),
        ])
    }

    pub fn from_recipients(recipients: impl IntoIterator<Item = Recipient>) -> Self {
        let repo = Self::new();
        for recipient in recipients {
            repo.recipients.insert(recipient.id.clone(), recipient);
        }
        repo
    }

    /// Load recipients from a JSON file containing an array of recipients.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let recipients: Vec<Recipient> = serde_json::from_str(&raw)?;

        if let Some(blank) = recipients.iter().find(|r| r.id.trim().is_empty()) {
            return Err(Error::validation(format!(
                "recipient '{}' in {} has an empty id",
                blank.name,
                path.display()
            )));
        }

        info!(
            path = %path.display(),
            count = recipients.len(),
            "Loaded recipients"
        );
        Ok(Self::from_recipients(recipients))
    }
}

#[async_trait]
impl RecipientRepository for InMemoryRecipientRepository {
    async fn get_recipient(&self, id: &str) -> Result<Recipient> {
        self.recipients
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| Error::not_found("Recipient", id))
    }

    async fn recipient_exists(&self, id: &str) -> Result<bool> {
        Ok(self.recipients.contains_key(id))
    }
}
