//! Notification service implementation.
//!
//! The NotificationService is responsible for:
//! - Resolving the recipient of a dispatch request
//! - Ordering the recipient's addresses by channel priority
//! - Driving each channel through the retry policy, falling back to the next
//!   channel only after the previous one is exhausted
//! - Writing the terminal status of the owning job

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::channels::{ChannelSet, ChannelsConfig};
use super::retry::deliver_with_retry;
use super::worker::DispatchWorkerConfig;
use crate::database::repositories::{JobRepository, RecipientRepository};
use crate::domain::{JobStatus, Message, RetryPolicy};
use crate::Error;

/// Configuration for the notification service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationServiceConfig {
    /// Retry policy applied to every channel.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Channel configurations.
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// Background dispatch worker settings.
    #[serde(default)]
    pub worker: DispatchWorkerConfig,
}

/// Snapshot of dispatch counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    /// Dispatches started.
    pub dispatched: u64,
    /// Dispatches that ended SUCCESS.
    pub succeeded: u64,
    /// Dispatches that ended FAILED (including missing recipients).
    pub failed: u64,
    /// Dispatches whose recipient could not be resolved.
    pub recipient_missing: u64,
    /// Channel attempts made across all dispatches.
    pub attempts: u64,
}

#[derive(Default)]
struct DispatchCounters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    recipient_missing: AtomicU64,
    attempts: AtomicU64,
}

/// The notification service.
pub struct NotificationService {
    recipients: Arc<dyn RecipientRepository>,
    jobs: Arc<dyn JobRepository>,
    channels: ChannelSet,
    retry_policy: RetryPolicy,
    counters: DispatchCounters,
}

impl NotificationService {
    /// Create a notification service from explicit parts.
    pub fn new(
        recipients: Arc<dyn RecipientRepository>,
        jobs: Arc<dyn JobRepository>,
        channels: ChannelSet,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            recipients,
            jobs,
            channels,
            retry_policy,
            counters: DispatchCounters::default(),
        }
    }

    /// Create a notification service with simulated channels from configuration.
    pub fn with_config(
        config: &NotificationServiceConfig,
        recipients: Arc<dyn RecipientRepository>,
        jobs: Arc<dyn JobRepository>,
    ) -> Self {
        info!(
            max_retries = config.retry.max_retries,
            email = config.channels.email.enabled,
            sms = config.channels.sms.enabled,
            chat = config.channels.chat.enabled,
            "Notification service initialized"
        );
        Self::new(
            recipients,
            jobs,
            ChannelSet::from_config(&config.channels),
            config.retry.clone(),
        )
    }

    /// Notify a recipient, trying its channels in priority order.
    ///
    /// Returns `true` once one channel delivers; later channels are not
    /// tried. When `job_id` is given, its terminal status is written exactly
    /// once before returning.
    pub async fn dispatch(&self, recipient_id: &str, message: &Message, job_id: Option<&str>) -> bool {
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);

        let recipient = match self.recipients.get_recipient(recipient_id).await {
            Ok(recipient) => recipient,
            Err(Error::NotFound { .. }) => {
                warn!(
                    recipient_id = %recipient_id,
                    job_id = job_id.unwrap_or("-"),
                    "Recipient disappeared before dispatch"
                );
                self.counters.recipient_missing.fetch_add(1, Ordering::Relaxed);
                self.finish(job_id, JobStatus::Failed).await;
                return false;
            }
            Err(e) => {
                error!(recipient_id = %recipient_id, error = %e, "Failed to load recipient");
                self.counters.recipient_missing.fetch_add(1, Ordering::Relaxed);
                self.finish(job_id, JobStatus::Failed).await;
                return false;
            }
        };

        for address in recipient.addresses() {
            let channel = self.channels.for_address(&address);
            if !channel.is_enabled() {
                debug!(
                    channel = channel.channel_type(),
                    recipient_id = %recipient_id,
                    "Channel disabled, skipping"
                );
                continue;
            }

            let outcome =
                deliver_with_retry(channel.as_ref(), &address, message, &self.retry_policy).await;
            self.counters
                .attempts
                .fetch_add(u64::from(outcome.attempts), Ordering::Relaxed);

            if outcome.delivered {
                info!(
                    recipient_id = %recipient_id,
                    job_id = job_id.unwrap_or("-"),
                    channel = channel.channel_type(),
                    attempts = outcome.attempts,
                    "Notification delivered"
                );
                self.finish(job_id, JobStatus::Success).await;
                return true;
            }

            warn!(
                recipient_id = %recipient_id,
                channel = channel.channel_type(),
                "Channel exhausted, falling back"
            );
        }

        error!(
            recipient_id = %recipient_id,
            job_id = job_id.unwrap_or("-"),
            "Failed to send notifications to recipient"
        );
        self.finish(job_id, JobStatus::Failed).await;
        false
    }

    /// Fail a job whose dispatch died before reaching a terminal state.
    pub(crate) async fn abandon(&self, job_id: &str) {
        error!(job_id = %job_id, "Dispatch aborted, marking job failed");
        self.finish(Some(job_id), JobStatus::Failed).await;
    }

    /// Record the outcome and write the job's terminal status.
    async fn finish(&self, job_id: Option<&str>, status: JobStatus) {
        match status {
            JobStatus::Success => self.counters.succeeded.fetch_add(1, Ordering::Relaxed),
            _ => self.counters.failed.fetch_add(1, Ordering::Relaxed),
        };

        let Some(job_id) = job_id else {
            return;
        };
        if let Err(e) = self.jobs.update_job_status(job_id, status).await {
            // The dispatch outcome stands; only the status write is lost.
            error!(job_id = %job_id, status = %status, error = %e, "Failed to update job status");
        }
    }

    /// Current dispatch counters.
    pub fn stats(&self) -> NotificationStats {
        NotificationStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            recipient_missing: self.counters.recipient_missing.load(Ordering::Relaxed),
            attempts: self.counters.attempts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;

    use super::*;
    use crate::database::repositories::{InMemoryJobRepository, InMemoryRecipientRepository};
    use crate::domain::{Address, AddressKind, Job, Recipient};
    use crate::notification::channels::NotificationChannel;

    /// Channel with a fixed outcome that counts its attempts.
    struct FixedChannel {
        kind: AddressKind,
        succeeds: bool,
        enabled: bool,
        calls: AtomicU32,
    }

    impl FixedChannel {
        fn new(kind: AddressKind, succeeds: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                succeeds,
                enabled: true,
                calls: AtomicU32::new(0),
            })
        }

        fn disabled(kind: AddressKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                succeeds: true,
                enabled: false,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NotificationChannel for FixedChannel {
        fn channel_type(&self) -> &'static str {
            match self.kind {
                AddressKind::Email => "email",
                AddressKind::Phone => "sms",
                AddressKind::Chat => "chat",
            }
        }

        fn address_kind(&self) -> AddressKind {
            self.kind
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn attempt(&self, _address: &Address, _message: &Message) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.succeeds
        }
    }

    struct Fixture {
        service: NotificationService,
        jobs: Arc<InMemoryJobRepository>,
        channels: HashMap<AddressKind, Arc<FixedChannel>>,
    }

    fn fixture(
        recipients: Vec<Recipient>,
        email: Arc<FixedChannel>,
        sms: Arc<FixedChannel>,
        chat: Arc<FixedChannel>,
    ) -> Fixture {
        let jobs = Arc::new(InMemoryJobRepository::new());
        let recipients = Arc::new(InMemoryRecipientRepository::from_recipients(recipients));
        let set = ChannelSet::new(email.clone(), sms.clone(), chat.clone()).unwrap();
        let service = NotificationService::new(recipients, jobs.clone(), set, RetryPolicy::immediate(3));
        let channels = HashMap::from([
            (AddressKind::Email, email),
            (AddressKind::Phone, sms),
            (AddressKind::Chat, chat),
        ]);
        Fixture {
            service,
            jobs,
            channels,
        }
    }

    async fn pending_job(jobs: &InMemoryJobRepository) -> Job {
        let job = Job::new();
        jobs.create_job(&job).await.unwrap();
        job
    }

    #[tokio::test]
    async fn test_first_success_stops_fallback() {
        let recipient = Recipient::new("u1", "Ivan")
            .with_email("ivan@gmail.com")
            .with_phone("+79001234567")
            .with_chat_handle("987654321");
        let f = fixture(
            vec![recipient],
            FixedChannel::new(AddressKind::Email, false),
            FixedChannel::new(AddressKind::Phone, true),
            FixedChannel::new(AddressKind::Chat, true),
        );
        let job = pending_job(&f.jobs).await;

        assert!(f.service.dispatch("u1", &Message::new("hi"), Some(&job.id)).await);

        assert_eq!(f.channels[&AddressKind::Email].calls(), 4);
        assert_eq!(f.channels[&AddressKind::Phone].calls(), 1);
        assert_eq!(f.channels[&AddressKind::Chat].calls(), 0);
        assert_eq!(f.jobs.get_job(&job.id).await.unwrap().status, JobStatus::Success);
    }

    #[tokio::test]
    async fn test_zero_addresses_fail_without_attempts() {
        let f = fixture(
            vec![Recipient::new("u0", "Empty")],
            FixedChannel::new(AddressKind::Email, true),
            FixedChannel::new(AddressKind::Phone, true),
            FixedChannel::new(AddressKind::Chat, true),
        );
        let job = pending_job(&f.jobs).await;

        assert!(!f.service.dispatch("u0", &Message::new("hi"), Some(&job.id)).await);

        assert!(f.channels.values().all(|c| c.calls() == 0));
        assert_eq!(f.jobs.get_job(&job.id).await.unwrap().status, JobStatus::Failed);
        assert_eq!(f.service.stats().attempts, 0);
    }

    #[tokio::test]
    async fn test_missing_recipient_marks_job_failed() {
        let f = fixture(
            vec![],
            FixedChannel::new(AddressKind::Email, true),
            FixedChannel::new(AddressKind::Phone, true),
            FixedChannel::new(AddressKind::Chat, true),
        );
        let job = pending_job(&f.jobs).await;

        assert!(!f.service.dispatch("ghost", &Message::new("hi"), Some(&job.id)).await);

        assert_eq!(f.jobs.get_job(&job.id).await.unwrap().status, JobStatus::Failed);
        let stats = f.service.stats();
        assert_eq!(stats.recipient_missing, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_disabled_channel_is_skipped() {
        let recipient = Recipient::new("u1", "Ivan")
            .with_email("ivan@gmail.com")
            .with_chat_handle("987654321");
        let f = fixture(
            vec![recipient],
            FixedChannel::disabled(AddressKind::Email),
            FixedChannel::new(AddressKind::Phone, true),
            FixedChannel::new(AddressKind::Chat, true),
        );

        assert!(f.service.dispatch("u1", &Message::new("hi"), None).await);
        assert_eq!(f.channels[&AddressKind::Email].calls(), 0);
        assert_eq!(f.channels[&AddressKind::Chat].calls(), 1);
        let stats = f.service.stats();
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_dispatch_without_job_id() {
        let recipient = Recipient::new("u1", "Ivan").with_phone("+79001234567");
        let f = fixture(
            vec![recipient],
            FixedChannel::new(AddressKind::Email, true),
            FixedChannel::new(AddressKind::Phone, false),
            FixedChannel::new(AddressKind::Chat, true),
        );

        assert!(!f.service.dispatch("u1", &Message::new("hi"), None).await);
        for status in [JobStatus::Pending, JobStatus::Success, JobStatus::Failed] {
            assert_eq!(f.jobs.count_by_status(status).await.unwrap(), 0);
        }

        let stats = f.service.stats();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.attempts, 4);
    }
}
