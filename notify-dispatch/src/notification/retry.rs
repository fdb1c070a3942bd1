//! Bounded retry around a single channel.

use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::channels::NotificationChannel;
use crate::domain::{Address, Message, RetryPolicy};

/// Result of driving one channel through its retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Whether some attempt succeeded.
    pub delivered: bool,
    /// Number of `attempt` calls made.
    pub attempts: u32,
}

/// Try `channel` once, then retry up to `policy.max_retries` times.
///
/// Returns `true` on the first successful attempt and `false` when all
/// `max_retries + 1` attempts fail.
pub async fn send_with_retry(
    channel: &dyn NotificationChannel,
    address: &Address,
    message: &Message,
    policy: &RetryPolicy,
) -> bool {
    deliver_with_retry(channel, address, message, policy)
        .await
        .delivered
}

/// Like [`send_with_retry`] but also reports how many attempts were made.
///
/// An address the channel cannot serve never succeeds, so it fails
/// immediately without using any attempts.
pub async fn deliver_with_retry(
    channel: &dyn NotificationChannel,
    address: &Address,
    message: &Message,
    policy: &RetryPolicy,
) -> RetryOutcome {
    let channel_type = channel.channel_type();

    if !channel.accepts(address) {
        error!(
            channel = channel_type,
            address_kind = %address.kind(),
            "Address kind does not match channel, not retrying"
        );
        return RetryOutcome {
            delivered: false,
            attempts: 0,
        };
    }

    let total_attempts = policy.total_attempts();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        if channel.attempt(address, message).await {
            if attempts > 1 {
                debug!(
                    channel = channel_type,
                    attempts, "Delivery succeeded after retrying"
                );
            }
            return RetryOutcome {
                delivered: true,
                attempts,
            };
        }

        let retries_done = attempts - 1;
        if !policy.should_retry(retries_done) {
            warn!(
                channel = channel_type,
                attempt = attempts,
                max_attempts = total_attempts,
                "Delivery failed, retries exhausted"
            );
            return RetryOutcome {
                delivered: false,
                attempts,
            };
        }

        let delay = policy.delay_for_attempt(retries_done);
        warn!(
            channel = channel_type,
            attempt = attempts,
            max_attempts = total_attempts,
            delay_ms = delay.as_millis() as u64,
            "Delivery failed, retrying"
        );
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rstest::rstest;

    use super::*;
    use crate::domain::AddressKind;

    /// Channel that replays a fixed script of outcomes, then keeps failing.
    struct ScriptedChannel {
        script: Mutex<VecDeque<bool>>,
        calls: AtomicU32,
    }

    impl ScriptedChannel {
        fn new(script: &[bool]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NotificationChannel for ScriptedChannel {
        fn channel_type(&self) -> &'static str {
            "scripted"
        }

        fn address_kind(&self) -> AddressKind {
            AddressKind::Email
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn attempt(&self, _address: &Address, _message: &Message) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().pop_front().unwrap_or(false)
        }
    }

    fn email() -> Address {
        Address::Email("ivan@gmail.com".to_string())
    }

    #[rstest]
    #[case::first_try(&[true], 3, true, 1)]
    #[case::second_try(&[false, true], 3, true, 2)]
    #[case::last_try(&[false, false, false, true], 3, true, 4)]
    #[case::exhausted(&[], 3, false, 4)]
    #[case::no_retries(&[false, true], 0, false, 1)]
    #[case::five_retries(&[], 5, false, 6)]
    #[tokio::test]
    async fn test_attempt_counts(
        #[case] script: &[bool],
        #[case] max_retries: u32,
        #[case] delivered: bool,
        #[case] attempts: u32,
    ) {
        let channel = ScriptedChannel::new(script);
        let policy = RetryPolicy::immediate(max_retries);

        let outcome = deliver_with_retry(&channel, &email(), &Message::new("hi"), &policy).await;

        assert_eq!(outcome.delivered, delivered);
        assert_eq!(outcome.attempts, attempts);
        assert_eq!(channel.calls(), attempts);
    }

    #[tokio::test]
    async fn test_send_with_retry_returns_bool() {
        let channel = ScriptedChannel::new(&[false, true]);
        let policy = RetryPolicy::immediate(1);
        assert!(send_with_retry(&channel, &email(), &Message::new("hi"), &policy).await);
    }

    #[tokio::test]
    async fn test_mismatched_address_fails_fast() {
        let channel = ScriptedChannel::new(&[true]);
        let policy = RetryPolicy::immediate(3);
        let phone = Address::Phone("+79001234567".to_string());

        let outcome = deliver_with_retry(&channel, &phone, &Message::new("hi"), &policy).await;

        assert!(!outcome.delivered);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(channel.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let channel = ScriptedChannel::new(&[false, false, true]);
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
            use_jitter: false,
        };

        let started = tokio::time::Instant::now();
        let outcome = deliver_with_retry(&channel, &email(), &Message::new("hi"), &policy).await;

        assert!(outcome.delivered);
        assert_eq!(outcome.attempts, 3);
        // 100ms before the first retry, 200ms before the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(300));
        assert!(elapsed < std::time::Duration::from_millis(400));
    }
}
