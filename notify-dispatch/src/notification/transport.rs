//! Transmission backends used by channels.
//!
//! A channel renders a message into an [`Envelope`] and hands it to its
//! [`Transport`]. The bundled [`SimulatedTransport`] fails at random and
//! sleeps for a random latency; a provider adapter (SMTP, SMS gateway, chat
//! bot API) implements the same trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A rendered message ready to be transmitted to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Mailbox, phone number or chat handle.
    pub target: String,
    /// Subject line for transports that carry one.
    pub subject: Option<String>,
    /// Rendered body.
    pub body: String,
}

/// Something that can push an envelope to an external provider.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (used in logs and errors).
    fn name(&self) -> &str;

    /// Transmit an envelope. `Err` means the provider did not accept it.
    async fn transmit(&self, envelope: &Envelope) -> Result<()>;
}

/// Failure and latency characteristics of a simulated provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Probability in `[0, 1]` that a transmission fails.
    pub fail_rate: f64,
    /// Upper bound of the random latency in milliseconds.
    pub max_delay_ms: u64,
}

impl SimulationConfig {
    pub fn new(fail_rate: f64, max_delay_ms: u64) -> Self {
        Self {
            fail_rate,
            max_delay_ms,
        }
    }

    /// Clamp the failure rate into `[0, 1]`.
    pub fn normalized(mut self) -> Self {
        if !self.fail_rate.is_finite() {
            self.fail_rate = 1.0;
        }
        self.fail_rate = self.fail_rate.clamp(0.0, 1.0);
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fail_rate: 0.6,
            max_delay_ms: 1000,
        }
    }
}

/// Transport that simulates an unreliable provider.
pub struct SimulatedTransport {
    name: String,
    config: SimulationConfig,
}

impl SimulatedTransport {
    pub fn new(name: impl Into<String>, config: SimulationConfig) -> Self {
        Self {
            name: name.into(),
            config: config.normalized(),
        }
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transmit(&self, _envelope: &Envelope) -> Result<()> {
        if self.config.max_delay_ms > 0 {
            let delay = (rand::random::<f64>() * self.config.max_delay_ms as f64) as u64;
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if rand::random::<f64>() >= self.config.fail_rate {
            Ok(())
        } else {
            Err(Error::transport(&self.name, "service is unavailable"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Envelope {
        Envelope {
            target: "someone@example.com".to_string(),
            subject: None,
            body: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_never_failing_simulation() {
        let transport = SimulatedTransport::new("email", SimulationConfig::new(0.0, 0));
        for _ in 0..20 {
            assert!(transport.transmit(&envelope()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_always_failing_simulation() {
        let transport = SimulatedTransport::new("sms", SimulationConfig::new(1.0, 0));
        for _ in 0..20 {
            let err = transport.transmit(&envelope()).await.unwrap_err();
            assert!(matches!(err, Error::Transport { .. }));
        }
    }

    #[test]
    fn test_fail_rate_is_clamped() {
        assert_eq!(SimulationConfig::new(3.0, 0).normalized().fail_rate, 1.0);
        assert_eq!(SimulationConfig::new(-1.0, 0).normalized().fail_rate, 0.0);
        assert_eq!(SimulationConfig::new(f64::NAN, 0).normalized().fail_rate, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_bounded() {
        let transport = SimulatedTransport::new("chat", SimulationConfig::new(0.0, 2000));
        let started = tokio::time::Instant::now();
        transport.transmit(&envelope()).await.unwrap();
        assert!(started.elapsed() <= Duration::from_millis(2000));
    }
}
