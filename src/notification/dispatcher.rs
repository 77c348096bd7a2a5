//! # Notification Dispatcher
//!
//! Delivers order notifications through a [`MailTransport`], retrying
//! transient failures with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::{DispatchError, MailTransport, OrderNotification, OrderNotifier, OutgoingMail};

/// Retry configuration for notification delivery
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of delivery attempts, including the first one
    pub max_attempts: u32,
    /// Wait after the first failed attempt, doubled after each further failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt after failed attempt `attempt` (0-based):
    /// `base_delay * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Sends completed orders to the administrator address
pub struct NotificationDispatcher<T> {
    transport: T,
    admin_address: String,
    policy: RetryPolicy,
}

impl<T: MailTransport> NotificationDispatcher<T> {
    pub fn new(transport: T, admin_address: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            admin_address: admin_address.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Compose the admin mail for an order
    pub fn compose(&self, order: &OrderNotification) -> OutgoingMail {
        OutgoingMail {
            from: self.admin_address.clone(),
            to: self.admin_address.clone(),
            subject: order.subject(),
            body: order.body(),
        }
    }

    /// Deliver the order, retrying transient transport failures
    ///
    /// Returns as soon as one attempt succeeds. A non-retryable failure is
    /// returned immediately as [`DispatchError::Fatal`]; a transient failure
    /// on the last attempt is returned as [`DispatchError::Exhausted`].
    pub async fn send(&self, order: &OrderNotification) -> Result<(), DispatchError> {
        let mail = self.compose(order);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(user_id = %order.user_id, attempt, max_attempts, "Sending order notification");

            let e = match self.transport.send(&mail).await {
                Ok(()) => {
                    info!(user_id = %order.user_id, attempt, "Order notification delivered");
                    return Ok(());
                }
                Err(e) => e,
            };

            if !e.is_transient() {
                error!(user_id = %order.user_id, attempt, max_attempts, error = %e, "Order notification failed permanently");
                return Err(DispatchError::Fatal { attempt, source: e });
            }
            if attempt >= max_attempts {
                error!(user_id = %order.user_id, attempt, max_attempts, error = %e, "Order notification failed, retries exhausted");
                return Err(DispatchError::Exhausted { attempts: attempt, source: e });
            }

            let delay = self.policy.backoff(attempt - 1);
            warn!(
                user_id = %order.user_id,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "Order notification failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl<T: MailTransport> OrderNotifier for NotificationDispatcher<T> {
    async fn notify(&self, order: &OrderNotification) -> Result<(), DispatchError> {
        self.send(order).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(200), Duration::MAX);
    }
}
