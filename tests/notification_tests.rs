//! # Notification Dispatcher Tests
//!
//! Retry and backoff behavior of the dispatcher against a scripted transport.
//! Time is paused so backoff waits complete instantly and can be measured.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use order_intake_bot::notification::{
    DispatchError, MailTransport, NotificationDispatcher, OrderNotification, OrderNotifier,
    OutgoingMail, RetryPolicy, TransportError,
};
use order_intake_bot::session::ShippingMethod;

/// Transport that replays a fixed list of outcomes and records each call
#[derive(Default)]
struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<(), TransportError>>>,
    calls: Mutex<Vec<(Instant, OutgoingMail)>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<Result<(), TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    fn mails(&self) -> Vec<OutgoingMail> {
        self.calls.lock().unwrap().iter().map(|(_, mail)| mail.clone()).collect()
    }
}

#[async_trait]
impl MailTransport for ScriptedTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push((Instant::now(), mail.clone()));
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

fn order() -> OrderNotification {
    OrderNotification {
        user_id: 42,
        display_name: "buyer".to_string(),
        link: "https://item.taobao.com/item.htm?id=1".to_string(),
        price_cny: 199.99,
        price_rub: 199.99 * 13.0,
        shipping_method: ShippingMethod::Air,
        shipping_name: "✈️ Авиа".to_string(),
        contact: "user@mail.com".to_string(),
    }
}

fn dispatcher(transport: &Arc<ScriptedTransport>) -> NotificationDispatcher<Arc<ScriptedTransport>> {
    NotificationDispatcher::new(transport.clone(), "admin@example.com", RetryPolicy::default())
}

fn connection_error() -> TransportError {
    TransportError::Connection("connection refused".to_string())
}

fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
    let gap = later - earlier;
    assert!(
        gap >= expected && gap < expected + Duration::from_millis(10),
        "expected a wait of {expected:?}, got {gap:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_after_two_transient_failures() {
    let transport = ScriptedTransport::new(vec![Err(connection_error()), Err(connection_error()), Ok(())]);

    let result = dispatcher(&transport).send(&order()).await;
    assert_eq!(result, Ok(()));

    let times = transport.call_times();
    assert_eq!(times.len(), 3);
    assert_gap(times[0], times[1], Duration::from_secs(1));
    assert_gap(times[1], times[2], Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_all_attempts_fail() {
    let transport = ScriptedTransport::new(vec![
        Err(connection_error()),
        Err(TransportError::Timeout("no answer".to_string())),
        Err(connection_error()),
        Ok(()),
    ]);
    let started = Instant::now();

    let result = dispatcher(&transport).send(&order()).await;
    assert_eq!(
        result,
        Err(DispatchError::Exhausted {
            attempts: 3,
            source: connection_error(),
        })
    );
    assert_eq!(transport.call_times().len(), 3);
    // No wait after the last attempt
    assert_gap(started, Instant::now(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_first_attempt_success_does_not_wait() {
    let transport = ScriptedTransport::new(vec![Ok(())]);
    let started = Instant::now();

    assert!(dispatcher(&transport).notify(&order()).await.is_ok());
    assert_eq!(transport.call_times().len(), 1);
    assert_eq!(Instant::now(), started);
}

#[tokio::test(start_paused = true)]
async fn test_auth_failure_is_not_retried() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Auth("535 5.7.8 bad credentials".to_string())),
        Ok(()),
    ]);

    let result = dispatcher(&transport).send(&order()).await;
    match result {
        Err(error @ DispatchError::Fatal { attempt: 1, .. }) => assert!(error.is_auth()),
        other => panic!("Expected fatal auth error, got {other:?}"),
    }
    assert_eq!(transport.call_times().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_after_transient_one() {
    let transport = ScriptedTransport::new(vec![
        Err(connection_error()),
        Err(TransportError::Rejected("550 mailbox unavailable".to_string())),
    ]);

    let result = dispatcher(&transport).send(&order()).await;
    assert!(matches!(result, Err(DispatchError::Fatal { attempt: 2, .. })));
    assert_eq!(transport.call_times().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_custom_policy() {
    let transport = ScriptedTransport::new(vec![Err(connection_error()); 5]);
    let policy = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
    };
    let dispatcher = NotificationDispatcher::new(transport.clone(), "admin@example.com", policy);

    let result = dispatcher.send(&order()).await;
    assert!(matches!(result, Err(DispatchError::Exhausted { attempts: 5, .. })));

    let times = transport.call_times();
    assert_gap(times[3], times[4], Duration::from_millis(800));
}

#[tokio::test]
async fn test_mail_is_addressed_to_admin() {
    let transport = ScriptedTransport::new(vec![Ok(())]);

    dispatcher(&transport).send(&order()).await.unwrap();

    let mails = transport.mails();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].from, "admin@example.com");
    assert_eq!(mails[0].to, "admin@example.com");
    assert_eq!(mails[0].subject, "Новый заказ от buyer");
    assert!(mails[0].body.contains("ID клиента: 42"));
    assert!(mails[0].body.contains("Цена: 199.99 CNY → 2599.87 RUB"));
    assert!(mails[0].body.contains("Доставка: ✈️ Авиа"));
    assert!(mails[0].body.contains("Контакт: user@mail.com"));
}
