//! Notification module for delivering completed orders to the administrator
//!
//! - `dispatcher`: retry policy and the dispatcher that drives delivery attempts
//! - `smtp`: the lettre-backed mail transport
//! - `errors`: transport and dispatch error types

pub mod dispatcher;
pub mod errors;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ShippingOption;
use crate::session::{Session, ShippingMethod, UserId};

pub use dispatcher::{NotificationDispatcher, RetryPolicy};
pub use errors::{DispatchError, TransportError};
pub use smtp::SmtpMailer;

/// Snapshot of a completed order handed to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct OrderNotification {
    pub user_id: UserId,
    pub display_name: String,
    pub link: String,
    pub price_cny: f64,
    pub price_rub: f64,
    pub shipping_method: ShippingMethod,
    /// Display name of the shipping option
    pub shipping_name: String,
    pub contact: String,
}

impl OrderNotification {
    /// Build a notification from a session, `None` if any field is missing
    pub fn from_session(
        session: &Session,
        exchange_rate: f64,
        shipping: &ShippingOption,
    ) -> Option<Self> {
        let price_cny = session.price_cny?;
        Some(Self {
            user_id: session.user_id,
            display_name: session.display_name.clone(),
            link: session.link.clone()?,
            price_cny,
            price_rub: price_cny * exchange_rate,
            shipping_method: session.shipping_method?,
            shipping_name: shipping.name.clone(),
            contact: session.contact.clone()?,
        })
    }

    pub fn subject(&self) -> String {
        format!("Новый заказ от {}", self.display_name)
    }

    pub fn body(&self) -> String {
        format!(
            "Детали заказа:\n\n\
             ID клиента: {}\n\
             Ссылка: {}\n\
             Цена: {:.2} CNY → {:.2} RUB\n\
             Доставка: {}\n\
             Контакт: {}",
            self.user_id, self.link, self.price_cny, self.price_rub, self.shipping_name, self.contact
        )
    }
}

/// A fully composed mail ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver one mail
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: MailTransport + ?Sized> MailTransport for Arc<T> {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        (**self).send(mail).await
    }
}

/// Something that can deliver a completed order, used by the conversation engine
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, order: &OrderNotification) -> Result<(), DispatchError>;
}
