//! Order session module: per-user conversation state and the session store.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Telegram user identifier
pub type UserId = u64;

/// The step a session is waiting on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    #[default]
    Link,
    Price,
    Shipping,
    Contact,
    Confirmation,
}

/// Shipping method chosen by the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Truck,
    Air,
    Express,
}

impl ShippingMethod {
    pub const ALL: [ShippingMethod; 3] = [Self::Truck, Self::Air, Self::Express];

    /// Stable key used in callback data and logs
    pub fn key(self) -> &'static str {
        match self {
            Self::Truck => "truck",
            Self::Air => "air",
            Self::Express => "express",
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ShippingMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.key() == s)
            .ok_or(())
    }
}

/// In-progress order collected from one user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub display_name: String,
    pub language: String,
    pub link: Option<String>,
    pub price_cny: Option<f64>,
    pub shipping_method: Option<ShippingMethod>,
    pub contact: Option<String>,
    pub state: OrderState,
}

impl Session {
    pub fn new(user_id: UserId, display_name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            language: language.into(),
            link: None,
            price_cny: None,
            shipping_method: None,
            contact: None,
            state: OrderState::Link,
        }
    }

    pub fn set_link(&mut self, link: String) {
        self.link = Some(link);
        self.state = OrderState::Price;
    }

    pub fn set_price(&mut self, price_cny: f64) {
        self.price_cny = Some(price_cny);
        self.state = OrderState::Shipping;
    }

    pub fn set_shipping(&mut self, method: ShippingMethod) {
        self.shipping_method = Some(method);
        self.state = OrderState::Contact;
    }

    pub fn set_contact(&mut self, contact: String) {
        self.contact = Some(contact);
        self.state = OrderState::Confirmation;
    }

    /// `true` once every order field is present
    pub fn is_complete(&self) -> bool {
        self.link.is_some()
            && self.price_cny.is_some()
            && self.shipping_method.is_some()
            && self.contact.is_some()
    }
}

/// Active sessions keyed by user id
///
/// The engine is the only writer. The lock is held only for the duration of a
/// single map operation, never across an await on I/O.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<UserId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh session, replacing any existing one for the user
    pub async fn create(&self, session: Session) {
        self.sessions.lock().await.insert(session.user_id, session);
    }

    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        self.sessions.lock().await.get(&user_id).cloned()
    }

    pub async fn update(&self, session: Session) {
        self.sessions.lock().await.insert(session.user_id, session);
    }

    pub async fn remove(&self, user_id: UserId) -> Option<Session> {
        self.sessions.lock().await.remove(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
