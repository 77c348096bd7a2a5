//! # Conversation Engine
//!
//! Walks each user through the five order steps (link, price, shipping,
//! contact, confirmation). The engine is transport-agnostic: it consumes
//! [`InboundEvent`]s and produces [`Reply`]s, and reaches the mail relay only
//! through an [`OrderNotifier`] at the confirmation step.

use std::sync::Arc;

use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::localization::{detect_language, LocalizationManager};
use crate::notification::{DispatchError, OrderNotification, OrderNotifier};
use crate::session::{OrderState, Session, SessionStore, ShippingMethod, UserId};
use crate::validation::{
    parse_confirmation, parse_price, validate_contact, validate_link, Confirmation, ValidationError,
};

/// Prefix of shipping selection callback data, e.g. `ship_air`
pub const SHIPPING_CALLBACK_PREFIX: &str = "ship_";

/// Commands understood in every state
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "Начать новый расчет")]
    Start,
    #[command(description = "Отменить текущий запрос")]
    Cancel,
    #[command(description = "Показать справку")]
    Help,
    #[command(description = "Проверить состояние бота")]
    Healthz,
}

impl Command {
    /// Parse `/cmd`, `/cmd@botname` or `/cmd args`, ignoring the bot name and arguments
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let head = text.split_whitespace().next()?;
        let name = head.split('@').next()?;
        Self::parse(name, "").ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Text,
    Command,
    Callback,
}

/// A message or button press from a user, stripped of transport details
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub user_id: UserId,
    /// Username or first name, used as the order's display name
    pub username: String,
    pub language_code: Option<String>,
    pub kind: EventKind,
    pub payload: String,
}

impl InboundEvent {
    pub fn new(user_id: UserId, username: impl Into<String>, kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            language_code: None,
            kind,
            payload: payload.into(),
        }
    }

    /// Classify a plain chat message: `/`-prefixed text is a command
    pub fn from_message(user_id: UserId, username: impl Into<String>, text: &str) -> Self {
        let kind = if text.starts_with('/') {
            EventKind::Command
        } else {
            EventKind::Text
        };
        Self::new(user_id, username, kind, text)
    }

    pub fn with_language(mut self, language_code: Option<String>) -> Self {
        self.language_code = language_code;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineButton {
    pub label: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyboard {
    /// Buttons attached to the message, answered with callbacks
    Inline(Vec<Vec<InlineButton>>),
    /// Buttons replacing the user's keyboard, answered with text
    Reply(Vec<Vec<String>>),
    /// Hide a previously shown reply keyboard
    Remove,
}

/// Outbound message for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

pub struct ConversationEngine {
    config: Arc<BotConfig>,
    sessions: SessionStore,
    notifier: Arc<dyn OrderNotifier>,
    i18n: Arc<LocalizationManager>,
}

impl ConversationEngine {
    pub fn new(
        config: Arc<BotConfig>,
        notifier: Arc<dyn OrderNotifier>,
        i18n: Arc<LocalizationManager>,
    ) -> Self {
        Self {
            config,
            sessions: SessionStore::new(),
            notifier,
            i18n,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Generic failure reply used when an event could not be handled
    pub fn error_reply(&self, language_code: Option<&str>) -> Reply {
        Reply::text(self.i18n.t("error-generic", detect_language(language_code)))
            .with_keyboard(Keyboard::Remove)
    }

    /// Handle one event and return the replies to send, in order
    pub async fn handle(&self, event: InboundEvent) -> Vec<Reply> {
        if event.kind == EventKind::Command {
            return self.handle_command(&event).await;
        }

        let Some(session) = self.sessions.get(event.user_id).await else {
            debug!(user_id = %event.user_id, "Input without an active session");
            let language = detect_language(event.language_code.as_deref());
            return vec![Reply::text(self.i18n.t("no-session", language))];
        };

        match (session.state, event.kind) {
            (OrderState::Link, EventKind::Text) => self.handle_link(session, &event.payload).await,
            (OrderState::Price, EventKind::Text) => self.handle_price(session, &event.payload).await,
            (OrderState::Shipping, EventKind::Callback) => {
                self.handle_shipping(session, &event.payload).await
            }
            (OrderState::Shipping, EventKind::Text) => {
                vec![self.shipping_reprompt(&session.language)]
            }
            (OrderState::Contact, EventKind::Text) => {
                self.handle_contact(session, &event.payload).await
            }
            (OrderState::Confirmation, EventKind::Text) => {
                self.handle_confirmation(session, &event.payload).await
            }
            (state, kind) => {
                debug!(user_id = %event.user_id, ?state, ?kind, "Ignoring input not expected in this state");
                Vec::new()
            }
        }
    }

    async fn handle_command(&self, event: &InboundEvent) -> Vec<Reply> {
        let language = match self.sessions.get(event.user_id).await {
            Some(session) => session.language,
            None => detect_language(event.language_code.as_deref()).to_string(),
        };

        match Command::parse_lenient(&event.payload) {
            Some(Command::Start) => self.start(event).await,
            Some(Command::Cancel) => {
                if self.sessions.remove(event.user_id).await.is_some() {
                    info!(user_id = %event.user_id, "Order cancelled by user");
                }
                vec![Reply::text(self.i18n.t("cancelled", &language)).with_keyboard(Keyboard::Remove)]
            }
            Some(Command::Help) => vec![Reply::text(self.i18n.t("help", &language))],
            Some(Command::Healthz) => vec![Reply::text(self.i18n.t("healthy", &language))],
            None => {
                debug!(user_id = %event.user_id, command = %event.payload, "Unknown command");
                vec![Reply::text(self.i18n.t("unknown-command", &language))]
            }
        }
    }

    async fn start(&self, event: &InboundEvent) -> Vec<Reply> {
        let language = detect_language(event.language_code.as_deref());
        let session = Session::new(event.user_id, event.username.clone(), language);
        self.sessions.create(session).await;
        info!(user_id = %event.user_id, language, "Order session started");

        let text = format!(
            "{}\n\n{}",
            self.i18n.t_args("welcome", language, &[("name", &event.username)]),
            self.i18n.t("link-prompt", language)
        );
        vec![Reply::text(text).with_keyboard(Keyboard::Remove)]
    }

    async fn handle_link(&self, mut session: Session, input: &str) -> Vec<Reply> {
        match validate_link(input) {
            Ok(link) => {
                debug!(user_id = %session.user_id, "Link accepted");
                session.set_link(link);
                let reply = Reply::text(self.i18n.t("price-prompt", &session.language));
                self.sessions.update(session).await;
                vec![reply]
            }
            Err(e) => self.reprompt(&session, e),
        }
    }

    async fn handle_price(&self, mut session: Session, input: &str) -> Vec<Reply> {
        match parse_price(input) {
            Ok(price_cny) => {
                let price_rub = price_cny * self.config.exchange_rate;
                debug!(user_id = %session.user_id, price_cny, price_rub, "Price accepted");
                session.set_price(price_cny);

                let language = session.language.clone();
                self.sessions.update(session).await;

                let accepted = self.i18n.t_args(
                    "price-accepted",
                    &language,
                    &[
                        ("cny", &format!("{price_cny:.2}")),
                        ("rub", &format!("{price_rub:.2}")),
                    ],
                );
                let prompt = self.shipping_reprompt(&language);
                vec![Reply {
                    text: format!("{accepted}\n\n{}", prompt.text),
                    keyboard: prompt.keyboard,
                }]
            }
            Err(e) => self.reprompt(&session, e),
        }
    }

    async fn handle_shipping(&self, mut session: Session, data: &str) -> Vec<Reply> {
        let selected = data
            .strip_prefix(SHIPPING_CALLBACK_PREFIX)
            .and_then(|key| key.parse::<ShippingMethod>().ok())
            .and_then(|method| self.config.shipping.get(method));

        let Some(option) = selected else {
            return self.reprompt(&session, ValidationError::UnknownShipping);
        };

        debug!(user_id = %session.user_id, shipping = %option.method, "Shipping method selected");
        session.set_shipping(option.method);

        let text = format!(
            "{}\n\n{}",
            self.i18n.t_args("shipping-selected", &session.language, &[("name", &option.name)]),
            self.i18n.t("contact-prompt", &session.language)
        );
        self.sessions.update(session).await;
        vec![Reply::text(text)]
    }

    async fn handle_contact(&self, mut session: Session, input: &str) -> Vec<Reply> {
        match validate_contact(input) {
            Ok(contact) => {
                debug!(user_id = %session.user_id, "Contact accepted");
                session.set_contact(contact);
                let reply = self.order_summary(&session);
                self.sessions.update(session).await;
                vec![reply]
            }
            Err(e) => self.reprompt(&session, e),
        }
    }

    async fn handle_confirmation(&self, session: Session, input: &str) -> Vec<Reply> {
        let answer = match parse_confirmation(input) {
            Ok(answer) => answer,
            Err(e) => return self.reprompt(&session, e),
        };

        let language = session.language.clone();
        let text = match answer {
            Confirmation::No => {
                info!(user_id = %session.user_id, "Order declined at confirmation");
                self.i18n.t("order-declined", &language)
            }
            Confirmation::Yes => match self.build_order(&session) {
                Some(order) => match self.notifier.notify(&order).await {
                    Ok(()) => {
                        info!(user_id = %session.user_id, "Order confirmed and sent");
                        self.i18n.t("order-success", &language)
                    }
                    Err(e) => {
                        error!(user_id = %session.user_id, error = %e, "Failed to send order notification");
                        self.i18n.t(dispatch_error_key(&e), &language)
                    }
                },
                None => {
                    error!(user_id = %session.user_id, "Confirmed session is incomplete");
                    self.i18n.t("error-generic", &language)
                }
            },
        };

        self.sessions.remove(session.user_id).await;
        vec![Reply::text(text).with_keyboard(Keyboard::Remove)]
    }

    fn build_order(&self, session: &Session) -> Option<OrderNotification> {
        let option = self.config.shipping.get(session.shipping_method?)?;
        OrderNotification::from_session(session, self.config.exchange_rate, option)
    }

    fn order_summary(&self, session: &Session) -> Reply {
        let language = &session.language;
        let price_cny = session.price_cny.unwrap_or_default();
        let option = session
            .shipping_method
            .and_then(|method| self.config.shipping.get(method));

        let text = self.i18n.t_args(
            "order-summary",
            language,
            &[
                ("link", session.link.as_deref().unwrap_or_default()),
                ("cny", &format!("{price_cny:.2}")),
                ("rub", &format!("{:.2}", price_cny * self.config.exchange_rate)),
                ("shipping", option.map(|o| o.name.as_str()).unwrap_or_default()),
                ("days", &option.map(|o| o.days()).unwrap_or_default()),
                ("contact", session.contact.as_deref().unwrap_or_default()),
            ],
        );

        Reply::text(text).with_keyboard(self.confirmation_keyboard(language))
    }

    fn shipping_reprompt(&self, language: &str) -> Reply {
        let mut text = self.i18n.t("shipping-prompt", language);
        for option in self.config.shipping.options() {
            text.push('\n');
            text.push_str(&self.i18n.t_args(
                "shipping-option",
                language,
                &[
                    ("name", &option.name),
                    ("price", &option.price_per_kg.to_string()),
                    ("days", &option.days()),
                ],
            ));
        }

        let rows = self
            .config
            .shipping
            .options()
            .iter()
            .map(|option| {
                vec![InlineButton {
                    label: option.name.clone(),
                    data: format!("{SHIPPING_CALLBACK_PREFIX}{}", option.method.key()),
                }]
            })
            .collect();

        Reply::text(text).with_keyboard(Keyboard::Inline(rows))
    }

    fn confirmation_keyboard(&self, language: &str) -> Keyboard {
        Keyboard::Reply(vec![vec![
            self.i18n.t("confirm-yes", language),
            self.i18n.t("confirm-no", language),
        ]])
    }

    /// Reply for invalid input; the session is left untouched
    fn reprompt(&self, session: &Session, error: ValidationError) -> Vec<Reply> {
        debug!(user_id = %session.user_id, state = ?session.state, error = %error, "Input rejected");
        let language = &session.language;

        let reply = match error {
            ValidationError::InvalidLink => Reply::text(self.i18n.t("link-invalid", language)),
            ValidationError::NotANumber => Reply::text(self.i18n.t("price-invalid", language)),
            ValidationError::PriceOutOfRange => {
                Reply::text(self.i18n.t("price-out-of-range", language))
            }
            ValidationError::UnknownShipping => {
                warn!(user_id = %session.user_id, "Unknown shipping selection");
                let prompt = self.shipping_reprompt(language);
                Reply {
                    text: format!("{}\n\n{}", self.i18n.t("shipping-invalid", language), prompt.text),
                    keyboard: prompt.keyboard,
                }
            }
            ValidationError::InvalidContact => Reply::text(self.i18n.t("contact-invalid", language)),
            ValidationError::UnrecognizedAnswer => Reply::text(self.i18n.t("confirm-invalid", language))
                .with_keyboard(self.confirmation_keyboard(language)),
        };

        vec![reply]
    }
}

/// Message key shown to the user for a failed dispatch
fn dispatch_error_key(error: &DispatchError) -> &'static str {
    if error.is_auth() {
        "error-mail-auth"
    } else if error.is_connection() {
        "error-mail-connection"
    } else {
        "error-mail-generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::TransportError;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse_lenient("/start"), Some(Command::Start));
        assert_eq!(Command::parse_lenient("/start@order_bot"), Some(Command::Start));
        assert_eq!(Command::parse_lenient("/cancel now"), Some(Command::Cancel));
        assert_eq!(Command::parse_lenient("/healthz"), Some(Command::Healthz));
        assert_eq!(Command::parse_lenient("/unknown"), None);
        assert_eq!(Command::parse_lenient(""), None);
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(InboundEvent::from_message(1, "a", "/help").kind, EventKind::Command);
        assert_eq!(InboundEvent::from_message(1, "a", "hello").kind, EventKind::Text);
    }

    #[test]
    fn test_dispatch_error_keys() {
        let auth = DispatchError::Fatal {
            attempt: 1,
            source: TransportError::Auth("535".into()),
        };
        let exhausted = DispatchError::Exhausted {
            attempts: 3,
            source: TransportError::Connection("refused".into()),
        };
        let rejected = DispatchError::Fatal {
            attempt: 1,
            source: TransportError::Rejected("550".into()),
        };
        assert_eq!(dispatch_error_key(&auth), "error-mail-auth");
        assert_eq!(dispatch_error_key(&exhausted), "error-mail-connection");
        assert_eq!(dispatch_error_key(&rejected), "error-mail-generic");
    }
}
