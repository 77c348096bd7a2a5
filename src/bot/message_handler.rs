//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::engine::{ConversationEngine, InboundEvent};

use super::display_name;
use super::ui_builder::send_replies;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    engine: Arc<ConversationEngine>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    let Some(text) = msg.text() else {
        debug!(user_id = %user.id, "Ignoring non-text message");
        return Ok(());
    };

    debug!(user_id = %user.id, message_length = text.len(), "Received text message from user");

    let event = InboundEvent::from_message(user.id.0, display_name(user), text)
        .with_language(user.language_code.clone());
    let replies = engine.handle(event).await;

    if let Err(e) = send_replies(&bot, msg.chat.id, replies).await {
        error!(user_id = %user.id, error = %e, "Failed to send reply to user");
        let fallback = engine.error_reply(user.language_code.as_deref());
        if let Err(e) = send_replies(&bot, msg.chat.id, vec![fallback]).await {
            error!(user_id = %user.id, error = %e, "Failed to send error message to user");
        }
    }

    Ok(())
}
