//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, error};

use crate::engine::{ConversationEngine, EventKind, InboundEvent};

use super::display_name;
use super::ui_builder::send_replies;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    engine: Arc<ConversationEngine>,
) -> Result<()> {
    let data = q.data.clone().unwrap_or_default();
    debug!(user_id = %q.from.id, data = %data, "Received callback query from user");

    let chat_id = q
        .message
        .as_ref()
        .map(|msg| msg.chat().id)
        .unwrap_or(ChatId(q.from.id.0 as i64));

    let event = InboundEvent::new(q.from.id.0, display_name(&q.from), EventKind::Callback, data)
        .with_language(q.from.language_code.clone());
    let replies = engine.handle(event).await;

    // Answer the callback query to remove the loading state
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        error!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    if let Err(e) = send_replies(&bot, chat_id, replies).await {
        error!(user_id = %q.from.id, error = %e, "Failed to send reply to user");
        let fallback = engine.error_reply(q.from.language_code.as_deref());
        if let Err(e) = send_replies(&bot, chat_id, vec![fallback]).await {
            error!(user_id = %q.from.id, error = %e, "Failed to send error message to user");
        }
    }

    Ok(())
}
