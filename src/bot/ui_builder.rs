//! UI Builder module for creating keyboards and sending engine replies

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};

use crate::engine::{Keyboard, Reply};

/// Convert an engine keyboard into Telegram reply markup
pub fn create_reply_markup(keyboard: &Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => {
            let buttons = rows.iter().map(|row| {
                row.iter()
                    .map(|button| {
                        InlineKeyboardButton::callback(button.label.clone(), button.data.clone())
                    })
                    .collect::<Vec<_>>()
            });
            ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(buttons))
        }
        Keyboard::Reply(rows) => {
            let buttons = rows.iter().map(|row| {
                row.iter()
                    .map(|label| KeyboardButton::new(label.clone()))
                    .collect::<Vec<_>>()
            });
            ReplyMarkup::Keyboard(
                KeyboardMarkup::new(buttons)
                    .resize_keyboard()
                    .one_time_keyboard(),
            )
        }
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

/// Send engine replies to a chat, in order
pub async fn send_replies(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) -> Result<()> {
    for reply in replies {
        let mut request = bot.send_message(chat_id, reply.text);
        if let Some(keyboard) = &reply.keyboard {
            request = request.reply_markup(create_reply_markup(keyboard));
        }
        request.await?;
    }

    Ok(())
}
