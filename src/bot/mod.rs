//! Bot module for handling Telegram interactions
//!
//! This module adapts Telegram updates to the conversation engine:
//! - `message_handler`: Handles incoming text messages and commands
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Turns engine replies into Telegram keyboards and messages

pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

use teloxide::types::User;

/// Name shown in the order mail: the @username when set, the first name otherwise
pub fn display_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}
