//! # Order Intake Telegram Bot
//!
//! A Telegram bot that walks users through a five-step order form (product
//! link, price in CNY, shipping method, contact, confirmation) and emails the
//! completed order to an administrator.

pub mod bot;
pub mod config;
pub mod engine;
pub mod localization;
pub mod notification;
pub mod session;
pub mod validation;
