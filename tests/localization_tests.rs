//! # Localization Tests
//!
//! This module contains unit tests for the localization functionality,
//! testing message retrieval and formatting with various edge cases.

use order_intake_bot::localization::{detect_language, LocalizationManager, DEFAULT_LANGUAGE};

const KEYS: &[&str] = &[
    "welcome",
    "link-prompt",
    "link-invalid",
    "price-prompt",
    "price-invalid",
    "price-out-of-range",
    "price-accepted",
    "shipping-prompt",
    "shipping-option",
    "shipping-invalid",
    "shipping-selected",
    "contact-prompt",
    "contact-invalid",
    "order-summary",
    "confirm-invalid",
    "confirm-yes",
    "confirm-no",
    "order-success",
    "order-declined",
    "error-mail-auth",
    "error-mail-connection",
    "error-mail-generic",
    "cancelled",
    "help",
    "healthy",
    "no-session",
    "unknown-command",
    "error-generic",
];

fn setup_localization() -> LocalizationManager {
    LocalizationManager::new().expect("Failed to create localization manager")
}

#[test]
fn test_every_key_translated() {
    let manager = setup_localization();

    for language in ["ru", "en"] {
        for key in KEYS {
            let message = manager.t(key, language);
            assert!(!message.is_empty(), "{language}/{key} is empty");
            assert!(!message.starts_with("Missing"), "{language}/{key}: {message}");
        }
    }
}

#[test]
fn test_get_message_nonexistent_key() {
    let manager = setup_localization();

    let message = manager.t("nonexistent-key", "ru");
    assert!(message.starts_with("Missing translation:"));
}

#[test]
fn test_unsupported_language_falls_back() {
    let manager = setup_localization();

    assert_eq!(manager.t("help", "de"), manager.t("help", DEFAULT_LANGUAGE));
    assert_ne!(manager.t("help", "en"), manager.t("help", "ru"));
}

#[test]
fn test_get_message_with_args() {
    let manager = setup_localization();

    let message = manager.t_args("price-accepted", "ru", &[("cny", "199.99"), ("rub", "2599.87")]);
    assert_eq!(message, "💰 Цена: 199.99 CNY ≈ 2599.87 RUB");

    let message = manager.t_args("welcome", "en", &[("name", "buyer")]);
    assert!(message.starts_with("👋 Hello, buyer!"));
}

#[test]
fn test_missing_argument_keeps_rest_of_message() {
    let manager = setup_localization();

    let message = manager.t("welcome", "en");
    assert!(message.starts_with("👋 Hello, "));
    assert!(message.contains("$name"));
    assert!(message.contains("I will help you place an order"));
}

#[test]
fn test_multiline_help() {
    let manager = setup_localization();

    let help = manager.t("help", "ru");
    assert_eq!(help.lines().count(), 4);
    assert!(help.contains("/start"));
    assert!(help.contains("/cancel"));
}

#[test]
fn test_language_detection() {
    assert_eq!(detect_language(Some("en")), "en");
    assert_eq!(detect_language(Some("en-US")), "en");
    assert_eq!(detect_language(Some("EN-gb")), "en");
    assert_eq!(detect_language(Some("ru")), "ru");
    assert_eq!(detect_language(Some("zh-hans")), "ru");
    assert_eq!(detect_language(None), "ru");
}
