//! Input validation for each step of the order dialogue.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Highest accepted price in CNY
pub const MAX_PRICE_CNY: f64 = 1_000_000.0;

/// Minimum number of digits for a phone-like contact
pub const MIN_PHONE_DIGITS: usize = 5;

lazy_static! {
    static ref PRICE_RE: Regex = Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").unwrap();
}

/// Reasons a user input is rejected
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("not an http(s) link with a host")]
    InvalidLink,
    #[error("not a number")]
    NotANumber,
    #[error("price out of range")]
    PriceOutOfRange,
    #[error("unknown shipping method")]
    UnknownShipping,
    #[error("neither an email nor a phone number")]
    InvalidContact,
    #[error("expected yes or no")]
    UnrecognizedAnswer,
}

/// Answer given at the confirmation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
}

/// Validates a product link: absolute URL, http or https, non-empty host
pub fn validate_link(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|_| ValidationError::InvalidLink)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidLink);
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::InvalidLink);
    }

    Ok(trimmed.to_string())
}

/// Parses a price in CNY, accepting `,` as the decimal separator
pub fn parse_price(input: &str) -> Result<f64, ValidationError> {
    let normalized = input.trim().replace(',', ".");
    if !PRICE_RE.is_match(&normalized) {
        return Err(ValidationError::NotANumber);
    }

    let price: f64 = normalized.parse().map_err(|_| ValidationError::NotANumber)?;
    if price <= 0.0 || price > MAX_PRICE_CNY {
        return Err(ValidationError::PriceOutOfRange);
    }

    Ok(price)
}

/// Validates contact info: an email with a dotted domain, or a phone with
/// at least [`MIN_PHONE_DIGITS`] digits
pub fn validate_contact(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();

    let is_email = trimmed
        .split_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'));
    let digits = trimmed.chars().filter(|c| c.is_numeric()).count();

    if is_email || digits >= MIN_PHONE_DIGITS {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidContact)
    }
}

/// Parses a yes/no answer in Russian or English, ignoring case
pub fn parse_confirmation(input: &str) -> Result<Confirmation, ValidationError> {
    match input.trim().to_lowercase().as_str() {
        "да" | "yes" => Ok(Confirmation::Yes),
        "нет" | "no" => Ok(Confirmation::No),
        _ => Err(ValidationError::UnrecognizedAnswer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_validation() {
        assert!(validate_link("https://item.taobao.com/item.htm?id=1").is_ok());
        assert!(validate_link("  http://example.com  ").is_ok());

        assert_eq!(validate_link("ftp://example.com"), Err(ValidationError::InvalidLink));
        assert_eq!(validate_link("example.com"), Err(ValidationError::InvalidLink));
        assert_eq!(validate_link("https://"), Err(ValidationError::InvalidLink));
        assert_eq!(validate_link(""), Err(ValidationError::InvalidLink));
    }

    #[test]
    fn test_link_trimming() {
        assert_eq!(validate_link(" https://a.cn/x ").unwrap(), "https://a.cn/x");
    }

    #[test]
    fn test_price_parsing() {
        assert_eq!(parse_price("199.99"), Ok(199.99));
        assert_eq!(parse_price("199,99"), Ok(199.99));
        assert_eq!(parse_price(" 1000000 "), Ok(1_000_000.0));

        assert_eq!(parse_price("0"), Err(ValidationError::PriceOutOfRange));
        assert_eq!(parse_price("1000000.01"), Err(ValidationError::PriceOutOfRange));
        assert_eq!(parse_price("-5"), Err(ValidationError::PriceOutOfRange));
        assert_eq!(parse_price(".5"), Ok(0.5));
        assert_eq!(parse_price("abc"), Err(ValidationError::NotANumber));
        assert_eq!(parse_price("inf"), Err(ValidationError::NotANumber));
        assert_eq!(parse_price("1e3"), Err(ValidationError::NotANumber));
    }

    #[test]
    fn test_contact_validation() {
        assert!(validate_contact("user@mail.com").is_ok());
        assert!(validate_contact("+7 (999) 123").is_ok());
        assert!(validate_contact("12345").is_ok());

        assert!(validate_contact("user@mail").is_err());
        assert!(validate_contact("user.name").is_err());
        assert!(validate_contact("1234").is_err());
    }

    #[test]
    fn test_confirmation_parsing() {
        assert_eq!(parse_confirmation("Да"), Ok(Confirmation::Yes));
        assert_eq!(parse_confirmation("YES"), Ok(Confirmation::Yes));
        assert_eq!(parse_confirmation("нет"), Ok(Confirmation::No));
        assert_eq!(parse_confirmation(" no "), Ok(Confirmation::No));
        assert!(parse_confirmation("maybe").is_err());
        assert!(parse_confirmation("да!").is_err());
    }
}
