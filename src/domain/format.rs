// Locale-aware number and currency formatting
use chrono::{DateTime, TimeZone};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "vi-VN")]
    ViVn,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    fn group_separator(self) -> char {
        match self {
            Locale::ViVn => '.',
            Locale::EnUs => ',',
        }
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// Integer with thousands grouping: `1234567` → `1.234.567` (vi-VN).
pub fn format_number(n: i64, locale: Locale) -> String {
    let grouped = group_digits(&n.unsigned_abs().to_string(), locale.group_separator());
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Currency amount: `1.234.567 ₫` for vi-VN (no minor units), `$1,234.57` for en-US.
pub fn format_currency(amount: f64, locale: Locale) -> String {
    let negative = amount < 0.0;
    let sign = if negative { "-" } else { "" };
    match locale {
        Locale::ViVn => {
            let whole = amount.abs().round() as u64;
            format!("{}{} ₫", sign, group_digits(&whole.to_string(), '.'))
        }
        Locale::EnUs => {
            let cents = (amount.abs() * 100.0).round() as u64;
            let whole = group_digits(&(cents / 100).to_string(), ',');
            format!("{}${}.{:02}", sign, whole, cents % 100)
        }
    }
}

/// Integer currently shown in a text node. Every non-digit is treated as a
/// separator; a minus sign before the first digit makes it negative.
pub fn parse_displayed_integer(text: &str) -> Option<i64> {
    let mut negative = false;
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c == '-' && digits.is_empty() {
            negative = true;
        }
    }
    if digits.is_empty() {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// `HH:MM` as shown in the "last updated" label.
pub fn format_clock<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M").to_string()
}

/// `m:ss` countdown, minutes unpadded.
pub fn format_countdown(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
