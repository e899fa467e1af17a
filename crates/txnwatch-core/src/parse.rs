//! Consumer-side transaction-detail extraction from matched message
//! bodies.
//!
//! The pipeline never depends on parse success — classification and
//! dispatch work on the raw body. This module is for consumers that want
//! structured detail (amount, direction, account, date) out of a matched
//! message.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Detail Model ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Salary,
    Business,
    OtherIncome,
    Grocery,
    Food,
    Transport,
    Health,
    OtherExpense,
}

/// Structured detail extracted from one transaction message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub direction: Direction,
    pub amount: f64,
    /// Masked account fragment as printed in the message (e.g. "XX9326").
    pub account_tail: String,
    /// Transaction value date when the message carries a parseable one.
    pub value_date: Option<NaiveDate>,
    pub description: String,
    pub category: Category,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no transaction pattern matched")]
    NoMatch,

    #[error("unparseable amount: {0}")]
    Amount(String),
}

// ─── Patterns ─────────────────────────────────────────────────────

// Credit shape: "Rs.9360.00 Credited to your Ac XX9326 on 03-10-25 by UPI ref No...."
static CREDIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Rs\.?\s*([\d,]+\.?\d*)\s*credited\s*to\s*your\s*Ac\s*(\w+)\s*\bon\s*([\d-]+)")
        .expect("credit pattern")
});

// Debit shape: "Rs.24.00 debited A/cXX9326 and credited to x@y via UPI Ref No ... on 30Sep25"
static DEBIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Rs\.?\s*([\d,]+\.?\d*)\s*debited\s*A/c\s*(\w+).*?\bon\s*(\d{1,2}[A-Za-z]{3}\d{2}|[\d-]+)")
        .expect("debit pattern")
});

static VPA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)credited\s*to\s*([^@\s]+@[^@\s]+)").expect("vpa pattern"));

// ─── Parsing ──────────────────────────────────────────────────────

/// Parse structured transaction detail out of a message body.
///
/// Tries the credit shape first, then the debit shape. Bodies matching
/// neither are a typed [`ParseError::NoMatch`], not a pipeline failure.
pub fn parse_detail(body: &str) -> Result<TransactionDetail, ParseError> {
    let text = normalize_whitespace(body);

    if let Some(caps) = CREDIT_RE.captures(&text) {
        let amount = parse_amount(&caps[1])?;
        let description = credit_description(&text);
        return Ok(TransactionDetail {
            direction: Direction::Credit,
            amount,
            account_tail: caps[2].to_owned(),
            value_date: parse_value_date(&caps[3]),
            category: categorize(&description, Direction::Credit),
            description,
        });
    }

    if let Some(caps) = DEBIT_RE.captures(&text) {
        let amount = parse_amount(&caps[1])?;
        let description = debit_description(&text);
        return Ok(TransactionDetail {
            direction: Direction::Debit,
            amount,
            account_tail: caps[2].to_owned(),
            value_date: parse_value_date(&caps[3]),
            category: categorize(&description, Direction::Debit),
            description,
        });
    }

    Err(ParseError::NoMatch)
}

fn normalize_whitespace(body: &str) -> String {
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_amount(raw: &str) -> Result<f64, ParseError> {
    raw.replace(',', "")
        .parse::<f64>()
        .map_err(|_| ParseError::Amount(raw.to_owned()))
}

/// Parse a value date in either "03-10-25" (DD-MM-YY) or "30Sep25"
/// (DDMonYY) form. Unrecognized forms yield `None`.
fn parse_value_date(raw: &str) -> Option<NaiveDate> {
    if raw.contains('-') {
        let mut parts = raw.splitn(3, '-');
        let day: u32 = parts.next()?.parse().ok()?;
        let month: u32 = parts.next()?.parse().ok()?;
        let year: i32 = parts.next()?.parse().ok()?;
        return NaiveDate::from_ymd_opt(2000 + year, month, day);
    }

    static COMPACT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)^(\d{1,2})([A-Za-z]{3})(\d{2})$").expect("date pattern"));
    let caps = COMPACT_RE.captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = match caps[2].to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + year, month, day)
}

fn contains_ci(text: &str, needle: &str) -> bool {
    text.to_uppercase().contains(&needle.to_uppercase())
}

fn credit_description(text: &str) -> String {
    if contains_ci(text, "UPI") {
        "UPI credit received".to_owned()
    } else if contains_ci(text, "NEFT") {
        "NEFT credit received".to_owned()
    } else if contains_ci(text, "RTGS") {
        "RTGS credit received".to_owned()
    } else if contains_ci(text, "Salary") {
        "Salary credit".to_owned()
    } else {
        "Bank credit".to_owned()
    }
}

fn debit_description(text: &str) -> String {
    if contains_ci(text, "UPI") {
        if let Some(caps) = VPA_RE.captures(text) {
            return format!("UPI to {}", &caps[1]);
        }
        "UPI payment".to_owned()
    } else if contains_ci(text, "ATM") {
        "ATM withdrawal".to_owned()
    } else if contains_ci(text, "POS") {
        "Card payment".to_owned()
    } else {
        "Bank debit".to_owned()
    }
}

fn categorize(description: &str, direction: Direction) -> Category {
    let desc = description.to_lowercase();
    match direction {
        Direction::Credit => {
            if desc.contains("salary") {
                Category::Salary
            } else if desc.contains("business") {
                Category::Business
            } else {
                Category::OtherIncome
            }
        }
        Direction::Debit => {
            if desc.contains("grocery") || desc.contains("mart") {
                Category::Grocery
            } else if desc.contains("food") || desc.contains("restaurant") {
                Category::Food
            } else if desc.contains("fuel") || desc.contains("petrol") {
                Category::Transport
            } else if desc.contains("medicine") || desc.contains("hospital") {
                Category::Health
            } else {
                Category::OtherExpense
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
