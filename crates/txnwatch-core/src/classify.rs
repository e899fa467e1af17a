//! Heuristic message classification: bank-identifier and
//! transaction-keyword containment matching.
//!
//! Both match lists are configuration data, not embedded logic — adding a
//! bank or a keyword is a data change. No guarantee of zero false
//! positives/negatives.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ClassificationVerdict;

// ─── Rules ────────────────────────────────────────────────────────

/// Configured substring sets driving the classifier.
///
/// Matching is case-insensitive substring containment: an identifier or
/// keyword occurring anywhere in the field qualifies. Defaults are the
/// deployed sender-code and keyword lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRules {
    /// Known banking short-codes and name fragments matched against the
    /// sender field.
    #[serde(default = "default_bank_identifiers")]
    pub bank_identifiers: Vec<String>,
    /// Financial-transaction terms matched against the message body.
    #[serde(default = "default_transaction_keywords")]
    pub transaction_keywords: Vec<String>,
}

fn default_bank_identifiers() -> Vec<String> {
    [
        "BOIIND", "SBIINB", "HDFCBK", "ICICIB", "AXISBK", "KOTAKB", "YESBK", "INDUSB", "BOI",
        "SBI", "HDFC", "ICICI", "AXIS", "KOTAK", "YES", "INDUS",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_transaction_keywords() -> Vec<String> {
    [
        "DEBITED",
        "CREDITED",
        "DEBIT",
        "CREDIT",
        "WITHDRAWN",
        "DEPOSIT",
        "PAYMENT",
        "TRANSFER",
        "TRANSACTION",
        "PURCHASE",
        "UPI",
        "NEFT",
        "RTGS",
        "ATM",
        "POS",
        "CARD",
        "A/C",
        "ACCOUNT",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            bank_identifiers: default_bank_identifiers(),
            transaction_keywords: default_transaction_keywords(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("invalid rules JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rules must configure at least one bank identifier and one transaction keyword")]
    Empty,
}

impl ClassifierRules {
    /// Parse rules from a JSON document. Omitted lists fall back to the
    /// defaults; explicitly empty lists are rejected (they would classify
    /// everything negative, which is a configuration mistake, not a
    /// policy).
    pub fn from_json_str(json: &str) -> Result<Self, RulesError> {
        let rules: Self = serde_json::from_str(json)?;
        if rules.bank_identifiers.is_empty() || rules.transaction_keywords.is_empty() {
            return Err(RulesError::Empty);
        }
        Ok(rules)
    }
}

// ─── Classifier ───────────────────────────────────────────────────

/// Pure classifier: (sender, body) → verdict.
///
/// Fails closed: absent or empty sender/body yields a negative verdict.
/// Never errors.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Uppercased at construction so per-message work normalizes only the
    /// message fields.
    bank_identifiers: Vec<String>,
    transaction_keywords: Vec<String>,
}

impl Classifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self {
            bank_identifiers: rules
                .bank_identifiers
                .iter()
                .map(|s| s.to_uppercase())
                .collect(),
            transaction_keywords: rules
                .transaction_keywords
                .iter()
                .map(|s| s.to_uppercase())
                .collect(),
        }
    }

    /// Classify one message.
    ///
    /// Positive iff the sender contains a configured bank identifier AND
    /// the body contains a configured transaction keyword. Short-circuits
    /// on sender failure — the body is never scanned for a non-bank
    /// sender.
    pub fn classify(&self, sender: Option<&str>, body: Option<&str>) -> ClassificationVerdict {
        let Some(sender) = sender.filter(|s| !s.is_empty()) else {
            return ClassificationVerdict::negative();
        };
        let sender_upper = sender.to_uppercase();
        if !self
            .bank_identifiers
            .iter()
            .any(|id| sender_upper.contains(id))
        {
            return ClassificationVerdict::negative();
        }

        let Some(body) = body.filter(|b| !b.is_empty()) else {
            return ClassificationVerdict::negative();
        };
        let body_upper = body.to_uppercase();
        if self
            .transaction_keywords
            .iter()
            .any(|kw| body_upper.contains(kw))
        {
            ClassificationVerdict::positive()
        } else {
            ClassificationVerdict::negative()
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierRules::default())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
