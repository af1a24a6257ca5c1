use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::hash::content_hash;
use super::money::Money;

/// Anything with a calendar date and a signed amount can be matched.
pub trait LedgerEntry {
    fn id(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn amount(&self) -> Money;
}

impl<T: LedgerEntry + ?Sized> LedgerEntry for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn amount(&self) -> Money {
        (**self).amount()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Debit => write!(f, "debit"),
            TransactionType::Credit => write!(f, "credit"),
        }
    }
}

/// A bank or e-wallet statement line, already normalized by ingestion.
///
/// `id` is only unique within the batch it arrived in. Duplicate detection
/// compares [`ExternalTransaction::content_hash`], never the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub balance: Option<Money>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
    /// Source fields as delivered by the parser, any JSON shape; never inspected here.
    #[serde(default)]
    pub raw: BTreeMap<String, Value>,
}

impl ExternalTransaction {
    pub fn new(id: &str, date: NaiveDate, description: &str, amount: Money) -> Self {
        ExternalTransaction {
            id: id.to_string(),
            date,
            description: description.to_string(),
            amount,
            balance: None,
            reference: None,
            merchant: None,
            transaction_type: None,
            raw: BTreeMap::new(),
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn with_merchant(mut self, merchant: &str) -> Self {
        self.merchant = Some(merchant.to_string());
        self
    }

    pub fn with_balance(mut self, balance: Money) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn content_hash(&self) -> String {
        content_hash(
            self.date,
            self.amount,
            &self.description,
            self.reference.as_deref(),
        )
    }
}

impl LedgerEntry for ExternalTransaction {
    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn amount(&self) -> Money {
        self.amount
    }
}

/// A transaction already posted to the books for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalRecord {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub account_code: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub source: String,
    /// Owned by the caller; matching never flips it.
    #[serde(default)]
    pub reconciled: bool,
}

impl InternalRecord {
    pub fn new(id: &str, date: NaiveDate, description: &str, amount: Money) -> Self {
        InternalRecord {
            id: id.to_string(),
            date,
            description: description.to_string(),
            amount,
            account_code: String::new(),
            account_name: String::new(),
            entity: String::new(),
            reference: None,
            source: String::new(),
            reconciled: false,
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn with_account(mut self, code: &str, name: &str) -> Self {
        self.account_code = code.to_string();
        self.account_name = name.to_string();
        self
    }

    pub fn with_entity(mut self, entity: &str) -> Self {
        self.entity = entity.to_string();
        self
    }
}

impl LedgerEntry for InternalRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn amount(&self) -> Money {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn content_hash_ignores_id_and_merchant() {
        let a = ExternalTransaction::new("row-1", date(2025, 1, 15), "GRAB FOOD", Money::from(350));
        let b = ExternalTransaction::new("row-9", date(2025, 1, 15), "GRAB FOOD", Money::from(350))
            .with_merchant("Grab");
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn content_hash_includes_reference() {
        let a = ExternalTransaction::new("1", date(2025, 1, 15), "GRAB FOOD", Money::from(350));
        let b = a.clone().with_reference("GF-123");
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn builders_set_fields() {
        let rec = InternalRecord::new("JE-1", date(2025, 1, 15), "Rent", Money::from(-20000))
            .with_reference("INV-7")
            .with_account("6100", "Rent Expense")
            .with_entity("acme");
        assert_eq!(rec.reference.as_deref(), Some("INV-7"));
        assert_eq!(rec.account_code, "6100");
        assert_eq!(rec.account_name, "Rent Expense");
        assert_eq!(rec.entity, "acme");
        assert!(!rec.reconciled);
    }

    #[test]
    fn deserialize_with_optional_fields_missing() {
        let json = r#"{"id":"b1","date":"2025-01-15","description":"ATM","amount":"-2000.00"}"#;
        let txn: ExternalTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(txn.amount, Money::from(-2000));
        assert!(txn.reference.is_none());
        assert!(txn.raw.is_empty());
    }

    #[test]
    fn raw_accepts_any_json_value() {
        let json = r#"{
            "id": "b1",
            "date": "2025-01-15",
            "description": "ATM",
            "amount": "-2000.00",
            "raw": {"row": 12, "cleared": true, "memo": null, "cols": ["a", "b"]}
        }"#;
        let txn: ExternalTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(txn.raw["row"], serde_json::json!(12));
        assert_eq!(txn.raw["cleared"], serde_json::json!(true));
        assert!(txn.raw["memo"].is_null());

        let bare = ExternalTransaction::new("b1", date(2025, 1, 15), "ATM", Money::from(-2000));
        assert_eq!(txn.content_hash(), bare.content_hash());
    }

    #[test]
    fn ledger_entry_through_reference() {
        let txn = ExternalTransaction::new("b1", date(2025, 1, 15), "ATM", Money::from(10));
        let r = &txn;
        assert_eq!(LedgerEntry::id(&r), "b1");
        assert_eq!(LedgerEntry::amount(&r), Money::from(10));
    }
}
