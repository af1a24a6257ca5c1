use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use tally_core::{DateRange, ExternalTransaction, InternalRecord, Money};

use crate::config::ConfigWarning;

/// Items listed per section in the plain-text report.
const REPORT_ITEM_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Same amount, same date.
    Exact,
    /// Bank reference found inside the book reference.
    Reference,
    /// Amount within tolerance, same date.
    AmountOnly,
    /// Amount and date both within tolerance.
    Fuzzy,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact"),
            MatchType::Reference => write!(f, "reference"),
            MatchType::AmountOnly => write!(f, "amount_only"),
            MatchType::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Unmatched,
    /// At least one book record has a plausible amount but was not confirmed.
    ManualReview,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Unmatched => write!(f, "unmatched"),
            MatchStatus::ManualReview => write!(f, "manual_review"),
        }
    }
}

/// A committed bank-to-book pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub external: ExternalTransaction,
    pub internal: InternalRecord,
    pub match_type: MatchType,
    pub confidence: f32,
    pub date_diff_days: u32,
    pub amount_diff: Money,
    pub reasons: Vec<String>,
}

/// A possible book counterpart for an unmatched bank line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub internal_id: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: String,
    pub date_diff_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedExternal {
    pub transaction: ExternalTransaction,
    pub status: MatchStatus,
    pub suggestions: Vec<Suggestion>,
    pub notes: String,
}

/// Book records are never given suggestions; only bank activity is chased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedInternal {
    pub transaction: InternalRecord,
    pub status: MatchStatus,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub opening: Money,
    pub closing: Money,
}

impl Balances {
    pub fn new(opening: Money, closing: Money) -> Self {
        Self { opening, closing }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub entity: String,
    pub account: String,
    pub period: DateRange,
    pub bank: Balances,
    pub book: Balances,
    pub matched: Vec<MatchCandidate>,
    pub unmatched_external: Vec<UnmatchedExternal>,
    pub unmatched_internal: Vec<UnmatchedInternal>,
    /// Ids of zero-amount bank lines left out of matching.
    pub ignored_external: Vec<String>,
    /// Ids of zero-amount book records left out of matching.
    pub ignored_internal: Vec<String>,
    pub warnings: Vec<ConfigWarning>,
}

impl ReconciliationResult {
    /// Matched share of bank lines, as a percentage. 0 when there are none.
    pub fn match_rate(&self) -> f64 {
        let total = self.matched.len() + self.unmatched_external.len();
        if total == 0 {
            return 0.0;
        }
        self.matched.len() as f64 / total as f64 * 100.0
    }

    pub fn total_matched_amount(&self) -> Money {
        self.matched.iter().map(|m| m.external.amount).sum()
    }

    pub fn total_unmatched_external(&self) -> Money {
        self.unmatched_external
            .iter()
            .map(|u| u.transaction.amount)
            .sum()
    }

    pub fn total_unmatched_internal(&self) -> Money {
        self.unmatched_internal
            .iter()
            .map(|u| u.transaction.amount)
            .sum()
    }

    /// Bank closing minus book closing.
    pub fn difference(&self) -> Money {
        self.bank.closing - self.book.closing
    }

    /// Balanced to the cent and no unexplained bank activity. Unmatched
    /// book records alone do not block this.
    pub fn is_reconciled(&self) -> bool {
        self.difference().abs() < Money::minor_unit() && self.unmatched_external.is_empty()
    }

    pub fn summary(&self) -> ReconciliationSummary {
        ReconciliationSummary {
            entity: self.entity.clone(),
            account: self.account.clone(),
            period_start: self.period.start,
            period_end: self.period.end,
            bank_opening: self.bank.opening,
            bank_closing: self.bank.closing,
            book_opening: self.book.opening,
            book_closing: self.book.closing,
            match_rate: self.match_rate(),
            matched_count: self.matched.len(),
            matched_amount: self.total_matched_amount(),
            unmatched_external_count: self.unmatched_external.len(),
            unmatched_external_amount: self.total_unmatched_external(),
            unmatched_internal_count: self.unmatched_internal.len(),
            unmatched_internal_amount: self.total_unmatched_internal(),
            difference: self.difference(),
            is_reconciled: self.is_reconciled(),
        }
    }
}

/// Flat view of a [`ReconciliationResult`] with every derived figure resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub entity: String,
    pub account: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub bank_opening: Money,
    pub bank_closing: Money,
    pub book_opening: Money,
    pub book_closing: Money,
    pub match_rate: f64,
    pub matched_count: usize,
    pub matched_amount: Money,
    pub unmatched_external_count: usize,
    pub unmatched_external_amount: Money,
    pub unmatched_internal_count: usize,
    pub unmatched_internal_amount: Money,
    pub difference: Money,
    pub is_reconciled: bool,
}

impl fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_reconciled() {
            "RECONCILED"
        } else {
            "NOT RECONCILED"
        };
        writeln!(f, "Bank Reconciliation Report [{status}]")?;
        writeln!(f)?;
        writeln!(f, "Entity:  {}", self.entity.to_uppercase())?;
        writeln!(f, "Account: {}", self.account)?;
        writeln!(f, "Period:  {}", self.period)?;
        writeln!(f)?;
        writeln!(f, "Balances:")?;
        writeln!(f, "  Bank closing: {}", self.bank.closing)?;
        writeln!(f, "  Book closing: {}", self.book.closing)?;
        writeln!(f, "  Difference:   {}", self.difference())?;
        writeln!(f)?;
        writeln!(f, "Matching:")?;
        writeln!(f, "  Match rate:     {:.1}%", self.match_rate())?;
        writeln!(
            f,
            "  Matched:        {} ({})",
            self.matched.len(),
            self.total_matched_amount()
        )?;
        writeln!(
            f,
            "  Unmatched bank: {} ({})",
            self.unmatched_external.len(),
            self.total_unmatched_external()
        )?;
        writeln!(
            f,
            "  Unmatched book: {} ({})",
            self.unmatched_internal.len(),
            self.total_unmatched_internal()
        )?;

        if !self.unmatched_external.is_empty() {
            writeln!(f)?;
            writeln!(f, "Unmatched bank items:")?;
            for item in self.unmatched_external.iter().take(REPORT_ITEM_LIMIT) {
                let txn = &item.transaction;
                let description: String = txn.description.chars().take(30).collect();
                writeln!(
                    f,
                    "  {}: {} - {} [{}]",
                    txn.date, txn.amount, description, item.status
                )?;
            }
            if self.unmatched_external.len() > REPORT_ITEM_LIMIT {
                writeln!(
                    f,
                    "  ...and {} more",
                    self.unmatched_external.len() - REPORT_ITEM_LIMIT
                )?;
            }
        }

        for warning in &self.warnings {
            writeln!(f, "Warning: {warning}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn empty_result(bank_closing: i64, book_closing: i64) -> ReconciliationResult {
        ReconciliationResult {
            entity: "acme".to_string(),
            account: "BDO-001".to_string(),
            period: DateRange::new(date(2025, 1, 1), date(2025, 1, 31)),
            bank: Balances::new(Money::zero(), Money::from(bank_closing)),
            book: Balances::new(Money::zero(), Money::from(book_closing)),
            matched: vec![],
            unmatched_external: vec![],
            unmatched_internal: vec![],
            ignored_external: vec![],
            ignored_internal: vec![],
            warnings: vec![],
        }
    }

    fn unmatched_bank(id: &str, amount: i64) -> UnmatchedExternal {
        UnmatchedExternal {
            transaction: ExternalTransaction::new(
                id,
                date(2025, 1, 20),
                "CHECK DEPOSIT",
                Money::from(amount),
            ),
            status: MatchStatus::Unmatched,
            suggestions: vec![],
            notes: String::new(),
        }
    }

    #[test]
    fn is_reconciled_when_balances_agree() {
        let result = empty_result(100_000, 100_000);
        assert_eq!(result.difference(), Money::zero());
        assert!(result.is_reconciled());
    }

    #[test]
    fn not_reconciled_with_difference() {
        let result = empty_result(100_000, 95_000);
        assert_eq!(result.difference(), Money::from(5000));
        assert!(!result.is_reconciled());
    }

    #[test]
    fn sub_cent_difference_still_reconciled() {
        let mut result = empty_result(0, 0);
        result.bank.closing = Money::new(rust_decimal::Decimal::new(1004, 3)); // 1.004
        result.book.closing = Money::from(1);
        assert!(result.is_reconciled());
        result.bank.closing = Money::from_cents(101);
        assert!(!result.is_reconciled());
    }

    #[test]
    fn unmatched_bank_blocks_reconciliation() {
        let mut result = empty_result(100_000, 100_000);
        result.unmatched_external.push(unmatched_bank("b1", 250));
        assert!(!result.is_reconciled());
        assert_eq!(result.total_unmatched_external(), Money::from(250));
    }

    #[test]
    fn unmatched_book_does_not_block_reconciliation() {
        let mut result = empty_result(100_000, 100_000);
        result.unmatched_internal.push(UnmatchedInternal {
            transaction: InternalRecord::new("JE-1", date(2025, 1, 3), "Accrual", Money::from(75)),
            status: MatchStatus::Unmatched,
            notes: String::new(),
        });
        assert!(result.is_reconciled());
        assert_eq!(result.total_unmatched_internal(), Money::from(75));
    }

    #[test]
    fn match_rate_empty_is_zero() {
        assert_eq!(empty_result(0, 0).match_rate(), 0.0);
    }

    #[test]
    fn summary_mirrors_derived_values() {
        let mut result = empty_result(100_000, 95_000);
        result.unmatched_external.push(unmatched_bank("b1", 5000));
        let summary = result.summary();
        assert_eq!(summary.difference, Money::from(5000));
        assert_eq!(summary.unmatched_external_count, 1);
        assert_eq!(summary.unmatched_external_amount, Money::from(5000));
        assert!(!summary.is_reconciled);
        assert_eq!(summary.period_start, date(2025, 1, 1));
    }

    #[test]
    fn report_lists_unmatched_items_with_overflow() {
        let mut result = empty_result(100_000, 95_000);
        for i in 0..7 {
            result.unmatched_external.push(unmatched_bank(&format!("b{i}"), 100 + i));
        }
        let report = result.to_string();
        assert!(report.contains("Bank Reconciliation Report [NOT RECONCILED]"));
        assert!(report.contains("Entity:  ACME"));
        assert!(report.contains("Difference:   5000.00"));
        assert!(report.contains("...and 2 more"));
        assert_eq!(report.matches("CHECK DEPOSIT").count(), 5);
    }

    #[test]
    fn match_type_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&MatchType::AmountOnly).unwrap(), "\"amount_only\"");
        assert_eq!(MatchType::AmountOnly.to_string(), "amount_only");
        assert_eq!(serde_json::to_string(&MatchStatus::ManualReview).unwrap(), "\"manual_review\"");
    }
}
