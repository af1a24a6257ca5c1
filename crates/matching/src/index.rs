use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

use tally_core::{LedgerEntry, Money};

/// Below this many items the index is skipped and every item is a candidate.
pub const DEFAULT_BYPASS_THRESHOLD: usize = 100;

/// Amount and date buckets over a slice, used to shortlist counterparts.
///
/// Stores positions into the slice it was built from, so it is only valid
/// for that slice. There is no incremental update: any change to the backing
/// collection needs [`CandidateIndex::rebuild`].
#[derive(Debug, Clone)]
pub struct CandidateIndex {
    by_amount: HashMap<Decimal, Vec<usize>>,
    by_date: HashMap<NaiveDate, Vec<usize>>,
    len: usize,
    bypass_threshold: usize,
}

impl Default for CandidateIndex {
    fn default() -> Self {
        Self::new(DEFAULT_BYPASS_THRESHOLD)
    }
}

impl CandidateIndex {
    pub fn new(bypass_threshold: usize) -> Self {
        Self {
            by_amount: HashMap::new(),
            by_date: HashMap::new(),
            len: 0,
            bypass_threshold,
        }
    }

    pub fn build<T: LedgerEntry>(items: &[T], bypass_threshold: usize) -> Self {
        let mut index = Self::new(bypass_threshold);
        index.rebuild(items);
        index
    }

    pub fn rebuild<T: LedgerEntry>(&mut self, items: &[T]) {
        self.clear();
        for (pos, item) in items.iter().enumerate() {
            self.by_amount
                .entry(amount_key(item.amount()))
                .or_default()
                .push(pos);
            self.by_date.entry(item.date()).or_default().push(pos);
        }
        self.len = items.len();
    }

    pub fn clear(&mut self) {
        self.by_amount.clear();
        self.by_date.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the backing collection is small enough to scan in full.
    pub fn is_bypassed(&self) -> bool {
        self.len < self.bypass_threshold
    }

    /// Ascending positions sharing the truncated amount or the date of `txn`.
    pub fn candidates_for<T: LedgerEntry>(&self, txn: &T) -> Vec<usize> {
        if self.is_bypassed() {
            return (0..self.len).collect();
        }

        let mut positions = BTreeSet::new();
        if let Some(bucket) = self.by_amount.get(&amount_key(txn.amount())) {
            positions.extend(bucket.iter().copied());
        }
        if let Some(bucket) = self.by_date.get(&txn.date()) {
            positions.extend(bucket.iter().copied());
        }
        positions.into_iter().collect()
    }
}

fn amount_key(amount: Money) -> Decimal {
    amount.abs().as_decimal().trunc()
}
