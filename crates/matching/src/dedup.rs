use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tally_core::{ExternalTransaction, LedgerEntry, Money};

use crate::config::{ConfigWarning, DedupSettings};
use crate::index::CandidateIndex;
use crate::similarity::{
    amount_within_tolerance, date_diff_days, date_proximity, references_equal, TextSimilarity,
    WordJaccard,
};

// Confidence weights, in hundredths.
const SAME_DATE: u32 = 30;
const NEAR_DATE: u32 = 10;
const EXACT_AMOUNT: u32 = 40;
const NEAR_AMOUNT: u32 = 20;
const DESCRIPTION_STRONG: u32 = 30;
const DESCRIPTION_WEAK: u32 = 15;
const SAME_MERCHANT: u32 = 20;
const SAME_REFERENCE: u32 = 30;

const REPORT_THRESHOLD: u32 = 70;
const DEFINITE_THRESHOLD: u32 = 90;
const CONFIDENCE_CAP: u32 = 100;

const STRONG_TEXT_SIMILARITY: f32 = 0.8;
const WEAK_TEXT_SIMILARITY: f32 = 0.5;

/// Where the counterpart of a duplicate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateOrigin {
    /// The caller-supplied history.
    History,
    /// A transaction this detector accepted in an earlier batch.
    EarlierBatch,
    /// A transaction accepted earlier in the same batch.
    SameBatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub transaction: ExternalTransaction,
    pub matched_with: ExternalTransaction,
    pub confidence: f32,
    pub reasons: Vec<String>,
    pub is_definite: bool,
    pub origin: DuplicateOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupStats {
    pub total_checked: usize,
    pub unique: usize,
    pub potential_duplicates: usize,
    pub definite_duplicates: usize,
    pub ignored: usize,
    /// (potential + definite) / total, 0 for an empty batch.
    pub duplicate_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeduplicationResult {
    pub unique: Vec<ExternalTransaction>,
    pub potential_duplicates: Vec<DuplicateMatch>,
    pub definite_duplicates: Vec<DuplicateMatch>,
    /// Zero-amount lines, never screened.
    pub ignored: Vec<ExternalTransaction>,
    pub stats: DedupStats,
    #[serde(default)]
    pub warnings: Vec<ConfigWarning>,
}

impl DeduplicationResult {
    fn record(&mut self, found: DuplicateMatch) {
        if found.is_definite {
            self.definite_duplicates.push(found);
        } else {
            self.potential_duplicates.push(found);
        }
    }

    fn finish(&mut self, total_checked: usize) {
        let duplicates = self.potential_duplicates.len() + self.definite_duplicates.len();
        self.stats = DedupStats {
            total_checked,
            unique: self.unique.len(),
            potential_duplicates: self.potential_duplicates.len(),
            definite_duplicates: self.definite_duplicates.len(),
            ignored: self.ignored.len(),
            duplicate_rate: if total_checked > 0 {
                duplicates as f64 / total_checked as f64
            } else {
                0.0
            },
        };
    }
}

/// A transaction paired with its content hash so it is hashed once.
#[derive(Debug, Clone)]
struct Hashed {
    txn: ExternalTransaction,
    hash: String,
}

impl Hashed {
    fn new(txn: &ExternalTransaction) -> Self {
        Self {
            hash: txn.content_hash(),
            txn: txn.clone(),
        }
    }
}

impl LedgerEntry for Hashed {
    fn id(&self) -> &str {
        &self.txn.id
    }

    fn date(&self) -> NaiveDate {
        self.txn.date
    }

    fn amount(&self) -> Money {
        self.txn.amount
    }
}

/// Duplicate screening session.
///
/// Stops at the first counterpart that clears the report threshold rather
/// than searching for the best one. Keeps the last history it was given
/// (with its index) and every transaction it accepted as unique, so later
/// batches are also screened against earlier ones. Call
/// [`DuplicateDetector::reset`] to forget both.
///
/// Not shareable between concurrent batches: use one detector per batch
/// stream.
#[derive(Debug, Clone)]
pub struct DuplicateDetector<S = WordJaccard> {
    settings: DedupSettings,
    similarity: S,
    history: Vec<Hashed>,
    /// Position in the caller's `existing` slice of each `history` entry.
    history_source: Vec<usize>,
    index: CandidateIndex,
    seen: HashMap<String, ExternalTransaction>,
}

impl Default for DuplicateDetector<WordJaccard> {
    fn default() -> Self {
        Self::new(DedupSettings::default())
    }
}

impl DuplicateDetector<WordJaccard> {
    pub fn new(settings: DedupSettings) -> Self {
        Self::with_similarity(settings, WordJaccard)
    }
}

impl<S: TextSimilarity> DuplicateDetector<S> {
    pub fn with_similarity(settings: DedupSettings, similarity: S) -> Self {
        let index = CandidateIndex::new(settings.index_bypass_threshold);
        Self {
            settings,
            similarity,
            history: Vec::new(),
            history_source: Vec::new(),
            index,
            seen: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &DedupSettings {
        &self.settings
    }

    /// Number of distinct transactions accepted as unique since the last reset.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.history_source.clear();
        self.index.clear();
        self.seen.clear();
    }

    /// First transaction in `existing` that `txn` duplicates, if any.
    pub fn check_single(
        &self,
        txn: &ExternalTransaction,
        existing: &[ExternalTransaction],
    ) -> Option<DuplicateMatch> {
        if txn.amount.is_zero() {
            return None;
        }
        let hash = txn.content_hash();
        existing
            .iter()
            .filter(|other| !other.amount.is_zero())
            .find_map(|other| {
                self.compare(txn, &hash, other, &other.content_hash(), DuplicateOrigin::History)
            })
    }

    /// Screen `new` against `existing`, then against itself.
    ///
    /// Each transaction is compared with the history first, then with
    /// transactions accepted in earlier batches, then with those already
    /// accepted from this batch.
    pub fn check_batch(
        &mut self,
        new: &[ExternalTransaction],
        existing: &[ExternalTransaction],
    ) -> DeduplicationResult {
        self.load_history(existing);

        let mut result = DeduplicationResult {
            warnings: self.configuration_warnings(),
            ..DeduplicationResult::default()
        };
        for warning in &result.warnings {
            tracing::warn!("Dedup batch: {warning}");
        }
        let mut accepted: Vec<Hashed> = Vec::new();

        for txn in new {
            if txn.amount.is_zero() {
                result.ignored.push(txn.clone());
                continue;
            }
            let hash = txn.content_hash();
            let found = self
                .find_in_history(txn, &hash, existing)
                .or_else(|| self.find_in_seen(txn, &hash))
                .or_else(|| self.find_in_batch(txn, &hash, &accepted));

            match found {
                Some(duplicate) => result.record(duplicate),
                None => accepted.push(Hashed {
                    txn: txn.clone(),
                    hash,
                }),
            }
        }

        for item in &accepted {
            self.seen
                .entry(item.hash.clone())
                .or_insert_with(|| item.txn.clone());
        }
        result.unique = accepted.into_iter().map(|item| item.txn).collect();
        result.finish(new.len());

        tracing::debug!(
            "Dedup batch: {} checked, {} unique, {} potential, {} definite, {} ignored",
            result.stats.total_checked,
            result.stats.unique,
            result.stats.potential_duplicates,
            result.stats.definite_duplicates,
            result.stats.ignored
        );
        result
    }

    fn configuration_warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.settings.date_tolerance_days == 0 && self.settings.amount_tolerance.is_zero() {
            warnings.push(ConfigWarning::ZeroTolerance);
        }
        warnings
    }

    /// Replace the stored history and rebuild its index.
    fn load_history(&mut self, existing: &[ExternalTransaction]) {
        let (source, history): (Vec<usize>, Vec<Hashed>) = existing
            .iter()
            .enumerate()
            .filter(|(_, txn)| !txn.amount.is_zero())
            .map(|(pos, txn)| (pos, Hashed::new(txn)))
            .unzip();
        self.history_source = source;
        self.history = history;
        self.index.rebuild(&self.history);
    }

    /// Scores against the caller's own elements so a transaction passed in
    /// both `new` and `existing` is never matched with itself.
    fn find_in_history(
        &self,
        txn: &ExternalTransaction,
        hash: &str,
        existing: &[ExternalTransaction],
    ) -> Option<DuplicateMatch> {
        self.index.candidates_for(txn).into_iter().find_map(|pos| {
            let other = existing.get(*self.history_source.get(pos)?)?;
            let other_hash = &self.history.get(pos)?.hash;
            self.compare(txn, hash, other, other_hash, DuplicateOrigin::History)
        })
    }

    fn find_in_seen(&self, txn: &ExternalTransaction, hash: &str) -> Option<DuplicateMatch> {
        self.seen
            .get(hash)
            .and_then(|other| self.compare(txn, hash, other, hash, DuplicateOrigin::EarlierBatch))
    }

    fn find_in_batch(
        &self,
        txn: &ExternalTransaction,
        hash: &str,
        accepted: &[Hashed],
    ) -> Option<DuplicateMatch> {
        accepted.iter().find_map(|other| {
            self.compare(txn, hash, &other.txn, &other.hash, DuplicateOrigin::SameBatch)
        })
    }

    /// Score one pair. `None` means the pair is not reportable.
    fn compare(
        &self,
        txn: &ExternalTransaction,
        txn_hash: &str,
        other: &ExternalTransaction,
        other_hash: &str,
        origin: DuplicateOrigin,
    ) -> Option<DuplicateMatch> {
        if std::ptr::eq(txn, other) {
            return None;
        }

        if txn_hash == other_hash {
            return Some(DuplicateMatch {
                transaction: txn.clone(),
                matched_with: other.clone(),
                confidence: 1.0,
                reasons: vec!["Exact hash match".to_string()],
                is_definite: true,
                origin,
            });
        }

        let mut points = 0;
        let mut reasons = Vec::new();

        let date = date_proximity(txn.date, other.date, self.settings.date_tolerance_days)?;
        points += if date_diff_days(txn.date, other.date) == 0 {
            SAME_DATE
        } else {
            NEAR_DATE
        };
        reasons.push(date.reason);

        let amount =
            amount_within_tolerance(txn.amount, other.amount, self.settings.amount_tolerance)?;
        points += if txn.amount == other.amount {
            EXACT_AMOUNT
        } else {
            NEAR_AMOUNT
        };
        reasons.push(amount.reason);

        let description = self
            .similarity
            .similarity(&txn.description, &other.description);
        if description > STRONG_TEXT_SIMILARITY {
            points += DESCRIPTION_STRONG;
        } else if description > WEAK_TEXT_SIMILARITY {
            points += DESCRIPTION_WEAK;
        }
        if description > WEAK_TEXT_SIMILARITY {
            reasons.push(format!("Description {:.0}% similar", description * 100.0));
        }

        if let (Some(a), Some(b)) = (txn.merchant.as_deref(), other.merchant.as_deref()) {
            if self.similarity.similarity(a, b) > STRONG_TEXT_SIMILARITY {
                points += SAME_MERCHANT;
                reasons.push("Same merchant".to_string());
            }
        }

        if references_equal(txn.reference.as_deref(), other.reference.as_deref()) {
            points += SAME_REFERENCE;
            reasons.push("Same reference number".to_string());
        }

        if points < REPORT_THRESHOLD {
            return None;
        }

        Some(DuplicateMatch {
            transaction: txn.clone(),
            matched_with: other.clone(),
            confidence: points.min(CONFIDENCE_CAP) as f32 / 100.0,
            reasons,
            is_definite: points >= DEFINITE_THRESHOLD,
            origin,
        })
    }
}

/// Screen a batch with a throwaway detector.
pub fn check_batch(
    new: &[ExternalTransaction],
    existing: &[ExternalTransaction],
    settings: &DedupSettings,
) -> DeduplicationResult {
    DuplicateDetector::new(settings.clone()).check_batch(new, existing)
}
