use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use tally_core::{DateRange, ExternalTransaction, InternalRecord, LedgerEntry, Money};

use crate::config::{ConfigWarning, ReconcileSettings, Side};
use crate::report::{
    Balances, MatchCandidate, MatchStatus, MatchType, ReconciliationResult, Suggestion,
    UnmatchedExternal, UnmatchedInternal,
};
use crate::similarity::{
    amount_within_tolerance, date_diff_days, date_proximity, reference_contains,
};

/// Suggestions kept per unmatched bank line.
const MAX_SUGGESTIONS: usize = 5;

/// Confidence in hundredths, so ties compare exactly.
const EXACT_CONFIDENCE: u32 = 100;
const REFERENCE_CONFIDENCE: u32 = 90;
const AMOUNT_ONLY_CONFIDENCE: u32 = 95;
const FUZZY_FLOOR: u32 = 70;
const FUZZY_STEP_PER_DAY: u32 = 10;

const OUTSIDE_PERIOD_NOTE: &str = "Dated outside the reconciliation period";

/// Everything needed to reconcile one account for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub entity: String,
    pub account: String,
    pub period: DateRange,
    #[serde(default)]
    pub external: Vec<ExternalTransaction>,
    #[serde(default)]
    pub internal: Vec<InternalRecord>,
    #[serde(default)]
    pub bank: Balances,
    #[serde(default)]
    pub book: Balances,
}

/// Three-phase bank-to-book matcher: exact, then reference, then tolerance.
///
/// Each phase only sees records left over by the phases before it, and a
/// record leaves the pool the moment it is matched. Phase order is therefore
/// the tie-break: an earlier phase always wins over a later, possibly
/// higher-scoring, candidate.
///
/// Holds no state between runs; one instance can serve any number of
/// unrelated reconciliations.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    settings: ReconcileSettings,
}

/// Phase-3 score for one bank/book pair.
struct Scored {
    match_type: MatchType,
    confidence: u32,
    date_diff: u32,
    amount_diff: Money,
    reasons: Vec<String>,
}

impl Scored {
    /// Higher confidence first, then closer date, then closer amount.
    fn ranks_above(&self, other: &Scored) -> bool {
        other
            .confidence
            .cmp(&self.confidence)
            .then(self.date_diff.cmp(&other.date_diff))
            .then(self.amount_diff.cmp(&other.amount_diff))
            == Ordering::Less
    }
}

impl Reconciler {
    pub fn new(settings: ReconcileSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    pub fn reconcile(&self, request: &ReconcileRequest) -> ReconciliationResult {
        let (external, ignored_external) = matchable(&request.external);
        let (internal, ignored_internal) = matchable(&request.internal);
        let warnings = self.configuration_warnings(external.len(), internal.len());
        for warning in &warnings {
            tracing::warn!(
                "Reconciliation {}/{}: {warning}",
                request.entity,
                request.account
            );
        }

        let mut pool = Pool::new(&external, &internal);
        self.match_exact(&mut pool);
        tracing::debug!("Exact phase matched {}", pool.matched.len());
        self.match_reference(&mut pool);
        tracing::debug!("Reference phase brought matches to {}", pool.matched.len());
        self.match_tolerance(&mut pool);
        tracing::debug!("Tolerance phase brought matches to {}", pool.matched.len());

        let unmatched_external = pool
            .remaining_external()
            .map(|ext| self.unmatched_external(ext, &pool, request.period))
            .collect::<Vec<_>>();
        let unmatched_internal = pool
            .remaining_internal()
            .map(|int| UnmatchedInternal {
                transaction: int.clone(),
                status: MatchStatus::Unmatched,
                notes: period_note(request.period, int),
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "Reconciled {}/{}: {} matched, {} unmatched bank, {} unmatched book",
            request.entity,
            request.account,
            pool.matched.len(),
            unmatched_external.len(),
            unmatched_internal.len()
        );

        ReconciliationResult {
            entity: request.entity.clone(),
            account: request.account.clone(),
            period: request.period,
            bank: request.bank,
            book: request.book,
            matched: pool.matched,
            unmatched_external,
            unmatched_internal,
            ignored_external,
            ignored_internal,
            warnings,
        }
    }

    fn configuration_warnings(&self, external: usize, internal: usize) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.settings.date_tolerance_days == 0 && self.settings.amount_tolerance.is_zero() {
            warnings.push(ConfigWarning::ZeroTolerance);
        }
        if external == 0 && internal > 0 {
            warnings.push(ConfigWarning::EmptyPool { side: Side::Bank });
        }
        if internal == 0 && external > 0 {
            warnings.push(ConfigWarning::EmptyPool { side: Side::Book });
        }
        warnings
    }

    /// Phase 1: same amount on the same day. First open book record wins.
    fn match_exact(&self, pool: &mut Pool<'_>) {
        for i in 0..pool.external.len() {
            if pool.external_done[i] {
                continue;
            }
            let ext = pool.external[i];
            let found = pool
                .open_internal()
                .find(|(_, int)| int.amount == ext.amount && int.date == ext.date)
                .map(|(j, _)| j);
            if let Some(j) = found {
                pool.commit(
                    i,
                    j,
                    MatchType::Exact,
                    EXACT_CONFIDENCE,
                    vec!["Exact amount and date".to_string()],
                );
            }
        }
    }

    /// Phase 2: bank reference contained in the book reference. No amount or
    /// date gate applies.
    fn match_reference(&self, pool: &mut Pool<'_>) {
        for i in 0..pool.external.len() {
            if pool.external_done[i] {
                continue;
            }
            let ext = pool.external[i];
            let Some(reference) = ext.reference.as_deref() else {
                continue;
            };
            let found = pool
                .open_internal()
                .find(|(_, int)| reference_contains(Some(reference), int.reference.as_deref()))
                .map(|(j, _)| j);
            if let Some(j) = found {
                pool.commit(
                    i,
                    j,
                    MatchType::Reference,
                    REFERENCE_CONFIDENCE,
                    vec![format!("Reference {reference} found in book reference")],
                );
            }
        }
    }

    /// Phase 3: amount and date within tolerance; best candidate per bank line.
    fn match_tolerance(&self, pool: &mut Pool<'_>) {
        for i in 0..pool.external.len() {
            if pool.external_done[i] {
                continue;
            }
            let ext = pool.external[i];
            let mut best: Option<(usize, Scored)> = None;
            for (j, int) in pool.open_internal() {
                let Some(scored) = self.score(ext, int) else {
                    continue;
                };
                let replace = match &best {
                    Some((_, current)) => scored.ranks_above(current),
                    None => true,
                };
                if replace {
                    best = Some((j, scored));
                }
            }
            if let Some((j, scored)) = best {
                pool.commit(i, j, scored.match_type, scored.confidence, scored.reasons);
            }
        }
    }

    fn score(&self, ext: &ExternalTransaction, int: &InternalRecord) -> Option<Scored> {
        let amount =
            amount_within_tolerance(ext.amount, int.amount, self.settings.amount_tolerance)?;
        let date = date_proximity(ext.date, int.date, self.settings.date_tolerance_days)?;
        let date_diff = date_diff_days(ext.date, int.date);

        let (match_type, confidence) = if date_diff == 0 && ext.amount == int.amount {
            (MatchType::Exact, EXACT_CONFIDENCE)
        } else if date_diff == 0 {
            (MatchType::AmountOnly, AMOUNT_ONLY_CONFIDENCE)
        } else {
            let decayed =
                EXACT_CONFIDENCE.saturating_sub(FUZZY_STEP_PER_DAY.saturating_mul(date_diff));
            (MatchType::Fuzzy, decayed.max(FUZZY_FLOOR))
        };

        Some(Scored {
            match_type,
            confidence,
            date_diff,
            amount_diff: (ext.amount - int.amount).abs(),
            reasons: vec![amount.reason, date.reason],
        })
    }

    /// Unmatched bank line, with open book records whose amount is plausible
    /// regardless of date. Suggestions are ranked by date proximity only.
    fn unmatched_external(
        &self,
        ext: &ExternalTransaction,
        pool: &Pool<'_>,
        period: DateRange,
    ) -> UnmatchedExternal {
        let mut suggestions: Vec<Suggestion> = pool
            .open_internal()
            .filter(|(_, int)| {
                amount_within_tolerance(ext.amount, int.amount, self.settings.amount_tolerance)
                    .is_some()
            })
            .map(|(_, int)| Suggestion {
                internal_id: int.id.clone(),
                amount: int.amount,
                date: int.date,
                description: int.description.clone(),
                date_diff_days: date_diff_days(ext.date, int.date),
            })
            .collect();
        suggestions.sort_by_key(|s| s.date_diff_days);
        suggestions.truncate(MAX_SUGGESTIONS);

        let status = if suggestions.is_empty() {
            MatchStatus::Unmatched
        } else {
            MatchStatus::ManualReview
        };

        UnmatchedExternal {
            transaction: ext.clone(),
            status,
            suggestions,
            notes: period_note(period, ext),
        }
    }
}

/// Reconcile with a throwaway [`Reconciler`].
pub fn reconcile(request: &ReconcileRequest, settings: &ReconcileSettings) -> ReconciliationResult {
    Reconciler::new(settings.clone()).reconcile(request)
}

/// Working state for one run: both sides sorted, with per-record match flags.
struct Pool<'a> {
    external: Vec<&'a ExternalTransaction>,
    internal: Vec<&'a InternalRecord>,
    external_done: Vec<bool>,
    internal_done: Vec<bool>,
    matched: Vec<MatchCandidate>,
}

impl<'a> Pool<'a> {
    fn new(external: &[&'a ExternalTransaction], internal: &[&'a InternalRecord]) -> Self {
        let mut external = external.to_vec();
        let mut internal = internal.to_vec();
        sort_for_matching(&mut external);
        sort_for_matching(&mut internal);
        Self {
            external_done: vec![false; external.len()],
            internal_done: vec![false; internal.len()],
            external,
            internal,
            matched: Vec::new(),
        }
    }

    fn open_internal(&self) -> impl Iterator<Item = (usize, &'a InternalRecord)> + '_ {
        self.internal
            .iter()
            .copied()
            .enumerate()
            .filter(|(j, _)| !self.internal_done[*j])
    }

    fn remaining_external(&self) -> impl Iterator<Item = &'a ExternalTransaction> + '_ {
        self.external
            .iter()
            .copied()
            .enumerate()
            .filter(|(i, _)| !self.external_done[*i])
            .map(|(_, ext)| ext)
    }

    fn remaining_internal(&self) -> impl Iterator<Item = &'a InternalRecord> + '_ {
        self.open_internal().map(|(_, int)| int)
    }

    fn commit(
        &mut self,
        i: usize,
        j: usize,
        match_type: MatchType,
        confidence: u32,
        reasons: Vec<String>,
    ) {
        let ext = self.external[i];
        let int = self.internal[j];
        self.external_done[i] = true;
        self.internal_done[j] = true;
        self.matched.push(MatchCandidate {
            external: ext.clone(),
            internal: int.clone(),
            match_type,
            confidence: confidence as f32 / 100.0,
            date_diff_days: date_diff_days(ext.date, int.date),
            amount_diff: (ext.amount - int.amount).abs(),
            reasons,
        });
    }
}

/// Splits out zero-amount records, returning the rest and the skipped ids.
fn matchable<T: LedgerEntry>(items: &[T]) -> (Vec<&T>, Vec<String>) {
    let mut kept = Vec::with_capacity(items.len());
    let mut ignored = Vec::new();
    for item in items {
        if item.amount().is_zero() {
            ignored.push(item.id().to_string());
        } else {
            kept.push(item);
        }
    }
    (kept, ignored)
}

/// Ascending by (date, amount, id) so the outcome does not depend on input order.
fn sort_for_matching<T: LedgerEntry>(items: &mut [&T]) {
    items.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then(a.amount().cmp(&b.amount()))
            .then_with(|| a.id().cmp(b.id()))
    });
}

fn period_note<T: LedgerEntry>(period: DateRange, item: &T) -> String {
    if period.contains(item.date()) {
        String::new()
    } else {
        OUTSIDE_PERIOD_NOTE.to_string()
    }
}
