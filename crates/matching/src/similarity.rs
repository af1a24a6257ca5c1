//! Pairwise scoring primitives shared by reconciliation and duplicate screening.
//!
//! Every function here is pure. A gate returns `None` when the pair is
//! rejected outright; a passing gate returns a [`Signal`] carrying a score in
//! `[0.0, 1.0]` and a human-readable reason.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use tally_core::Money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub score: f32,
    pub reason: String,
}

impl Signal {
    fn new(score: f32, reason: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }
}

/// Absolute difference between two dates in whole days.
pub fn date_diff_days(a: NaiveDate, b: NaiveDate) -> u32 {
    u32::try_from((a - b).num_days().unsigned_abs()).unwrap_or(u32::MAX)
}

/// 1.0 on the same day, decaying linearly toward the tolerance edge.
/// Beyond the tolerance the pair is rejected.
pub fn date_proximity(a: NaiveDate, b: NaiveDate, tolerance_days: u32) -> Option<Signal> {
    let diff = date_diff_days(a, b);
    if diff > tolerance_days {
        return None;
    }
    if diff == 0 {
        return Some(Signal::new(1.0, "Same date"));
    }
    let score = 1.0 - diff as f32 / (tolerance_days as f32 + 1.0);
    Some(Signal::new(score, format!("Within {diff} day(s)")))
}

/// Exact equality always passes. Otherwise passes iff `|a - b| <= |a| * pct`,
/// so the tolerance scales with the first (reference) amount.
pub fn amount_within_tolerance(a: Money, b: Money, pct: Decimal) -> Option<Signal> {
    if a == b {
        return Some(Signal::new(1.0, "Exact amount match"));
    }
    let diff = (a - b).abs().as_decimal();
    let tolerance = a.abs().as_decimal() * pct;
    if diff > tolerance {
        return None;
    }
    // diff > 0 here, so tolerance > 0 as well.
    let ratio = (diff / tolerance).to_f32().unwrap_or(1.0);
    let percent = (pct * Decimal::ONE_HUNDRED).normalize();
    Some(Signal::new(
        1.0 - ratio,
        format!("Amount within {percent}% tolerance"),
    ))
}

/// Free-text similarity in `[0.0, 1.0]`. Phase logic only depends on this
/// trait so the heuristic can be replaced.
pub trait TextSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f32;
}

/// Jaccard index over lower-cased, whitespace-separated word sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordJaccard;

impl TextSimilarity for WordJaccard {
    fn similarity(&self, a: &str, b: &str) -> f32 {
        token_similarity(a, b)
    }
}

pub fn token_similarity(a: &str, b: &str) -> f32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f32 / union as f32
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Both present and non-empty, and equal or one contains the other.
pub fn reference_exact_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (non_empty(a), non_empty(b)) {
        (Some(a), Some(b)) => a == b || a.contains(b) || b.contains(a),
        _ => false,
    }
}

/// `needle` is present, non-empty and found inside `haystack`.
///
/// Bank references are often truncated copies of the book reference, so the
/// check is directional: bank reference inside book reference.
pub fn reference_contains(needle: Option<&str>, haystack: Option<&str>) -> bool {
    match (non_empty(needle), non_empty(haystack)) {
        (Some(needle), Some(haystack)) => haystack.contains(needle),
        _ => false,
    }
}

/// Both present, non-empty and identical.
pub fn references_equal(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((non_empty(a), non_empty(b)), (Some(a), Some(b)) if a == b)
}
