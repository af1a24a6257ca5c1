pub mod config;
pub mod dedup;
pub mod index;
pub mod reconcile;
pub mod report;
pub mod similarity;

pub use config::{ConfigError, ConfigWarning, DedupSettings, MatchConfig, ReconcileSettings, Side};
pub use dedup::{
    check_batch, DedupStats, DeduplicationResult, DuplicateDetector, DuplicateMatch,
    DuplicateOrigin,
};
pub use index::{CandidateIndex, DEFAULT_BYPASS_THRESHOLD};
pub use reconcile::{reconcile, ReconcileRequest, Reconciler};
pub use report::{
    Balances, MatchCandidate, MatchStatus, MatchType, ReconciliationResult,
    ReconciliationSummary, Suggestion, UnmatchedExternal, UnmatchedInternal,
};
pub use similarity::{Signal, TextSimilarity, WordJaccard};
