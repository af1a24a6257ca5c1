pub mod hash;
pub mod money;
pub mod period;
pub mod transaction;

pub use hash::content_hash;
pub use money::Money;
pub use period::DateRange;
pub use transaction::{ExternalTransaction, InternalRecord, LedgerEntry, TransactionType};
