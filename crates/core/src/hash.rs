use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::money::Money;

/// Hex characters kept from the SHA-256 digest of a transaction's content.
pub const CONTENT_HASH_LEN: usize = 16;

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content hash over `date|amount|description|reference`.
///
/// The amount is normalized first so `5000` and `5000.00` hash alike; a
/// missing reference hashes as the empty string.
pub fn content_hash(
    date: NaiveDate,
    amount: Money,
    description: &str,
    reference: Option<&str>,
) -> String {
    let data = format!(
        "{}|{}|{}|{}",
        date.format("%Y-%m-%d"),
        amount.as_decimal().normalize(),
        description,
        reference.unwrap_or("")
    );
    let mut hex = to_hex(&sha256_bytes(data.as_bytes()));
    hex.truncate(CONTENT_HASH_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sha256_bytes_known_vector() {
        let hex = to_hex(&sha256_bytes(b""));
        assert_eq!(
            hex,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn content_hash_length() {
        let h = content_hash(date(2025, 1, 15), Money::from(5000), "PAYMENT", None);
        assert_eq!(h.len(), CONTENT_HASH_LEN);
    }

    #[test]
    fn content_hash_ignores_amount_scale() {
        let a = content_hash(date(2025, 1, 15), Money::from(5000), "PAYMENT", Some("R1"));
        let b = content_hash(date(2025, 1, 15), Money::from_cents(500_000), "PAYMENT", Some("R1"));
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_covers_every_field() {
        let base = content_hash(date(2025, 1, 15), Money::from(5000), "PAYMENT", None);
        assert_ne!(base, content_hash(date(2025, 1, 16), Money::from(5000), "PAYMENT", None));
        assert_ne!(base, content_hash(date(2025, 1, 15), Money::from(5001), "PAYMENT", None));
        assert_ne!(base, content_hash(date(2025, 1, 15), Money::from(5000), "PAYMENTS", None));
        assert_ne!(base, content_hash(date(2025, 1, 15), Money::from(5000), "PAYMENT", Some("X")));
    }

    #[test]
    fn missing_reference_equals_empty_reference() {
        assert_eq!(
            content_hash(date(2025, 1, 15), Money::from(1), "A", None),
            content_hash(date(2025, 1, 15), Money::from(1), "A", Some(""))
        );
    }
}
