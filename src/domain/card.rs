//! One-way payment instrument masking
//!
//! Card fields are stored as irreversible SHA-256 digests plus the
//! plaintext last four digits for display. The system deliberately
//! cannot reconstruct a card number from what it persists.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaskedCard {
    pub number_hash: String,
    pub holder_hash: String,
    pub expiry_hash: String,
    pub cvc_hash: String,
    pub last_four: String,
}

impl MaskedCard {
    pub fn from_raw(number: &str, holder: &str, expiry: &str, cvc: &str) -> Self {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        let last_four = digits
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Self {
            number_hash: hash_field(&digits),
            holder_hash: hash_field(holder),
            expiry_hash: hash_field(expiry),
            cvc_hash: hash_field(cvc),
            last_four,
        }
    }
}

fn hash_field(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_last_four_in_plaintext() {
        let card = MaskedCard::from_raw("4111 1111 1111 1234", "J Doe", "12/27", "123");
        assert_eq!(card.last_four, "1234");
        assert!(!card.number_hash.contains("4111"));
        assert_eq!(card.number_hash.len(), 64);
    }

    #[test]
    fn hashing_is_deterministic() {
        let a = MaskedCard::from_raw("4111111111111234", "J Doe", "12/27", "123");
        let b = MaskedCard::from_raw("4111 1111 1111 1234", "J Doe", "12/27", "123");
        assert_eq!(a.number_hash, b.number_hash);
    }
}
