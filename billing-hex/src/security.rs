//! Public hash generation for unauthenticated invoice links.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of a generated public hash.
pub const PUBLIC_HASH_LEN: usize = 32;

/// Generates an unguessable alphanumeric token for an invoice's public
/// view/pay link.
pub fn generate_public_hash() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PUBLIC_HASH_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_hash_shape() {
        let hash = generate_public_hash();

        assert_eq!(hash.len(), PUBLIC_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_public_hashes_differ() {
        assert_ne!(generate_public_hash(), generate_public_hash());
    }
}
