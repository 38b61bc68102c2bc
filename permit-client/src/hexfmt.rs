//! Canonical hex text forms.
//!
//! Everything rendered for collaborators is lowercase, `0x`-prefixed and
//! exactly the fixed byte width of the field (32-byte words, 20-byte
//! addresses). Alloy's `Display` for `Address` is EIP-55 checksummed, so it
//! is deliberately not used for output.

use alloy_primitives::{Address, FixedBytes, U256};

/// `0x` + 40 lowercase hex chars.
pub fn address(a: Address) -> String {
    format!("0x{}", hex::encode(a.as_slice()))
}

/// `0x` + 64 lowercase hex chars.
pub fn word(w: &FixedBytes<32>) -> String {
    format!("0x{}", hex::encode(w.as_slice()))
}

/// A slot index rendered as a full 32-byte big-endian word.
pub fn slot(s: U256) -> String {
    format!("0x{}", hex::encode(s.to_be_bytes::<32>()))
}

/// Arbitrary bytes, lowercase with a `0x` prefix.
pub fn bytes(b: &[u8]) -> String {
    format!("0x{}", hex::encode(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address as addr;

    #[test]
    fn address_is_lowercase_fixed_width() {
        let a = addr!("000000000022D473030F116dDEE9F6B4e7B85Ecd");
        let s = address(a);
        assert_eq!(s, "0x000000000022d473030f116ddee9f6b4e7b85ecd");
        assert_eq!(s.len(), 2 + 40);
    }

    #[test]
    fn slot_is_left_padded_to_32_bytes() {
        let s = slot(U256::from(1u64));
        assert_eq!(s.len(), 2 + 64);
        assert!(s.ends_with("01"));
        assert!(s.starts_with("0x0000"));
    }
}
