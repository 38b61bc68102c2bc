//! Replay-protection nonce allocation over a remote bitmap.
//!
//! The verifying contract tracks consumed nonces as bits inside 256-bit
//! words keyed by `(owner, wordIndex)`. This allocator scans those words over
//! raw storage reads and proposes the first clear bit.
//!
//! The result is advisory only: another signer may consume the same nonce
//! between discovery and use. That race is inherent to the distributed
//! system — the remote contract's acceptance path is the single source of
//! truth, and this client only minimizes the chance of submitting an
//! already-used index.

use alloy_primitives::{Address, U256};

use crate::error::NonceError;
use crate::reader::LedgerReader;
use crate::storage::{address_mapping_slot, u256_mapping_slot};

/// Declared slot of Permit2's `nonceBitmap` mapping
/// (`mapping(address => mapping(uint256 => uint256))`, first state variable).
pub const NONCE_BITMAP_SLOT: U256 = U256::ZERO;

/// Default number of bitmap words scanned (2560 nonces).
pub const DEFAULT_MAX_WORDS: u64 = 10;

/// Client for a contract's nonce bitmap.
pub struct NonceBitmap<R> {
    reader: R,
    contract: Address,
    declared_slot: U256,
}

impl<R: LedgerReader> NonceBitmap<R> {
    /// Bitmap of the canonical Permit2 layout (`nonceBitmap` at slot 0).
    pub fn new(reader: R, contract: Address) -> Self {
        Self::with_declared_slot(reader, contract, NONCE_BITMAP_SLOT)
    }

    pub fn with_declared_slot(reader: R, contract: Address, declared_slot: U256) -> Self {
        Self {
            reader,
            contract,
            declared_slot,
        }
    }

    /// Storage slot holding `nonceBitmap[owner][word]`.
    pub fn word_slot(&self, owner: Address, word: u64) -> U256 {
        let inner = address_mapping_slot(self.declared_slot, owner);
        u256_mapping_slot(inner, U256::from(word))
    }

    /// Read one 256-bit flag register of `owner`'s nonce space.
    pub async fn word(&self, owner: Address, word: u64) -> Result<U256, NonceError> {
        let raw = self
            .reader
            .storage_word(self.contract, self.word_slot(owner, word), None)
            .await?;
        Ok(U256::from_be_bytes(raw.0))
    }

    /// First unused nonce for `owner`, scanning words `0..max_words` in
    /// ascending order and bits least-significant-first. Returns
    /// `word * 256 + bit` for the first clear bit, with no reads past the
    /// word that contained it.
    pub async fn find_unused_nonce(
        &self,
        owner: Address,
        max_words: u64,
    ) -> Result<U256, NonceError> {
        for word in 0..max_words {
            let bitmap = self.word(owner, word).await?;
            if bitmap == U256::MAX {
                continue;
            }
            for bit in 0..256usize {
                if !bitmap.bit(bit) {
                    let nonce =
                        U256::from(word) * U256::from(256u64) + U256::from(bit as u64);
                    tracing::debug!(
                        owner = %crate::hexfmt::address(owner),
                        word,
                        bit,
                        %nonce,
                        "unused nonce found"
                    );
                    return Ok(nonce);
                }
            }
        }
        Err(NonceError::SpaceExhausted { max_words })
    }
}
