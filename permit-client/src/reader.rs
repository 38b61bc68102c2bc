//! Ledger read seam.
//!
//! Everything in this crate talks to the remote node through [`LedgerReader`]
//! and nothing else: one 32-byte storage word per call, optionally pinned to a
//! historical block. No caching, no retries and no internal timeouts — the
//! transport owns its own timeout policy, and a transient failure is surfaced
//! to the caller as a [`ReadError`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::{Address, FixedBytes, U256};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{BlockId, BlockNumber, H160, H256};

use crate::error::ReadError;

/// Exactly 32 bytes as returned by a storage read. Untyped until decoded
/// against a known layout.
pub type RawWord = FixedBytes<32>;

/// Narrow read interface to the remote ledger (`eth_getStorageAt` semantics).
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Read the word at `slot` of `program`'s storage. `at` selects a
    /// historical block number; `None` means latest.
    async fn storage_word(
        &self,
        program: Address,
        slot: U256,
        at: Option<u64>,
    ) -> Result<RawWord, ReadError>;
}

#[async_trait]
impl<T: LedgerReader + ?Sized> LedgerReader for &T {
    async fn storage_word(
        &self,
        program: Address,
        slot: U256,
        at: Option<u64>,
    ) -> Result<RawWord, ReadError> {
        (**self).storage_word(program, slot, at).await
    }
}

/// JSON-RPC backed reader over an HTTP endpoint.
pub struct HttpLedgerReader {
    provider: Provider<Http>,
}

impl HttpLedgerReader {
    pub fn connect(url: &str) -> Result<Self, ReadError> {
        let provider = Provider::<Http>::try_from(url).map_err(|e| ReadError::Endpoint {
            url: url.to_owned(),
            source: Box::new(e),
        })?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl LedgerReader for HttpLedgerReader {
    async fn storage_word(
        &self,
        program: Address,
        slot: U256,
        at: Option<u64>,
    ) -> Result<RawWord, ReadError> {
        let address = H160::from_slice(program.as_slice());
        let location = H256::from(slot.to_be_bytes::<32>());
        let block = at.map(|n| BlockId::Number(BlockNumber::Number(n.into())));

        let word = self
            .provider
            .get_storage_at(address, location, block)
            .await
            .map_err(|e| ReadError::Rpc {
                program,
                slot,
                source: Box::new(e),
            })?;

        tracing::trace!(
            program = %crate::hexfmt::address(program),
            slot = %crate::hexfmt::slot(slot),
            "storage word read"
        );
        Ok(FixedBytes(word.0))
    }
}

/// In-memory ledger for tests and examples. Unset slots read as the zero
/// word, matching chain semantics.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    words: HashMap<(Address, U256), RawWord>,
    reads: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_word(&mut self, program: Address, slot: U256, word: RawWord) {
        self.words.insert((program, slot), word);
    }

    /// Number of reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn storage_word(
        &self,
        program: Address,
        slot: U256,
        _at: Option<u64>,
    ) -> Result<RawWord, ReadError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .words
            .get(&(program, slot))
            .copied()
            .unwrap_or(FixedBytes::ZERO))
    }
}
