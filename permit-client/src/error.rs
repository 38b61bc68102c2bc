//! Error taxonomy for the client.
//!
//! Every failure carries enough context (slot, word index, field name) to be
//! diagnosed without re-running under extra logging. Network failures are
//! surfaced verbatim and never retried here: a re-read of mutable chain state
//! is not the same thing as retrying an idempotent call.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::hexfmt;
use crate::layout::ScalarKind;

/// The ledger read interface failed. Carries the program and slot that were
/// being read so the caller can tell *which* word was unavailable.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("bad rpc endpoint `{url}`")]
    Endpoint {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("storage read failed: program {}, slot {}", hexfmt::address(*.program), hexfmt::slot(*.slot))]
    Rpc {
        program: Address,
        slot: U256,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// The caller-supplied layout descriptor does not fit the 32-byte word model.
///
/// Fatal to the single decode call that raised it; other calls are unaffected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("field `{field}` spans bytes {offset}..{} past the 32-byte word", .offset + .width)]
    WordOverrun {
        field: String,
        offset: usize,
        width: usize,
    },

    #[error("field `{field}`: {kind} fields are {expected} bytes wide, layout declares {width}")]
    WidthMismatch {
        field: String,
        kind: ScalarKind,
        expected: usize,
        width: usize,
    },

    #[error("array index {index} out of bounds, remote length is {len}")]
    IndexOutOfBounds { index: u64, len: U256 },

    #[error("dynamic-array layout where a single word was expected")]
    ArrayWhereWordExpected,

    #[error("whole-word or packed layout where a dynamic array was expected")]
    NotAnArray,
}

/// A decode touched the network and the layout; either side can fail.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Nonce allocation failures.
#[derive(Debug, Error)]
pub enum NonceError {
    /// Every bit in `max_words * 256` was set. The caller decides whether to
    /// retry with a wider scan.
    #[error("nonce space exhausted after scanning {max_words} bitmap word(s)")]
    SpaceExhausted { max_words: u64 },

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Key provider or signing failures. Fatal to the single signing call.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("private key must be exactly 32 bytes of hex")]
    MalformedKey,

    #[error("ecdsa signing failed")]
    Ecdsa(#[from] k256::ecdsa::Error),
}
