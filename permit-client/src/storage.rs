//! Storage-slot derivation and the word decoder.
//!
//! Slot math follows the Solidity storage layout convention: a dynamic
//! array's length lives at its declared slot, elements start at
//! `keccak256(leftPad32(declaredSlot))` with a fixed per-element stride, and
//! mapping values live at `keccak256(leftPad32(key) || leftPad32(slot))`.
//! All slot arithmetic is unsigned modulo 2^256.

use alloy_primitives::{keccak256, Address, U256};

use crate::error::{DecodeError, LayoutError, ReadError};
use crate::layout::{decode_scalar, Layout, ScalarKind, Value};
use crate::reader::{LedgerReader, RawWord};

/// First-element slot of a dynamic array declared at `declared_slot`.
pub fn array_base_slot(declared_slot: U256) -> U256 {
    U256::from_be_bytes(keccak256(declared_slot.to_be_bytes::<32>()).0)
}

/// Slot of element `index`, given the array base and the number of whole
/// words each element occupies (1 when multiple fields share a word).
pub fn element_slot(base: U256, index: u64, slots_per_element: u64) -> U256 {
    base.wrapping_add(U256::from(index).wrapping_mul(U256::from(slots_per_element)))
}

/// Value slot of `mapping[key]` for a mapping declared at `declared_slot`,
/// with the key already rendered as a 32-byte word.
pub fn mapping_slot(declared_slot: U256, key: &[u8; 32]) -> U256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(key);
    buf[32..].copy_from_slice(&declared_slot.to_be_bytes::<32>());
    U256::from_be_bytes(keccak256(buf).0)
}

/// Mapping slot for an address key (left-padded into its word).
pub fn address_mapping_slot(declared_slot: U256, key: Address) -> U256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(key.as_slice());
    mapping_slot(declared_slot, &word)
}

/// Mapping slot for a uint key.
pub fn u256_mapping_slot(declared_slot: U256, key: U256) -> U256 {
    mapping_slot(declared_slot, &key.to_be_bytes::<32>())
}

/// One decoded field of an element or word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedField {
    pub name: String,
    pub value: Value,
}

/// Decodes a remote program's storage against caller-supplied [`Layout`]s.
///
/// Stateless apart from the reader handle: every call is a pure function of
/// its inputs plus the RPC reads it performs, so concurrent use against
/// different programs or slots is safe.
pub struct StorageDecoder<R> {
    reader: R,
    program: Address,
    at: Option<u64>,
}

impl<R: LedgerReader> StorageDecoder<R> {
    pub fn new(reader: R, program: Address) -> Self {
        Self {
            reader,
            program,
            at: None,
        }
    }

    /// Pin every read to a historical block instead of latest.
    pub fn at_block(mut self, block: u64) -> Self {
        self.at = Some(block);
        self
    }

    /// Raw word at `slot`, reflecting chain state at read time.
    pub async fn read_word(&self, slot: U256) -> Result<RawWord, ReadError> {
        self.reader.storage_word(self.program, slot, self.at).await
    }

    /// Length word of a dynamic array declared at `declared_slot`.
    pub async fn array_len(&self, declared_slot: U256) -> Result<U256, ReadError> {
        let word = self.read_word(declared_slot).await?;
        Ok(U256::from_be_bytes(word.0))
    }

    /// Decode the word at `slot` against a whole-word or packed layout.
    pub async fn decode_at(
        &self,
        slot: U256,
        layout: &Layout,
    ) -> Result<Vec<DecodedField>, DecodeError> {
        let word = self.read_word(slot).await?;
        Ok(decode_word(&word, layout)?)
    }

    /// Decode element `index` of a dynamic array.
    ///
    /// Reads the length word first and rejects out-of-range indices, then
    /// reads exactly the element's words.
    pub async fn decode_array_element(
        &self,
        layout: &Layout,
        index: u64,
    ) -> Result<Vec<DecodedField>, DecodeError> {
        let (declared_slot, element_words) = as_array(layout)?;
        let len = self.array_len(declared_slot).await?;
        if U256::from(index) >= len {
            return Err(LayoutError::IndexOutOfBounds { index, len }.into());
        }
        self.element_at(declared_slot, element_words, index).await
    }

    /// Decode every element of a dynamic array. A remote length of 0 yields
    /// an empty result with no reads beyond the length slot.
    pub async fn decode_array(
        &self,
        layout: &Layout,
    ) -> Result<Vec<Vec<DecodedField>>, DecodeError> {
        let (declared_slot, element_words) = as_array(layout)?;
        let len = self.array_len(declared_slot).await?;
        tracing::debug!(
            slot = %crate::hexfmt::slot(declared_slot),
            %len,
            "decoding dynamic array"
        );

        let mut out = Vec::new();
        let mut index = 0u64;
        while U256::from(index) < len {
            out.push(self.element_at(declared_slot, element_words, index).await?);
            index += 1;
        }
        Ok(out)
    }

    async fn element_at(
        &self,
        declared_slot: U256,
        element_words: &[Layout],
        index: u64,
    ) -> Result<Vec<DecodedField>, DecodeError> {
        let stride = element_words.len().max(1) as u64;
        let base = array_base_slot(declared_slot);
        let first = element_slot(base, index, stride);

        let mut fields = Vec::new();
        for (offset, word_layout) in element_words.iter().enumerate() {
            let slot = first.wrapping_add(U256::from(offset));
            let word = self.read_word(slot).await?;
            fields.extend(decode_word(&word, word_layout)?);
        }
        Ok(fields)
    }
}

fn as_array(layout: &Layout) -> Result<(U256, &[Layout]), LayoutError> {
    match layout {
        Layout::DynamicArray {
            declared_slot,
            element_words,
        } => Ok((*declared_slot, element_words)),
        _ => Err(LayoutError::NotAnArray),
    }
}

/// Decode one raw word against a non-array layout.
pub fn decode_word(word: &RawWord, layout: &Layout) -> Result<Vec<DecodedField>, LayoutError> {
    match layout {
        Layout::WholeWord { name, kind } => {
            // Whole-word addresses sit in the low 20 bytes per ABI padding.
            let value = match kind {
                ScalarKind::Address => decode_scalar(name, word, 12, 20, *kind)?,
                _ => decode_scalar(name, word, 0, 32, *kind)?,
            };
            Ok(vec![DecodedField {
                name: name.clone(),
                value,
            }])
        }
        Layout::Packed { fields } => fields
            .iter()
            .map(|f| {
                Ok(DecodedField {
                    name: f.name.clone(),
                    value: f.decode(word)?,
                })
            })
            .collect(),
        Layout::DynamicArray { .. } => Err(LayoutError::ArrayWhereWordExpected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn base_slot_of_zero_matches_the_known_vector() {
        // keccak256 of 32 zero bytes, the canonical first-element slot of an
        // array declared at slot 0.
        assert_eq!(
            crate::hexfmt::slot(array_base_slot(U256::ZERO)),
            "0x290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563"
        );
    }

    #[test]
    fn base_slot_is_deterministic_and_collision_free_over_a_dense_range() {
        let mut seen = HashSet::new();
        for i in 0u64..1024 {
            let slot = array_base_slot(U256::from(i));
            assert_eq!(slot, array_base_slot(U256::from(i)));
            assert!(seen.insert(slot), "collision at declared slot {i}");
        }
    }

    #[test]
    fn element_slots_are_distinct_per_index() {
        let base = array_base_slot(U256::ZERO);
        for stride in [1u64, 2, 3] {
            let mut seen = HashSet::new();
            for index in 0u64..256 {
                assert!(seen.insert(element_slot(base, index, stride)));
            }
        }
    }

    #[test]
    fn element_slot_wraps_modulo_2_pow_256() {
        let slot = element_slot(U256::MAX, 1, 2);
        assert_eq!(slot, U256::from(1u64));
    }

    #[test]
    fn mapping_slot_of_zero_key_and_slot_matches_the_known_vector() {
        // keccak256 of 64 zero bytes.
        assert_eq!(
            crate::hexfmt::slot(u256_mapping_slot(U256::ZERO, U256::ZERO)),
            "0xad3228b676f7d3cd4284a5443f17f1962b36e491b30a40b2405849e597ba5fb5"
        );
    }

    #[test]
    fn mapping_slots_differ_per_key_and_per_declared_slot() {
        let a = u256_mapping_slot(U256::ZERO, U256::from(1u64));
        let b = u256_mapping_slot(U256::ZERO, U256::from(2u64));
        let c = u256_mapping_slot(U256::from(1u64), U256::from(1u64));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
