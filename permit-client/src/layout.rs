//! Caller-supplied storage layout descriptors and the packed-word scalar codec.
//!
//! The remote layout convention (hash-derived array base, slot-sharing of
//! adjacent small fields) is a fixed external contract. It cannot be inferred
//! from chain state, so the caller describes it explicitly with a [`Layout`]
//! and this module decodes raw words against that description — failing with
//! a [`LayoutError`] rather than silently truncating when the description
//! does not fit a 32-byte word.

use alloy_primitives::{Address, U256};

use crate::error::LayoutError;
use crate::reader::RawWord;

/// How the extracted bytes of a field are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    /// Unsigned big-endian integer, up to 32 bytes.
    Uint,
    /// Fixed-width 20-byte identifier.
    Address,
    /// Raw bytes, uninterpreted.
    Bytes,
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ScalarKind::Uint => "uint",
            ScalarKind::Address => "address",
            ScalarKind::Bytes => "bytes",
        })
    }
}

/// A decoded field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Uint(U256),
    Address(Address),
    Bytes(Vec<u8>),
}

/// A sub-word field sharing a storage word with its siblings.
///
/// `byte_offset` is measured from the most-significant byte of the 32-byte
/// big-endian word (index 0), so a field occupies bytes
/// `byte_offset..byte_offset + byte_width` of the raw word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedField {
    pub name: String,
    pub byte_offset: usize,
    pub byte_width: usize,
    pub kind: ScalarKind,
}

impl PackedField {
    pub fn new(name: impl Into<String>, byte_offset: usize, byte_width: usize, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            byte_offset,
            byte_width,
            kind,
        }
    }

    pub fn decode(&self, word: &RawWord) -> Result<Value, LayoutError> {
        decode_scalar(&self.name, word, self.byte_offset, self.byte_width, self.kind)
    }
}

/// Tagged layout descriptor: whole-word scalar, packed sub-word fields, or a
/// dynamic array of elements described word by word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// One field occupying a word of its own. Addresses sit in the low-order
    /// 20 bytes of the word, per the ABI left-padding convention.
    WholeWord { name: String, kind: ScalarKind },

    /// Several fields sharing one word.
    Packed { fields: Vec<PackedField> },

    /// Dynamic array: length at `declared_slot`, elements starting at
    /// `keccak256(leftPad32(declared_slot))`, each element occupying one
    /// word per entry of `element_words` (arrays cannot nest).
    DynamicArray {
        declared_slot: U256,
        element_words: Vec<Layout>,
    },
}

impl Layout {
    pub fn whole_word(name: impl Into<String>, kind: ScalarKind) -> Self {
        Layout::WholeWord {
            name: name.into(),
            kind,
        }
    }

    pub fn packed(fields: Vec<PackedField>) -> Self {
        Layout::Packed { fields }
    }
}

/// Extract `byte_width` bytes at `byte_offset` from a raw word and interpret
/// them per `kind`.
///
/// Fails with a layout mismatch (never truncates) when the field runs past
/// the 32-byte word; the exact boundary `byte_offset + byte_width == 32` is
/// valid.
pub fn decode_scalar(
    field: &str,
    word: &RawWord,
    byte_offset: usize,
    byte_width: usize,
    kind: ScalarKind,
) -> Result<Value, LayoutError> {
    let end = byte_offset.checked_add(byte_width).filter(|end| *end <= 32).ok_or(
        LayoutError::WordOverrun {
            field: field.to_owned(),
            offset: byte_offset,
            width: byte_width,
        },
    )?;

    if kind == ScalarKind::Address && byte_width != 20 {
        return Err(LayoutError::WidthMismatch {
            field: field.to_owned(),
            kind,
            expected: 20,
            width: byte_width,
        });
    }

    let bytes = &word.as_slice()[byte_offset..end];
    Ok(match kind {
        ScalarKind::Uint => Value::Uint(U256::from_be_slice(bytes)),
        ScalarKind::Address => Value::Address(Address::from_slice(bytes)),
        ScalarKind::Bytes => Value::Bytes(bytes.to_vec()),
    })
}
