//! Structured-data (EIP-712) hashing.
//!
//! A typed message is described as a [`StructValue`] over a small closed set
//! of field variants; `hash_struct` encodes each field per its type in
//! declaration order and hashes the whole, substituting nested struct hashes
//! as opaque 32-byte values. The signing digest prefixes `0x1901` and the
//! domain separator so a signature can neither be replayed across chains or
//! verifying programs nor confused with a plain message signature.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, FixedBytes, U256};

/// Domain binding a signature to one chain and one verifying program.
///
/// This is the three-field domain used by Permit2 (no `version` field); its
/// type string is `EIP712Domain(string name,uint256 chainId,address
/// verifyingContract)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn new(name: impl Into<String>, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: name.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// `hashStruct` of the domain record.
    pub fn separator(&self) -> FixedBytes<32> {
        hash_struct(&self.as_struct())
    }

    fn as_struct(&self) -> StructValue {
        StructValue::new("EIP712Domain")
            .field("name", FieldValue::String(self.name.clone()))
            .field("chainId", FieldValue::Uint(U256::from(self.chain_id)))
            .field("verifyingContract", FieldValue::Address(self.verifying_contract))
    }
}

/// Closed set of field types dispatched by pattern matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// `uint256`, encoded as a 32-byte big-endian word.
    Uint(U256),
    /// `address`, left-padded into its word.
    Address(Address),
    /// `string`, encoded as the keccak hash of its UTF-8 bytes.
    String(String),
    /// `bytes`, encoded as the keccak hash of the contents.
    Bytes(Vec<u8>),
    /// Nested struct, hashed first and substituted as 32 opaque bytes.
    Struct(StructValue),
}

impl FieldValue {
    fn type_name(&self) -> &str {
        match self {
            FieldValue::Uint(_) => "uint256",
            FieldValue::Address(_) => "address",
            FieldValue::String(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Struct(s) => &s.type_name,
        }
    }

    fn encode(&self) -> FixedBytes<32> {
        match self {
            FieldValue::Uint(u) => FixedBytes(u.to_be_bytes::<32>()),
            FieldValue::Address(a) => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(a.as_slice());
                FixedBytes(word)
            }
            FieldValue::String(s) => keccak256(s.as_bytes()),
            FieldValue::Bytes(b) => keccak256(b),
            FieldValue::Struct(s) => hash_struct(s),
        }
    }
}

/// A typed record: type name plus fields in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructValue {
    pub type_name: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl StructValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}

/// `encodeType`: the primary type definition followed by every transitively
/// referenced struct type, deduplicated and sorted by name.
pub fn encode_type(value: &StructValue) -> String {
    let mut referenced = BTreeMap::new();
    collect_referenced(value, &mut referenced);
    referenced.remove(&value.type_name);

    let mut out = single_type(value);
    for definition in referenced.values() {
        out.push_str(definition);
    }
    out
}

fn single_type(value: &StructValue) -> String {
    let mut out = String::new();
    out.push_str(&value.type_name);
    out.push('(');
    for (i, (name, field)) in value.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(field.type_name());
        out.push(' ');
        out.push_str(name);
    }
    out.push(')');
    out
}

fn collect_referenced(value: &StructValue, out: &mut BTreeMap<String, String>) {
    for (_, field) in &value.fields {
        if let FieldValue::Struct(inner) = field {
            if out
                .insert(inner.type_name.clone(), single_type(inner))
                .is_none()
            {
                collect_referenced(inner, out);
            }
        }
    }
}

/// `hashStruct`: keccak of the type hash followed by each field's 32-byte
/// encoding in declaration order.
pub fn hash_struct(value: &StructValue) -> FixedBytes<32> {
    let type_hash = keccak256(encode_type(value).as_bytes());
    let mut buf = Vec::with_capacity(32 * (1 + value.fields.len()));
    buf.extend_from_slice(type_hash.as_slice());
    for (_, field) in &value.fields {
        buf.extend_from_slice(field.encode().as_slice());
    }
    keccak256(&buf)
}

/// Final digest: `keccak256("\x19\x01" || domainSeparator || hashStruct(message))`.
pub fn signing_digest(domain: &Domain, message: &StructValue) -> FixedBytes<32> {
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(domain.separator().as_slice());
    buf.extend_from_slice(hash_struct(message).as_slice());
    keccak256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn nested_message() -> StructValue {
        let permitted = StructValue::new("TokenPermissions")
            .field("token", FieldValue::Address(Address::new([0x11; 20])))
            .field("amount", FieldValue::Uint(U256::from(100u64)));
        StructValue::new("PermitTransferFrom")
            .field("permitted", FieldValue::Struct(permitted))
            .field("spender", FieldValue::Address(Address::new([0x22; 20])))
            .field("nonce", FieldValue::Uint(U256::from(7u64)))
            .field("deadline", FieldValue::Uint(U256::from(1_700_000_000u64)))
    }

    #[test]
    fn encode_type_appends_nested_definitions() {
        assert_eq!(
            encode_type(&nested_message()),
            "PermitTransferFrom(TokenPermissions permitted,address spender,\
             uint256 nonce,uint256 deadline)\
             TokenPermissions(address token,uint256 amount)"
        );
    }

    #[test]
    fn domain_type_matches_the_three_field_convention() {
        let domain = Domain::new("Permit2", 1, Address::ZERO);
        assert_eq!(
            encode_type(&domain.as_struct()),
            "EIP712Domain(string name,uint256 chainId,address verifyingContract)"
        );
    }

    #[test]
    fn hash_struct_changes_with_any_field() {
        let base = nested_message();
        let mut other = base.clone();
        other.fields[2].1 = FieldValue::Uint(U256::from(8u64));
        assert_ne!(hash_struct(&base), hash_struct(&other));
    }

    #[test]
    fn digest_is_domain_separated_by_verifying_contract() {
        let message = nested_message();
        let a = Domain::new("Permit2", 1, Address::new([0xaa; 20]));
        let b = Domain::new("Permit2", 1, Address::new([0xbb; 20]));
        assert_ne!(signing_digest(&a, &message), signing_digest(&b, &message));
    }

    #[test]
    fn digest_is_domain_separated_by_chain() {
        let message = nested_message();
        let a = Domain::new("Permit2", 1, Address::ZERO);
        let b = Domain::new("Permit2", 31337, Address::ZERO);
        assert_ne!(signing_digest(&a, &message), signing_digest(&b, &message));
    }
}
