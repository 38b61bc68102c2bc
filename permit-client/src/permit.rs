//! One-time token-movement permissions and their signing.
//!
//! A [`PermissionMessage`] is built fresh per authorization with a nonce from
//! the allocator, lowered to the canonical `PermitTransferFrom` typed struct
//! and signed over the domain-separated digest. The output (digest, signature
//! and the exact message fields) is the complete artifact the verifying
//! contract needs; nothing is submitted from here.

use alloy_primitives::{address, Address, FixedBytes, U256};

use crate::error::SignError;
use crate::signer::{LocalSigningKey, Signature};
use crate::typed_data::{signing_digest, Domain, FieldValue, StructValue};

/// Domain name registered by the canonical Permit2 deployment.
pub const PERMIT2_DOMAIN_NAME: &str = "Permit2";

/// Canonical Permit2 address (same on every chain it is deployed to).
pub const PERMIT2_ADDRESS: Address = address!("000000000022D473030F116dDEE9F6B4e7B85Ecd");

/// Domain for a Permit2 deployment on the given chain.
pub fn permit2_domain(chain_id: u64, verifying_contract: Address) -> Domain {
    Domain::new(PERMIT2_DOMAIN_NAME, chain_id, verifying_contract)
}

/// A single delegated token movement: never reused, one nonce each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionMessage {
    /// Asset being moved.
    pub token: Address,
    /// Maximum amount the delegate may move.
    pub amount: U256,
    /// Delegate allowed to execute the movement.
    pub spender: Address,
    /// Globally unique per owner; allocated from the nonce bitmap.
    pub nonce: U256,
    /// Unix timestamp after which the permission is dead.
    pub deadline: u64,
}

impl PermissionMessage {
    /// Lower to the canonical `PermitTransferFrom` typed struct with its
    /// nested `TokenPermissions`.
    pub fn typed(&self) -> StructValue {
        let permitted = StructValue::new("TokenPermissions")
            .field("token", FieldValue::Address(self.token))
            .field("amount", FieldValue::Uint(self.amount));
        StructValue::new("PermitTransferFrom")
            .field("permitted", FieldValue::Struct(permitted))
            .field("spender", FieldValue::Address(self.spender))
            .field("nonce", FieldValue::Uint(self.nonce))
            .field("deadline", FieldValue::Uint(U256::from(self.deadline)))
    }
}

/// Digest plus signature for one permission in one domain. Meaningless if
/// decoupled from that pairing.
#[derive(Clone, Debug)]
pub struct SignedPermit {
    pub digest: FixedBytes<32>,
    pub signature: Signature,
}

/// Hash the permission under `domain` and sign the digest. The key is only
/// touched for the duration of the call.
pub fn build_and_sign(
    domain: &Domain,
    permission: &PermissionMessage,
    key: &LocalSigningKey,
) -> Result<SignedPermit, SignError> {
    let digest = signing_digest(domain, &permission.typed());
    let signature = key.sign_digest(&digest)?;
    tracing::debug!(
        digest = %crate::hexfmt::word(&digest),
        spender = %crate::hexfmt::address(permission.spender),
        nonce = %permission.nonce,
        "permission signed"
    );
    Ok(SignedPermit { digest, signature })
}
