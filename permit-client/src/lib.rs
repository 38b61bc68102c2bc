//! Protocol-level client for a Permit2-style verifying contract.
//!
//! Three independent components, composed only by the caller:
//!
//! - **Storage decoder** ([`storage`], [`layout`]): derives storage slots per
//!   the hash-addressed array/struct layout convention, reads raw 32-byte
//!   words over a narrow RPC interface and unpacks them into typed values.
//! - **Nonce allocator** ([`nonce`]): scans the remote replay-protection
//!   bitmap and proposes the first unused index (advisory under concurrency).
//! - **Authorization signer** ([`typed_data`], [`permit`], [`signer`]):
//!   EIP-712 structured-data hashing plus deterministic secp256k1 signing of
//!   one-time token-movement permissions.
//!
//! Nothing here caches, retries or submits transactions; the remote node is
//! reached only through the [`reader::LedgerReader`] seam.

pub mod error;
pub mod hexfmt;
pub mod layout;
pub mod nonce;
pub mod permit;
pub mod reader;
pub mod signer;
pub mod storage;
pub mod typed_data;

pub use error::{DecodeError, LayoutError, NonceError, ReadError, SignError};
pub use layout::{Layout, PackedField, ScalarKind, Value};
pub use nonce::{NonceBitmap, DEFAULT_MAX_WORDS, NONCE_BITMAP_SLOT};
pub use permit::{
    build_and_sign, permit2_domain, PermissionMessage, SignedPermit, PERMIT2_ADDRESS,
    PERMIT2_DOMAIN_NAME,
};
pub use reader::{HttpLedgerReader, LedgerReader, MemoryLedger, RawWord};
pub use signer::{recover_address, LocalSigningKey, Signature};
pub use storage::{
    address_mapping_slot, array_base_slot, element_slot, mapping_slot, u256_mapping_slot,
    DecodedField, StorageDecoder,
};
pub use typed_data::{encode_type, hash_struct, signing_digest, Domain, FieldValue, StructValue};
