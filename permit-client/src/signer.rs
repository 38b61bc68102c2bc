//! Key handling and deterministic ECDSA over secp256k1.
//!
//! The raw secret is held in a zeroizing buffer; the `k256` signing key is
//! constructed per operation and dropped (zeroized) on every exit path,
//! including errors. The key is never logged or transmitted.

use std::fmt;

use alloy_primitives::{Address, FixedBytes};
use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::error::SignError;

/// 65-byte `r || s || v` signature, `v` in {27, 28}.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; 65],
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.bytes
    }

    pub fn r(&self) -> &[u8] {
        &self.bytes[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.bytes[32..64]
    }

    pub fn v(&self) -> u8 {
        self.bytes[64]
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::hexfmt::bytes(&self.bytes))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

/// Process-local signing key parsed from 32 hex-encoded bytes.
pub struct LocalSigningKey {
    secret: Zeroizing<[u8; 32]>,
}

impl LocalSigningKey {
    /// Parse from hex, with or without a `0x` prefix. The scalar is validated
    /// up front so later signing calls cannot fail on a malformed key.
    pub fn from_hex(s: &str) -> Result<Self, SignError> {
        let digits = s.trim().strip_prefix("0x").unwrap_or_else(|| s.trim());
        let mut secret = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(digits, secret.as_mut_slice()).map_err(|_| SignError::MalformedKey)?;
        // Rejects zero and out-of-range scalars; the key itself is dropped
        // and zeroized immediately.
        SigningKey::from_slice(secret.as_slice()).map_err(|_| SignError::MalformedKey)?;
        Ok(Self { secret })
    }

    fn signing_key(&self) -> Result<SigningKey, SignError> {
        SigningKey::from_slice(self.secret.as_slice()).map_err(|_| SignError::MalformedKey)
    }

    /// Public identity derived from the key: keccak of the uncompressed
    /// public key, low 20 bytes.
    pub fn address(&self) -> Result<Address, SignError> {
        let key = self.signing_key()?;
        Ok(public_address(key.verifying_key()))
    }

    /// Deterministic (RFC 6979) signature over a precomputed 32-byte digest.
    pub fn sign_digest(&self, digest: &FixedBytes<32>) -> Result<Signature, SignError> {
        let key = self.signing_key()?;
        let (sig, recovery_id) = key.sign_prehash_recoverable(digest.as_slice())?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = 27 + recovery_id.to_byte();
        Ok(Signature { bytes })
    }
}

/// Recover the signer identity from a digest and a 65-byte signature.
pub fn recover_address(
    digest: &FixedBytes<32>,
    signature: &Signature,
) -> Result<Address, SignError> {
    let sig = k256::ecdsa::Signature::from_slice(&signature.as_bytes()[..64])?;
    let v = signature.v();
    let recovery_id = RecoveryId::try_from(match v {
        27 | 28 => v - 27,
        other => other,
    })
    .map_err(SignError::Ecdsa)?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)?;
    Ok(public_address(&key))
}

fn public_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let mut hasher = Keccak256::new();
    // Skip the 0x04 uncompressed-point tag.
    hasher.update(&point.as_bytes()[1..]);
    let hash = hasher.finalize();
    Address::from_slice(&hash[12..32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    // First well-known anvil/hardhat development account.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn derives_the_known_dev_address() {
        let key = LocalSigningKey::from_hex(DEV_KEY).unwrap();
        assert_eq!(crate::hexfmt::address(key.address().unwrap()), DEV_ADDRESS);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!(
            LocalSigningKey::from_hex("0xabcd"),
            Err(SignError::MalformedKey)
        ));
        assert!(matches!(
            LocalSigningKey::from_hex(&format!("0x{}", "00".repeat(32))),
            Err(SignError::MalformedKey)
        ));
    }

    #[test]
    fn signing_is_deterministic_and_verifies() {
        let key = LocalSigningKey::from_hex(DEV_KEY).unwrap();
        let digest = keccak256(b"structured message digest");

        let first = key.sign_digest(&digest).unwrap();
        let second = key.sign_digest(&digest).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert!(first.v() == 27 || first.v() == 28);

        let verifying = SigningKey::from_slice(
            &hex::decode(DEV_KEY.trim_start_matches("0x")).unwrap(),
        )
        .unwrap()
        .verifying_key()
        .to_owned();
        let sig = k256::ecdsa::Signature::from_slice(&first.as_bytes()[..64]).unwrap();
        verifying.verify_prehash(digest.as_slice(), &sig).unwrap();
    }

    #[test]
    fn recovery_round_trips_to_the_signer_address() {
        let key = LocalSigningKey::from_hex(DEV_KEY).unwrap();
        let digest = keccak256(b"another digest");
        let signature = key.sign_digest(&digest).unwrap();
        let recovered = recover_address(&digest, &signature).unwrap();
        assert_eq!(recovered, key.address().unwrap());
    }
}
