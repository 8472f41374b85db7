//! Compressed-key reconstruction.
//!
//! Party keys travel as 32-byte x-only keys. Escrow scripts need 33-byte
//! compressed keys, so the even-Y marker `0x02` is prepended. Odd-Y keys are
//! not recovered: a party whose full key has odd Y gets a script key that is
//! the negation of theirs.

use bitcoin::secp256k1::PublicKey;
use cosign_core::{AddressError, PartyKey};

/// Even-Y compressed key prefix.
const EVEN_Y_PREFIX: u8 = 0x02;

/// Rebuild a compressed public key from x-only party key material.
///
/// Fails with `InvalidKeyMaterial` when the x coordinate is not on the curve.
pub fn reconstruct_compressed(key: &PartyKey) -> Result<PublicKey, AddressError> {
    let mut compressed = [0u8; 33];
    compressed[0] = EVEN_Y_PREFIX;
    compressed[1..].copy_from_slice(&key.to_bytes());
    PublicKey::from_slice(&compressed).map_err(|e| AddressError::InvalidKeyMaterial {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
