//! # Schnorr Signing and Verification
//!
//! BIP-340 Schnorr signatures over canonical contract bytes.
//!
//! ## Security Invariant
//!
//! - Signing input is `&CanonicalBytes`. Raw bytes cannot be signed, so every
//!   party signs the same JCS serialization of the record.
//! - The message is `SHA-256(domain_tag || canonical_bytes)`, where the tag
//!   names the chain family. A signature approving a contract on one family
//!   never verifies for the other.
//! - `SchnorrKeyPair` does not implement `Serialize`, and its `Debug` output
//!   is redacted.
//!
//! Signing uses no auxiliary randomness, so the same key and record always
//! produce the same signature.

use bitcoin::secp256k1::{self, Keypair, Message, Secp256k1, SecretKey, XOnlyPublicKey};
use cosign_core::error::CryptoError;
use cosign_core::{hex, CanonicalBytes, ChainFamily, PartyKey};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// A 64-byte BIP-340 signature. Serializes as 128 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchnorrSignature(pub [u8; 64]);

/// A secp256k1 key pair used to approve contracts.
#[derive(Clone)]
pub struct SchnorrKeyPair {
    keypair: Keypair,
}

// ---------------------------------------------------------------------------
// SchnorrSignature
// ---------------------------------------------------------------------------

impl SchnorrSignature {
    /// The raw 64 bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 128 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_array::<64>(s, "signature")
            .map(Self)
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))
    }
}

impl Serialize for SchnorrSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SchnorrSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for SchnorrSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SchnorrSignature({}...)", hex::prefix(&self.0))
    }
}

impl std::fmt::Display for SchnorrSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// SchnorrKeyPair
// ---------------------------------------------------------------------------

impl SchnorrKeyPair {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        loop {
            let mut seed = Zeroizing::new([0u8; 32]);
            OsRng.fill_bytes(&mut seed[..]);
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(sk) = SecretKey::from_slice(&seed[..]) {
                return Self {
                    keypair: Keypair::from_secret_key(&secp, &sk),
                };
            }
        }
    }

    /// Build from a 32-byte secret.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(secret)
            .map_err(|e| CryptoError::KeyError(format!("invalid secret key: {e}")))?;
        Ok(Self {
            keypair: Keypair::from_secret_key(&secp, &sk),
        })
    }

    /// Build from 64 hex characters.
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            hex::decode_array::<32>(s, "secret key").map_err(|e| CryptoError::KeyError(e.to_string()))?,
        );
        Self::from_secret_bytes(&bytes)
    }

    /// Secret key as hex, for writing key files. Handle with care.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.keypair.secret_bytes());
        Zeroizing::new(hex::encode(&bytes[..]))
    }

    /// The x-only public key, as the party identity.
    pub fn party_key(&self) -> PartyKey {
        let (xonly, _parity) = self.keypair.x_only_public_key();
        PartyKey::from_bytes(&xonly.serialize())
    }

    /// Sign canonical bytes within a chain family's signing domain.
    pub fn sign(&self, family: ChainFamily, data: &CanonicalBytes) -> SchnorrSignature {
        let secp = Secp256k1::signing_only();
        let msg = domain_message(family, data);
        let sig = secp.sign_schnorr_no_aux_rand(&msg, &self.keypair);
        SchnorrSignature(sig.serialize())
    }
}

impl std::fmt::Debug for SchnorrKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SchnorrKeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify that `signer` signed `data` within `family`'s signing domain.
///
/// `signature_hex` is the value as stored in a signature set.
pub fn verify_contract_signature(
    family: ChainFamily,
    data: &CanonicalBytes,
    signature_hex: &str,
    signer: &PartyKey,
) -> Result<(), CryptoError> {
    let sig = SchnorrSignature::from_hex(signature_hex)?;
    let sig = secp256k1::schnorr::Signature::from_slice(sig.as_bytes())
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    let xonly = XOnlyPublicKey::from_slice(&signer.to_bytes())
        .map_err(|e| CryptoError::KeyError(format!("{signer} is not a valid x-only key: {e}")))?;
    let secp = Secp256k1::verification_only();
    secp.verify_schnorr(&sig, &domain_message(family, data), &xonly)
        .map_err(|e| CryptoError::VerificationFailed(format!("signature by {signer}: {e}")))
}

/// Signing domain tag for a chain family.
fn domain_tag(family: ChainFamily) -> String {
    format!("cosign/{}/v1", family.as_str())
}

fn domain_message(family: ChainFamily, data: &CanonicalBytes) -> Message {
    let mut hasher = Sha256::new();
    hasher.update(domain_tag(family).as_bytes());
    hasher.update(data.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    Message::from_digest(digest)
}
