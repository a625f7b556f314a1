//! Types shared between the circuit, the host-side verifier and the registry.

use crate::constants::{snark_scalar_field_be, NUM_PUBLIC_INPUTS};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};

/// Encode a field element as 32 big-endian bytes.
pub fn fr_to_be_bytes(x: &Fr) -> [u8; 32] {
    let bytes = x.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Decode 32 big-endian bytes into a field element.
///
/// Values at or above the modulus are rejected rather than reduced.
pub fn fr_from_be_bytes(bytes: &[u8; 32]) -> Option<Fr> {
    if bytes.as_slice() >= snark_scalar_field_be().as_slice() {
        return None;
    }
    Some(Fr::from_be_bytes_mod_order(bytes))
}

/// Parse a big-endian hex string (optional `0x` prefix, up to 64 nibbles) into a field element.
pub fn fr_from_hex(s: &str) -> Result<Fr, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() || s.len() > 64 {
        return Err(format!("invalid field hex length: {}", s.len()));
    }
    let padded = format!("{s:0>64}");
    let raw = hex::decode(padded).map_err(|e| format!("invalid hex: {e}"))?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&raw);
    fr_from_be_bytes(&bytes).ok_or_else(|| "value is not below the scalar field modulus".to_string())
}

/// `0x`-prefixed big-endian hex encoding of a field element.
pub fn fr_to_hex(x: &Fr) -> String {
    format!("0x{}", hex::encode(fr_to_be_bytes(x)))
}

/// JSON-friendly representation of a field element.
///
/// Field elements travel as `0x`-prefixed big-endian hex strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrHex(pub String);

impl FrHex {
    pub fn from_fr(x: &Fr) -> Self {
        Self(fr_to_hex(x))
    }

    pub fn to_fr(&self) -> Result<Fr, String> {
        fr_from_hex(&self.0)
    }
}

impl From<Fr> for FrHex {
    fn from(x: Fr) -> Self {
        Self::from_fr(&x)
    }
}

/// Public inputs of a membership proof.
///
/// `signal` here is the already-hashed signal field element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicSignals {
    pub root: Fr,
    pub nullifier_hash: Fr,
    pub signal: Fr,
    pub external_nullifier: Fr,
}

impl PublicSignals {
    /// Ordering MUST match the circuit's `new_input` allocation order.
    pub fn to_field_elems(&self) -> [Fr; NUM_PUBLIC_INPUTS] {
        [self.root, self.nullifier_hash, self.signal, self.external_nullifier]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_short_and_prefixed_forms() {
        assert_eq!(fr_from_hex("0x2a").unwrap(), Fr::from(42u64));
        assert_eq!(fr_from_hex("2a").unwrap(), Fr::from(42u64));
        assert_eq!(fr_to_hex(&Fr::from(42u64)).len(), 66);
    }

    #[test]
    fn hex_rejects_modulus() {
        let modulus = hex::encode(snark_scalar_field_be());
        assert!(fr_from_hex(&modulus).is_err());
        assert!(fr_from_hex("").is_err());
        assert!(fr_from_hex("zz").is_err());
    }

    #[test]
    fn frhex_serializes_as_plain_string() {
        let v = FrHex::from_fr(&Fr::from(7u64));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, format!("\"{}\"", v.0));
        let back: FrHex = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_fr().unwrap(), Fr::from(7u64));
    }
}
