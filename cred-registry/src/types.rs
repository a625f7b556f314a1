//! Identifiers used by the registry.

use cred_zk::constants::snark_scalar_field_be;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 256-bit cred (group) identifier, stored big-endian.
///
/// Any 256-bit value can be represented; only ids below `SNARK_SCALAR_FIELD` can be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredId([u8; 32]);

impl CredId {
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// `true` if the id can be used as a field element.
    pub fn is_in_field(&self) -> bool {
        self.0 < snark_scalar_field_be()
    }

    fn as_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }
}

impl From<u64> for CredId {
    fn from(v: u64) -> Self {
        Self::from(u128::from(v))
    }
}

impl From<u128> for CredId {
    fn from(v: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&v.to_be_bytes());
        Self(bytes)
    }
}

/// Small ids print in decimal, large ones as `0x`-prefixed hex.
impl fmt::Display for CredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_u128() {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

/// Accepts decimal (up to `u128::MAX`) or `0x`-prefixed hex (up to 64 nibbles).
impl FromStr for CredId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(h) = s.strip_prefix("0x") {
            if h.is_empty() || h.len() > 64 {
                return Err(format!("invalid cred id hex length: {}", h.len()));
            }
            let raw = hex::decode(format!("{h:0>64}")).map_err(|e| format!("invalid cred id hex: {e}"))?;
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&raw);
            return Ok(Self(bytes));
        }
        s.parse::<u128>()
            .map(Self::from)
            .map_err(|e| format!("invalid cred id: {e}"))
    }
}

impl TryFrom<String> for CredId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CredId> for String {
    fn from(id: CredId) -> Self {
        id.to_string()
    }
}

/// Opaque identity of a caller (e.g. an account address).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex() {
        assert_eq!("5".parse::<CredId>().unwrap(), CredId::from(5u64));
        assert_eq!("0x05".parse::<CredId>().unwrap(), CredId::from(5u64));
        assert!("-1".parse::<CredId>().is_err());
        assert!("0x".parse::<CredId>().is_err());
    }

    #[test]
    fn field_bound_is_exclusive() {
        let modulus = CredId::from_be_bytes(snark_scalar_field_be());
        assert!(!modulus.is_in_field());

        let mut below = snark_scalar_field_be();
        below[31] -= 1;
        assert!(CredId::from_be_bytes(below).is_in_field());
        assert!(CredId::from(0u64).is_in_field());
    }

    #[test]
    fn display_round_trips() {
        let big = CredId::from_be_bytes([0xff; 32]);
        assert!(big.to_string().starts_with("0x"));
        assert_eq!(big.to_string().parse::<CredId>().unwrap(), big);
        assert_eq!(CredId::from(42u64).to_string(), "42");

        let json = serde_json::to_string(&CredId::from(42u64)).unwrap();
        assert_eq!(json, "\"42\"");
    }
}
