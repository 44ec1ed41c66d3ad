use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Ordered public outputs a proof certifies.
pub type PublicInstances = Vec<Uint256>;

/// 256-bit unsigned integer, stored big-endian.
///
/// This is the wire type for public instances and witness values. It can hold
/// values outside the BN254 scalar field; [`Uint256::to_field`] is the only
/// way into the field and it refuses to reduce.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Uint256([u8; 32]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseUintError {
    #[error("empty integer literal")]
    Empty,

    #[error("invalid integer literal: {0:?}")]
    InvalidDigit(String),

    #[error("integer does not fit in 256 bits")]
    Overflow,
}

impl Uint256 {
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Canonical scalar field element, or `None` when the value is `>= r`.
    pub fn to_field(&self) -> Option<Fr> {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let end = 32 - 8 * i;
            let mut word = [0u8; 8];
            word.copy_from_slice(&self.0[end - 8..end]);
            *limb = u64::from_be_bytes(word);
        }
        Fr::from_bigint(BigInt::new(limbs))
    }

    pub fn from_field(value: &Fr) -> Self {
        let bytes = value.into_bigint().to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        Self(out)
    }

    fn from_biguint(value: &BigUint) -> Result<Self, ParseUintError> {
        let bytes = value.to_bytes_be();
        if bytes.len() > 32 {
            return Err(ParseUintError::Overflow);
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(out))
    }

    fn to_biguint(self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

impl FromStr for Uint256 {
    type Err = ParseUintError;

    /// Accepts decimal (`"149"`) or `0x`-prefixed hex (`"0x95"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => (hex, 16),
            None => (s, 10),
        };
        if digits.is_empty() {
            return Err(ParseUintError::Empty);
        }
        // parse_bytes tolerates '_' separators, which are not valid on the wire
        if !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(ParseUintError::InvalidDigit(s.to_string()));
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| ParseUintError::InvalidDigit(s.to_string()))?;
        Self::from_biguint(&value)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256(0x{})", hex::encode(self.0))
    }
}

// Always a decimal string: JSON numbers lose precision past 2^53 in most clients.
impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UintVisitor;

        impl Visitor<'_> for UintVisitor {
            type Value = Uint256;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal or 0x-hex string, or a non-negative integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Uint256::from_u64(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(Uint256::from_u64)
                    .map_err(|_| E::custom("negative integers are not uint256 values"))
            }

            fn visit_f64<E: de::Error>(self, _v: f64) -> Result<Self::Value, E> {
                Err(E::custom(
                    "floating-point numbers are not accepted; encode large integers as strings",
                ))
            }
        }

        deserializer.deserialize_any(UintVisitor)
    }
}
