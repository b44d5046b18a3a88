//! Parameter and constant values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter value: either a string or a little-endian bit vector.
///
/// Bit vectors are written most-significant bit first, the way netlist
/// formats spell them (`"0110"` has bit 1 and bit 2 set).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Const {
    /// A string value, such as `"SB_LVCMOS"`.
    Str(String),
    /// A bit vector; index 0 is the least significant bit.
    Bits(Vec<bool>),
}

impl Const {
    /// Creates a string constant.
    pub fn string(s: impl Into<String>) -> Self {
        Const::Str(s.into())
    }

    /// Creates a `width`-bit constant holding the low bits of `value`.
    pub fn from_u64(value: u64, width: usize) -> Self {
        Const::Bits((0..width).map(|i| i < 64 && (value >> i) & 1 == 1).collect())
    }

    /// Parses a binary string, most-significant bit first.
    ///
    /// Returns `None` unless the string is a non-empty run of `0` and `1`.
    pub fn parse_binary(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b == b'0' || b == b'1') {
            return None;
        }
        Some(Const::Bits(s.bytes().rev().map(|b| b == b'1').collect()))
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Const::Str(s) => Some(s),
            Const::Bits(_) => None,
        }
    }

    /// Returns the bits, if this is a bit vector.
    pub fn as_bits(&self) -> Option<&[bool]> {
        match self {
            Const::Bits(bits) => Some(bits),
            Const::Str(_) => None,
        }
    }

    /// Returns the value as bits, accepting strings that spell a binary
    /// number.
    pub fn to_bits(&self) -> Option<Vec<bool>> {
        match self {
            Const::Bits(bits) => Some(bits.clone()),
            Const::Str(s) => match Const::parse_binary(s)? {
                Const::Bits(bits) => Some(bits),
                Const::Str(_) => None,
            },
        }
    }

    /// Returns the value as an unsigned integer, if it is a bit vector whose
    /// set bits all fit in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        let bits = self.to_bits()?;
        let mut value = 0u64;
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                if i >= 64 {
                    return None;
                }
                value |= 1 << i;
            }
        }
        Some(value)
    }

    /// Returns bit `i`; bits past the end read as `false`.
    ///
    /// # Panics
    ///
    /// Panics if this is a string constant.
    pub fn get_bit(&self, i: usize) -> bool {
        match self {
            Const::Bits(bits) => bits.get(i).copied().unwrap_or(false),
            Const::Str(s) => panic!("expected integer constant, found {s:?}"),
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Str(s) => write!(f, "{s:?}"),
            Const::Bits(bits) => {
                for &b in bits.iter().rev() {
                    f.write_str(if b { "1" } else { "0" })?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_is_msb_first() {
        let c = Const::parse_binary("0110").unwrap();
        assert_eq!(c.as_bits(), Some(&[false, true, true, false][..]));
        assert_eq!(c.to_string(), "0110");
        assert_eq!(c.to_u64(), Some(6));
    }

    #[test]
    fn bits_past_end_are_zero() {
        let c = Const::from_u64(0b101, 3);
        assert!(c.get_bit(0));
        assert!(!c.get_bit(1));
        assert!(c.get_bit(2));
        assert!(!c.get_bit(40));
    }

    #[test]
    fn rejects_non_binary() {
        assert!(Const::parse_binary("").is_none());
        assert!(Const::parse_binary("10x1").is_none());
        assert!(Const::string("SIMPLE").to_bits().is_none());
        assert_eq!(Const::string("11").to_u64(), Some(3));
    }

    #[test]
    #[should_panic(expected = "expected integer constant")]
    fn string_has_no_bits() {
        Const::string("SB_LVCMOS").get_bit(0);
    }

    #[test]
    fn wide_values_overflow_u64() {
        let mut bits = vec![false; 70];
        bits[65] = true;
        assert_eq!(Const::Bits(bits).to_u64(), None);
        assert_eq!(Const::from_u64(u64::MAX, 80).to_u64(), Some(u64::MAX));
    }

    #[test]
    fn serde_roundtrip() {
        let c = Const::from_u64(0xA5, 8);
        let json = serde_json::to_string(&c).unwrap();
        let restored: Const = serde_json::from_str(&json).unwrap();
        assert_eq!(c, restored);
    }
}
