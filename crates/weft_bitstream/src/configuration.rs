//! The assembled configuration: a map from physical bits to values.
//!
//! Only bits that assembly wrote are stored. Every other bit of the device
//! reads as `false`, so two configurations are equal exactly when they wrote
//! the same bits with the same values.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use weft_common::{ContentHash, ContentHasher};
use weft_fabric::{ConfigBit, ExtraBit};

/// Configuration bit values plus the set extra (non-positional) bits.
///
/// Iteration is in `(tile, row, col)` order, which is also the order the
/// fingerprint is computed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(with = "pairs")]
    bits: BTreeMap<ConfigBit, bool>,
    extra: BTreeSet<ExtraBit>,
}

impl Configuration {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one bit.
    pub fn set_bit(&mut self, bit: ConfigBit, value: bool) {
        if let Some(old) = self.bits.insert(bit, value) {
            if old != value {
                tracing::trace!(%bit, old, value, "bit overwritten");
            }
        }
    }

    /// Writes `value[i]` into `bits[i]`; bits past the end of `value` are
    /// written as `false`.
    pub fn set_bits(&mut self, bits: &[ConfigBit], value: &[bool]) {
        for (i, &bit) in bits.iter().enumerate() {
            self.set_bit(bit, value.get(i).copied().unwrap_or(false));
        }
    }

    /// Sets an extra bit.
    pub fn set_extra(&mut self, bit: ExtraBit) {
        self.extra.insert(bit);
    }

    /// Returns the value of `bit`. Unwritten bits are `false`.
    pub fn get(&self, bit: ConfigBit) -> bool {
        self.bits.get(&bit).copied().unwrap_or(false)
    }

    /// Returns whether `bit` was written at all.
    pub fn is_written(&self, bit: ConfigBit) -> bool {
        self.bits.contains_key(&bit)
    }

    /// Iterates over written bits in order.
    pub fn iter(&self) -> impl Iterator<Item = (ConfigBit, bool)> + '_ {
        self.bits.iter().map(|(&b, &v)| (b, v))
    }

    /// Iterates over the set extra bits in order.
    pub fn extra_bits(&self) -> impl Iterator<Item = ExtraBit> + '_ {
        self.extra.iter().copied()
    }

    /// Returns the number of written bits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty() && self.extra.is_empty()
    }

    /// Returns the number of bits written as `true`.
    pub fn ones(&self) -> usize {
        self.bits.values().filter(|&&v| v).count()
    }

    /// Computes an XXH3-128 fingerprint of the written bits and extra bits.
    pub fn fingerprint(&self) -> ContentHash {
        let mut h = ContentHasher::new();
        h.write_u32(self.bits.len() as u32);
        for (bit, value) in self.iter() {
            h.write_u32(bit.tile.as_raw())
                .write_u32(bit.row)
                .write_u32(bit.col)
                .write_bool(value);
        }
        h.write_u32(self.extra.len() as u32);
        for e in &self.extra {
            h.write_u32(e.bank).write_u32(e.x).write_u32(e.y);
        }
        h.finish()
    }
}

/// Serializes the bit map as a list of `(bit, value)` pairs, since the keys
/// are structs.
mod pairs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bits: &BTreeMap<ConfigBit, bool>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(bits.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ConfigBit, bool>, D::Error> {
        let pairs: Vec<(ConfigBit, bool)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
