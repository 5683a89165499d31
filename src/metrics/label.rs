/*!
 * Label Sets
 * Immutable, order-independent dimension maps used as series keys and log fields
 */

use crate::core::types::SmallStr;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Immutable mapping of dimension name → value
///
/// Identity key for metric series and field container for log records.
/// Pairs are kept sorted by key, so equality and hashing are
/// order-independent: `{a=1, b=2}` and `{b=2, a=1}` are the same set.
/// Construction is the only mutation; deriving a new set goes through
/// [`LabelSet::with`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LabelSet {
    // Sorted by key, keys unique
    pairs: Vec<(SmallStr, SmallStr)>,
}

impl LabelSet {
    /// Empty label set
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a label set
    #[inline]
    pub fn builder() -> LabelSetBuilder {
        LabelSetBuilder { pairs: Vec::new() }
    }

    /// Build from parallel key/value slices, zipping them positionally
    ///
    /// Extra values beyond the keys (or vice versa) are ignored.
    pub fn zip(keys: &[SmallStr], values: &[&str]) -> Self {
        let mut pairs: Vec<(SmallStr, SmallStr)> = keys
            .iter()
            .zip(values.iter())
            .map(|(k, v)| (k.clone(), SmallStr::from(*v)))
            .collect();
        Self::normalize(&mut pairs);
        Self { pairs }
    }

    /// Derive a new set with one additional (or replaced) pair
    pub fn with(&self, key: &str, value: &str) -> Self {
        let mut pairs = self.pairs.clone();
        pairs.push((SmallStr::from(key), SmallStr::from(value)));
        Self::normalize(&mut pairs);
        Self { pairs }
    }

    /// Look up a value by dimension name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|i| self.pairs[i].1.as_str())
    }

    /// Merge `self` over `base`: pairs in `self` win on key conflicts
    pub fn merge_over(&self, base: &LabelSet) -> Self {
        let mut pairs = base.pairs.clone();
        pairs.extend(self.pairs.iter().cloned());
        Self::normalize(&mut pairs);
        Self { pairs }
    }

    /// Apply a transformation to every value, preserving keys
    pub fn map_values<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &str) -> SmallStr,
    {
        let pairs = self
            .pairs
            .iter()
            .map(|(k, v)| (k.clone(), f(k.as_str(), v.as_str())))
            .collect();
        // Keys unchanged, sort order preserved
        Self { pairs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // Sort by key; on duplicates the later insertion wins
    fn normalize(pairs: &mut Vec<(SmallStr, SmallStr)>) {
        pairs.reverse();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.dedup_by(|a, b| a.0 == b.0);
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut pairs: Vec<(SmallStr, SmallStr)> = iter
            .into_iter()
            .map(|(k, v)| (SmallStr::from(k), SmallStr::from(v)))
            .collect();
        Self::normalize(&mut pairs);
        Self { pairs }
    }
}

impl From<&[(&str, &str)]> for LabelSet {
    fn from(pairs: &[(&str, &str)]) -> Self {
        pairs.iter().copied().collect()
    }
}

/// Builder for [`LabelSet`]
#[derive(Debug, Default)]
pub struct LabelSetBuilder {
    pairs: Vec<(SmallStr, SmallStr)>,
}

impl LabelSetBuilder {
    /// Add a dimension; a repeated key overrides the earlier value
    pub fn field(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.pairs
            .push((SmallStr::from(key), SmallStr::from(value.to_string())));
        self
    }

    pub fn build(mut self) -> LabelSet {
        LabelSet::normalize(&mut self.pairs);
        LabelSet { pairs: self.pairs }
    }
}

// Serialized as a JSON map so log lines read naturally:
// {"route": "/api", "status": "500"}
impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (k, v) in &self.pairs {
            map.serialize_entry(k.as_str(), v.as_str())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LabelSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelSetVisitor;

        impl<'de> Visitor<'de> for LabelSetVisitor {
            type Value = LabelSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of label names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LabelSet, A::Error> {
                let mut pairs: Vec<(SmallStr, SmallStr)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    pairs.push((SmallStr::from(k), SmallStr::from(v)));
                }
                LabelSet::normalize(&mut pairs);
                Ok(LabelSet { pairs })
            }
        }

        deserializer.deserialize_map(LabelSetVisitor)
    }
}
