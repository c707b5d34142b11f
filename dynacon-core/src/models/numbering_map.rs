use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::residue::ResidueKey;

///
/// Trajectory wide mapping from residue to generic number label.
///
/// Residues that no alignment segment reached are absent. Iteration and
/// serialization follow residue key order, so equal maps serialize to equal
/// bytes.
///
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct NumberingMap {
    labels: BTreeMap<ResidueKey, String>,
}

impl NumberingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ResidueKey, label: String) -> Option<String> {
        self.labels.insert(key, label)
    }

    pub fn get(&self, key: &ResidueKey) -> Option<&str> {
        self.labels.get(key).map(|s| s.as_str())
    }

    pub fn contains(&self, key: &ResidueKey) -> bool {
        self.labels.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResidueKey, &str)> {
        self.labels.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Keys of one chain.
    pub fn chain_keys<'a>(&'a self, chain: &'a str) -> impl Iterator<Item = &'a ResidueKey> + 'a {
        self.labels.keys().filter(move |k| k.chain == chain)
    }

    ///
    /// Merge another map into this one. Chains never share keys, so a
    /// collision only happens when the same chain is merged twice; the
    /// incoming label wins.
    ///
    pub fn merge(&mut self, other: NumberingMap) {
        self.labels.extend(other.labels);
    }
}

impl FromIterator<(ResidueKey, String)> for NumberingMap {
    fn from_iter<T: IntoIterator<Item = (ResidueKey, String)>>(iter: T) -> Self {
        NumberingMap {
            labels: iter.into_iter().collect(),
        }
    }
}

impl Serialize for NumberingMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.labels.len()))?;
        for (key, label) in &self.labels {
            map.serialize_entry(&key.to_string(), label)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_merge_keeps_both_chains() {
        let mut a: NumberingMap = vec![(ResidueKey::new("A", "MET", 1), "1x50".to_string())]
            .into_iter()
            .collect();
        let b: NumberingMap = vec![(ResidueKey::new("B", "MET", 1), "TM1".to_string())]
            .into_iter()
            .collect();
        a.merge(b);

        assert_eq!(a.len(), 2);
        assert_eq!(a.chain_keys("B").count(), 1);
    }

    #[rstest]
    fn test_serialization_is_ordered() {
        let map: NumberingMap = vec![
            (ResidueKey::new("B", "VAL", 2), "1x51".to_string()),
            (ResidueKey::new("A", "MET", 10), "1x50".to_string()),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"A:MET:10":"1x50","B:VAL:2":"1x51"}"#);
    }
}
