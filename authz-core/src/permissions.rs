use serde::Serialize;
use std::collections::BTreeMap;

/// Derived capability set: permission key to granted flag.
///
/// Values are recomputed whenever the tenant selection changes and are never
/// mutated in place. Keys outside the catalog read as not granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<&'static str, bool>);

impl PermissionMap {
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.has(key))
    }

    pub fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.has(key))
    }

    /// Granted keys, sorted.
    pub fn granted(&self) -> Vec<&'static str> {
        self.0
            .iter()
            .filter_map(|(key, granted)| granted.then_some(*key))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.0.iter().map(|(key, granted)| (*key, *granted))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(&'static str, bool)> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = (&'static str, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn has(map: &PermissionMap, key: &str) -> bool {
    map.has(key)
}

pub fn has_any(map: &PermissionMap, keys: &[&str]) -> bool {
    map.has_any(keys)
}

pub fn has_all(map: &PermissionMap, keys: &[&str]) -> bool {
    map.has_all(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PermissionMap {
        [("a:view", true), ("a:edit", false), ("b:view", true)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_has_unknown_key_is_false() {
        assert!(!sample().has("c:view"));
    }

    #[test]
    fn test_has_any_and_has_all() {
        let map = sample();
        assert!(has_any(&map, &["a:edit", "b:view"]));
        assert!(!has_any(&map, &["a:edit", "c:view"]));
        assert!(has_all(&map, &["a:view", "b:view"]));
        assert!(!has_all(&map, &["a:view", "a:edit"]));
    }

    #[test]
    fn test_empty_key_lists() {
        let map = sample();
        assert!(!map.has_any(&[]));
        assert!(map.has_all(&[]));
    }

    #[test]
    fn test_granted_lists_true_keys() {
        assert_eq!(sample().granted(), vec!["a:view", "b:view"]);
    }

    #[test]
    fn test_serializes_as_object() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["a:view"], true);
        assert_eq!(json["a:edit"], false);
    }
}
