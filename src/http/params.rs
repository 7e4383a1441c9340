//! Parameter multimaps for query and path parameters
//!
//! Duplicate keys are allowed (e.g. `?tag=a&tag=b`); read order is not part
//! of the contract. Values are stored decoded.

use std::borrow::Cow;

/// A multimap of request parameters with duplicate-key semantics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: Vec<(String, String)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (`a=1&tag=x&tag=y`) into a parameter map.
    /// Percent-encoded names and values are decoded; undecodable byte
    /// sequences keep their raw form.
    pub fn from_query(query: &str) -> Self {
        let mut map = Self::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = match pair.split_once('=') {
                Some((n, v)) => (n, v),
                None => (pair, ""),
            };
            map.add(decode_component(name), decode_component(value));
        }
        map
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for the given name, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for the given name, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

fn decode_component(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_with_duplicates() {
        let map = ParameterMap::from_query("a=1&tag=x&tag=y&flag");
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.get_all("tag"), vec!["x", "y"]);
        assert_eq!(map.get("flag"), Some(""));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn decodes_percent_encoding() {
        let map = ParameterMap::from_query("name=hello%20world&path=%2Fapi");
        assert_eq!(map.get("name"), Some("hello world"));
        assert_eq!(map.get("path"), Some("/api"));
    }

    #[test]
    fn empty_query_yields_empty_map() {
        assert!(ParameterMap::from_query("").is_empty());
    }
}
