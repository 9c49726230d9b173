/// A single response header as a name-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Response headers keyed by case-insensitive name.
///
/// Behaves like a dictionary: [`insert`](HeaderMap::insert) replaces any
/// existing entry whose name matches ignoring ASCII case, and the first
/// spelling of a name is the one kept. Names and values are stored
/// verbatim; nothing is validated against HTTP token rules.
///
/// Iteration yields entries in insertion order, but consumers should not
/// depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<Header>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set `name` to `value`, replacing a previous value for the same name.
    ///
    /// Returns the replaced value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].value, value)),
            None => {
                self.entries.push(Header { name, value });
                None
            }
        }
    }

    /// Builder-style [`insert`](HeaderMap::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Get the value stored under `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove the entry stored under `name` (case-insensitive).
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Header> {
        self.entries
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }
}

impl FromIterator<Header> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for header in iter {
            map.insert(header.name, header.value);
        }
        map
    }
}

impl<N, V> FromIterator<(N, V)> for HeaderMap
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_new() {
        let h = Header::new("Content-Type", "application/json");
        assert_eq!(h.name, "Content-Type");
        assert_eq!(h.value, "application/json");
    }

    #[test]
    fn header_map_insert_and_get() {
        let mut map = HeaderMap::new();
        map.insert("Content-Type", "text/html");
        assert_eq!(map.get("content-type"), Some("text/html"));
        assert_eq!(map.get("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn header_map_get_missing() {
        let map = HeaderMap::new();
        assert_eq!(map.get("X-Missing"), None);
        assert!(!map.contains("X-Missing"));
    }

    #[test]
    fn insert_replaces_case_insensitively() {
        let mut map = HeaderMap::new();
        assert_eq!(map.insert("ETag", "\"a\""), None);
        assert_eq!(map.insert("etag", "\"b\""), Some("\"a\"".to_string()));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("ETAG"), Some("\"b\""));
        // First spelling wins.
        assert_eq!(map.iter().next().unwrap().name, "ETag");
    }

    #[test]
    fn header_map_remove() {
        let mut map = HeaderMap::new().with("X-A", "1").with("X-B", "2");
        assert_eq!(map.remove("x-a"), Some("1".to_string()));
        assert_eq!(map.remove("x-a"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn header_map_len_and_empty() {
        let mut map = HeaderMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);

        map.insert("X-Test", "1");
        assert!(!map.is_empty());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn header_map_from_tuples() {
        let map: HeaderMap = [("Host", "example.com"), ("Accept", "*/*"), ("host", "other")]
            .into_iter()
            .collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("host"), Some("other"));
    }

    #[test]
    fn malformed_names_are_kept_verbatim() {
        let map = HeaderMap::new().with("not a token:", "\r\n");
        assert_eq!(map.get("NOT A TOKEN:"), Some("\r\n"));
    }

    #[test]
    fn header_map_into_vec() {
        let map = HeaderMap::new().with("A", "1").with("B", "2");

        let vec = map.into_vec();
        assert_eq!(vec.len(), 2);
        assert_eq!(vec[0].name, "A");
        assert_eq!(vec[1].name, "B");
    }
}
