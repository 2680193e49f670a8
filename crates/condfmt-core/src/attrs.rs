//! Attribute groups for the attribute-event wire encoding.
//!
//! One [`AttributeMap`] carries the named string attributes of a single
//! element event. Front-ends build these from their own attribute
//! representation; the engine only ever reads them.

/// Named string attributes of one element event, in document order.
///
/// Lookups are linear; attribute groups in this format are tiny (a handful
/// of entries at most).
#[derive(Clone, Debug, Default)]
pub struct AttributeMap {
    entries: Vec<(String, String)>,
}

impl AttributeMap {
    /// Create an empty attribute group
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an attribute group from (name, value) pairs
    pub fn from_pairs<N, V, I>(pairs: I) -> Self
    where
        N: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (N, V)>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }

    /// Append an attribute. On duplicate names the first occurrence wins
    /// during lookup.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Get an attribute value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get an attribute value as an owned string
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    /// Parse an attribute as `f64`
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Parse an attribute as `u32`
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Parse an attribute as `i32`
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Parse an attribute as a boolean ("1"/"true" and "0"/"false")
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some("1") | Some("true") | Some("TRUE") => Some(true),
            Some("0") | Some("false") | Some("FALSE") => Some(false),
            _ => None,
        }
    }

    /// Whether the group carries an attribute with this name
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of attributes in the group
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
