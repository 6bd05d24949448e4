//! Interned-style identifiers and display text

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Cheap-to-clone identifier used for event names and name-kind arguments
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    /// Create a name from a string slice
    pub fn new(name: &str) -> Self {
        Name(Arc::from(name))
    }

    /// The empty name
    pub fn none() -> Self {
        Name(Arc::from(""))
    }

    /// Check whether this is the empty name
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::none()
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name::new(name)
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Name(Arc::from(name))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.0)
    }
}

/// User-facing display text
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Text(pub String);

impl Text {
    /// Create text from anything string-like
    pub fn new(text: impl Into<String>) -> Self {
        Text(text.into())
    }

    /// Borrow the text as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Text(text.to_string())
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_name_lookup_by_str() {
        let mut map = FxHashMap::default();
        map.insert(Name::new("Game.Start"), 1);
        assert_eq!(map.get("Game.Start"), Some(&1));
        assert_eq!(map.get("Game.Stop"), None);
    }

    #[test]
    fn test_none_name() {
        assert!(Name::default().is_none());
        assert!(!Name::from("x").is_none());
    }
}
