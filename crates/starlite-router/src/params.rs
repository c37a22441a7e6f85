//! Typed path parameter values.

use std::fmt;

use uuid::Uuid;

/// A path parameter converted to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// `str` parameter.
    Str(String),
    /// `int` parameter.
    Int(i64),
    /// `float` parameter.
    Float(f64),
    /// `uuid` parameter.
    Uuid(Uuid),
    /// `path` parameter: the slash-joined remainder of the request path.
    Path(String),
}

impl ParamValue {
    /// Returns the value as a string slice for `str` and `path` parameters.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Path(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) | Self::Path(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
        }
    }
}

/// Path parameters extracted for one request, in path order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams {
    entries: Vec<(String, ParamValue)>,
}

impl PathParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: ParamValue) {
        self.entries.push((name.into(), value));
    }

    /// Get a parameter value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Get a `str` or `path` parameter.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    /// Get an `int` parameter.
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    /// Get a `float` parameter.
    #[must_use]
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_float)
    }

    /// Get a `uuid` parameter.
    #[must_use]
    pub fn get_uuid(&self, name: &str) -> Option<Uuid> {
        self.get(name).and_then(ParamValue::as_uuid)
    }

    /// Iterate over `(name, value)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no parameters were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_only_match_their_variant() {
        let mut params = PathParams::new();
        params.push("id", ParamValue::Int(7));
        params.push("name", ParamValue::Str("ann".into()));

        assert_eq!(params.get_int("id"), Some(7));
        assert_eq!(params.get_str("id"), None);
        assert_eq!(params.get_str("name"), Some("ann"));
        assert_eq!(params.get_float("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn display_renders_raw_value() {
        assert_eq!(ParamValue::Int(-3).to_string(), "-3");
        assert_eq!(ParamValue::Path("a/b".into()).to_string(), "a/b");
    }
}
