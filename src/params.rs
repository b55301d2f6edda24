//! Typed route parameters.
//!
//! Route templates declare their parameter holes with a [`ParamKind`]; the
//! values extracted from, or formatted into, a path are [`ParamValue`]s, and
//! the ordered set of values that belongs to one route part is a
//! [`RouteParams`].
//!
//! All conversions use a fixed, locale-invariant representation so the same
//! path always matches regardless of the host environment:
//!
//! | Kind    | Canonical form                          |
//! |---------|-----------------------------------------|
//! | `Str`   | the string itself                       |
//! | `Int`   | base-10 `i64`                           |
//! | `UInt`  | base-10 `u64`                           |
//! | `Float` | shortest round-trip `f64` (`1.5`, `-2`) |
//! | `Bool`  | `true` / `false`                        |
//! | `Date`  | ISO-8601 calendar date `YYYY-MM-DD`     |
//! | `Uuid`  | hyphenated lowercase                    |
//!
//! # Example
//!
//! ```
//! use view_navigator::{ParamKind, ParamValue, RouteParams};
//!
//! let value = ParamValue::parse(ParamKind::Int, "42").unwrap();
//! assert_eq!(value, ParamValue::Int(42));
//! assert_eq!(value.to_string(), "42");
//!
//! let params = RouteParams::new().with("id", 42_i64);
//! assert_eq!(params.get_as::<u32>("id"), Some(42));
//! ```

use chrono::NaiveDate;
use std::fmt;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared type of a template parameter hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Str,
    Int,
    UInt,
    Float,
    Bool,
    Date,
    Uuid,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Str => "string",
            ParamKind::Int => "int",
            ParamKind::UInt => "uint",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::Date => "date",
            ParamKind::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// A single typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Uuid(Uuid),
}

impl ParamValue {
    /// Kind of this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::UInt(_) => ParamKind::UInt,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Date(_) => ParamKind::Date,
            ParamValue::Uuid(_) => ParamKind::Uuid,
        }
    }

    /// Parse `text` with the canonical parser of `kind`.
    ///
    /// Returns `None` when the text is not a canonical value of that kind.
    /// Parsing never consults the process locale.
    pub fn parse(kind: ParamKind, text: &str) -> Option<Self> {
        match kind {
            ParamKind::Str => Some(ParamValue::Str(text.to_string())),
            ParamKind::Int => text.parse().ok().map(ParamValue::Int),
            ParamKind::UInt => text.parse().ok().map(ParamValue::UInt),
            ParamKind::Float => text.parse().ok().map(ParamValue::Float),
            ParamKind::Bool => match text {
                "true" => Some(ParamValue::Bool(true)),
                "false" => Some(ParamValue::Bool(false)),
                _ => None,
            },
            ParamKind::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(ParamValue::Date),
            ParamKind::Uuid => Uuid::parse_str(text).ok().map(ParamValue::Uuid),
        }
    }

    /// Canonical string form used when formatting paths.
    pub fn to_canonical_string(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(v) => v.to_string(),
            ParamValue::UInt(v) => v.to_string(),
            ParamValue::Float(v) => v.to_string(),
            ParamValue::Bool(v) => v.to_string(),
            ParamValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            ParamValue::Uuid(u) => u.hyphenated().to_string(),
        }
    }

    /// Borrow the string payload of a `Str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::UInt(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::UInt(u64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        ParamValue::Date(value)
    }
}

impl From<Uuid> for ParamValue {
    fn from(value: Uuid) -> Self {
        ParamValue::Uuid(value)
    }
}

// ============================================================================
// RouteParams
// ============================================================================

/// Ordered, named parameter values of one route part.
///
/// Order follows the template's holes, so two `RouteParams` built for the
/// same part compare equal exactly when their values are equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    params: Vec<(String, ParamValue)>,
}

impl RouteParams {
    /// Create empty route parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite a parameter. New keys are appended.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.params.push((key, value));
        }
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Get a parameter and parse its canonical string form as `T`.
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.to_canonical_string().parse().ok()
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over all `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Values in order, without their names.
    pub fn values(&self) -> Vec<ParamValue> {
        self.params.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Merge parent parameters with child parameters.
    ///
    /// Child parameters override parent parameters in case of collision.
    /// The navigator uses this to hand every level of a nested route the
    /// parameters of all its ancestors.
    ///
    /// ```
    /// use view_navigator::RouteParams;
    ///
    /// let parent = RouteParams::new().with("workspace", 7_i64).with("view", "list");
    /// let child = RouteParams::new().with("view", "grid");
    ///
    /// let merged = RouteParams::merge(&parent, &child);
    /// assert_eq!(merged.get_as::<i64>("workspace"), Some(7));
    /// assert_eq!(merged.get("view").and_then(|v| v.as_str()), Some("grid"));
    /// ```
    pub fn merge(parent: &RouteParams, child: &RouteParams) -> RouteParams {
        let mut merged = parent.clone();
        for (key, value) in child.iter() {
            merged.insert(key, value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RouteParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

// ============================================================================
// Tests
// ============================================================================
