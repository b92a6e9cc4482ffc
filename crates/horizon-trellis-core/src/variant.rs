//! Type-erased value container for dynamic members and state.
//!
//! `Variant` is the currency of the dynamic object model: instance state
//! bags, data members on member tables, scheduler argument lists and
//! hydrated JSON nodes are all expressed as variants. It provides type-safe
//! access through the `as_*` methods and the generic `downcast` method.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Type-erased container for dynamic values.
///
/// # Equality
///
/// `Variant` implements shallow structural equality: scalars compare by
/// value, lists and maps element-wise. `Custom` payloads compare by
/// allocation identity (`Arc::ptr_eq`), so two independently boxed values
/// are never equal even when their contents match. The scheduler relies on
/// this when deciding whether two pending argument lists coalesce.
#[derive(Debug, Clone, Default)]
pub enum Variant {
    /// No value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    Text(String),
    /// Ordered list of values.
    List(Vec<Variant>),
    /// String-keyed map of values, ordered by key.
    Map(BTreeMap<String, Variant>),
    /// Custom data (type-erased, shared).
    Custom(Arc<dyn std::any::Any + Send + Sync>),
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Variant {
    /// Creates new custom data from any type.
    pub fn custom<T: std::any::Any + Send + Sync + 'static>(value: T) -> Self {
        Self::Custom(Arc::new(value))
    }

    /// Returns `true` if this is `Variant::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if this contains some value.
    pub fn is_some(&self) -> bool {
        !self.is_null()
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float.
    ///
    /// Integers widen losslessly where possible.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an owned string.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get the value as a list slice.
    pub fn as_list(&self) -> Option<&[Variant]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to get the value as a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Variant>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key in a map variant.
    ///
    /// Returns `None` for non-map variants or missing keys.
    pub fn get(&self, key: &str) -> Option<&Variant> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Attempts to downcast custom data to a concrete type.
    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Custom(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Renders scalar variants as a plain string key.
    ///
    /// Used by keyed containers when deriving index keys from item fields:
    /// text passes through, integers and booleans format, everything else
    /// (including `Null`) yields `None`.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Variant>> for Variant {
    fn from(value: Vec<Variant>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<Variant>> From<Option<T>> for Variant {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
