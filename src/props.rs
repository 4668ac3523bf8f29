use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Load and store options, keyed by the office suite's property name.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single option value as the office suite understands it.
///
/// JSON integers deserialize as `Long` when they fit in 32 bits, otherwise as
/// `Double`. `Short` only comes from Rust code (e.g. `UpdateDocMode`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum PropertyValue {
    Bool(bool),
    Short(i16),
    Long(i32),
    Double(f64),
    String(String),
    Props(PropertyMap),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `Short` and `Long` values.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropertyValue::Short(v) => Some(i32::from(*v)),
            PropertyValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_short(&self) -> Option<i16> {
        match self {
            PropertyValue::Short(v) => Some(*v),
            PropertyValue::Long(v) => i16::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_props(&self) -> Option<&PropertyMap> {
        match self {
            PropertyValue::Props(map) => Some(map),
            _ => None,
        }
    }

    /// Type name used in soffice's JSON filter option syntax.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Short(_) => "short",
            PropertyValue::Long(_) => "long",
            PropertyValue::Double(_) => "double",
            PropertyValue::String(_) => "string",
            PropertyValue::Props(_) => "[]com.sun.star.beans.PropertyValue",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Short(v) => write!(f, "{v}"),
            PropertyValue::Long(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::Props(map) => {
                write!(f, "{{")?;
                for (i, (name, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i16> for PropertyValue {
    fn from(v: i16) -> Self {
        PropertyValue::Short(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(v: PropertyMap) -> Self {
        PropertyValue::Props(v)
    }
}

impl TryFrom<Value> for PropertyValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(PropertyValue::Bool(b)),
            Value::Number(n) => {
                if let Some(v) = n.as_i64().and_then(|v| i32::try_from(v).ok()) {
                    Ok(PropertyValue::Long(v))
                } else {
                    n.as_f64()
                        .map(PropertyValue::Double)
                        .ok_or_else(|| format!("unrepresentable number {n}"))
                }
            }
            Value::String(s) => Ok(PropertyValue::String(s)),
            Value::Object(entries) => {
                let mut map = PropertyMap::new();
                for (name, v) in entries {
                    map.insert(name, PropertyValue::try_from(v)?);
                }
                Ok(PropertyValue::Props(map))
            }
            Value::Null => Err("null is not a property value".into()),
            Value::Array(_) => Err("arrays are not property values".into()),
        }
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Bool(b) => Value::Bool(b),
            PropertyValue::Short(v) => Value::from(v),
            PropertyValue::Long(v) => Value::from(v),
            PropertyValue::Double(v) => Value::from(v),
            PropertyValue::String(s) => Value::String(s),
            PropertyValue::Props(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

/// Named, typed properties of an object inside a loaded document.
pub trait PropertySet {
    fn property(&self, name: &str) -> Result<PropertyValue, Error>;

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), Error>;
}

pub(crate) fn expect_bool(name: &str, value: &PropertyValue) -> Result<bool, Error> {
    value
        .as_bool()
        .ok_or_else(|| Error::IllegalArgument(format!("{name} expects a boolean, got {value}")))
}

/// Builds a `PropertyMap` from `(name, value)` pairs.
pub fn property_map<I, K, V>(entries: I) -> PropertyMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<PropertyValue>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
