use std::ops::Index;
use std::sync::Arc;

use uuid::Uuid;

use crate::*;

/// A decoded bookmark value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(Integer),
    Float(Float),
    Str(String),
    Data(Vec<u8>),
    Uuid(Uuid),
    Date(Date),
    Array(Vec<Value>),
    /// Key-value pairs in stored order. Keys are usually strings, but any value is allowed.
    Dict(Vec<(Value, Value)>),
    Url(Url),
    /// A record this crate couldn't interpret: either its kind is unknown, or its payload didn't
    /// match its tag. The raw tag and payload are kept so the record can be written back.
    Opaque(Opaque),
    /// Stand-in for a subtree that refers back into itself. Holds the slot that closed the
    /// cycle. Can't be encoded.
    Unresolved(u32),
}

/// Raw record contents, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opaque {
    pub tag: Tag,
    pub data: Vec<u8>,
}

impl Value {
    /// Build an array from anything that converts into values.
    pub fn array<I, T>(items: I) -> Value
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a dictionary from key-value pairs, keeping their order.
    pub fn dict<I, K, V>(pairs: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Dict(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The record kind this value is stored as. An unresolved reference has no record of its
    /// own, so it has no kind.
    pub fn kind(&self) -> Option<Kind> {
        Some(match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Boolean,
            Value::Int(_) | Value::Float(_) => Kind::Number,
            Value::Str(_) => Kind::String,
            Value::Data(_) => Kind::Data,
            Value::Uuid(_) => Kind::Uuid,
            Value::Date(_) => Kind::Date,
            Value::Array(_) => Kind::Array,
            Value::Dict(_) => Kind::Dict,
            Value::Url(_) => Kind::Url,
            Value::Opaque(o) => o.tag.kind(),
            Value::Unresolved(_) => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Value::Opaque(_) => "Opaque",
            v => v.kind().map_or("Unresolved", |kind| kind.name()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Value::Data(_))
    }

    pub fn is_uuid(&self) -> bool {
        matches!(self, Value::Uuid(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Value::Date(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, Value::Dict(_))
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Value::Url(_))
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Value::Opaque(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Value::Unresolved(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<Integer> {
        if let Value::Int(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(ref n) => Some(n.as_i64()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(ref n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(ref n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(ref val) = *self {
            Some(val.as_str())
        } else {
            None
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        if let Value::Data(ref val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        if let Value::Uuid(ref val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        if let Value::Date(date) = *self {
            Some(date)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(ref array) = *self {
            Some(array)
        } else {
            None
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match *self {
            Value::Array(ref mut array) => Some(array),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Value, Value)]> {
        if let Value::Dict(ref dict) = *self {
            Some(dict)
        } else {
            None
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Vec<(Value, Value)>> {
        match *self {
            Value::Dict(ref mut dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_url(&self) -> Option<&Url> {
        if let Value::Url(ref url) = *self {
            Some(url)
        } else {
            None
        }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        if let Value::Opaque(ref opaque) = *self {
            Some(opaque)
        } else {
            None
        }
    }

    /// Look up a dictionary entry by key. The first matching pair wins.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.as_dict()
            .and_then(|d| d.iter().find(|(k, _)| k == key).map(|(_, v)| v))
    }
}

static NULL: Value = Value::Null;

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        self.as_array().and_then(|v| v.get(index)).unwrap_or(&NULL)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, index: &str) -> &Self::Output {
        self.as_dict()
            .and_then(|d| {
                d.iter()
                    .find(|(k, _)| k.as_str() == Some(index))
                    .map(|(_, v)| v)
            })
            .unwrap_or(&NULL)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

macro_rules! impl_value_from_int {
    ($($t: ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Value {
                    Value::Int(v.into())
                }
            }
        )*
    };
}

impl_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<Integer> for Value {
    fn from(v: Integer) -> Value {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v.into())
    }
}

impl From<Float> for Value {
    fn from(v: Float) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::Data(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Value {
        Value::Data(v.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Value {
        Value::Uuid(v)
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Value {
        Value::Date(v)
    }
}

impl From<Url> for Value {
    fn from(v: Url) -> Value {
        Value::Url(v)
    }
}

impl From<Arc<Url>> for Value {
    fn from(v: Arc<Url>) -> Value {
        Value::Url(Arc::try_unwrap(v).unwrap_or_else(|shared| (*shared).clone()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::Array(v)
    }
}

impl From<Opaque> for Value {
    fn from(v: Opaque) -> Value {
        Value::Opaque(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn indexing() {
        let v = Value::dict([("red", Value::from("fish")), ("count", Value::from(2i8))]);
        assert_eq!(v["red"].as_str(), Some("fish"));
        assert_eq!(v["count"].as_i64(), Some(2));
        assert!(v["blue"].is_null());
        assert!(v[0].is_null());

        let path = Value::array(["Users", "bob", "file.txt"]);
        assert_eq!(path[2].as_str(), Some("file.txt"));
        assert!(path[3].is_null());
    }

    #[test]
    fn kinds() {
        assert_eq!(Value::from(1.5f64).kind(), Some(Kind::Number));
        assert_eq!(Value::from(7i32).kind(), Some(Kind::Number));
        assert_eq!(Value::from(vec![1u8, 2]).kind(), Some(Kind::Data));
        assert_eq!(Value::from(Url::new("file:///")).kind(), Some(Kind::Url));
        let opaque = Value::Opaque(Opaque {
            tag: Tag::from_raw(0x4200),
            data: vec![1],
        });
        assert_eq!(opaque.kind(), Some(Kind::Unknown(0x4200)));
        assert_eq!(opaque.name(), "Opaque");
        assert_eq!(Value::Unresolved(8).kind(), None);
        assert_eq!(Value::Unresolved(8).name(), "Unresolved");
        assert_eq!(Value::from(None::<bool>), Value::Null);
    }

    #[test]
    fn dict_lookup_by_any_key() {
        let v = Value::dict([(Value::from(1i8), "fish"), (Value::from("red"), "fish")]);
        assert_eq!(v.get(&Value::from(1i8)).and_then(Value::as_str), Some("fish"));
        assert!(v.get(&Value::from(2i8)).is_none());
    }
}
