//! Serde support for bookmark documents.
//!
//! Human-readable formats get binary payloads as base64 text and URLs as their absolute form.
//! Other formats get raw bytes and the URL chain as stored.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::{Serialize, SerializeMap, SerializeStruct, SerializeStructVariant, Serializer};
use serde_bytes::Bytes;

use crate::*;

struct Bin<'a>(&'a [u8]);

impl<'a> Serialize for Bin<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(self.0))
        } else {
            Bytes::new(self.0).serialize(serializer)
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(v.as_i64()),
            Value::Float(v) => serializer.serialize_f64(v.as_f64()),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Data(v) => Bin(v).serialize(serializer),
            Value::Uuid(v) => {
                if serializer.is_human_readable() {
                    let mut buf = uuid::Uuid::encode_buffer();
                    serializer.serialize_str(v.hyphenated().encode_upper(&mut buf))
                } else {
                    Bytes::new(v.as_bytes()).serialize(serializer)
                }
            }
            Value::Date(v) => v.serialize(serializer),
            Value::Array(v) => v.serialize(serializer),
            Value::Dict(v) => {
                let mut map = serializer.serialize_map(Some(v.len()))?;
                for (key, value) in v {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Url(v) => v.serialize(serializer),
            Value::Opaque(v) => {
                let mut sv = serializer.serialize_struct_variant("Value", 11, "Opaque", 2)?;
                sv.serialize_field("tag", &v.tag.raw())?;
                sv.serialize_field("data", &Bin(&v.data))?;
                sv.end()
            }
            Value::Unresolved(slot) => {
                serializer.serialize_newtype_variant("Value", 12, "Unresolved", slot)
            }
        }
    }
}

impl Serialize for Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return serializer.serialize_str(&self.absolute());
        }
        let mut st = serializer.serialize_struct("Url", 2)?;
        st.serialize_field("base", &self.base().map(|b| &**b))?;
        st.serialize_field("relative", self.text())?;
        st.end()
    }
}

impl Serialize for TocKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TocKey::Key(key) if serializer.is_human_readable() => {
                serializer.collect_str(key)
            }
            TocKey::Key(key) => key.serialize(serializer),
            TocKey::Name(name) => serializer.serialize_str(name),
        }
    }
}

impl Serialize for Toc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Bookmark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.toc_count()))?;
        for (id, toc) in self.tocs() {
            map.serialize_entry(&id, toc)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_to_json() {
        let v = Value::dict([
            ("name", Value::from("bob")),
            ("uid", Value::from(501i32)),
            ("blob", Value::from(vec![0u8, 1, 2, 3])),
            ("id", Value::Uuid(uuid::Uuid::from_bytes([0xab; 16]))),
            ("none", Value::Null),
        ]);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({
                "name": "bob",
                "uid": 501,
                "blob": "AAECAw==",
                "id": "ABABABAB-ABAB-ABAB-ABAB-ABABABABABAB",
                "none": null,
            })
        );
    }

    #[test]
    fn special_values_to_json() {
        let opaque = Value::Opaque(Opaque {
            tag: Tag::from_raw(0x4201),
            data: vec![0xff],
        });
        assert_eq!(
            serde_json::to_value(&opaque).unwrap(),
            json!({"Opaque": {"tag": 0x4201, "data": "/w=="}})
        );
        assert_eq!(
            serde_json::to_value(&Value::Unresolved(16)).unwrap(),
            json!({"Unresolved": 16})
        );
        let url = Url::with_base(Url::new("file:///"), "Users/");
        assert_eq!(
            serde_json::to_value(&Value::Url(url)).unwrap(),
            json!("file:///Users/")
        );
    }

    #[test]
    fn bookmark_to_json() {
        let b = Bookmark::builder()
            .put(Key::VOLUME_NAME, "Macintosh HD")
            .put(Key(0x1054), true)
            .put("com.example", 1i8)
            .build();
        assert_eq!(
            serde_json::to_value(&b).unwrap(),
            json!({
                "1": {
                    "0x1054": true,
                    "VolumeName": "Macintosh HD",
                    "com.example": 1,
                }
            })
        );
    }
}
