use std::convert::TryFrom;

use byteorder::{LittleEndian, ReadBytesExt};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    tag::*,
    value::Opaque,
    Date, Float, Integer, Value,
};

/// Bytes taken by a record's length and tag words.
pub const RECORD_HEADER_LEN: usize = 8;

/// A record as it sits in the store: its slot, its tag, and the unpadded payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record<'a> {
    pub slot: u32,
    pub tag: Tag,
    pub payload: &'a [u8],
}

/// One level of interpretation of a record. Composite records give back the slots they refer
/// to; resolving those is up to the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Leaf(Value),
    Array(Vec<u32>),
    Dict(Vec<(u32, u32)>),
    RelativeUrl { base: u32, relative: u32 },
}

impl<'a> Record<'a> {
    /// Keep the record verbatim.
    pub fn to_opaque(&self) -> Value {
        Value::Opaque(Opaque {
            tag: self.tag,
            data: self.payload.to_vec(),
        })
    }

    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::invalid(self.slot, self.tag.raw(), reason)
    }

    fn utf8(&self) -> Result<String> {
        std::str::from_utf8(self.payload)
            .map(|s| s.to_string())
            .map_err(|e| self.invalid(format!("string is not UTF-8: {}", e)))
    }

    fn slot_list(&self) -> Result<Vec<u32>> {
        if self.payload.len() % 4 != 0 {
            return Err(self.invalid(format!(
                "slot list length {} is not a multiple of 4",
                self.payload.len()
            )));
        }
        let mut raw = self.payload;
        let mut slots = Vec::with_capacity(raw.len() / 4);
        while !raw.is_empty() {
            let slot = raw
                .read_u32::<LittleEndian>()
                .map_err(|e| self.invalid(e.to_string()))?;
            slots.push(slot);
        }
        Ok(slots)
    }

    /// Interpret the payload according to the tag. A payload that doesn't fit its tag gives
    /// [`Error::InvalidRecord`]. Unknown kinds are never an error: they come back as
    /// [`Value::Opaque`].
    pub fn parse(&self) -> Result<Element> {
        let (kind, subtype) = classify(self.tag.raw());
        let leaf = match kind {
            Kind::String => Value::Str(self.utf8()?),
            Kind::Data => Value::Data(self.payload.to_vec()),
            Kind::Number => {
                let ty = NumberType::from_u8(subtype)
                    .ok_or_else(|| self.invalid(format!("unknown number type {}", subtype)))?;
                if ty.is_float() {
                    Value::Float(Float::decode(ty, self.payload).map_err(|e| self.invalid(e))?)
                } else {
                    Value::Int(Integer::decode(ty, self.payload).map_err(|e| self.invalid(e))?)
                }
            }
            Kind::Date => Value::Date(Date::try_from(self.payload).map_err(|e| self.invalid(e))?),
            Kind::Boolean => match subtype {
                SUBTYPE_BOOLEAN_FALSE => Value::Bool(false),
                SUBTYPE_BOOLEAN_TRUE => Value::Bool(true),
                _ => return Err(self.invalid(format!("unknown boolean subtype {}", subtype))),
            },
            Kind::Uuid => {
                let uuid = Uuid::from_slice(self.payload).map_err(|_| {
                    self.invalid(format!("UUID needs 16 bytes, payload is {}", self.payload.len()))
                })?;
                Value::Uuid(uuid)
            }
            Kind::Null => Value::Null,
            Kind::Array => return Ok(Element::Array(self.slot_list()?)),
            Kind::Dict => {
                let slots = self.slot_list()?;
                if slots.len() % 2 != 0 {
                    return Err(self.invalid("dictionary has a key with no value"));
                }
                let pairs = slots.chunks_exact(2).map(|p| (p[0], p[1])).collect();
                return Ok(Element::Dict(pairs));
            }
            Kind::Url => match subtype {
                SUBTYPE_URL_ABSOLUTE => Value::Url(crate::Url::new(self.utf8()?)),
                SUBTYPE_URL_RELATIVE => {
                    let slots = self.slot_list()?;
                    if slots.len() != 2 {
                        return Err(self.invalid(format!(
                            "relative URL needs 2 slots, payload has {}",
                            slots.len()
                        )));
                    }
                    return Ok(Element::RelativeUrl {
                        base: slots[0],
                        relative: slots[1],
                    });
                }
                _ => return Err(self.invalid(format!("unknown URL subtype {}", subtype))),
            },
            Kind::Unknown(_) => self.to_opaque(),
        };
        Ok(Element::Leaf(leaf))
    }
}

/// Number of padding bytes needed to bring `len` up to a multiple of 4.
pub fn padding(len: usize) -> usize {
    (4 - (len & 3)) & 3
}

/// Append a record: length, tag, payload, then zero padding to a 4-byte boundary.
pub fn serialize_record(buf: &mut Vec<u8>, tag: Tag, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        Error::UnencodableValue(format!("record payload of {} bytes", payload.len()))
    })?;
    buf.reserve(record_size(payload.len()));
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&tag.raw().to_le_bytes());
    buf.extend_from_slice(payload);
    buf.resize(buf.len() + padding(payload.len()), 0);
    Ok(())
}

/// Bytes a record with this payload length takes up, padding included.
pub fn record_size(payload_len: usize) -> usize {
    RECORD_HEADER_LEN + payload_len + padding(payload_len)
}
