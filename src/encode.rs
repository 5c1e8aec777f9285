use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    record::serialize_record,
    store::{BOOKMARK_MAGIC, MIN_HEADER_LEN, TOC_ENTRY_LEN, TOC_HEADER_LEN, TOC_MAGIC},
    tag::*,
    *,
};

/// Flattens values into records. Children are always written before the records that refer to
/// them.
struct Encoder {
    /// Everything after the header. The first 4 bytes are the first TOC slot, filled in last.
    body: Vec<u8>,
    /// Slots of URLs already written, by `Arc` identity.
    urls: HashMap<*const Url, u32>,
}

impl Encoder {
    fn new() -> Self {
        Encoder {
            body: vec![0; 4],
            urls: HashMap::new(),
        }
    }

    fn next_slot(&self) -> Result<u32> {
        u32::try_from(self.body.len())
            .map_err(|_| Error::UnencodableValue("bookmark exceeds 4 GiB".to_string()))
    }

    fn record(&mut self, tag: u32, payload: &[u8]) -> Result<u32> {
        let slot = self.next_slot()?;
        serialize_record(&mut self.body, Tag::from_raw(tag), payload)?;
        trace!("slot 0x{:x}: tag 0x{:04x}, {} bytes", slot, tag, payload.len());
        Ok(slot)
    }

    fn slots(&mut self, tag: u32, slots: &[u32]) -> Result<u32> {
        let mut payload = Vec::with_capacity(slots.len() * 4);
        for slot in slots {
            payload.extend_from_slice(&slot.to_le_bytes());
        }
        self.record(tag, &payload)
    }

    fn write(&mut self, value: &Value) -> Result<u32> {
        match value {
            Value::Null => self.record(TYPE_NULL | SUBTYPE_ONE as u32, &[]),
            Value::Bool(v) => {
                let sub = if *v {
                    SUBTYPE_BOOLEAN_TRUE
                } else {
                    SUBTYPE_BOOLEAN_FALSE
                };
                self.record(TYPE_BOOLEAN | sub as u32, &[])
            }
            Value::Int(n) => {
                if Integer::new(n.number_type(), n.as_i64()).is_none() {
                    return Err(Error::UnencodableValue(format!(
                        "{} does not fit {:?}",
                        n,
                        n.number_type()
                    )));
                }
                let mut payload = Vec::with_capacity(8);
                n.encode_vec(&mut payload);
                self.record(TYPE_NUMBER | n.number_type().into_u8() as u32, &payload)
            }
            Value::Float(f) => {
                if Float::new(f.number_type(), f.as_f64()).is_none() {
                    return Err(Error::UnencodableValue(format!(
                        "{} is not representable as {:?}",
                        f,
                        f.number_type()
                    )));
                }
                let mut payload = Vec::with_capacity(8);
                f.encode_vec(&mut payload);
                self.record(TYPE_NUMBER | f.number_type().into_u8() as u32, &payload)
            }
            Value::Str(s) => self.record(TYPE_STRING | SUBTYPE_ONE as u32, s.as_bytes()),
            Value::Data(d) => self.record(TYPE_DATA | SUBTYPE_ONE as u32, d),
            Value::Uuid(u) => self.record(TYPE_UUID | SUBTYPE_ONE as u32, u.as_bytes()),
            Value::Date(d) => {
                let mut payload = Vec::with_capacity(d.size());
                d.encode_vec(&mut payload);
                self.record(TYPE_DATE | SUBTYPE_ZERO as u32, &payload)
            }
            Value::Array(items) => {
                let mut slots = Vec::with_capacity(items.len());
                for item in items {
                    slots.push(self.write(item)?);
                }
                self.slots(TYPE_ARRAY | SUBTYPE_ONE as u32, &slots)
            }
            Value::Dict(pairs) => {
                let mut slots = Vec::with_capacity(pairs.len() * 2);
                for (key, value) in pairs {
                    slots.push(self.write(key)?);
                    slots.push(self.write(value)?);
                }
                self.slots(TYPE_DICT | SUBTYPE_ONE as u32, &slots)
            }
            Value::Url(url) => self.url(url),
            Value::Opaque(opaque) if holds_slots(opaque.tag) => {
                Err(Error::UnencodableValue(format!(
                    "record with tag 0x{:04x} refers to slots of another bookmark",
                    opaque.tag.raw()
                )))
            }
            Value::Opaque(opaque) => self.record(opaque.tag.raw(), &opaque.data),
            Value::Unresolved(slot) => Err(Error::UnencodableValue(format!(
                "unresolved reference to slot 0x{:x}",
                slot
            ))),
        }
    }

    fn url(&mut self, url: &Url) -> Result<u32> {
        match url {
            Url::Absolute(text) => {
                self.record(TYPE_URL | SUBTYPE_URL_ABSOLUTE as u32, text.as_bytes())
            }
            Url::Relative { base, relative } => {
                let base = self.shared_url(base)?;
                let relative = self.record(TYPE_STRING | SUBTYPE_ONE as u32, relative.as_bytes())?;
                self.slots(TYPE_URL | SUBTYPE_URL_RELATIVE as u32, &[base, relative])
            }
        }
    }

    fn shared_url(&mut self, url: &Arc<Url>) -> Result<u32> {
        let ptr = Arc::as_ptr(url);
        if let Some(slot) = self.urls.get(&ptr) {
            return Ok(*slot);
        }
        let slot = self.url(url)?;
        self.urls.insert(ptr, slot);
        Ok(slot)
    }

    fn key(&mut self, key: &TocKey) -> Result<u32> {
        match key {
            TocKey::Key(Key(k)) if k & NAMED_KEY_FLAG != 0 => Err(Error::UnencodableValue(
                format!("key 0x{:08x} has the named-key bit set", k),
            )),
            TocKey::Key(Key(k)) => Ok(*k),
            TocKey::Name(name) => {
                let slot = self.record(TYPE_STRING | SUBTYPE_ONE as u32, name.as_bytes())?;
                if slot & NAMED_KEY_FLAG != 0 {
                    return Err(Error::UnencodableValue(format!(
                        "named key \"{}\" lands past the addressable range",
                        name
                    )));
                }
                Ok(slot | NAMED_KEY_FLAG)
            }
        }
    }

    /// Write the values of one table of contents and return its entries, sorted by key.
    fn toc(&mut self, toc: &Toc) -> Result<Vec<(u32, u32)>> {
        let mut entries = Vec::with_capacity(toc.len());
        for (key, value) in toc.iter() {
            let key = self.key(key)?;
            let value = self.write(value)?;
            entries.push((key, value));
        }
        entries.sort_by_key(|(key, _)| *key);
        Ok(entries)
    }
}

/// Whether a record's payload is made of slots. Those slots only mean something in the bookmark
/// the record came from, so such a record can't be copied into a new layout.
fn holds_slots(tag: Tag) -> bool {
    match tag.kind() {
        Kind::Array | Kind::Dict => true,
        Kind::Url => tag.subtype() == SUBTYPE_URL_RELATIVE,
        _ => false,
    }
}

/// Encode a bookmark with the given header settings.
pub fn encode(bookmark: &Bookmark, opts: &EncodeOptions) -> Result<Vec<u8>> {
    if (opts.header_size as usize) < MIN_HEADER_LEN {
        return Err(Error::UnencodableValue(format!(
            "header size {} is below the minimum of {}",
            opts.header_size, MIN_HEADER_LEN
        )));
    }

    let mut enc = Encoder::new();
    let mut tocs = Vec::with_capacity(bookmark.toc_count().max(1));
    for (id, toc) in bookmark.tocs() {
        tocs.push((id, enc.toc(toc)?));
    }
    if tocs.is_empty() {
        tocs.push((PRIMARY_TOC, Vec::new()));
    }

    let first_toc = enc.next_slot()?;
    let count = tocs.len();
    for (i, (id, entries)) in tocs.iter().enumerate() {
        let this = enc.next_slot()?;
        let size = TOC_HEADER_LEN - 8 + TOC_ENTRY_LEN * entries.len();
        let next = if i + 1 == count {
            0
        } else {
            u32::try_from(this as usize + 8 + size).map_err(|_| {
                Error::UnencodableValue("bookmark exceeds 4 GiB".to_string())
            })?
        };
        let n = entries.len() as u32;
        for word in [size as u32, TOC_MAGIC, *id, next, n] {
            enc.body.extend_from_slice(&word.to_le_bytes());
        }
        for (key, value) in entries {
            for word in [*key, *value, 0] {
                enc.body.extend_from_slice(&word.to_le_bytes());
            }
        }
    }
    enc.body[..4].copy_from_slice(&first_toc.to_le_bytes());

    let header_size = opts.header_size as usize;
    let total = u32::try_from(header_size + enc.body.len())
        .map_err(|_| Error::UnencodableValue("bookmark exceeds 4 GiB".to_string()))?;
    let mut buf = Vec::with_capacity(total as usize);
    buf.extend_from_slice(&BOOKMARK_MAGIC);
    buf.extend_from_slice(&total.to_le_bytes());
    buf.extend_from_slice(&opts.version.to_le_bytes());
    buf.extend_from_slice(&opts.header_size.to_le_bytes());
    buf.resize(header_size, 0);
    buf.extend_from_slice(&enc.body);
    debug!(
        "Encoded bookmark: {} bytes, {} TOCs",
        buf.len(),
        count
    );
    Ok(buf)
}

impl Bookmark {
    /// Encode with the header settings macOS uses.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self, &EncodeOptions::default())
    }

    pub fn encode_with(&self, opts: &EncodeOptions) -> Result<Vec<u8>> {
        encode(self, opts)
    }
}
