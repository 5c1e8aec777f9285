//! The record store: header, slot-addressed records, and tables of contents.
//!
//! Slots are byte offsets counted from the end of the header. The first 4 bytes past the header
//! give the slot of the first table of contents, so records start at slot 4.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{trace, warn};

use crate::{
    depth_tracking::DepthTracker,
    error::{Error, Result},
    record::{Element, Record, RECORD_HEADER_LEN},
    Tag, Url, Value, MAX_DEPTH,
};

pub const BOOKMARK_MAGIC: [u8; 4] = *b"book";
pub const ALIAS_MAGIC: [u8; 4] = *b"alis";
pub const TOC_MAGIC: u32 = 0xFFFF_FFFE;

/// Size of the fixed header fields: magic, total length, version, header size.
pub const MIN_HEADER_LEN: usize = 16;
pub const TOC_HEADER_LEN: usize = 20;
pub const TOC_ENTRY_LEN: usize = 12;

/// Default limit on the number of records resolved in a single decode.
pub const MAX_RECORDS: usize = 1 << 20;

/// Records and tables are 4-byte aligned, and slots 0 to 3 hold the first TOC offset.
fn check_slot(slot: u32, what: &str) -> Result<()> {
    if slot < 4 || slot % 4 != 0 {
        return Err(Error::MalformedStore(format!(
            "{} slot 0x{:x} is misaligned or overlaps the first TOC offset",
            what, slot
        )));
    }
    Ok(())
}

fn read_u32(buf: &[u8], offset: usize, step: &'static str) -> Result<u32> {
    buf.get(offset..)
        .and_then(|mut raw| raw.read_u32::<LittleEndian>().ok())
        .ok_or_else(|| {
            Error::MalformedStore(format!("{} at offset 0x{:x} overruns the store", step, offset))
        })
}

/// The fixed-size header at the start of every bookmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Declared total length, header included
    pub total_len: u32,
    /// Unchecked; 0x10040000 in files macOS writes
    pub version: u32,
    /// Offset where slot 0 begins
    pub header_size: u32,
    /// Slot of the first table of contents
    pub first_toc: u32,
}

/// A table of contents as stored: its id and its (key, value slot) entries in stored order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawToc {
    pub slot: u32,
    pub id: u32,
    pub entries: Vec<TocEntry>,
}

impl RawToc {
    /// First slot past the table's entries.
    pub fn end(&self) -> usize {
        self.slot as usize + TOC_HEADER_LEN + TOC_ENTRY_LEN * self.entries.len()
    }

    fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.end() && (self.slot as usize) < end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// The raw key. When [`crate::NAMED_KEY_FLAG`] is set, the rest is the slot of a string
    /// record naming the key.
    pub key: u32,
    pub value: u32,
    pub reserved: u32,
}

/// A validated view over a bookmark buffer.
#[derive(Clone, Debug)]
pub struct Store<'a> {
    header: Header,
    /// Everything from the end of the header up to the declared length
    body: &'a [u8],
    /// The chain of tables of contents, in chain order
    tocs: Vec<RawToc>,
}

impl<'a> Store<'a> {
    /// Validate the header, set up slot addressing, and read the chain of tables of contents.
    /// Bytes past the declared total length are ignored.
    pub fn new(buf: &'a [u8]) -> Result<Store<'a>> {
        if buf.len() < 4 {
            return Err(Error::TruncatedInput {
                step: "read magic",
                actual: buf.len(),
                expected: 4,
            });
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[..4]);
        if magic != BOOKMARK_MAGIC {
            return Err(Error::WrongFormat { magic });
        }
        if buf.len() < MIN_HEADER_LEN {
            return Err(Error::TruncatedInput {
                step: "read header",
                actual: buf.len(),
                expected: MIN_HEADER_LEN,
            });
        }
        let mut raw = &buf[4..MIN_HEADER_LEN];
        let mut word = || {
            raw.read_u32::<LittleEndian>()
                .map_err(|e| Error::MalformedStore(e.to_string()))
        };
        let total_len = word()?;
        let version = word()?;
        let header_size = word()?;

        let total = total_len as usize;
        if total > buf.len() {
            return Err(Error::TruncatedInput {
                step: "read declared length",
                actual: buf.len(),
                expected: total,
            });
        }
        if (header_size as usize) < MIN_HEADER_LEN {
            return Err(Error::MalformedStore(format!(
                "header size {} is smaller than the fixed header",
                header_size
            )));
        }
        if (header_size as usize).saturating_add(4) > total {
            return Err(Error::MalformedStore(format!(
                "header size {} leaves no room for the first TOC offset in {} bytes",
                header_size, total
            )));
        }
        let body = &buf[header_size as usize..total];
        let first_toc = read_u32(body, 0, "first TOC offset")?;
        let mut store = Store {
            header: Header {
                total_len,
                version,
                header_size,
                first_toc,
            },
            body,
            tocs: Vec::new(),
        };
        store.tocs = store.read_tocs()?;
        Ok(store)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Bytes addressable by slot.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Fetch the record at a slot. Fails if the slot is misaligned or sits on the first TOC
    /// offset, or if the record leaves the store or runs into a table of contents.
    pub fn record_at(&self, slot: u32) -> Result<Record<'a>> {
        check_slot(slot, "record")?;
        let offset = slot as usize;
        let len = read_u32(self.body, offset, "record length")? as usize;
        let tag = read_u32(self.body, offset + 4, "record tag")?;
        let start = offset + RECORD_HEADER_LEN;
        let payload = start
            .checked_add(len)
            .and_then(|end| self.body.get(start..end))
            .ok_or_else(|| {
                Error::MalformedStore(format!(
                    "record at slot 0x{:x} claims {} bytes, store has {} past it",
                    slot,
                    len,
                    self.body.len().saturating_sub(start)
                ))
            })?;
        let end = start + payload.len();
        if let Some(toc) = self.tocs.iter().find(|toc| toc.overlaps(offset, end)) {
            return Err(Error::MalformedStore(format!(
                "record at slot 0x{:x} overlaps TOC {} at slot 0x{:x}",
                slot, toc.id, toc.slot
            )));
        }
        Ok(Record {
            slot,
            tag: Tag::from_raw(tag),
            payload,
        })
    }

    /// Parse the table of contents at a slot.
    pub fn toc_at(&self, slot: u32) -> Result<(RawToc, u32)> {
        check_slot(slot, "TOC")?;
        let offset = slot as usize;
        let size = read_u32(self.body, offset, "TOC size")?;
        let magic = read_u32(self.body, offset + 4, "TOC magic")?;
        if magic != TOC_MAGIC {
            return Err(Error::MalformedStore(format!(
                "TOC at slot 0x{:x} has magic 0x{:08x}",
                slot, magic
            )));
        }
        let id = read_u32(self.body, offset + 8, "TOC id")?;
        let next = read_u32(self.body, offset + 12, "next TOC offset")?;
        let count = read_u32(self.body, offset + 16, "TOC entry count")? as usize;

        let declared_end = offset.saturating_add(8).saturating_add(size as usize);
        let entries_end = count
            .checked_mul(TOC_ENTRY_LEN)
            .and_then(|n| n.checked_add(offset + TOC_HEADER_LEN));
        match entries_end {
            Some(end) if end <= self.body.len() && declared_end <= self.body.len() => (),
            _ => {
                return Err(Error::MalformedStore(format!(
                    "TOC at slot 0x{:x} with {} entries overruns the store",
                    slot, count
                )))
            }
        }

        let mut raw = &self.body[offset + TOC_HEADER_LEN..];
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let mut word = || {
                raw.read_u32::<LittleEndian>()
                    .map_err(|e| Error::MalformedStore(e.to_string()))
            };
            entries.push(TocEntry {
                key: word()?,
                value: word()?,
                reserved: word()?,
            });
        }
        Ok((RawToc { slot, id, entries }, next))
    }

    /// The tables of contents, in chain order.
    pub fn tocs(&self) -> &[RawToc] {
        &self.tocs
    }

    /// Walk the chain of tables of contents from the first one. A chain that loops back on
    /// itself is malformed.
    fn read_tocs(&self) -> Result<Vec<RawToc>> {
        let mut seen = HashSet::new();
        let mut tocs = Vec::new();
        let mut slot = self.header.first_toc;
        loop {
            if !seen.insert(slot) {
                return Err(Error::MalformedStore(format!(
                    "TOC chain loops back to slot 0x{:x}",
                    slot
                )));
            }
            let (toc, next) = self.toc_at(slot)?;
            trace!("TOC {} at slot 0x{:x} has {} entries", toc.id, slot, toc.entries.len());
            tocs.push(toc);
            if next == 0 {
                break;
            }
            slot = next;
        }
        Ok(tocs)
    }

    /// Fully resolve the value at a slot. The first soft error is returned as an error here; use
    /// a [`Resolver`] to recover from them instead.
    pub fn resolve(&self, slot: u32) -> Result<Value> {
        Resolver::new(self, MAX_DEPTH, MAX_RECORDS, true).resolve(slot)
    }
}

/// Resolves slots into values, following references between records.
///
/// Soft errors either fail resolution (strict mode) or are collected while the offending record
/// is replaced: an inconsistent record becomes [`Value::Opaque`] and a cycle becomes
/// [`Value::Unresolved`]. URL records are memoized by slot so a base shared by several URLs
/// decodes to a single `Arc`.
pub struct Resolver<'s, 'a> {
    store: &'s Store<'a>,
    tracker: DepthTracker,
    urls: HashMap<u32, Arc<Url>>,
    errors: Vec<Error>,
    strict: bool,
    resolved: usize,
    max_records: usize,
}

impl<'s, 'a> Resolver<'s, 'a> {
    pub fn new(store: &'s Store<'a>, max_depth: usize, max_records: usize, strict: bool) -> Self {
        Resolver {
            store,
            tracker: DepthTracker::new(max_depth),
            urls: HashMap::new(),
            errors: Vec::new(),
            strict,
            resolved: 0,
            max_records,
        }
    }

    /// Soft errors collected so far.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// Record a recoverable error, or fail with it in strict mode.
    pub fn soft(&mut self, err: Error) -> Result<()> {
        warn!("{}", err);
        if self.strict {
            Err(err)
        } else {
            self.errors.push(err);
            Ok(())
        }
    }

    fn recover(&mut self, record: &Record, reason: &str) -> Result<Value> {
        self.soft(Error::invalid(record.slot, record.tag.raw(), reason))?;
        Ok(record.to_opaque())
    }

    fn nested<F>(&mut self, slot: u32, f: F) -> Result<Value>
    where
        F: FnOnce(&mut Self) -> Result<Value>,
    {
        if let Err(err) = self.tracker.enter(slot) {
            if !err.is_recoverable() {
                return Err(err);
            }
            self.soft(err)?;
            return Ok(Value::Unresolved(slot));
        }
        let result = f(self);
        self.tracker.leave();
        result
    }

    fn count_record(&mut self) -> Result<()> {
        self.resolved += 1;
        if self.resolved > self.max_records {
            return Err(Error::ParseLimit(format!(
                "More than {} records resolved",
                self.max_records
            )));
        }
        Ok(())
    }

    /// Resolve the value at a slot, recursing into composite records.
    pub fn resolve(&mut self, slot: u32) -> Result<Value> {
        self.count_record()?;
        let record = self.store.record_at(slot)?;
        trace!(
            "slot 0x{:x}: {:?}, {} bytes",
            slot,
            record.tag,
            record.payload.len()
        );
        let element = match record.parse() {
            Ok(element) => element,
            Err(err) => {
                self.soft(err)?;
                return Ok(record.to_opaque());
            }
        };
        match element {
            Element::Leaf(value) => Ok(value),
            Element::Array(slots) => self.nested(slot, |r| {
                let mut items = Vec::with_capacity(slots.len());
                for item in slots {
                    items.push(r.resolve(item)?);
                }
                Ok(Value::Array(items))
            }),
            Element::Dict(pairs) => self.nested(slot, |r| {
                let mut items = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = r.resolve(key)?;
                    let value = r.resolve(value)?;
                    items.push((key, value));
                }
                Ok(Value::Dict(items))
            }),
            Element::RelativeUrl { base, relative } => {
                match self.url_at(record, base, relative)? {
                    Ok(url) => Ok(Value::Url((*url).clone())),
                    Err(value) => Ok(value),
                }
            }
        }
    }

    /// Resolve a URL record used as a base, reusing earlier results for the same slot.
    fn base_url(&mut self, slot: u32) -> Result<std::result::Result<Arc<Url>, Value>> {
        if let Some(url) = self.urls.get(&slot) {
            return Ok(Ok(url.clone()));
        }
        match self.resolve(slot)? {
            Value::Url(url) => {
                let url = self.urls.entry(slot).or_insert_with(|| Arc::new(url));
                Ok(Ok(url.clone()))
            }
            other => Ok(Err(other)),
        }
    }

    /// Resolve a relative URL record. A base that is itself a relative URL is followed in a loop
    /// rather than by recursion, so long chains don't grow the stack. Every link in the chain is
    /// still on the tracker's path while it is open, which bounds the chain by the depth limit and
    /// catches chains that loop.
    fn url_at(
        &mut self,
        record: Record<'a>,
        base: u32,
        relative: u32,
    ) -> Result<std::result::Result<Arc<Url>, Value>> {
        if let Some(url) = self.urls.get(&record.slot) {
            return Ok(Ok(url.clone()));
        }
        let depth = self.tracker.depth();
        let result = self.url_chain(record, base, relative);
        self.tracker.unwind(depth);
        result
    }

    fn url_chain(
        &mut self,
        record: Record<'a>,
        base: u32,
        relative: u32,
    ) -> Result<std::result::Result<Arc<Url>, Value>> {
        if let Err(err) = self.tracker.enter(record.slot) {
            if !err.is_recoverable() {
                return Err(err);
            }
            self.soft(err)?;
            return Ok(Err(Value::Unresolved(record.slot)));
        }

        // Walk down the chain until reaching a base that is already known or isn't relative.
        let mut links = vec![(record, relative)];
        let mut base = base;
        let mut current = loop {
            if let Some(url) = self.urls.get(&base) {
                break Ok(url.clone());
            }
            let next = self.store.record_at(base)?;
            let (next_base, next_relative) = match next.parse() {
                Ok(Element::RelativeUrl { base, relative }) => (base, relative),
                _ => break self.base_url(base)?,
            };
            self.count_record()?;
            trace!("slot 0x{:x}: relative URL on slot 0x{:x}", base, next_base);
            if let Err(err) = self.tracker.enter(base) {
                if !err.is_recoverable() {
                    return Err(err);
                }
                self.soft(err)?;
                break Err(Value::Unresolved(base));
            }
            links.push((next, next_relative));
            base = next_base;
        };

        // Then build the URLs back up, innermost first.
        while let Some((link, relative)) = links.pop() {
            let built = match current {
                Ok(base) => match self.resolve(relative)? {
                    Value::Str(s) => Value::Url(Url::with_base(base, s)),
                    Value::Unresolved(s) => Value::Unresolved(s),
                    _ => self.recover(&link, "relative part of URL is not a string")?,
                },
                Err(Value::Unresolved(s)) => Value::Unresolved(s),
                Err(_) => self.recover(&link, "base of relative URL is not a URL")?,
            };
            self.tracker.leave();
            current = match built {
                Value::Url(url) => {
                    let url = Arc::new(url);
                    self.urls.insert(link.slot, url.clone());
                    Ok(url)
                }
                other => Err(other),
            };
        }
        Ok(current)
    }
}
