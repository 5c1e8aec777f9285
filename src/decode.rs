use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    store::{Resolver, Store},
    *,
};

/// A decoded bookmark, along with every recoverable error hit on the way.
///
/// Records behind those errors are still present in the bookmark, as [`Value::Opaque`] for
/// inconsistent records or [`Value::Unresolved`] for cycles.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub bookmark: Bookmark,
    pub errors: Vec<Error>,
}

impl Decoded {
    /// True if no record needed recovering.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_bookmark(self) -> Bookmark {
        self.bookmark
    }
}

/// Decode a bookmark with the default limits, recovering from bad records.
pub fn decode(buf: &[u8]) -> Result<Decoded> {
    decode_with(buf, &DecodeOptions::default())
}

/// Decode a bookmark.
///
/// Header and structural problems fail the decode. Problems confined to a single record are
/// collected in [`Decoded::errors`] unless `opts.strict` is set, in which case the first one
/// fails the decode instead.
pub fn decode_with(buf: &[u8], opts: &DecodeOptions) -> Result<Decoded> {
    let store = Store::new(buf)?;
    let total = store.header().total_len as usize;
    if total > opts.max_size {
        return Err(Error::ParseLimit(format!(
            "Bookmark declares {} bytes, limit is {}",
            total, opts.max_size
        )));
    }

    let mut resolver = Resolver::new(&store, opts.max_depth, opts.max_records, opts.strict);
    let mut tocs = BTreeMap::new();
    for raw in store.tocs() {
        if tocs.contains_key(&raw.id) {
            warn!("Duplicate TOC id {}, keeping the first", raw.id);
            continue;
        }
        let mut toc = Toc::new();
        for entry in &raw.entries {
            let key = if entry.key & NAMED_KEY_FLAG != 0 {
                let slot = entry.key & !NAMED_KEY_FLAG;
                match resolver.resolve(slot)? {
                    Value::Str(name) => TocKey::Name(name),
                    _ => {
                        let tag = store.record_at(slot)?.tag.raw();
                        resolver.soft(Error::invalid(slot, tag, "named key is not a string"))?;
                        continue;
                    }
                }
            } else {
                TocKey::Key(Key(entry.key))
            };
            let value = resolver.resolve(entry.value)?;
            if let Some(old) = toc.insert(key.clone(), value) {
                warn!("TOC {} repeats key {}, dropping {}", raw.id, key, old.name());
            }
        }
        tocs.insert(raw.id, toc);
    }

    let errors = resolver.into_errors();
    debug!(
        "Decoded bookmark: {} bytes, {} TOCs, {} recovered errors",
        total,
        tocs.len(),
        errors.len()
    );
    Ok(Decoded {
        bookmark: Bookmark::from_tocs(tocs),
        errors,
    })
}

impl Bookmark {
    /// Decode a bookmark, failing on any bad record.
    pub fn from_bytes(buf: &[u8]) -> Result<Bookmark> {
        decode_with(buf, &DecodeOptions::new().strict(true)).map(Decoded::into_bookmark)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::test::RawBuilder;
    use crate::tag::*;
    use rand::prelude::*;

    fn example() -> Bookmark {
        Bookmark::builder()
            .put(Key::VOLUME_NAME, "Macintosh HD")
            .put(
                Key::FILE_CREATION_DATE,
                Date::from_unix(1_315_526_400, 0).unwrap(),
            )
            .put(Key::PATH, Value::array(["Users", "bob", "file.txt"]))
            .build()
    }

    #[test]
    fn example_roundtrip() {
        let buf = example().encode().unwrap();
        let decoded = decode(&buf).unwrap();
        assert!(decoded.is_clean());
        let b = decoded.bookmark;
        assert_eq!(b.path().unwrap(), vec!["Users", "bob", "file.txt"]);
        assert_eq!(b.volume_name(), Some("Macintosh HD"));
        let date = b.file_creation_date().unwrap();
        assert_eq!(date.to_unix(), (1_315_526_400, 0));
        assert_eq!(date.seconds(), 337_219_200.0);
        assert_eq!(b, example());
    }

    #[test]
    fn roundtrip_is_stable() {
        let root = std::sync::Arc::new(Url::new("file:///"));
        let b = Bookmark::builder()
            .put(Key::URL, Url::with_base(root.clone(), "Users/bob/file.txt"))
            .put(Key::VOLUME_URL, Url::with_base(root, "Volumes/"))
            .put(Key::CNID_PATH, Value::array([0x1_0000_0000i64, 5]))
            .put(Key::VOLUME_UUID, "0A81F3B1-51D9-3335-B3E3-169C3640360D")
            .put(Key::VOLUME_IS_ROOT, true)
            .put(Key::WAS_FILE_REFERENCE, false)
            .put(Key::ICON_REF, Value::Null)
            .put(Key::SANDBOX_RW_EXTENSION, vec![0u8, 1, 2, 3, 4])
            .put(
                Key::TYPE_BINDING_DATA,
                Value::dict([("kind", Value::from(3i16)), ("scale", Value::from(0.5f64))]),
            )
            .put(0xF0F0u32, uuid::Uuid::from_bytes([0xAB; 16]))
            .put("com.example.named", "named value")
            .extra_toc(2, Toc::new().put(Key::VOLUME_PATH, "/Volumes/Image"))
            .build();
        let buf = b.encode().unwrap();
        let back = decode(&buf).unwrap();
        assert!(back.is_clean());
        assert_eq!(back.bookmark, b);
        assert_eq!(back.bookmark.encode().unwrap(), buf);
        assert_eq!(
            back.bookmark.url().unwrap().absolute(),
            "file:///Users/bob/file.txt"
        );
    }

    #[test]
    fn exotic_numbers() {
        let cases = [
            Value::Int(Integer::new(NumberType::CFIndex, -7).unwrap()),
            Value::Int(Integer::new(NumberType::Char, 65).unwrap()),
            Value::Int(Integer::new(NumberType::Short, -300).unwrap()),
            Value::Int(Integer::new(NumberType::LongLong, i64::MIN).unwrap()),
            Value::Float(Float::new(NumberType::CGFloat, 1.25).unwrap()),
            Value::Float(Float::new(NumberType::Float, 3.5).unwrap()),
            Value::from(f32::MAX),
        ];
        let b = Bookmark::builder()
            .put(Key::TYPE_BINDING_DATA, Value::array(cases.clone()))
            .build();
        let back = Bookmark::from_bytes(&b.encode().unwrap()).unwrap();
        let items = back[Key::TYPE_BINDING_DATA].as_array().unwrap();
        assert_eq!(items, &cases[..]);
        assert_eq!(
            items[0].as_int().unwrap().number_type(),
            NumberType::CFIndex
        );
    }

    #[test]
    fn extra_toc_roundtrip() {
        let b = Bookmark::builder()
            .put(Key::VOLUME_BOOKMARK, 7i32)
            .extra_toc(7, Toc::new().put(Key::VOLUME_NAME, "Image"))
            .extra_toc(9, Toc::new())
            .build();
        let back = decode(&b.encode().unwrap()).unwrap().bookmark;
        assert_eq!(back.toc_count(), 3);
        assert_eq!(
            back.volume_bookmark()
                .unwrap()
                .get(&Key::VOLUME_NAME.into()),
            Some(&Value::from("Image"))
        );
        assert!(back.toc(9).unwrap().is_empty());
    }

    #[test]
    fn alias_rejected() {
        let mut buf = example().encode().unwrap();
        buf[..4].copy_from_slice(b"alis");
        assert_eq!(
            decode(&buf),
            Err(Error::WrongFormat { magic: *b"alis" })
        );
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut buf = example().encode().unwrap();
        buf.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode(&buf).unwrap().bookmark, example());
    }

    #[test]
    fn truncation() {
        let buf = example().encode().unwrap();
        for len in 0..buf.len() {
            match decode(&buf[..len]) {
                Err(Error::TruncatedInput { .. }) => (),
                other => panic!("length {} gave {:?}", len, other),
            }
        }
    }

    #[test]
    fn random_corruption() {
        let buf = example().encode().unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..2000 {
            let mut bad = buf.clone();
            for _ in 0..rng.gen_range(1..8) {
                let i = rng.gen_range(0..bad.len());
                bad[i] = rng.gen();
            }
            let len = rng.gen_range(0..=bad.len());
            // Anything goes except a panic
            let _ = decode(&bad[..len]);
            let _ = decode_with(&bad, &DecodeOptions::new().strict(true));
        }
    }

    #[test]
    fn size_limit() {
        let buf = example().encode().unwrap();
        assert!(matches!(
            decode_with(&buf, &DecodeOptions::new().max_size(64)),
            Err(Error::ParseLimit(_))
        ));
    }

    /// A store with one unknown record and one number whose payload is too short.
    fn damaged() -> (Vec<u8>, u32, u32) {
        let mut b = RawBuilder::new();
        let name = b.record(TYPE_STRING | 1, b"Macintosh HD");
        let odd = b.record(0x0000_4201, &[1, 2, 3, 4, 5]);
        let short = b.record(TYPE_NUMBER | 3, &[1, 2]);
        let toc = b.toc(1, 0, &[(0x2010, name), (0xF0F1, odd), (0xD010, short)]);
        (b.finish(toc), odd, short)
    }

    #[test]
    fn invalid_record_recovered() {
        let (buf, _, short) = damaged();
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.bookmark.volume_name(), Some("Macintosh HD"));
        assert_eq!(decoded.errors.len(), 1);
        assert!(matches!(
            decoded.errors[0],
            Error::InvalidRecord { slot, tag: 0x0303, .. } if slot == short
        ));
        let kept = decoded.bookmark[Key::CREATION_OPTIONS].as_opaque().unwrap();
        assert_eq!(kept.data, vec![1, 2]);
    }

    #[test]
    fn strict_mode() {
        let (buf, _, short) = damaged();
        assert!(matches!(
            decode_with(&buf, &DecodeOptions::new().strict(true)),
            Err(Error::InvalidRecord { slot, .. }) if slot == short
        ));
        assert!(Bookmark::from_bytes(&buf).is_err());
    }

    #[test]
    fn unknown_tag_preserved() {
        let (buf, _, _) = damaged();
        let b = decode(&buf).unwrap().bookmark;
        let odd = b[Key(0xF0F1)].as_opaque().unwrap().clone();
        assert_eq!(odd.tag.raw(), 0x4201);
        assert_eq!(odd.data, vec![1, 2, 3, 4, 5]);

        // Writing it back out keeps the tag and payload exactly
        let again = decode(&b.encode().unwrap()).unwrap();
        assert_eq!(again.bookmark[Key(0xF0F1)].as_opaque(), Some(&odd));
        assert_eq!(again.bookmark, b);
    }

    #[test]
    fn recovered_composites_not_reencoded() {
        let mut b = RawBuilder::new();
        let not_url = b.record(TYPE_STRING | 1, b"file:///");
        let part = b.record(TYPE_STRING | 1, b"Users/");
        let url = b.slots(TYPE_URL | 2, &[not_url, part]);
        let list = b.record(TYPE_ARRAY | 1, &[4, 0, 0, 0, 9]);
        let name = b.record(TYPE_STRING | 1, b"Vol");
        let toc = b.toc(1, 0, &[(0x1003, url), (0x1004, list), (0x2010, name)]);
        let buf = b.finish(toc);

        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.errors.len(), 2);
        let kept = decoded.bookmark[Key::URL].as_opaque().unwrap();
        assert_eq!(kept.tag.raw(), TYPE_URL | 2);
        assert!(decoded.bookmark[Key::PATH].as_opaque().is_some());

        // Their payloads hold slots of this layout, so they can't be written into a new one
        assert!(matches!(
            decoded.bookmark.encode(),
            Err(Error::UnencodableValue(_))
        ));
        let mut without_url = decoded.bookmark.clone();
        without_url.primary_mut().remove(&TocKey::from(Key::URL));
        assert!(matches!(
            without_url.encode(),
            Err(Error::UnencodableValue(_))
        ));
        without_url.primary_mut().remove(&TocKey::from(Key::PATH));
        let again = decode(&without_url.encode().unwrap()).unwrap();
        assert!(again.is_clean());
        assert_eq!(again.bookmark.volume_name(), Some("Vol"));
    }

    /// A TOC whose URL is `levels` relative URLs deep, each adding "d/" to the one below.
    fn url_chain(levels: usize) -> Vec<u8> {
        let mut b = RawBuilder::new();
        let mut url = b.record(TYPE_URL | 1, b"file:///");
        for _ in 0..levels {
            let part = b.record(TYPE_STRING | 1, b"d/");
            url = b.slots(TYPE_URL | 2, &[url, part]);
        }
        let toc = b.toc(1, 0, &[(0x1003, url)]);
        b.finish(toc)
    }

    #[test]
    fn long_url_chain() {
        let buf = url_chain(500);
        let decoded = decode(&buf).unwrap();
        assert!(decoded.is_clean());
        let url = decoded.bookmark.url().unwrap();
        assert_eq!(url.chain_len(), 501);
        let expected = format!("file:///{}", "d/".repeat(500));
        assert_eq!(url.absolute(), expected);

        let again = decode(&decoded.bookmark.encode().unwrap()).unwrap();
        assert_eq!(again.bookmark.url().unwrap().absolute(), expected);
    }

    #[test]
    fn url_chain_depth_limit() {
        assert!(matches!(
            decode(&url_chain(MAX_DEPTH + 10)),
            Err(Error::ParseLimit(_))
        ));
        assert!(matches!(
            decode_with(&url_chain(40), &DecodeOptions::new().max_depth(32)),
            Err(Error::ParseLimit(_))
        ));
        assert!(decode_with(&url_chain(30), &DecodeOptions::new().max_depth(32)).is_ok());
    }

    #[test]
    fn url_base_loop() {
        let mut b = RawBuilder::new();
        let a_slot = 4;
        let b_slot = a_slot + 16;
        let part = b_slot + 16;
        b.slots(TYPE_URL | 2, &[b_slot, part]);
        b.slots(TYPE_URL | 2, &[a_slot, part]);
        b.record(TYPE_STRING | 1, b"x");
        let toc = b.toc(1, 0, &[(0x1003, a_slot)]);
        let buf = b.finish(toc);

        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.errors, vec![Error::CyclicReference { slot: a_slot }]);
        assert_eq!(decoded.bookmark[Key::URL], Value::Unresolved(a_slot));
        assert!(matches!(
            decode_with(&buf, &DecodeOptions::new().strict(true)),
            Err(Error::CyclicReference { .. })
        ));
    }

    #[test]
    fn cycle_recovered() {
        let mut b = RawBuilder::new();
        let a_slot = 4;
        let b_slot = a_slot + 12;
        b.slots(TYPE_ARRAY | 1, &[b_slot]);
        b.slots(TYPE_ARRAY | 1, &[a_slot]);
        let name = b.record(TYPE_STRING | 1, b"Vol");
        let toc = b.toc(1, 0, &[(0x1004, a_slot), (0x2010, name)]);
        let buf = b.finish(toc);

        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.errors, vec![Error::CyclicReference { slot: a_slot }]);
        assert_eq!(decoded.bookmark.volume_name(), Some("Vol"));
        assert!(decoded.bookmark[Key::PATH][0][0].is_unresolved());
        assert!(matches!(
            decoded.bookmark.encode(),
            Err(Error::UnencodableValue(_))
        ));
    }

    #[test]
    fn named_keys() {
        let mut b = RawBuilder::new();
        let key = b.record(TYPE_STRING | 1, b"com.apple.custom");
        let value = b.record(TYPE_BOOLEAN | 1, &[]);
        let not_string = b.record(TYPE_DATA | 1, b"nope");
        let toc = b.toc(
            1,
            0,
            &[
                (key | NAMED_KEY_FLAG, value),
                (not_string | NAMED_KEY_FLAG, value),
            ],
        );
        let buf = b.finish(toc);

        let decoded = decode(&buf).unwrap();
        assert_eq!(
            decoded.bookmark.get("com.apple.custom"),
            Some(&Value::Bool(true))
        );
        assert_eq!(decoded.bookmark.primary().len(), 1);
        assert!(matches!(
            decoded.errors[..],
            [Error::InvalidRecord { slot, .. }] if slot == not_string
        ));
    }

    #[test]
    fn missing_primary_toc() {
        let mut b = RawBuilder::new();
        let name = b.record(TYPE_STRING | 1, b"Vol");
        let toc = b.toc(3, 0, &[(0x2010, name)]);
        let buf = b.finish(toc);
        let back = decode(&buf).unwrap().bookmark;
        assert!(back.toc(PRIMARY_TOC).is_none());
        assert!(back.primary().is_empty());
        assert_eq!(back.volume_name(), Some("Vol"));
        assert_eq!(decode(&back.encode().unwrap()).unwrap().bookmark, back);
    }
}
