use std::collections::BTreeMap;
use std::ops::Index;

use crate::*;

/// Id of the table of contents that holds the main bookmark data.
pub const PRIMARY_TOC: u32 = 1;

/// One table of contents: values by key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Toc {
    entries: BTreeMap<TocKey, Value>,
}

impl Toc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, returning whatever was stored under the key before.
    pub fn insert(&mut self, key: impl Into<TocKey>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn put(mut self, key: impl Into<TocKey>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &TocKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &TocKey) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &TocKey) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &TocKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TocKey, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<TocKey>, V: Into<Value>> FromIterator<(K, V)> for Toc {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Toc {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A bookmark document: one or more tables of contents, by id.
#[derive(Clone, Debug, PartialEq)]
pub struct Bookmark {
    tocs: BTreeMap<u32, Toc>,
}

impl Default for Bookmark {
    fn default() -> Self {
        Self::new()
    }
}

impl Bookmark {
    /// An empty bookmark with an empty primary table of contents.
    pub fn new() -> Self {
        let mut tocs = BTreeMap::new();
        tocs.insert(PRIMARY_TOC, Toc::new());
        Bookmark { tocs }
    }

    pub fn builder() -> BookmarkBuilder {
        BookmarkBuilder::new()
    }

    /// Build a bookmark directly from tables of contents, as decoding does. A missing primary
    /// table reads as empty and is only created once written to.
    pub fn from_tocs(tocs: BTreeMap<u32, Toc>) -> Self {
        Bookmark { tocs }
    }

    /// Look a key up, checking the primary table first and then the others in id order.
    pub fn get(&self, key: impl Into<TocKey>) -> Option<&Value> {
        let key = key.into();
        self.primary()
            .get(&key)
            .or_else(|| self.tocs.values().find_map(|toc| toc.get(&key)))
    }

    /// Set a value in the primary table of contents.
    pub fn insert(&mut self, key: impl Into<TocKey>, value: impl Into<Value>) -> Option<Value> {
        self.primary_mut().insert(key, value)
    }

    pub fn primary(&self) -> &Toc {
        static EMPTY: Toc = Toc {
            entries: BTreeMap::new(),
        };
        self.tocs.get(&PRIMARY_TOC).unwrap_or(&EMPTY)
    }

    pub fn primary_mut(&mut self) -> &mut Toc {
        self.tocs.entry(PRIMARY_TOC).or_default()
    }

    pub fn toc(&self, id: u32) -> Option<&Toc> {
        self.tocs.get(&id)
    }

    pub fn toc_mut(&mut self, id: u32) -> Option<&mut Toc> {
        self.tocs.get_mut(&id)
    }

    /// Add or replace a table of contents.
    pub fn insert_toc(&mut self, id: u32, toc: Toc) -> Option<Toc> {
        self.tocs.insert(id, toc)
    }

    /// All tables of contents, in id order.
    pub fn tocs(&self) -> impl Iterator<Item = (u32, &Toc)> {
        self.tocs.iter().map(|(id, toc)| (*id, toc))
    }

    pub fn toc_count(&self) -> usize {
        self.tocs.len()
    }

    fn key(&self, key: Key) -> Option<&Value> {
        self.get(key)
    }

    fn string(&self, key: Key) -> Option<&str> {
        self.key(key).and_then(Value::as_str)
    }

    fn int(&self, key: Key) -> Option<i64> {
        self.key(key).and_then(Value::as_i64)
    }

    fn ints(&self, key: Key) -> Option<Vec<i64>> {
        self.key(key)?
            .as_array()?
            .iter()
            .map(Value::as_i64)
            .collect()
    }

    /// The bookmarked URL.
    pub fn url(&self) -> Option<&Url> {
        self.key(Key::URL).and_then(Value::as_url)
    }

    /// Path components from the volume root down to the bookmarked object.
    pub fn path(&self) -> Option<Vec<&str>> {
        self.key(Key::PATH)?
            .as_array()?
            .iter()
            .map(Value::as_str)
            .collect()
    }

    /// Catalog node ids along the path.
    pub fn cnid_path(&self) -> Option<Vec<i64>> {
        self.ints(Key::CNID_PATH)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.string(Key::FILE_NAME)
    }

    pub fn file_id(&self) -> Option<i64> {
        self.int(Key::FILE_ID)
    }

    pub fn file_creation_date(&self) -> Option<Date> {
        self.key(Key::FILE_CREATION_DATE).and_then(Value::as_date)
    }

    /// Parsed resource property flags. `None` if missing or not a 24-byte blob.
    pub fn file_properties(&self) -> Option<ResourceProperties> {
        self.key(Key::FILE_PROPERTIES)
            .and_then(Value::as_data)
            .and_then(|d| ResourceProperties::decode(d).ok())
    }

    pub fn volume_path(&self) -> Option<&str> {
        self.string(Key::VOLUME_PATH)
    }

    pub fn volume_url(&self) -> Option<&Url> {
        self.key(Key::VOLUME_URL).and_then(Value::as_url)
    }

    pub fn volume_name(&self) -> Option<&str> {
        self.string(Key::VOLUME_NAME)
    }

    /// The volume UUID, which bookmarks store as text.
    pub fn volume_uuid(&self) -> Option<&str> {
        self.string(Key::VOLUME_UUID)
    }

    pub fn volume_size(&self) -> Option<i64> {
        self.int(Key::VOLUME_SIZE)
    }

    pub fn volume_creation_date(&self) -> Option<Date> {
        self.key(Key::VOLUME_CREATION_DATE).and_then(Value::as_date)
    }

    /// Parsed volume property flags. `None` if missing or not a 24-byte blob.
    pub fn volume_properties(&self) -> Option<VolumeProperties> {
        self.key(Key::VOLUME_PROPERTIES)
            .and_then(Value::as_data)
            .and_then(|d| VolumeProperties::decode(d).ok())
    }

    pub fn volume_is_root(&self) -> Option<bool> {
        self.key(Key::VOLUME_IS_ROOT).and_then(Value::as_bool)
    }

    /// The table of contents holding the embedded bookmark of a disk image's volume.
    pub fn volume_bookmark(&self) -> Option<&Toc> {
        let id = u32::try_from(self.int(Key::VOLUME_BOOKMARK)?).ok()?;
        self.toc(id)
    }

    pub fn volume_mount_point(&self) -> Option<&Url> {
        self.key(Key::VOLUME_MOUNT_POINT).and_then(Value::as_url)
    }

    /// Index into [`Bookmark::path`] of the folder holding the bookmarked object.
    pub fn containing_folder(&self) -> Option<i64> {
        self.int(Key::CONTAINING_FOLDER)
    }

    pub fn user_name(&self) -> Option<&str> {
        self.string(Key::USER_NAME)
    }

    pub fn uid(&self) -> Option<i64> {
        self.int(Key::UID)
    }

    pub fn was_file_reference(&self) -> Option<bool> {
        self.key(Key::WAS_FILE_REFERENCE).and_then(Value::as_bool)
    }

    pub fn creation_options(&self) -> Option<i64> {
        self.int(Key::CREATION_OPTIONS)
    }

    /// Path component counts for each base of a relative URL.
    pub fn url_lengths(&self) -> Option<Vec<i64>> {
        self.ints(Key::URL_LENGTHS)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.string(Key::DISPLAY_NAME)
    }

    pub fn creation_time(&self) -> Option<Date> {
        self.key(Key::CREATION_TIME).and_then(Value::as_date)
    }

    /// Read-write security-scope extension token.
    pub fn sandbox_rw_extension(&self) -> Option<&[u8]> {
        self.key(Key::SANDBOX_RW_EXTENSION).and_then(Value::as_data)
    }

    /// Read-only security-scope extension token.
    pub fn sandbox_ro_extension(&self) -> Option<&[u8]> {
        self.key(Key::SANDBOX_RO_EXTENSION).and_then(Value::as_data)
    }

    /// Embedded legacy alias record.
    pub fn alias_data(&self) -> Option<&[u8]> {
        self.key(Key::ALIAS_DATA).and_then(Value::as_data)
    }
}

impl Index<Key> for Bookmark {
    type Output = Value;

    fn index(&self, index: Key) -> &Self::Output {
        static NULL: Value = Value::Null;
        self.get(index).unwrap_or(&NULL)
    }
}

/// Assemble a bookmark from key-value pairs.
#[derive(Clone, Debug, Default)]
pub struct BookmarkBuilder {
    primary: Toc,
    extra: BTreeMap<u32, Toc>,
}

impl BookmarkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value in the primary table of contents.
    pub fn put(mut self, key: impl Into<TocKey>, value: impl Into<Value>) -> Self {
        self.primary.insert(key, value);
        self
    }

    /// Add an extra table of contents. An id equal to [`PRIMARY_TOC`] is replaced by the
    /// primary table when building.
    pub fn extra_toc(mut self, id: u32, toc: Toc) -> Self {
        self.extra.insert(id, toc);
        self
    }

    pub fn build(self) -> Bookmark {
        let mut tocs = self.extra;
        tocs.insert(PRIMARY_TOC, self.primary);
        Bookmark { tocs }
    }
}

/// Platform capability for turning a bookmark back into a live filesystem location.
///
/// This crate only reads and writes the format. Resolution against a mounted volume (matching
/// the volume UUID, walking the CNID path, consuming sandbox extensions) belongs to code with
/// access to the operating system, which implements this trait.
pub trait PathResolver {
    type Location;
    type Error;

    fn resolve(&self, bookmark: &Bookmark) -> std::result::Result<Self::Location, Self::Error>;
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Bookmark {
        Bookmark::builder()
            .put(Key::PATH, Value::array(["Users", "bob", "notes.txt"]))
            .put(Key::CNID_PATH, Value::array([101i64, 2048, 99_001]))
            .put(Key::VOLUME_NAME, "Macintosh HD")
            .put(Key::VOLUME_UUID, "0A81F3B1-51D9-3335-B3E3-169C3640360D")
            .put(Key::VOLUME_SIZE, 994_662_584_320i64)
            .put(Key::VOLUME_IS_ROOT, true)
            .put(Key::CONTAINING_FOLDER, 1i32)
            .put(Key::URL_LENGTHS, Value::array([0i32, 3]))
            .put(Key::FILE_CREATION_DATE, Date::from_seconds(337_219_200.0))
            .put(
                Key::FILE_PROPERTIES,
                ResourceProperties::new(
                    ResourceFlags::IS_REGULAR_FILE,
                    ResourceFlags::from_bits_retain(0x0f),
                )
                .to_vec(),
            )
            .put("com.example.tag", "extra")
            .extra_toc(2, Toc::new().put(Key::VOLUME_NAME, "Disk Image"))
            .build()
    }

    #[test]
    fn accessors() {
        let b = sample();
        assert_eq!(b.path().unwrap(), vec!["Users", "bob", "notes.txt"]);
        assert_eq!(b.cnid_path().unwrap(), vec![101, 2048, 99_001]);
        assert_eq!(b.volume_name(), Some("Macintosh HD"));
        assert_eq!(b.volume_size(), Some(994_662_584_320));
        assert_eq!(b.volume_is_root(), Some(true));
        assert_eq!(b.containing_folder(), Some(1));
        assert_eq!(b.url_lengths().unwrap(), vec![0, 3]);
        assert_eq!(
            b.file_creation_date().unwrap().to_unix(),
            (1_315_526_400, 0)
        );
        assert_eq!(
            b.file_properties().unwrap().get(ResourceFlags::IS_REGULAR_FILE),
            Some(true)
        );
        assert!(b.display_name().is_none());
        assert!(b.sandbox_rw_extension().is_none());
        assert_eq!(b.get("com.example.tag").and_then(Value::as_str), Some("extra"));
        assert!(b[Key::ICON_DATA].is_null());
    }

    #[test]
    fn primary_first() {
        let b = sample();
        assert_eq!(b.toc_count(), 2);
        assert_eq!(b.volume_name(), Some("Macintosh HD"));
        assert_eq!(
            b.toc(2).unwrap().get(&Key::VOLUME_NAME.into()),
            Some(&Value::from("Disk Image"))
        );

        // Keys only present in another table are still found
        let mut b = Bookmark::new();
        b.insert_toc(5, Toc::new().put(Key::DISPLAY_NAME, "Shown"));
        assert_eq!(b.display_name(), Some("Shown"));
    }

    #[test]
    fn volume_bookmark_toc() {
        let b = Bookmark::builder()
            .put(Key::VOLUME_BOOKMARK, 2i32)
            .extra_toc(2, Toc::new().put(Key::VOLUME_PATH, "/Volumes/Image"))
            .build();
        let inner = b.volume_bookmark().unwrap();
        assert_eq!(
            inner.get(&Key::VOLUME_PATH.into()).and_then(Value::as_str),
            Some("/Volumes/Image")
        );
    }

    #[test]
    fn path_resolver_is_a_capability() {
        struct Joined;
        impl PathResolver for Joined {
            type Location = String;
            type Error = ();
            fn resolve(&self, bookmark: &Bookmark) -> std::result::Result<String, ()> {
                bookmark.path().map(|p| format!("/{}", p.join("/"))).ok_or(())
            }
        }
        assert_eq!(
            Joined.resolve(&sample()).unwrap(),
            "/Users/bob/notes.txt"
        );
        assert!(Joined.resolve(&Bookmark::new()).is_err());
    }
}
