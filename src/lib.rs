//! mac-bookmark reads and writes the bookmark format macOS uses for persistent file references.
//!
//! A bookmark is what `NSURL`'s bookmark data, Finder aliases, and many preference files store
//! when a program wants to find a file again after it moved, or after the program restarted.
//! This crate handles the container itself:
//!
//! - Decoding a bookmark into a [`Bookmark`] of tables of contents, each mapping [`Key`]s to
//!     typed [`Value`]s
//! - Recovering from damaged records. A record that can't be parsed becomes
//!     [`Value::Opaque`], a record that refers back to itself becomes [`Value::Unresolved`],
//!     and both are reported alongside the result in [`Decoded`]
//! - Encoding a [`Bookmark`] back into bytes. Decoding and then encoding a well-formed bookmark
//!     gives back an equivalent bookmark
//! - Typed views of the well-known properties, such as the path, the volume, and the
//!     resource property flags
//!
//! Turning a bookmark back into a live file system location is left to the caller, through
//! [`PathResolver`].
//!
//! The binary layout is described in the [`format`] module.
//!
//! ```
//! use mac_bookmark::{Bookmark, Key, Value};
//!
//! let bookmark = Bookmark::builder()
//!     .put(Key::PATH, Value::array(["Users", "alice", "notes.txt"]))
//!     .put(Key::VOLUME_NAME, "Macintosh HD")
//!     .build();
//! let bytes = bookmark.encode().unwrap();
//! let decoded = mac_bookmark::decode(&bytes).unwrap();
//! assert!(decoded.is_clean());
//! assert_eq!(decoded.bookmark.volume_name(), Some("Macintosh HD"));
//! ```

mod bookmark;
mod date;
mod depth_tracking;
mod key;
mod number;
mod options;
mod props;
mod record;
mod ser;
mod tag;
mod url;
mod value;

pub mod decode;
pub mod encode;
pub mod error;
pub mod format;
pub mod store;

pub use self::bookmark::{Bookmark, BookmarkBuilder, PathResolver, Toc, PRIMARY_TOC};
pub use self::date::{Date, MAC_EPOCH_OFFSET};
pub use self::decode::{decode, decode_with, Decoded};
pub use self::encode::encode;
pub use self::error::{Error, Result};
pub use self::key::{key_role, Band, Key, Role, TocKey, NAMED_KEY_FLAG};
pub use self::number::{Float, Integer};
pub use self::options::{DecodeOptions, EncodeOptions, DEFAULT_HEADER_SIZE, DEFAULT_VERSION};
pub use self::props::{
    PropertyFlags, ResourceFlags, ResourceProperties, VolumeFlags, VolumeProperties,
    PROPERTY_BLOB_LEN,
};
pub use self::record::{Element, Record};
pub use self::store::{Resolver, Store};
pub use self::tag::{classify, Kind, NumberType, Tag};
pub use self::url::{resolve_reference, Url};
pub use self::value::{Opaque, Value};

/// The largest bookmark [`decode`] accepts by default, 16 MiB. Real bookmarks are a few
/// kilobytes; the limit keeps a corrupted length field from being trusted.
pub const MAX_BOOKMARK_SIZE: usize = 1usize << 24; // 16 MiB

/// The deepest nesting of arrays, dictionaries, and relative URLs that decoding will follow.
pub const MAX_DEPTH: usize = 512;
