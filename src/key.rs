//! Well-known table of contents keys.
//!
//! Keys are grouped in bands by their top nibble. The bands are informative only: decoding keeps
//! any key it finds, known or not.

use std::fmt;

use serde::{Serialize, Serializer};

/// A 32-bit key in a table of contents.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub u32);

impl Key {
    /// A URL
    pub const URL: Key = Key(0x1003);
    /// Array of path components
    pub const PATH: Key = Key(0x1004);
    /// Array of CNIDs
    pub const CNID_PATH: Key = Key(0x1005);
    /// Resource property flags: (flags, flags asked for, 8 reserved bytes)
    pub const FILE_PROPERTIES: Key = Key(0x1010);
    pub const FILE_NAME: Key = Key(0x1020);
    pub const FILE_ID: Key = Key(0x1030);
    pub const FILE_CREATION_DATE: Key = Key(0x1040);
    /// A list of (TOC id, ?) pairs
    pub const TOC_PATH: Key = Key(0x2000);
    pub const VOLUME_PATH: Key = Key(0x2002);
    pub const VOLUME_URL: Key = Key(0x2005);
    pub const VOLUME_NAME: Key = Key(0x2010);
    /// Stored as a string, not as a UUID record
    pub const VOLUME_UUID: Key = Key(0x2011);
    pub const VOLUME_SIZE: Key = Key(0x2012);
    pub const VOLUME_CREATION_DATE: Key = Key(0x2013);
    /// Volume property flags: (flags, flags asked for, 8 reserved bytes)
    pub const VOLUME_PROPERTIES: Key = Key(0x2020);
    pub const VOLUME_IS_ROOT: Key = Key(0x2030);
    /// Embedded bookmark for a disk image, as a TOC id
    pub const VOLUME_BOOKMARK: Key = Key(0x2040);
    pub const VOLUME_MOUNT_POINT: Key = Key(0x2050);
    /// Index of the containing folder in the path
    pub const CONTAINING_FOLDER: Key = Key(0xC001);
    pub const USER_NAME: Key = Key(0xC011);
    pub const UID: Key = Key(0xC012);
    pub const WAS_FILE_REFERENCE: Key = Key(0xD001);
    pub const CREATION_OPTIONS: Key = Key(0xD010);
    /// Path component counts of each base URL, when the bookmarked URL had a base
    pub const URL_LENGTHS: Key = Key(0xE003);
    pub const DISPLAY_NAME: Key = Key(0xF017);
    pub const ICON_DATA: Key = Key(0xF020);
    pub const ICON_REF: Key = Key(0xF021);
    pub const TYPE_BINDING_DATA: Key = Key(0xF022);
    pub const CREATION_TIME: Key = Key(0xF030);
    pub const SANDBOX_RW_EXTENSION: Key = Key(0xF080);
    pub const SANDBOX_RO_EXTENSION: Key = Key(0xF081);
    pub const ALIAS_DATA: Key = Key(0xFE00);

    pub fn role(self) -> Option<Role> {
        key_role(self.0)
    }

    pub fn band(self) -> Band {
        Band::of(self.0)
    }
}

impl From<u32> for Key {
    fn from(val: u32) -> Key {
        Key(val)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.role() {
            Some(role) => write!(f, "Key({:?})", role),
            None => write!(f, "Key(0x{:x})", self.0),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.role() {
            Some(role) => write!(f, "{:?}", role),
            None => write!(f, "0x{:x}", self.0),
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

/// Key ranges, by top nibble of the low 16 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    /// 0x1xxx: the bookmarked object and its URL
    ObjectUrl,
    /// 0x2xxx: the volume holding the object
    Volume,
    /// 0xCxxx: who created the bookmark
    Authoring,
    /// 0xDxxx: how the bookmark was created
    Provenance,
    /// 0xExxx: structural auxiliary data
    Auxiliary,
    /// 0xFxxx: display, icon, and sandbox data
    Misc,
    Other,
}

impl Band {
    pub fn of(key: u32) -> Band {
        if key > 0xFFFF {
            return Band::Other;
        }
        match key >> 12 {
            0x1 => Band::ObjectUrl,
            0x2 => Band::Volume,
            0xC => Band::Authoring,
            0xD => Band::Provenance,
            0xE => Band::Auxiliary,
            0xF => Band::Misc,
            _ => Band::Other,
        }
    }
}

/// Semantic roles of the well-known keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Url,
    Path,
    CnidPath,
    FileProperties,
    FileName,
    FileId,
    FileCreationDate,
    TocPath,
    VolumePath,
    VolumeUrl,
    VolumeName,
    VolumeUuid,
    VolumeSize,
    VolumeCreationDate,
    VolumeProperties,
    VolumeIsRoot,
    VolumeBookmark,
    VolumeMountPoint,
    ContainingFolder,
    UserName,
    Uid,
    WasFileReference,
    CreationOptions,
    UrlLengths,
    DisplayName,
    IconData,
    IconRef,
    TypeBindingData,
    CreationTime,
    SandboxRwExtension,
    SandboxRoExtension,
    AliasData,
}

const ROLES: &[(Key, Role)] = &[
    (Key::URL, Role::Url),
    (Key::PATH, Role::Path),
    (Key::CNID_PATH, Role::CnidPath),
    (Key::FILE_PROPERTIES, Role::FileProperties),
    (Key::FILE_NAME, Role::FileName),
    (Key::FILE_ID, Role::FileId),
    (Key::FILE_CREATION_DATE, Role::FileCreationDate),
    (Key::TOC_PATH, Role::TocPath),
    (Key::VOLUME_PATH, Role::VolumePath),
    (Key::VOLUME_URL, Role::VolumeUrl),
    (Key::VOLUME_NAME, Role::VolumeName),
    (Key::VOLUME_UUID, Role::VolumeUuid),
    (Key::VOLUME_SIZE, Role::VolumeSize),
    (Key::VOLUME_CREATION_DATE, Role::VolumeCreationDate),
    (Key::VOLUME_PROPERTIES, Role::VolumeProperties),
    (Key::VOLUME_IS_ROOT, Role::VolumeIsRoot),
    (Key::VOLUME_BOOKMARK, Role::VolumeBookmark),
    (Key::VOLUME_MOUNT_POINT, Role::VolumeMountPoint),
    (Key::CONTAINING_FOLDER, Role::ContainingFolder),
    (Key::USER_NAME, Role::UserName),
    (Key::UID, Role::Uid),
    (Key::WAS_FILE_REFERENCE, Role::WasFileReference),
    (Key::CREATION_OPTIONS, Role::CreationOptions),
    (Key::URL_LENGTHS, Role::UrlLengths),
    (Key::DISPLAY_NAME, Role::DisplayName),
    (Key::ICON_DATA, Role::IconData),
    (Key::ICON_REF, Role::IconRef),
    (Key::TYPE_BINDING_DATA, Role::TypeBindingData),
    (Key::CREATION_TIME, Role::CreationTime),
    (Key::SANDBOX_RW_EXTENSION, Role::SandboxRwExtension),
    (Key::SANDBOX_RO_EXTENSION, Role::SandboxRoExtension),
    (Key::ALIAS_DATA, Role::AliasData),
];

impl Role {
    pub fn key(self) -> Key {
        ROLES
            .iter()
            .find(|(_, role)| *role == self)
            .map(|(key, _)| *key)
            .unwrap_or(Key(0))
    }
}

/// Look up the semantic role of a key. Unknown keys give `None`, which is not an error.
pub fn key_role(key: u32) -> Option<Role> {
    ROLES
        .iter()
        .find(|(k, _)| k.0 == key)
        .map(|(_, role)| *role)
}

/// A key as stored in a table of contents. Keys with the high bit set are an offset to a string
/// record, which this crate surfaces as [`TocKey::Name`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TocKey {
    Key(Key),
    Name(String),
}

/// High bit of an encoded TOC key, marking it as a string offset.
pub const NAMED_KEY_FLAG: u32 = 0x8000_0000;

impl From<Key> for TocKey {
    fn from(val: Key) -> TocKey {
        TocKey::Key(val)
    }
}

impl From<Role> for TocKey {
    fn from(val: Role) -> TocKey {
        TocKey::Key(val.key())
    }
}

impl From<u32> for TocKey {
    fn from(val: u32) -> TocKey {
        TocKey::Key(Key(val))
    }
}

impl From<&str> for TocKey {
    fn from(val: &str) -> TocKey {
        TocKey::Name(val.to_string())
    }
}

impl From<String> for TocKey {
    fn from(val: String) -> TocKey {
        TocKey::Name(val)
    }
}

impl fmt::Display for TocKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TocKey::Key(key) => fmt::Display::fmt(key, f),
            TocKey::Name(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roles_roundtrip() {
        for (key, role) in ROLES {
            assert_eq!(key_role(key.0), Some(*role));
            assert_eq!(role.key(), *key);
        }
        assert_eq!(key_role(0x1054), None);
    }

    #[test]
    fn bands() {
        assert_eq!(Key::PATH.band(), Band::ObjectUrl);
        assert_eq!(Key::VOLUME_UUID.band(), Band::Volume);
        assert_eq!(Key::USER_NAME.band(), Band::Authoring);
        assert_eq!(Key::CREATION_OPTIONS.band(), Band::Provenance);
        assert_eq!(Key::URL_LENGTHS.band(), Band::Auxiliary);
        assert_eq!(Key::SANDBOX_RO_EXTENSION.band(), Band::Misc);
        assert_eq!(Key(0x3001).band(), Band::Other);
        assert_eq!(Key(0x1_1004).band(), Band::Other);
    }

    #[test]
    fn display() {
        assert_eq!(Key::VOLUME_NAME.to_string(), "VolumeName");
        assert_eq!(Key(0x1054).to_string(), "0x1054");
        assert_eq!(TocKey::from("Custom").to_string(), "Custom");
    }
}
