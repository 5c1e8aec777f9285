//! Resource and volume property blobs.
//!
//! Keys 0x1010 and 0x2020 hold 24 bytes of data: the property flags, a mask of which flags were
//! actually looked up, and 8 reserved bytes. All three are little-endian `u64`.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

bitflags::bitflags! {
    /// `kCFURLResource*` property flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceFlags: u64 {
        const IS_REGULAR_FILE = 0x0000_0001;
        const IS_DIRECTORY = 0x0000_0002;
        const IS_SYMBOLIC_LINK = 0x0000_0004;
        const IS_VOLUME = 0x0000_0008;
        const IS_PACKAGE = 0x0000_0010;
        const IS_SYSTEM_IMMUTABLE = 0x0000_0020;
        const IS_USER_IMMUTABLE = 0x0000_0040;
        const IS_HIDDEN = 0x0000_0080;
        const HAS_HIDDEN_EXTENSION = 0x0000_0100;
        const IS_APPLICATION = 0x0000_0200;
        /// Also known as "system compressed"
        const IS_COMPRESSED = 0x0000_0400;
        const CAN_SET_HIDDEN_EXTENSION = 0x0000_0800;
        const IS_READABLE = 0x0000_1000;
        const IS_WRITEABLE = 0x0000_2000;
        /// Execute for files, search for directories
        const IS_EXECUTABLE = 0x0000_4000;
        const IS_ALIAS_FILE = 0x0000_8000;
        const IS_MOUNT_TRIGGER = 0x0001_0000;
    }
}

bitflags::bitflags! {
    /// `kCFURLVolume*` property flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VolumeFlags: u64 {
        /// Local device, as opposed to a network one
        const IS_LOCAL = 0x1;
        const IS_AUTOMOUNT = 0x2;
        const DONT_BROWSE = 0x4;
        const IS_READ_ONLY = 0x8;
        const IS_QUARANTINED = 0x10;
        const IS_EJECTABLE = 0x20;
        const IS_REMOVABLE = 0x40;
        const IS_INTERNAL = 0x80;
        const IS_EXTERNAL = 0x100;
        const IS_DISK_IMAGE = 0x200;
        const IS_FILE_VAULT = 0x400;
        const IS_LOCAL_IDISK_MIRROR = 0x800;
        const IS_IPOD = 0x1000;
        const IS_IDISK = 0x2000;
        const IS_CD = 0x4000;
        const IS_DVD = 0x8000;
        const IS_DEVICE_FILE_SYSTEM = 0x1_0000;
        const SUPPORTS_PERSISTENT_IDS = 0x1_0000_0000;
        const SUPPORTS_SEARCH_FS = 0x2_0000_0000;
        const SUPPORTS_EXCHANGE = 0x4_0000_0000;
        const SUPPORTS_SYMBOLIC_LINKS = 0x10_0000_0000;
        const SUPPORTS_DENY_MODES = 0x20_0000_0000;
        const SUPPORTS_COPY_FILE = 0x40_0000_0000;
        const SUPPORTS_READ_DIR_ATTR = 0x80_0000_0000;
        const SUPPORTS_JOURNALING = 0x100_0000_0000;
        const SUPPORTS_RENAME = 0x200_0000_0000;
        const SUPPORTS_FAST_STAT_FS = 0x400_0000_0000;
        const SUPPORTS_CASE_SENSITIVE_NAMES = 0x800_0000_0000;
        const SUPPORTS_CASE_PRESERVED_NAMES = 0x1000_0000_0000;
        const SUPPORTS_FLOCK = 0x2000_0000_0000;
        const HAS_NO_ROOT_DIRECTORY_TIMES = 0x4000_0000_0000;
        const SUPPORTS_EXTENDED_SECURITY = 0x8000_0000_0000;
        const SUPPORTS_2TB_FILE_SIZE = 0x1_0000_0000_0000;
        const SUPPORTS_HARD_LINKS = 0x2_0000_0000_0000;
        const SUPPORTS_MANDATORY_BYTE_RANGE_LOCKS = 0x4_0000_0000_0000;
        const SUPPORTS_PATH_FROM_ID = 0x8_0000_0000_0000;
        const IS_JOURNALING = 0x20_0000_0000_0000;
        const SUPPORTS_SPARSE_FILES = 0x40_0000_0000_0000;
        const SUPPORTS_ZERO_RUNS = 0x80_0000_0000_0000;
        const SUPPORTS_VOLUME_SIZES = 0x100_0000_0000_0000;
        const SUPPORTS_REMOTE_EVENTS = 0x200_0000_0000_0000;
        const SUPPORTS_HIDDEN_FILES = 0x400_0000_0000_0000;
        const SUPPORTS_DECMPFS_COMPRESSION = 0x800_0000_0000_0000;
        const HAS_64BIT_OBJECT_IDS = 0x1000_0000_0000_0000;
    }
}

/// Size of an encoded property blob.
pub const PROPERTY_BLOB_LEN: usize = 24;

/// A decoded property blob. `flags` is only meaningful for the bits set in `valid`.
///
/// Unknown bits are kept as-is, so a blob always encodes back to the bytes it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyFlags<F> {
    pub flags: F,
    pub valid: F,
    pub reserved: u64,
}

pub type ResourceProperties = PropertyFlags<ResourceFlags>;
pub type VolumeProperties = PropertyFlags<VolumeFlags>;

impl<F: bitflags::Flags<Bits = u64> + Copy> PropertyFlags<F> {
    pub fn new(flags: F, valid: F) -> Self {
        PropertyFlags {
            flags,
            valid,
            reserved: 0,
        }
    }

    /// Parse a 24-byte property blob.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != PROPERTY_BLOB_LEN {
            return Err(Error::TruncatedInput {
                step: "decode property flags",
                actual: data.len(),
                expected: PROPERTY_BLOB_LEN,
            });
        }
        let mut raw = data;
        let mut word = || {
            raw.read_u64::<LittleEndian>()
                .map_err(|e| Error::MalformedStore(e.to_string()))
        };
        let flags = F::from_bits_retain(word()?);
        let valid = F::from_bits_retain(word()?);
        let reserved = word()?;
        Ok(PropertyFlags {
            flags,
            valid,
            reserved,
        })
    }

    pub fn encode_vec(&self, vec: &mut Vec<u8>) {
        vec.extend_from_slice(&self.flags.bits().to_le_bytes());
        vec.extend_from_slice(&self.valid.bits().to_le_bytes());
        vec.extend_from_slice(&self.reserved.to_le_bytes());
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut vec = Vec::with_capacity(PROPERTY_BLOB_LEN);
        self.encode_vec(&mut vec);
        vec
    }

    /// Whether `flag` was looked up, and if so whether it is set.
    pub fn get(&self, flag: F) -> Option<bool> {
        if self.valid.contains(flag) {
            Some(self.flags.contains(flag))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resource_blob() {
        // A regular file with only the file/dir/link bits looked up
        let mut blob = Vec::new();
        blob.extend_from_slice(&1u64.to_le_bytes());
        blob.extend_from_slice(&0x0fu64.to_le_bytes());
        blob.extend_from_slice(&0u64.to_le_bytes());

        let props = ResourceProperties::decode(&blob).unwrap();
        assert_eq!(props.flags, ResourceFlags::IS_REGULAR_FILE);
        assert_eq!(props.get(ResourceFlags::IS_DIRECTORY), Some(false));
        assert_eq!(props.get(ResourceFlags::IS_HIDDEN), None);
        assert_eq!(props.to_vec(), blob);
    }

    #[test]
    fn volume_blob_keeps_unknown_bits() {
        let flags = VolumeFlags::from_bits_retain(0x81) | VolumeFlags::SUPPORTS_PERSISTENT_IDS;
        let valid = VolumeFlags::from_bits_retain(0x13EF) | VolumeFlags::SUPPORTS_PERSISTENT_IDS;
        let props = VolumeProperties::new(flags, valid);
        let blob = props.to_vec();
        assert_eq!(blob.len(), PROPERTY_BLOB_LEN);

        let back = VolumeProperties::decode(&blob).unwrap();
        assert_eq!(back, props);
        assert_eq!(back.get(VolumeFlags::IS_LOCAL), Some(true));
        assert_eq!(back.get(VolumeFlags::IS_INTERNAL), Some(true));
        assert_eq!(back.get(VolumeFlags::IS_EXTERNAL), Some(false));
        assert_eq!(back.get(VolumeFlags::IS_CD), None);

        let odd = VolumeFlags::from_bits_retain(1 << 52);
        let mut blob = VolumeProperties::new(odd, odd).to_vec();
        assert_eq!(VolumeProperties::decode(&blob).unwrap().flags.bits(), 1 << 52);
        blob.pop();
        assert!(matches!(
            VolumeProperties::decode(&blob),
            Err(Error::TruncatedInput { .. })
        ));
    }
}
