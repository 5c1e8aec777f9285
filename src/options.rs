use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::{store::MAX_RECORDS, MAX_BOOKMARK_SIZE, MAX_DEPTH};

/// Version word written into new bookmarks, matching files macOS produces.
pub const DEFAULT_VERSION: u32 = 0x1004_0000;
/// Header size written into new bookmarks. The space past the fixed 16 bytes is zero-filled.
pub const DEFAULT_HEADER_SIZE: u32 = 48;

/// Limits and recovery behavior for decoding.
///
/// Can be loaded from a configuration file; missing fields take their default values.
#[derive(Educe, Clone, Debug, Serialize, Deserialize)]
#[educe(PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct DecodeOptions {
    /// Maximum nesting of arrays, dictionaries, and relative URLs.
    #[educe(Default(expression = MAX_DEPTH))]
    pub max_depth: usize,
    /// Largest declared bookmark length accepted.
    #[educe(Default(expression = MAX_BOOKMARK_SIZE))]
    pub max_size: usize,
    /// Maximum number of records resolved, counting every visit to a shared record.
    #[educe(Default(expression = MAX_RECORDS))]
    pub max_records: usize,
    /// If set, the first recoverable error fails the whole decode.
    pub strict: bool,
}

impl DecodeOptions {
    /// Default limits, recovering from bad records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the largest bookmark accepted.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the maximum number of records resolved.
    pub fn max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Fail on the first bad record instead of keeping it as an opaque value.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Header fields written by the encoder.
#[derive(Educe, Clone, Debug, Serialize, Deserialize)]
#[educe(PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct EncodeOptions {
    #[educe(Default(expression = DEFAULT_VERSION))]
    pub version: u32,
    /// Must be at least 16.
    #[educe(Default(expression = DEFAULT_HEADER_SIZE))]
    pub header_size: u32,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn header_size(mut self, header_size: u32) -> Self {
        self.header_size = header_size;
        self
    }
}
