//! Record type tags.
//!
//! Every record carries a 32-bit tag. The high 24 bits select the value kind, the low 8 bits
//! refine it (numeric width, boolean value, absolute or relative URL).

use std::fmt;

pub const TYPE_MASK: u32 = 0xFFFF_FF00;
pub const SUBTYPE_MASK: u32 = 0x0000_00FF;

pub const TYPE_STRING: u32 = 0x0100;
pub const TYPE_DATA: u32 = 0x0200;
pub const TYPE_NUMBER: u32 = 0x0300;
pub const TYPE_DATE: u32 = 0x0400;
pub const TYPE_BOOLEAN: u32 = 0x0500;
pub const TYPE_ARRAY: u32 = 0x0600;
pub const TYPE_DICT: u32 = 0x0700;
pub const TYPE_UUID: u32 = 0x0800;
pub const TYPE_URL: u32 = 0x0900;
pub const TYPE_NULL: u32 = 0x0A00;

pub const SUBTYPE_ZERO: u8 = 0;
pub const SUBTYPE_ONE: u8 = 1;

pub const SUBTYPE_BOOLEAN_FALSE: u8 = 0;
pub const SUBTYPE_BOOLEAN_TRUE: u8 = 1;

pub const SUBTYPE_URL_ABSOLUTE: u8 = 1;
pub const SUBTYPE_URL_RELATIVE: u8 = 2;

/// The kind of value a record holds, taken from the type bits of its tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Data,
    Number,
    Date,
    Boolean,
    Array,
    Dict,
    Uuid,
    Url,
    Null,
    /// Type bits outside the known catalog. Holds the complete raw tag.
    Unknown(u32),
}

impl Kind {
    /// Look up the kind for a raw tag. Never fails.
    pub fn from_tag(tag: u32) -> Kind {
        match tag & TYPE_MASK {
            TYPE_STRING => Kind::String,
            TYPE_DATA => Kind::Data,
            TYPE_NUMBER => Kind::Number,
            TYPE_DATE => Kind::Date,
            TYPE_BOOLEAN => Kind::Boolean,
            TYPE_ARRAY => Kind::Array,
            TYPE_DICT => Kind::Dict,
            TYPE_UUID => Kind::Uuid,
            TYPE_URL => Kind::Url,
            TYPE_NULL => Kind::Null,
            _ => Kind::Unknown(tag),
        }
    }

    /// The type bits for this kind. Unknown kinds give back the type bits of the tag they were
    /// read from.
    pub fn type_bits(self) -> u32 {
        match self {
            Kind::String => TYPE_STRING,
            Kind::Data => TYPE_DATA,
            Kind::Number => TYPE_NUMBER,
            Kind::Date => TYPE_DATE,
            Kind::Boolean => TYPE_BOOLEAN,
            Kind::Array => TYPE_ARRAY,
            Kind::Dict => TYPE_DICT,
            Kind::Uuid => TYPE_UUID,
            Kind::Url => TYPE_URL,
            Kind::Null => TYPE_NULL,
            Kind::Unknown(tag) => tag & TYPE_MASK,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Kind::String => "String",
            Kind::Data => "Data",
            Kind::Number => "Number",
            Kind::Date => "Date",
            Kind::Boolean => "Boolean",
            Kind::Array => "Array",
            Kind::Dict => "Dict",
            Kind::Uuid => "UUID",
            Kind::Url => "URL",
            Kind::Null => "Null",
            Kind::Unknown(_) => "Unknown",
        }
    }

    /// Kinds whose payload holds slot references rather than inline data. URLs only do so for the
    /// relative subtype.
    pub fn is_composite(&self) -> bool {
        matches!(self, Kind::Array | Kind::Dict | Kind::Url)
    }
}

/// Split a raw tag into its kind and subtype. Total: unrecognized type bits give
/// [`Kind::Unknown`] carrying the raw tag.
pub fn classify(tag: u32) -> (Kind, u8) {
    (Kind::from_tag(tag), (tag & SUBTYPE_MASK) as u8)
}

/// Numeric subtypes. These are `CFNumberType` values; only the first six show up in files macOS
/// writes, but the rest decode fine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumberType {
    SInt8,
    SInt16,
    SInt32,
    SInt64,
    Float32,
    Float64,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    CFIndex,
    NSInteger,
    CGFloat,
}

impl NumberType {
    pub fn from_u8(v: u8) -> Option<NumberType> {
        use self::NumberType::*;
        Some(match v {
            1 => SInt8,
            2 => SInt16,
            3 => SInt32,
            4 => SInt64,
            5 => Float32,
            6 => Float64,
            7 => Char,
            8 => Short,
            9 => Int,
            10 => Long,
            11 => LongLong,
            12 => Float,
            13 => Double,
            14 => CFIndex,
            15 => NSInteger,
            16 => CGFloat,
            _ => return None,
        })
    }

    pub fn into_u8(self) -> u8 {
        use self::NumberType::*;
        match self {
            SInt8 => 1,
            SInt16 => 2,
            SInt32 => 3,
            SInt64 => 4,
            Float32 => 5,
            Float64 => 6,
            Char => 7,
            Short => 8,
            Int => 9,
            Long => 10,
            LongLong => 11,
            Float => 12,
            Double => 13,
            CFIndex => 14,
            NSInteger => 15,
            CGFloat => 16,
        }
    }

    /// Payload width in bytes, assuming the LP64 data model macOS uses.
    pub fn width(self) -> usize {
        use self::NumberType::*;
        match self {
            SInt8 | Char => 1,
            SInt16 | Short => 2,
            SInt32 | Int | Float32 | Float => 4,
            SInt64 | Long | LongLong | Float64 | Double | CFIndex | NSInteger | CGFloat => 8,
        }
    }

    pub fn is_float(self) -> bool {
        use self::NumberType::*;
        matches!(self, Float32 | Float64 | Float | Double | CGFloat)
    }
}

impl From<NumberType> for u8 {
    fn from(val: NumberType) -> u8 {
        val.into_u8()
    }
}

/// A packed record tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(u32);

impl Tag {
    pub const fn from_raw(raw: u32) -> Tag {
        Tag(raw)
    }

    /// Build a tag from a kind and a subtype. For [`Kind::Unknown`], the subtype is ignored and
    /// the original raw tag is returned unchanged.
    pub fn new(kind: Kind, subtype: u8) -> Tag {
        match kind {
            Kind::Unknown(raw) => Tag(raw),
            kind => Tag(kind.type_bits() | subtype as u32),
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn kind(self) -> Kind {
        Kind::from_tag(self.0)
    }

    pub fn subtype(self) -> u8 {
        (self.0 & SUBTYPE_MASK) as u8
    }

    pub fn number_type(self) -> Option<NumberType> {
        if self.kind() == Kind::Number {
            NumberType::from_u8(self.subtype())
        } else {
            None
        }
    }
}

impl From<u32> for Tag {
    fn from(val: u32) -> Tag {
        Tag(val)
    }
}

impl From<Tag> for u32 {
    fn from(val: Tag) -> u32 {
        val.0
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({}, 0x{:02x})", self.kind().name(), self.subtype())
    }
}
