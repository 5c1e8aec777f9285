use std::convert::TryFrom;
use std::fmt::{self, Display};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::tag::NumberType;

/// A bookmark integer, along with the numeric type it was (or will be) stored as.
///
/// Every `CFNumberType` integer is signed; a value is always held as `i64` and written back out at
/// the width of its type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Integer {
    ty: NumberType,
    n: i64,
}

impl Integer {
    /// Pair a value with a numeric type. Fails if the type is a floating-point one or the value
    /// doesn't fit in the type's width.
    pub fn new(ty: NumberType, n: i64) -> Option<Integer> {
        if ty.is_float() {
            return None;
        }
        let fits = match ty.width() {
            1 => i8::try_from(n).is_ok(),
            2 => i16::try_from(n).is_ok(),
            4 => i32::try_from(n).is_ok(),
            _ => true,
        };
        if fits {
            Some(Integer { ty, n })
        } else {
            None
        }
    }

    pub fn number_type(&self) -> NumberType {
        self.ty
    }

    pub fn width(&self) -> usize {
        self.ty.width()
    }

    #[inline]
    pub fn as_i64(&self) -> i64 {
        self.n
    }

    /// Returns the integer represented as `u64` if it isn't negative.
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        u64::try_from(self.n).ok()
    }

    /// Forcibly casts the value to u64 without modification.
    #[inline]
    pub fn as_bits(&self) -> u64 {
        self.n as u64
    }

    /// Encode as little-endian bytes at the type's width.
    pub fn encode_vec(&self, vec: &mut Vec<u8>) {
        vec.extend_from_slice(&self.n.to_le_bytes()[..self.width()]);
    }

    /// Read a payload of exactly the type's width.
    pub fn decode(ty: NumberType, payload: &[u8]) -> Result<Integer, String> {
        if ty.is_float() {
            return Err(format!("{:?} is not an integer type", ty));
        }
        if payload.len() != ty.width() {
            return Err(format!(
                "{:?} needs {} bytes, payload is {}",
                ty,
                ty.width(),
                payload.len()
            ));
        }
        let mut raw = payload;
        let n = match ty.width() {
            1 => raw.read_i8().map(i64::from),
            2 => raw.read_i16::<LittleEndian>().map(i64::from),
            4 => raw.read_i32::<LittleEndian>().map(i64::from),
            _ => raw.read_i64::<LittleEndian>(),
        }
        .map_err(|e| e.to_string())?;
        Ok(Integer { ty, n })
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.n, f)
    }
}

macro_rules! impl_from_int {
    ($t: ty, $ty: expr) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Integer {
                Integer { ty: $ty, n: n as i64 }
            }
        }
    };
}

impl_from_int!(i8, NumberType::SInt8);
impl_from_int!(i16, NumberType::SInt16);
impl_from_int!(i32, NumberType::SInt32);
impl_from_int!(i64, NumberType::SInt64);
impl_from_int!(u8, NumberType::SInt16);
impl_from_int!(u16, NumberType::SInt32);
impl_from_int!(u32, NumberType::SInt64);

impl TryFrom<u64> for Integer {
    type Error = u64;
    fn try_from(n: u64) -> Result<Integer, u64> {
        i64::try_from(n)
            .map(|n| Integer {
                ty: NumberType::SInt64,
                n,
            })
            .map_err(|_| n)
    }
}

/// A bookmark floating-point number, along with its numeric type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Float {
    ty: NumberType,
    v: f64,
}

impl Float {
    /// Pair a value with a floating-point type. 4-byte types only accept values that survive a
    /// round trip through `f32`.
    pub fn new(ty: NumberType, v: f64) -> Option<Float> {
        if !ty.is_float() {
            return None;
        }
        if ty.width() == 4 && !v.is_nan() && (v as f32) as f64 != v {
            return None;
        }
        Some(Float { ty, v })
    }

    pub fn number_type(&self) -> NumberType {
        self.ty
    }

    pub fn width(&self) -> usize {
        self.ty.width()
    }

    pub fn as_f64(&self) -> f64 {
        self.v
    }

    pub fn encode_vec(&self, vec: &mut Vec<u8>) {
        if self.width() == 4 {
            vec.extend_from_slice(&(self.v as f32).to_bits().to_le_bytes());
        } else {
            vec.extend_from_slice(&self.v.to_bits().to_le_bytes());
        }
    }

    pub fn decode(ty: NumberType, payload: &[u8]) -> Result<Float, String> {
        if !ty.is_float() {
            return Err(format!("{:?} is not a floating-point type", ty));
        }
        let mut raw = payload;
        let v = match payload.len() {
            4 if ty.width() == 4 => raw.read_f32::<LittleEndian>().map(f64::from),
            8 if ty.width() == 8 => raw.read_f64::<LittleEndian>(),
            len => {
                return Err(format!(
                    "{:?} needs {} bytes, payload is {}",
                    ty,
                    ty.width(),
                    len
                ))
            }
        }
        .map_err(|e| e.to_string())?;
        Ok(Float { ty, v })
    }
}

impl Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.v, f)
    }
}

impl From<f32> for Float {
    fn from(v: f32) -> Float {
        Float {
            ty: NumberType::Float32,
            v: v.into(),
        }
    }
}

impl From<f64> for Float {
    fn from(v: f64) -> Float {
        Float {
            ty: NumberType::Float64,
            v,
        }
    }
}
