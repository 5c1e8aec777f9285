use std::cmp;
use std::convert::TryFrom;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder::{BigEndian, ReadBytesExt};
use serde::{
    de::{Deserialize, Deserializer, Error, MapAccess, Visitor},
    ser::{Serialize, SerializeStruct, Serializer},
};

/// Seconds from the Unix epoch to 2001-01-01T00:00:00Z, the epoch bookmark dates count from.
pub const MAC_EPOCH_OFFSET: i64 = 978_307_200;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A bookmark date: seconds since 2001-01-01T00:00:00Z, as a double.
///
/// On the wire this is the one big-endian field of the format, an 8-byte IEEE 754 double.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Date {
    sec: f64,
}

impl Date {
    /// Create a date from seconds since 2001-01-01T00:00:00Z.
    pub fn from_seconds(sec: f64) -> Date {
        Date { sec }
    }

    /// Create a date from a Unix timestamp. Fails if nanoseconds is 1 second or more.
    pub fn from_unix(sec: i64, nano: u32) -> Option<Date> {
        if nano >= 1_000_000_000 {
            None
        } else {
            Some(Date {
                sec: (sec - MAC_EPOCH_OFFSET) as f64 + (nano as f64) / NANOS_PER_SEC,
            })
        }
    }

    /// Seconds since 2001-01-01T00:00:00Z.
    pub fn seconds(&self) -> f64 {
        self.sec
    }

    /// Seconds since the Unix epoch, including the fractional part.
    pub fn unix_seconds(&self) -> f64 {
        self.sec + MAC_EPOCH_OFFSET as f64
    }

    /// Split into whole Unix seconds and the nanoseconds past them. Nanoseconds are rounded to
    /// the nearest value the double can carry.
    pub fn to_unix(&self) -> (i64, u32) {
        let whole = self.sec.floor();
        let mut sec = (whole as i64).saturating_add(MAC_EPOCH_OFFSET);
        let mut nano = ((self.sec - whole) * NANOS_PER_SEC).round() as u32;
        if nano >= 1_000_000_000 {
            sec = sec.saturating_add(1);
            nano -= 1_000_000_000;
        }
        (sec, nano)
    }

    /// The current system time.
    pub fn now() -> Date {
        Date::from(SystemTime::now())
    }

    /// Encode onto a byte vector as a big-endian double.
    pub fn encode_vec(&self, vec: &mut Vec<u8>) {
        vec.extend_from_slice(&self.sec.to_bits().to_be_bytes());
    }

    pub fn size(&self) -> usize {
        8
    }
}

impl From<SystemTime> for Date {
    fn from(time: SystemTime) -> Date {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Date {
                sec: d.as_secs_f64() - MAC_EPOCH_OFFSET as f64,
            },
            Err(e) => Date {
                sec: -e.duration().as_secs_f64() - MAC_EPOCH_OFFSET as f64,
            },
        }
    }
}

impl TryFrom<Date> for SystemTime {
    type Error = String;
    fn try_from(date: Date) -> Result<SystemTime, Self::Error> {
        let unix = date.unix_seconds();
        let out_of_range = || format!("{} is out of range for the system clock", date.sec);
        let offset = Duration::try_from_secs_f64(unix.abs()).map_err(|_| out_of_range())?;
        let time = if unix >= 0.0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(out_of_range)
    }
}

impl cmp::PartialOrd for Date {
    fn partial_cmp(&self, other: &Date) -> Option<cmp::Ordering> {
        self.sec.partial_cmp(&other.sec)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (sec, nano) = self.to_unix();
        write!(f, "Unix: {} sec + {} ns", sec, nano)
    }
}

impl TryFrom<&[u8]> for Date {
    type Error = String;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != 8 {
            return Err(format!(
                "not a recognized Date length ({} bytes)",
                value.len()
            ));
        }
        let mut raw = value;
        let sec = raw
            .read_f64::<BigEndian>()
            .map_err(|_| String::from("missing date bytes"))?;
        Ok(Date { sec })
    }
}

impl Serialize for Date {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            let (sec, nano) = self.to_unix();
            let mut st = serializer.serialize_struct("Date", 2)?;
            st.serialize_field("secs", &sec)?;
            st.serialize_field("nanos", &nano)?;
            st.end()
        } else {
            serializer.serialize_f64(self.sec)
        }
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = Date;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "seconds since 2001-01-01 or a {{secs, nanos}} struct")
            }

            fn visit_f64<E: Error>(self, v: f64) -> Result<Date, E> {
                Ok(Date::from_seconds(v))
            }

            fn visit_i64<E: Error>(self, v: i64) -> Result<Date, E> {
                Ok(Date::from_seconds(v as f64))
            }

            fn visit_u64<E: Error>(self, v: u64) -> Result<Date, E> {
                Ok(Date::from_seconds(v as f64))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Date, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut secs: Option<i64> = None;
                let mut nanos: u32 = 0;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_ref() {
                        "secs" => secs = Some(map.next_value()?),
                        "nanos" => nanos = map.next_value()?,
                        _ => return Err(A::Error::unknown_field(key.as_ref(), &["secs", "nanos"])),
                    }
                }
                let secs = secs.ok_or_else(|| A::Error::missing_field("secs"))?;
                Date::from_unix(secs, nanos).ok_or_else(|| A::Error::custom("Invalid date"))
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_any(DateVisitor)
        } else {
            deserializer.deserialize_f64(DateVisitor)
        }
    }
}
