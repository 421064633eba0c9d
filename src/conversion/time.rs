//! Time crate type implementations (Date, Time, PrimitiveDateTime, OffsetDateTime).
//!
//! Binary values count from the PostgreSQL epoch 2000-01-01 in days (date)
//! or microseconds (time, timestamp). Text values use the ISO `DateStyle`.

use time::format_description::BorrowedFormatItem as FormatItem;
use time::macros::{datetime, format_description};
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{Error, Result};
use crate::protocol::codec::read_fixed;
use crate::protocol::types::{Oid, oid};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use super::{FromWireValue, ToWireValue, utf8};

/// PostgreSQL epoch is 2000-01-01, whose Julian day is 2451545
const PG_EPOCH_JULIAN_DAY: i32 = 2_451_545;
const PG_EPOCH: PrimitiveDateTime = datetime!(2000-01-01 00:00:00);

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");
const TIME_IN: &[FormatItem<'_>] =
    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]");
const TIME_OUT: &[FormatItem<'_>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:6]");
const TIMESTAMP_IN: &[FormatItem<'_>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);
const TIMESTAMP_OUT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");
const TIMESTAMPTZ_IN: &[FormatItem<'_>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory][optional [:[offset_minute]]][optional [:[offset_second]]]"
);
const TIMESTAMPTZ_OUT: &[FormatItem<'_>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6][offset_hour sign:mandatory]:[offset_minute]"
);

fn read_micros(bytes: &[u8], type_name: &'static str) -> Result<i64> {
    Ok(i64::from_be_bytes(read_fixed(bytes, type_name)?))
}

fn micros_since_epoch(ts: PrimitiveDateTime) -> Result<i64> {
    i64::try_from((ts - PG_EPOCH).whole_microseconds())
        .map_err(|_| Error::overflow("timestamp", "INT8"))
}

fn from_micros_since_epoch(usecs: i64) -> Result<PrimitiveDateTime> {
    PG_EPOCH
        .checked_add(Duration::microseconds(usecs))
        .ok_or_else(|| Error::overflow("timestamp", "PrimitiveDateTime"))
}

fn write_formatted(
    value: impl FnOnce(&mut Vec<u8>) -> std::result::Result<usize, time::error::Format>,
    type_name: &'static str,
    buf: &mut Vec<u8>,
) -> Result<()> {
    value(buf)
        .map(|_| ())
        .map_err(|e| Error::malformed(type_name, e.to_string()))
}

// === Date ===

impl FromWireValue<'_> for Date {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::DATE {
            return Err(Error::type_mismatch("Date", oid));
        }
        Date::parse(utf8(bytes, "date")?.trim(), DATE_FORMAT)
            .map_err(|e| Error::malformed("date", e.to_string()))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::DATE {
            return Err(Error::type_mismatch("Date", oid));
        }
        let pg_days = i32::from_be_bytes(read_fixed(bytes, "date")?);
        pg_days
            .checked_add(PG_EPOCH_JULIAN_DAY)
            .and_then(|day| Date::from_julian_day(day).ok())
            .ok_or_else(|| Error::overflow("date", "Date"))
    }
}

impl ToWireValue for Date {
    fn natural_oid(&self) -> Oid {
        oid::DATE
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::DATE {
            return Err(Error::type_mismatch("Date", target_oid));
        }
        write_formatted(|out| self.format_into(out, DATE_FORMAT), "date", buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::DATE {
            return Err(Error::type_mismatch("Date", target_oid));
        }
        let pg_days = self.to_julian_day() - PG_EPOCH_JULIAN_DAY;
        buf.extend_from_slice(&pg_days.to_be_bytes());
        Ok(())
    }
}

// === Time ===

impl FromWireValue<'_> for Time {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIME {
            return Err(Error::type_mismatch("Time", oid));
        }
        Time::parse(utf8(bytes, "time")?.trim(), TIME_IN)
            .map_err(|e| Error::malformed("time", e.to_string()))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIME {
            return Err(Error::type_mismatch("Time", oid));
        }
        let usecs = read_micros(bytes, "time")?;
        // 24:00:00 is valid in PostgreSQL but not representable here
        if !(0..86_400_000_000).contains(&usecs) {
            return Err(Error::overflow("time", "Time"));
        }
        Ok(Time::MIDNIGHT + Duration::microseconds(usecs))
    }
}

impl ToWireValue for Time {
    fn natural_oid(&self) -> Oid {
        oid::TIME
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::TIME {
            return Err(Error::type_mismatch("Time", target_oid));
        }
        write_formatted(|out| self.format_into(out, TIME_OUT), "time", buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::TIME {
            return Err(Error::type_mismatch("Time", target_oid));
        }
        let usecs = (*self - Time::MIDNIGHT).whole_microseconds();
        let usecs = i64::try_from(usecs).map_err(|_| Error::overflow("time", "INT8"))?;
        buf.extend_from_slice(&usecs.to_be_bytes());
        Ok(())
    }
}

// === Timestamp ===

impl FromWireValue<'_> for PrimitiveDateTime {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMP {
            return Err(Error::type_mismatch("PrimitiveDateTime", oid));
        }
        PrimitiveDateTime::parse(utf8(bytes, "timestamp")?.trim(), TIMESTAMP_IN)
            .map_err(|e| Error::malformed("timestamp", e.to_string()))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMP {
            return Err(Error::type_mismatch("PrimitiveDateTime", oid));
        }
        from_micros_since_epoch(read_micros(bytes, "timestamp")?)
    }
}

impl ToWireValue for PrimitiveDateTime {
    fn natural_oid(&self) -> Oid {
        oid::TIMESTAMP
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::TIMESTAMP {
            return Err(Error::type_mismatch("PrimitiveDateTime", target_oid));
        }
        write_formatted(|out| self.format_into(out, TIMESTAMP_OUT), "timestamp", buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::TIMESTAMP {
            return Err(Error::type_mismatch("PrimitiveDateTime", target_oid));
        }
        buf.extend_from_slice(&micros_since_epoch(*self)?.to_be_bytes());
        Ok(())
    }
}

// === Timestamptz ===

impl FromWireValue<'_> for OffsetDateTime {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMPTZ {
            return Err(Error::type_mismatch("OffsetDateTime", oid));
        }
        OffsetDateTime::parse(utf8(bytes, "timestamptz")?.trim(), TIMESTAMPTZ_IN)
            .map_err(|e| Error::malformed("timestamptz", e.to_string()))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::TIMESTAMPTZ {
            return Err(Error::type_mismatch("OffsetDateTime", oid));
        }
        // PostgreSQL stores TIMESTAMPTZ as UTC microseconds since 2000-01-01 00:00:00 UTC
        from_micros_since_epoch(read_micros(bytes, "timestamptz")?).map(PrimitiveDateTime::assume_utc)
    }
}

impl ToWireValue for OffsetDateTime {
    fn natural_oid(&self) -> Oid {
        oid::TIMESTAMPTZ
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::TIMESTAMPTZ {
            return Err(Error::type_mismatch("OffsetDateTime", target_oid));
        }
        write_formatted(|out| self.format_into(out, TIMESTAMPTZ_OUT), "timestamptz", buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::TIMESTAMPTZ {
            return Err(Error::type_mismatch("OffsetDateTime", target_oid));
        }
        let utc = self.to_offset(UtcOffset::UTC);
        let usecs = micros_since_epoch(PrimitiveDateTime::new(utc.date(), utc.time()))?;
        buf.extend_from_slice(&usecs.to_be_bytes());
        Ok(())
    }
}

macro_rules! impl_native_time {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl NativeType for $ty {
                const KIND: ValueKind = ValueKind::$variant;

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(kind_mismatch::<Self>(&other)),
                    }
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )+
    };
}

impl_native_time! {
    Date => Date,
    Time => Time,
    PrimitiveDateTime => Timestamp,
    OffsetDateTime => Timestamptz,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, offset, time};

    fn text_of<T: ToWireValue>(v: &T, oid: Oid) -> String {
        let mut buf = Vec::new();
        v.to_text(oid, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_date_text() {
        let d = Date::from_text(oid::DATE, b"2024-01-15").unwrap();
        assert_eq!(d, date!(2024 - 01 - 15));
        assert_eq!(text_of(&d, oid::DATE), "2024-01-15");
    }

    #[test]
    fn test_date_binary() {
        // 2024-01-15 is 8780 days since 2000-01-01
        let d = Date::from_binary(oid::DATE, &8780_i32.to_be_bytes()).unwrap();
        assert_eq!(d, date!(2024 - 01 - 15));
        let mut buf = Vec::new();
        d.to_binary(oid::DATE, &mut buf).unwrap();
        assert_eq!(buf, 8780_i32.to_be_bytes());
    }

    #[test]
    fn test_date_infinity_rejected() {
        assert!(Date::from_binary(oid::DATE, &i32::MAX.to_be_bytes()).is_err());
    }

    #[test]
    fn test_time_text() {
        assert_eq!(Time::from_text(oid::TIME, b"10:30:45").unwrap(), time!(10:30:45));
        let t = Time::from_text(oid::TIME, b"10:30:45.123456").unwrap();
        assert_eq!(t.microsecond(), 123456);
        assert_eq!(text_of(&t, oid::TIME), "10:30:45.123456");
    }

    #[test]
    fn test_time_binary() {
        // 10:30:45 = (10*3600 + 30*60 + 45) * 1_000_000 microseconds
        let usecs: i64 = (10 * 3600 + 30 * 60 + 45) * 1_000_000;
        let t = Time::from_binary(oid::TIME, &usecs.to_be_bytes()).unwrap();
        assert_eq!(t, time!(10:30:45));
        let mut buf = Vec::new();
        t.to_binary(oid::TIME, &mut buf).unwrap();
        assert_eq!(buf, usecs.to_be_bytes());
    }

    #[test]
    fn test_timestamp_binary() {
        let day_usecs: i64 = 8780 * 24 * 3600 * 1_000_000;
        let time_usecs: i64 = (10 * 3600 + 30 * 60 + 45) * 1_000_000;
        let ts =
            PrimitiveDateTime::from_binary(oid::TIMESTAMP, &(day_usecs + time_usecs).to_be_bytes())
                .unwrap();
        assert_eq!(ts, datetime!(2024-01-15 10:30:45));
    }

    #[test]
    fn test_timestamp_text() {
        let ts = PrimitiveDateTime::from_text(oid::TIMESTAMP, b"2024-01-15 10:30:45.5").unwrap();
        assert_eq!(ts, datetime!(2024-01-15 10:30:45.5));
        assert_eq!(text_of(&ts, oid::TIMESTAMP), "2024-01-15 10:30:45.500000");
    }

    #[test]
    fn test_timestamp_before_epoch() {
        let ts = datetime!(1970-01-01 00:00:00);
        let mut buf = Vec::new();
        ts.to_binary(oid::TIMESTAMP, &mut buf).unwrap();
        assert!(i64::from_be_bytes(buf.clone().try_into().unwrap()) < 0);
        assert_eq!(PrimitiveDateTime::from_binary(oid::TIMESTAMP, &buf).unwrap(), ts);
    }

    #[test]
    fn test_timestamptz_text() {
        let ts = OffsetDateTime::from_text(oid::TIMESTAMPTZ, b"2024-01-15 10:30:45+00").unwrap();
        assert_eq!(ts, datetime!(2024-01-15 10:30:45 UTC));
        let ts =
            OffsetDateTime::from_text(oid::TIMESTAMPTZ, b"2024-01-15 10:30:45.25+05:30").unwrap();
        assert_eq!(ts.offset(), offset!(+5:30));
        assert_eq!(
            text_of(&ts, oid::TIMESTAMPTZ),
            "2024-01-15 10:30:45.250000+05:30"
        );
    }

    #[test]
    fn test_timestamptz_binary_is_utc() {
        let ts = datetime!(2024-01-15 10:30:45 +02:00);
        let mut buf = Vec::new();
        ts.to_binary(oid::TIMESTAMPTZ, &mut buf).unwrap();
        let back = OffsetDateTime::from_binary(oid::TIMESTAMPTZ, &buf).unwrap();
        assert_eq!(back, ts);
        assert_eq!(back.offset(), UtcOffset::UTC);
    }
}
