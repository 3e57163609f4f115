// Packed FAT date/time codec
//
// date: bits 15-9 year since 1980 (7 bits), bits 8-5 month (4 bits), bits 4-0 day (5 bits)
// time: bits 15-11 hour (5 bits), bits 10-5 minute (6 bits), bits 4-0 seconds/2 (5 bits)
// The creation "tenth" byte carries 10 ms units, 0-199, covering the odd second.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use std::time::SystemTime;

pub const FAT_EPOCH_YEAR: i32 = 1980;
pub const FAT_MAX_YEAR: i32 = 2107;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatDate(pub u16);

impl FatDate {
    const YEAR_SHIFT: u16 = 9;
    const YEAR_MASK: u16 = 0x7F;
    const MONTH_SHIFT: u16 = 5;
    const MONTH_MASK: u16 = 0x0F;
    const DAY_MASK: u16 = 0x1F;

    /// Pack a calendar date; `None` outside 1980-2107 or for out-of-range fields
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(FAT_EPOCH_YEAR..=FAT_MAX_YEAR).contains(&year)
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
        {
            return None;
        }
        let years = (year - FAT_EPOCH_YEAR) as u16;
        Some(Self(
            (years << Self::YEAR_SHIFT) | ((month as u16) << Self::MONTH_SHIFT) | day as u16,
        ))
    }

    pub fn year(self) -> i32 {
        ((self.0 >> Self::YEAR_SHIFT) & Self::YEAR_MASK) as i32 + FAT_EPOCH_YEAR
    }

    pub fn month(self) -> u32 {
        ((self.0 >> Self::MONTH_SHIFT) & Self::MONTH_MASK) as u32
    }

    pub fn day(self) -> u32 {
        (self.0 & Self::DAY_MASK) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTime(pub u16);

impl FatTime {
    const HOUR_SHIFT: u16 = 11;
    const HOUR_MASK: u16 = 0x1F;
    const MINUTE_SHIFT: u16 = 5;
    const MINUTE_MASK: u16 = 0x3F;
    const SECONDS_MASK: u16 = 0x1F;

    /// Pack a time of day; odd seconds round down to the 2-second resolution
    pub fn new(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Self(
            ((hour as u16) << Self::HOUR_SHIFT)
                | ((minute as u16) << Self::MINUTE_SHIFT)
                | (second / 2) as u16,
        ))
    }

    pub fn hour(self) -> u32 {
        ((self.0 >> Self::HOUR_SHIFT) & Self::HOUR_MASK) as u32
    }

    pub fn minute(self) -> u32 {
        ((self.0 >> Self::MINUTE_SHIFT) & Self::MINUTE_MASK) as u32
    }

    pub fn second(self) -> u32 {
        ((self.0 & Self::SECONDS_MASK) * 2) as u32
    }
}

/// A full FAT timestamp as stored in the creation fields of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTimestamp {
    pub date: FatDate,
    pub time: FatTime,
    pub tenths: u8,
}

impl FatTimestamp {
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        Self::from_datetime(&DateTime::<Utc>::from(time))
    }

    /// Encode a UTC instant, clamping to the representable 1980-2107 range
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        if dt.year() < FAT_EPOCH_YEAR {
            return Self {
                date: FatDate::new(FAT_EPOCH_YEAR, 1, 1).unwrap_or_default(),
                time: FatTime(0),
                tenths: 0,
            };
        }
        if dt.year() > FAT_MAX_YEAR {
            return Self {
                date: FatDate::new(FAT_MAX_YEAR, 12, 31).unwrap_or_default(),
                time: FatTime::new(23, 59, 58).unwrap_or_default(),
                tenths: 0,
            };
        }

        let date = FatDate::new(dt.year(), dt.month(), dt.day()).unwrap_or_default();
        let time = FatTime::new(dt.hour(), dt.minute(), dt.second()).unwrap_or_default();
        let centis = (dt.timestamp_subsec_nanos().min(999_999_999) / 10_000_000) as u8;
        Self {
            date,
            time,
            tenths: (dt.second() % 2) as u8 * 100 + centis,
        }
    }

    /// Decode into a UTC instant; `None` if the fields do not form a valid date
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let naive = NaiveDate::from_ymd_opt(self.date.year(), self.date.month(), self.date.day())?
            .and_hms_milli_opt(
                self.time.hour(),
                self.time.minute(),
                self.time.second() + (self.tenths / 100) as u32,
                (self.tenths % 100) as u32 * 10,
            )?;
        Some(Utc.from_utc_datetime(&naive))
    }
}

/// Convert FAT date/time fields to a Unix timestamp (0 for invalid fields)
pub fn fat_datetime_to_unix(date: u16, time: u16) -> u64 {
    FatTimestamp { date: FatDate(date), time: FatTime(time), tenths: 0 }
        .to_datetime()
        .map(|dt| dt.timestamp().max(0) as u64)
        .unwrap_or(0)
}

/// Convert a Unix timestamp to FAT `(date, time)` fields
pub fn unix_to_fat_datetime(timestamp: u64) -> (u16, u16) {
    let ts = Utc
        .timestamp_opt(timestamp as i64, 0)
        .single()
        .map(|dt| FatTimestamp::from_datetime(&dt))
        .unwrap_or_default();
    (ts.date.0, ts.time.0)
}
