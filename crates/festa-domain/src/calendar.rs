//! Jalali (Solar Hijri) calendar conversion
//!
//! Contest announcements usually publish the deadline in the Jalali calendar.
//! Records keep both forms, so conversion has to be exact in both directions.
//! The arithmetic works on Julian Day Numbers and uses the 33-year break table
//! of the astronomical Jalali calendar, valid for years -61..3177.

use chrono::{Datelike, NaiveDate};
use std::fmt;

use crate::text::to_western_digits;

const BREAKS: [i64; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

/// A validated Jalali calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JalaliDate {
    year: i32,
    month: u32,
    day: u32,
}

impl JalaliDate {
    /// Create a date, validating month and day against the year's leap status
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, String> {
        let y = i64::from(year);
        if y < BREAKS[0] || y >= BREAKS[BREAKS.len() - 1] {
            return Err(format!("Jalali year {} is out of range", year));
        }
        if !(1..=12).contains(&month) {
            return Err(format!("Jalali month {} is out of range", month));
        }
        let max_day = month_length(year, month);
        if day == 0 || day > max_day {
            return Err(format!(
                "Jalali day {} is out of range for {}/{:02} (max {})",
                day, year, month, max_day
            ));
        }
        Ok(Self { year, month, day })
    }

    /// Parse `YYYY/MM/DD` (also `-` or `.` separated, Persian digits accepted)
    pub fn parse(input: &str) -> Result<Self, String> {
        let (y, m, d) = split_ymd(input)?;
        Self::new(y, m, d)
    }

    /// Year component
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-12)
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Day component
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Convert to the Gregorian calendar
    pub fn to_gregorian(&self) -> Result<NaiveDate, String> {
        let jdn = j2d(
            i64::from(self.year),
            i64::from(self.month),
            i64::from(self.day),
        )?;
        let (gy, gm, gd) = d2g(jdn);
        NaiveDate::from_ymd_opt(gy as i32, gm as u32, gd as u32)
            .ok_or_else(|| format!("No Gregorian date for Jalali {}", self))
    }

    /// Convert a Gregorian date into the Jalali calendar
    pub fn from_gregorian(date: NaiveDate) -> Result<Self, String> {
        let jdn = g2d(
            i64::from(date.year()),
            i64::from(date.month()),
            i64::from(date.day()),
        );
        let (jy, jm, jd) = d2j(jdn)?;
        Self::new(jy as i32, jm as u32, jd as u32)
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

/// Whether a Jalali year has 30 days in Esfand
pub fn is_leap_year(year: i32) -> bool {
    matches!(jal_cal(i64::from(year)), Ok(c) if c.leap == 0)
}

/// Number of days in a Jalali month
pub fn month_length(year: i32, month: u32) -> u32 {
    match month {
        1..=6 => 31,
        7..=11 => 30,
        _ if is_leap_year(year) => 30,
        _ => 29,
    }
}

/// Parse a strict `YYYY-MM-DD` Gregorian date (Persian digits accepted)
pub fn parse_gregorian(input: &str) -> Result<NaiveDate, String> {
    let normalized = to_western_digits(input.trim());
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .map_err(|e| format!("Invalid Gregorian date '{}': {}", input.trim(), e))
}

/// Format a Gregorian date as `YYYY-MM-DD`
pub fn format_gregorian(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Derive the Gregorian `YYYY-MM-DD` string for a Jalali `YYYY/MM/DD` string
pub fn persian_to_gregorian(persian: &str) -> Result<String, String> {
    let date = JalaliDate::parse(persian)?;
    date.to_gregorian().map(format_gregorian)
}

/// Derive the Jalali `YYYY/MM/DD` string for a Gregorian `YYYY-MM-DD` string
pub fn gregorian_to_persian(gregorian: &str) -> Result<String, String> {
    let date = parse_gregorian(gregorian)?;
    JalaliDate::from_gregorian(date).map(|d| d.to_string())
}

fn split_ymd(input: &str) -> Result<(i32, u32, u32), String> {
    let normalized = to_western_digits(input.trim());
    let parts: Vec<&str> = normalized
        .split(['/', '-', '.'])
        .map(str::trim)
        .collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(format!("Invalid date format '{}'", input.trim()));
    }
    let year = parts[0]
        .parse::<i32>()
        .map_err(|_| format!("Invalid year in '{}'", input.trim()))?;
    let month = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("Invalid month in '{}'", input.trim()))?;
    let day = parts[2]
        .parse::<u32>()
        .map_err(|_| format!("Invalid day in '{}'", input.trim()))?;
    Ok((year, month, day))
}

struct JalCal {
    leap: i64,
    gy: i64,
    march: i64,
}

fn jal_cal(jy: i64) -> Result<JalCal, String> {
    let gy = jy + 621;
    let mut leap_j = -14;
    let mut jp = BREAKS[0];
    if jy < jp || jy >= BREAKS[BREAKS.len() - 1] {
        return Err(format!("Jalali year {} is out of range", jy));
    }

    let mut jump = 0;
    for &jm in BREAKS.iter().skip(1) {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += jump / 33 * 8 + (jump % 33) / 4;
        jp = jm;
    }
    let mut n = jy - jp;

    leap_j += n / 33 * 8 + ((n % 33) + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }

    let leap_g = gy / 4 - (gy / 100 + 1) * 3 / 4 - 150;
    let march = 20 + leap_j - leap_g;

    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = (((n + 1) % 33) - 1) % 4;
    if leap == -1 {
        leap = 4;
    }

    Ok(JalCal { leap, gy, march })
}

fn j2d(jy: i64, jm: i64, jd: i64) -> Result<i64, String> {
    let cal = jal_cal(jy)?;
    Ok(g2d(cal.gy, 3, cal.march) + (jm - 1) * 31 - jm / 7 * (jm - 7) + jd - 1)
}

fn d2j(jdn: i64) -> Result<(i64, i64, i64), String> {
    let gy = d2g(jdn).0;
    let mut jy = gy - 621;
    let cal = jal_cal(jy)?;
    let jdn1f = g2d(gy, 3, cal.march);

    let mut k = jdn - jdn1f;
    if k >= 0 {
        if k <= 185 {
            return Ok((jy, 1 + k / 31, k % 31 + 1));
        }
        k -= 186;
    } else {
        jy -= 1;
        k += 179;
        if cal.leap == 1 {
            k += 1;
        }
    }
    Ok((jy, 7 + k / 30, k % 30 + 1))
}

fn g2d(gy: i64, gm: i64, gd: i64) -> i64 {
    let d = (gy + (gm - 8) / 6 + 100100) * 1461 / 4 + (153 * ((gm + 9) % 12) + 2) / 5 + gd
        - 34840408;
    d - (gy + 100100 + (gm - 8) / 6) / 100 * 3 / 4 + 752
}

fn d2g(jdn: i64) -> (i64, i64, i64) {
    let mut j = 4 * jdn + 139361631;
    j += (4 * jdn + 183187720) / 146097 * 3 / 4 * 4 - 3908;
    let i = (j % 1461) / 4 * 5 + 308;
    let gd = (i % 153) / 5 + 1;
    let gm = (i / 153) % 12 + 1;
    let gy = j / 1461 - 100100 + (8 - gm) / 6;
    (gy, gm, gd)
}
