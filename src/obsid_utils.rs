/*!
 * Observation id and HERA file name utilities.
 *
 * Librarian obsids are start times expressed as integer GPS seconds. GPS
 * time runs ahead of UTC by the leap seconds inserted since 1980, so every
 * conversion between the two goes through `LEAP_SECOND_DATES`.
 *
 * HERA data files are named like `zen.2457754.50000.xx.HH.uv`: the start
 * Julian date and the polarization can be read back out of the name.
 */

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::models::TIMESTAMP_FORMAT;
use crate::errors::ObsidError;

/// Julian date of 1970-01-01 00:00:00 UTC
pub const UNIX_EPOCH_JD: f64 = 2440587.5;

/// Unix time of the GPS epoch, 1980-01-06 00:00:00 UTC
pub const GPS_EPOCH_UNIX: i64 = 315_964_800;

const SECONDS_PER_DAY: f64 = 86400.0;

/// First UTC days after each leap second since the GPS epoch
const LEAP_SECOND_DATES: [(i32, u32); 18] = [
    (1981, 7),
    (1982, 7),
    (1983, 7),
    (1985, 7),
    (1988, 1),
    (1990, 1),
    (1991, 1),
    (1992, 7),
    (1993, 7),
    (1994, 7),
    (1996, 1),
    (1997, 7),
    (1999, 1),
    (2006, 1),
    (2009, 1),
    (2012, 7),
    (2015, 7),
    (2017, 1),
];

static LEAP_SECONDS_UNIX: Lazy<Vec<i64>> = Lazy::new(|| {
    LEAP_SECOND_DATES
        .iter()
        .filter_map(|&(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
        .filter_map(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc().timestamp())
        .collect()
});

static START_JD_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\d+\.\d+"));

static POL_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\.([xy][xy])\."));

fn pattern(
    lazy: &'static Lazy<Result<Regex, regex::Error>>,
) -> Result<&'static Regex, ObsidError> {
    Lazy::force(lazy)
        .as_ref()
        .map_err(|e| ObsidError::Pattern(e.to_string()))
}

/// Seconds GPS time is ahead of UTC at the given Unix time
fn gps_minus_utc(unix: i64) -> i64 {
    LEAP_SECONDS_UNIX.iter().filter(|&&t| t <= unix).count() as i64
}

/// Convert a Julian date (UTC) to a timestamp, to microsecond precision
pub fn julian_date_to_utc(jd: f64) -> Result<DateTime<Utc>, ObsidError> {
    let micros = ((jd - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1e6).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return Err(ObsidError::OutOfRange(format!("JD {}", jd)));
    }

    DateTime::from_timestamp_micros(micros as i64)
        .ok_or_else(|| ObsidError::OutOfRange(format!("JD {}", jd)))
}

/// Convert a UTC timestamp to a Julian date
pub fn utc_to_julian_date(time: &DateTime<Utc>) -> f64 {
    time.timestamp_micros() as f64 / 1e6 / SECONDS_PER_DAY + UNIX_EPOCH_JD
}

/// Obsid (whole GPS seconds) of the instant `time`
pub fn obsid_from_utc(time: &DateTime<Utc>) -> Result<i64, ObsidError> {
    let unix = time.timestamp();
    let obsid = unix - GPS_EPOCH_UNIX + gps_minus_utc(unix);
    if obsid <= 0 {
        return Err(ObsidError::OutOfRange(format!(
            "{} is not after the GPS epoch",
            time
        )));
    }
    Ok(obsid)
}

/// Obsid of the instant given as a Julian date, rounded down to the second
pub fn obsid_from_julian_date(jd: f64) -> Result<i64, ObsidError> {
    obsid_from_utc(&julian_date_to_utc(jd)?)
}

/// UTC instant an obsid stands for
///
/// A leap second itself maps onto the following second.
pub fn obsid_to_utc(obsid: i64) -> Result<DateTime<Utc>, ObsidError> {
    let out_of_range = || ObsidError::OutOfRange(format!("obsid {}", obsid));
    if obsid <= 0 {
        return Err(out_of_range());
    }

    let uncorrected = obsid.checked_add(GPS_EPOCH_UNIX).ok_or_else(out_of_range)?;
    let first_guess = uncorrected - gps_minus_utc(uncorrected);
    let unix = uncorrected - gps_minus_utc(first_guess);

    DateTime::from_timestamp(unix, 0).ok_or_else(out_of_range)
}

/// Format an obsid as a UTC calendar date, e.g. `2017-01-01`
pub fn format_obsid_as_calendar_date(obsid: i64) -> Result<String, ObsidError> {
    Ok(obsid_to_utc(obsid)?.format("%Y-%m-%d").to_string())
}

/// Format a Julian date as a UTC calendar date, e.g. `2017-01-01`
pub fn format_jd_as_calendar_date(jd: f64) -> Result<String, ObsidError> {
    Ok(julian_date_to_utc(jd)?.format("%Y-%m-%d").to_string())
}

/// Format a Julian date as `YYYY-MM-DD HH:MM:SS`, sub-seconds truncated
pub fn format_jd_as_iso_date_time(jd: f64) -> Result<String, ObsidError> {
    Ok(julian_date_to_utc(jd)?.format(TIMESTAMP_FORMAT).to_string())
}

/// Start Julian date embedded in a HERA file name or path
///
/// The first `<digits>.<digits>` run is taken as the date.
pub fn start_jd_from_path(path: &str) -> Result<f64, ObsidError> {
    let found = pattern(&START_JD_PATTERN)?
        .find(path)
        .ok_or_else(|| unrecognized(path, "no Julian date in the name"))?;

    found
        .as_str()
        .parse::<f64>()
        .map_err(|e| unrecognized(path, &e.to_string()))
}

/// Polarization embedded in a HERA file name or path, e.g. `xx`
pub fn pol_from_path(path: &str) -> Result<String, ObsidError> {
    pattern(&POL_PATTERN)?
        .captures(path)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| unrecognized(path, "no polarization in the name"))
}

/// Obsid of the start date embedded in a HERA file name or path
pub fn obsid_from_path(path: &str) -> Result<i64, ObsidError> {
    obsid_from_julian_date(start_jd_from_path(path)?)
}

fn unrecognized(name: &str, reason: &str) -> ObsidError {
    ObsidError::UnrecognizedName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
