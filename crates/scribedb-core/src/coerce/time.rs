use super::{CoerceError, Coerced};
use crate::{
    model::ColumnType,
    value::{Literal, Value},
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const TIMESTAMP_MIN_SECS: i64 = 1;
const TIMESTAMP_MAX_SECS: i64 = i32::MAX as i64;
const DATETIME_MIN_YEAR: i32 = 1000;
const DATETIME_MAX_YEAR: i32 = 9999;

pub(super) fn coerce_datetime(
    column: &str,
    ty: ColumnType,
    input: &Literal,
) -> Result<Coerced, CoerceError> {
    let fail = |value: String, reason: &'static str| CoerceError::TimeParse {
        column: column.to_string(),
        ty: ty.to_string(),
        value,
        reason,
    };

    let text = match input {
        Literal::Null => return Ok(Coerced::exact(Value::Null)),
        Literal::Str(s) => s.clone(),
        Literal::Int(v) if *v >= 0 => v.to_string(),
        Literal::Uint(v) => v.to_string(),
        other => return Err(fail(other.to_string(), "not a date-time literal")),
    };

    let dt = parse_datetime(&text).map_err(|reason| fail(text.clone(), reason))?;

    match ty {
        ColumnType::Timestamp => {
            let secs = dt.and_utc().timestamp();
            if !(TIMESTAMP_MIN_SECS..=TIMESTAMP_MAX_SECS).contains(&secs) {
                return Err(fail(text, "outside the TIMESTAMP range"));
            }
        }
        _ => {
            let year = chrono::Datelike::year(&dt);
            if !(DATETIME_MIN_YEAR..=DATETIME_MAX_YEAR).contains(&year) {
                return Err(fail(text, "outside the DATETIME range"));
            }
        }
    }

    Ok(Coerced::exact(Value::DateTime(dt)))
}

/// Parse a date-time literal.
///
/// Accepted shapes:
/// - `YYYY-MM-DD[( |T)HH[:MM[:SS[.fraction]]]]`, missing time fields are zero;
/// - compact `YYYYMMDD` or `YYYYMMDDHHMMSS`.
///
/// Fractional seconds are discarded. Calendar-invalid components fail.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, &'static str> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty date-time literal");
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return parse_compact(s);
    }

    let (date_part, time_part) = match s.find([' ', 'T']) {
        Some(pos) => (&s[..pos], Some(s[pos + 1..].trim_start())),
        None => (s, None),
    };

    let date = parse_date(date_part)?;
    let time = match time_part {
        Some(t) if !t.is_empty() => parse_time(t)?,
        _ => NaiveTime::MIN,
    };

    Ok(date.and_time(time))
}

fn parse_compact(s: &str) -> Result<NaiveDateTime, &'static str> {
    let field = |range: std::ops::Range<usize>| -> Result<u32, &'static str> {
        s[range].parse::<u32>().map_err(|_| "malformed numeric date-time")
    };

    let has_time = match s.len() {
        8 => false,
        14 => true,
        _ => return Err("numeric date-time must have 8 or 14 digits"),
    };

    let year = i32::try_from(field(0..4)?).map_err(|_| "year out of range")?;
    let date = NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)
        .ok_or("calendar date out of range")?;

    let time = if has_time {
        NaiveTime::from_hms_opt(field(8..10)?, field(10..12)?, field(12..14)?)
            .ok_or("time of day out of range")?
    } else {
        NaiveTime::MIN
    };

    Ok(date.and_time(time))
}

fn parse_date(s: &str) -> Result<NaiveDate, &'static str> {
    let mut parts = s.split('-');
    let (Some(y), Some(m), Some(d), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err("date must be YYYY-MM-DD");
    };

    let year = parse_component(y, 4)?;
    let month = parse_component(m, 2)?;
    let day = parse_component(d, 2)?;
    let year = i32::try_from(year).map_err(|_| "year out of range")?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or("calendar date out of range")
}

fn parse_time(s: &str) -> Result<NaiveTime, &'static str> {
    // Fractional seconds are accepted and dropped.
    let whole = match s.split_once('.') {
        Some((whole, frac)) => {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err("malformed fractional seconds");
            }
            whole
        }
        None => s,
    };

    let mut fields = [0u32; 3];
    let mut count = 0usize;
    for part in whole.split(':') {
        if count == fields.len() {
            return Err("time must be HH[:MM[:SS]]");
        }
        fields[count] = parse_component(part, 2)?;
        count += 1;
    }

    NaiveTime::from_hms_opt(fields[0], fields[1], fields[2]).ok_or("time of day out of range")
}

fn parse_component(s: &str, max_digits: usize) -> Result<u32, &'static str> {
    if s.is_empty() || s.len() > max_digits || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err("malformed date-time component");
    }

    s.parse::<u32>().map_err(|_| "malformed date-time component")
}
