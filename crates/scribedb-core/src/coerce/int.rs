use super::{CoerceError, Coerced, SqlMode, Warning};
use crate::{
    model::{ColumnType, IntWidth},
    value::{Literal, Value},
};
use num_traits::ToPrimitive;

///
/// ParsedInt
/// Outcome of reading a string as a base-10 integer.
///

enum ParsedInt {
    /// The whole (trimmed) string was a number.
    Exact(i128),
    /// Only a leading prefix was numeric; the rest would be discarded.
    Prefix(i128),
}

pub(super) fn coerce_int(
    column: &str,
    ty: ColumnType,
    width: IntWidth,
    unsigned: bool,
    input: &Literal,
    mode: SqlMode,
) -> Result<Coerced, CoerceError> {
    let (wide, mut warning) = match input {
        Literal::Null => return Ok(Coerced::exact(Value::Null)),
        Literal::Int(v) => (i128::from(*v), None),
        Literal::Uint(v) => (i128::from(*v), None),
        Literal::Float(v) => (round_float(column, *v)?, None),
        Literal::Str(s) => match parse_int_str(s) {
            ParsedInt::Exact(v) => (v, None),
            ParsedInt::Prefix(v) => {
                if mode.strict {
                    return Err(CoerceError::TruncatedWrongValueForField {
                        column: column.to_string(),
                        ty: ty.to_string(),
                        value: s.clone(),
                    });
                }
                let warning = Warning::new(
                    column,
                    format!("Truncated incorrect integer value: '{s}'"),
                );
                (v, Some(warning))
            }
        },
    };

    let (min, max) = bounds(width, unsigned);
    let clamped = wide.clamp(min, max);
    if clamped != wide {
        if mode.strict {
            return Err(CoerceError::DataOutOfRange {
                column: column.to_string(),
                value: input.to_string(),
            });
        }
        warning = Some(Warning::new(
            column,
            format!("Out of range value {input} clamped to {clamped}"),
        ));
    }

    let value = if unsigned {
        Value::Uint(u64::try_from(clamped).unwrap_or(u64::MAX))
    } else {
        Value::Int(i64::try_from(clamped).unwrap_or(i64::MAX))
    };

    Ok(match warning {
        Some(warning) => Coerced::lossy(value, warning),
        None => Coerced::exact(value),
    })
}

fn bounds(width: IntWidth, unsigned: bool) -> (i128, i128) {
    if unsigned {
        (0, i128::from(width.unsigned_max()))
    } else {
        let (min, max) = width.signed_bounds();
        (i128::from(min), i128::from(max))
    }
}

// Round half away from zero; non-finite floats are never representable.
fn round_float(column: &str, v: f64) -> Result<i128, CoerceError> {
    v.round().to_i128().ok_or_else(|| CoerceError::DataOutOfRange {
        column: column.to_string(),
        value: v.to_string(),
    })
}

// Reads `[ws][+-]digits[.digits][e[+-]digits][ws]`. Anything else keeps only
// the leading integer part (or 0 when there is none).
fn parse_int_str(s: &str) -> ParsedInt {
    let trimmed = s.trim();

    if let Ok(v) = trimmed.parse::<i128>() {
        return ParsedInt::Exact(v);
    }

    // Too many digits for i128, or decimal/exponent syntax.
    if is_numeric_literal(trimmed) {
        if let Some(v) = trimmed.parse::<f64>().ok().and_then(|f| f.round().to_i128()) {
            return ParsedInt::Exact(v);
        }
        let negative = trimmed.starts_with('-');
        return ParsedInt::Exact(if negative { i128::MIN } else { i128::MAX });
    }

    ParsedInt::Prefix(leading_integer(trimmed))
}

fn is_numeric_literal(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };

    let mut parts = mantissa.splitn(2, '.');
    let int_part = parts.next().unwrap_or_default();
    let frac_part = parts.next();

    let int_ok = int_part.bytes().all(|b| b.is_ascii_digit());
    let frac_ok = frac_part.is_none_or(|f| f.bytes().all(|b| b.is_ascii_digit()));
    let has_digits = !int_part.is_empty() || frac_part.is_some_and(|f| !f.is_empty());

    let exp_ok = exponent.is_none_or(|e| {
        let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    });

    int_ok && frac_ok && has_digits && exp_ok
}

fn leading_integer(s: &str) -> i128 {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut acc: i128 = 0;
    for b in body.bytes().take_while(u8::is_ascii_digit) {
        acc = acc.saturating_mul(10).saturating_add(i128::from(b - b'0'));
    }

    if negative { -acc } else { acc }
}

///
/// TESTS
///
