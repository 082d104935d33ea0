use super::{CoerceError, Coerced, SqlMode, Warning};
use crate::value::{Literal, Value};

/// Render any non-NULL literal as the text it would be stored as.
pub(super) fn literal_text(input: &Literal) -> String {
    match input {
        Literal::Null => String::new(),
        Literal::Int(v) => v.to_string(),
        Literal::Uint(v) => v.to_string(),
        Literal::Float(v) => v.to_string(),
        Literal::Str(s) => s.clone(),
    }
}

// CHAR(n) / VARCHAR(n): limit counted in characters.
pub(super) fn coerce_chars(
    column: &str,
    max_chars: usize,
    input: &Literal,
    mode: SqlMode,
) -> Result<Coerced, CoerceError> {
    let text = literal_text(input);
    let len = text.chars().count();
    if len <= max_chars {
        return Ok(Coerced::exact(Value::Text(text)));
    }

    if mode.strict {
        return Err(CoerceError::DataTooLong {
            column: column.to_string(),
            len,
            max: max_chars,
        });
    }

    let truncated: String = text.chars().take(max_chars).collect();
    Ok(Coerced::lossy(
        Value::Text(truncated),
        Warning::new(
            column,
            format!("Data truncated to {max_chars} characters (was {len})"),
        ),
    ))
}

// TEXT: limit counted in bytes; truncation never splits a character.
pub(super) fn coerce_bytes(
    column: &str,
    max_bytes: usize,
    input: &Literal,
    mode: SqlMode,
) -> Result<Coerced, CoerceError> {
    let mut text = literal_text(input);
    let len = text.len();
    if len <= max_bytes {
        return Ok(Coerced::exact(Value::Text(text)));
    }

    if mode.strict {
        return Err(CoerceError::DataTooLong {
            column: column.to_string(),
            len,
            max: max_bytes,
        });
    }

    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);

    Ok(Coerced::lossy(
        Value::Text(text),
        Warning::new(column, format!("Data truncated to {cut} bytes (was {len})")),
    ))
}
