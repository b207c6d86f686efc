//! Native type fallbacks and catalog default parsing.

use crate::core::Value;
use crate::ddl::{definition, ColumnInfo};

/// Fill size or precision extras for a native type named verbatim in a
/// descriptor's `type`, e.g. `varchar` with `length: 40`.
///
/// Variable-length character types always get a length, `string_len` when
/// the descriptor gives none. Types already carrying `(...)` are untouched.
pub fn apply_native_type(info: &mut ColumnInfo, string_len: u32) {
    if !info.type_extras.is_empty() || info.col_type.contains('(') {
        return;
    }
    match info.type_lower().as_str() {
        "varchar" | "nvarchar" | "varchar2" | "nvarchar2" | "character varying" | "varbinary" => {
            definition::sized(info, string_len)
        }
        "char" | "nchar" | "character" | "binary" if info.length.is_some() => {
            definition::sized(info, 1)
        }
        "decimal" | "numeric" | "number" | "dec" if info.precision.or(info.length).is_some() => {
            definition::scaled(info, 18, 0)
        }
        _ => {}
    }
}

/// Whether a text default is one of the legacy all-zero dates.
pub fn is_zero_date(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| s.trim_start().starts_with("0000-00-00"))
        .unwrap_or(false)
}

/// Interpret a default expression as reported by a catalog.
///
/// Quoted literals become text and numbers become numbers. `NULL` and an
/// absent default yield `None`. Anything else (function calls, keywords
/// such as `CURRENT_TIMESTAMP`) is kept as an expression.
pub fn parse_default(raw: Option<&str>) -> Option<Value> {
    let s = strip_wrapping_parens(raw?.trim());
    if s.is_empty() {
        return None;
    }

    let literal = s
        .strip_prefix('N')
        .filter(|rest| rest.starts_with('\''))
        .unwrap_or(s);
    if literal.starts_with('\'') {
        return Some(Value::Text(unquote(literal)));
    }

    // Postgres casts: `NULL::character varying`, `0::smallint`.
    let bare = match s.find("::") {
        Some(pos) => s[..pos].trim(),
        None => s,
    };
    if bare.eq_ignore_ascii_case("null") {
        return None;
    }
    if let Ok(i) = bare.parse::<i64>() {
        return Some(Value::Int(i));
    }
    if let Ok(f) = bare.parse::<f64>() {
        return Some(Value::Float(f));
    }
    Some(Value::expression(s))
}

/// Text of a single-quoted literal, with doubled quotes collapsed and any
/// trailing cast dropped.
fn unquote(literal: &str) -> String {
    let mut out = String::new();
    let mut chars = literal.chars().skip(1).peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            break;
        }
        out.push(c);
    }
    out
}

/// `((0))` to `0`; leaves `(a) + (b)` alone.
fn strip_wrapping_parens(mut s: &str) -> &str {
    while s.len() >= 2 && s.starts_with('(') && s.ends_with(')') && wraps_whole(s) {
        s = s[1..s.len() - 1].trim();
    }
    s
}

fn wraps_whole(s: &str) -> bool {
    let mut depth = 0i32;
    let last = s.len() - 1;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != last {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
