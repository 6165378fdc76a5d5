//! Key Paths
//!
//! Properties are addressed by dotted key paths (`"a.b.c"`). Two segments are
//! reserved for arrays:
//!
//! - `[]` depends on the array's membership: `items.[]`
//! - `@each` depends on a key of every element: `items.@each.name`
//!
//! Braces expand into several paths: `a.{b,c}` is `a.b` and `a.c`.
//!
//! Reading a path that ends in an array marker yields the array itself, so
//! `items`, `items.[]` and `items.@each.name` all read the same value. The
//! markers only change which writes an observer reacts to (see [`observes`]).

use serde_json::Value;
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Segment that depends on every element of an array.
pub const ARRAY_EACH: &str = "@each";

/// Segment that depends on the membership of an array.
pub const ARRAY_LENGTH: &str = "[]";

type Segments<'a> = SmallVec<[&'a str; 8]>;

/// Split a path into its segments. The empty path has no segments.
pub fn segments(path: &str) -> Segments<'_> {
    if path.is_empty() {
        return SmallVec::new();
    }
    path.split('.').collect()
}

fn is_marker(segment: &str) -> bool {
    segment == ARRAY_EACH || segment == ARRAY_LENGTH
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Whether the path depends on array membership or array elements.
pub fn is_array_sensitive(path: &str) -> bool {
    segments(path).iter().any(|s| is_marker(s))
}

/// The property a path ultimately hangs off, with array markers and brace
/// groups dropped: `items.@each.name` and `items.[]` collapse to `items`,
/// `a.{b,c}` collapses to `a`.
pub fn collapse(path: &str) -> &str {
    let cut = [".[]", ".@each", ".{"]
        .iter()
        .filter_map(|marker| path.find(marker))
        .min();

    match cut {
        Some(end) => &path[..end],
        None => path,
    }
}

/// Expand brace groups into every path they describe.
///
/// `a.{b,c}.d` becomes `["a.b.d", "a.c.d"]`. Groups do not nest; a path
/// without braces expands to itself.
pub fn expand_braces(path: &str) -> Vec<String> {
    let Some(open) = path.find('{') else {
        return vec![path.to_string()];
    };
    let Some(close) = path[open..].find('}').map(|i| open + i) else {
        return vec![path.to_string()];
    };

    let prefix = &path[..open];
    let suffix = &path[close + 1..];

    path[open + 1..close]
        .split(',')
        .flat_map(|part| expand_braces(&format!("{prefix}{}{suffix}", part.trim())))
        .collect()
}

/// Read the value at `path`, or `Value::Null` when any segment is missing.
pub fn resolve(root: &Value, path: &str) -> Value {
    let mut current = root;

    for segment in segments(path) {
        if is_marker(segment) {
            break;
        }

        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return Value::Null,
            },
            Value::Array(items) if segment == "length" => return Value::from(items.len()),
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => next,
                None => return Value::Null,
            },
            Value::String(s) if segment == "length" => return Value::from(s.chars().count()),
            _ => return Value::Null,
        };
    }

    current.clone()
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Array elements are addressed by index; writing one past the end appends.
pub fn write(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments = segments(path);
    let invalid = |reason: &'static str| Error::InvalidPath {
        path: path.to_string(),
        reason,
    };

    let Some((last, parents)) = segments.split_last() else {
        return Err(invalid("empty path"));
    };
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid("empty segment"));
    }
    if segments.iter().any(|s| is_marker(s)) {
        return Err(invalid("array markers cannot be written"));
    }

    let mut current = root;
    for segment in parents {
        if current.is_null() {
            *current = Value::Object(Default::default());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Default::default())),
            Value::Array(items) => {
                let index = segment
                    .parse::<usize>()
                    .map_err(|_| invalid("non-numeric array index"))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| invalid("array index out of bounds"))?
            }
            _ => return Err(invalid("cannot write through a scalar")),
        };
    }

    if current.is_null() {
        *current = Value::Object(Default::default());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = last
                .parse::<usize>()
                .map_err(|_| invalid("non-numeric array index"))?;
            if index < items.len() {
                items[index] = value;
                Ok(())
            } else if index == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(invalid("array index out of bounds"))
            }
        }
        _ => Err(invalid("cannot write through a scalar")),
    }
}

/// Whether an observer of `pattern` is affected by a write to `changed`.
///
/// - Writing a path affects observers of that path and of everything below it.
/// - `items.[]` is also affected by `items.<index>` and `items.length`.
/// - `items.@each.k` is also affected by `items.<index>`, `items.<index>.k`
///   (and below) and `items.length`.
/// - Writing below a plain pattern does not affect it: `items` is not
///   affected by `items.0`.
pub fn observes(pattern: &str, changed: &str) -> bool {
    let pattern = segments(pattern);
    let changed = segments(changed);

    for (i, segment) in pattern.iter().enumerate() {
        let Some(written) = changed.get(i) else {
            // the write replaced an ancestor of the pattern
            return true;
        };

        match *segment {
            ARRAY_LENGTH => {
                return changed.len() == i + 1 && (is_index(written) || *written == "length");
            }
            ARRAY_EACH => {
                let rest = &changed[i..];
                if rest.len() == 1 {
                    return is_index(rest[0]) || rest[0] == "length";
                }
                return is_index(rest[0]) && pattern.get(i + 1).map_or(true, |k| *k == rest[1]);
            }
            _ if segment == written => continue,
            _ => return false,
        }
    }

    changed.len() == pattern.len()
}
