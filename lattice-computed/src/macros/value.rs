//! Value extraction for macro descriptors.

use serde_json::Value;

use super::MacroKey;
use crate::object::Object;

/// Resolve a single descriptor against `context`.
///
/// - a key path reads the owner (the empty path reads its whole property bag),
/// - a nested macro produces its own value, told which property `key` it is
///   backing,
/// - a literal is returned unchanged.
pub fn get_value(context: &Object, descriptor: &MacroKey, key: Option<&str>) -> Value {
    match descriptor {
        MacroKey::Path(path) if path.is_empty() => context.to_value(),
        MacroKey::Path(path) => context.get(path),
        MacroKey::Macro(m) => m.resolve(context, key),
        MacroKey::Literal(value) => value.clone(),
    }
}
