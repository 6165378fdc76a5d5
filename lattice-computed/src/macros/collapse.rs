//! Collapsing a raw dependency list into canonical dependencies.

use super::MacroKey;
use crate::object::path;

/// Canonical dependency list plus the maps between canonical and original
/// positions.
#[derive(Debug, Clone)]
pub struct CollapsedKeys {
    /// Distinct canonical descriptors, in first-seen order.
    pub keys: Vec<MacroKey>,
    /// For canonical index `i`, the original index of the first entry that
    /// collapsed to it.
    pub key_map: Vec<usize>,
    /// For original index `j`, the canonical index it collapsed to.
    pub positions: Vec<usize>,
}

/// Collapse `keys` into canonical form.
///
/// Paths lose their array markers and brace groups (`items.@each.name` →
/// `items`) and equal paths merge. Macros merge by identity; literals never
/// merge.
pub fn collapse_keys_with_map(keys: &[MacroKey]) -> CollapsedKeys {
    let mut collapsed = CollapsedKeys {
        keys: Vec::with_capacity(keys.len()),
        key_map: Vec::with_capacity(keys.len()),
        positions: Vec::with_capacity(keys.len()),
    };

    for (original, key) in keys.iter().enumerate() {
        let canonical = match key {
            MacroKey::Path(p) => MacroKey::Path(path::collapse(p).to_string()),
            other => other.clone(),
        };

        match collapsed.keys.iter().position(|k| k.same_as(&canonical)) {
            Some(index) => collapsed.positions.push(index),
            None => {
                collapsed.positions.push(collapsed.keys.len());
                collapsed.key_map.push(original);
                collapsed.keys.push(canonical);
            }
        }
    }

    collapsed
}
