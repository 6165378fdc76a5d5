//! Flattening descriptors into leaf key paths.

use indexmap::IndexSet;

use super::MacroKey;
use crate::object::path;

/// Every leaf key path `keys` depend on, directly or through nested macros,
/// with brace groups expanded. Literals contribute nothing. The result keeps
/// first-seen order and holds no duplicates.
pub fn flatten_keys(keys: &[MacroKey]) -> Vec<String> {
    let mut leaves = IndexSet::new();
    flatten_into(keys, &mut leaves);
    leaves.into_iter().collect()
}

fn flatten_into(keys: &[MacroKey], leaves: &mut IndexSet<String>) {
    for key in keys {
        match key {
            MacroKey::Path(p) => {
                leaves.extend(path::expand_braces(p).into_iter().filter(|leaf| !leaf.is_empty()));
            }
            MacroKey::Macro(m) => flatten_into(&m.dependencies(), leaves),
            MacroKey::Literal(_) => {}
        }
    }
}
