//! Class-level computed macros.
//!
//! [`create_class_computed`] is called once to describe a kind of macro:
//! which dependency positions are observed, and how resolved values combine.
//! The returned factory's [`ClassComputedFactory::define`] is called at
//! class-declaration time with the actual dependencies. That is where keys
//! are canonicalized and the slot table is built, once per declaration site;
//! every instance of the class then shares the table.
//!
//! # Slots
//!
//! Each canonical dependency becomes one row of a [`SlotTable`]:
//!
//! | dependency | observed | storage | patterns |
//! |------------|----------|---------|----------|
//! | key path | yes | `Context(path)` | leaves of the path, without array markers |
//! | key path | no | `Context(path)` | leaves of the path |
//! | macro / literal | any | `NonStrings(i)` | leaves of the macro |
//! | class computed | any | `NonStrings(i)` | none, the nested helper pushes |
//!
//! Observed rows recompute the combined value synchronously. Read-once rows
//! refresh only their own slot, once per run loop turn.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use super::cache::PropertyCache;
use super::helper::AuxiliaryHelper;
use crate::macros::{collapse_keys_with_map, flatten_keys, Macro, MacroKey};
use crate::object::{path, ComputedProperty, Object};

/// Combines one resolved value per dependency position into the property's
/// value.
pub type CombineFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Identity of one computed property definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefinitionId(u64);

impl DefinitionId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Where a helper keeps the resolved value of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoragePath {
    /// A key path read from the owning object.
    Context(String),
    /// Entry `i` of the helper's non-string bag.
    NonStrings(usize),
}

/// One canonical dependency.
#[derive(Debug, Clone)]
pub struct SlotSpec {
    /// The descriptor the slot resolves.
    pub descriptor: MacroKey,
    /// Whether changes recompute synchronously.
    pub observed: bool,
    pub storage: StoragePath,
    /// Key path patterns on the owner that affect this slot.
    pub patterns: Vec<String>,
}

/// Per-definition table shared by every helper of that definition.
pub struct SlotTable {
    pub slots: Vec<SlotSpec>,
    /// For each original dependency position, the slot holding its value.
    pub positions: Vec<usize>,
    pub combine: CombineFn,
}

impl SlotTable {
    fn build(observe: &[bool], keys: &[MacroKey], combine: CombineFn) -> Self {
        let collapsed = collapse_keys_with_map(keys);

        let slots = collapsed
            .keys
            .iter()
            .zip(&collapsed.key_map)
            .enumerate()
            .map(|(i, (canonical, &original))| {
                let observed = observe.get(original).copied().unwrap_or(false);

                // A read-once array dependency keeps its markers so its
                // observer still sees element changes.
                let descriptor = match &keys[original] {
                    MacroKey::Path(p) if !observed && path::is_array_sensitive(p) => {
                        keys[original].clone()
                    }
                    _ => canonical.clone(),
                };

                let storage = match &descriptor {
                    MacroKey::Path(p) => StoragePath::Context(p.clone()),
                    _ => StoragePath::NonStrings(i),
                };

                // Path rows watch the leaves of every declared path merged
                // into them; observed rows only react to array reassignment.
                let patterns = match &storage {
                    StoragePath::Context(_) => {
                        let merged: Vec<MacroKey> = collapsed
                            .positions
                            .iter()
                            .zip(keys)
                            .filter(|(slot, _)| **slot == i)
                            .map(|(_, key)| key.clone())
                            .collect();
                        let leaves = flatten_keys(&merged);
                        if observed {
                            let cut: IndexSet<String> =
                                leaves.iter().map(|l| path::collapse(l).to_string()).collect();
                            cut.into_iter().collect()
                        } else {
                            leaves
                        }
                    }
                    StoragePath::NonStrings(_) => match &descriptor {
                        MacroKey::Macro(m) if m.pushes_changes() => Vec::new(),
                        _ => flatten_keys(std::slice::from_ref(&descriptor)),
                    },
                };

                SlotSpec {
                    descriptor,
                    observed,
                    storage,
                    patterns,
                }
            })
            .collect();

        Self {
            slots,
            positions: collapsed.positions,
            combine,
        }
    }

    /// Every pattern of every slot, without duplicates.
    pub fn patterns(&self) -> Vec<String> {
        let patterns: IndexSet<&String> = self.slots.iter().flat_map(|s| &s.patterns).collect();
        patterns.into_iter().cloned().collect()
    }
}

impl fmt::Debug for SlotTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTable")
            .field("slots", &self.slots)
            .field("positions", &self.positions)
            .finish()
    }
}

/// A macro kind: observe flags plus a combining function.
#[derive(Clone)]
pub struct ClassComputedFactory {
    observe: Arc<[bool]>,
    combine: CombineFn,
}

/// Describe a computed macro.
///
/// `observe[j]` decides whether dependency position `j` is observed
/// (recompute synchronously on change) or read once (refresh at the end of
/// the turn). Missing flags mean read-once. `combine` receives one value per
/// dependency position.
///
/// # Example
///
/// ```rust,ignore
/// let sum = create_class_computed([true, false], |values| {
///     json!(values[0].as_i64().unwrap_or(0) + values[1].as_i64().unwrap_or(0))
/// });
///
/// let class = ObjectClass::builder("Totals")
///     .computed("total", sum.define(["x", "y"]))
///     .build();
/// ```
pub fn create_class_computed<O, F>(observe: O, combine: F) -> ClassComputedFactory
where
    O: Into<Vec<bool>>,
    F: Fn(&[Value]) -> Value + Send + Sync + 'static,
{
    let observe: Vec<bool> = observe.into();
    ClassComputedFactory {
        observe: observe.into(),
        combine: Arc::new(combine),
    }
}

impl ClassComputedFactory {
    /// Declare a computed property over `keys`.
    pub fn define<I, K>(&self, keys: I) -> Arc<ClassComputed>
    where
        I: IntoIterator<Item = K>,
        K: Into<MacroKey>,
    {
        let keys: Vec<MacroKey> = keys.into_iter().map(Into::into).collect();
        let table = SlotTable::build(&self.observe, &keys, Arc::clone(&self.combine));
        let definition = ClassComputed {
            id: DefinitionId::new(),
            dependent_keys: flatten_keys(&keys),
            keys,
            table: Arc::new(table),
        };

        debug!(
            id = definition.id.raw(),
            slots = definition.table.slots.len(),
            dependent_keys = ?definition.dependent_keys,
            "defined class computed property"
        );
        Arc::new(definition)
    }
}

impl fmt::Debug for ClassComputedFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassComputedFactory")
            .field("observe", &self.observe)
            .finish()
    }
}

/// A read-only computed property definition.
///
/// Install it on an [`ObjectClass`](crate::object::ObjectClass), or pass it
/// as a dependency of another macro.
pub struct ClassComputed {
    id: DefinitionId,
    keys: Vec<MacroKey>,
    dependent_keys: Vec<String>,
    table: Arc<SlotTable>,
}

impl ClassComputed {
    pub fn id(&self) -> DefinitionId {
        self.id
    }

    /// The dependencies as declared.
    pub fn keys(&self) -> &[MacroKey] {
        &self.keys
    }

    pub fn table(&self) -> &SlotTable {
        &self.table
    }

    /// The helper backing this definition on `owner`, created on first use.
    pub fn helper_for(&self, owner: &Object, key: Option<&str>) -> Arc<AuxiliaryHelper> {
        PropertyCache::find_or_create(owner, self.id, || {
            AuxiliaryHelper::create(self.id, Arc::clone(&self.table), owner, key)
        })
    }
}

impl ComputedProperty for ClassComputed {
    fn get(&self, owner: &Object, key: &str) -> Value {
        self.helper_for(owner, Some(key)).computed()
    }

    fn dependent_keys(&self) -> &[String] {
        &self.dependent_keys
    }
}

impl Macro for ClassComputed {
    fn dependencies(&self) -> Vec<MacroKey> {
        self.keys.clone()
    }

    fn resolve(&self, context: &Object, key: Option<&str>) -> Value {
        self.helper_for(context, key).computed()
    }

    fn pushes_changes(&self) -> bool {
        true
    }

    fn helper(&self, context: &Object, key: Option<&str>) -> Option<Arc<AuxiliaryHelper>> {
        Some(self.helper_for(context, key))
    }
}

impl fmt::Debug for ClassComputed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassComputed")
            .field("id", &self.id)
            .field("keys", &self.keys)
            .field("dependent_keys", &self.dependent_keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::raw;

    fn first(values: &[Value]) -> Value {
        values.first().cloned().unwrap_or(Value::Null)
    }

    #[test]
    fn observed_paths_watch_their_canonical_path() {
        let definition = create_class_computed([true], first).define(["items.@each.name"]);
        let slot = &definition.table().slots[0];

        assert!(slot.observed);
        assert_eq!(slot.descriptor.as_path(), Some("items"));
        assert_eq!(slot.storage, StoragePath::Context("items".into()));
        assert_eq!(slot.patterns, vec!["items"]);
    }

    #[test]
    fn read_once_array_paths_keep_their_markers() {
        let definition = create_class_computed([false], first).define(["items.[]"]);
        let slot = &definition.table().slots[0];

        assert!(!slot.observed);
        assert_eq!(slot.descriptor.as_path(), Some("items.[]"));
        assert_eq!(slot.storage, StoragePath::Context("items.[]".into()));
        assert_eq!(slot.patterns, vec!["items.[]"]);
    }

    #[test]
    fn read_once_brace_paths_use_the_canonical_path() {
        let definition = create_class_computed([false], first).define(["a.{b,c}"]);
        let slot = &definition.table().slots[0];

        assert_eq!(slot.descriptor.as_path(), Some("a"));
        assert_eq!(slot.patterns, vec!["a.b", "a.c"]);
    }

    #[test]
    fn observed_brace_paths_watch_each_leaf() {
        let definition = create_class_computed([true], first).define(["a.{b,c}.[]"]);
        let slot = &definition.table().slots[0];

        assert_eq!(slot.descriptor.as_path(), Some("a"));
        assert_eq!(slot.patterns, vec!["a.b", "a.c"]);
    }

    #[test]
    fn nested_macros_and_literals_use_non_string_storage() {
        let inner = create_class_computed([true], first).define(["x.y"]);
        let definition =
            create_class_computed(vec![false, true], first).define([MacroKey::from(inner), raw(3)]);
        let table = definition.table();

        assert_eq!(table.slots[0].storage, StoragePath::NonStrings(0));
        // the nested helper announces its own changes
        assert!(table.slots[0].patterns.is_empty());
        assert_eq!(table.slots[1].storage, StoragePath::NonStrings(1));
        assert!(table.slots[1].patterns.is_empty());
    }

    #[test]
    fn flags_follow_original_positions() {
        // "a" appears twice; the first occurrence decides the slot's flag
        let definition =
            create_class_computed([false, true, true], first).define(["b", "a", "a"]);
        let table = definition.table();

        assert_eq!(table.slots.len(), 2);
        assert!(!table.slots[0].observed);
        assert!(table.slots[1].observed);
        assert_eq!(table.positions, vec![0, 1, 1]);
    }

    #[test]
    fn merged_paths_watch_every_declared_leaf() {
        let definition =
            create_class_computed([false, true], first).define(["a.{b,c}", "a.d"]);
        let table = definition.table();

        assert_eq!(table.slots.len(), 1);
        assert_eq!(table.slots[0].patterns, vec!["a.b", "a.c", "a.d"]);
        assert_eq!(table.positions, vec![0, 0]);
    }

    #[test]
    fn missing_flags_mean_read_once() {
        let definition = create_class_computed(Vec::new(), first).define(["a"]);
        assert!(!definition.table().slots[0].observed);
    }

    #[test]
    fn dependent_keys_are_flattened_original_keys() {
        let inner = create_class_computed([true], first).define(["n"]);
        let definition = create_class_computed([true, false, true], first).define([
            MacroKey::from("items.[]"),
            MacroKey::from(inner),
            MacroKey::from("a.{b,c}"),
        ]);

        assert_eq!(
            ComputedProperty::dependent_keys(definition.as_ref()),
            ["items.[]", "n", "a.b", "a.c"]
        );
        assert_eq!(
            definition.table().patterns(),
            vec!["items", "a.b", "a.c"]
        );
    }
}
