//! Auxiliary Helper
//!
//! One helper backs one computed property definition on one owning object.
//! It keeps the last resolved value of every slot and the combined value the
//! property reads.
//!
//! # How Helpers Work
//!
//! 1. On creation every slot is resolved and the combined value is computed.
//!    Creation does not notify anybody; nothing could have read the old value.
//!
//! 2. A single observer on the owner carries the patterns of every slot. When
//!    it fires, the helper walks the slot table:
//!    - an observed slot re-resolves every observed slot and recombines
//!      immediately,
//!    - a read-once slot schedules a refresh of just that slot for the end of
//!      the run loop turn. Repeated writes in one turn coalesce into a single
//!      refresh.
//!
//! 3. A refresh marks the combined value dirty; the next read recombines.
//!
//! 4. After either path the helper tells the helpers that resolved it as a
//!    nested macro, then tells the owner its property changed, unless the
//!    owner's render layer already captured the value this pass.
//!
//! # Nesting
//!
//! A slot holding another class computed definition is not observed through
//! the nested definition's keys. Resolving the slot subscribes the outer
//! helper to the nested helper instead, and the nested helper reports every
//! change it makes: an observed slot recombines at once, a read-once slot
//! schedules its refresh.
//!
//! # Teardown
//!
//! The helper holds only a weak handle to its owner. If the owner is gone or
//! destroying when a change arrives, the helper destroys itself instead of
//! recomputing. A destroyed helper ignores every later change.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, trace};

use super::cache::PropertyCache;
use super::class::{DefinitionId, SlotTable, StoragePath};
use crate::config::EngineConfig;
use crate::macros::{get_value, MacroKey};
use crate::object::{path, Object, ObjectId, ObserverId, WeakObject};
use crate::runloop::{self, OnceKey};

/// Counter for generating unique helper IDs.
static HELPER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_helper_id() -> u64 {
    HELPER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Whether the combined value reflects the current slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    Clean,
    /// A read-once slot was refreshed; the next read recombines.
    Dirty,
}

struct ComputedSlot {
    value: Value,
    version: u64,
    state: ComputedState,
}

/// Per (owner, definition) state backing a class computed property.
pub struct AuxiliaryHelper {
    id: u64,
    definition: DefinitionId,
    key: Option<String>,
    context: WeakObject,
    table: Arc<SlotTable>,

    /// Resolved values of key path slots.
    context_values: RwLock<IndexMap<String, Value>>,

    /// Resolved values of macro and literal slots, by slot index.
    non_strings: RwLock<IndexMap<usize, Value>>,

    computed: Mutex<ComputedSlot>,
    observer: Mutex<Option<ObserverId>>,

    /// Helpers holding this one in a slot, with that slot's index.
    dependents: Mutex<Vec<(Weak<AuxiliaryHelper>, usize)>>,
    destroyed: AtomicBool,
    recompute_count: AtomicU64,
}

impl AuxiliaryHelper {
    /// Create and initialize a helper for `owner`, and start observing the
    /// owner.
    pub(crate) fn create(
        definition: DefinitionId,
        table: Arc<SlotTable>,
        owner: &Object,
        key: Option<&str>,
    ) -> Arc<Self> {
        let helper = Arc::new(Self {
            id: next_helper_id(),
            definition,
            key: key.map(str::to_string),
            context: owner.downgrade(),
            table,
            context_values: RwLock::new(IndexMap::new()),
            non_strings: RwLock::new(IndexMap::new()),
            computed: Mutex::new(ComputedSlot {
                value: Value::Null,
                version: 0,
                state: ComputedState::Dirty,
            }),
            observer: Mutex::new(None),
            dependents: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
            recompute_count: AtomicU64::new(0),
        });

        helper.initialize(owner);
        helper.attach(owner);

        debug!(
            helper = helper.id,
            owner = ?owner.id(),
            definition = definition.raw(),
            key = ?helper.key,
            "created auxiliary helper"
        );
        helper
    }

    fn initialize(self: &Arc<Self>, owner: &Object) {
        for index in 0..self.table.slots.len() {
            self.resolve_slot(owner, index, self.key.as_deref());
        }
        self.recompute();
    }

    /// Resolve slot `index` into its storage. A nested class computed slot
    /// also subscribes this helper to the nested helper.
    fn resolve_slot(self: &Arc<Self>, owner: &Object, index: usize, key: Option<&str>) {
        let Some(slot) = self.table.slots.get(index) else {
            return;
        };

        let value = match &slot.descriptor {
            MacroKey::Macro(m) if m.pushes_changes() => match m.helper(owner, key) {
                Some(nested) => {
                    nested.add_dependent(self, index);
                    nested.computed()
                }
                None => get_value(owner, &slot.descriptor, key),
            },
            descriptor => get_value(owner, descriptor, key),
        };
        self.store(&slot.storage, value);
    }

    fn add_dependent(&self, dependent: &Arc<AuxiliaryHelper>, slot: usize) {
        let mut dependents = self.dependents.lock();
        dependents.retain(|(weak, _)| weak.strong_count() > 0);

        let known = dependents
            .iter()
            .any(|(weak, i)| *i == slot && std::ptr::eq(weak.as_ptr(), Arc::as_ptr(dependent)));
        if !known {
            dependents.push((Arc::downgrade(dependent), slot));
        }
    }

    fn notify_dependents(&self) {
        let dependents: Vec<(Arc<AuxiliaryHelper>, usize)> = self
            .dependents
            .lock()
            .iter()
            .filter_map(|(weak, slot)| weak.upgrade().map(|helper| (helper, *slot)))
            .collect();

        for (dependent, slot) in dependents {
            dependent.nested_did_change(slot);
        }
    }

    /// A nested helper held in slot `index` changed its value.
    fn nested_did_change(self: &Arc<Self>, index: usize) {
        if self.is_destroyed() {
            return;
        }
        match self.table.slots.get(index) {
            Some(slot) if slot.observed => self.rewrite_computed(),
            Some(_) => self.schedule_refresh(index),
            None => {}
        }
    }

    fn attach(self: &Arc<Self>, owner: &Object) {
        let patterns = self.table.patterns();
        if patterns.is_empty() {
            return;
        }

        let weak = Arc::downgrade(self);
        let id = owner.add_observer(patterns, move |_, changed| {
            if let Some(helper) = weak.upgrade() {
                helper.dependencies_did_change(changed);
            }
        });
        *self.observer.lock() = Some(id);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn definition(&self) -> DefinitionId {
        self.definition
    }

    /// The property this helper backs, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn owner_id(&self) -> ObjectId {
        self.context.id()
    }

    /// The combined value, recombining first if a read-once slot changed.
    pub fn computed(&self) -> Value {
        if self.state() == ComputedState::Dirty {
            self.recompute();
        }
        self.computed.lock().value.clone()
    }

    /// Incremented every time the combined value is recomputed.
    pub fn version(&self) -> u64 {
        self.computed.lock().version
    }

    pub fn state(&self) -> ComputedState {
        self.computed.lock().state
    }

    /// Number of times `combine` has run for this helper.
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the non-string slot values, by slot index.
    pub fn non_strings(&self) -> IndexMap<usize, Value> {
        self.non_strings.read().clone()
    }

    /// The stored value of slot `index`.
    pub fn slot_value(&self, index: usize) -> Option<Value> {
        self.table.slots.get(index).map(|slot| self.load(&slot.storage))
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Stop observing the owner and leave the property cache.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.dependents.lock().clear();
        let observer = self.observer.lock().take();
        if let Some(id) = observer {
            if let Some(owner) = self.context.upgrade() {
                owner.remove_observer(id);
            }
        }
        PropertyCache::remove(self.context.id(), self.definition, self);

        debug!(helper = self.id, owner = ?self.context.id(), "destroyed auxiliary helper");
    }

    fn load(&self, storage: &StoragePath) -> Value {
        let value = match storage {
            StoragePath::Context(path) => self.context_values.read().get(path).cloned(),
            StoragePath::NonStrings(index) => self.non_strings.read().get(index).cloned(),
        };
        value.unwrap_or(Value::Null)
    }

    fn store(&self, storage: &StoragePath, value: Value) {
        match storage {
            StoragePath::Context(path) => {
                self.context_values.write().insert(path.clone(), value);
            }
            StoragePath::NonStrings(index) => {
                self.non_strings.write().insert(*index, value);
            }
        }
    }

    /// Combine the current slot values into a new computed value.
    fn recompute(&self) {
        let args: Vec<Value> = self
            .table
            .positions
            .iter()
            .map(|&slot| self.load(&self.table.slots[slot].storage))
            .collect();

        let value = (self.table.combine)(&args);

        let mut computed = self.computed.lock();
        computed.value = value;
        computed.version += 1;
        computed.state = ComputedState::Clean;
        drop(computed);

        self.recompute_count.fetch_add(1, Ordering::SeqCst);
    }

    /// The owner, if this helper may still act on it. Destroys the helper
    /// when the owner is gone or tearing down.
    fn live_owner(&self) -> Option<Object> {
        if self.is_destroyed() {
            return None;
        }

        match self.context.upgrade() {
            Some(owner) if !owner.is_destroying() => Some(owner),
            _ => {
                trace!(helper = self.id, "owner is tearing down");
                self.destroy();
                None
            }
        }
    }

    fn dependencies_did_change(self: &Arc<Self>, changed: &[String]) {
        if self.is_destroyed() {
            return;
        }

        let mut recompute = false;
        for (index, slot) in self.table.slots.iter().enumerate() {
            let affected = slot
                .patterns
                .iter()
                .any(|p| changed.iter().any(|c| path::observes(p, c)));
            if !affected {
                continue;
            }

            if slot.observed {
                recompute = true;
            } else {
                self.schedule_refresh(index);
            }
        }

        if recompute {
            self.rewrite_computed();
        }
    }

    /// Re-resolve every observed slot and recombine now.
    fn rewrite_computed(self: &Arc<Self>) {
        let Some(owner) = self.live_owner() else {
            return;
        };

        for (index, slot) in self.table.slots.iter().enumerate() {
            if slot.observed {
                self.resolve_slot(&owner, index, self.key.as_deref());
            }
        }
        self.recompute();
        trace!(helper = self.id, version = self.version(), "recomputed observed dependencies");

        self.notify_dependents();
        self.computed_did_change(&owner);
    }

    fn schedule_refresh(self: &Arc<Self>, index: usize) {
        let weak = Arc::downgrade(self);
        runloop::once(OnceKey::new(self.id, index), move || {
            if let Some(helper) = weak.upgrade() {
                helper.refresh_slot(index);
            }
        });
    }

    /// Re-resolve one read-once slot and invalidate the combined value.
    fn refresh_slot(self: &Arc<Self>, index: usize) {
        let Some(owner) = self.live_owner() else {
            return;
        };
        if index >= self.table.slots.len() {
            return;
        }

        self.resolve_slot(&owner, index, None);
        self.computed.lock().state = ComputedState::Dirty;
        trace!(helper = self.id, slot = index, "refreshed read-once dependency");

        self.notify_dependents();
        self.computed_did_change(&owner);
    }

    fn computed_did_change(&self, owner: &Object) {
        let Some(key) = self.key.as_deref() else {
            return;
        };

        if EngineConfig::current().render_dedup {
            if let Some(render) = owner.render_introspection() {
                if render.already_rendered(key) {
                    debug!(helper = self.id, key, "suppressed change already captured by render");
                    return;
                }
            }
        }

        owner.notify_property_change(key);
    }
}

impl fmt::Debug for AuxiliaryHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuxiliaryHelper")
            .field("id", &self.id)
            .field("definition", &self.definition)
            .field("key", &self.key)
            .field("owner", &self.context)
            .field("version", &self.version())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed::create_class_computed;
    use crate::macros::raw;
    use crate::object::ObjectClass;
    use serde_json::json;

    fn sum(values: &[Value]) -> Value {
        json!(values.iter().filter_map(Value::as_i64).sum::<i64>())
    }

    #[test]
    fn initializes_slots_and_value() {
        let definition = create_class_computed([true, false], sum).define(["x", "y"]);
        let owner = ObjectClass::builder("Plain")
            .build()
            .create(json!({ "x": 1, "y": 2 }));

        let helper = definition.helper_for(&owner, Some("total"));

        assert_eq!(helper.computed(), json!(3));
        assert_eq!(helper.version(), 1);
        assert_eq!(helper.state(), ComputedState::Clean);
        assert_eq!(helper.slot_value(0), Some(json!(1)));
        assert_eq!(helper.slot_value(1), Some(json!(2)));
        assert_eq!(helper.key(), Some("total"));
        assert_eq!(owner.observer_count(), 1);
    }

    #[test]
    fn non_string_slots_live_in_the_bag() {
        let definition = create_class_computed([true, true], sum).define([raw(5), "x".into()]);
        let owner = ObjectClass::builder("Plain").build().create(json!({ "x": 1 }));
        let helper = definition.helper_for(&owner, Some("total"));

        assert_eq!(helper.non_strings().get(&0), Some(&json!(5)));
        assert_eq!(helper.non_strings().len(), 1);
        assert_eq!(helper.computed(), json!(6));
    }

    #[test]
    fn destroy_detaches_from_owner() {
        let definition = create_class_computed([true], sum).define(["x"]);
        let owner = ObjectClass::builder("Plain").build().create(json!({ "x": 1 }));
        let helper = definition.helper_for(&owner, Some("total"));
        assert_eq!(owner.observer_count(), 1);

        helper.destroy();
        assert!(helper.is_destroyed());
        assert_eq!(owner.observer_count(), 0);

        // a second destroy is a no-op
        helper.destroy();

        owner.set("x", json!(2)).unwrap();
        assert_eq!(helper.computed(), json!(1));
    }

    #[test]
    fn helpers_without_dependencies_do_not_observe() {
        let definition = create_class_computed([false], sum).define([raw(4)]);
        let owner = ObjectClass::builder("Plain").build().create(json!({}));
        let helper = definition.helper_for(&owner, None);

        assert_eq!(helper.computed(), json!(4));
        assert_eq!(owner.observer_count(), 0);
    }
}
