//! Per-Instance Property Cache
//!
//! Maps (owner, definition) to the one helper backing that definition on
//! that owner.
//!
//! # Ownership
//!
//! The cache is process-wide and keyed by identity tokens ([`ObjectId`],
//! [`DefinitionId`]), so it never keeps an owner alive. Entries leave the
//! cache explicitly:
//!
//! - a component owner's `WillDestroyElement` hook destroys its helpers,
//! - an owner finishing teardown, or being dropped, evicts all its entries,
//! - a helper that destroys itself removes its own entry.
//!
//! The lock is never held while a helper is created or destroyed, so helper
//! creation may create helpers for nested definitions on the same owner.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::trace;

use super::class::DefinitionId;
use super::helper::AuxiliaryHelper;
use crate::object::{LifecycleEvent, Object, ObjectId};

type HelperMap = HashMap<DefinitionId, Arc<AuxiliaryHelper>>;

static PROPERTIES: OnceLock<RwLock<HashMap<ObjectId, HelperMap>>> = OnceLock::new();

fn get_properties() -> &'static RwLock<HashMap<ObjectId, HelperMap>> {
    PROPERTIES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The global helper cache.
pub struct PropertyCache;

impl PropertyCache {
    /// The helper for `(owner, definition)`, created with `factory` on first
    /// use. Repeated calls return the same helper until it is destroyed.
    pub fn find_or_create<F>(owner: &Object, definition: DefinitionId, factory: F) -> Arc<AuxiliaryHelper>
    where
        F: FnOnce() -> Arc<AuxiliaryHelper>,
    {
        if let Some(helper) = Self::get(owner.id(), definition) {
            return helper;
        }

        let created = factory();

        // a torn down owner gets a working helper, but nothing to clean it up
        if owner.is_destroyed() {
            return created;
        }

        let helper = {
            let mut properties = get_properties().write();
            Arc::clone(
                properties
                    .entry(owner.id())
                    .or_default()
                    .entry(definition)
                    .or_insert_with(|| Arc::clone(&created)),
            )
        };

        if !Arc::ptr_eq(&helper, &created) {
            // creation re-entered itself and the inner helper won
            created.destroy();
            return helper;
        }

        if owner.is_component() {
            let weak = Arc::downgrade(&helper);
            owner.one(LifecycleEvent::WillDestroyElement, move || {
                if let Some(helper) = weak.upgrade() {
                    helper.destroy();
                }
            });
        }

        trace!(owner = ?owner.id(), definition = definition.raw(), "cached helper");
        helper
    }

    /// The cached helper for `(owner, definition)`, if any.
    pub fn get(owner: ObjectId, definition: DefinitionId) -> Option<Arc<AuxiliaryHelper>> {
        get_properties()
            .read()
            .get(&owner)
            .and_then(|helpers| helpers.get(&definition))
            .cloned()
    }

    /// Number of helpers cached for `owner`.
    pub fn count(owner: ObjectId) -> usize {
        get_properties()
            .read()
            .get(&owner)
            .map_or(0, HashMap::len)
    }

    /// Remove the entry for `(owner, definition)` if it still holds `helper`.
    pub(crate) fn remove(owner: ObjectId, definition: DefinitionId, helper: &AuxiliaryHelper) {
        let mut properties = get_properties().write();
        let Some(helpers) = properties.get_mut(&owner) else {
            return;
        };

        let cached = helpers
            .get(&definition)
            .is_some_and(|existing| std::ptr::eq(Arc::as_ptr(existing), helper));
        if cached {
            helpers.remove(&definition);
        }
        if helpers.is_empty() {
            properties.remove(&owner);
        }
    }

    /// Drop every entry for `owner` and destroy the evicted helpers.
    pub(crate) fn evict(owner: ObjectId) {
        let evicted = get_properties().write().remove(&owner);

        if let Some(helpers) = evicted {
            trace!(owner = ?owner, count = helpers.len(), "evicting helpers");
            for helper in helpers.into_values() {
                helper.destroy();
            }
        }
    }
}
