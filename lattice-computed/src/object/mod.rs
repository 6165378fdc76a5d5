//! Reactive Object Model
//!
//! The host system computed-property macros plug into. It is intentionally
//! small:
//!
//! - An [`ObjectClass`] is declared once and carries the computed property
//!   definitions shared by every instance.
//! - An [`Object`] holds a JSON property bag addressed by key paths, a set of
//!   pattern observers, one-shot lifecycle hooks and an optional
//!   [`RenderIntrospection`] capability.
//! - Writes notify synchronously. Observers of a computed property fire in
//!   the same pass when one of its dependent keys is affected, after the
//!   observers of the written paths themselves. A helper announcing that
//!   property again from inside the pass does not reach them a second time.
//!
//! # Lifecycle
//!
//! [`Object::destroy`] moves the object to the destroying state and runs the
//! teardown hooks immediately. Final teardown (dropping observers and evicting
//! cached helpers) is deferred to the end of the current run loop turn.
//! Dropping the last handle to an object also evicts its cached helpers.

mod observer;
pub mod path;

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, trace};

use crate::computed::PropertyCache;
use crate::error::{Error, Result};
use crate::runloop;

pub use observer::{ObserverFn, ObserverId};
use observer::Observer;

/// Unique identifier for an object instance.
///
/// This is the identity token the property cache is keyed by; it never keeps
/// the object alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computed property definition installed on an [`ObjectClass`].
pub trait ComputedProperty: Send + Sync + fmt::Debug {
    /// Produce the property's value for `owner`, where `key` is the name the
    /// property is installed under.
    fn get(&self, owner: &Object, key: &str) -> Value;

    /// Leaf key paths the property depends on.
    fn dependent_keys(&self) -> &[String];
}

/// Optional capability of a render layer: reports whether it already
/// captured the value of a property during the render pass in progress.
pub trait RenderIntrospection: Send + Sync {
    fn already_rendered(&self, key: &str) -> bool;
}

/// Whether instances of a class are plain objects or visual components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Plain,
    /// Components also fire [`LifecycleEvent::WillDestroyElement`].
    Component,
}

/// Events one-shot hooks can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// A component is about to lose its rendered element.
    WillDestroyElement,
    /// Any object is about to be destroyed.
    WillDestroy,
}

/// Lifecycle state of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Destroying,
    Destroyed,
}

type Hook = Box<dyn FnOnce() + Send>;

/// A class declaration: a name, a kind, and its computed properties.
pub struct ObjectClass {
    name: String,
    kind: ObjectKind,
    computed: IndexMap<String, Arc<dyn ComputedProperty>>,
}

impl ObjectClass {
    /// Start declaring a class.
    pub fn builder(name: impl Into<String>) -> ObjectClassBuilder {
        ObjectClassBuilder {
            class: ObjectClass {
                name: name.into(),
                kind: ObjectKind::Plain,
                computed: IndexMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The computed property installed under `key`, if any.
    pub fn computed(&self, key: &str) -> Option<&Arc<dyn ComputedProperty>> {
        self.computed.get(key)
    }

    /// Create an instance. `props` should be a JSON object; anything else
    /// starts the instance with an empty property bag.
    pub fn create(self: &Arc<Self>, props: Value) -> Object {
        let props = match props {
            Value::Object(map) => Value::Object(map),
            _ => Value::Object(Default::default()),
        };

        let inner = ObjectInner {
            id: ObjectId::new(),
            class: Arc::clone(self),
            props: RwLock::new(props),
            observers: RwLock::new(IndexMap::new()),
            hooks: Mutex::new(Vec::new()),
            state: RwLock::new(LifecycleState::Active),
            render: RwLock::new(None),
        };
        trace!(class = %self.name, id = ?inner.id, "created object");

        Object {
            inner: Arc::new(inner),
        }
    }
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ObjectClass`].
pub struct ObjectClassBuilder {
    class: ObjectClass,
}

impl ObjectClassBuilder {
    /// Declare instances of this class as visual components.
    pub fn component(mut self) -> Self {
        self.class.kind = ObjectKind::Component;
        self
    }

    /// Install a computed property under `key`.
    pub fn computed(mut self, key: impl Into<String>, property: Arc<dyn ComputedProperty>) -> Self {
        self.class.computed.insert(key.into(), property);
        self
    }

    pub fn build(self) -> Arc<ObjectClass> {
        Arc::new(self.class)
    }
}

struct ObjectInner {
    id: ObjectId,
    class: Arc<ObjectClass>,
    props: RwLock<Value>,
    observers: RwLock<IndexMap<ObserverId, Observer>>,
    hooks: Mutex<Vec<(LifecycleEvent, Hook)>>,
    state: RwLock<LifecycleState>,
    render: RwLock<Option<Arc<dyn RenderIntrospection>>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        PropertyCache::evict(self.id);
    }
}

/// Handle to an object instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

/// Non-owning handle to an object instance.
#[derive(Clone)]
pub struct WeakObject {
    id: ObjectId,
    inner: Weak<ObjectInner>,
}

impl WeakObject {
    /// The instance, if it is still alive.
    pub fn upgrade(&self) -> Option<Object> {
        self.inner.upgrade().map(|inner| Object { inner })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakObject").field(&self.id).finish()
    }
}

impl Object {
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    pub fn class(&self) -> &Arc<ObjectClass> {
        &self.inner.class
    }

    pub fn is_component(&self) -> bool {
        self.inner.class.kind == ObjectKind::Component
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read the value at `path`.
    ///
    /// If the first segment names a computed property, the property is
    /// evaluated and the rest of the path is resolved inside its value.
    pub fn get(&self, path: &str) -> Value {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));

        if let Some(property) = self.inner.class.computed(head) {
            let value = property.get(self, head);
            return if rest.is_empty() {
                value
            } else {
                path::resolve(&value, rest)
            };
        }

        path::resolve(&self.inner.props.read(), path)
    }

    /// Snapshot of the whole property bag.
    pub fn to_value(&self) -> Value {
        self.inner.props.read().clone()
    }

    /// Write `value` at `path` and notify observers.
    pub fn set(&self, path: &str, value: Value) -> Result<()> {
        self.check_writable(path)?;
        path::write(&mut self.inner.props.write(), path, value)?;
        self.notify(vec![path.to_string()]);
        Ok(())
    }

    /// Write several paths and notify observers in a single pass.
    ///
    /// The writes apply together: if any of them fails, the property bag is
    /// left untouched and nobody is notified.
    pub fn set_properties<I, K>(&self, properties: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let properties: Vec<(String, Value)> = properties
            .into_iter()
            .map(|(path, value)| (path.into(), value))
            .collect();
        for (path, _) in &properties {
            self.check_writable(path)?;
        }

        let mut changed = Vec::with_capacity(properties.len());
        {
            let mut props = self.inner.props.write();
            let mut staged = props.clone();
            for (path, value) in properties {
                path::write(&mut staged, &path, value)?;
                changed.push(path);
            }
            *props = staged;
        }

        self.notify(changed);
        Ok(())
    }

    /// Append `value` to the array at `path`.
    ///
    /// Observers see the new element's index and `length` change.
    pub fn push(&self, path: &str, value: Value) -> Result<()> {
        self.check_writable(path)?;

        let index = {
            let mut props = self.inner.props.write();
            let index = match path::resolve(&props, path) {
                Value::Array(items) => items.len(),
                _ => {
                    return Err(Error::NotAnArray {
                        path: path.to_string(),
                    })
                }
            };
            path::write(&mut props, &format!("{path}.{index}"), value)?;
            index
        };

        self.notify(vec![format!("{path}.{index}"), format!("{path}.length")]);
        Ok(())
    }

    /// Tell observers that `key` changed without writing anything.
    pub fn notify_property_change(&self, key: &str) {
        self.notify(vec![key.to_string()]);
    }

    /// Observe every path in `patterns`. Returns an ID for removal.
    pub fn add_observer<I, P, F>(&self, patterns: I, callback: F) -> ObserverId
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
        F: Fn(&Object, &[String]) + Send + Sync + 'static,
    {
        let id = ObserverId::new();
        if self.is_destroyed() {
            return id;
        }

        let observer = Observer::new(
            patterns.into_iter().map(Into::into).collect(),
            Arc::new(callback),
        );
        self.inner.observers.write().insert(id, observer);
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.write().shift_remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.read().len()
    }

    /// Run `hook` once when `event` fires.
    pub fn one<F>(&self, event: LifecycleEvent, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_destroyed() {
            return;
        }
        self.inner.hooks.lock().push((event, Box::new(hook)));
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        *self.inner.state.read()
    }

    /// True from the moment [`Object::destroy`] is called.
    pub fn is_destroying(&self) -> bool {
        self.lifecycle_state() != LifecycleState::Active
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle_state() == LifecycleState::Destroyed
    }

    /// Begin tearing the object down.
    ///
    /// Teardown hooks run now; observers and cached helpers are released at
    /// the end of the current run loop turn.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.state.write();
            if *state != LifecycleState::Active {
                return;
            }
            *state = LifecycleState::Destroying;
        }
        debug!(class = %self.inner.class.name, id = ?self.inner.id, "destroying object");

        if self.is_component() {
            self.fire(LifecycleEvent::WillDestroyElement);
        }
        self.fire(LifecycleEvent::WillDestroy);

        let weak = self.downgrade();
        runloop::schedule(move || {
            if let Some(object) = weak.upgrade() {
                object.finish_destroy();
            }
        });
    }

    fn finish_destroy(&self) {
        *self.inner.state.write() = LifecycleState::Destroyed;
        self.inner.observers.write().clear();
        self.inner.hooks.lock().clear();
        PropertyCache::evict(self.inner.id);
        debug!(id = ?self.inner.id, "destroyed object");
    }

    /// Install the render layer's introspection capability.
    pub fn set_render_introspection(&self, introspection: Arc<dyn RenderIntrospection>) {
        *self.inner.render.write() = Some(introspection);
    }

    pub fn render_introspection(&self) -> Option<Arc<dyn RenderIntrospection>> {
        self.inner.render.read().clone()
    }

    fn check_writable(&self, path: &str) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::Destroyed { id: self.inner.id });
        }

        let head = path.split('.').next().unwrap_or(path);
        if self.inner.class.computed(head).is_some() {
            return Err(Error::ReadOnly {
                key: head.to_string(),
            });
        }
        Ok(())
    }

    fn fire(&self, event: LifecycleEvent) {
        let hooks: Vec<Hook> = {
            let mut hooks = self.inner.hooks.lock();
            let (matching, rest): (Vec<_>, Vec<_>) =
                hooks.drain(..).partition(|(e, _)| *e == event);
            *hooks = rest;
            matching.into_iter().map(|(_, hook)| hook).collect()
        };

        trace!(id = ?self.inner.id, ?event, count = hooks.len(), "firing lifecycle hooks");
        for hook in hooks {
            hook();
        }
    }

    /// Add the computed properties affected by `changed`, repeating until
    /// computed properties depending on other computed properties settle.
    fn with_dependents(&self, changed: Vec<String>) -> (IndexSet<String>, usize) {
        let mut keys: IndexSet<String> = changed.into_iter().collect();
        let direct = keys.len();

        loop {
            let affected: Vec<String> = self
                .inner
                .class
                .computed
                .iter()
                .filter(|(name, _)| !keys.contains(name.as_str()))
                .filter(|(_, property)| {
                    property
                        .dependent_keys()
                        .iter()
                        .any(|dep| keys.iter().any(|c| path::observes(dep, c)))
                })
                .map(|(name, _)| name.clone())
                .collect();

            if affected.is_empty() {
                return (keys, direct);
            }
            keys.extend(affected);
        }
    }

    fn notify(&self, changed: Vec<String>) {
        if self.is_destroyed() {
            return;
        }

        let (keys, direct) = self.with_dependents(changed);
        let queued = NotifyPass::queued(self.inner.id, &keys);

        // Observers of written paths run before observers that only see a
        // dependent computed property, so the latter read settled values.
        let (first, second) = {
            let observers = self.inner.observers.read();
            let mut first = Vec::new();
            let mut second = Vec::new();

            for (id, observer) in observers.iter() {
                if queued.contains(id) {
                    continue;
                }
                let matched = observer.matches(&keys);
                if matched.is_empty() {
                    continue;
                }
                if observer.matches(keys.iter().take(direct)).is_empty() {
                    second.push((*id, observer.callback(), matched));
                } else {
                    first.push((*id, observer.callback(), matched));
                }
            }
            (first, second)
        };

        trace!(
            id = ?self.inner.id,
            ?keys,
            observers = first.len() + second.len(),
            skipped = queued.len(),
            "notifying"
        );
        let pass = NotifyPass::enter(
            self.inner.id,
            keys,
            first.iter().chain(&second).map(|(id, _, _)| *id).collect(),
        );
        for (id, callback, matched) in first.into_iter().chain(second) {
            pass.started(id);
            callback(self, &matched);
        }
    }
}

/// A notification pass in progress on this thread.
struct PassState {
    object: ObjectId,
    keys: IndexSet<String>,
    /// Observers the pass has yet to call.
    pending: IndexSet<ObserverId>,
}

thread_local! {
    static NOTIFY_PASSES: RefCell<Vec<PassState>> = RefCell::new(Vec::new());
}

/// Guard for a notification pass; leaves the pass stack when dropped.
///
/// A notification raised while a pass over a superset of its keys is running
/// on the same object skips the observers that pass is still going to call.
struct NotifyPass {
    depth: usize,
}

impl NotifyPass {
    fn enter(object: ObjectId, keys: IndexSet<String>, pending: IndexSet<ObserverId>) -> Self {
        NOTIFY_PASSES.with(|passes| {
            let mut passes = passes.borrow_mut();
            passes.push(PassState {
                object,
                keys,
                pending,
            });
            NotifyPass {
                depth: passes.len() - 1,
            }
        })
    }

    /// Observers that an enclosing pass covering `keys` has yet to call.
    fn queued(object: ObjectId, keys: &IndexSet<String>) -> IndexSet<ObserverId> {
        NOTIFY_PASSES.with(|passes| {
            passes
                .borrow()
                .iter()
                .filter(|pass| pass.object == object && keys.iter().all(|k| pass.keys.contains(k)))
                .flat_map(|pass| pass.pending.iter().copied())
                .collect()
        })
    }

    fn started(&self, observer: ObserverId) {
        NOTIFY_PASSES.with(|passes| {
            if let Some(pass) = passes.borrow_mut().get_mut(self.depth) {
                pass.pending.shift_remove(&observer);
            }
        });
    }
}

impl Drop for NotifyPass {
    fn drop(&mut self) {
        NOTIFY_PASSES.with(|passes| passes.borrow_mut().truncate(self.depth));
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.inner.id)
            .field("class", &self.inner.class.name)
            .field("state", &self.lifecycle_state())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    #[derive(Debug)]
    struct Doubled {
        deps: Vec<String>,
    }

    impl ComputedProperty for Doubled {
        fn get(&self, owner: &Object, _key: &str) -> Value {
            json!(owner.get("n").as_i64().unwrap_or(0) * 2)
        }

        fn dependent_keys(&self) -> &[String] {
            &self.deps
        }
    }

    fn plain() -> Arc<ObjectClass> {
        ObjectClass::builder("Plain").build()
    }

    fn counter(count: &Arc<AtomicUsize>) -> impl Fn(&Object, &[String]) + Send + Sync + 'static {
        let count = Arc::clone(count);
        move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn object_ids_are_unique() {
        let class = plain();
        let a = class.create(json!({}));
        let b = class.create(json!({}));
        assert_ne!(a.id(), b.id());
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn get_and_set_paths() {
        let object = plain().create(json!({ "a": { "b": 1 } }));
        assert_eq!(object.get("a.b"), json!(1));

        object.set("a.c", json!("x")).unwrap();
        assert_eq!(object.get("a"), json!({ "b": 1, "c": "x" }));
        assert_eq!(object.get("missing"), Value::Null);
    }

    #[test]
    fn set_notifies_matching_observers() {
        let object = plain().create(json!({ "a": 1, "b": 2 }));
        let count = Arc::new(AtomicUsize::new(0));
        object.add_observer(["a"], counter(&count));

        object.set("b", json!(3)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        object.set("a", json!(4)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_properties_notifies_once_per_observer() {
        let object = plain().create(json!({}));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        object.add_observer(["x", "y"], move |_, changed| {
            seen_clone.lock().push(changed.to_vec());
        });

        object
            .set_properties([("x", json!(1)), ("y", json!(2))])
            .unwrap();

        assert_eq!(*seen.lock(), vec![vec!["x".to_string(), "y".to_string()]]);
    }

    #[test]
    fn failed_set_properties_writes_nothing() {
        let object = plain().create(json!({ "x": 1, "items": [0] }));
        let count = Arc::new(AtomicUsize::new(0));
        object.add_observer(["x"], counter(&count));

        let err = object
            .set_properties([("x", json!(5)), ("items.9", json!(0))])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));

        assert_eq!(object.get("x"), json!(1));
        assert_eq!(object.get("items"), json!([0]));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn push_notifies_array_observers() {
        let object = plain().create(json!({ "items": [1] }));
        let membership = Arc::new(AtomicUsize::new(0));
        let whole = Arc::new(AtomicUsize::new(0));
        object.add_observer(["items.[]"], counter(&membership));
        object.add_observer(["items"], counter(&whole));

        object.push("items", json!(2)).unwrap();
        assert_eq!(object.get("items"), json!([1, 2]));
        assert_eq!(membership.load(Ordering::SeqCst), 1);
        assert_eq!(whole.load(Ordering::SeqCst), 0);

        let err = object.push("missing", json!(0)).unwrap_err();
        assert!(matches!(err, Error::NotAnArray { .. }));
    }

    #[test]
    fn removed_observer_stops_firing() {
        let object = plain().create(json!({}));
        let count = Arc::new(AtomicUsize::new(0));
        let id = object.add_observer(["a"], counter(&count));

        assert!(object.remove_observer(id));
        assert!(!object.remove_observer(id));
        object.set("a", json!(1)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn computed_properties_are_read_only_and_propagate() {
        let class = ObjectClass::builder("WithComputed")
            .computed("doubled", Arc::new(Doubled { deps: vec!["n".into()] }))
            .build();
        let object = class.create(json!({ "n": 2 }));
        assert_eq!(object.get("doubled"), json!(4));

        let count = Arc::new(AtomicUsize::new(0));
        object.add_observer(["doubled"], counter(&count));
        object.set("n", json!(5)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(object.get("doubled"), json!(10));

        let err = object.set("doubled", json!(1)).unwrap_err();
        assert!(matches!(err, Error::ReadOnly { ref key } if key == "doubled"));
    }

    #[test]
    fn repeated_notifications_inside_a_pass_are_folded() {
        let class = ObjectClass::builder("WithComputed")
            .computed("doubled", Arc::new(Doubled { deps: vec!["n".into()] }))
            .build();
        let object = class.create(json!({ "n": 2 }));

        // stands in for a helper that recomputes and announces "doubled"
        object.add_observer(["n"], |owner, _| owner.notify_property_change("doubled"));
        let count = Arc::new(AtomicUsize::new(0));
        object.add_observer(["doubled"], counter(&count));

        object.set("n", json!(3)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // outside a pass the announcement goes through
        object.notify_property_change("doubled");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn destroy_runs_hooks_and_defers_teardown() {
        let class = ObjectClass::builder("Widget").component().build();
        let object = class.create(json!({}));
        let element_hook = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&element_hook);
        object.one(LifecycleEvent::WillDestroyElement, move || {
            flag.store(true, Ordering::SeqCst);
        });
        object.add_observer(["a"], |_, _| {});

        runloop::run(|| {
            object.destroy();
            assert!(element_hook.load(Ordering::SeqCst));
            assert!(object.is_destroying());
            assert!(!object.is_destroyed());
        })
        .unwrap();

        assert!(object.is_destroyed());
        assert_eq!(object.observer_count(), 0);
        assert!(matches!(
            object.set("a", json!(1)),
            Err(Error::Destroyed { .. })
        ));
    }

    #[test]
    fn plain_objects_skip_element_hooks() {
        let object = plain().create(json!({}));
        let element_hook = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&element_hook);
        object.one(LifecycleEvent::WillDestroyElement, move || {
            flag.store(true, Ordering::SeqCst);
        });

        runloop::run(|| object.destroy()).unwrap();
        assert!(!element_hook.load(Ordering::SeqCst));
    }

    #[test]
    fn weak_handle_does_not_keep_object_alive() {
        let object = plain().create(json!({}));
        let weak = object.downgrade();
        assert_eq!(weak.id(), object.id());
        assert!(weak.upgrade().is_some());

        drop(object);
        assert!(weak.upgrade().is_none());
    }
}
