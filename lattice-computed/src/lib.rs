//! Lattice Computed
//!
//! Class-level computed property macros for the Lattice reactive object
//! model. It implements:
//!
//! - A small reactive object model (classes, instances, key path observers)
//! - Dependency canonicalization for key paths, array markers and brace
//!   expansion
//! - Per-instance auxiliary helpers that cache resolved dependencies
//! - A cooperative run loop that coalesces read-once refreshes
//!
//! # Architecture
//!
//! - `object`: the host object model computed properties plug into
//! - `macros`: dependency descriptors, flattening and collapsing
//! - `computed`: the class computed factory, helpers and their cache
//! - `runloop`: deferred, coalesced work
//! - `config`: engine tunables
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_computed::{create_class_computed, json, runloop, ObjectClass, Value};
//!
//! let sum = create_class_computed([true, false], |values: &[Value]| {
//!     json!(values.iter().filter_map(Value::as_i64).sum::<i64>())
//! });
//!
//! let class = ObjectClass::builder("Totals")
//!     .computed("total", sum.define(["x", "y"]))
//!     .build();
//! let totals = class.create(json!({ "x": 1, "y": 2 }));
//! assert_eq!(totals.get("total"), json!(3));
//!
//! // "x" is observed: the change is visible immediately
//! totals.set("x", json!(5))?;
//! assert_eq!(totals.get("total"), json!(7));
//!
//! // "y" is read once: the change lands when the turn ends
//! runloop::run(|| {
//!     totals.set("y", json!(10))?;
//!     assert_eq!(totals.get("total"), json!(7));
//!     Ok::<_, lattice_computed::Error>(())
//! })??;
//! assert_eq!(totals.get("total"), json!(15));
//! ```

pub mod computed;
pub mod config;
pub mod error;
pub mod macros;
pub mod object;
pub mod runloop;

pub use computed::{
    create_class_computed, AuxiliaryHelper, ClassComputed, ClassComputedFactory, ComputedState,
    PropertyCache,
};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use macros::{raw, Macro, MacroKey};
pub use object::{
    ComputedProperty, LifecycleEvent, LifecycleState, Object, ObjectClass, ObjectId, ObjectKind,
    ObserverId, RenderIntrospection, WeakObject,
};
pub use serde_json::{json, Value};
