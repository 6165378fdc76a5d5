//! Macro Descriptors
//!
//! A computed macro is declared over a list of dependencies. Each dependency
//! is a [`MacroKey`]: a key path on the owning object, a nested macro, or a
//! literal.
//!
//! Three pure helpers work on these lists:
//!
//! - [`get_value`] resolves one descriptor against an object.
//! - [`flatten_keys`] lists the leaf key paths a descriptor list depends on.
//! - [`collapse_keys_with_map`] merges equivalent descriptors into a
//!   canonical list and records how positions map between the two.

mod collapse;
mod flatten;
mod key;
mod value;

pub use collapse::{collapse_keys_with_map, CollapsedKeys};
pub use flatten::flatten_keys;
pub use key::{raw, Macro, MacroKey};
pub use value::get_value;
