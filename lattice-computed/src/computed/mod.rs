//! Class Computed Properties
//!
//! A class computed property is declared once per class and evaluated
//! lazily, per instance, by an auxiliary helper.
//!
//! # Concepts
//!
//! ## Factories and Definitions
//!
//! [`create_class_computed`] captures a kind of macro: which dependency
//! positions are observed and how the resolved values combine.
//! [`ClassComputedFactory::define`] binds it to concrete dependencies and
//! yields a [`ClassComputed`] definition that can be installed on a class or
//! nested inside another macro.
//!
//! ## Observed and Read-Once Dependencies
//!
//! An observed dependency recomputes the property synchronously whenever it
//! changes. A read-once dependency is refreshed at most once per run loop
//! turn, no matter how many writes touch it.
//!
//! ## Helpers
//!
//! An [`AuxiliaryHelper`] holds the resolved dependencies and the combined
//! value for one (owner, definition) pair. [`PropertyCache`] guarantees there
//! is at most one live helper per pair and cleans helpers up when their owner
//! is torn down.

mod cache;
mod class;
mod helper;

pub use cache::PropertyCache;
pub use class::{
    create_class_computed, ClassComputed, ClassComputedFactory, CombineFn, DefinitionId, SlotSpec,
    SlotTable, StoragePath,
};
pub use helper::{AuxiliaryHelper, ComputedState};
