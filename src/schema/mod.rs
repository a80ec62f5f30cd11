//! Schema unification
//!
//! This module infers one columnar schema from a sample of JSON documents,
//! tolerating type drift between records through an explicit promotion lattice.

pub mod lattice;
pub mod temporal;
pub mod types;
pub mod unifier;
pub mod walker;

pub use lattice::merge;
pub use temporal::{classify, complete_hour_only, Temporal};
pub use types::{FieldPath, IntWidth, ObservedType, PathSegment, StructField};
pub use unifier::{FieldState, SchemaField, UnifiedSchema, Unifier, UnifierBuilder};
pub use walker::walk;
