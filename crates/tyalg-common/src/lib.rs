//! Common types and utilities for the tyalg type-algebra engine.
//!
//! Provides the string interner (`Atom`, `ShardedInterner`) used for field
//! names, literal strings and inference variable names.

// String interning for name deduplication
pub mod interner;
pub use interner::{Atom, ShardedInterner};
