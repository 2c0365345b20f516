//! Evaluation rules split out of `evaluate.rs`.
//!
//! - `infer_pattern`: structural matching that binds `infer` variables
//! - `infer_substitutor`: instantiating branch templates with those bindings
//! - `mapped`: mapped types over object shapes
//! - `index_access`: `keyof T` and `T[K]`

pub mod index_access;
pub mod infer_pattern;
pub mod infer_substitutor;
pub mod mapped;
