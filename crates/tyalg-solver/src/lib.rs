//! Structural Type-Algebra Solver
//!
//! Evaluates conditional, mapped and `infer`-based transformations over an
//! arena of interned type descriptors:
//!
//! - **Hash-consed arena**: O(1) type equality via `TypeId` comparison, with
//!   two-phase reservation for self-referential shapes
//! - **Pattern matching**: structural `extends` with variance-aware `infer`
//!   reconciliation and coinductive cycle handling
//! - **Evaluation**: distributive conditionals and mapped types memoized per
//!   `(operation, subject)`
//! - **Utility types**: `Pick`, `Omit`, `Exclude`, `ReturnType`,
//!   `UnionToIntersection` and friends built on the above
//!
//! ```ignore
//! let arena = TypeArena::new();
//! let mut evaluator = TypeEvaluator::new(&arena);
//! let t = arena.union(vec![TypeId::STRING, TypeId::NULL]);
//! assert_eq!(evaluator.non_nullable(t), TypeId::STRING);
//! ```

mod arena;
mod error;
mod evaluate;
pub mod evaluate_rules;
mod format;
pub mod recursion;
pub mod tracing_config;
pub mod types;
mod utility_types;

pub use arena::TypeArena;
pub use error::DescriptorError;
pub use evaluate::*;
pub use evaluate_rules::infer_pattern::{
    InferBindings, PatternMatcher, Variance, is_assignable, match_pattern,
};
pub use evaluate_rules::infer_substitutor::{
    InferSubstitutor, contains_infer, contains_type_variables, infer_variables,
};
pub use format::{TypeFormatter, format_type};
pub use recursion::{RecursionGuard, RecursionProfile, RecursionResult};
pub use tyalg_common::interner::Atom;
pub use types::*;

// Test modules loaded here cover behavior spanning several source files.
#[cfg(test)]
#[path = "../tests/conditional_tests.rs"]
mod conditional_tests;

#[cfg(test)]
#[path = "../tests/mapped_tests.rs"]
mod mapped_tests;

#[cfg(test)]
#[path = "../tests/utility_type_tests.rs"]
mod utility_type_tests;

#[cfg(test)]
#[path = "../tests/type_law_tests.rs"]
mod type_law_tests;

#[cfg(test)]
#[path = "../tests/recursive_type_tests.rs"]
mod recursive_type_tests;

#[cfg(test)]
#[path = "../tests/concurrent_tests.rs"]
mod concurrent_tests;

#[cfg(test)]
#[path = "../tests/format_tests.rs"]
mod format_tests;
