//! Evaluation of conditional and mapped types.
//!
//! - Conditional types: `T extends U ? X : Y`
//! - Distributive conditional types: `(A | B) extends U ? X : Y`
//! - Mapped types over object shapes (see `evaluate_rules::mapped`)
//!
//! Results are memoized per `(operation, subject)`. An operation that is
//! re-entered for a subject it is still computing yields a sentinel instead of
//! recursing: the placeholder reserved for that computation when there is one,
//! `never` otherwise.

use crate::arena::TypeArena;
use crate::evaluate_rules::infer_pattern::{InferBindings, PatternMatcher};
use crate::evaluate_rules::infer_substitutor::InferSubstitutor;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::*;
use rustc_hash::FxHashMap;
use tracing::{Level, debug, span, trace, warn};

/// Identifies the operation half of a memo key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKey {
    Conditional(ConditionalTypeId),
    Mapped(MappedTypeId),
}

type MemoKey = (OpKey, TypeId);

#[derive(Clone, Copy, Debug)]
enum MemoEntry {
    InProgress {
        placeholder: Option<TypeId>,
        referenced: bool,
    },
    Done(TypeId),
}

/// Evaluator for conditional and mapped types.
///
/// Borrows a shared arena; the memo cache belongs to this evaluator alone, so
/// each thread should create its own.
pub struct TypeEvaluator<'a> {
    arena: &'a TypeArena,
    profile: RecursionProfile,
    memo: FxHashMap<MemoKey, MemoEntry>,
    guard: RecursionGuard<MemoKey>,
}

impl<'a> TypeEvaluator<'a> {
    pub fn new(arena: &'a TypeArena) -> Self {
        Self::with_profile(arena, RecursionProfile::TypeEvaluation)
    }

    /// Create an evaluator whose own nesting and every matcher it starts use
    /// the limits of `profile`.
    pub fn with_profile(arena: &'a TypeArena, profile: RecursionProfile) -> Self {
        TypeEvaluator {
            arena,
            profile,
            memo: FxHashMap::default(),
            guard: RecursionGuard::with_profile(profile),
        }
    }

    #[inline]
    pub fn arena(&self) -> &'a TypeArena {
        self.arena
    }

    /// Number of memoized results.
    pub fn cache_len(&self) -> usize {
        self.memo
            .values()
            .filter(|entry| matches!(entry, MemoEntry::Done(_)))
            .count()
    }

    pub fn clear_cache(&mut self) {
        self.memo.clear();
        self.guard.reset();
    }

    /// `subject extends pattern`, returning the infer bindings on success.
    pub fn match_pattern(&self, subject: TypeId, pattern: TypeId) -> Option<InferBindings> {
        PatternMatcher::with_profile(self.arena, self.profile).run(subject, pattern)
    }

    /// Apply `f` to every member of a union subject and union the results.
    ///
    /// A `never` subject is the empty union and yields `never` without calling `f`.
    pub fn distribute<F>(&mut self, subject: TypeId, mut f: F) -> TypeId
    where
        F: FnMut(&mut Self, TypeId) -> TypeId,
    {
        let members = self.arena.union_members(subject);
        match members.as_slice() {
            [] => TypeId::NEVER,
            [single] => f(self, *single),
            _ => {
                let results: Vec<TypeId> = members.iter().map(|&member| f(self, member)).collect();
                self.arena.union(results)
            }
        }
    }

    /// `subject extends pattern ? when_true : when_false`.
    ///
    /// `when_true` may refer to infer variables bound by `pattern`.
    pub fn resolve_conditional(
        &mut self,
        subject: TypeId,
        pattern: TypeId,
        when_true: TypeId,
        when_false: TypeId,
        distribute: bool,
    ) -> TypeId {
        let cond_id = self.arena.conditional(ConditionalType {
            check_param: None,
            extends_type: pattern,
            true_type: when_true,
            false_type: when_false,
            is_distributive: distribute,
        });
        self.evaluate_conditional(cond_id, subject)
    }

    /// Evaluate an interned conditional with `subject` as the checked type.
    pub fn evaluate_conditional(&mut self, cond_id: ConditionalTypeId, subject: TypeId) -> TypeId {
        let cond = self.arena.conditional_type(cond_id);
        let _span = span!(
            Level::TRACE,
            "evaluate_conditional",
            cond = cond_id.0,
            subject = subject.0,
            distributive = cond.is_distributive
        )
        .entered();

        if cond.is_distributive {
            self.distribute(subject, |evaluator, member| {
                evaluator.evaluate_conditional_member(cond_id, &cond, member)
            })
        } else {
            self.evaluate_conditional_member(cond_id, &cond, subject)
        }
    }

    /// `any` against a non-top pattern takes both branches, with every infer
    /// variable bound to `any` in the true one.
    fn evaluate_conditional_member(
        &mut self,
        cond_id: ConditionalTypeId,
        cond: &ConditionalType,
        subject: TypeId,
    ) -> TypeId {
        self.memoized((OpKey::Conditional(cond_id), subject), |evaluator| {
            let bindings = evaluator.match_pattern(subject, cond.extends_type);

            if subject == TypeId::ANY && !cond.extends_type.is_top() {
                let when_true =
                    evaluator.instantiate_branch(cond, cond.true_type, bindings.as_ref(), subject);
                let when_false =
                    evaluator.instantiate_branch(cond, cond.false_type, None, subject);
                let result = evaluator.arena.union2(when_true, when_false);
                trace!(result = result.0, "conditional on any, both branches");
                return result;
            }

            let matched = bindings.is_some();
            let template = if matched {
                cond.true_type
            } else {
                cond.false_type
            };
            let result = evaluator.instantiate_branch(cond, template, bindings.as_ref(), subject);
            trace!(subject = subject.0, matched, result = result.0, "conditional branch");
            result
        })
    }

    fn instantiate_branch(
        &self,
        cond: &ConditionalType,
        template: TypeId,
        bindings: Option<&InferBindings>,
        subject: TypeId,
    ) -> TypeId {
        let mut substitutor = match bindings {
            Some(bindings) => InferSubstitutor::from_bindings(self.arena, bindings),
            None => InferSubstitutor::new(self.arena),
        };
        if let Some(param) = cond.check_param {
            substitutor.bind_param(param, subject);
        }
        substitutor.substitute(template)
    }

    /// Run `compute` once per memo key.
    pub(crate) fn memoized<F>(&mut self, key: MemoKey, compute: F) -> TypeId
    where
        F: FnOnce(&mut Self) -> TypeId,
    {
        let (op, subject) = key;
        match self.memo.get_mut(&key) {
            Some(MemoEntry::Done(result)) => return *result,
            Some(MemoEntry::InProgress {
                placeholder,
                referenced,
            }) => {
                let sentinel = match placeholder {
                    Some(placeholder) => {
                        *referenced = true;
                        *placeholder
                    }
                    None => TypeId::NEVER,
                };
                debug!(
                    ?op,
                    subject = subject.0,
                    sentinel = sentinel.0,
                    "re-entered in-progress evaluation"
                );
                return sentinel;
            }
            None => {}
        }

        match self.guard.enter(key) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return TypeId::NEVER,
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                warn!(
                    ?op,
                    subject = subject.0,
                    depth = self.guard.depth(),
                    "evaluation exceeded recursion limits"
                );
                return TypeId::NEVER;
            }
        }

        self.memo.insert(
            key,
            MemoEntry::InProgress {
                placeholder: None,
                referenced: false,
            },
        );
        let result = compute(self);
        self.guard.leave(key);
        // Iteration budget is per top-level evaluation, not per evaluator.
        if self.guard.depth() == 0 {
            self.guard.reset();
        }
        self.memo.insert(key, MemoEntry::Done(result));
        result
    }

    /// Reserve a placeholder that re-entrant evaluations of `key` will see
    /// instead of `never`. Must be called from inside `memoized(key, ..)`.
    pub(crate) fn open_fixed_point(&mut self, key: MemoKey) -> TypeId {
        let placeholder = self.arena.reserve();
        self.memo.insert(
            key,
            MemoEntry::InProgress {
                placeholder: Some(placeholder),
                referenced: false,
            },
        );
        placeholder
    }

    /// Finish a computation started with [`open_fixed_point`](Self::open_fixed_point).
    ///
    /// If the placeholder was handed out, it becomes the result and takes the
    /// body of `result`. Otherwise `result` is returned and the placeholder is
    /// left unused.
    pub(crate) fn close_fixed_point(&mut self, key: MemoKey, result: TypeId) -> TypeId {
        let Some(MemoEntry::InProgress {
            placeholder: Some(placeholder),
            referenced: true,
        }) = self.memo.get(&key).copied()
        else {
            return result;
        };

        let Some(body) = self.arena.lookup(result) else {
            return result;
        };
        match self.arena.define(placeholder, body) {
            Ok(()) => placeholder,
            Err(err) => {
                debug!(%err, "could not close fixed point");
                result
            }
        }
    }
}

/// Convenience function for evaluating a conditional with a fresh evaluator.
pub fn evaluate_conditional(arena: &TypeArena, cond_id: ConditionalTypeId, subject: TypeId) -> TypeId {
    let mut evaluator = TypeEvaluator::new(arena);
    evaluator.evaluate_conditional(cond_id, subject)
}

/// Convenience function for evaluating a mapped type with a fresh evaluator.
pub fn evaluate_mapped(arena: &TypeArena, mapped_id: MappedTypeId, subject: TypeId) -> TypeId {
    let mut evaluator = TypeEvaluator::new(arena);
    evaluator.evaluate_mapped(mapped_id, subject)
}
