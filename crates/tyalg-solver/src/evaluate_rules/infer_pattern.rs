//! Structural pattern matching with `infer` bindings.
//!
//! `subject extends pattern` is decided by structural descent. Wherever the
//! pattern holds `infer X`, the subterm of the subject found at that position
//! is recorded as a candidate for `X`. When the same variable is reached more
//! than once, candidates are reconciled by position:
//!
//! - covariant positions (return types, fields, elements) union candidates;
//! - contravariant positions (parameters) intersect them.
//!
//! The contravariant rule is what turns `(x: A) => any & (x: B) => any`
//! matched against `(x: infer R) => any` into `R = A & B`.
//!
//! Self-referential subjects and patterns are handled coinductively: a
//! `(subject, pattern)` pair that is already being matched higher up the stack
//! is assumed to match.

use crate::arena::TypeArena;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::*;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::sync::Arc;
use tracing::{Level, span, trace, warn};
use tyalg_common::interner::Atom;

use super::infer_substitutor::{contains_infer, infer_variables};

/// Matching direction relative to the top of the pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variance {
    Covariant,
    Contravariant,
}

impl Variance {
    #[inline]
    pub fn flip(self) -> Variance {
        match self {
            Variance::Covariant => Variance::Contravariant,
            Variance::Contravariant => Variance::Covariant,
        }
    }
}

/// Inferred types keyed by `infer` variable name, in first-binding order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InferBindings {
    map: IndexMap<Atom, TypeId, FxBuildHasher>,
}

impl InferBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: Atom) -> Option<TypeId> {
        self.map.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Atom, TypeId)> + '_ {
        self.map.iter().map(|(name, ty)| (*name, *ty))
    }

    /// Set `name` unconditionally, replacing any earlier candidate.
    pub fn insert(&mut self, name: Atom, type_id: TypeId) {
        self.map.insert(name, type_id);
    }

    /// Record a candidate, reconciling with an existing one by variance.
    pub fn bind(&mut self, arena: &TypeArena, name: Atom, type_id: TypeId, variance: Variance) {
        let merged = match self.map.get(&name) {
            None => type_id,
            Some(&existing) => match variance {
                Variance::Covariant => arena.union2(existing, type_id),
                Variance::Contravariant => arena.intersection2(existing, type_id),
            },
        };
        trace!(
            name = name.0,
            candidate = type_id.0,
            bound = merged.0,
            ?variance,
            "bind infer"
        );
        self.map.insert(name, merged);
    }
}

/// Match `subject` against `pattern`, returning the infer bindings on success.
pub fn match_pattern(arena: &TypeArena, subject: TypeId, pattern: TypeId) -> Option<InferBindings> {
    PatternMatcher::new(arena).run(subject, pattern)
}

/// `subject extends target` for patterns without infer variables.
pub fn is_assignable(arena: &TypeArena, subject: TypeId, target: TypeId) -> bool {
    match_pattern(arena, subject, target).is_some()
}

/// One matching session. Bindings accumulate across the whole descent.
pub struct PatternMatcher<'a> {
    arena: &'a TypeArena,
    bindings: InferBindings,
    guard: RecursionGuard<(TypeId, TypeId, Variance)>,
    infer_cache: FxHashMap<TypeId, bool>,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(arena: &'a TypeArena) -> Self {
        Self::with_profile(arena, RecursionProfile::PatternMatch)
    }

    pub fn with_profile(arena: &'a TypeArena, profile: RecursionProfile) -> Self {
        PatternMatcher {
            arena,
            bindings: InferBindings::new(),
            guard: RecursionGuard::with_profile(profile),
            infer_cache: FxHashMap::default(),
        }
    }

    /// Run the match; consumes the session.
    pub fn run(mut self, subject: TypeId, pattern: TypeId) -> Option<InferBindings> {
        let _span = span!(
            Level::TRACE,
            "match_pattern",
            subject = subject.0,
            pattern = pattern.0
        )
        .entered();

        if self.match_type(subject, pattern, Variance::Covariant) {
            trace!(bindings = self.bindings.len(), "matched");
            Some(std::mem::take(&mut self.bindings))
        } else {
            trace!("no match");
            None
        }
    }

    fn match_type(&mut self, subject: TypeId, pattern: TypeId, variance: Variance) -> bool {
        if subject == pattern {
            return true;
        }

        let Some(pattern_data) = self.arena.lookup(pattern) else {
            return false;
        };

        if let TypeData::Infer(name) = pattern_data {
            self.bindings.bind(self.arena, name, subject, variance);
            return true;
        }

        // Top patterns accept everything; bottom and `any` subjects go everywhere.
        if pattern.is_top() || subject == TypeId::NEVER {
            return true;
        }
        if subject == TypeId::ANY {
            // Every variable under the pattern sees `any` at its position.
            if self.pattern_contains_infer(pattern) {
                for name in infer_variables(self.arena, pattern) {
                    self.bindings.bind(self.arena, name, TypeId::ANY, variance);
                }
            }
            return true;
        }

        let key = (subject, pattern, variance);
        match self.guard.enter(key) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => {
                trace!(subject = subject.0, pattern = pattern.0, "cycle, assuming match");
                return true;
            }
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                warn!(
                    subject = subject.0,
                    pattern = pattern.0,
                    "pattern match exceeded recursion limits"
                );
                return false;
            }
        }

        let result = self.match_structure(subject, pattern, &pattern_data, variance);
        self.guard.leave(key);
        result
    }

    fn match_structure(
        &mut self,
        subject: TypeId,
        pattern: TypeId,
        pattern_data: &TypeData,
        variance: Variance,
    ) -> bool {
        let Some(subject_data) = self.arena.lookup(subject) else {
            return false;
        };

        // A union subject matches only if every member does.
        if let TypeData::Union(members) = subject_data {
            let members = self.arena.type_list(members);
            return members
                .iter()
                .all(|&member| self.match_type(member, pattern, variance));
        }

        match pattern_data {
            TypeData::Union(members) => {
                let members = self.arena.type_list(*members);
                return self.match_any_member(subject, &members, variance);
            }
            TypeData::Intersection(members) => {
                let members = self.arena.type_list(*members);
                return members
                    .iter()
                    .all(|&member| self.match_type(subject, member, variance));
            }
            _ => {}
        }

        if let TypeData::Intersection(members) = subject_data {
            let members = self.arena.type_list(members);
            return self.match_intersection_subject(&members, pattern, variance);
        }

        match (&subject_data, pattern_data) {
            (_, TypeData::Intrinsic(kind)) => self.match_intrinsic(subject, &subject_data, *kind),
            (TypeData::Object(s), TypeData::Object(p)) => {
                let s = self.arena.object_shape(*s);
                let p = self.arena.object_shape(*p);
                self.match_object(&s, &p, variance)
            }
            (TypeData::Array(s_elem), TypeData::Array(p_elem)) => {
                self.match_type(*s_elem, *p_elem, variance)
            }
            (TypeData::Tuple(elements), TypeData::Array(p_elem)) => {
                let elements = self.arena.tuple_list(*elements);
                elements.iter().all(|element| {
                    let element_type = self.spread_element_type(element);
                    self.match_type(element_type, *p_elem, variance)
                })
            }
            (TypeData::Tuple(s), TypeData::Tuple(p)) => {
                let s = self.arena.tuple_list(*s);
                let p = self.arena.tuple_list(*p);
                self.match_tuple(&s, &p, variance)
            }
            (TypeData::Wrapper(s_kind, s_args), TypeData::Wrapper(p_kind, p_args))
                if s_kind.implements(*p_kind) =>
            {
                let s_args = self.arena.type_list(*s_args);
                let p_args = self.arena.type_list(*p_args);
                self.match_wrapper_args(&s_args, &p_args, variance)
            }
            (TypeData::Array(s_elem), TypeData::Wrapper(WrapperKind::Iterable, p_args)) => {
                let p_args = self.arena.type_list(*p_args);
                match p_args.first() {
                    Some(&p_elem) => self.match_type(*s_elem, p_elem, variance),
                    None => true,
                }
            }
            (TypeData::Function(s), TypeData::Function(p)) => {
                let s = self.arena.function_shape(*s);
                let p = self.arena.function_shape(*p);
                self.match_signature(&s, &p, variance)
            }
            (TypeData::Constructor(s), TypeData::Constructor(p)) => {
                let s = self.arena.function_shape(*s);
                let p = self.arena.function_shape(*p);
                self.match_signature(&s, &p, variance)
            }
            _ => false,
        }
    }

    /// Union pattern: the first member that matches wins. Bindings made by
    /// failed attempts are discarded.
    fn match_any_member(&mut self, subject: TypeId, members: &[TypeId], variance: Variance) -> bool {
        for &member in members {
            let snapshot = self.bindings.clone();
            if self.match_type(subject, member, variance) {
                return true;
            }
            self.bindings = snapshot;
        }
        false
    }

    /// Intersection subject: matches if any member does, and every matching
    /// member contributes its candidates.
    fn match_intersection_subject(
        &mut self,
        members: &[TypeId],
        pattern: TypeId,
        variance: Variance,
    ) -> bool {
        let mut matched = false;
        for &member in members {
            let snapshot = self.bindings.clone();
            if self.match_type(member, pattern, variance) {
                matched = true;
            } else {
                self.bindings = snapshot;
            }
        }
        matched
    }

    fn match_intrinsic(&self, subject: TypeId, subject_data: &TypeData, kind: IntrinsicKind) -> bool {
        match kind {
            IntrinsicKind::Object => self.arena.is_object_like(subject),
            IntrinsicKind::Void => subject == TypeId::UNDEFINED,
            _ => match subject_data {
                TypeData::Literal(literal) => literal.primitive() == kind.type_id(),
                _ => false,
            },
        }
    }

    fn match_object(&mut self, subject: &ObjectShape, pattern: &ObjectShape, variance: Variance) -> bool {
        for p_field in &pattern.fields {
            match subject.field(p_field.name) {
                Some(s_field) => {
                    if s_field.optional && !p_field.optional {
                        return false;
                    }
                    if !self.match_type(s_field.type_id, p_field.type_id, variance) {
                        return false;
                    }
                }
                None if p_field.optional => {}
                None => return false,
            }
        }

        if let Some(p_index) = &pattern.string_index {
            for s_field in &subject.fields {
                if !self.match_type(s_field.type_id, p_index.value_type, variance) {
                    return false;
                }
            }
            if let Some(s_index) = &subject.string_index
                && !self.match_type(s_index.value_type, p_index.value_type, variance)
            {
                return false;
            }
        }

        true
    }

    fn match_tuple(
        &mut self,
        subject: &[TupleElement],
        pattern: &[TupleElement],
        variance: Variance,
    ) -> bool {
        let pattern_rest = pattern.last().filter(|element| element.rest);
        let fixed = if pattern_rest.is_some() {
            pattern.len() - 1
        } else {
            pattern.len()
        };

        if subject.iter().any(|element| element.rest) && pattern_rest.is_none() {
            return false;
        }
        if pattern_rest.is_none() {
            let required = pattern.iter().filter(|element| !element.optional).count();
            if subject.len() < required || subject.len() > pattern.len() {
                return false;
            }
        } else if subject.len() < fixed {
            return false;
        }

        for (s_element, p_element) in subject.iter().zip(&pattern[..fixed]) {
            if s_element.rest {
                return false;
            }
            if s_element.optional && !p_element.optional {
                return false;
            }
            if !self.match_type(s_element.type_id, p_element.type_id, variance) {
                return false;
            }
        }

        if let Some(rest) = pattern_rest {
            let remaining = self.remainder(subject[fixed..].to_vec());
            return self.match_type(remaining, rest.type_id, variance);
        }
        true
    }

    /// Type arguments line up by slot. A pattern slot the subject does not
    /// supply is skipped, leaving any infer variable in it unbound.
    fn match_wrapper_args(&mut self, subject: &[TypeId], pattern: &[TypeId], variance: Variance) -> bool {
        for (index, &p_arg) in pattern.iter().enumerate() {
            let Some(&s_arg) = subject.get(index) else {
                continue;
            };
            if !self.match_type(s_arg, p_arg, variance) {
                return false;
            }
        }
        true
    }

    fn match_signature(&mut self, subject: &FunctionShape, pattern: &FunctionShape, variance: Variance) -> bool {
        if let Some(p_this) = pattern.this_type {
            let s_this = subject.this_type.unwrap_or(TypeId::UNKNOWN);
            if !self.match_parameter_type(s_this, p_this, variance) {
                return false;
            }
        }

        if !self.match_params(&subject.params, &pattern.params, variance) {
            return false;
        }

        self.match_type(subject.return_type, pattern.return_type, variance)
    }

    fn match_params(&mut self, subject: &[ParamInfo], pattern: &[ParamInfo], variance: Variance) -> bool {
        let rest_index = pattern.iter().position(|param| param.rest);
        let fixed = rest_index.unwrap_or(pattern.len());

        if rest_index.is_none() {
            // The subject cannot demand more arguments than the pattern passes.
            let required = subject
                .iter()
                .filter(|param| !param.optional && !param.rest)
                .count();
            if required > pattern.len() {
                return false;
            }
        }

        for (s_param, p_param) in subject.iter().zip(&pattern[..fixed]) {
            let s_type = if s_param.rest {
                self.spread_element_type(&s_param.as_tuple_element())
            } else {
                s_param.type_id
            };
            if !self.match_parameter_type(s_type, p_param.type_id, variance) {
                return false;
            }
        }

        if let Some(index) = rest_index {
            let remaining: Vec<TupleElement> = subject
                .get(fixed..)
                .map(|params| params.iter().map(ParamInfo::as_tuple_element).collect())
                .unwrap_or_default();
            let remaining = self.remainder(remaining);
            return self.match_parameter_type(remaining, pattern[index].type_id, variance);
        }
        true
    }

    /// What a pattern rest captures: the elements left over as a tuple, or
    /// the spread type itself when a lone rest element is all that is left.
    fn remainder(&self, elements: Vec<TupleElement>) -> TypeId {
        match elements.as_slice() {
            [only] if only.rest => only.type_id,
            _ => self.arena.tuple(elements),
        }
    }

    /// Parameter positions are checked in the reverse direction. When the
    /// pattern side carries infer variables the roles stay put and only the
    /// variance flips, so candidates are reconciled by intersection.
    fn match_parameter_type(&mut self, subject: TypeId, pattern: TypeId, variance: Variance) -> bool {
        let flipped = variance.flip();
        if self.pattern_contains_infer(pattern) {
            self.match_type(subject, pattern, flipped)
        } else {
            self.match_type(pattern, subject, flipped)
        }
    }

    fn pattern_contains_infer(&mut self, pattern: TypeId) -> bool {
        if let Some(&cached) = self.infer_cache.get(&pattern) {
            return cached;
        }
        let result = contains_infer(self.arena, pattern);
        self.infer_cache.insert(pattern, result);
        result
    }

    /// The element type contributed by a tuple element; `...T[]` contributes `T`.
    fn spread_element_type(&self, element: &TupleElement) -> TypeId {
        if !element.rest {
            return element.type_id;
        }
        match self.arena.lookup(element.type_id) {
            Some(TypeData::Array(inner)) => inner,
            Some(TypeData::Tuple(list)) => {
                let elements: Arc<[TupleElement]> = self.arena.tuple_list(list);
                self.arena
                    .union(elements.iter().map(|element| element.type_id).collect())
            }
            _ => element.type_id,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/infer_pattern_tests.rs"]
mod tests;
