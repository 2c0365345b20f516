//! Instantiating branch templates.
//!
//! After a successful match the true branch of a conditional is rebuilt with
//! every `infer X` replaced by its binding and every bound `TypeParameter(T)`
//! replaced by the checked type. An `infer` variable without a binding becomes
//! `never`; a type parameter without one belongs to the caller and is kept.
//!
//! Templates may pass through reserved (self-referential) descriptors. Each
//! reserved node that needs rewriting gets a fresh placeholder before its body
//! is visited, so a cycle in the template becomes a cycle in the result.

use crate::arena::TypeArena;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};
use tyalg_common::interner::Atom;

use super::infer_pattern::InferBindings;

/// Whether `type_id` mentions an `infer` variable anywhere.
pub fn contains_infer(arena: &TypeArena, type_id: TypeId) -> bool {
    VariableScan::new(arena, ParamFilter::Ignore).scan(type_id)
}

/// Whether `type_id` mentions an `infer` variable or a type parameter.
pub fn contains_type_variables(arena: &TypeArena, type_id: TypeId) -> bool {
    VariableScan::new(arena, ParamFilter::All).scan(type_id)
}

/// The `infer` variables mentioned anywhere in `type_id`.
pub fn infer_variables(arena: &TypeArena, type_id: TypeId) -> Vec<Atom> {
    VariableScan::new(arena, ParamFilter::Ignore).infer_names(type_id)
}

/// Which type parameters count as variables during a scan.
enum ParamFilter<'b> {
    Ignore,
    All,
    Bound(&'b FxHashMap<Atom, TypeId>),
}

impl ParamFilter<'_> {
    fn counts(&self, name: Atom) -> bool {
        match self {
            ParamFilter::Ignore => false,
            ParamFilter::All => true,
            ParamFilter::Bound(params) => params.contains_key(&name),
        }
    }
}

struct VariableScan<'a, 'b> {
    arena: &'a TypeArena,
    params: ParamFilter<'b>,
    visited: FxHashSet<TypeId>,
}

impl<'a, 'b> VariableScan<'a, 'b> {
    fn new(arena: &'a TypeArena, params: ParamFilter<'b>) -> Self {
        VariableScan {
            arena,
            params,
            visited: FxHashSet::default(),
        }
    }

    fn scan(&mut self, root: TypeId) -> bool {
        let mut stack = vec![root];
        while let Some(type_id) = stack.pop() {
            if type_id.is_intrinsic() || !self.visited.insert(type_id) {
                continue;
            }
            let Some(data) = self.arena.lookup(type_id) else {
                continue;
            };
            match data {
                TypeData::Infer(_) => return true,
                TypeData::TypeParameter(name) if self.params.counts(name) => return true,
                _ => self.push_children(&data, &mut stack),
            }
        }
        false
    }

    /// Every distinct `infer` name below `root`, in discovery order.
    fn infer_names(&mut self, root: TypeId) -> Vec<Atom> {
        let mut names = Vec::new();
        let mut stack = vec![root];
        while let Some(type_id) = stack.pop() {
            if type_id.is_intrinsic() || !self.visited.insert(type_id) {
                continue;
            }
            match self.arena.lookup(type_id) {
                Some(TypeData::Infer(name)) if !names.contains(&name) => names.push(name),
                Some(data) => self.push_children(&data, &mut stack),
                None => {}
            }
        }
        names
    }

    fn push_children(&self, data: &TypeData, stack: &mut Vec<TypeId>) {
        match *data {
            TypeData::Intrinsic(_)
            | TypeData::Literal(_)
            | TypeData::Infer(_)
            | TypeData::TypeParameter(_) => {}
            TypeData::Union(list) | TypeData::Intersection(list) | TypeData::Wrapper(_, list) => {
                stack.extend(self.arena.type_list(list).iter().copied());
            }
            TypeData::Object(shape_id) => {
                let shape = self.arena.object_shape(shape_id);
                stack.extend(shape.fields.iter().map(|field| field.type_id));
                if let Some(index) = &shape.string_index {
                    stack.push(index.value_type);
                }
            }
            TypeData::Array(element) => stack.push(element),
            TypeData::Tuple(list) => {
                stack.extend(self.arena.tuple_list(list).iter().map(|e| e.type_id));
            }
            TypeData::Function(shape_id) | TypeData::Constructor(shape_id) => {
                let shape = self.arena.function_shape(shape_id);
                stack.extend(shape.this_type);
                stack.extend(shape.params.iter().map(|param| param.type_id));
                stack.push(shape.return_type);
            }
        }
    }
}

/// Rewrites a template with bindings for infer variables and type parameters.
pub struct InferSubstitutor<'a> {
    arena: &'a TypeArena,
    infer: FxHashMap<Atom, TypeId>,
    params: FxHashMap<Atom, TypeId>,
    memo: FxHashMap<TypeId, TypeId>,
    guard: RecursionGuard<TypeId>,
}

impl<'a> InferSubstitutor<'a> {
    pub fn new(arena: &'a TypeArena) -> Self {
        Self::with_profile(arena, RecursionProfile::Substitution)
    }

    pub fn with_profile(arena: &'a TypeArena, profile: RecursionProfile) -> Self {
        InferSubstitutor {
            arena,
            infer: FxHashMap::default(),
            params: FxHashMap::default(),
            memo: FxHashMap::default(),
            guard: RecursionGuard::with_profile(profile),
        }
    }

    pub fn from_bindings(arena: &'a TypeArena, bindings: &InferBindings) -> Self {
        let mut substitutor = Self::new(arena);
        for (name, type_id) in bindings.iter() {
            substitutor.infer.insert(name, type_id);
        }
        substitutor
    }

    pub fn bind_infer(&mut self, name: Atom, type_id: TypeId) {
        self.infer.insert(name, type_id);
    }

    pub fn bind_param(&mut self, name: Atom, type_id: TypeId) {
        self.params.insert(name, type_id);
    }

    pub fn substitute(&mut self, type_id: TypeId) -> TypeId {
        if type_id.is_intrinsic() {
            return type_id;
        }
        if let Some(&cached) = self.memo.get(&type_id) {
            return cached;
        }
        if !VariableScan::new(self.arena, ParamFilter::Bound(&self.params)).scan(type_id) {
            self.memo.insert(type_id, type_id);
            return type_id;
        }

        match self.guard.enter(type_id) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return type_id,
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                warn!(type_id = type_id.0, "substitution exceeded recursion limits");
                return TypeId::NEVER;
            }
        }

        let result = if self.arena.is_reserved(type_id) {
            self.substitute_reserved(type_id)
        } else {
            let result = self.substitute_structure(type_id);
            self.memo.insert(type_id, result);
            result
        };

        self.guard.leave(type_id);
        result
    }

    fn substitute_reserved(&mut self, type_id: TypeId) -> TypeId {
        let placeholder = self.arena.reserve();
        self.memo.insert(type_id, placeholder);

        let rebuilt = self.substitute_structure(type_id);
        let body = self.arena.lookup(rebuilt).unwrap_or(TypeData::Intrinsic(IntrinsicKind::Never));
        if let Err(err) = self.arena.define(placeholder, body) {
            debug!(%err, "could not define substituted placeholder");
            self.memo.insert(type_id, rebuilt);
            return rebuilt;
        }
        placeholder
    }

    fn substitute_structure(&mut self, type_id: TypeId) -> TypeId {
        let Some(data) = self.arena.lookup(type_id) else {
            return type_id;
        };
        let arena = self.arena;

        match data {
            TypeData::Intrinsic(_) | TypeData::Literal(_) => type_id,
            TypeData::Infer(name) => self.infer.get(&name).copied().unwrap_or(TypeId::NEVER),
            TypeData::TypeParameter(name) => self.params.get(&name).copied().unwrap_or(type_id),
            TypeData::Union(list) => {
                let members = arena.type_list(list);
                let members = members.iter().map(|&m| self.substitute(m)).collect();
                arena.union(members)
            }
            TypeData::Intersection(list) => {
                let members = arena.type_list(list);
                let members = members.iter().map(|&m| self.substitute(m)).collect();
                arena.intersection(members)
            }
            TypeData::Object(shape_id) => {
                let shape = arena.object_shape(shape_id);
                let fields = shape
                    .fields
                    .iter()
                    .map(|field| FieldInfo {
                        type_id: self.substitute(field.type_id),
                        ..field.clone()
                    })
                    .collect();
                let string_index = shape.string_index.as_ref().map(|index| IndexSignature {
                    value_type: self.substitute(index.value_type),
                    readonly: index.readonly,
                });
                arena.object_unchecked(ObjectShape {
                    fields,
                    string_index,
                })
            }
            TypeData::Array(element) => {
                let element = self.substitute(element);
                arena.array(element)
            }
            TypeData::Tuple(list) => {
                let elements = arena.tuple_list(list);
                let mut out = Vec::with_capacity(elements.len());
                for element in elements.iter() {
                    let substituted = self.substitute(element.type_id);
                    if element.rest && self.splice_tuple(substituted, &mut out) {
                        continue;
                    }
                    out.push(TupleElement {
                        type_id: substituted,
                        ..element.clone()
                    });
                }
                arena.tuple(out)
            }
            TypeData::Function(shape_id) => {
                let shape = self.substitute_signature(&arena.function_shape(shape_id));
                arena.function(shape)
            }
            TypeData::Constructor(shape_id) => {
                let shape = self.substitute_signature(&arena.function_shape(shape_id));
                arena.constructor(shape.params, shape.return_type)
            }
            TypeData::Wrapper(kind, list) => {
                let args = arena.type_list(list);
                let args = args.iter().map(|&arg| self.substitute(arg)).collect();
                arena.wrapper_unchecked(kind, args)
            }
        }
    }

    /// `[...A]` where `A` became a tuple: inline its elements.
    fn splice_tuple(&self, substituted: TypeId, out: &mut Vec<TupleElement>) -> bool {
        match self.arena.lookup(substituted) {
            Some(TypeData::Tuple(list)) => {
                out.extend(self.arena.tuple_list(list).iter().cloned());
                true
            }
            _ => false,
        }
    }

    fn substitute_signature(&mut self, shape: &FunctionShape) -> FunctionShape {
        let this_type = shape.this_type.map(|this| self.substitute(this));
        let mut params = Vec::with_capacity(shape.params.len());
        for param in &shape.params {
            let substituted = self.substitute(param.type_id);
            // `(...args: A)` with `A` bound to a tuple spreads back into parameters.
            if param.rest
                && let Some(TypeData::Tuple(list)) = self.arena.lookup(substituted)
            {
                params.extend(self.arena.tuple_list(list).iter().map(|element| ParamInfo {
                    name: element.name,
                    type_id: element.type_id,
                    optional: element.optional,
                    rest: element.rest,
                }));
                continue;
            }
            params.push(ParamInfo {
                type_id: substituted,
                ..param.clone()
            });
        }
        FunctionShape {
            this_type,
            params,
            return_type: self.substitute(shape.return_type),
        }
    }
}
