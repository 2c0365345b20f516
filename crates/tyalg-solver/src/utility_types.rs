//! Built-in utility types expressed as conditional and mapped types.
//!
//! Each combinator builds its pattern and branch templates in the arena and
//! hands them to the evaluator, so repeated applications hit the same memo
//! entries. Chained conditionals (`A ? X : B ? Y : Z`) are written as Rust
//! `if let` chains inside [`TypeEvaluator::distribute`].

use crate::evaluate::TypeEvaluator;
use crate::evaluate_rules::infer_pattern::InferBindings;
use crate::evaluate_rules::infer_substitutor::InferSubstitutor;
use crate::types::*;
use rustc_hash::FxHashSet;
use tracing::trace;
use tyalg_common::interner::Atom;

impl<'a> TypeEvaluator<'a> {
    // =========================================================================
    // Helpers
    // =========================================================================

    fn check_param(&self) -> Atom {
        self.arena().intern_string("T")
    }

    /// `T extends pattern ? when_true : when_false`, distributive over `T`,
    /// where either branch may mention `T` itself.
    fn distributive_conditional(
        &mut self,
        subject: TypeId,
        pattern: TypeId,
        when_true: TypeId,
        when_false: TypeId,
    ) -> TypeId {
        let cond_id = self.arena().conditional(ConditionalType {
            check_param: Some(self.check_param()),
            extends_type: pattern,
            true_type: when_true,
            false_type: when_false,
            is_distributive: true,
        });
        self.evaluate_conditional(cond_id, subject)
    }

    /// `T extends pattern ? <infer var> : never`, distributive.
    fn extract_infer(&mut self, subject: TypeId, pattern: TypeId, var: TypeId) -> TypeId {
        self.resolve_conditional(subject, pattern, var, TypeId::NEVER, true)
    }

    fn instantiate(&self, template: TypeId, bindings: &InferBindings) -> TypeId {
        InferSubstitutor::from_bindings(self.arena(), bindings).substitute(template)
    }

    /// `(...args: <args>) => <ret>`
    fn rest_function(&self, args: TypeId, ret: TypeId) -> TypeId {
        let arena = self.arena();
        let name = arena.intern_string("args");
        arena.function(FunctionShape::new(vec![ParamInfo::rest(name, args)], ret))
    }

    /// `new (...args: <args>) => <instance>`
    fn rest_constructor(&self, args: TypeId, instance: TypeId) -> TypeId {
        let arena = self.arena();
        let name = arena.intern_string("args");
        arena.constructor(vec![ParamInfo::rest(name, args)], instance)
    }

    fn wrapper_pattern(&self, kind: WrapperKind, args: Vec<TypeId>) -> TypeId {
        self.arena().wrapper_unchecked(kind, args)
    }

    // =========================================================================
    // Union filtering
    // =========================================================================

    /// `Exclude<T, U>`: members of `T` that do not match `U`.
    pub fn exclude(&mut self, subject: TypeId, excluded: TypeId) -> TypeId {
        let t = self.arena().intern(TypeData::TypeParameter(self.check_param()));
        self.distributive_conditional(subject, excluded, TypeId::NEVER, t)
    }

    /// `Extract<T, U>`: members of `T` that match `U`.
    pub fn extract(&mut self, subject: TypeId, extracted: TypeId) -> TypeId {
        let t = self.arena().intern(TypeData::TypeParameter(self.check_param()));
        self.distributive_conditional(subject, extracted, t, TypeId::NEVER)
    }

    /// `NonNullable<T>`: `T` without `null` and `undefined`.
    pub fn non_nullable(&mut self, subject: TypeId) -> TypeId {
        let nullish = self.arena().union2(TypeId::NULL, TypeId::UNDEFINED);
        self.exclude(subject, nullish)
    }

    // =========================================================================
    // Signatures
    // =========================================================================

    /// `Parameters<T>`: the parameter list of a function as a tuple.
    pub fn parameters(&mut self, subject: TypeId) -> TypeId {
        let p = self.arena().infer("P");
        let pattern = self.rest_function(p, TypeId::ANY);
        self.extract_infer(subject, pattern, p)
    }

    /// `ConstructorParameters<T>`
    pub fn constructor_parameters(&mut self, subject: TypeId) -> TypeId {
        let p = self.arena().infer("P");
        let pattern = self.rest_constructor(p, TypeId::ANY);
        self.extract_infer(subject, pattern, p)
    }

    /// `ReturnType<T>`
    pub fn return_type(&mut self, subject: TypeId) -> TypeId {
        let r = self.arena().infer("R");
        let pattern = self.rest_function(TypeId::ANY, r);
        self.extract_infer(subject, pattern, r)
    }

    /// `InstanceType<T>`
    pub fn instance_type(&mut self, subject: TypeId) -> TypeId {
        let r = self.arena().infer("R");
        let pattern = self.rest_constructor(TypeId::ANY, r);
        self.extract_infer(subject, pattern, r)
    }

    /// `ThisParameterType<T>`: the declared `this` of a function, else `unknown`.
    pub fn this_parameter_type(&mut self, subject: TypeId) -> TypeId {
        let arena = self.arena();
        let u = arena.infer("U");
        let args = arena.intern_string("args");
        let pattern = arena.function(
            FunctionShape::new(vec![ParamInfo::rest(args, TypeId::ANY)], TypeId::ANY).with_this(u),
        );
        self.resolve_conditional(subject, pattern, u, TypeId::UNKNOWN, true)
    }

    /// `OmitThisParameter<T>`: `T` with its `this` parameter removed.
    ///
    /// Functions without a declared `this` are returned unchanged.
    pub fn omit_this_parameter(&mut self, subject: TypeId) -> TypeId {
        let this_type = self.this_parameter_type(subject);
        if self.match_pattern(TypeId::UNKNOWN, this_type).is_some() {
            return subject;
        }

        let arena = self.arena();
        let signature = self.rest_function(arena.infer("A"), arena.infer("R"));
        let t = arena.intern(TypeData::TypeParameter(self.check_param()));
        self.distributive_conditional(subject, signature, signature, t)
    }

    /// `ThisType<T>`: `unknown` when `T` declares no `this`, else `T`.
    pub fn this_type(&mut self, subject: TypeId) -> TypeId {
        let this_type = self.this_parameter_type(subject);
        if self.match_pattern(TypeId::UNKNOWN, this_type).is_some() {
            TypeId::UNKNOWN
        } else {
            subject
        }
    }

    /// `UnionToIntersection<T>`
    ///
    /// Each member `m` becomes `(x: m) => any`. Matching the intersection of
    /// those signatures against `(x: infer R) => any` binds `R` once per member
    /// in parameter position, so the candidates are intersected.
    pub fn union_to_intersection(&mut self, subject: TypeId) -> TypeId {
        let arena = self.arena();
        if subject == TypeId::NEVER {
            return TypeId::UNKNOWN;
        }

        let x = arena.intern_string("x");
        let signatures: Vec<TypeId> = arena
            .union_members(subject)
            .into_iter()
            .map(|member| {
                arena.function(FunctionShape::new(
                    vec![ParamInfo::required(x, member)],
                    TypeId::ANY,
                ))
            })
            .collect();
        let combined = arena.intersection(signatures);

        let r = arena.infer("R");
        let pattern = arena.function(FunctionShape::new(vec![ParamInfo::required(x, r)], TypeId::ANY));
        let result = self.resolve_conditional(combined, pattern, r, TypeId::NEVER, false);
        trace!(subject = subject.0, result = result.0, "union to intersection");
        result
    }

    // =========================================================================
    // Element inference
    // =========================================================================

    /// `T extends infer U ? U : never`
    pub fn infer_type(&mut self, subject: TypeId) -> TypeId {
        let u = self.arena().infer("U");
        self.extract_infer(subject, u, u)
    }

    /// `T extends (infer U)[] ? U : never`
    pub fn infer_array(&mut self, subject: TypeId) -> TypeId {
        let u = self.arena().infer("U");
        let pattern = self.arena().array(u);
        self.extract_infer(subject, pattern, u)
    }

    /// Tuples match array patterns, so this is [`infer_array`](Self::infer_array)
    /// applied to tuples: the union of the element types.
    pub fn infer_tuple(&mut self, subject: TypeId) -> TypeId {
        self.infer_array(subject)
    }

    /// `T extends { [k: string]: infer U } ? U : never`
    pub fn infer_object(&mut self, subject: TypeId) -> TypeId {
        let arena = self.arena();
        let u = arena.infer("U");
        let pattern = arena.object_unchecked(ObjectShape {
            fields: Vec::new(),
            string_index: Some(IndexSignature {
                value_type: u,
                readonly: false,
            }),
        });
        self.extract_infer(subject, pattern, u)
    }

    fn infer_wrapper_slot(&mut self, subject: TypeId, kind: WrapperKind, slot: usize) -> TypeId {
        let u = self.arena().infer("U");
        let mut args = vec![TypeId::ANY; slot];
        args.push(u);
        let pattern = self.wrapper_pattern(kind, args);
        self.extract_infer(subject, pattern, u)
    }

    /// `T extends Promise<infer U> ? U : never`
    pub fn infer_promise(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::Promise, 0)
    }

    /// `T extends Iterable<infer U> ? U : never`
    pub fn infer_iterable(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::Iterable, 0)
    }

    pub fn infer_async_iterable(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::AsyncIterable, 0)
    }

    pub fn infer_iterator(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::Iterator, 0)
    }

    /// `T extends Iterator<any, infer U> ? U : never`
    pub fn infer_iterator_result(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::Iterator, 1)
    }

    pub fn infer_async_iterator(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::AsyncIterator, 0)
    }

    pub fn infer_async_iterator_result(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::AsyncIterator, 1)
    }

    pub fn infer_generator(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::Generator, 0)
    }

    pub fn infer_generator_result(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::Generator, 1)
    }

    pub fn infer_async_generator(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::AsyncGenerator, 0)
    }

    pub fn infer_async_generator_result(&mut self, subject: TypeId) -> TypeId {
        self.infer_wrapper_slot(subject, WrapperKind::AsyncGenerator, 1)
    }

    /// `T extends (...args: infer A) => infer R ? (...args: A) => R : never`
    pub fn infer_function(&mut self, subject: TypeId) -> TypeId {
        let arena = self.arena();
        let signature = self.rest_function(arena.infer("A"), arena.infer("R"));
        self.resolve_conditional(subject, signature, signature, TypeId::NEVER, true)
    }

    /// Normalize a constructor or function to `(...args: A) => R | W<R> | ...`,
    /// one `W<R>` per entry of `wrapped_returns`.
    pub fn infer_function_or_constructor(
        &mut self,
        subject: TypeId,
        wrapped_returns: &[WrapperKind],
    ) -> TypeId {
        let arena = self.arena();
        let a = arena.infer("A");
        let r = arena.infer("R");

        let mut returns = vec![r];
        returns.extend(
            wrapped_returns
                .iter()
                .map(|&kind| self.wrapper_pattern(kind, vec![r])),
        );
        let template = self.rest_function(a, arena.union(returns));
        let constructor_pattern = self.rest_constructor(a, r);
        let function_pattern = self.rest_function(a, r);

        self.distribute(subject, |evaluator, member| {
            if let Some(bindings) = evaluator.match_pattern(member, constructor_pattern) {
                evaluator.instantiate(template, &bindings)
            } else if let Some(bindings) = evaluator.match_pattern(member, function_pattern) {
                evaluator.instantiate(template, &bindings)
            } else {
                TypeId::NEVER
            }
        })
    }

    /// `T extends (infer U)[] ? U : T extends object ? { [K in keyof T]: T[K] } : never`
    pub fn infer_array_or_object(&mut self, subject: TypeId) -> TypeId {
        let arena = self.arena();
        let u = arena.infer("U");
        let array_pattern = arena.array(u);
        let homomorphic = arena.mapped(MappedType::homomorphic());

        self.distribute(subject, |evaluator, member| {
            if let Some(bindings) = evaluator.match_pattern(member, array_pattern) {
                evaluator.instantiate(u, &bindings)
            } else if evaluator.match_pattern(member, TypeId::OBJECT).is_some() {
                evaluator.evaluate_mapped(homomorphic, member)
            } else {
                TypeId::NEVER
            }
        })
    }

    /// `T extends object ? { [K in keyof T]: T[K] } : T extends (infer U)[] ? U : never`
    pub fn infer_object_or_array(&mut self, subject: TypeId) -> TypeId {
        let arena = self.arena();
        let u = arena.infer("U");
        let array_pattern = arena.array(u);
        let homomorphic = arena.mapped(MappedType::homomorphic());

        self.distribute(subject, |evaluator, member| {
            if evaluator.match_pattern(member, TypeId::OBJECT).is_some() {
                evaluator.evaluate_mapped(homomorphic, member)
            } else if let Some(bindings) = evaluator.match_pattern(member, array_pattern) {
                evaluator.instantiate(u, &bindings)
            } else {
                TypeId::NEVER
            }
        })
    }

    // =========================================================================
    // Mapped
    // =========================================================================

    fn apply_modifiers(
        &mut self,
        subject: TypeId,
        value: ValueTransform,
        optional_modifier: Option<MappedModifier>,
        readonly_modifier: Option<MappedModifier>,
    ) -> TypeId {
        self.map_fields(
            subject,
            MappedType {
                keys: KeyFilter::All,
                value,
                optional_modifier,
                readonly_modifier,
            },
        )
    }

    /// `Pick<T, K>`: the fields of `T` named in `keys`, in `T`'s order.
    ///
    /// Names that are not fields of `T` are ignored.
    pub fn pick(&mut self, subject: TypeId, keys: &[Atom]) -> TypeId {
        self.map_fields(
            subject,
            MappedType {
                keys: KeyFilter::Include(keys.to_vec()),
                ..MappedType::homomorphic()
            },
        )
    }

    /// `Omit<T, K>`: the fields of `T` not named in `keys`.
    pub fn omit(&mut self, subject: TypeId, keys: &[Atom]) -> TypeId {
        self.map_fields(
            subject,
            MappedType {
                keys: KeyFilter::Exclude(keys.to_vec()),
                ..MappedType::homomorphic()
            },
        )
    }

    /// `Pick<T, K>` with `K` given as a key type such as `"a" | "b"`.
    pub fn pick_by_key_type(&mut self, subject: TypeId, keys: TypeId) -> TypeId {
        let names = self.key_names(keys);
        self.pick(subject, &names)
    }

    /// `{ [P in Exclude<keyof T, K>]: T[P] }`
    pub fn omit_by_key_type(&mut self, subject: TypeId, keys: TypeId) -> TypeId {
        let all_keys = self.evaluate_keyof(subject);
        let remaining = self.exclude(all_keys, keys);
        let names = self.key_names(remaining);
        self.pick(subject, &names)
    }

    /// `Partial<T>`
    pub fn partial(&mut self, subject: TypeId) -> TypeId {
        self.apply_modifiers(subject, ValueTransform::Identity, Some(MappedModifier::Add), None)
    }

    /// `Required<T>`
    pub fn required(&mut self, subject: TypeId) -> TypeId {
        self.apply_modifiers(
            subject,
            ValueTransform::Identity,
            Some(MappedModifier::Remove),
            None,
        )
    }

    /// `Readonly<T>`
    pub fn readonly(&mut self, subject: TypeId) -> TypeId {
        self.apply_modifiers(subject, ValueTransform::Identity, None, Some(MappedModifier::Add))
    }

    /// `Partial<T>` applied to every nested object as well.
    pub fn deep_partial(&mut self, subject: TypeId) -> TypeId {
        self.apply_modifiers(subject, ValueTransform::Deep, Some(MappedModifier::Add), None)
    }

    pub fn deep_required(&mut self, subject: TypeId) -> TypeId {
        self.apply_modifiers(subject, ValueTransform::Deep, Some(MappedModifier::Remove), None)
    }

    pub fn deep_readonly(&mut self, subject: TypeId) -> TypeId {
        self.apply_modifiers(subject, ValueTransform::Deep, None, Some(MappedModifier::Add))
    }

    /// `Record<K, V>`: one required field of type `value` per key, in the
    /// order given. A repeated key keeps its first position.
    pub fn record(&mut self, keys: &[Atom], value: TypeId) -> TypeId {
        let mut seen = FxHashSet::default();
        let fields = keys
            .iter()
            .filter(|&&key| seen.insert(key))
            .map(|&key| FieldInfo::new(key, value))
            .collect();
        self.arena().object_unchecked(ObjectShape {
            fields,
            string_index: None,
        })
    }

    /// `keyof T`
    pub fn keyof(&mut self, subject: TypeId) -> TypeId {
        self.evaluate_keyof(subject)
    }

    /// `T[K]`
    pub fn index_access(&mut self, object: TypeId, index: TypeId) -> TypeId {
        self.evaluate_index_access(object, index)
    }
}
