//! Mapped type evaluation.
//!
//! Handles `{ [P in keyof T]?: T[P] }` style transforms over an existing
//! shape, including:
//! - key filtering (Pick, Omit)
//! - `+?`/`-?` and `+readonly`/`-readonly` modifiers
//! - per-field conditional transforms
//! - deep (recursive) application to nested objects

use crate::evaluate::{OpKey, TypeEvaluator};
use crate::types::*;
use tracing::{Level, span, trace};

impl<'a> TypeEvaluator<'a> {
    /// Apply an interned mapped type to `subject`.
    ///
    /// Union subjects distribute. Subjects that are neither objects nor (for
    /// key-preserving mapped types) arrays and tuples evaluate to `never`.
    pub fn evaluate_mapped(&mut self, mapped_id: MappedTypeId, subject: TypeId) -> TypeId {
        let _span = span!(
            Level::TRACE,
            "evaluate_mapped",
            mapped = mapped_id.0,
            subject = subject.0
        )
        .entered();

        self.distribute(subject, |evaluator, member| {
            evaluator.evaluate_mapped_member(mapped_id, member)
        })
    }

    /// Build `mapped` and apply it.
    pub fn map_fields(&mut self, subject: TypeId, mapped: MappedType) -> TypeId {
        let mapped_id = self.arena().mapped(mapped);
        self.evaluate_mapped(mapped_id, subject)
    }

    fn evaluate_mapped_member(&mut self, mapped_id: MappedTypeId, subject: TypeId) -> TypeId {
        let key = (OpKey::Mapped(mapped_id), subject);
        self.memoized(key, |evaluator| {
            let mapped = evaluator.arena().mapped_type(mapped_id);
            let deep = matches!(mapped.value, ValueTransform::Deep);
            if deep {
                evaluator.open_fixed_point(key);
            }
            let result = evaluator.map_structure(mapped_id, &mapped, subject);
            if deep {
                evaluator.close_fixed_point(key, result)
            } else {
                result
            }
        })
    }

    fn map_structure(&mut self, mapped_id: MappedTypeId, mapped: &MappedType, subject: TypeId) -> TypeId {
        let arena = self.arena();
        match arena.lookup(subject) {
            Some(TypeData::Object(shape_id)) => {
                let shape = arena.object_shape(shape_id);
                let shape = self.map_shape(mapped_id, mapped, &shape);
                arena.object_unchecked(shape)
            }
            Some(TypeData::Array(element)) if mapped.keys == KeyFilter::All => {
                let element = self.map_value(mapped_id, mapped, element);
                arena.array(element)
            }
            Some(TypeData::Tuple(list)) if mapped.keys == KeyFilter::All => {
                let elements = arena.tuple_list(list);
                let elements = elements
                    .iter()
                    .map(|element| TupleElement {
                        type_id: self.map_value(mapped_id, mapped, element.type_id),
                        optional: !element.rest
                            && MappedModifier::apply(mapped.optional_modifier, element.optional),
                        ..element.clone()
                    })
                    .collect();
                arena.tuple(elements)
            }
            _ => {
                trace!(subject = subject.0, "mapped type over non-object");
                TypeId::NEVER
            }
        }
    }

    fn map_shape(&mut self, mapped_id: MappedTypeId, mapped: &MappedType, shape: &ObjectShape) -> ObjectShape {
        let mut fields = Vec::with_capacity(shape.fields.len());
        for field in &shape.fields {
            if !mapped.keys.accepts(field.name) {
                continue;
            }
            fields.push(FieldInfo {
                name: field.name,
                type_id: self.map_value(mapped_id, mapped, field.type_id),
                optional: MappedModifier::apply(mapped.optional_modifier, field.optional),
                readonly: MappedModifier::apply(mapped.readonly_modifier, field.readonly),
            });
        }

        let string_index = match (&shape.string_index, &mapped.keys) {
            (Some(index), KeyFilter::All | KeyFilter::Exclude(_)) => Some(IndexSignature {
                value_type: self.map_value(mapped_id, mapped, index.value_type),
                readonly: MappedModifier::apply(mapped.readonly_modifier, index.readonly),
            }),
            _ => None,
        };

        ObjectShape {
            fields,
            string_index,
        }
    }

    fn map_value(&mut self, mapped_id: MappedTypeId, mapped: &MappedType, value: TypeId) -> TypeId {
        match mapped.value {
            ValueTransform::Identity => value,
            ValueTransform::Conditional(cond_id) => self.evaluate_conditional(cond_id, value),
            ValueTransform::Deep => {
                // Only object-shaped members recurse; everything else passes through.
                self.distribute(value, |evaluator, member| {
                    match evaluator.arena().lookup(member) {
                        Some(TypeData::Object(_) | TypeData::Array(_) | TypeData::Tuple(_)) => {
                            evaluator.evaluate_mapped_member(mapped_id, member)
                        }
                        _ => member,
                    }
                })
            }
        }
    }
}
