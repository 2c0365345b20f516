//! Key operators: `keyof T` and indexed access `T[K]`.

use crate::evaluate::TypeEvaluator;
use crate::types::*;
use tyalg_common::interner::Atom;

impl<'a> TypeEvaluator<'a> {
    /// `keyof T`
    ///
    /// Object shapes yield the union of their field names as string literals
    /// (plus `string` for a string index signature). `keyof (A | B)` keeps only
    /// the keys common to every member; `keyof (A & B)` unions them.
    pub fn evaluate_keyof(&mut self, subject: TypeId) -> TypeId {
        let arena = self.arena();
        if subject == TypeId::ANY {
            return arena.union(vec![TypeId::STRING, TypeId::NUMBER, TypeId::SYMBOL]);
        }

        match arena.lookup(subject) {
            Some(TypeData::Object(shape_id)) => {
                let shape = arena.object_shape(shape_id);
                let mut keys: Vec<TypeId> = shape
                    .fields
                    .iter()
                    .map(|field| arena.intern(TypeData::Literal(LiteralValue::String(field.name))))
                    .collect();
                if shape.string_index.is_some() {
                    keys.push(TypeId::STRING);
                }
                arena.union(keys)
            }
            Some(TypeData::Union(list)) => {
                let members = arena.type_list(list);
                let mut common: Option<Vec<TypeId>> = None;
                for &member in members.iter() {
                    let keys = arena.union_members(self.evaluate_keyof(member));
                    common = Some(match common {
                        None => keys,
                        Some(mut acc) => {
                            acc.retain(|key| keys.contains(key));
                            acc
                        }
                    });
                }
                arena.union(common.unwrap_or_default())
            }
            Some(TypeData::Intersection(list)) => {
                let members = arena.type_list(list);
                let keys = members.iter().map(|&member| self.evaluate_keyof(member)).collect();
                arena.union(keys)
            }
            Some(TypeData::Array(_)) => TypeId::NUMBER,
            Some(TypeData::Tuple(list)) => {
                let elements = arena.tuple_list(list);
                let mut keys: Vec<TypeId> = (0..elements.len())
                    .map(|index| arena.literal_string(&index.to_string()))
                    .collect();
                keys.push(TypeId::NUMBER);
                arena.union(keys)
            }
            _ => TypeId::NEVER,
        }
    }

    /// `T[K]`
    ///
    /// Distributes over unions on either side. A missing key yields `never`;
    /// reading an optional field adds `undefined`.
    pub fn evaluate_index_access(&mut self, object: TypeId, index: TypeId) -> TypeId {
        if object == TypeId::ANY || index == TypeId::ANY {
            return TypeId::ANY;
        }
        self.distribute(index, |evaluator, key| {
            evaluator.distribute(object, |evaluator, member| evaluator.index_member(member, key))
        })
    }

    /// `T[keyof T]`
    pub fn value_of(&mut self, subject: TypeId) -> TypeId {
        let keys = self.evaluate_keyof(subject);
        self.evaluate_index_access(subject, keys)
    }

    fn index_member(&mut self, object: TypeId, key: TypeId) -> TypeId {
        let arena = self.arena();
        let key_data = arena.lookup(key);

        match arena.lookup(object) {
            Some(TypeData::Object(shape_id)) => {
                let shape = arena.object_shape(shape_id);
                match key_data {
                    Some(TypeData::Literal(LiteralValue::String(name))) => {
                        match shape.field(name) {
                            Some(field) if field.optional => {
                                arena.union2(field.type_id, TypeId::UNDEFINED)
                            }
                            Some(field) => field.type_id,
                            None => shape
                                .string_index
                                .as_ref()
                                .map_or(TypeId::NEVER, |index| index.value_type),
                        }
                    }
                    _ if key == TypeId::STRING => {
                        let mut values: Vec<TypeId> =
                            shape.fields.iter().map(|field| field.type_id).collect();
                        if let Some(index) = &shape.string_index {
                            values.push(index.value_type);
                        }
                        arena.union(values)
                    }
                    _ => TypeId::NEVER,
                }
            }
            Some(TypeData::Array(element)) => match key_data {
                _ if key == TypeId::NUMBER => element,
                Some(TypeData::Literal(LiteralValue::Number(_))) => element,
                _ => TypeId::NEVER,
            },
            Some(TypeData::Tuple(list)) => {
                let elements = arena.tuple_list(list);
                let position = match key_data {
                    Some(TypeData::Literal(LiteralValue::Number(value))) => Some(value.0),
                    Some(TypeData::Literal(LiteralValue::String(name))) => {
                        arena.resolve_atom(name).parse::<f64>().ok()
                    }
                    _ => None,
                };
                match position {
                    Some(position) if position >= 0.0 && position.fract() == 0.0 => {
                        elements
                            .get(position as usize)
                            .filter(|element| !element.rest)
                            .map_or(TypeId::NEVER, |element| element.type_id)
                    }
                    Some(_) => TypeId::NEVER,
                    None if key == TypeId::NUMBER => {
                        arena.union(elements.iter().map(|element| element.type_id).collect())
                    }
                    None => TypeId::NEVER,
                }
            }
            _ => TypeId::NEVER,
        }
    }

    /// The string-literal names in a key type such as `"a" | "b"`.
    ///
    /// Members that are not string literals are ignored.
    pub fn key_names(&self, keys: TypeId) -> Vec<Atom> {
        let arena = self.arena();
        arena
            .union_members(keys)
            .into_iter()
            .filter_map(|member| match arena.lookup(member) {
                Some(TypeData::Literal(LiteralValue::String(name))) => Some(name),
                _ => None,
            })
            .collect()
    }
}
