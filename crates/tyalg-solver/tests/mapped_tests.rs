use super::*;

struct Fixture {
    arena: TypeArena,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            arena: TypeArena::new(),
        }
    }

    fn atom(&self, name: &str) -> Atom {
        self.arena.intern_string(name)
    }

    /// `{ id: string; title?: string; readonly completed: boolean }`
    fn todo(&self) -> TypeId {
        self.arena
            .object(vec![
                FieldInfo::new(self.atom("id"), TypeId::STRING),
                FieldInfo::opt(self.atom("title"), TypeId::STRING),
                FieldInfo::readonly(self.atom("completed"), TypeId::BOOLEAN),
            ])
            .unwrap()
    }

    fn fields(&self, type_id: TypeId) -> Vec<(String, TypeId, bool, bool)> {
        let shape = self.arena.object_shape_of(type_id).expect("object shape");
        shape
            .fields
            .iter()
            .map(|f| {
                (
                    self.arena.resolve_atom(f.name).to_string(),
                    f.type_id,
                    f.optional,
                    f.readonly,
                )
            })
            .collect()
    }
}

#[test]
fn test_homomorphic_mapping_is_identity() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let todo = fx.todo();
    assert_eq!(evaluator.map_fields(todo, MappedType::homomorphic()), todo);
}

#[test]
fn test_key_filter_include_keeps_shape_order() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let mapped = MappedType {
        keys: KeyFilter::Include(vec![fx.atom("completed"), fx.atom("id")]),
        ..MappedType::homomorphic()
    };
    let result = evaluator.map_fields(fx.todo(), mapped);
    let names: Vec<String> = fx.fields(result).into_iter().map(|f| f.0).collect();
    assert_eq!(names, ["id", "completed"]);
}

#[test]
fn test_key_filter_exclude() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let mapped = MappedType {
        keys: KeyFilter::Exclude(vec![fx.atom("title")]),
        ..MappedType::homomorphic()
    };
    let result = evaluator.map_fields(fx.todo(), mapped);
    let names: Vec<String> = fx.fields(result).into_iter().map(|f| f.0).collect();
    assert_eq!(names, ["id", "completed"]);
}

#[test]
fn test_modifiers_apply_uniformly() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);

    let all_optional = evaluator.map_fields(
        fx.todo(),
        MappedType {
            optional_modifier: Some(MappedModifier::Add),
            ..MappedType::homomorphic()
        },
    );
    assert!(fx.fields(all_optional).iter().all(|f| f.2));

    let all_required = evaluator.map_fields(
        fx.todo(),
        MappedType {
            optional_modifier: Some(MappedModifier::Remove),
            readonly_modifier: Some(MappedModifier::Remove),
            ..MappedType::homomorphic()
        },
    );
    assert!(fx.fields(all_required).iter().all(|f| !f.2 && !f.3));

    let frozen = evaluator.map_fields(
        fx.todo(),
        MappedType {
            readonly_modifier: Some(MappedModifier::Add),
            ..MappedType::homomorphic()
        },
    );
    let fields = fx.fields(frozen);
    assert!(fields.iter().all(|f| f.3));
    assert_eq!(
        fields.iter().map(|f| f.2).collect::<Vec<_>>(),
        [false, true, false],
        "optionality untouched"
    );
}

#[test]
fn test_conditional_value_transform() {
    // { [K in keyof T]: T[K] extends string ? number : T[K] }
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let cond = fx.arena.conditional(ConditionalType {
        check_param: Some(fx.atom("T")),
        extends_type: TypeId::STRING,
        true_type: TypeId::NUMBER,
        false_type: fx.arena.type_param("T"),
        is_distributive: true,
    });
    let mapped = MappedType {
        value: ValueTransform::Conditional(cond),
        ..MappedType::homomorphic()
    };
    let result = evaluator.map_fields(fx.todo(), mapped);
    let types: Vec<TypeId> = fx.fields(result).into_iter().map(|f| f.1).collect();
    assert_eq!(types, [TypeId::NUMBER, TypeId::NUMBER, TypeId::BOOLEAN]);
}

#[test]
fn test_union_subject_distributes() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let a = fx.arena.object(vec![FieldInfo::new(fx.atom("a"), TypeId::STRING)]).unwrap();
    let b = fx.arena.object(vec![FieldInfo::new(fx.atom("b"), TypeId::NUMBER)]).unwrap();
    let partial = MappedType {
        optional_modifier: Some(MappedModifier::Add),
        ..MappedType::homomorphic()
    };

    let result = evaluator.map_fields(fx.arena.union2(a, b), partial.clone());
    let expected = fx.arena.union2(
        evaluator.map_fields(a, partial.clone()),
        evaluator.map_fields(b, partial),
    );
    assert_eq!(result, expected);
}

#[test]
fn test_non_object_subject_is_never() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    assert_eq!(evaluator.map_fields(TypeId::STRING, MappedType::homomorphic()), TypeId::NEVER);
    let pick = MappedType {
        keys: KeyFilter::Include(vec![fx.atom("length")]),
        ..MappedType::homomorphic()
    };
    assert_eq!(evaluator.map_fields(fx.arena.array(TypeId::STRING), pick), TypeId::NEVER);
}

#[test]
fn test_arrays_and_tuples_map_elementwise() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let array = fx.arena.array(TypeId::STRING);
    assert_eq!(evaluator.map_fields(array, MappedType::homomorphic()), array);

    let tuple = fx.arena.tuple(vec![
        TupleElement::required(TypeId::STRING),
        TupleElement::required(TypeId::NUMBER),
    ]);
    let partial = evaluator.map_fields(
        tuple,
        MappedType {
            optional_modifier: Some(MappedModifier::Add),
            ..MappedType::homomorphic()
        },
    );
    let elements = match fx.arena.lookup(partial) {
        Some(TypeData::Tuple(list)) => fx.arena.tuple_list(list),
        other => panic!("expected tuple, got {other:?}"),
    };
    assert!(elements.iter().all(|e| e.optional));
}

#[test]
fn test_string_index_signature_preserved() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let dict = fx
        .arena
        .object_with_index(ObjectShape {
            fields: vec![FieldInfo::new(fx.atom("size"), TypeId::NUMBER)],
            string_index: Some(IndexSignature {
                value_type: TypeId::NUMBER,
                readonly: false,
            }),
        })
        .unwrap();
    let frozen = evaluator.map_fields(
        dict,
        MappedType {
            readonly_modifier: Some(MappedModifier::Add),
            ..MappedType::homomorphic()
        },
    );
    let shape = fx.arena.object_shape_of(frozen).unwrap();
    assert_eq!(
        shape.string_index,
        Some(IndexSignature {
            value_type: TypeId::NUMBER,
            readonly: true,
        })
    );

    let picked = evaluator.map_fields(
        dict,
        MappedType {
            keys: KeyFilter::Include(vec![fx.atom("size")]),
            ..MappedType::homomorphic()
        },
    );
    assert_eq!(fx.arena.object_shape_of(picked).unwrap().string_index, None);
}

#[test]
fn test_deep_transform_reaches_nested_objects() {
    let fx = Fixture::new();
    let mut evaluator = TypeEvaluator::new(&fx.arena);
    let inner = fx
        .arena
        .object(vec![FieldInfo::new(fx.atom("street"), TypeId::STRING)])
        .unwrap();
    let outer = fx
        .arena
        .object(vec![
            FieldInfo::new(fx.atom("name"), TypeId::STRING),
            FieldInfo::new(fx.atom("address"), fx.arena.union2(inner, TypeId::NULL)),
        ])
        .unwrap();
    let deep = MappedType {
        value: ValueTransform::Deep,
        optional_modifier: Some(MappedModifier::Add),
        ..MappedType::homomorphic()
    };
    let result = evaluator.map_fields(outer, deep);

    let fields = fx.fields(result);
    assert!(fields.iter().all(|f| f.2));
    let address = fields[1].1;
    let members = fx.arena.union_members(address);
    assert!(members.contains(&TypeId::NULL));
    let nested = members
        .iter()
        .copied()
        .find(|&m| m != TypeId::NULL)
        .unwrap();
    assert!(fx.fields(nested).iter().all(|f| f.2), "nested object is partial too");
}
