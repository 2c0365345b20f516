//! Self-referential descriptors built with `reserve`/`define`.

use super::*;

/// `Tree = { value: number; left?: Tree; right?: Tree }`
fn tree(arena: &TypeArena) -> TypeId {
    let [value, left, right] = [
        arena.intern_string("value"),
        arena.intern_string("left"),
        arena.intern_string("right"),
    ];
    let tree = arena.reserve();
    arena
        .define_object(
            tree,
            vec![
                FieldInfo::new(value, TypeId::NUMBER),
                FieldInfo::opt(left, tree),
                FieldInfo::opt(right, tree),
            ],
        )
        .unwrap();
    tree
}

fn field_type(arena: &TypeArena, object: TypeId, name: &str) -> TypeId {
    let shape = arena.object_shape_of(object).expect("object");
    shape
        .field(arena.intern_string(name))
        .map(|field| field.type_id)
        .unwrap_or_else(|| panic!("no field {name}"))
}

#[test]
fn test_pick_on_recursive_type() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let picked = evaluator.pick(tree(&arena), &arena.atoms(&["value"]));
    let expected = arena
        .object(vec![FieldInfo::new(arena.intern_string("value"), TypeId::NUMBER)])
        .unwrap();
    assert_eq!(picked, expected);
}

#[test]
fn test_omit_keeps_self_reference() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let tree = tree(&arena);
    let omitted = evaluator.omit(tree, &arena.atoms(&["right"]));
    assert_eq!(field_type(&arena, omitted, "left"), tree);
}

#[test]
fn test_recursive_pattern_infers_leaf() {
    // T extends LinkedList<infer U> ? U : never
    // where LinkedList<U> = { value: U; next?: LinkedList<U> }
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let [value, next] = [arena.intern_string("value"), arena.intern_string("next")];

    let list_of_strings = arena.reserve();
    arena
        .define_object(
            list_of_strings,
            vec![
                FieldInfo::new(value, TypeId::STRING),
                FieldInfo::opt(next, list_of_strings),
            ],
        )
        .unwrap();

    let u = arena.infer("U");
    let pattern = arena.reserve();
    arena
        .define_object(pattern, vec![FieldInfo::new(value, u), FieldInfo::opt(next, pattern)])
        .unwrap();

    assert_eq!(
        evaluator.resolve_conditional(list_of_strings, pattern, u, TypeId::NEVER, true),
        TypeId::STRING
    );

    let broken = arena
        .object(vec![
            FieldInfo::new(value, TypeId::STRING),
            FieldInfo::opt(next, TypeId::NUMBER),
        ])
        .unwrap();
    assert_eq!(
        evaluator.resolve_conditional(broken, pattern, u, TypeId::NEVER, true),
        TypeId::NEVER,
        "`next` is not a list"
    );
}

#[test]
fn test_recursive_template_is_rebuilt_with_bindings() {
    // T extends Promise<infer U> ? List<U> : never
    // where List<U> = { value: U; next?: List<U> }
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let [value, next] = [arena.intern_string("value"), arena.intern_string("next")];

    let u = arena.infer("U");
    let template = arena.reserve();
    arena
        .define_object(template, vec![FieldInfo::new(value, u), FieldInfo::opt(next, template)])
        .unwrap();
    let pattern = arena.wrapper(WrapperKind::Promise, vec![u]).unwrap();
    let subject = arena.wrapper(WrapperKind::Promise, vec![TypeId::BOOLEAN]).unwrap();

    let list = evaluator.resolve_conditional(subject, pattern, template, TypeId::NEVER, true);
    assert_ne!(list, template);
    assert_eq!(field_type(&arena, list, "value"), TypeId::BOOLEAN);
    assert_eq!(field_type(&arena, list, "next"), list, "cycle survives substitution");
}

#[test]
fn test_deep_partial_of_tree_is_self_referential() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let tree = tree(&arena);
    let partial = evaluator.deep_partial(tree);

    let shape = arena.object_shape_of(partial).unwrap();
    assert!(shape.fields.iter().all(|f| f.optional));
    assert_eq!(field_type(&arena, partial, "left"), partial);
    assert_eq!(field_type(&arena, partial, "right"), partial);
    assert_eq!(evaluator.deep_partial(tree), partial, "memoized");
}

#[test]
fn test_deep_readonly_of_mutually_recursive_types() {
    // A = { b: B }, B = { a: A; label: string }
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let [a_name, b_name, label] = [
        arena.intern_string("a"),
        arena.intern_string("b"),
        arena.intern_string("label"),
    ];
    let a = arena.reserve();
    let b = arena.reserve();
    arena.define_object(a, vec![FieldInfo::new(b_name, b)]).unwrap();
    arena
        .define_object(
            b,
            vec![FieldInfo::new(a_name, a), FieldInfo::new(label, TypeId::STRING)],
        )
        .unwrap();

    let frozen = evaluator.deep_readonly(a);
    let frozen_b = field_type(&arena, frozen, "b");
    assert_eq!(field_type(&arena, frozen_b, "a"), frozen);
    assert_eq!(field_type(&arena, frozen_b, "label"), TypeId::STRING);

    let shape_b = arena.object_shape_of(frozen_b).unwrap();
    assert!(shape_b.fields.iter().all(|f| f.readonly));
}

#[test]
fn test_deep_required_passes_through_unions() {
    // Node = { next?: Node | null; tag?: string }
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let [next, tag] = [arena.intern_string("next"), arena.intern_string("tag")];
    let node = arena.reserve();
    arena
        .define_object(
            node,
            vec![
                FieldInfo::opt(next, arena.union2(node, TypeId::NULL)),
                FieldInfo::opt(tag, TypeId::STRING),
            ],
        )
        .unwrap();

    let required = evaluator.deep_required(node);
    let shape = arena.object_shape_of(required).unwrap();
    assert!(shape.fields.iter().all(|f| !f.optional));
    assert_eq!(
        field_type(&arena, required, "next"),
        arena.union2(required, TypeId::NULL)
    );
}

#[test]
fn test_conditional_over_recursive_subject_terminates() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let tree = tree(&arena);
    assert_eq!(evaluator.keyof(tree), evaluator.keyof(tree));
    assert_eq!(evaluator.extract(tree, TypeId::OBJECT), tree);
    assert_eq!(evaluator.infer_object(tree), arena.union2(TypeId::NUMBER, tree));
}
