//! Conditional type evaluation: distribution, branch substitution and memoization.

use super::*;

// =============================================================================
// Basic conditionals
// =============================================================================

#[test]
fn test_conditional_true_and_false_branch() {
    // Check<T> = T extends string ? boolean : number
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);

    let check = |evaluator: &mut TypeEvaluator<'_>, subject| {
        evaluator.resolve_conditional(subject, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, true)
    };
    assert_eq!(check(&mut evaluator, TypeId::STRING), TypeId::BOOLEAN);
    assert_eq!(check(&mut evaluator, TypeId::NUMBER), TypeId::NUMBER);
}

#[test]
fn test_distribution_over_union() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let subject = arena.union2(TypeId::STRING, TypeId::NUMBER);

    let distributed =
        evaluator.resolve_conditional(subject, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, true);
    assert_eq!(distributed, arena.union2(TypeId::BOOLEAN, TypeId::NUMBER));

    let whole =
        evaluator.resolve_conditional(subject, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, false);
    assert_eq!(whole, TypeId::NUMBER, "string | number does not extend string as a whole");
}

#[test]
fn test_distribution_over_never_is_never() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let result =
        evaluator.resolve_conditional(TypeId::NEVER, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, true);
    assert_eq!(result, TypeId::NEVER);

    // Without distribution `never` is just a subject that matches everything.
    let result =
        evaluator.resolve_conditional(TypeId::NEVER, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, false);
    assert_eq!(result, TypeId::BOOLEAN);
}

#[test]
fn test_exclude_falsy() {
    // ExcludeFalsy<T> = T extends false | null | undefined ? never : T
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let t = arena.intern_string("T");
    let falsy = arena.union(vec![arena.literal_boolean(false), TypeId::NULL, TypeId::UNDEFINED]);
    let cond = arena.conditional(ConditionalType {
        check_param: Some(t),
        extends_type: falsy,
        true_type: TypeId::NEVER,
        false_type: arena.type_param("T"),
        is_distributive: true,
    });

    let subject = arena.union(vec![
        TypeId::STRING,
        TypeId::NULL,
        TypeId::UNDEFINED,
        arena.literal_boolean(false),
    ]);
    assert_eq!(evaluator.evaluate_conditional(cond, subject), TypeId::STRING);
}

// =============================================================================
// Infer bindings in branches
// =============================================================================

#[test]
fn test_extract_array_element() {
    // ExtractType<T> = T extends Array<infer U> ? U : never
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let u = arena.infer("U");
    let pattern = arena.array(u);

    let result = evaluator.resolve_conditional(arena.array(TypeId::STRING), pattern, u, TypeId::NEVER, true);
    assert_eq!(result, TypeId::STRING);

    let result = evaluator.resolve_conditional(TypeId::STRING, pattern, u, TypeId::NEVER, true);
    assert_eq!(result, TypeId::NEVER);
}

#[test]
fn test_true_branch_template_is_rebuilt() {
    // T extends Promise<infer U> ? U[] : never
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let u = arena.infer("U");
    let pattern = arena.wrapper(WrapperKind::Promise, vec![u]).unwrap();
    let template = arena.array(u);

    let promise = arena.wrapper(WrapperKind::Promise, vec![TypeId::NUMBER]).unwrap();
    let result = evaluator.resolve_conditional(promise, pattern, template, TypeId::NEVER, true);
    assert_eq!(result, arena.array(TypeId::NUMBER));
}

#[test]
fn test_unbound_infer_substitutes_never() {
    // T extends AsyncIterator<any, infer U> ? U : never, with no return slot
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let u = arena.infer("U");
    let pattern = arena
        .wrapper(WrapperKind::AsyncIterator, vec![TypeId::ANY, u])
        .unwrap();
    let subject = arena.wrapper(WrapperKind::AsyncIterator, vec![TypeId::STRING]).unwrap();
    let result = evaluator.resolve_conditional(subject, pattern, u, TypeId::STRING, true);
    assert_eq!(result, TypeId::NEVER);
}

#[test]
fn test_false_branch_sees_check_param_only() {
    // T extends string ? T[] : [T]
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let t = arena.type_param("T");
    let cond = arena.conditional(ConditionalType {
        check_param: Some(arena.intern_string("T")),
        extends_type: TypeId::STRING,
        true_type: arena.array(t),
        false_type: arena.tuple(vec![TupleElement::required(t)]),
        is_distributive: true,
    });

    let subject = arena.union2(TypeId::STRING, TypeId::NUMBER);
    let expected = arena.union2(
        arena.array(TypeId::STRING),
        arena.tuple(vec![TupleElement::required(TypeId::NUMBER)]),
    );
    assert_eq!(evaluator.evaluate_conditional(cond, subject), expected);
}

#[test]
fn test_caller_type_parameters_survive_substitution() {
    // string extends number ? never : { value: X }, X owned by the caller
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let x = arena.type_param("X");
    let value = arena.intern_string("value");
    let node = arena.object(vec![FieldInfo::new(value, x)]).unwrap();

    let when_false =
        evaluator.resolve_conditional(TypeId::STRING, TypeId::NUMBER, TypeId::NEVER, node, false);
    assert_eq!(when_false, node);

    let when_true =
        evaluator.resolve_conditional(TypeId::STRING, TypeId::STRING, node, TypeId::NEVER, false);
    assert_eq!(when_true, node);

    // Binding `T` leaves an unrelated `X` in the same branch alone.
    let t = arena.type_param("T");
    let pair = arena.tuple(vec![TupleElement::required(t), TupleElement::required(x)]);
    let cond = arena.conditional(ConditionalType {
        check_param: Some(arena.intern_string("T")),
        extends_type: TypeId::STRING,
        true_type: pair,
        false_type: TypeId::NEVER,
        is_distributive: true,
    });
    let expected = arena.tuple(vec![
        TupleElement::required(TypeId::STRING),
        TupleElement::required(x),
    ]);
    assert_eq!(evaluator.evaluate_conditional(cond, TypeId::STRING), expected);
}

#[test]
fn test_any_subject_takes_both_branches() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let result =
        evaluator.resolve_conditional(TypeId::ANY, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, true);
    assert_eq!(result, arena.union2(TypeId::BOOLEAN, TypeId::NUMBER));

    // Against a top pattern only the true branch applies.
    let top =
        evaluator.resolve_conditional(TypeId::ANY, TypeId::UNKNOWN, TypeId::BOOLEAN, TypeId::NUMBER, true);
    assert_eq!(top, TypeId::BOOLEAN);
}

#[test]
fn test_any_subject_binds_infer_to_any() {
    // any extends Promise<infer U> ? U[] : "no"
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let u = arena.infer("U");
    let pattern = arena.wrapper(WrapperKind::Promise, vec![u]).unwrap();
    let no = arena.literal_string("no");
    let result = evaluator.resolve_conditional(TypeId::ANY, pattern, arena.array(u), no, false);
    assert_eq!(result, arena.union2(arena.array(TypeId::ANY), no));
}

// =============================================================================
// Chaining and memoization
// =============================================================================

#[test]
fn test_chained_conditional_via_distribute() {
    // T extends string ? "s" : T extends number ? "n" : "other"
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let s = arena.literal_string("s");
    let n = arena.literal_string("n");
    let other = arena.literal_string("other");

    let subject = arena.union(vec![TypeId::STRING, TypeId::NUMBER, TypeId::NULL]);
    let result = evaluator.distribute(subject, |evaluator, member| {
        if evaluator.match_pattern(member, TypeId::STRING).is_some() {
            s
        } else if evaluator.match_pattern(member, TypeId::NUMBER).is_some() {
            n
        } else {
            other
        }
    });
    assert_eq!(result, arena.union(vec![s, n, other]));
}

#[test]
fn test_results_are_memoized() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let u = arena.infer("U");
    let pattern = arena.array(u);
    let subject = arena.array(TypeId::STRING);

    let first = evaluator.resolve_conditional(subject, pattern, u, TypeId::NEVER, false);
    let cached = evaluator.cache_len();
    assert_eq!(cached, 1);

    let second = evaluator.resolve_conditional(subject, pattern, u, TypeId::NEVER, false);
    assert_eq!(first, second);
    assert_eq!(evaluator.cache_len(), cached, "second evaluation is a cache hit");

    evaluator.clear_cache();
    assert_eq!(evaluator.cache_len(), 0);
}

#[test]
fn test_distributive_memo_is_per_member() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let subject = arena.union(vec![TypeId::STRING, TypeId::NUMBER, TypeId::BOOLEAN]);
    evaluator.resolve_conditional(subject, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, true);
    assert_eq!(evaluator.cache_len(), 3);

    // A subset reuses the member entries.
    let smaller = arena.union2(TypeId::STRING, TypeId::NUMBER);
    evaluator.resolve_conditional(smaller, TypeId::STRING, TypeId::BOOLEAN, TypeId::NUMBER, true);
    assert_eq!(evaluator.cache_len(), 3);
}

#[test]
fn test_reentrant_evaluation_yields_never_sentinel() {
    let arena = TypeArena::new();
    let mut evaluator = TypeEvaluator::new(&arena);
    let cond = arena.conditional(ConditionalType {
        check_param: None,
        extends_type: TypeId::STRING,
        true_type: TypeId::BOOLEAN,
        false_type: TypeId::NUMBER,
        is_distributive: false,
    });
    let key = (OpKey::Conditional(cond), TypeId::STRING);

    let mut inner = None;
    let outer = evaluator.memoized(key, |evaluator| {
        inner = Some(evaluator.evaluate_conditional(cond, TypeId::STRING));
        TypeId::BOOLEAN
    });
    assert_eq!(inner, Some(TypeId::NEVER));
    assert_eq!(outer, TypeId::BOOLEAN);
    assert_eq!(evaluator.evaluate_conditional(cond, TypeId::STRING), TypeId::BOOLEAN);
}

#[test]
fn test_free_function_wrappers() {
    let arena = TypeArena::new();
    let cond = arena.conditional(ConditionalType {
        check_param: None,
        extends_type: TypeId::STRING,
        true_type: TypeId::BOOLEAN,
        false_type: TypeId::NUMBER,
        is_distributive: true,
    });
    assert_eq!(evaluate_conditional(&arena, cond, TypeId::STRING), TypeId::BOOLEAN);

    let [a, b] = [arena.intern_string("a"), arena.intern_string("b")];
    let obj = arena
        .object(vec![FieldInfo::new(a, TypeId::STRING), FieldInfo::new(b, TypeId::NUMBER)])
        .unwrap();
    let mapped = arena.mapped(MappedType {
        keys: KeyFilter::Include(vec![b]),
        ..MappedType::homomorphic()
    });
    let expected = arena.object(vec![FieldInfo::new(b, TypeId::NUMBER)]).unwrap();
    assert_eq!(evaluate_mapped(&arena, mapped, obj), expected);
}
