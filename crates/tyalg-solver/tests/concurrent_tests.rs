//! One shared arena, one evaluator per thread.

use super::*;
use rayon::prelude::*;

fn shape(arena: &TypeArena, index: usize) -> TypeId {
    let names = arena.atoms(&["id", "payload", "meta"]);
    let payload = if index % 2 == 0 {
        arena.array(TypeId::STRING)
    } else {
        arena.union2(TypeId::NUMBER, TypeId::NULL)
    };
    arena
        .object(vec![
            FieldInfo::new(names[0], arena.literal_number(index as f64)),
            FieldInfo::opt(names[1], payload),
            FieldInfo::readonly(names[2], TypeId::BOOLEAN),
        ])
        .unwrap()
}

#[test]
fn test_parallel_interning_agrees() {
    let arena = TypeArena::new();
    let ids: Vec<TypeId> = (0..256)
        .into_par_iter()
        .map(|index| shape(&arena, index % 16))
        .collect();
    for (index, id) in ids.iter().enumerate() {
        assert_eq!(*id, shape(&arena, index % 16));
    }
}

#[test]
fn test_parallel_evaluators_agree_with_sequential() {
    let arena = TypeArena::new();
    let subjects: Vec<TypeId> = (0..64).map(|index| shape(&arena, index)).collect();

    let sequential: Vec<(TypeId, TypeId, TypeId)> = {
        let mut evaluator = TypeEvaluator::new(&arena);
        subjects
            .iter()
            .map(|&subject| {
                let partial = evaluator.partial(subject);
                let payload = evaluator.index_access(subject, arena.literal_string("payload"));
                let element = evaluator.infer_array(payload);
                (partial, payload, element)
            })
            .collect()
    };

    let parallel: Vec<(TypeId, TypeId, TypeId)> = subjects
        .par_iter()
        .map_init(
            || TypeEvaluator::new(&arena),
            |evaluator, &subject| {
                let partial = evaluator.partial(subject);
                let payload = evaluator.index_access(subject, arena.literal_string("payload"));
                let element = evaluator.infer_array(payload);
                (partial, payload, element)
            },
        )
        .collect();

    assert_eq!(parallel, sequential);
}

#[test]
fn test_parallel_recursive_evaluation() {
    let arena = TypeArena::new();
    let [value, children] = [arena.intern_string("value"), arena.intern_string("children")];
    let node = arena.reserve();
    arena
        .define_object(
            node,
            vec![
                FieldInfo::new(value, TypeId::STRING),
                FieldInfo::new(children, arena.array(node)),
            ],
        )
        .unwrap();

    let results: Vec<TypeId> = (0..8)
        .into_par_iter()
        .map(|_| TypeEvaluator::new(&arena).deep_readonly(node))
        .collect();

    for result in results {
        let shape = arena.object_shape_of(result).unwrap();
        assert!(shape.fields.iter().all(|f| f.readonly));
        let child_list = shape.field(children).unwrap().type_id;
        assert_eq!(child_list, arena.array(result), "each result closes its own cycle");
    }
}
