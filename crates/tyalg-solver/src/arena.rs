//! Descriptor arena with structural interning.
//!
//! Every descriptor lives in a `TypeArena` and is referred to by `TypeId`.
//! Ordinary construction is hash-consed: building the same structure twice
//! yields the same id, so descriptor equality is id equality.
//!
//! Self-referential descriptors use a two-phase build: [`TypeArena::reserve`]
//! hands out a placeholder id that other descriptors may reference, and
//! [`TypeArena::define`] fills its body exactly once. Placeholders are never
//! hash-consed; they have identity semantics. Because interned descriptors are
//! built bottom-up, every cycle in the graph passes through a placeholder.
//!
//! The arena is append-only and `Sync`: evaluation on several threads can
//! intern new descriptors into the same arena concurrently.

use crate::error::DescriptorError;
use crate::types::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use tyalg_common::interner::{Atom, ShardedInterner};

const TYPE_LIST_INLINE: usize = 8;

type TypeListBuffer = SmallVec<[TypeId; TYPE_LIST_INLINE]>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PrimitiveClass {
    String,
    Number,
    Boolean,
    Bigint,
    Symbol,
    Null,
    Undefined,
}

struct SliceInterner<T> {
    items: Vec<Arc<[T]>>,
    map: FxHashMap<Arc<[T]>, u32>,
}

impl<T> SliceInterner<T>
where
    T: Eq + Hash,
{
    fn new() -> Self {
        let empty: Arc<[T]> = Arc::from(Vec::new());
        let mut map = FxHashMap::default();
        map.insert(empty.clone(), 0);
        SliceInterner {
            items: vec![empty],
            map,
        }
    }

    fn intern(&mut self, items: Vec<T>) -> u32 {
        if items.is_empty() {
            return 0;
        }
        if let Some(&id) = self.map.get(items.as_slice()) {
            return id;
        }
        let arc: Arc<[T]> = items.into();
        let id = self.items.len() as u32;
        self.items.push(arc.clone());
        self.map.insert(arc, id);
        id
    }

    fn get(&self, id: u32) -> Arc<[T]> {
        self.items
            .get(id as usize)
            .cloned()
            .unwrap_or_else(|| self.items[0].clone())
    }
}

struct ValueInterner<T> {
    items: Vec<Arc<T>>,
    map: FxHashMap<Arc<T>, u32>,
}

impl<T> ValueInterner<T>
where
    T: Eq + Hash,
{
    fn new() -> Self {
        ValueInterner {
            items: Vec::new(),
            map: FxHashMap::default(),
        }
    }

    fn intern(&mut self, value: T) -> u32 {
        if let Some(&id) = self.map.get(&value) {
            return id;
        }
        let arc = Arc::new(value);
        let id = self.items.len() as u32;
        self.items.push(arc.clone());
        self.map.insert(arc, id);
        id
    }

    fn get(&self, id: u32) -> Option<Arc<T>> {
        self.items.get(id as usize).cloned()
    }
}

#[derive(Clone, Debug)]
enum Slot {
    Interned(TypeData),
    Reserved(Option<TypeData>),
}

/// Storage for type descriptors.
pub struct TypeArena {
    key_to_id: DashMap<TypeData, TypeId, FxBuildHasher>,
    slots: RwLock<Vec<Slot>>,
    string_interner: ShardedInterner,
    type_lists: RwLock<SliceInterner<TypeId>>,
    tuple_lists: RwLock<SliceInterner<TupleElement>>,
    object_shapes: RwLock<ValueInterner<ObjectShape>>,
    function_shapes: RwLock<ValueInterner<FunctionShape>>,
    conditional_types: RwLock<ValueInterner<ConditionalType>>,
    mapped_types: RwLock<ValueInterner<MappedType>>,
}

impl TypeArena {
    /// Create an arena with every intrinsic pre-registered at its fixed id.
    pub fn new() -> Self {
        let key_to_id = DashMap::with_hasher(FxBuildHasher);
        let mut slots = Vec::with_capacity(256);
        for kind in IntrinsicKind::ALL {
            let data = TypeData::Intrinsic(kind);
            key_to_id.insert(data.clone(), kind.type_id());
            slots.push(Slot::Interned(data));
        }

        let string_interner = ShardedInterner::new();
        string_interner.intern_common();

        TypeArena {
            key_to_id,
            slots: RwLock::new(slots),
            string_interner,
            type_lists: RwLock::new(SliceInterner::new()),
            tuple_lists: RwLock::new(SliceInterner::new()),
            object_shapes: RwLock::new(ValueInterner::new()),
            function_shapes: RwLock::new(ValueInterner::new()),
            conditional_types: RwLock::new(ValueInterner::new()),
            mapped_types: RwLock::new(ValueInterner::new()),
        }
    }

    // =========================================================================
    // Names
    // =========================================================================

    pub fn intern_string(&self, s: &str) -> Atom {
        self.string_interner.intern(s)
    }

    pub fn resolve_atom(&self, atom: Atom) -> Arc<str> {
        self.string_interner.resolve(atom)
    }

    /// Intern a list of key names, preserving order.
    pub fn atoms(&self, names: &[&str]) -> Vec<Atom> {
        names.iter().map(|name| self.intern_string(name)).collect()
    }

    // =========================================================================
    // Core intern / lookup
    // =========================================================================

    /// Intern a `TypeData`, returning the existing id if the same structure
    /// was interned before.
    pub fn intern(&self, key: TypeData) -> TypeId {
        if let TypeData::Intrinsic(kind) = key {
            return kind.type_id();
        }

        if let Some(id) = self.key_to_id.get(&key) {
            return *id;
        }

        match self.key_to_id.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let mut slots = self.slots.write().expect("arena slots lock poisoned");
                let id = TypeId(slots.len() as u32);
                slots.push(Slot::Interned(entry.key().clone()));
                entry.insert(id);
                id
            }
        }
    }

    /// Look up the structure behind an id.
    ///
    /// Returns `None` for ids that do not belong to this arena and for
    /// placeholders that have not been defined yet.
    pub fn lookup(&self, id: TypeId) -> Option<TypeData> {
        let slots = self.slots.read().expect("arena slots lock poisoned");
        match slots.get(id.0 as usize)? {
            Slot::Interned(data) | Slot::Reserved(Some(data)) => Some(data.clone()),
            Slot::Reserved(None) => None,
        }
    }

    /// Read accessor that distinguishes foreign ids from undefined placeholders.
    pub fn resolve(&self, id: TypeId) -> Result<TypeData, DescriptorError> {
        let slots = self.slots.read().expect("arena slots lock poisoned");
        match slots.get(id.0 as usize) {
            Some(Slot::Interned(data) | Slot::Reserved(Some(data))) => Ok(data.clone()),
            Some(Slot::Reserved(None)) => Err(DescriptorError::Undefined(id)),
            None => Err(DescriptorError::UnknownType(id)),
        }
    }

    /// Whether `id` was created by [`reserve`](Self::reserve).
    pub fn is_reserved(&self, id: TypeId) -> bool {
        let slots = self.slots.read().expect("arena slots lock poisoned");
        matches!(slots.get(id.0 as usize), Some(Slot::Reserved(_)))
    }

    /// Total number of descriptor slots, intrinsics and placeholders included.
    pub fn len(&self) -> usize {
        self.slots.read().expect("arena slots lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= IntrinsicKind::ALL.len()
    }

    // =========================================================================
    // Two-phase construction
    // =========================================================================

    /// Allocate a placeholder id whose body is supplied later via
    /// [`define`](Self::define).
    pub fn reserve(&self) -> TypeId {
        let mut slots = self.slots.write().expect("arena slots lock poisoned");
        let id = TypeId(slots.len() as u32);
        slots.push(Slot::Reserved(None));
        id
    }

    /// Fill a placeholder created by [`reserve`](Self::reserve).
    pub fn define(&self, id: TypeId, data: TypeData) -> Result<(), DescriptorError> {
        let mut slots = self.slots.write().expect("arena slots lock poisoned");
        match slots.get_mut(id.0 as usize) {
            Some(slot @ Slot::Reserved(None)) => {
                *slot = Slot::Reserved(Some(data));
                Ok(())
            }
            Some(Slot::Reserved(Some(_))) => Err(DescriptorError::AlreadyDefined(id)),
            Some(Slot::Interned(_)) => Err(DescriptorError::NotReserved(id)),
            None => Err(DescriptorError::UnknownType(id)),
        }
    }

    /// Fill a placeholder with an object shape; fields may reference `id`.
    pub fn define_object(&self, id: TypeId, fields: Vec<FieldInfo>) -> Result<(), DescriptorError> {
        self.define_object_with_index(
            id,
            ObjectShape {
                fields,
                string_index: None,
            },
        )
    }

    pub fn define_object_with_index(
        &self,
        id: TypeId,
        shape: ObjectShape,
    ) -> Result<(), DescriptorError> {
        self.check_unique_fields(&shape.fields)?;
        let shape_id = self.intern_object_shape(shape);
        self.define(id, TypeData::Object(shape_id))
    }

    // =========================================================================
    // Interned component accessors
    // =========================================================================

    pub fn type_list(&self, id: TypeListId) -> Arc<[TypeId]> {
        let lists = self.type_lists.read().expect("type_lists lock poisoned");
        lists.get(id.0)
    }

    pub fn tuple_list(&self, id: TupleListId) -> Arc<[TupleElement]> {
        let lists = self.tuple_lists.read().expect("tuple_lists lock poisoned");
        lists.get(id.0)
    }

    pub fn object_shape(&self, id: ObjectShapeId) -> Arc<ObjectShape> {
        let shapes = self.object_shapes.read().expect("object_shapes lock poisoned");
        shapes.get(id.0).unwrap_or_else(|| Arc::new(ObjectShape::default()))
    }

    pub fn function_shape(&self, id: FunctionShapeId) -> Arc<FunctionShape> {
        let shapes = self
            .function_shapes
            .read()
            .expect("function_shapes lock poisoned");
        shapes
            .get(id.0)
            .unwrap_or_else(|| Arc::new(FunctionShape::new(Vec::new(), TypeId::NEVER)))
    }

    pub fn conditional_type(&self, id: ConditionalTypeId) -> Arc<ConditionalType> {
        let types = self
            .conditional_types
            .read()
            .expect("conditional_types lock poisoned");
        types.get(id.0).unwrap_or_else(|| {
            Arc::new(ConditionalType {
                check_param: None,
                extends_type: TypeId::NEVER,
                true_type: TypeId::NEVER,
                false_type: TypeId::NEVER,
                is_distributive: false,
            })
        })
    }

    pub fn mapped_type(&self, id: MappedTypeId) -> Arc<MappedType> {
        let types = self.mapped_types.read().expect("mapped_types lock poisoned");
        types
            .get(id.0)
            .unwrap_or_else(|| Arc::new(MappedType::homomorphic()))
    }

    /// The object shape behind `id`, following placeholders.
    pub fn object_shape_of(&self, id: TypeId) -> Option<Arc<ObjectShape>> {
        match self.lookup(id)? {
            TypeData::Object(shape_id) => Some(self.object_shape(shape_id)),
            _ => None,
        }
    }

    /// Members of a union; `never` has none and any other type is its own
    /// single member.
    pub fn union_members(&self, id: TypeId) -> Vec<TypeId> {
        if id == TypeId::NEVER {
            return Vec::new();
        }
        match self.lookup(id) {
            Some(TypeData::Union(list)) => self.type_list(list).to_vec(),
            _ => vec![id],
        }
    }

    /// Members of an intersection, or `id` itself.
    pub fn intersection_members(&self, id: TypeId) -> Vec<TypeId> {
        match self.lookup(id) {
            Some(TypeData::Intersection(list)) => self.type_list(list).to_vec(),
            _ => vec![id],
        }
    }

    fn intern_type_list(&self, members: Vec<TypeId>) -> TypeListId {
        let mut lists = self.type_lists.write().expect("type_lists lock poisoned");
        TypeListId(lists.intern(members))
    }

    fn intern_tuple_list(&self, elements: Vec<TupleElement>) -> TupleListId {
        let mut lists = self.tuple_lists.write().expect("tuple_lists lock poisoned");
        TupleListId(lists.intern(elements))
    }

    fn intern_object_shape(&self, shape: ObjectShape) -> ObjectShapeId {
        let mut shapes = self.object_shapes.write().expect("object_shapes lock poisoned");
        ObjectShapeId(shapes.intern(shape))
    }

    fn intern_function_shape(&self, shape: FunctionShape) -> FunctionShapeId {
        let mut shapes = self
            .function_shapes
            .write()
            .expect("function_shapes lock poisoned");
        FunctionShapeId(shapes.intern(shape))
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn intrinsic(&self, kind: IntrinsicKind) -> TypeId {
        kind.type_id()
    }

    pub fn literal_string(&self, value: &str) -> TypeId {
        let atom = self.intern_string(value);
        self.intern(TypeData::Literal(LiteralValue::String(atom)))
    }

    pub fn literal_number(&self, value: f64) -> TypeId {
        self.intern(TypeData::Literal(LiteralValue::Number(OrderedFloat(value))))
    }

    pub fn literal_boolean(&self, value: bool) -> TypeId {
        self.intern(TypeData::Literal(LiteralValue::Boolean(value)))
    }

    pub fn literal_bigint(&self, digits: &str) -> TypeId {
        let atom = self.intern_string(digits);
        self.intern(TypeData::Literal(LiteralValue::BigInt(atom)))
    }

    /// `infer name`
    pub fn infer(&self, name: &str) -> TypeId {
        let atom = self.intern_string(name);
        self.intern(TypeData::Infer(atom))
    }

    pub fn type_param(&self, name: &str) -> TypeId {
        let atom = self.intern_string(name);
        self.intern(TypeData::TypeParameter(atom))
    }

    pub fn array(&self, element: TypeId) -> TypeId {
        self.intern(TypeData::Array(element))
    }

    pub fn tuple(&self, elements: Vec<TupleElement>) -> TypeId {
        let list_id = self.intern_tuple_list(elements);
        self.intern(TypeData::Tuple(list_id))
    }

    pub fn object(&self, fields: Vec<FieldInfo>) -> Result<TypeId, DescriptorError> {
        self.object_with_index(ObjectShape {
            fields,
            string_index: None,
        })
    }

    pub fn object_with_index(&self, shape: ObjectShape) -> Result<TypeId, DescriptorError> {
        self.check_unique_fields(&shape.fields)?;
        Ok(self.object_unchecked(shape))
    }

    /// Intern a shape whose field names are already known to be unique.
    pub(crate) fn object_unchecked(&self, shape: ObjectShape) -> TypeId {
        let shape_id = self.intern_object_shape(shape);
        self.intern(TypeData::Object(shape_id))
    }

    pub fn function(&self, shape: FunctionShape) -> TypeId {
        let shape_id = self.intern_function_shape(shape);
        self.intern(TypeData::Function(shape_id))
    }

    /// `new (...params) => instance`
    pub fn constructor(&self, params: Vec<ParamInfo>, instance: TypeId) -> TypeId {
        let shape_id = self.intern_function_shape(FunctionShape::new(params, instance));
        self.intern(TypeData::Constructor(shape_id))
    }

    pub fn wrapper(&self, kind: WrapperKind, args: Vec<TypeId>) -> Result<TypeId, DescriptorError> {
        let (min, max) = kind.arity();
        if args.len() < min || args.len() > max {
            return Err(DescriptorError::WrapperArity {
                kind,
                min,
                max,
                found: args.len(),
            });
        }
        Ok(self.wrapper_unchecked(kind, args))
    }

    /// Rebuild a wrapper whose argument count was validated when the
    /// original was constructed.
    pub(crate) fn wrapper_unchecked(&self, kind: WrapperKind, args: Vec<TypeId>) -> TypeId {
        let list_id = self.intern_type_list(args);
        self.intern(TypeData::Wrapper(kind, list_id))
    }

    pub fn conditional(&self, conditional: ConditionalType) -> ConditionalTypeId {
        let mut types = self
            .conditional_types
            .write()
            .expect("conditional_types lock poisoned");
        ConditionalTypeId(types.intern(conditional))
    }

    pub fn mapped(&self, mapped: MappedType) -> MappedTypeId {
        let mut types = self.mapped_types.write().expect("mapped_types lock poisoned");
        MappedTypeId(types.intern(mapped))
    }

    fn check_unique_fields(&self, fields: &[FieldInfo]) -> Result<(), DescriptorError> {
        let mut seen = FxHashSet::default();
        for field in fields {
            if !seen.insert(field.name) {
                return Err(DescriptorError::DuplicateField {
                    name: self.resolve_atom(field.name).to_string(),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Unions
    // =========================================================================

    /// Intern a union, flattening nested unions and normalizing members.
    ///
    /// An empty member list is `never`; a single member is returned as-is.
    pub fn union(&self, members: Vec<TypeId>) -> TypeId {
        self.union_from_iter(members)
    }

    pub fn union2(&self, left: TypeId, right: TypeId) -> TypeId {
        self.union_from_iter([left, right])
    }

    fn union_from_iter<I>(&self, members: I) -> TypeId
    where
        I: IntoIterator<Item = TypeId>,
    {
        let mut flat: TypeListBuffer = SmallVec::new();
        for member in members {
            self.push_union_member(&mut flat, member);
        }
        self.normalize_union(flat)
    }

    fn push_union_member(&self, flat: &mut TypeListBuffer, member: TypeId) {
        if let Some(TypeData::Union(inner)) = self.lookup(member) {
            flat.extend(self.type_list(inner).iter().copied());
        } else {
            flat.push(member);
        }
    }

    fn normalize_union(&self, mut flat: TypeListBuffer) -> TypeId {
        flat.sort_by_key(|id| id.0);
        flat.dedup();

        if flat.contains(&TypeId::ANY) {
            return TypeId::ANY;
        }
        if flat.contains(&TypeId::UNKNOWN) {
            return TypeId::UNKNOWN;
        }
        flat.retain(|id| *id != TypeId::NEVER);

        // "a" | string => string
        self.absorb_literals_into_primitives(&mut flat);

        match flat.len() {
            0 => TypeId::NEVER,
            1 => flat[0],
            _ => {
                let list_id = self.intern_type_list(flat.into_vec());
                self.intern(TypeData::Union(list_id))
            }
        }
    }

    fn absorb_literals_into_primitives(&self, flat: &mut TypeListBuffer) {
        let primitives: SmallVec<[TypeId; 4]> = flat
            .iter()
            .copied()
            .filter(|id| {
                matches!(
                    *id,
                    TypeId::STRING | TypeId::NUMBER | TypeId::BOOLEAN | TypeId::BIGINT
                )
            })
            .collect();
        if primitives.is_empty() {
            return;
        }
        flat.retain(|id| match self.lookup(*id) {
            Some(TypeData::Literal(literal)) => !primitives.contains(&literal.primitive()),
            _ => true,
        });
    }

    // =========================================================================
    // Intersections
    // =========================================================================

    /// Intern an intersection, flattening nested intersections.
    ///
    /// An empty member list is `unknown`; disjoint primitives reduce to `never`.
    pub fn intersection(&self, members: Vec<TypeId>) -> TypeId {
        self.intersection_from_iter(members)
    }

    pub fn intersection2(&self, left: TypeId, right: TypeId) -> TypeId {
        self.intersection_from_iter([left, right])
    }

    fn intersection_from_iter<I>(&self, members: I) -> TypeId
    where
        I: IntoIterator<Item = TypeId>,
    {
        let mut flat: TypeListBuffer = SmallVec::new();
        for member in members {
            if let Some(TypeData::Intersection(inner)) = self.lookup(member) {
                flat.extend(self.type_list(inner).iter().copied());
            } else {
                flat.push(member);
            }
        }
        self.normalize_intersection(flat)
    }

    fn normalize_intersection(&self, mut flat: TypeListBuffer) -> TypeId {
        flat.sort_by_key(|id| id.0);
        flat.dedup();

        if flat.contains(&TypeId::NEVER) {
            return TypeId::NEVER;
        }
        if flat.contains(&TypeId::ANY) {
            return TypeId::ANY;
        }
        // `unknown` is the identity element
        flat.retain(|id| *id != TypeId::UNKNOWN);

        if self.intersection_has_disjoint_primitives(&flat) {
            return TypeId::NEVER;
        }

        match flat.len() {
            0 => TypeId::UNKNOWN,
            1 => flat[0],
            _ => {
                let list_id = self.intern_type_list(flat.into_vec());
                self.intern(TypeData::Intersection(list_id))
            }
        }
    }

    fn intersection_has_disjoint_primitives(&self, members: &[TypeId]) -> bool {
        let mut class: Option<PrimitiveClass> = None;
        let mut has_primitive = false;
        let mut has_object_like = false;
        let mut literal: Option<TypeId> = None;

        for &member in members {
            let Some(member_class) = self.primitive_class_for(member) else {
                has_object_like |= self.is_object_like(member);
                continue;
            };
            has_primitive = true;
            match class {
                Some(existing) if existing != member_class => return true,
                _ => class = Some(member_class),
            }

            // "a" & "b" = never
            if matches!(self.lookup(member), Some(TypeData::Literal(_))) {
                match literal {
                    Some(existing) if existing != member => return true,
                    _ => literal = Some(member),
                }
            }
        }

        has_primitive && has_object_like
    }

    fn primitive_class_for(&self, type_id: TypeId) -> Option<PrimitiveClass> {
        match type_id {
            TypeId::STRING => return Some(PrimitiveClass::String),
            TypeId::NUMBER => return Some(PrimitiveClass::Number),
            TypeId::BOOLEAN => return Some(PrimitiveClass::Boolean),
            TypeId::BIGINT => return Some(PrimitiveClass::Bigint),
            TypeId::SYMBOL => return Some(PrimitiveClass::Symbol),
            TypeId::NULL => return Some(PrimitiveClass::Null),
            TypeId::UNDEFINED => return Some(PrimitiveClass::Undefined),
            _ => {}
        }
        match self.lookup(type_id)? {
            TypeData::Literal(LiteralValue::String(_)) => Some(PrimitiveClass::String),
            TypeData::Literal(LiteralValue::Number(_)) => Some(PrimitiveClass::Number),
            TypeData::Literal(LiteralValue::Boolean(_)) => Some(PrimitiveClass::Boolean),
            TypeData::Literal(LiteralValue::BigInt(_)) => Some(PrimitiveClass::Bigint),
            _ => None,
        }
    }

    /// Object, array, tuple, callable or library wrapper (and `object` itself).
    pub fn is_object_like(&self, type_id: TypeId) -> bool {
        if type_id == TypeId::OBJECT {
            return true;
        }
        matches!(
            self.lookup(type_id),
            Some(
                TypeData::Object(_)
                    | TypeData::Array(_)
                    | TypeData::Tuple(_)
                    | TypeData::Function(_)
                    | TypeData::Constructor(_)
                    | TypeData::Wrapper(..)
            )
        )
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/arena_tests.rs"]
mod arena_tests;
