//! Core descriptor types.
//!
//! A type is represented as a `TypeId` handle into a [`TypeArena`](crate::TypeArena).
//! The structure behind a handle is a `TypeData` value; composite variants hold
//! ids of interned lists/shapes rather than inline vectors so that `TypeData`
//! stays small, hashable and cheap to clone.

use std::fmt;
use tyalg_common::interner::Atom;

/// Handle to a type descriptor stored in a `TypeArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const ANY: TypeId = TypeId(0);
    pub const UNKNOWN: TypeId = TypeId(1);
    pub const NEVER: TypeId = TypeId(2);
    pub const VOID: TypeId = TypeId(3);
    pub const UNDEFINED: TypeId = TypeId(4);
    pub const NULL: TypeId = TypeId(5);
    pub const BOOLEAN: TypeId = TypeId(6);
    pub const NUMBER: TypeId = TypeId(7);
    pub const STRING: TypeId = TypeId(8);
    pub const BIGINT: TypeId = TypeId(9);
    pub const SYMBOL: TypeId = TypeId(10);
    pub const OBJECT: TypeId = TypeId(11);

    /// First id handed out for non-intrinsic descriptors.
    pub const FIRST_USER: u32 = 12;

    #[inline]
    pub const fn is_intrinsic(self) -> bool {
        self.0 < Self::FIRST_USER
    }

    /// `any` or `unknown`.
    #[inline]
    pub const fn is_top(self) -> bool {
        self.0 == Self::ANY.0 || self.0 == Self::UNKNOWN.0
    }

    #[inline]
    pub const fn is_never(self) -> bool {
        self.0 == Self::NEVER.0
    }
}

/// Built-in primitive and special types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Bigint,
    Symbol,
    Object,
}

impl IntrinsicKind {
    pub const ALL: [IntrinsicKind; 12] = [
        IntrinsicKind::Any,
        IntrinsicKind::Unknown,
        IntrinsicKind::Never,
        IntrinsicKind::Void,
        IntrinsicKind::Undefined,
        IntrinsicKind::Null,
        IntrinsicKind::Boolean,
        IntrinsicKind::Number,
        IntrinsicKind::String,
        IntrinsicKind::Bigint,
        IntrinsicKind::Symbol,
        IntrinsicKind::Object,
    ];

    /// The fixed id every arena assigns to this intrinsic.
    pub const fn type_id(self) -> TypeId {
        match self {
            IntrinsicKind::Any => TypeId::ANY,
            IntrinsicKind::Unknown => TypeId::UNKNOWN,
            IntrinsicKind::Never => TypeId::NEVER,
            IntrinsicKind::Void => TypeId::VOID,
            IntrinsicKind::Undefined => TypeId::UNDEFINED,
            IntrinsicKind::Null => TypeId::NULL,
            IntrinsicKind::Boolean => TypeId::BOOLEAN,
            IntrinsicKind::Number => TypeId::NUMBER,
            IntrinsicKind::String => TypeId::STRING,
            IntrinsicKind::Bigint => TypeId::BIGINT,
            IntrinsicKind::Symbol => TypeId::SYMBOL,
            IntrinsicKind::Object => TypeId::OBJECT,
        }
    }

    pub fn from_type_id(id: TypeId) -> Option<IntrinsicKind> {
        IntrinsicKind::ALL.get(id.0 as usize).copied()
    }

    /// Look up a primitive by its keyword (`"string"`, `"never"`, ...).
    pub fn from_name(name: &str) -> Option<IntrinsicKind> {
        Some(match name {
            "any" => IntrinsicKind::Any,
            "unknown" => IntrinsicKind::Unknown,
            "never" => IntrinsicKind::Never,
            "void" => IntrinsicKind::Void,
            "undefined" => IntrinsicKind::Undefined,
            "null" => IntrinsicKind::Null,
            "boolean" => IntrinsicKind::Boolean,
            "number" => IntrinsicKind::Number,
            "string" => IntrinsicKind::String,
            "bigint" => IntrinsicKind::Bigint,
            "symbol" => IntrinsicKind::Symbol,
            "object" => IntrinsicKind::Object,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            IntrinsicKind::Any => "any",
            IntrinsicKind::Unknown => "unknown",
            IntrinsicKind::Never => "never",
            IntrinsicKind::Void => "void",
            IntrinsicKind::Undefined => "undefined",
            IntrinsicKind::Null => "null",
            IntrinsicKind::Boolean => "boolean",
            IntrinsicKind::Number => "number",
            IntrinsicKind::String => "string",
            IntrinsicKind::Bigint => "bigint",
            IntrinsicKind::Symbol => "symbol",
            IntrinsicKind::Object => "object",
        }
    }
}

/// `f64` wrapper with bitwise equality so number literals can be hashed.
#[derive(Clone, Copy, Debug)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    String(Atom),
    Number(OrderedFloat),
    Boolean(bool),
    BigInt(Atom),
}

impl LiteralValue {
    /// The primitive this literal widens to.
    pub const fn primitive(&self) -> TypeId {
        match self {
            LiteralValue::String(_) => TypeId::STRING,
            LiteralValue::Number(_) => TypeId::NUMBER,
            LiteralValue::Boolean(_) => TypeId::BOOLEAN,
            LiteralValue::BigInt(_) => TypeId::BIGINT,
        }
    }
}

/// The generic library wrappers the engine understands structurally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    Promise,
    Iterable,
    Iterator,
    Generator,
    AsyncIterable,
    AsyncIterator,
    AsyncGenerator,
}

impl WrapperKind {
    /// Inclusive `(min, max)` number of type arguments.
    pub const fn arity(self) -> (usize, usize) {
        match self {
            WrapperKind::Promise | WrapperKind::Iterable | WrapperKind::AsyncIterable => (1, 1),
            WrapperKind::Iterator
            | WrapperKind::Generator
            | WrapperKind::AsyncIterator
            | WrapperKind::AsyncGenerator => (1, 3),
        }
    }

    /// Whether a `self<..>` subject is accepted where `target<..>` is expected.
    ///
    /// Type arguments line up slot for slot: `Generator<Y, R, N>` implements
    /// `Iterator<Y, R, N>` and `Iterable<Y>`.
    pub fn implements(self, target: WrapperKind) -> bool {
        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (WrapperKind::Generator, WrapperKind::Iterator)
                | (WrapperKind::Generator, WrapperKind::Iterable)
                | (WrapperKind::AsyncGenerator, WrapperKind::AsyncIterator)
                | (WrapperKind::AsyncGenerator, WrapperKind::AsyncIterable)
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            WrapperKind::Promise => "Promise",
            WrapperKind::Iterable => "Iterable",
            WrapperKind::Iterator => "Iterator",
            WrapperKind::Generator => "Generator",
            WrapperKind::AsyncIterable => "AsyncIterable",
            WrapperKind::AsyncIterator => "AsyncIterator",
            WrapperKind::AsyncGenerator => "AsyncGenerator",
        }
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeListId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TupleListId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectShapeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShapeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConditionalTypeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MappedTypeId(pub u32);

/// A named field of an object shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    pub name: Atom,
    pub type_id: TypeId,
    pub optional: bool,
    pub readonly: bool,
}

impl FieldInfo {
    /// A required, mutable field.
    pub fn new(name: Atom, type_id: TypeId) -> Self {
        FieldInfo {
            name,
            type_id,
            optional: false,
            readonly: false,
        }
    }

    pub fn opt(name: Atom, type_id: TypeId) -> Self {
        FieldInfo {
            optional: true,
            ..FieldInfo::new(name, type_id)
        }
    }

    pub fn readonly(name: Atom, type_id: TypeId) -> Self {
        FieldInfo {
            readonly: true,
            ..FieldInfo::new(name, type_id)
        }
    }
}

/// `[key: string]: value_type`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexSignature {
    pub value_type: TypeId,
    pub readonly: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectShape {
    /// Fields in declaration order.
    pub fields: Vec<FieldInfo>,
    pub string_index: Option<IndexSignature>,
}

impl ObjectShape {
    pub fn field(&self, name: Atom) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TupleElement {
    pub type_id: TypeId,
    pub name: Option<Atom>,
    pub optional: bool,
    /// `...T` element; only meaningful in last position.
    pub rest: bool,
}

impl TupleElement {
    pub fn required(type_id: TypeId) -> Self {
        TupleElement {
            type_id,
            name: None,
            optional: false,
            rest: false,
        }
    }

    pub fn rest(type_id: TypeId) -> Self {
        TupleElement {
            rest: true,
            ..TupleElement::required(type_id)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    pub name: Option<Atom>,
    pub type_id: TypeId,
    pub optional: bool,
    pub rest: bool,
}

impl ParamInfo {
    pub fn required(name: Atom, type_id: TypeId) -> Self {
        ParamInfo {
            name: Some(name),
            type_id,
            optional: false,
            rest: false,
        }
    }

    pub fn unnamed(type_id: TypeId) -> Self {
        ParamInfo {
            name: None,
            type_id,
            optional: false,
            rest: false,
        }
    }

    /// `...name: type_id`
    pub fn rest(name: Atom, type_id: TypeId) -> Self {
        ParamInfo {
            name: Some(name),
            type_id,
            optional: false,
            rest: true,
        }
    }

    pub(crate) fn as_tuple_element(&self) -> TupleElement {
        TupleElement {
            type_id: self.type_id,
            name: self.name,
            optional: self.optional,
            rest: self.rest,
        }
    }
}

/// Signature shared by function and constructor descriptors.
///
/// For `TypeData::Constructor`, `return_type` is the instance type and
/// `this_type` is always `None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShape {
    pub this_type: Option<TypeId>,
    pub params: Vec<ParamInfo>,
    pub return_type: TypeId,
}

impl FunctionShape {
    pub fn new(params: Vec<ParamInfo>, return_type: TypeId) -> Self {
        FunctionShape {
            this_type: None,
            params,
            return_type,
        }
    }

    pub fn with_this(mut self, this_type: TypeId) -> Self {
        self.this_type = Some(this_type);
        self
    }
}

/// The structure behind a `TypeId`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Intrinsic(IntrinsicKind),
    Literal(LiteralValue),
    Union(TypeListId),
    Intersection(TypeListId),
    Object(ObjectShapeId),
    Array(TypeId),
    Tuple(TupleListId),
    Function(FunctionShapeId),
    Constructor(FunctionShapeId),
    Wrapper(WrapperKind, TypeListId),
    /// `infer Name`; only valid inside a pattern.
    Infer(Atom),
    /// A variable bound by a conditional to the (per-member) checked type.
    TypeParameter(Atom),
}

/// `check extends extends_type ? true_type : false_type`
///
/// When `check_param` is set, occurrences of `TypeParameter(check_param)` in
/// either branch are replaced with the checked type (or, when distributing,
/// with the current union member).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConditionalType {
    pub check_param: Option<Atom>,
    pub extends_type: TypeId,
    pub true_type: TypeId,
    pub false_type: TypeId,
    pub is_distributive: bool,
}

/// `+` / `-` on a mapped type modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MappedModifier {
    Add,
    Remove,
}

impl MappedModifier {
    #[inline]
    pub fn apply(modifier: Option<MappedModifier>, current: bool) -> bool {
        match modifier {
            Some(MappedModifier::Add) => true,
            Some(MappedModifier::Remove) => false,
            None => current,
        }
    }
}

/// Which fields a mapped type keeps.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyFilter {
    All,
    Include(Vec<Atom>),
    Exclude(Vec<Atom>),
}

impl KeyFilter {
    pub fn accepts(&self, name: Atom) -> bool {
        match self {
            KeyFilter::All => true,
            KeyFilter::Include(keys) => keys.contains(&name),
            KeyFilter::Exclude(keys) => !keys.contains(&name),
        }
    }
}

/// What a mapped type does to each kept field's type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueTransform {
    Identity,
    /// Evaluate the conditional with the field type as the checked type.
    Conditional(ConditionalTypeId),
    /// Apply the same mapped type to object-typed field values.
    Deep,
}

/// `{ [P in keys]<modifiers>: value(T[P]) }` over an existing shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MappedType {
    pub keys: KeyFilter,
    pub value: ValueTransform,
    pub optional_modifier: Option<MappedModifier>,
    pub readonly_modifier: Option<MappedModifier>,
}

impl MappedType {
    /// `{ [P in keyof T]: T[P] }`
    pub fn homomorphic() -> Self {
        MappedType {
            keys: KeyFilter::All,
            value: ValueTransform::Identity,
            optional_modifier: None,
            readonly_modifier: None,
        }
    }
}
