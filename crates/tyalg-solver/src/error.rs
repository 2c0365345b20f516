//! Construction-time errors.
//!
//! Only structurally invalid descriptors are errors. Failing to match a
//! pattern during evaluation is a normal outcome and yields `never`.

use crate::types::{TypeId, WrapperKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("duplicate field `{name}` in object shape")]
    DuplicateField { name: String },

    #[error("{kind} takes {min}..={max} type arguments, got {found}")]
    WrapperArity {
        kind: WrapperKind,
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("type {0:?} is not a reserved placeholder")]
    NotReserved(TypeId),

    #[error("placeholder {0:?} is already defined")]
    AlreadyDefined(TypeId),

    #[error("placeholder {0:?} was reserved but never defined")]
    Undefined(TypeId),

    #[error("type {0:?} does not belong to this arena")]
    UnknownType(TypeId),
}
