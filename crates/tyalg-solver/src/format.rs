//! TypeScript-style rendering of descriptors for diagnostics, logs and tests.
//!
//! ```text
//! { title: string; completed: boolean }
//! (foo: string, bar: number) => boolean
//! Generator<string, void, unknown>
//! ```
//!
//! Self-referential descriptors render as `{ value: T; left?: ... }` at the
//! point where a placeholder is revisited.

use crate::arena::TypeArena;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::*;

pub struct TypeFormatter<'a> {
    arena: &'a TypeArena,
    guard: RecursionGuard<TypeId>,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(arena: &'a TypeArena) -> Self {
        TypeFormatter {
            arena,
            guard: RecursionGuard::with_profile(RecursionProfile::Formatting),
        }
    }

    pub fn format(&mut self, type_id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, type_id);
        self.guard.reset();
        out
    }

    fn write_type(&mut self, out: &mut String, type_id: TypeId) {
        match self.guard.enter(type_id) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle
            | RecursionResult::DepthExceeded
            | RecursionResult::IterationExceeded => {
                out.push_str("...");
                return;
            }
        }
        self.write_data(out, type_id);
        self.guard.leave(type_id);
    }

    fn write_data(&mut self, out: &mut String, type_id: TypeId) {
        let arena = self.arena;
        let Some(data) = arena.lookup(type_id) else {
            out.push_str(&format!("<undefined #{}>", type_id.0));
            return;
        };

        match data {
            TypeData::Intrinsic(kind) => out.push_str(kind.name()),
            TypeData::Literal(literal) => self.write_literal(out, literal),
            TypeData::Union(list) => {
                let members = arena.type_list(list);
                self.write_joined(out, &members, " | ", true);
            }
            TypeData::Intersection(list) => {
                let members = arena.type_list(list);
                self.write_joined(out, &members, " & ", true);
            }
            TypeData::Object(shape_id) => {
                let shape = arena.object_shape(shape_id);
                self.write_object(out, &shape);
            }
            TypeData::Array(element) => {
                let needs_parens = matches!(
                    arena.lookup(element),
                    Some(
                        TypeData::Union(_)
                            | TypeData::Intersection(_)
                            | TypeData::Function(_)
                            | TypeData::Constructor(_)
                    )
                );
                if needs_parens {
                    out.push('(');
                    self.write_type(out, element);
                    out.push(')');
                } else {
                    self.write_type(out, element);
                }
                out.push_str("[]");
            }
            TypeData::Tuple(list) => {
                let elements = arena.tuple_list(list);
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if element.rest {
                        out.push_str("...");
                    }
                    if let Some(name) = element.name {
                        out.push_str(&arena.resolve_atom(name));
                        if element.optional {
                            out.push('?');
                        }
                        out.push_str(": ");
                        self.write_type(out, element.type_id);
                    } else {
                        self.write_type(out, element.type_id);
                        if element.optional {
                            out.push('?');
                        }
                    }
                }
                out.push(']');
            }
            TypeData::Function(shape_id) => {
                let shape = arena.function_shape(shape_id);
                self.write_signature(out, &shape);
            }
            TypeData::Constructor(shape_id) => {
                let shape = arena.function_shape(shape_id);
                out.push_str("new ");
                self.write_signature(out, &shape);
            }
            TypeData::Wrapper(kind, list) => {
                let args = arena.type_list(list);
                out.push_str(kind.name());
                out.push('<');
                self.write_joined(out, &args, ", ", false);
                out.push('>');
            }
            TypeData::Infer(name) => {
                out.push_str("infer ");
                out.push_str(&arena.resolve_atom(name));
            }
            TypeData::TypeParameter(name) => out.push_str(&arena.resolve_atom(name)),
        }
    }

    fn write_literal(&self, out: &mut String, literal: LiteralValue) {
        match literal {
            LiteralValue::String(atom) => {
                out.push('"');
                out.push_str(&self.arena.resolve_atom(atom));
                out.push('"');
            }
            LiteralValue::Number(value) => out.push_str(&value.0.to_string()),
            LiteralValue::Boolean(value) => out.push_str(if value { "true" } else { "false" }),
            LiteralValue::BigInt(atom) => {
                out.push_str(&self.arena.resolve_atom(atom));
                out.push('n');
            }
        }
    }

    fn write_joined(&mut self, out: &mut String, members: &[TypeId], separator: &str, wrap_fns: bool) {
        for (i, &member) in members.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            let is_fn = wrap_fns
                && matches!(
                    self.arena.lookup(member),
                    Some(TypeData::Function(_) | TypeData::Constructor(_))
                );
            if is_fn {
                out.push('(');
                self.write_type(out, member);
                out.push(')');
            } else {
                self.write_type(out, member);
            }
        }
    }

    fn write_object(&mut self, out: &mut String, shape: &ObjectShape) {
        if shape.fields.is_empty() && shape.string_index.is_none() {
            out.push_str("{}");
            return;
        }
        out.push_str("{ ");
        let mut first = true;
        if let Some(index) = &shape.string_index {
            if index.readonly {
                out.push_str("readonly ");
            }
            out.push_str("[key: string]: ");
            self.write_type(out, index.value_type);
            first = false;
        }
        for field in &shape.fields {
            if !first {
                out.push_str("; ");
            }
            first = false;
            if field.readonly {
                out.push_str("readonly ");
            }
            out.push_str(&self.arena.resolve_atom(field.name));
            if field.optional {
                out.push('?');
            }
            out.push_str(": ");
            self.write_type(out, field.type_id);
        }
        out.push_str(" }");
    }

    fn write_signature(&mut self, out: &mut String, shape: &FunctionShape) {
        out.push('(');
        let mut first = true;
        if let Some(this_type) = shape.this_type {
            out.push_str("this: ");
            self.write_type(out, this_type);
            first = false;
        }
        for (i, param) in shape.params.iter().enumerate() {
            if !first {
                out.push_str(", ");
            }
            first = false;
            if param.rest {
                out.push_str("...");
            }
            match param.name {
                Some(name) => out.push_str(&self.arena.resolve_atom(name)),
                None => out.push_str(&format!("arg{i}")),
            }
            if param.optional {
                out.push('?');
            }
            out.push_str(": ");
            self.write_type(out, param.type_id);
        }
        out.push_str(") => ");
        self.write_type(out, shape.return_type);
    }
}

/// Render `type_id` with a fresh formatter.
pub fn format_type(arena: &TypeArena, type_id: TypeId) -> String {
    TypeFormatter::new(arena).format(type_id)
}
