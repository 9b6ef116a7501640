//! Checker types, printing, and assignability.

use std::fmt::Write as _;
use strata_common::path::{ensure_path_is_non_module_name, get_relative_path_from_directory, remove_file_extension};
use strata_common::FilePath;

/// A type declared by name (interface, enum, or library type).
#[derive(Clone, Debug, PartialEq)]
pub struct NamedType {
    /// The declared name.
    pub name: String,
    /// The declaring module file; `None` for global declarations.
    pub module: Option<FilePath>,
    /// Exported from its declaring module.
    pub exported: bool,
    /// Type arguments, for generic library types.
    pub type_arguments: Vec<Type>,
}

/// A function parameter in a function type.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionParam {
    /// The parameter name.
    pub name: String,
    /// The parameter type.
    pub ty: Type,
    /// `name?`
    pub optional: bool,
    /// `...name`
    pub rest: bool,
}

/// The types the checker computes.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    /// `any`
    Any,
    /// `unknown`
    Unknown,
    /// `never`
    Never,
    /// `void`
    Void,
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `number`
    Number,
    /// `string`
    String,
    /// `boolean`
    Boolean,
    /// `object`
    Object,
    /// A numeric literal type.
    NumberLiteral(String),
    /// A string literal type.
    StringLiteral(String),
    /// `true` or `false`.
    BooleanLiteral(bool),
    /// A named declaration.
    Named(NamedType),
    /// `T[]`
    Array(Box<Type>),
    /// `A | B`
    Union(Vec<Type>),
    /// A function type.
    Function {
        /// Parameters.
        params: Vec<FunctionParam>,
        /// The return type.
        ret: Box<Type>,
    },
    /// A type kept as written (object literals, type parameters, `typeof E`).
    Literal(String),
}

impl Type {
    /// Maps a keyword to its type.
    pub fn from_keyword(keyword: &str) -> Option<Type> {
        Some(match keyword {
            "any" => Type::Any,
            "unknown" => Type::Unknown,
            "never" => Type::Never,
            "void" => Type::Void,
            "undefined" => Type::Undefined,
            "null" => Type::Null,
            "number" => Type::Number,
            "string" => Type::String,
            "boolean" => Type::Boolean,
            "object" => Type::Object,
            _ => return None,
        })
    }

    /// Builds a flattened, de-duplicated union.
    pub fn union(types: impl IntoIterator<Item = Type>) -> Type {
        let mut members: Vec<Type> = Vec::new();
        for ty in types {
            match ty {
                Type::Union(inner) => {
                    for member in inner {
                        push_unique(&mut members, member);
                    }
                }
                Type::Never => {}
                other => push_unique(&mut members, other),
            }
        }
        if members.contains(&Type::Any) {
            return Type::Any;
        }
        // `true | false` collapses to `boolean`.
        if members.contains(&Type::BooleanLiteral(true)) && members.contains(&Type::BooleanLiteral(false)) {
            members.retain(|member| !matches!(member, Type::BooleanLiteral(_)));
            push_unique(&mut members, Type::Boolean);
        }
        match members.len() {
            0 => Type::Never,
            1 => members.remove(0),
            _ => Type::Union(members),
        }
    }

    /// Replaces literal types with their primitive base types.
    pub fn widen(&self) -> Type {
        match self {
            Type::NumberLiteral(_) => Type::Number,
            Type::StringLiteral(_) => Type::String,
            Type::BooleanLiteral(_) => Type::Boolean,
            Type::Union(members) => Type::union(members.iter().map(Type::widen)),
            Type::Array(element) => Type::Array(Box::new(element.widen())),
            other => other.clone(),
        }
    }

    fn is_primitive_like(&self) -> bool {
        matches!(
            self,
            Type::Number
                | Type::String
                | Type::Boolean
                | Type::Null
                | Type::Undefined
                | Type::NumberLiteral(_)
                | Type::StringLiteral(_)
                | Type::BooleanLiteral(_)
        )
    }

    /// Returns `true` if the type is built only from primitives, literals,
    /// arrays, and unions of those. Only such types are compared strictly.
    fn is_checkable(&self) -> bool {
        match self {
            Type::Array(element) => element.is_checkable(),
            Type::Union(members) => members.iter().all(Type::is_checkable),
            other => other.is_primitive_like(),
        }
    }

    /// Returns `true` if a value of `self` may be assigned to `target`.
    ///
    /// Only primitive, literal, and array/union-of-primitive combinations are
    /// compared; everything else is accepted.
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        if matches!(target, Type::Any | Type::Unknown) || matches!(self, Type::Any | Type::Never) {
            return true;
        }
        if !self.is_checkable() || !target.is_checkable() {
            return true;
        }
        if self == target {
            return true;
        }
        match (self, target) {
            (Type::Union(members), _) => members.iter().all(|member| member.is_assignable_to(target)),
            (_, Type::Union(members)) => members.iter().any(|member| self.is_assignable_to(member)),
            (Type::NumberLiteral(_), Type::Number)
            | (Type::StringLiteral(_), Type::String)
            | (Type::BooleanLiteral(_), Type::Boolean) => true,
            (Type::Array(source), Type::Array(target)) => source.is_assignable_to(target),
            _ => false,
        }
    }

    /// Returns `true` if the type is or contains a literal type.
    pub fn has_literal(&self) -> bool {
        match self {
            Type::NumberLiteral(_) | Type::StringLiteral(_) | Type::BooleanLiteral(_) => true,
            Type::Union(members) => members.iter().any(Type::has_literal),
            Type::Array(element) => element.has_literal(),
            _ => false,
        }
    }

    /// Visits every named type reachable from this type.
    pub fn for_each_named(&self, visit: &mut dyn FnMut(&NamedType)) {
        match self {
            Type::Named(named) => {
                visit(named);
                for argument in &named.type_arguments {
                    argument.for_each_named(visit);
                }
            }
            Type::Array(element) => element.for_each_named(visit),
            Type::Union(members) => {
                for member in members {
                    member.for_each_named(visit);
                }
            }
            Type::Function { params, ret } => {
                for param in params {
                    param.ty.for_each_named(visit);
                }
                ret.for_each_named(visit);
            }
            _ => {}
        }
    }

    /// Prints the type as written in `from`. Named types declared in other
    /// modules print as `import("./m").T`.
    pub fn display_in(&self, from: Option<&FilePath>) -> String {
        let mut out = String::new();
        self.write(&mut out, from);
        out
    }

    fn write(&self, out: &mut String, from: Option<&FilePath>) {
        match self {
            Type::Any => out.push_str("any"),
            Type::Unknown => out.push_str("unknown"),
            Type::Never => out.push_str("never"),
            Type::Void => out.push_str("void"),
            Type::Undefined => out.push_str("undefined"),
            Type::Null => out.push_str("null"),
            Type::Number => out.push_str("number"),
            Type::String => out.push_str("string"),
            Type::Boolean => out.push_str("boolean"),
            Type::Object => out.push_str("object"),
            Type::NumberLiteral(value) => out.push_str(value),
            Type::StringLiteral(value) => {
                let _ = write!(out, "\"{value}\"");
            }
            Type::BooleanLiteral(value) => {
                let _ = write!(out, "{value}");
            }
            Type::Named(named) => {
                if let (Some(from), Some(module)) = (from, &named.module) {
                    if from != module {
                        let specifier = module_specifier(from, module);
                        let _ = write!(out, "import(\"{specifier}\").");
                    }
                }
                out.push_str(&named.name);
                if !named.type_arguments.is_empty() {
                    out.push('<');
                    for (i, argument) in named.type_arguments.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        argument.write(out, from);
                    }
                    out.push('>');
                }
            }
            Type::Array(element) => {
                let needs_parens = matches!(**element, Type::Union(_) | Type::Function { .. });
                if needs_parens {
                    out.push('(');
                }
                element.write(out, from);
                if needs_parens {
                    out.push(')');
                }
                out.push_str("[]");
            }
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    let needs_parens = matches!(member, Type::Function { .. });
                    if needs_parens {
                        out.push('(');
                    }
                    member.write(out, from);
                    if needs_parens {
                        out.push(')');
                    }
                }
            }
            Type::Function { params, ret } => {
                out.push('(');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if param.rest {
                        out.push_str("...");
                    }
                    out.push_str(&param.name);
                    if param.optional {
                        out.push('?');
                    }
                    out.push_str(": ");
                    param.ty.write(out, from);
                }
                out.push_str(") => ");
                ret.write(out, from);
            }
            Type::Literal(text) => out.push_str(text),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_in(None))
    }
}

fn push_unique(members: &mut Vec<Type>, ty: Type) {
    if !members.contains(&ty) {
        members.push(ty);
    }
}

/// The relative, extension-less specifier importing `to` from `from`.
pub fn module_specifier(from: &FilePath, to: &FilePath) -> String {
    let relative = get_relative_path_from_directory(&from.directory(), to.as_str(), true);
    ensure_path_is_non_module_name(remove_file_extension(&relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, module: Option<&str>) -> Type {
        Type::Named(NamedType {
            name: name.to_string(),
            module: module.map(FilePath::from_canonical),
            exported: true,
            type_arguments: Vec::new(),
        })
    }

    #[test]
    fn union_flattens_and_collapses() {
        let ty = Type::union([
            Type::Number,
            Type::Union(vec![Type::String, Type::Number]),
            Type::Never,
        ]);
        assert_eq!(ty, Type::Union(vec![Type::Number, Type::String]));
        assert_eq!(Type::union([Type::Number, Type::Any]), Type::Any);
        assert_eq!(
            Type::union([Type::BooleanLiteral(true), Type::BooleanLiteral(false)]),
            Type::Boolean
        );
        assert_eq!(Type::union([]), Type::Never);
    }

    #[test]
    fn widening() {
        let ty = Type::Array(Box::new(Type::union([
            Type::NumberLiteral("1".into()),
            Type::NumberLiteral("2".into()),
        ])));
        assert_eq!(ty.widen(), Type::Array(Box::new(Type::Number)));
        assert_eq!(Type::StringLiteral("a".into()).widen(), Type::String);
    }

    #[test]
    fn assignability_of_primitives() {
        assert!(Type::NumberLiteral("1".into()).is_assignable_to(&Type::Number));
        assert!(!Type::Number.is_assignable_to(&Type::String));
        assert!(Type::String.is_assignable_to(&Type::union([Type::String, Type::Null])));
        assert!(!Type::union([Type::String, Type::Null]).is_assignable_to(&Type::String));
        assert!(!Type::Array(Box::new(Type::Number)).is_assignable_to(&Type::Array(Box::new(Type::String))));
        assert!(Type::Number.is_assignable_to(&named("Box", None)));
        assert!(Type::Any.is_assignable_to(&Type::String));
    }

    #[test]
    fn display_with_import_types() {
        let ty = Type::Array(Box::new(named("Point", Some("/p/src/geo/point.ts"))));
        let from = FilePath::from_canonical("/p/src/main.ts");
        assert_eq!(ty.display_in(Some(&from)), "import(\"./geo/point\").Point[]");
        assert_eq!(ty.to_string(), "Point[]");

        let function = Type::Function {
            params: vec![FunctionParam {
                name: "x".into(),
                ty: Type::Number,
                optional: true,
                rest: false,
            }],
            ret: Box::new(Type::union([Type::String, Type::Undefined])),
        };
        assert_eq!(function.to_string(), "(x?: number) => string | undefined");
        assert_eq!(Type::StringLiteral("a".into()).to_string(), "\"a\"");
    }

    #[test]
    fn declaration_files_lose_their_extension() {
        let from = FilePath::from_canonical("/p/a/main.ts");
        let to = FilePath::from_canonical("/p/types/shapes.d.ts");
        assert_eq!(module_specifier(&from, &to), "../types/shapes");
    }
}
