//! Syntax tree for the supported TypeScript subset.
//!
//! Every node records its `pos..end` range in the source text so that
//! emitters can slice the original text and diagnostics can point at it.

/// A name with its source range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    /// The identifier text.
    pub text: String,
    /// Start offset.
    pub pos: u32,
    /// End offset.
    pub end: u32,
}

/// A string literal with its source range (quotes included in the range).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringLit {
    /// The unquoted value.
    pub text: String,
    /// Start offset.
    pub pos: u32,
    /// End offset.
    pub end: u32,
}

/// Declaration modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// `export`
    pub export: bool,
    /// `declare`
    pub declare: bool,
}

/// A type annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeNode {
    /// The shape of the annotation.
    pub kind: TypeNodeKind,
    /// Start offset.
    pub pos: u32,
    /// End offset.
    pub end: u32,
}

/// The shapes of type annotations the checker understands.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeNodeKind {
    /// `number`, `string`, `boolean`, `any`, `unknown`, `void`, `never`,
    /// `null`, `undefined`, or `object`.
    Keyword(String),
    /// A numeric literal type.
    NumberLiteral(String),
    /// A string literal type.
    StringLiteral(String),
    /// `true` or `false`.
    BooleanLiteral(bool),
    /// A named type, possibly qualified (`ns.T`) and with type arguments.
    Reference {
        /// The (possibly dotted) name.
        name: String,
        /// Type arguments.
        type_arguments: Vec<TypeNode>,
    },
    /// `T[]`
    Array(Box<TypeNode>),
    /// `A | B`
    Union(Vec<TypeNode>),
    /// Object and function type literals, kept as written.
    Literal(String),
}

/// A function or arrow-function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// The parameter name.
    pub name: Ident,
    /// The annotation, if any.
    pub ty: Option<TypeNode>,
    /// `name?`
    pub optional: bool,
    /// `...name`
    pub rest: bool,
    /// A default value.
    pub initializer: Option<Expr>,
}

/// An expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    /// The expression form.
    pub kind: ExprKind,
    /// Start offset.
    pub pos: u32,
    /// End offset.
    pub end: u32,
}

/// Expression forms.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// A numeric literal.
    Number(String),
    /// A string or no-substitution template literal.
    String(String),
    /// `true` or `false`.
    Bool(bool),
    /// `null`
    Null,
    /// An identifier reference (including `undefined`).
    Identifier(String),
    /// `object.name`
    Member {
        /// The accessed object.
        object: Box<Expr>,
        /// The property name.
        name: Ident,
    },
    /// `object[index]`
    Index {
        /// The accessed object.
        object: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
    },
    /// `callee(arguments)`
    Call {
        /// The called expression.
        callee: Box<Expr>,
        /// Call arguments.
        arguments: Vec<Expr>,
    },
    /// `new callee(arguments)`
    New {
        /// The constructed expression.
        callee: Box<Expr>,
        /// Constructor arguments.
        arguments: Vec<Expr>,
    },
    /// A prefix operator application.
    Unary {
        /// The operator text (`!`, `-`, `+`, `~`, `typeof`, `void`).
        op: String,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operator application.
    Binary {
        /// The operator text.
        op: String,
        /// The left operand.
        left: Box<Expr>,
        /// The right operand.
        right: Box<Expr>,
    },
    /// `condition ? when_true : when_false`
    Conditional {
        /// The tested expression.
        condition: Box<Expr>,
        /// The value when true.
        when_true: Box<Expr>,
        /// The value when false.
        when_false: Box<Expr>,
    },
    /// `(inner)`
    Paren(Box<Expr>),
    /// `[elements]`
    Array(Vec<Expr>),
    /// `{ name: value }`; shorthand properties carry an identifier value.
    Object(Vec<(Ident, Expr)>),
    /// `(params) => body` with an expression body.
    Arrow {
        /// Parameters.
        params: Vec<Param>,
        /// The return annotation.
        return_type: Option<TypeNode>,
        /// The body expression.
        body: Box<Expr>,
    },
    /// `expr as T`
    As {
        /// The asserted expression.
        expr: Box<Expr>,
        /// The asserted type.
        ty: TypeNode,
    },
    /// Syntax outside the supported subset, kept as written.
    Opaque,
}

/// A statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    /// The statement form.
    pub kind: StatementKind,
    /// Start offset.
    pub pos: u32,
    /// End offset.
    pub end: u32,
}

/// Statement forms.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementKind {
    /// `import ... from "m"` or `import "m"`.
    Import(ImportDeclaration),
    /// `export { a, b as c } [from "m"]` or `export * [as ns] from "m"`.
    Export(ExportDeclaration),
    /// `const`, `let`, or `var` declarations.
    Variable(VariableStatement),
    /// A function declaration.
    Function(FunctionDeclaration),
    /// An interface declaration.
    Interface(InterfaceDeclaration),
    /// A type alias.
    TypeAlias(TypeAliasDeclaration),
    /// An enum or const enum.
    Enum(EnumDeclaration),
    /// `declare global { ... }`
    GlobalAugmentation(Vec<Statement>),
    /// `declare module "m" { ... }`
    AmbientModule(AmbientModuleDeclaration),
    /// `return [expr];`
    Return(Option<Expr>),
    /// An expression statement.
    Expression(Expr),
    /// Any other statement, kept as written.
    Opaque,
}

/// The kind of binding a variable statement introduces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    /// `const`
    Const,
    /// `let`
    Let,
    /// `var`
    Var,
}

impl VarKind {
    /// Returns the keyword text.
    pub fn keyword(self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
            VarKind::Var => "var",
        }
    }
}

/// An `import` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportDeclaration {
    /// `import type ...`
    pub type_only: bool,
    /// `import d from ...`
    pub default_binding: Option<Ident>,
    /// `import * as ns from ...`
    pub namespace: Option<Ident>,
    /// `import { a, b as c } from ...`
    pub named: Vec<ImportSpecifier>,
    /// The module specifier.
    pub module: StringLit,
}

/// One `name [as local]` entry of a named import.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportSpecifier {
    /// The name exported by the target module.
    pub imported: Ident,
    /// The local binding.
    pub local: Ident,
}

/// An `export` declaration without a declaration body.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportDeclaration {
    /// Named specifiers; `None` for `export *`.
    pub specifiers: Option<Vec<ExportSpecifier>>,
    /// `export * as ns from ...`
    pub namespace: Option<Ident>,
    /// The re-export source module.
    pub module: Option<StringLit>,
}

/// One `name [as exported]` entry of an export declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSpecifier {
    /// The local (or source-module) name.
    pub local: Ident,
    /// The name visible to importers.
    pub exported: Ident,
}

/// A variable statement.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableStatement {
    /// Modifiers.
    pub modifiers: Modifiers,
    /// The binding kind.
    pub kind: VarKind,
    /// The declared variables.
    pub declarations: Vec<VariableDeclaration>,
}

/// One declared variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    /// The variable name.
    pub name: Ident,
    /// The annotation, if any.
    pub ty: Option<TypeNode>,
    /// The initializer, if any.
    pub initializer: Option<Expr>,
}

/// A function declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDeclaration {
    /// Modifiers.
    pub modifiers: Modifiers,
    /// The function name.
    pub name: Ident,
    /// Type parameters, kept as written (including angle brackets).
    pub type_parameters: Option<String>,
    /// Parameters.
    pub params: Vec<Param>,
    /// The return annotation.
    pub return_type: Option<TypeNode>,
    /// The body statements; `None` for overloads and ambient functions.
    pub body: Option<Vec<Statement>>,
}

/// An interface declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDeclaration {
    /// Modifiers.
    pub modifiers: Modifiers,
    /// The interface name.
    pub name: Ident,
    /// Everything after the name (type parameters, heritage, and body), as written.
    pub rest: String,
}

/// A type alias declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeAliasDeclaration {
    /// Modifiers.
    pub modifiers: Modifiers,
    /// The alias name.
    pub name: Ident,
    /// Type parameters, kept as written.
    pub type_parameters: Option<String>,
    /// The aliased type.
    pub ty: TypeNode,
}

/// An enum declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumDeclaration {
    /// Modifiers.
    pub modifiers: Modifiers,
    /// `const enum`
    pub is_const: bool,
    /// The enum name.
    pub name: Ident,
    /// Members in declaration order.
    pub members: Vec<EnumMember>,
}

/// An enum member.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumMember {
    /// The member name.
    pub name: Ident,
    /// The explicit initializer, if any.
    pub initializer: Option<Expr>,
}

/// `declare module "name" { ... }`
#[derive(Clone, Debug, PartialEq)]
pub struct AmbientModuleDeclaration {
    /// The module name.
    pub name: StringLit,
    /// The body statements.
    pub body: Vec<Statement>,
}

impl Statement {
    /// Returns the modifiers of a declaration statement.
    pub fn modifiers(&self) -> Modifiers {
        match &self.kind {
            StatementKind::Variable(v) => v.modifiers,
            StatementKind::Function(f) => f.modifiers,
            StatementKind::Interface(i) => i.modifiers,
            StatementKind::TypeAlias(t) => t.modifiers,
            StatementKind::Enum(e) => e.modifiers,
            StatementKind::GlobalAugmentation(_) | StatementKind::AmbientModule(_) => Modifiers {
                export: false,
                declare: true,
            },
            _ => Modifiers::default(),
        }
    }

    /// Returns `true` for `import` and `export` statements.
    pub fn is_module_syntax(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Import(_) | StatementKind::Export(_)
        ) || self.modifiers().export
    }
}
