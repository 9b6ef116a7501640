//! Recursive-descent parser producing [`ast`](super::ast) statements.
//!
//! The parser is error tolerant: unexpected tokens produce a `'x' expected`
//! diagnostic and are skipped, and statements outside the supported subset
//! become [`StatementKind::Opaque`] nodes spanning their source text.

use super::ast::*;
use super::scanner::{scan, Directive, Token, TokenKind};
use strata_common::FilePath;
use strata_diagnostics::{messages, Diagnostic};

/// The output of parsing one file.
pub struct ParsedFile {
    /// Top-level statements.
    pub statements: Vec<Statement>,
    /// Leading triple-slash directives.
    pub directives: Vec<Directive>,
    /// Syntax errors.
    pub diagnostics: Vec<Diagnostic>,
}

const TYPE_KEYWORDS: &[&str] = &[
    "number", "string", "boolean", "any", "unknown", "void", "never", "null", "undefined",
    "object", "bigint", "symbol",
];

const OPAQUE_KEYWORDS: &[&str] = &[
    "if", "for", "while", "do", "switch", "try", "class", "throw", "break", "continue",
    "namespace", "abstract",
];

/// Parses `text` as the contents of the file at `path`.
pub fn parse(path: &FilePath, text: &str) -> ParsedFile {
    let scanned = scan(path, text);
    let mut parser = Parser {
        path,
        text,
        tokens: scanned.tokens,
        idx: 0,
        prev_end: 0,
        diagnostics: scanned.diagnostics,
    };
    let statements = parser.parse_statements(false);
    ParsedFile {
        statements,
        directives: scanned.directives,
        diagnostics: parser.diagnostics,
    }
}

struct Parser<'a> {
    path: &'a FilePath,
    text: &'a str,
    tokens: Vec<Token>,
    idx: usize,
    prev_end: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.idx + n).min(last)]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.idx += 1;
            self.prev_end = token.end;
        }
        token
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.peek().is_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek().is_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_expected(&mut self, what: &str) {
        let token = self.peek();
        let (pos, end) = (token.pos, token.end);
        // One report per position keeps recovery from cascading.
        if self.diagnostics.last().is_some_and(|d| d.pos == pos) {
            return;
        }
        self.diagnostics.push(Diagnostic::at(
            self.path,
            pos,
            end,
            &messages::TOKEN_EXPECTED,
            &[what],
        ));
    }

    fn expect_punct(&mut self, p: &str) -> bool {
        if self.eat_punct(p) {
            true
        } else {
            self.error_expected(p);
            false
        }
    }

    fn expect_word(&mut self, word: &str) {
        if !self.eat_word(word) {
            self.error_expected(word);
        }
    }

    fn expect_ident(&mut self) -> Ident {
        let token = self.peek();
        if token.kind == TokenKind::Identifier {
            let token = self.bump();
            Ident {
                text: token.text,
                pos: token.pos,
                end: token.end,
            }
        } else {
            let pos = token.pos;
            self.error_expected("identifier");
            Ident {
                text: String::new(),
                pos,
                end: pos,
            }
        }
    }

    fn expect_string(&mut self) -> StringLit {
        let token = self.peek();
        if token.kind == TokenKind::String {
            let token = self.bump();
            StringLit {
                text: token.text,
                pos: token.pos,
                end: token.end,
            }
        } else {
            let pos = token.pos;
            self.error_expected("string literal");
            StringLit {
                text: String::new(),
                pos,
                end: pos,
            }
        }
    }

    /// Consumes an optional `;`, requiring one unless a line break or block end follows.
    fn parse_semicolon(&mut self) {
        if self.eat_punct(";") {
            return;
        }
        let token = self.peek();
        if !(token.newline_before || token.is_punct("}") || token.kind == TokenKind::Eof) {
            self.error_expected(";");
        }
    }

    /// Consumes a bracketed group starting at the current opener.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.bump();
            match token.text.as_str() {
                _ if token.kind != TokenKind::Punct => {}
                "{" | "(" | "[" => depth += 1,
                "}" | ")" | "]" => depth = depth.saturating_sub(1),
                _ => {}
            }
            if depth == 0 || self.at_eof() {
                break;
            }
        }
    }

    /// Consumes `<...>` type parameters and returns them as written.
    fn parse_type_parameters_text(&mut self) -> Option<String> {
        if !self.peek().is_punct("<") {
            return None;
        }
        let pos = self.peek().pos;
        let mut depth = 0usize;
        loop {
            let token = self.bump();
            if token.is_punct("<") {
                depth += 1;
            } else if token.is_punct(">") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            if self.at_eof() {
                break;
            }
        }
        Some(self.text[pos as usize..self.prev_end as usize].to_string())
    }

    fn parse_statements(&mut self, in_block: bool) -> Vec<Statement> {
        let mut statements = Vec::new();
        while !self.at_eof() {
            if in_block && self.peek().is_punct("}") {
                break;
            }
            let start = self.idx;
            let statement = self.parse_statement();
            if self.idx == start {
                self.bump();
            }
            statements.push(statement);
        }
        statements
    }

    fn parse_statement(&mut self) -> Statement {
        let pos = self.peek().pos;
        let kind = self.parse_statement_kind();
        Statement {
            kind,
            pos,
            end: self.prev_end.max(pos),
        }
    }

    fn parse_statement_kind(&mut self) -> StatementKind {
        if self.eat_punct(";") {
            return StatementKind::Opaque;
        }
        let next = self.peek_at(1).clone();
        if self.peek().is_word("import") && !next.is_punct("(") && !next.is_punct(".") {
            return self.parse_import();
        }
        let mut modifiers = Modifiers::default();
        if self.peek().is_word("export") {
            if next.is_punct("{") || next.is_punct("*") || (next.is_word("type") && self.peek_at(2).is_punct("{")) {
                return self.parse_export_declaration();
            }
            if next.is_word("default") || next.is_punct("=") {
                self.skip_opaque_statement();
                return StatementKind::Opaque;
            }
            self.bump();
            modifiers.export = true;
        }
        if self.peek().is_word("declare") {
            let next = self.peek_at(1).clone();
            if next.is_word("global") && self.peek_at(2).is_punct("{") {
                self.bump();
                self.bump();
                return StatementKind::GlobalAugmentation(self.parse_block_body());
            }
            if next.is_word("module") && self.peek_at(2).kind == TokenKind::String {
                self.bump();
                self.bump();
                let name = self.expect_string();
                let body = self.parse_block_body();
                return StatementKind::AmbientModule(AmbientModuleDeclaration { name, body });
            }
            self.bump();
            modifiers.declare = true;
        }
        self.eat_word("async");

        let token = self.peek().clone();
        let next = self.peek_at(1).clone();
        match token.text.as_str() {
            _ if token.kind != TokenKind::Identifier => {}
            "const" if next.is_word("enum") => {
                self.bump();
                return self.parse_enum(modifiers, true);
            }
            "const" | "let" | "var" => return self.parse_variable_statement(modifiers),
            "function" => return self.parse_function(modifiers),
            "interface" if next.kind == TokenKind::Identifier => {
                return self.parse_interface(modifiers)
            }
            "type" if next.kind == TokenKind::Identifier => return self.parse_type_alias(modifiers),
            "enum" => return self.parse_enum(modifiers, false),
            "return" => {
                self.bump();
                let value = if self.peek().is_punct(";")
                    || self.peek().is_punct("}")
                    || self.peek().newline_before
                {
                    None
                } else {
                    Some(self.parse_expression())
                };
                self.parse_semicolon();
                return StatementKind::Return(value);
            }
            word if OPAQUE_KEYWORDS.contains(&word) => {
                self.skip_opaque_statement();
                return StatementKind::Opaque;
            }
            _ => {}
        }
        if modifiers.export || modifiers.declare || token.is_punct("{") {
            self.skip_opaque_statement();
            return StatementKind::Opaque;
        }
        let expr = self.parse_expression();
        self.parse_semicolon();
        StatementKind::Expression(expr)
    }

    fn skip_opaque_statement(&mut self) {
        let mut depth = 0usize;
        let mut closed_block = false;
        while !self.at_eof() {
            let token = self.peek();
            if depth == 0 {
                if token.is_punct("}") {
                    break;
                }
                if token.is_punct(";") {
                    self.bump();
                    break;
                }
                if closed_block
                    && token.newline_before
                    && !["else", "catch", "finally", "while"].iter().any(|w| token.is_word(w))
                {
                    break;
                }
            }
            let token = self.bump();
            closed_block = false;
            if token.kind == TokenKind::Punct {
                match token.text.as_str() {
                    "{" | "(" | "[" => depth += 1,
                    "}" | ")" | "]" => {
                        depth = depth.saturating_sub(1);
                        closed_block = depth == 0 && token.text == "}";
                    }
                    _ => {}
                }
            }
        }
    }

    fn parse_block_body(&mut self) -> Vec<Statement> {
        if !self.expect_punct("{") {
            return Vec::new();
        }
        let body = self.parse_statements(true);
        self.expect_punct("}");
        body
    }

    fn parse_import(&mut self) -> StatementKind {
        self.bump();
        let type_only = self.peek().is_word("type")
            && (self.peek_at(1).is_punct("{")
                || self.peek_at(1).is_punct("*")
                || self.peek_at(2).is_word("from"));
        if type_only {
            self.bump();
        }
        let mut import = ImportDeclaration {
            type_only,
            default_binding: None,
            namespace: None,
            named: Vec::new(),
            module: StringLit {
                text: String::new(),
                pos: 0,
                end: 0,
            },
        };
        if self.peek().kind == TokenKind::String {
            import.module = self.expect_string();
            self.parse_semicolon();
            return StatementKind::Import(import);
        }
        if self.peek().kind == TokenKind::Identifier && !self.peek().is_word("from") {
            import.default_binding = Some(self.expect_ident());
            self.eat_punct(",");
        }
        if self.eat_punct("*") {
            self.expect_word("as");
            import.namespace = Some(self.expect_ident());
        } else if self.eat_punct("{") {
            while !self.peek().is_punct("}") && !self.at_eof() {
                if self.peek().is_word("type") && self.peek_at(1).kind == TokenKind::Identifier {
                    self.bump();
                }
                let imported = self.expect_ident();
                let local = if self.eat_word("as") {
                    self.expect_ident()
                } else {
                    imported.clone()
                };
                import.named.push(ImportSpecifier { imported, local });
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}");
        }
        self.expect_word("from");
        import.module = self.expect_string();
        self.parse_semicolon();
        StatementKind::Import(import)
    }

    fn parse_export_declaration(&mut self) -> StatementKind {
        self.bump();
        self.eat_word("type");
        let mut export = ExportDeclaration {
            specifiers: None,
            namespace: None,
            module: None,
        };
        if self.eat_punct("*") {
            if self.eat_word("as") {
                export.namespace = Some(self.expect_ident());
            }
            self.expect_word("from");
            export.module = Some(self.expect_string());
        } else {
            self.expect_punct("{");
            let mut specifiers = Vec::new();
            while !self.peek().is_punct("}") && !self.at_eof() {
                let local = self.expect_ident();
                let exported = if self.eat_word("as") {
                    self.expect_ident()
                } else {
                    local.clone()
                };
                specifiers.push(ExportSpecifier { local, exported });
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}");
            export.specifiers = Some(specifiers);
            if self.eat_word("from") {
                export.module = Some(self.expect_string());
            }
        }
        self.parse_semicolon();
        StatementKind::Export(export)
    }

    fn parse_variable_statement(&mut self, modifiers: Modifiers) -> StatementKind {
        let kind = match self.bump().text.as_str() {
            "const" => VarKind::Const,
            "let" => VarKind::Let,
            _ => VarKind::Var,
        };
        let mut declarations = Vec::new();
        loop {
            let name = self.expect_ident();
            self.eat_punct("!");
            let ty = if self.eat_punct(":") {
                Some(self.parse_type())
            } else {
                None
            };
            let initializer = if self.eat_punct("=") {
                Some(self.parse_assignment())
            } else {
                None
            };
            declarations.push(VariableDeclaration {
                name,
                ty,
                initializer,
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.parse_semicolon();
        StatementKind::Variable(VariableStatement {
            modifiers,
            kind,
            declarations,
        })
    }

    fn parse_function(&mut self, modifiers: Modifiers) -> StatementKind {
        self.bump();
        self.eat_punct("*");
        let name = self.expect_ident();
        let type_parameters = self.parse_type_parameters_text();
        let params = self.parse_parameter_list();
        let return_type = if self.eat_punct(":") {
            Some(self.parse_type())
        } else {
            None
        };
        let body = if self.peek().is_punct("{") {
            Some(self.parse_block_body())
        } else {
            self.parse_semicolon();
            None
        };
        StatementKind::Function(FunctionDeclaration {
            modifiers,
            name,
            type_parameters,
            params,
            return_type,
            body,
        })
    }

    fn parse_parameter_list(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if !self.expect_punct("(") {
            return params;
        }
        while !self.peek().is_punct(")") && !self.at_eof() {
            let start = self.idx;
            let rest = self.eat_punct("...");
            let name = self.expect_ident();
            let optional = self.eat_punct("?");
            let ty = if self.eat_punct(":") {
                Some(self.parse_type())
            } else {
                None
            };
            let initializer = if self.eat_punct("=") {
                Some(self.parse_assignment())
            } else {
                None
            };
            params.push(Param {
                name,
                ty,
                optional,
                rest,
                initializer,
            });
            if !self.eat_punct(",") {
                if self.idx == start {
                    self.bump();
                }
                break;
            }
        }
        self.expect_punct(")");
        params
    }

    fn parse_interface(&mut self, modifiers: Modifiers) -> StatementKind {
        self.bump();
        let name = self.expect_ident();
        while !self.peek().is_punct("{") && !self.at_eof() {
            self.bump();
        }
        self.skip_balanced();
        let rest = self.text[name.end as usize..self.prev_end as usize].to_string();
        StatementKind::Interface(InterfaceDeclaration {
            modifiers,
            name,
            rest,
        })
    }

    fn parse_type_alias(&mut self, modifiers: Modifiers) -> StatementKind {
        self.bump();
        let name = self.expect_ident();
        let type_parameters = self.parse_type_parameters_text();
        self.expect_punct("=");
        let ty = self.parse_type();
        self.parse_semicolon();
        StatementKind::TypeAlias(TypeAliasDeclaration {
            modifiers,
            name,
            type_parameters,
            ty,
        })
    }

    fn parse_enum(&mut self, modifiers: Modifiers, is_const: bool) -> StatementKind {
        self.expect_word("enum");
        let name = self.expect_ident();
        let mut members = Vec::new();
        if self.expect_punct("{") {
            while !self.peek().is_punct("}") && !self.at_eof() {
                let token = self.bump();
                let member_name = Ident {
                    text: token.text,
                    pos: token.pos,
                    end: token.end,
                };
                let initializer = if self.eat_punct("=") {
                    Some(self.parse_assignment())
                } else {
                    None
                };
                members.push(EnumMember {
                    name: member_name,
                    initializer,
                });
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}");
        }
        StatementKind::Enum(EnumDeclaration {
            modifiers,
            is_const,
            name,
            members,
        })
    }

    fn parse_type(&mut self) -> TypeNode {
        let pos = self.peek().pos;
        self.eat_punct("|");
        let first = self.parse_postfix_type();
        if !self.peek().is_punct("|") {
            return first;
        }
        let mut members = vec![first];
        while self.eat_punct("|") {
            members.push(self.parse_postfix_type());
        }
        TypeNode {
            kind: TypeNodeKind::Union(members),
            pos,
            end: self.prev_end,
        }
    }

    fn parse_postfix_type(&mut self) -> TypeNode {
        let mut ty = self.parse_primary_type();
        while self.peek().is_punct("[") && self.peek_at(1).is_punct("]") && !self.peek().newline_before {
            self.bump();
            self.bump();
            let pos = ty.pos;
            ty = TypeNode {
                kind: TypeNodeKind::Array(Box::new(ty)),
                pos,
                end: self.prev_end,
            };
        }
        ty
    }

    fn parse_primary_type(&mut self) -> TypeNode {
        let token = self.peek().clone();
        let pos = token.pos;
        let kind = match token.kind {
            TokenKind::Number => {
                self.bump();
                TypeNodeKind::NumberLiteral(token.text)
            }
            TokenKind::String => {
                self.bump();
                TypeNodeKind::StringLiteral(token.text)
            }
            TokenKind::Punct if token.text == "-" && self.peek_at(1).kind == TokenKind::Number => {
                self.bump();
                let number = self.bump();
                TypeNodeKind::NumberLiteral(format!("-{}", number.text))
            }
            TokenKind::Punct if token.text == "{" => {
                self.skip_balanced();
                TypeNodeKind::Literal(self.text[pos as usize..self.prev_end as usize].to_string())
            }
            TokenKind::Punct if token.text == "(" => {
                if self.is_function_type_ahead() {
                    self.skip_balanced();
                    self.expect_punct("=>");
                    self.parse_type();
                    TypeNodeKind::Literal(self.text[pos as usize..self.prev_end as usize].to_string())
                } else {
                    self.bump();
                    let inner = self.parse_type();
                    self.expect_punct(")");
                    inner.kind
                }
            }
            TokenKind::Identifier if token.text == "true" || token.text == "false" => {
                self.bump();
                TypeNodeKind::BooleanLiteral(token.text == "true")
            }
            TokenKind::Identifier if TYPE_KEYWORDS.contains(&token.text.as_str()) => {
                self.bump();
                TypeNodeKind::Keyword(token.text)
            }
            TokenKind::Identifier if token.text == "typeof" || token.text == "keyof" => {
                self.bump();
                self.parse_primary_type();
                TypeNodeKind::Literal(self.text[pos as usize..self.prev_end as usize].to_string())
            }
            TokenKind::Identifier => {
                let mut name = self.bump().text;
                while self.peek().is_punct(".") && self.peek_at(1).kind == TokenKind::Identifier {
                    self.bump();
                    name.push('.');
                    name.push_str(&self.bump().text);
                }
                let mut type_arguments = Vec::new();
                if self.eat_punct("<") {
                    while !self.peek().is_punct(">") && !self.at_eof() {
                        type_arguments.push(self.parse_type());
                        if !self.eat_punct(",") {
                            break;
                        }
                    }
                    self.expect_punct(">");
                }
                TypeNodeKind::Reference {
                    name,
                    type_arguments,
                }
            }
            _ => {
                self.error_expected("type");
                TypeNodeKind::Keyword("any".to_string())
            }
        };
        TypeNode {
            kind,
            pos,
            end: self.prev_end.max(pos),
        }
    }

    fn matching_close(&self, from: usize) -> usize {
        let mut depth = 0usize;
        let mut i = from;
        while i < self.tokens.len() {
            let token = &self.tokens[i];
            if token.kind == TokenKind::Punct {
                match token.text.as_str() {
                    "{" | "(" | "[" => depth += 1,
                    "}" | ")" | "]" => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return i;
                        }
                    }
                    _ => {}
                }
            }
            if token.kind == TokenKind::Eof {
                return i;
            }
            i += 1;
        }
        self.tokens.len() - 1
    }

    fn is_function_type_ahead(&self) -> bool {
        let close = self.matching_close(self.idx);
        self.tokens.get(close + 1).is_some_and(|t| t.is_punct("=>"))
    }

    fn is_arrow_ahead(&self) -> bool {
        let close = self.matching_close(self.idx);
        let Some(after) = self.tokens.get(close + 1) else {
            return false;
        };
        if after.is_punct("=>") {
            return true;
        }
        if !after.is_punct(":") {
            return false;
        }
        let mut depth = 0usize;
        for token in &self.tokens[close + 2..] {
            if token.kind == TokenKind::Eof {
                return false;
            }
            if token.kind != TokenKind::Punct {
                continue;
            }
            match token.text.as_str() {
                "=>" if depth == 0 => return true,
                "{" | "(" | "[" | "<" => depth += 1,
                "}" | ")" | "]" | ">" => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                ";" | "," | "=" if depth == 0 => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_expression(&mut self) -> Expr {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Expr {
        let pos = self.peek().pos;
        self.eat_word("async");
        let token = self.peek().clone();
        if token.kind == TokenKind::Identifier && self.peek_at(1).is_punct("=>") {
            let name = self.expect_ident();
            let param = Param {
                name,
                ty: None,
                optional: false,
                rest: false,
                initializer: None,
            };
            return self.parse_arrow_rest(pos, vec![param]);
        }
        if token.is_punct("(") && self.is_arrow_ahead() {
            let params = self.parse_parameter_list();
            return self.parse_arrow_rest(pos, params);
        }
        let left = self.parse_conditional();
        let op = self.peek().clone();
        if op.is_punct("=") || op.is_punct("+=") || op.is_punct("-=") {
            self.bump();
            let right = self.parse_assignment();
            return Expr {
                pos,
                end: self.prev_end,
                kind: ExprKind::Binary {
                    op: op.text,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        left
    }

    fn parse_arrow_rest(&mut self, pos: u32, params: Vec<Param>) -> Expr {
        let return_type = if self.eat_punct(":") {
            Some(self.parse_type())
        } else {
            None
        };
        self.expect_punct("=>");
        let body = if self.peek().is_punct("{") {
            let body_pos = self.peek().pos;
            self.skip_balanced();
            Expr {
                kind: ExprKind::Opaque,
                pos: body_pos,
                end: self.prev_end,
            }
        } else {
            self.parse_assignment()
        };
        Expr {
            kind: ExprKind::Arrow {
                params,
                return_type,
                body: Box::new(body),
            },
            pos,
            end: self.prev_end,
        }
    }

    fn parse_conditional(&mut self) -> Expr {
        let pos = self.peek().pos;
        let condition = self.parse_binary(1);
        if !self.eat_punct("?") {
            return condition;
        }
        let when_true = self.parse_assignment();
        self.expect_punct(":");
        let when_false = self.parse_assignment();
        Expr {
            kind: ExprKind::Conditional {
                condition: Box::new(condition),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
            pos,
            end: self.prev_end,
        }
    }

    fn binary_precedence(token: &Token) -> Option<u8> {
        let prec = match (token.kind, token.text.as_str()) {
            (TokenKind::Punct, "??") => 1,
            (TokenKind::Punct, "||") => 2,
            (TokenKind::Punct, "&&") => 3,
            (TokenKind::Punct, "|") => 4,
            (TokenKind::Punct, "^") => 5,
            (TokenKind::Punct, "&") => 6,
            (TokenKind::Punct, "==" | "!=" | "===" | "!==") => 7,
            (TokenKind::Punct, "<" | ">" | "<=" | ">=") => 8,
            (TokenKind::Identifier, "instanceof" | "in" | "as") => 8,
            (TokenKind::Punct, "+" | "-") => 10,
            (TokenKind::Punct, "*" | "/" | "%") => 11,
            (TokenKind::Punct, "**") => 12,
            _ => return None,
        };
        Some(prec)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Expr {
        let pos = self.peek().pos;
        let mut left = self.parse_unary();
        loop {
            let op = self.peek().clone();
            let Some(prec) = Self::binary_precedence(&op) else {
                break;
            };
            if prec < min_prec || (op.is_word("as") && op.newline_before) {
                break;
            }
            self.bump();
            if op.is_word("as") {
                let ty = self.parse_type();
                left = Expr {
                    kind: ExprKind::As {
                        expr: Box::new(left),
                        ty,
                    },
                    pos,
                    end: self.prev_end,
                };
                continue;
            }
            let next_min = if op.text == "**" { prec } else { prec + 1 };
            let right = self.parse_binary(next_min);
            left = Expr {
                kind: ExprKind::Binary {
                    op: op.text,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                pos,
                end: self.prev_end,
            };
        }
        left
    }

    fn parse_unary(&mut self) -> Expr {
        let token = self.peek().clone();
        let is_prefix = match token.kind {
            TokenKind::Punct => ["!", "-", "+", "~", "++", "--"].contains(&token.text.as_str()),
            TokenKind::Identifier => ["typeof", "void", "await"].contains(&token.text.as_str()),
            _ => false,
        };
        if is_prefix {
            self.bump();
            let operand = self.parse_unary();
            return Expr {
                kind: ExprKind::Unary {
                    op: token.text,
                    operand: Box::new(operand),
                },
                pos: token.pos,
                end: self.prev_end,
            };
        }
        let primary = self.parse_primary();
        self.parse_postfix(primary)
    }

    fn parse_arguments(&mut self) -> Vec<Expr> {
        let mut arguments = Vec::new();
        self.expect_punct("(");
        while !self.peek().is_punct(")") && !self.at_eof() {
            self.eat_punct("...");
            arguments.push(self.parse_assignment());
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")");
        arguments
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Expr {
        loop {
            let token = self.peek().clone();
            let pos = expr.pos;
            if token.is_punct(".") || token.is_punct("?.") {
                self.bump();
                let name = self.expect_ident();
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        name,
                    },
                    pos,
                    end: self.prev_end,
                };
            } else if token.is_punct("[") {
                self.bump();
                let index = self.parse_expression();
                self.expect_punct("]");
                expr = Expr {
                    kind: ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    pos,
                    end: self.prev_end,
                };
            } else if token.is_punct("(") {
                let arguments = self.parse_arguments();
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        arguments,
                    },
                    pos,
                    end: self.prev_end,
                };
            } else if (token.is_punct("!") || token.is_punct("++") || token.is_punct("--"))
                && !token.newline_before
            {
                self.bump();
                expr.end = self.prev_end;
            } else {
                return expr;
            }
        }
    }

    fn parse_primary(&mut self) -> Expr {
        let token = self.peek().clone();
        let pos = token.pos;
        let kind = match token.kind {
            TokenKind::Number => {
                self.bump();
                ExprKind::Number(token.text)
            }
            TokenKind::String => {
                self.bump();
                ExprKind::String(token.text)
            }
            TokenKind::Identifier => match token.text.as_str() {
                "true" | "false" => {
                    self.bump();
                    ExprKind::Bool(token.text == "true")
                }
                "null" => {
                    self.bump();
                    ExprKind::Null
                }
                "new" => {
                    self.bump();
                    let callee = self.parse_primary();
                    let arguments = if self.peek().is_punct("(") {
                        self.parse_arguments()
                    } else {
                        Vec::new()
                    };
                    ExprKind::New {
                        callee: Box::new(callee),
                        arguments,
                    }
                }
                "function" | "class" => {
                    self.bump();
                    while !self.peek().is_punct("{") && !self.at_eof() {
                        if self.peek().is_punct("(") {
                            self.skip_balanced();
                        } else {
                            self.bump();
                        }
                    }
                    self.skip_balanced();
                    ExprKind::Opaque
                }
                _ => {
                    self.bump();
                    ExprKind::Identifier(token.text)
                }
            },
            TokenKind::Punct if token.text == "(" => {
                self.bump();
                let inner = self.parse_expression();
                self.expect_punct(")");
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::Punct if token.text == "[" => {
                self.bump();
                let mut elements = Vec::new();
                while !self.peek().is_punct("]") && !self.at_eof() {
                    self.eat_punct("...");
                    elements.push(self.parse_assignment());
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct("]");
                ExprKind::Array(elements)
            }
            TokenKind::Punct if token.text == "{" => self.parse_object_literal(),
            _ => {
                self.error_expected("expression");
                if token.kind != TokenKind::Eof && !token.is_punct(";") && !token.is_punct("}") {
                    self.bump();
                }
                ExprKind::Opaque
            }
        };
        Expr {
            kind,
            pos,
            end: self.prev_end.max(pos),
        }
    }

    fn parse_object_literal(&mut self) -> ExprKind {
        self.bump();
        let mut properties = Vec::new();
        while !self.peek().is_punct("}") && !self.at_eof() {
            let start = self.idx;
            if self.eat_punct("...") {
                let value = self.parse_assignment();
                let name = Ident {
                    text: "...".to_string(),
                    pos: value.pos,
                    end: value.pos,
                };
                properties.push((name, value));
            } else {
                let token = self.bump();
                let name = Ident {
                    text: token.text.clone(),
                    pos: token.pos,
                    end: token.end,
                };
                let value = if self.eat_punct(":") {
                    self.parse_assignment()
                } else if self.peek().is_punct("(") {
                    let value_pos = self.peek().pos;
                    self.skip_balanced();
                    if self.eat_punct(":") {
                        self.parse_type();
                    }
                    if self.peek().is_punct("{") {
                        self.skip_balanced();
                    }
                    Expr {
                        kind: ExprKind::Opaque,
                        pos: value_pos,
                        end: self.prev_end,
                    }
                } else {
                    Expr {
                        kind: ExprKind::Identifier(token.text),
                        pos: token.pos,
                        end: token.end,
                    }
                };
                properties.push((name, value));
            }
            if !self.eat_punct(",") {
                if self.idx == start {
                    self.bump();
                }
                break;
            }
        }
        self.expect_punct("}");
        ExprKind::Object(properties)
    }
}
