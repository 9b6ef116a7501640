//! Tokenizer for the supported TypeScript subset.
//!
//! Comments and whitespace are skipped, except that leading `///`
//! directives are collected as triple-slash references.

use strata_common::FilePath;
use strata_diagnostics::{messages, Diagnostic};

/// The lexical class of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier or keyword.
    Identifier,
    /// A numeric literal.
    Number,
    /// A string literal; the token text is the unquoted value.
    String,
    /// An operator or punctuator.
    Punct,
    /// End of input.
    Eof,
}

/// A scanned token.
#[derive(Clone, Debug)]
pub struct Token {
    /// The lexical class.
    pub kind: TokenKind,
    /// The token text (unquoted for strings).
    pub text: String,
    /// Start offset of the token.
    pub pos: u32,
    /// End offset of the token.
    pub end: u32,
    /// A line break occurs between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    /// Returns `true` if this is the punctuator `p`.
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Returns `true` if this is the identifier or keyword `word`.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == word
    }
}

/// The kind of a triple-slash directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `/// <reference path="..." />`
    Path,
    /// `/// <reference types="..." />`
    Types,
}

/// A triple-slash directive at the top of a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    /// The directive kind.
    pub kind: DirectiveKind,
    /// The referenced name.
    pub value: String,
    /// Start offset of the comment.
    pub pos: u32,
    /// End offset of the comment.
    pub end: u32,
}

/// The output of scanning one file.
pub struct Scanned {
    /// Tokens, terminated by an [`TokenKind::Eof`] token.
    pub tokens: Vec<Token>,
    /// Leading triple-slash directives.
    pub directives: Vec<Directive>,
    /// Lexical errors.
    pub diagnostics: Vec<Diagnostic>,
}

const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--",
    "+=", "-=", "{", "}", "(", ")", "[", "]", ";", ",", ".", ":", "?", "=", "+", "-", "*", "/",
    "%", "<", ">", "!", "&", "|", "^", "~", "@", "#",
];

/// Scans `text` into tokens.
pub fn scan(path: &FilePath, text: &str) -> Scanned {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut directives = Vec::new();
    let mut diagnostics = Vec::new();
    let mut i = 0usize;
    let mut newline_before = false;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b'\n' {
            newline_before = true;
            i += 1;
            continue;
        }
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if text[i..].starts_with("//") {
            let end = text[i..].find('\n').map_or(text.len(), |n| i + n);
            if tokens.is_empty() && text[i..].starts_with("///") {
                if let Some(directive) = parse_directive(&text[i..end], i as u32, end as u32) {
                    directives.push(directive);
                }
            }
            i = end;
            continue;
        }
        if text[i..].starts_with("/*") {
            match text[i + 2..].find("*/") {
                Some(n) => {
                    if text[i..i + 2 + n].contains('\n') {
                        newline_before = true;
                    }
                    i += n + 4;
                }
                None => {
                    diagnostics.push(Diagnostic::at(
                        path,
                        text.len() as u32,
                        text.len() as u32,
                        &messages::COMMENT_END_EXPECTED,
                        &[],
                    ));
                    i = text.len();
                }
            }
            continue;
        }

        let start = i;
        let (kind, value) = if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$') {
                i += 1;
            }
            (TokenKind::Identifier, text[start..i].to_string())
        } else if c.is_ascii_digit() {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'_') {
                i += 1;
            }
            (TokenKind::Number, text[start..i].replace('_', ""))
        } else if c == b'"' || c == b'\'' || c == b'`' {
            i += 1;
            let mut value = String::new();
            let mut terminated = false;
            while i < bytes.len() {
                let b = bytes[i];
                if b == c {
                    terminated = true;
                    i += 1;
                    break;
                }
                if b == b'\n' && c != b'`' {
                    break;
                }
                if b == b'\\' && i + 1 < bytes.len() {
                    let escaped = bytes[i + 1];
                    value.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'0' => '\0',
                        other => other as char,
                    });
                    i += 2;
                    continue;
                }
                let ch_len = utf8_len(b);
                value.push_str(&text[i..i + ch_len]);
                i += ch_len;
            }
            if !terminated {
                diagnostics.push(Diagnostic::at(
                    path,
                    start as u32,
                    i as u32,
                    &messages::UNTERMINATED_STRING_LITERAL,
                    &[],
                ));
            }
            (TokenKind::String, value)
        } else if let Some(p) = PUNCTUATORS.iter().find(|p| text[i..].starts_with(**p)) {
            i += p.len();
            (TokenKind::Punct, p.to_string())
        } else {
            // Unknown characters become single-character punctuators.
            let ch_len = utf8_len(c);
            i += ch_len;
            (TokenKind::Punct, text[start..i].to_string())
        };
        tokens.push(Token {
            kind,
            text: value,
            pos: start as u32,
            end: i as u32,
            newline_before,
        });
        newline_before = false;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        pos: text.len() as u32,
        end: text.len() as u32,
        newline_before: true,
    });
    Scanned {
        tokens,
        directives,
        diagnostics,
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

fn parse_directive(comment: &str, pos: u32, end: u32) -> Option<Directive> {
    let body = comment.trim_start_matches('/').trim();
    let body = body.strip_prefix("<reference")?;
    for (attr, kind) in [("path", DirectiveKind::Path), ("types", DirectiveKind::Types)] {
        if let Some(value) = attribute(body, attr) {
            return Some(Directive {
                kind,
                value,
                pos,
                end,
            });
        }
    }
    None
}

fn attribute(body: &str, name: &str) -> Option<String> {
    let start = body.find(&format!("{name}="))? + name.len() + 1;
    let rest = &body[start..];
    let quote = rest.chars().next().filter(|q| *q == '"' || *q == '\'')?;
    let value_end = rest[1..].find(quote)?;
    Some(rest[1..1 + value_end].to_string())
}
