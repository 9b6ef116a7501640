//! Diagnostic rendering for terminal output.

use crate::category::Category;
use crate::diagnostic::Diagnostic;
use strata_common::FilePath;

/// Source access needed to turn offsets into human-readable locations.
pub trait SourceLookup {
    /// Returns the name to print for `path` (typically relative to the project).
    fn display_name(&self, path: &FilePath) -> String;

    /// Returns the text of `path`, if it is known.
    fn source_text(&self, path: &FilePath) -> Option<&str>;
}

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, sources: &dyn SourceLookup) -> String;
}

/// Renders diagnostics in the compact `file(line,col): error TSxxxx: message` format.
///
/// With `context` enabled the offending source line is printed below the
/// header with the reported range underlined:
/// ```text
/// src/a.ts(1,14): error TS2322: Type 'string' is not assignable to type 'number'.
///
/// 1 const x: number = "s";
///                ~
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
    /// Whether to print the source line under each located diagnostic.
    pub context: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool, context: bool) -> Self {
        Self { color, context }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn category_color(category: Category) -> &'static str {
        match category {
            Category::Error => "91",
            Category::Warning => "93",
            Category::Suggestion => "92",
            Category::Message => "94",
        }
    }

    fn render_chain(&self, diag: &Diagnostic, depth: usize, out: &mut String) {
        for chain in &diag.message_chain {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&chain.message);
            out.push('\n');
            self.render_chain(chain, depth + 1, out);
        }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, sources: &dyn SourceLookup) -> String {
        let mut out = String::new();

        let text = diag.file.as_ref().and_then(|file| sources.source_text(file));
        if let Some(file) = &diag.file {
            let name = sources.display_name(file);
            match text {
                Some(text) => {
                    let (line, col) = line_and_column(text, diag.pos);
                    out.push_str(&self.paint("96", &name));
                    out.push_str(&format!("({line},{col}): "));
                }
                None => out.push_str(&format!("{}: ", self.paint("96", &name))),
            }
        }
        out.push_str(&self.paint(Self::category_color(diag.category), diag.category.name()));
        out.push(' ');
        out.push_str(&self.paint("90", &format!("TS{}", diag.code)));
        out.push_str(": ");
        out.push_str(&diag.message);
        out.push('\n');
        self.render_chain(diag, 1, &mut out);

        if self.context {
            if let Some(text) = text {
                let (line, col) = line_and_column(text, diag.pos);
                let line_num = line.to_string();
                let padding = " ".repeat(line_num.len());
                let content = source_line(text, diag.pos as usize);
                let width = (diag.len() as usize)
                    .min(content.len().saturating_sub(col as usize - 1))
                    .max(1);
                out.push('\n');
                out.push_str(&format!("{} {content}\n", self.paint("7", &line_num)));
                out.push_str(&format!(
                    "{} {}{}\n",
                    self.paint("7", &padding),
                    " ".repeat(col as usize - 1),
                    self.paint(Self::category_color(diag.category), &"~".repeat(width))
                ));
            }
        }

        for related in &diag.related_information {
            out.push_str("  ");
            out.push_str(&self.render(related, sources));
        }

        out
    }
}

/// Converts a byte offset into a 1-based `(line, column)` pair.
pub fn line_and_column(text: &str, pos: u32) -> (u32, u32) {
    let offset = (pos as usize).min(text.len());
    let before = &text.as_bytes()[..offset];
    let line = before.iter().filter(|b| **b == b'\n').count() as u32 + 1;
    let line_start = before.iter().rposition(|b| *b == b'\n').map_or(0, |p| p + 1);
    (line, (offset - line_start) as u32 + 1)
}

/// Extracts the line of source text containing the given byte offset.
fn source_line(text: &str, offset: usize) -> &str {
    let offset = offset.min(text.len());
    let start = text[..offset].rfind('\n').map_or(0, |pos| pos + 1);
    let end = text[offset..]
        .find('\n')
        .map_or(text.len(), |pos| offset + pos);
    text[start..end].trim_end_matches('\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages;
    use std::collections::HashMap;

    struct Sources(HashMap<FilePath, String>);

    impl SourceLookup for Sources {
        fn display_name(&self, path: &FilePath) -> String {
            path.as_str().trim_start_matches("/p/").to_string()
        }

        fn source_text(&self, path: &FilePath) -> Option<&str> {
            self.0.get(path).map(String::as_str)
        }
    }

    fn sources() -> (FilePath, Sources) {
        let file = FilePath::from_canonical("/p/a.ts");
        let mut map = HashMap::new();
        map.insert(file.clone(), "let a = 1;\nconst x: number = \"s\";\n".to_string());
        (file, Sources(map))
    }

    #[test]
    fn render_located_error() {
        let (file, sources) = sources();
        let diag = Diagnostic::at(&file, 17, 18, &messages::TYPE_NOT_ASSIGNABLE, &["string", "number"]);
        let output = TerminalRenderer::new(false, false).render(&diag, &sources);
        assert_eq!(
            output,
            "a.ts(2,7): error TS2322: Type 'string' is not assignable to type 'number'.\n"
        );
    }

    #[test]
    fn render_with_context() {
        let (file, sources) = sources();
        let diag = Diagnostic::at(&file, 17, 18, &messages::CANNOT_FIND_NAME, &["x"]);
        let output = TerminalRenderer::new(false, true).render(&diag, &sources);
        assert!(output.contains("2 const x: number = \"s\";\n"));
        assert!(output.contains("        ~\n"));
    }

    #[test]
    fn render_global() {
        let (_, sources) = sources();
        let diag = Diagnostic::global(&messages::FILE_NOT_FOUND, &["b.ts"]);
        let output = TerminalRenderer::new(false, true).render(&diag, &sources);
        assert_eq!(output, "error TS6053: File 'b.ts' not found.\n");
    }

    #[test]
    fn render_color() {
        let (_, sources) = sources();
        let diag = Diagnostic::global(&messages::FILE_NOT_FOUND, &["b.ts"]);
        let output = TerminalRenderer::new(true, false).render(&diag, &sources);
        assert!(output.contains("\x1b[91merror\x1b[0m"));
    }

    #[test]
    fn line_column_is_one_based() {
        assert_eq!(line_and_column("ab\ncd", 0), (1, 1));
        assert_eq!(line_and_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_and_column("ab", 99), (1, 3));
    }
}
