//! Text output with indentation and statement-level source mapping.

use super::source_map::{inline_source_map_url, source_mapping_url_comment, SourceMapGenerator};
use crate::source_file::SourceFile;
use std::collections::HashSet;
use strata_common::path::{get_base_file_name, get_directory_path, get_relative_path_from_directory};

/// Where a printed file's source map goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapOutput {
    /// No map.
    None,
    /// A separate map file at this path.
    File(String),
    /// A base64 data URL appended to the output.
    Inline,
}

/// The text of one emitted file and its map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrintedFile {
    /// The output text.
    pub text: String,
    /// The map JSON, when written as a separate file.
    pub map: Option<String>,
    /// Offset of the `//# sourceMappingURL=` comment.
    pub source_map_url_pos: Option<usize>,
}

/// Accumulates output text.
pub struct Printer {
    out: String,
    line: u32,
    column: u32,
    indent: usize,
    map: Option<(SourceMapGenerator, u32)>,
}

impl Printer {
    /// Creates a printer for `output_file`, mapping back to `source` when a map is requested.
    pub fn new(output_file: &str, source: &SourceFile, map_output: &MapOutput) -> Self {
        let map = match map_output {
            MapOutput::None => None,
            MapOutput::File(map_file) => Some(new_generator(output_file, &get_directory_path(map_file), source)),
            MapOutput::Inline => Some(new_generator(output_file, &get_directory_path(output_file), source)),
        };
        Self {
            out: String::new(),
            line: 0,
            column: 0,
            indent: 0,
            map,
        }
    }

    /// Maps the current output position to `pos` in `file`.
    pub fn mark(&mut self, file: &SourceFile, pos: u32) {
        if self.column == 0 {
            self.write_indent();
        }
        if let Some((generator, source)) = &mut self.map {
            let (line, character) = file.line_and_character(pos);
            generator.add_mapping(self.line, self.column, *source, line, character);
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
            self.column += 4;
        }
    }

    /// Appends `text`; the first line is indented when at a line start.
    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.column == 0 {
            self.write_indent();
        }
        self.out.push_str(text);
        match text.rfind('\n') {
            Some(last) => {
                self.line += text.matches('\n').count() as u32;
                self.column = (text.len() - last - 1) as u32;
            }
            None => self.column += text.len() as u32,
        }
    }

    /// Ends the current line.
    pub fn newline(&mut self) {
        self.out.push('\n');
        self.line += 1;
        self.column = 0;
    }

    /// Writes `text` followed by a newline.
    pub fn line(&mut self, text: &str) {
        self.write(text);
        self.newline();
    }

    /// Increases indentation for following lines.
    pub fn indent(&mut self) {
        self.indent += 1;
    }

    /// Decreases indentation for following lines.
    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// The text printed so far.
    pub fn text(&self) -> &str {
        &self.out
    }

    /// Appends the map reference and returns the finished file.
    pub fn finish(mut self, map_output: &MapOutput) -> PrintedFile {
        let Some((generator, _)) = self.map.take() else {
            return PrintedFile {
                text: self.out,
                ..PrintedFile::default()
            };
        };
        let json = generator.to_json();
        let (url, map) = match map_output {
            MapOutput::File(map_file) => (get_base_file_name(map_file), Some(json)),
            _ => (inline_source_map_url(&json), None),
        };
        if self.column != 0 {
            self.newline();
        }
        let source_map_url_pos = self.out.len();
        self.out.push_str(&source_mapping_url_comment(&url));
        PrintedFile {
            text: self.out,
            map,
            source_map_url_pos: Some(source_map_url_pos),
        }
    }
}

fn new_generator(output_file: &str, map_directory: &str, source: &SourceFile) -> (SourceMapGenerator, u32) {
    let mut generator = SourceMapGenerator::new(get_base_file_name(output_file));
    let relative = get_relative_path_from_directory(map_directory, source.file_name(), true);
    let index = generator.add_source(relative);
    (generator, index)
}

/// Every identifier-like word in `text`.
pub fn identifier_words(text: &str) -> HashSet<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|word| !word.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::FilePath;

    fn source() -> SourceFile {
        SourceFile::parse(
            FilePath::from_canonical("/p/src/a.ts"),
            "/p/src/a.ts",
            "let a = 1;\nlet b = 2;",
        )
    }

    #[test]
    fn indentation_and_lines() {
        let file = source();
        let mut printer = Printer::new("/p/out/a.js", &file, &MapOutput::None);
        printer.line("function f() {");
        printer.indent();
        printer.line("return 1;");
        printer.dedent();
        printer.line("}");
        let printed = printer.finish(&MapOutput::None);
        assert_eq!(printed.text, "function f() {\n    return 1;\n}\n");
        assert_eq!(printed.source_map_url_pos, None);
    }

    #[test]
    fn separate_map_file() {
        let file = source();
        let output = MapOutput::File("/p/out/a.js.map".to_string());
        let mut printer = Printer::new("/p/out/a.js", &file, &output);
        printer.mark(&file, 0);
        printer.line("let a = 1;");
        printer.mark(&file, 11);
        printer.line("let b = 2;");
        let printed = printer.finish(&output);
        let pos = printed.source_map_url_pos.unwrap();
        assert_eq!(&printed.text[pos..], "//# sourceMappingURL=a.js.map");
        let map: serde_json::Value = serde_json::from_str(printed.map.as_deref().unwrap()).unwrap();
        assert_eq!(map["sources"][0], "../src/a.ts");
        assert_eq!(map["mappings"], "AAAA;AACA");
    }

    #[test]
    fn inline_map() {
        let file = source();
        let mut printer = Printer::new("/p/src/a.js", &file, &MapOutput::Inline);
        printer.mark(&file, 0);
        printer.write("let a = 1;");
        let printed = printer.finish(&MapOutput::Inline);
        assert!(printed.map.is_none());
        assert!(printed.text.contains("\n//# sourceMappingURL=data:application/json;base64,"));
    }

    #[test]
    fn words() {
        let words = identifier_words("import(\"./a\").Point | $x_1[]");
        assert!(words.contains("Point") && words.contains("$x_1") && words.contains("import"));
    }
}
