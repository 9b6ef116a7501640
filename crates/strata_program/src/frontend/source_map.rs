//! Source map generation (version 3, line-granular mappings).

use serde::Serialize;

/// Base64 VLQ encoding of mapping fields.
pub mod vlq {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    /// Appends the VLQ encoding of `value` to `out`.
    pub fn encode(value: i32, out: &mut String) {
        let mut vlq: u32 = if value < 0 {
            ((value.unsigned_abs()) << 1) | 1
        } else {
            (value as u32) << 1
        };
        loop {
            let mut digit = vlq & 0b11111;
            vlq >>= 5;
            if vlq > 0 {
                digit |= 0b100000;
            }
            out.push(ALPHABET[digit as usize] as char);
            if vlq == 0 {
                break;
            }
        }
    }

    /// Decodes one value from the front of `input`, returning it and the
    /// number of bytes consumed.
    pub fn decode(input: &str) -> Option<(i32, usize)> {
        let mut result: u32 = 0;
        let mut shift = 0u32;
        for (i, byte) in input.bytes().enumerate() {
            let digit = ALPHABET.iter().position(|&c| c == byte)? as u32;
            result |= (digit & 0b11111).checked_shl(shift)?;
            if digit & 0b100000 == 0 {
                let negative = result & 1 == 1;
                let magnitude = (result >> 1) as i32;
                return Some((if negative { -magnitude } else { magnitude }, i + 1));
            }
            shift += 5;
        }
        None
    }
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Standard padded base64, used for inline source maps.
pub fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let n = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
        out.push(BASE64[(n >> 18) as usize & 63] as char);
        out.push(BASE64[(n >> 12) as usize & 63] as char);
        out.push(if chunk.len() > 1 {
            BASE64[(n >> 6) as usize & 63] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64[n as usize & 63] as char
        } else {
            '='
        });
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap<'a> {
    version: u8,
    file: &'a str,
    source_root: &'a str,
    sources: &'a [String],
    names: [&'a str; 0],
    mappings: &'a str,
}

/// Accumulates mappings for one generated file.
pub struct SourceMapGenerator {
    file: String,
    sources: Vec<String>,
    mappings: String,
    generated_line: u32,
    first_in_line: bool,
    previous_generated_column: i32,
    previous_source: i32,
    previous_original_line: i32,
    previous_original_column: i32,
}

impl SourceMapGenerator {
    /// Starts a map for the generated file `file` (a base name).
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sources: Vec::new(),
            mappings: String::new(),
            generated_line: 0,
            first_in_line: true,
            previous_generated_column: 0,
            previous_source: 0,
            previous_original_line: 0,
            previous_original_column: 0,
        }
    }

    /// Registers a source (relative to the map) and returns its index.
    pub fn add_source(&mut self, source: impl Into<String>) -> u32 {
        let source = source.into();
        if let Some(index) = self.sources.iter().position(|s| *s == source) {
            return index as u32;
        }
        self.sources.push(source);
        (self.sources.len() - 1) as u32
    }

    /// Maps a generated position to an original position. Mappings must be
    /// added in generated order.
    pub fn add_mapping(
        &mut self,
        generated_line: u32,
        generated_column: u32,
        source: u32,
        original_line: u32,
        original_column: u32,
    ) {
        while self.generated_line < generated_line {
            self.mappings.push(';');
            self.generated_line += 1;
            self.first_in_line = true;
            self.previous_generated_column = 0;
        }
        if !self.first_in_line {
            self.mappings.push(',');
        }
        self.first_in_line = false;
        vlq::encode(generated_column as i32 - self.previous_generated_column, &mut self.mappings);
        vlq::encode(source as i32 - self.previous_source, &mut self.mappings);
        vlq::encode(original_line as i32 - self.previous_original_line, &mut self.mappings);
        vlq::encode(original_column as i32 - self.previous_original_column, &mut self.mappings);
        self.previous_generated_column = generated_column as i32;
        self.previous_source = source as i32;
        self.previous_original_line = original_line as i32;
        self.previous_original_column = original_column as i32;
    }

    /// The encoded mappings so far.
    pub fn mappings(&self) -> &str {
        &self.mappings
    }

    /// Serializes the map as JSON.
    pub fn to_json(&self) -> String {
        let raw = RawSourceMap {
            version: 3,
            file: &self.file,
            source_root: "",
            sources: &self.sources,
            names: [],
            mappings: &self.mappings,
        };
        serde_json::to_string(&raw).unwrap_or_default()
    }
}

/// The comment linking generated text to its map.
pub fn source_mapping_url_comment(url: &str) -> String {
    format!("//# sourceMappingURL={url}")
}

/// The inline form of a map: a base64 data URL.
pub fn inline_source_map_url(map_json: &str) -> String {
    format!(
        "data:application/json;base64,{}",
        base64_encode(map_json.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_known_values() {
        let cases = [(0, "A"), (1, "C"), (-1, "D"), (15, "e"), (16, "gB"), (-16, "hB"), (1000, "w+B")];
        for (value, expected) in cases {
            let mut out = String::new();
            vlq::encode(value, &mut out);
            assert_eq!(out, expected, "{value}");
            assert_eq!(vlq::decode(expected), Some((value, expected.len())));
        }
        assert_eq!(vlq::decode("g"), None);
        assert_eq!(vlq::decode("!"), None);
    }

    #[test]
    fn base64_padding() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_encode(b"f"), "Zg==");
        assert_eq!(base64_encode(b"fo"), "Zm8=");
        assert_eq!(base64_encode(b"foo"), "Zm9v");
        assert_eq!(base64_encode(b"foobar"), "Zm9vYmFy");
    }

    #[test]
    fn mappings_are_relative() {
        let mut generator = SourceMapGenerator::new("a.js");
        let source = generator.add_source("../src/a.ts");
        assert_eq!(generator.add_source("../src/a.ts"), source);
        generator.add_mapping(0, 0, source, 0, 0);
        generator.add_mapping(0, 4, source, 0, 6);
        generator.add_mapping(2, 0, source, 3, 0);
        assert_eq!(generator.mappings(), "AAAA,IAAM;;AAGN");

        let json: serde_json::Value = serde_json::from_str(&generator.to_json()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "a.js");
        assert_eq!(json["sources"][0], "../src/a.ts");
        assert_eq!(json["sourceRoot"], "");
    }

    #[test]
    fn url_comments() {
        assert_eq!(source_mapping_url_comment("a.js.map"), "//# sourceMappingURL=a.js.map");
        assert!(inline_source_map_url("{}").starts_with("data:application/json;base64,e30="));
    }
}
