//! Encoder/decoder for the run index: a mapping of candidate name to the
//! list of its run identifiers.
//!
//! Deliberately narrow. The store has exactly one shape,
//! `{ "key": ["v1", "v2"], ... }`, and this module reads and writes that
//! shape and nothing else. It is not a general structured-data library and
//! must not grow into one.
//!
//! Decoding favors availability: text whose outer structure does not match
//! yields `None`, and callers fall back to an empty mapping rather than
//! refusing to run.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::iter::Peekable;
use std::str::Chars;

/// Candidate name → chronological run ids. Duplicate run ids are allowed;
/// entries are only ever appended.
pub type RunIndex = BTreeMap<String, Vec<String>>;

/// Render the full index. One entry per line, values inline.
pub fn encode(index: &RunIndex) -> String {
    let mut out = String::from("{");
    let mut first = true;
    for (key, runs) in index {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str("\n    ");
        push_string(&mut out, key);
        out.push_str(": [");
        for (i, run) in runs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            push_string(&mut out, run);
        }
        out.push(']');
    }
    if !index.is_empty() {
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

fn push_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Parse an index previously written by [`encode`].
///
/// Empty or whitespace-only text is an empty mapping. Any structural
/// mismatch (wrong delimiters, non-string values, unterminated strings,
/// trailing data after the closing brace) yields `None`.
pub fn decode(text: &str) -> Option<RunIndex> {
    let mut cur = Cursor::new(text);
    cur.skip_ws();
    if cur.at_end() {
        return Some(RunIndex::new());
    }

    cur.eat('{')?;
    let mut index = RunIndex::new();
    cur.skip_ws();
    if cur.peek() == Some('}') {
        cur.bump();
    } else {
        loop {
            cur.skip_ws();
            let key = cur.parse_string()?;
            cur.skip_ws();
            cur.eat(':')?;
            cur.skip_ws();
            let runs = cur.parse_list()?;
            index.insert(key, runs);
            cur.skip_ws();
            match cur.bump()? {
                ',' => continue,
                '}' => break,
                _ => return None,
            }
        }
    }

    cur.skip_ws();
    cur.at_end().then_some(index)
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn eat(&mut self, want: char) -> Option<()> {
        (self.bump()? == want).then_some(())
    }

    fn parse_string(&mut self) -> Option<String> {
        self.eat('"')?;
        let mut s = String::new();
        loop {
            match self.bump()? {
                '"' => return Some(s),
                '\\' => match self.bump()? {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    '/' => s.push('/'),
                    'n' => s.push('\n'),
                    'r' => s.push('\r'),
                    't' => s.push('\t'),
                    'b' => s.push('\u{0008}'),
                    'f' => s.push('\u{000c}'),
                    'u' => {
                        let mut value = 0u32;
                        for _ in 0..4 {
                            value = value * 16 + self.bump()?.to_digit(16)?;
                        }
                        s.push(char::from_u32(value)?);
                    }
                    _ => return None,
                },
                // Raw control characters must arrive escaped.
                c if (c as u32) < 0x20 => return None,
                c => s.push(c),
            }
        }
    }

    fn parse_list(&mut self) -> Option<Vec<String>> {
        self.eat('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
            return Some(items);
        }
        loop {
            self.skip_ws();
            items.push(self.parse_string()?);
            self.skip_ws();
            match self.bump()? {
                ',' => continue,
                ']' => return Some(items),
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, &[&str])]) -> RunIndex {
        entries
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn round_trips_a_plain_index() {
        let original = index(&[
            ("a_plus_b.cpp", &["2026-08-07T10-00-00-000Z", "2026-08-07T10-05-12-341Z"]),
            ("dijkstra.cpp", &["2026-08-06T22-14-09-002Z"]),
        ]);
        assert_eq!(decode(&encode(&original)), Some(original));
    }

    #[test]
    fn round_trips_escaped_characters() {
        let original = index(&[
            ("weird \"name\".cpp", &["run\\one", "tab\there"]),
            ("lines\nand\rreturns", &["bell\u{0007}char", ""]),
        ]);
        assert_eq!(decode(&encode(&original)), Some(original));
    }

    #[test]
    fn control_characters_are_escaped_on_encode() {
        let original = index(&[("a", &["\u{0001}"])]);
        let text = encode(&original);
        assert!(text.contains("\\u0001"));
        assert_eq!(decode(&text), Some(original));
    }

    #[test]
    fn empty_index_encodes_and_decodes() {
        let empty = RunIndex::new();
        assert_eq!(decode(&encode(&empty)), Some(empty));
    }

    #[test]
    fn empty_and_whitespace_input_is_an_empty_mapping() {
        assert_eq!(decode(""), Some(RunIndex::new()));
        assert_eq!(decode("  \n\t "), Some(RunIndex::new()));
    }

    #[test]
    fn structural_mismatch_is_rejected() {
        assert_eq!(decode("not an index"), None);
        assert_eq!(decode("["), None);
        assert_eq!(decode("{\"a\": [\"x\"]"), None);
        assert_eq!(decode("{\"a\": \"x\"}"), None);
        assert_eq!(decode("{\"a\": [1, 2]}"), None);
        assert_eq!(decode("{\"a\": [\"x\"]} trailing"), None);
        assert_eq!(decode("{\"a\" [\"x\"]}"), None);
    }

    #[test]
    fn unterminated_string_is_rejected() {
        assert_eq!(decode("{\"a"), None);
        assert_eq!(decode("{\"a\": [\"x]}"), None);
    }

    #[test]
    fn raw_control_character_inside_string_is_rejected() {
        assert_eq!(decode("{\"a\u{0001}\": []}"), None);
    }

    #[test]
    fn unicode_escapes_decode() {
        let decoded = decode("{\"\\u0041\": [\"\\u00e9\"]}").unwrap();
        assert_eq!(decoded["A"], vec!["é".to_string()]);
    }

    #[test]
    fn tolerates_arbitrary_whitespace() {
        let decoded = decode("  {\n  \"a\" :\t[ \"x\" ,\n \"y\" ]\n}\n").unwrap();
        assert_eq!(decoded["a"], vec!["x".to_string(), "y".to_string()]);
    }
}
