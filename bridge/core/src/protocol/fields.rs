//! Flat Object Field Extraction
//!
//! A deliberately small tokenizer for the single-level object grammar the
//! controller speaks:
//!
//! ```text
//! object := '{' pair (',' pair)* '}'
//! pair   := '"' key '"' ':' value
//! value  := '"' text '"' | bare-token      (bare runs to ',', '}' or newline)
//! ```
//!
//! It never rejects input. Unknown structure is skipped, nested objects are
//! flattened so their pairs stay visible, and lookups of absent or
//! unparseable fields report `None` (or a default from the `*_or_default`
//! wrappers, which also log a warning).

use std::iter::Peekable;
use std::str::CharIndices;

/// One scalar value as it appeared on the wire
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scalar {
    /// `"..."` with escapes resolved
    Quoted(String),
    /// Unquoted token, trimmed
    Bare(String),
}

impl Scalar {
    /// Raw text of the value, quotes removed
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Quoted(s) | Self::Bare(s) => s,
        }
    }
}

/// Key/value pairs pulled out of one message, in wire order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatObject {
    fields: Vec<(String, Scalar)>,
}

impl FlatObject {
    /// Tokenize a message
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut fields = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            if c != '"' {
                continue;
            }

            let Some(key) = read_quoted(&mut chars) else {
                // Unterminated string: nothing more to read
                break;
            };

            skip_whitespace(&mut chars);
            if !matches!(chars.peek(), Some((_, ':'))) {
                // A string that is not a key (stray value, array element)
                continue;
            }
            chars.next();
            skip_whitespace(&mut chars);

            match chars.peek().map(|&(_, c)| c) {
                Some('"') => {
                    chars.next();
                    match read_quoted(&mut chars) {
                        Some(value) => fields.push((key, Scalar::Quoted(value))),
                        None => break,
                    }
                }
                // Nested container: keep scanning, its pairs get flattened
                Some('{' | '[') | None => {}
                Some(_) => {
                    let value = read_bare(&mut chars);
                    fields.push((key, Scalar::Bare(value)));
                }
            }
        }

        Self { fields }
    }

    /// Raw scalar for a key (first occurrence wins)
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether the key appeared at all
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of extracted pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing was extracted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// String field; bare tokens other than `null` are accepted as text
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Scalar::Quoted(s) => Some(s),
            Scalar::Bare(s) if s == "null" || s.is_empty() => None,
            Scalar::Bare(s) => Some(s),
        }
    }

    /// Float field, quoted or bare, parsed with `.` as decimal separator
    ///
    /// Non-finite results (`NaN`, `inf`) count as unparseable.
    #[must_use]
    pub fn float(&self, key: &str) -> Option<f32> {
        let value: f32 = self.get(key)?.text().trim().parse().ok()?;
        value.is_finite().then_some(value)
    }

    /// Bool field, case-insensitive `true` / `false`, quoted or bare
    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        let text = self.get(key)?.text().trim();
        if text.eq_ignore_ascii_case("true") {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    /// String field or `""`, logging a warning when absent
    #[must_use]
    pub fn string_or_default(&self, key: &str) -> String {
        if let Some(value) = self.string(key) {
            return value.to_string();
        }
        tracing::warn!(field = key, "Missing string field, using empty default");
        String::new()
    }

    /// Float field or `0.0`, logging a warning when absent or unparseable
    #[must_use]
    pub fn float_or_default(&self, key: &str) -> f32 {
        if let Some(value) = self.float(key) {
            return value;
        }
        match self.get(key) {
            Some(raw) => {
                tracing::warn!(field = key, raw = raw.text(), "Unparseable float, using 0.0");
            }
            None => tracing::warn!(field = key, "Missing float field, using 0.0"),
        }
        0.0
    }

    /// Bool field or `false`, logging a warning when absent or unparseable
    #[must_use]
    pub fn bool_or_default(&self, key: &str) -> bool {
        if let Some(value) = self.bool(key) {
            return value;
        }
        match self.get(key) {
            Some(raw) => {
                tracing::warn!(field = key, raw = raw.text(), "Unparseable bool, using false");
            }
            None => tracing::warn!(field = key, "Missing bool field, using false"),
        }
        false
    }
}

fn skip_whitespace(chars: &mut Peekable<CharIndices<'_>>) {
    while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
        chars.next();
    }
}

/// Read the body of a quoted string; the opening quote is already consumed
///
/// Returns `None` when the input ends before the closing quote.
fn read_quoted(chars: &mut Peekable<CharIndices<'_>>) -> Option<String> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '"' => return Some(out),
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{0008}'),
                    'f' => out.push('\u{000C}'),
                    'u' => {
                        let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                        if let Some(decoded) =
                            u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                        {
                            out.push(decoded);
                        }
                    }
                    // \" \\ \/ and anything unknown: keep the character
                    other => out.push(other),
                }
            }
            _ => out.push(c),
        }
    }
    None
}

/// Read an unquoted token up to `,`, `}`, `]` or a newline
fn read_bare(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if matches!(c, ',' | '}' | ']' | '\n') {
            break;
        }
        out.push(c);
        chars.next();
    }
    out.trim().to_string()
}
