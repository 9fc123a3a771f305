//! Structured action arguments.
//!
//! Alfred hands an action script a single string. Workflows that need more
//! than one value encode them as a flat element list:
//!
//! ```text
//! <root><action>reveal</action><path>/tmp/a &amp; b</path></root>
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::xml::{escape_xml, unescape_xml};

const ROOT_TAG: &str = "root";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("invalid element name: {0:?}")]
    InvalidName(String),
    #[error("malformed argument document at byte {0}")]
    Malformed(usize),
    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedTag { expected: String, found: String },
    #[error("invalid character reference in <{0}>")]
    InvalidEntity(String),
}

pub fn encode_args(values: &BTreeMap<String, String>) -> Result<String, ArgsError> {
    let mut output = format!("<{ROOT_TAG}>");
    for (key, value) in values {
        if !is_xml_name(key) {
            return Err(ArgsError::InvalidName(key.clone()));
        }
        output.push_str(&format!("<{key}>{}</{key}>", escape_value(value)));
    }
    output.push_str(&format!("</{ROOT_TAG}>"));
    Ok(output)
}

/// Like [`escape_xml`], but C0 controls become character references so the
/// value decodes back unchanged.
fn escape_value(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    let mut plain_start = 0;
    for (index, ch) in raw.char_indices() {
        if ch < '\u{20}' && !matches!(ch, '\t' | '\n' | '\r') {
            escaped.push_str(&escape_xml(&raw[plain_start..index]));
            escaped.push_str(&format!("&#x{:X};", u32::from(ch)));
            plain_start = index + ch.len_utf8();
        }
    }
    escaped.push_str(&escape_xml(&raw[plain_start..]));
    escaped
}

/// Decodes a document produced by [`encode_args`]. The root element name is
/// not checked; a repeated key keeps its last value.
pub fn decode_args(raw: &str) -> Result<BTreeMap<String, String>, ArgsError> {
    let mut cursor = Cursor::new(raw);
    cursor.skip_whitespace();
    cursor.skip_declaration()?;
    cursor.skip_whitespace();

    let root = cursor.open_tag()?;
    let mut values = BTreeMap::new();

    if !root.self_closing {
        loop {
            cursor.skip_whitespace();
            if cursor.starts_with("</") {
                cursor.close_tag(&root.name)?;
                break;
            }

            let element = cursor.open_tag()?;
            let value = if element.self_closing {
                String::new()
            } else {
                let text = cursor.text();
                cursor.close_tag(&element.name)?;
                unescape_xml(text).ok_or_else(|| ArgsError::InvalidEntity(element.name.clone()))?
            };
            values.insert(element.name, value);
        }
    }

    cursor.skip_whitespace();
    if !cursor.is_done() {
        return Err(ArgsError::Malformed(cursor.position));
    }

    Ok(values)
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if name.to_ascii_lowercase().starts_with("xml") {
        return false;
    }
    chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

struct OpenTag {
    name: String,
    self_closing: bool,
}

struct Cursor<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn is_done(&self) -> bool {
        self.position >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.position += rest.len() - rest.trim_start().len();
    }

    fn skip_declaration(&mut self) -> Result<(), ArgsError> {
        if !self.starts_with("<?xml") {
            return Ok(());
        }
        let end = self
            .rest()
            .find("?>")
            .ok_or(ArgsError::Malformed(self.position))?;
        self.position += end + 2;
        Ok(())
    }

    fn expect(&mut self, token: &str) -> Result<(), ArgsError> {
        if !self.starts_with(token) {
            return Err(ArgsError::Malformed(self.position));
        }
        self.position += token.len();
        Ok(())
    }

    fn name(&mut self) -> Result<String, ArgsError> {
        let rest = self.rest();
        let end = rest
            .find(|ch: char| ch.is_whitespace() || matches!(ch, '>' | '/' | '<'))
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if !is_xml_name(name) {
            return Err(ArgsError::InvalidName(name.to_string()));
        }
        self.position += end;
        Ok(name.to_string())
    }

    fn open_tag(&mut self) -> Result<OpenTag, ArgsError> {
        self.expect("<")?;
        let name = self.name()?;
        self.skip_whitespace();
        if self.starts_with("/>") {
            self.position += 2;
            return Ok(OpenTag {
                name,
                self_closing: true,
            });
        }
        self.expect(">")?;
        Ok(OpenTag {
            name,
            self_closing: false,
        })
    }

    fn close_tag(&mut self, expected: &str) -> Result<(), ArgsError> {
        self.expect("</")?;
        let found = self.name()?;
        if found != expected {
            return Err(ArgsError::MismatchedTag {
                expected: expected.to_string(),
                found,
            });
        }
        self.skip_whitespace();
        self.expect(">")
    }

    fn text(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest.find('<').unwrap_or(rest.len());
        self.position += end;
        &rest[..end]
    }
}
