// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The "pack-instruction" tag/value codec: iRODS structures its API
//! request/response bodies as a small XML-like dialect rather than a
//! fixed-width binary layout, so unlike the Basic-Header-Segment framing
//! this is not a zerocopy-friendly struct. [`PackValue`] is the generic
//! value type; [`Encode`]/[`Decode`] are implemented per pack-instruction
//! in [`crate::protocol::messages`].

use std::collections::BTreeMap;

use crate::error::{IrodsError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackValue {
    Text(String),
    Int(i64),
    /// Ordered, but keyed — iRODS pack instructions are small enough that
    /// a `Vec` of pairs is both simpler and order-preserving, which matters
    /// for structures the server parses positionally.
    Struct(Vec<(String, PackValue)>),
    List(Vec<PackValue>),
}

impl PackValue {
    pub fn as_text(&self) -> Result<&str> {
        match self {
            PackValue::Text(s) => Ok(s),
            _ => Err(IrodsError::WireFormat("expected text value".into())),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            PackValue::Int(i) => Ok(*i),
            PackValue::Text(s) => s
                .parse()
                .map_err(|e| IrodsError::WireFormat(format!("not an int: {e}"))),
            _ => Err(IrodsError::WireFormat("expected int value".into())),
        }
    }

    pub fn as_struct(&self) -> Result<&[(String, PackValue)]> {
        match self {
            PackValue::Struct(fields) => Ok(fields),
            _ => Err(IrodsError::WireFormat("expected struct value".into())),
        }
    }

    pub fn as_list(&self) -> Result<&[PackValue]> {
        match self {
            PackValue::List(items) => Ok(items),
            _ => Err(IrodsError::WireFormat("expected list value".into())),
        }
    }

    pub fn field(&self, name: &str) -> Result<&PackValue> {
        self.as_struct()?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .ok_or_else(|| IrodsError::WireFormat(format!("missing field {name}")))
    }
}

/// Trait implemented by every pack-instruction request body.
pub trait Encode {
    /// The pack-instruction name (e.g. `DataObjInp_PI`), sent as the root
    /// element and used by the server to select a decoder.
    fn pi_name(&self) -> &'static str;

    fn to_pack(&self) -> PackValue;

    fn encode(&self) -> String {
        render(self.pi_name(), &self.to_pack())
    }
}

/// Trait implemented by every pack-instruction response body.
pub trait Decode: Sized {
    fn from_pack(value: &PackValue) -> Result<Self>;

    fn decode(xml: &str) -> Result<Self> {
        let (_, value) = parse(xml)?;
        Self::from_pack(&value)
    }
}

fn render(root: &str, value: &PackValue) -> String {
    let mut out = String::new();
    render_into(root, value, &mut out);
    out
}

fn render_into(tag: &str, value: &PackValue, out: &mut String) {
    match value {
        PackValue::Text(s) => {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            escape_into(s, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        },
        PackValue::Int(i) => {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            out.push_str(&i.to_string());
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        },
        PackValue::Struct(fields) => {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            for (k, v) in fields {
                render_into(k, v, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        },
        PackValue::List(items) => {
            for item in items {
                render_into(tag, item, out);
            }
        },
    }
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// Minimal recursive-descent parser for the flat tag/value dialect above.
/// Returns `(root_tag, value)`. Sibling tags with the same name are
/// collapsed into a [`PackValue::List`]; everything else with children
/// becomes a [`PackValue::Struct`], and leaves without children become
/// [`PackValue::Text`].
pub fn parse(xml: &str) -> Result<(String, PackValue)> {
    let mut pos = 0usize;
    let bytes = xml.as_bytes();
    skip_ws(bytes, &mut pos);
    let (tag, value, _) = parse_element(xml, &mut pos)?;
    Ok((tag, value))
}

fn skip_ws(bytes: &[u8], pos: &mut usize) {
    while *pos < bytes.len() && (bytes[*pos] as char).is_whitespace() {
        *pos += 1;
    }
}

fn parse_element(xml: &str, pos: &mut usize) -> Result<(String, PackValue, ())> {
    let bytes = xml.as_bytes();
    skip_ws(bytes, pos);
    if bytes.get(*pos) != Some(&b'<') {
        return Err(IrodsError::WireFormat("expected '<'".into()));
    }
    *pos += 1;
    let name_start = *pos;
    while bytes.get(*pos) != Some(&b'>') {
        *pos += 1;
        if *pos > bytes.len() {
            return Err(IrodsError::WireFormat("unterminated tag".into()));
        }
    }
    let tag = xml[name_start..*pos].to_string();
    *pos += 1; // consume '>'

    let close = format!("</{tag}>");
    let body_start = *pos;
    let close_pos = xml[body_start..]
        .find(&close)
        .ok_or_else(|| IrodsError::WireFormat(format!("missing close tag for {tag}")))?
        + body_start;
    let inner = &xml[body_start..close_pos];
    *pos = close_pos + close.len();

    let trimmed = inner.trim();
    if trimmed.starts_with('<') {
        let mut fields: Vec<(String, PackValue)> = Vec::new();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut ipos = 0usize;
        let ibytes = inner.as_bytes();
        loop {
            skip_ws(ibytes, &mut ipos);
            if ipos >= inner.len() {
                break;
            }
            let (child_tag, child_val, _) = parse_element(inner, &mut ipos)?;
            if let Some(&idx) = seen.get(&child_tag) {
                if let PackValue::List(items) = &mut fields[idx].1 {
                    items.push(child_val);
                } else {
                    let prev = fields[idx].1.clone();
                    fields[idx].1 = PackValue::List(vec![prev, child_val]);
                }
            } else {
                seen.insert(child_tag.clone(), fields.len());
                fields.push((child_tag, child_val));
            }
        }
        Ok((tag, PackValue::Struct(fields), ()))
    } else {
        Ok((tag, PackValue::Text(unescape(trimmed)), ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_flat_struct() {
        let value = PackValue::Struct(vec![
            ("objPath".to_string(), PackValue::Text("/zone/home/alice/a.txt".to_string())),
            ("dataSize".to_string(), PackValue::Int(42)),
        ]);
        let xml = render("DataObjInp_PI", &value);
        let (tag, parsed) = parse(&xml).expect("parse");
        assert_eq!(tag, "DataObjInp_PI");
        assert_eq!(parsed.field("objPath").unwrap().as_text().unwrap(), "/zone/home/alice/a.txt");
        assert_eq!(parsed.field("dataSize").unwrap().as_int().unwrap(), 42);
    }

    #[test]
    fn escapes_special_characters_in_text() {
        let value = PackValue::Text("<weird> & path".to_string());
        let xml = render("Tag", &value);
        assert!(!xml.contains("<weird>"));
        let (_, parsed) = parse(&xml).expect("parse");
        assert_eq!(parsed.as_text().unwrap(), "<weird> & path");
    }

    #[test]
    fn repeated_sibling_tags_collapse_into_list() {
        let xml = "<KeyValPair_PI><len>2</len><keyWord>a</keyWord><keyWord>b</keyWord></KeyValPair_PI>";
        let (_, parsed) = parse(xml).expect("parse");
        let kw = parsed.field("keyWord").unwrap();
        let items = kw.as_list().expect("list");
        assert_eq!(items.len(), 2);
    }
}
