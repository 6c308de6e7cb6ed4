//! XML decoding
//!
//! The document is read into a tree of ordered mappings. Each element becomes
//! a mapping whose first key is `tag`, followed by its attributes and then its
//! children keyed by child tag. Repeated child tags collect into a list. An
//! element with text and nothing else collapses to that text.
//!
//! Rows are the first list found in the tree: the root's own values are
//! checked first, then each value is searched in order. A document without
//! any repeated element yields the root as its only row.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::Value;
use std::io::BufRead;

use super::{Decoder, RawRows};
use crate::error::BoxError;
use crate::format::FormatTag;
use crate::record::Record;
use crate::source::SourceOptions;

/// Decoder for XML documents
pub struct XmlDecoder;

impl Decoder for XmlDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::Xml
    }

    fn decode(
        &self,
        input: Box<dyn BufRead>,
        _options: &SourceOptions,
    ) -> Result<RawRows, BoxError> {
        let root = read_tree(input)?;
        let rows = match first_list(&root) {
            Some(list) => list.clone(),
            None => vec![Value::Object(root)],
        };
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

struct Node {
    tag: String,
    fields: Record,
    text: String,
    seen_child: bool,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, BoxError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Record::new();
        fields.insert("tag".to_string(), Value::String(tag.clone()));
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            fields.insert(key, Value::String(value));
        }
        Ok(Self {
            tag,
            fields,
            text: String::new(),
            seen_child: false,
        })
    }

    fn push_text(&mut self, text: &str) {
        if !self.seen_child {
            self.text.push_str(text);
        }
    }

    fn attach(&mut self, tag: String, child: Value) {
        self.seen_child = true;
        match self.fields.get_mut(&tag) {
            Some(Value::Array(items)) => items.push(child),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, child]);
            }
            None => {
                self.fields.insert(tag, child);
            }
        }
    }

    fn finish(mut self) -> (String, Value) {
        let text = self.text.trim();
        if !text.is_empty() {
            if self.fields.len() == 1 {
                return (self.tag, Value::String(text.to_string()));
            }
            let text = text.to_string();
            self.fields.insert("text".to_string(), Value::String(text));
        }
        (self.tag, Value::Object(self.fields))
    }
}

fn read_tree(input: Box<dyn BufRead>) -> Result<Record, BoxError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Record> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err("more than one root element".into());
                }
                stack.push(Node::open(&start)?);
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err("more than one root element".into());
                }
                let node = Node::open(&start)?;
                close(node, &mut stack, &mut root);
            }
            Event::End(_) => {
                let node = stack.pop().ok_or("unbalanced end tag")?;
                close(node, &mut stack, &mut root);
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    node.push_text(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.push_text(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".into());
    }
    root.ok_or_else(|| "no root element".into())
}

fn close(node: Node, stack: &mut [Node], root: &mut Option<Record>) {
    let (tag, value) = node.finish();
    match stack.last_mut() {
        Some(parent) => parent.attach(tag, value),
        None => {
            *root = Some(match value {
                Value::Object(fields) => fields,
                text => {
                    let mut fields = Record::new();
                    fields.insert("tag".to_string(), Value::String(tag));
                    fields.insert("text".to_string(), text);
                    fields
                }
            });
        }
    }
}

fn first_list(node: &Record) -> Option<&Vec<Value>> {
    if let Some(list) = node.values().find_map(Value::as_array) {
        return Some(list);
    }
    node.values().filter_map(Value::as_object).find_map(first_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(text: &str) -> Result<Vec<Value>, BoxError> {
        let input: Box<dyn BufRead> = Box::new(std::io::Cursor::new(text.as_bytes().to_vec()));
        XmlDecoder.decode(input, &SourceOptions::default())?.collect()
    }

    #[test]
    fn test_repeated_elements_are_rows() {
        let rows = decode(
            r#"<?xml version="1.0"?>
            <people>
              <person id="1"><name>Alice</name></person>
              <person id="2"><name>Bob</name></person>
            </people>"#,
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                json!({"tag": "person", "id": "1", "name": "Alice"}),
                json!({"tag": "person", "id": "2", "name": "Bob"}),
            ]
        );
    }

    #[test]
    fn test_field_order_is_tag_attributes_children() {
        let rows = decode(r#"<r><i b="1" a="2"><z>x</z><y>y</y></i><i/></r>"#).unwrap();
        let keys: Vec<&str> = rows[0].as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["tag", "b", "a", "z", "y"]);
    }

    #[test]
    fn test_nested_list_is_found() {
        let rows = decode(
            "<catalog><meta><owner>x</owner></meta><items><item>a</item><item>b</item></items></catalog>",
        )
        .unwrap();
        assert_eq!(rows, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_no_list_yields_root() {
        let rows = decode(r#"<config env="prod"><name>svc</name></config>"#).unwrap();
        assert_eq!(rows, vec![json!({"tag": "config", "env": "prod", "name": "svc"})]);
    }

    #[test]
    fn test_text_beside_attributes() {
        let rows = decode(r#"<r><v unit="kg">5</v><v unit="g">7</v></r>"#).unwrap();
        assert_eq!(rows[0], json!({"tag": "v", "unit": "kg", "text": "5"}));
    }

    #[test]
    fn test_cdata_and_entities() {
        let rows = decode("<r><a><![CDATA[x < y]]></a><b>&amp;</b></r>").unwrap();
        assert_eq!(rows, vec![json!({"tag": "r", "a": "x < y", "b": "&"})]);
    }

    #[test]
    fn test_truncated_document_fails() {
        assert!(decode("<rows><row>").is_err());
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(decode("").is_err());
    }
}
