//! Outline import/export.
//!
//! An outline is a nested, serde-friendly description of a document:
//!
//! ```json
//! [
//!   { "container": "p", "attributes": { "class": "lead" }, "children": [
//!     { "text": "Hello " },
//!     { "text": "world", "formats": ["b"] },
//!     "lineBreak",
//!     { "atomic": "img", "attributes": { "src": "a.png" } }
//!   ] }
//! ]
//! ```
//!
//! Text expands to one `Char` node per character. Only format modifiers on
//! characters survive an export; other character modifiers are dropped.

use crate::errors::{TreeError, TreeResult};
use crate::modifiers::{Attributes, Modifier, Modifiers};
use crate::node::{any, NodeId, NodeKind, NodeRef};
use crate::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outline {
    Container {
        container: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Outline>,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        formats: Vec<String>,
    },
    Atomic {
        atomic: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
    },
    Keyword(Keyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Keyword {
    LineBreak,
}

impl Outline {
    pub fn container(name: impl Into<String>, children: Vec<Outline>) -> Self {
        Outline::Container {
            container: name.into(),
            attributes: BTreeMap::new(),
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Outline::Text {
            text: text.into(),
            formats: Vec::new(),
        }
    }

    pub fn formatted(text: impl Into<String>, formats: &[&str]) -> Self {
        Outline::Text {
            text: text.into(),
            formats: formats.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn parse(json: &str) -> TreeResult<Vec<Outline>> {
        serde_json::from_str(json).map_err(|err| TreeError::Outline(err.to_string()))
    }
}

fn attribute_modifiers(attributes: &BTreeMap<String, String>) -> Modifiers {
    if attributes.is_empty() {
        return Modifiers::new();
    }
    let mut set = Attributes::new();
    for (name, value) in attributes {
        set.set(name.clone(), value.clone());
    }
    std::iter::once(Modifier::Attributes(set)).collect()
}

impl Document {
    pub fn from_outline(outline: &[Outline]) -> TreeResult<Document> {
        let mut doc = Document::new();
        doc.append_outline(doc.root_id(), outline)?;
        doc.take_changes();
        Ok(doc)
    }

    /// Build `outline` and append it to `parent`, returning the new top-level
    /// nodes
    pub fn append_outline(&mut self, parent: NodeId, outline: &[Outline]) -> TreeResult<Vec<NodeId>> {
        let mut created = Vec::new();
        for entry in outline {
            created.extend(self.build_outline(entry)?);
        }
        self.append(parent, &created)?;
        Ok(created)
    }

    fn build_outline(&mut self, outline: &Outline) -> TreeResult<Vec<NodeId>> {
        match outline {
            Outline::Container {
                container,
                attributes,
                children,
            } => {
                let node = self.create_with(NodeKind::container(container.as_str()), attribute_modifiers(attributes));
                self.append_outline(node, children)?;
                Ok(vec![node])
            }
            Outline::Text { text, formats } => Ok(text
                .chars()
                .map(|c| {
                    let modifiers = formats.iter().map(|f| Modifier::format(f.as_str())).collect();
                    self.create_with(NodeKind::char(c), modifiers)
                })
                .collect()),
            Outline::Atomic { atomic, attributes } => {
                Ok(vec![self.create_with(NodeKind::atomic(atomic.as_str()), attribute_modifiers(attributes))])
            }
            Outline::Keyword(Keyword::LineBreak) => Ok(vec![self.create(NodeKind::LineBreak)]),
        }
    }

    /// Export the tangible content under the root
    pub fn to_outline(&self) -> Vec<Outline> {
        export_children(self.root())
    }
}

fn export_children(node: NodeRef<'_>) -> Vec<Outline> {
    let mut outline = Vec::new();
    for child in node.children(any) {
        match child.kind() {
            NodeKind::Char { value } => {
                let formats: Vec<String> = child
                    .modifiers()
                    .formats()
                    .filter_map(|m| match m {
                        Modifier::Format { name, .. } => Some(name.clone()),
                        _ => None,
                    })
                    .collect();
                match outline.last_mut() {
                    Some(Outline::Text { text, formats: previous }) if *previous == formats => text.push(*value),
                    _ => outline.push(Outline::Text {
                        text: value.to_string(),
                        formats,
                    }),
                }
            }
            NodeKind::Container { name } => outline.push(Outline::Container {
                container: name.clone(),
                attributes: child.modifiers().attribute_pairs().into_iter().collect(),
                children: export_children(child),
            }),
            NodeKind::Atomic { name } => outline.push(Outline::Atomic {
                atomic: name.clone(),
                attributes: child.modifiers().attribute_pairs().into_iter().collect(),
            }),
            NodeKind::LineBreak => outline.push(Outline::Keyword(Keyword::LineBreak)),
            NodeKind::Root | NodeKind::Marker => {}
        }
    }
    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        { "container": "p", "attributes": { "class": "lead" }, "children": [
            { "text": "ab" },
            { "text": "c", "formats": ["b"] },
            "lineBreak",
            { "atomic": "img", "attributes": { "src": "a.png" } }
        ] },
        { "container": "p" }
    ]"#;

    #[test]
    fn test_parse_and_build() {
        let outline = Outline::parse(SAMPLE).unwrap();
        let doc = Document::from_outline(&outline).unwrap();

        let paragraphs = doc.root().children(any);
        assert_eq!(paragraphs.len(), 2);
        let p = paragraphs[0];
        assert_eq!(p.name(), "p");
        assert!(p.modifiers().attributes().unwrap().has_class("lead"));
        assert_eq!(p.children(any).len(), 5);
        assert_eq!(doc.text_content(p.id()), "abc");
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_export_folds_equal_runs() {
        let outline = Outline::parse(SAMPLE).unwrap();
        let doc = Document::from_outline(&outline).unwrap();
        assert_eq!(doc.to_outline(), outline);
    }

    #[test]
    fn test_invalid_outline() {
        assert!(matches!(Outline::parse("{"), Err(TreeError::Outline(_))));
    }
}
