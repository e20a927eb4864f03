//! The structured-markup tree the interpreter walks.
//!
//! Parsed microformats are modeled as a tagged variant rather than loose
//! dictionaries, so extraction precedence lives in pure functions over this
//! type instead of ad hoc probing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One property value inside a [`MicroformatNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    /// A plain string (p-/u-/dt- properties).
    Text { value: String },

    /// A rich value carrying both markup and a plaintext rendering
    /// (e-content and friends).
    Rich { html: String, text: String },

    /// A nested node (embedded h-card, h-cite, ...).
    Node { node: MicroformatNode },
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text {
            value: value.into(),
        }
    }

    pub fn rich(html: impl Into<String>, text: impl Into<String>) -> Self {
        Value::Rich {
            html: html.into(),
            text: text.into(),
        }
    }

    pub fn node(node: MicroformatNode) -> Self {
        Value::Node { node }
    }

    /// The plaintext rendering of this value, if it has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text { value } => Some(value),
            Value::Rich { text, .. } => Some(text),
            Value::Node { .. } => None,
        }
    }

    pub fn as_node(&self) -> Option<&MicroformatNode> {
        match self {
            Value::Node { node } => Some(node),
            _ => None,
        }
    }

    /// URL strings this value can stand for: a text value is itself a
    /// candidate, a nested node contributes its `url` property values.
    pub fn url_candidates(&self) -> Vec<&str> {
        match self {
            Value::Text { value } => vec![value.as_str()],
            Value::Rich { .. } => Vec::new(),
            Value::Node { node } => node
                .property("url")
                .iter()
                .filter_map(|v| v.as_text())
                .collect(),
        }
    }
}

/// A parsed microformats node: type set, property map, nested children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroformatNode {
    /// Microformat types, e.g. `h-entry`, `h-card`.
    pub types: Vec<String>,

    /// Property name (without prefix) to ordered value list.
    pub properties: BTreeMap<String, Vec<Value>>,

    /// Nested child nodes that are not property values.
    pub children: Vec<MicroformatNode>,
}

impl MicroformatNode {
    pub fn new(ty: impl Into<String>) -> Self {
        MicroformatNode {
            types: vec![ty.into()],
            ..Default::default()
        }
    }

    pub fn has_type(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }

    /// All values of a property, empty when absent.
    pub fn property(&self, name: &str) -> &[Value] {
        self.properties.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First plaintext value of a property.
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.property(name).iter().find_map(|v| v.as_text())
    }

    /// First nested node value of a property.
    pub fn first_node(&self, name: &str) -> Option<&MicroformatNode> {
        self.property(name).iter().find_map(|v| v.as_node())
    }

    /// Every URL string asserted by a property, in order.
    pub fn property_urls(&self, name: &str) -> Vec<&str> {
        self.property(name)
            .iter()
            .flat_map(|v| v.url_candidates())
            .collect()
    }

    /// Appends a value to a property (builder-style, used by parsers and tests).
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push_property(name, value);
        self
    }

    pub fn push_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.entry(name.into()).or_default().push(value);
    }
}

/// A whole parsed document: zero or more top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mf2Tree {
    pub items: Vec<MicroformatNode>,
}

impl Mf2Tree {
    pub fn new(items: Vec<MicroformatNode>) -> Self {
        Mf2Tree { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The top-level semantic entry to interpret: the first `h-entry`,
    /// searching items in order and then descending into children (entries
    /// nested under an `h-feed`).
    pub fn find_entry(&self) -> Option<&MicroformatNode> {
        fn descend<'a>(node: &'a MicroformatNode) -> Option<&'a MicroformatNode> {
            if node.has_type("h-entry") {
                return Some(node);
            }
            node.children.iter().find_map(descend)
        }
        self.items.iter().find_map(descend)
    }

    /// The first page-level `h-card`, used as the author fallback.
    pub fn find_card(&self) -> Option<&MicroformatNode> {
        self.items.iter().find(|n| n.has_type("h-card"))
    }
}
