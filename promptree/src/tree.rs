//! Immutable component tree handed over by the authoring front-end.
//!
//! JSON wire form: `null` is [`Node::Empty`], a string is [`Node::Text`], an
//! array is [`Node::Fragment`] and an object `{ "tag", "props", "children" }`
//! is [`Node::Element`].
//!
//! [`Node::Literal`] never appears on the wire. Components emit it for
//! generated text (answers, runtime facts, code bodies) that must print
//! verbatim instead of being rendered as a template.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Component props keyed by name.
pub type Props = Map<String, Value>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Node {
    #[default]
    Empty,
    Text(String),
    Fragment(Vec<Node>),
    Element(Element),
    #[serde(skip_deserializing)]
    Literal(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Props,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Node::Literal(text.into())
    }

    /// Same tree with every text node turned into a literal.
    pub fn into_literal(self) -> Self {
        match self {
            Node::Text(text) => Node::Literal(text),
            Node::Fragment(nodes) => {
                Node::Fragment(nodes.into_iter().map(Node::into_literal).collect())
            }
            other => other,
        }
    }

    pub fn fragment<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        Node::Fragment(nodes.into_iter().map(Into::into).collect())
    }

    /// Tag of an element node, `None` for text, fragments and empty nodes.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Element(element) => Some(element.tag.as_str()),
            _ => None,
        }
    }

    /// Direct children with fragments spliced in and empty nodes dropped.
    pub fn flatten(nodes: &[Node]) -> Vec<&Node> {
        let mut out = Vec::new();
        flatten_into(nodes, &mut out);
        out
    }
}

fn flatten_into<'a>(nodes: &'a [Node], out: &mut Vec<&'a Node>) {
    for node in nodes {
        match node {
            Node::Empty => {}
            Node::Fragment(inner) => flatten_into(inner, out),
            other => out.push(other),
        }
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Fragment(nodes)
    }
}
