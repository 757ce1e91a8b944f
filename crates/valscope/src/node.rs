use crate::value::{ClassRef, Identity, Name, Visibility};
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Well-known hint tags.
pub mod hint {
    pub const RECURSION: &str = "recursion";
    pub const DEPTH_LIMIT: &str = "depth_limit";
    pub const BLACKLIST: &str = "blacklist";
    /// Marks the representation a summary view should show first.
    pub const PRIMARY: &str = "primary";
}

// ============================================================================
// Tags
// ============================================================================

/// Semantic category of a value, the unit of plugin dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
    Resource,
    ResourceClosed,
    Uninitialized,
    #[default]
    Unknown,
}

impl Kind {
    pub fn is_composite(self) -> bool {
        matches!(self, Kind::Array | Kind::Object)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Resource => "resource",
            Kind::ResourceClosed => "resource_closed",
            Kind::Uninitialized => "uninitialized",
            Kind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a node was reached from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[default]
    None,
    Index,
    Property,
    Static,
}

/// Leaf payload of a scalar node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Detected text encoding of a string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Ascii,
    Utf8,
    Binary,
}

impl Encoding {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.is_ascii() {
            Encoding::Ascii
        } else if std::str::from_utf8(bytes).is_ok() {
            Encoding::Utf8
        } else {
            Encoding::Binary
        }
    }
}

/// The concrete flavor of a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum NodeDetail {
    #[default]
    Generic,
    Blob {
        encoding: Encoding,
    },
    Instance {
        class: String,
        identity: Identity,
    },
    Resource {
        resource_type: String,
    },
}

// ============================================================================
// Representation
// ============================================================================

/// What a representation holds: child nodes, or one raw leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Contents {
    Nodes(Vec<Node>),
    Raw(Scalar),
}

/// A named view of a node's children.
///
/// `key` is the lookup handle; `label` is for display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Representation {
    pub label: String,
    pub key: String,
    pub contents: Contents,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub hints: BTreeSet<String>,
}

impl Representation {
    /// New empty representation keyed by a slug of `label`.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            key: slug(&label),
            label,
            contents: Contents::Nodes(Vec::new()),
            hints: BTreeSet::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.contents = Contents::Nodes(nodes);
        self
    }

    pub fn with_raw(mut self, raw: Scalar) -> Self {
        self.contents = Contents::Raw(raw);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.insert(hint.into());
        self
    }

    pub fn has_hint(&self, hint: &str) -> bool {
        self.hints.contains(hint)
    }

    /// Child nodes; empty for a raw representation.
    pub fn nodes(&self) -> &[Node] {
        match &self.contents {
            Contents::Nodes(nodes) => nodes,
            Contents::Raw(_) => &[],
        }
    }

    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.contents {
            Contents::Nodes(nodes) => Some(nodes),
            Contents::Raw(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.contents {
            Contents::Nodes(nodes) => nodes.len(),
            Contents::Raw(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn slug(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// Node
// ============================================================================

/// Description of one value.
///
/// Built fresh by every [`Parser::parse`](crate::v1::Parser::parse) call.
/// Representations keep insertion order and are looked up by key.
///
/// ```
/// use valscope::v1::{Node, Representation, Scalar};
///
/// let mut node = Node::new("$v").with_access_path("$v");
/// node.add_representation(Representation::new("Hex dump").with_raw(Scalar::Str("ff".into())));
/// assert!(node.representation("hex_dump").is_some());
///
/// node.add_hint("custom");
/// assert!(node.has_hint("custom"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Node {
    pub name: Name,
    pub kind: Kind,
    pub depth: usize,
    pub access_path: Option<String>,
    pub operator: Operator,
    /// Set on object members only.
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_const: bool,
    pub is_readonly: bool,
    /// Declaring class of a member.
    #[serde(serialize_with = "serialize_owner")]
    pub owner: Option<ClassRef>,
    pub hints: BTreeSet<String>,
    pub value: Option<Scalar>,
    pub size: Option<usize>,
    pub detail: NodeDetail,
    representations: Vec<Representation>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

fn serialize_owner<S: Serializer>(owner: &Option<ClassRef>, s: S) -> Result<S::Ok, S::Error> {
    match owner {
        Some(class) => s.serialize_some(class.name()),
        None => s.serialize_none(),
    }
}

impl Node {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_access_path(mut self, path: impl Into<String>) -> Self {
        self.access_path = Some(path.into());
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_detail(mut self, detail: NodeDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn add_hint(&mut self, hint: impl Into<String>) {
        self.hints.insert(hint.into());
    }

    pub fn has_hint(&self, hint: &str) -> bool {
        self.hints.contains(hint)
    }

    pub fn remove_hint(&mut self, hint: &str) -> bool {
        self.hints.remove(hint)
    }

    /// Attach a representation, replacing any existing one with the same key
    /// in its original position. Returns the replaced representation.
    pub fn add_representation(&mut self, rep: Representation) -> Option<Representation> {
        match self.index.get(&rep.key) {
            Some(&i) => Some(std::mem::replace(&mut self.representations[i], rep)),
            None => {
                self.index.insert(rep.key.clone(), self.representations.len());
                self.representations.push(rep);
                None
            }
        }
    }

    pub fn representation(&self, key: &str) -> Option<&Representation> {
        self.index.get(key).map(|&i| &self.representations[i])
    }

    pub fn representation_mut(&mut self, key: &str) -> Option<&mut Representation> {
        self.index.get(key).map(|&i| &mut self.representations[i])
    }

    pub fn remove_representation(&mut self, key: &str) -> Option<Representation> {
        let i = self.index.remove(key)?;
        let removed = self.representations.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn clear_representations(&mut self) {
        self.representations.clear();
        self.index.clear();
    }

    /// All representations in display order.
    pub fn representations(&self) -> &[Representation] {
        &self.representations
    }

    /// The first representation hinted [`hint::PRIMARY`].
    pub fn primary(&self) -> Option<&Representation> {
        self.representations
            .iter()
            .find(|r| r.has_hint(hint::PRIMARY))
    }

    /// Children of the primary representation.
    pub fn children(&self) -> &[Node] {
        self.primary().map(|r| r.nodes()).unwrap_or(&[])
    }

    /// Child of the primary representation by name.
    pub fn child(&self, name: impl Into<Name>) -> Option<&Node> {
        let name = name.into();
        self.children().iter().find(|c| c.name == name)
    }

    /// Take over everything `donor` carries except its flavor.
    ///
    /// Used to swap a node for one of a different [`NodeDetail`] without
    /// losing what the traversal already assigned. Hints are merged.
    pub fn transplant(&mut self, donor: Node) {
        let Node {
            name,
            kind,
            depth,
            access_path,
            operator,
            visibility,
            is_static,
            is_const,
            is_readonly,
            owner,
            hints,
            value,
            size,
            detail: _,
            representations,
            index,
        } = donor;

        self.name = name;
        self.kind = kind;
        self.depth = depth;
        self.access_path = access_path;
        self.operator = operator;
        self.visibility = visibility;
        self.is_static = is_static;
        self.is_const = is_const;
        self.is_readonly = is_readonly;
        self.owner = owner;
        self.hints.extend(hints);
        self.value = value;
        self.size = size;
        self.representations = representations;
        self.index = index;
    }

    /// Pre-order walk over this node and every node in any representation.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }
}

/// Iterator returned by [`Node::iter`].
pub struct NodeIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for rep in node.representations.iter().rev() {
            self.stack.extend(rep.nodes().iter().rev());
        }
        Some(node)
    }
}
