//! The node graph shared by the composer (load) and the representer (dump).
//!
//! Nodes are reference counted: an alias is the very same [`NodeRef`] as the anchored node it
//! refers to. Collections get their children after they are registered under their anchor, so
//! an alias to an enclosing collection produces a cycle. Such cycles are not reclaimed.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::parser::Tag;
use crate::reader::Marker;
use crate::scanner::TScalarStyle;

/// A shared handle to a node.
pub type NodeRef = Rc<Node>;

/// A full-line comment or a blank line preceding a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentLine {
    /// Column of the `#`.
    pub col: usize,
    /// The comment, `#` included. Empty for a blank line.
    pub text: String,
}

impl CommentLine {
    #[must_use]
    pub fn blank() -> CommentLine {
        CommentLine {
            col: 0,
            text: String::new(),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// A comment at the end of the line a node ends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrailingComment {
    /// Column of the `#`.
    pub col: usize,
    /// Number of spaces between the end of the node and the `#`.
    pub gap: usize,
    /// The comment, `#` included.
    pub text: String,
}

/// Comments attached to a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comments {
    pub before: Vec<CommentLine>,
    pub trailing: Option<TrailingComment>,
}

impl Comments {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.trailing.is_none()
    }
}

/// Contents of a node.
pub enum NodeKind {
    /// Text and the style it was (or should be) written in.
    Scalar(String, TScalarStyle),
    /// Items, and whether the sequence is in flow style.
    Sequence(RefCell<Vec<NodeRef>>, Cell<bool>),
    /// Key/value pairs in order (keys need not be unique), and whether the mapping is in flow
    /// style.
    Mapping(RefCell<Vec<(NodeRef, NodeRef)>>, Cell<bool>),
}

/// A node of a composed document.
pub struct Node {
    /// The full tag, explicit or resolved.
    pub tag: String,
    /// The tag as written, when there was one.
    pub explicit_tag: Option<Tag>,
    pub anchor: RefCell<Option<String>>,
    pub start: Marker,
    pub end: Cell<Marker>,
    pub comments: RefCell<Comments>,
    pub kind: NodeKind,
}

impl Node {
    /// A new scalar node.
    #[must_use]
    pub fn scalar(tag: &str, value: String, style: TScalarStyle) -> Node {
        Node::with_kind(tag, NodeKind::Scalar(value, style))
    }

    /// A new, empty sequence node.
    #[must_use]
    pub fn sequence(tag: &str, flow: bool) -> Node {
        Node::with_kind(tag, NodeKind::Sequence(RefCell::new(Vec::new()), Cell::new(flow)))
    }

    /// A new, empty mapping node.
    #[must_use]
    pub fn mapping(tag: &str, flow: bool) -> Node {
        Node::with_kind(tag, NodeKind::Mapping(RefCell::new(Vec::new()), Cell::new(flow)))
    }

    fn with_kind(tag: &str, kind: NodeKind) -> Node {
        Node {
            tag: tag.to_owned(),
            explicit_tag: None,
            anchor: RefCell::new(None),
            start: Marker::default(),
            end: Cell::new(Marker::default()),
            comments: RefCell::new(Comments::default()),
            kind,
        }
    }

    #[must_use]
    pub fn with_explicit_tag(mut self, tag: Option<Tag>) -> Node {
        self.explicit_tag = tag;
        self
    }

    #[must_use]
    pub fn with_anchor(self, anchor: Option<String>) -> Node {
        *self.anchor.borrow_mut() = anchor;
        self
    }

    #[must_use]
    pub fn at(mut self, start: Marker, end: Marker) -> Node {
        self.start = start;
        self.end.set(end);
        self
    }

    #[must_use]
    pub fn into_ref(self) -> NodeRef {
        Rc::new(self)
    }

    /// The text of a scalar node.
    #[must_use]
    pub fn scalar_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(v, _) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn style(&self) -> Option<TScalarStyle> {
        match &self.kind {
            NodeKind::Scalar(_, style) => Some(*style),
            _ => None,
        }
    }

    /// Whether the collection is in flow style. `false` for scalars.
    #[must_use]
    pub fn is_flow(&self) -> bool {
        match &self.kind {
            NodeKind::Scalar(..) => false,
            NodeKind::Sequence(_, flow) | NodeKind::Mapping(_, flow) => flow.get(),
        }
    }

    /// Switch a collection between flow and block style.
    pub fn set_flow(&self, value: bool) {
        if let NodeKind::Sequence(_, flow) | NodeKind::Mapping(_, flow) = &self.kind {
            flow.set(value);
        }
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(..))
    }

    #[must_use]
    pub fn items(&self) -> Option<Ref<'_, Vec<NodeRef>>> {
        match &self.kind {
            NodeKind::Sequence(items, _) => Some(items.borrow()),
            _ => None,
        }
    }

    #[must_use]
    pub fn pairs(&self) -> Option<Ref<'_, Vec<(NodeRef, NodeRef)>>> {
        match &self.kind {
            NodeKind::Mapping(pairs, _) => Some(pairs.borrow()),
            _ => None,
        }
    }

    /// Append an item to a sequence node. Does nothing on other nodes.
    pub fn push_item(&self, item: NodeRef) {
        if let NodeKind::Sequence(items, _) = &self.kind {
            items.borrow_mut().push(item);
        }
    }

    /// Append a pair to a mapping node. Does nothing on other nodes.
    pub fn push_pair(&self, key: NodeRef, value: NodeRef) {
        if let NodeKind::Mapping(pairs, _) = &self.kind {
            pairs.borrow_mut().push((key, value));
        }
    }

    /// Number of children of a collection, 0 for scalars.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Scalar(..) => 0,
            NodeKind::Sequence(items, _) => items.borrow().len(),
            NodeKind::Mapping(pairs, _) => pairs.borrow().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Node {
    // Children are not printed: the graph may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut d = f.debug_struct("Node");
        d.field("tag", &self.tag);
        if let Some(anchor) = self.anchor.borrow().as_ref() {
            d.field("anchor", anchor);
        }
        match &self.kind {
            NodeKind::Scalar(v, style) => d.field("scalar", v).field("style", style),
            NodeKind::Sequence(items, flow) => d
                .field("items", &items.borrow().len())
                .field("flow", &flow.get()),
            NodeKind::Mapping(pairs, flow) => d
                .field("pairs", &pairs.borrow().len())
                .field("flow", &flow.get()),
        };
        d.finish()
    }
}

/// A composed document: its root node and what surrounds it.
#[derive(Debug, Clone)]
pub struct Document {
    pub root: NodeRef,
    /// Whether `---` was written.
    pub explicit_start: bool,
    /// Whether `...` was written.
    pub explicit_end: bool,
    /// The `%YAML` directive, if any.
    pub version: Option<(u32, u32)>,
    /// The version the document was resolved with.
    pub processing_version: (u32, u32),
    /// The `%TAG` directives, in order.
    pub tags: Vec<(String, String)>,
    /// Comment on the `---` line.
    pub start_comment: Option<TrailingComment>,
    /// Comments after the root node.
    pub end_comments: Vec<CommentLine>,
}

impl Document {
    #[must_use]
    pub fn new(root: NodeRef) -> Document {
        Document {
            root,
            explicit_start: false,
            explicit_end: false,
            version: None,
            processing_version: crate::resolver::DEFAULT_VERSION,
            tags: Vec::new(),
            start_comment: None,
            end_comments: Vec::new(),
        }
    }
}
