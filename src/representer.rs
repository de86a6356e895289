//! Turns [`Value`]s into a node graph for the emitter.
//!
//! Scalars get the plainest style that reads back as the same value. Whatever a round-trip load
//! recorded in a value's [`Format`] (tag spelling, anchor, scalar style, flow style, original
//! number spelling, comments) is reused as long as it still matches the value.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constructor::{is_merge_key, parse_bool, parse_int};
use crate::emitter::analyze_scalar;
use crate::engine::{Mode, Registry};
use crate::error::RepresenterError;
use crate::nodes::{Document, Node, NodeRef};
use crate::parser::DEFAULT_TAG_PREFIX;
use crate::resolver::{Resolver, BOOL, FLOAT, INT, MAP, MERGE, NULL, SEQ, STR, TIMESTAMP};
use crate::scanner::TScalarStyle;
use crate::value::{format_f64, parse_f64, Format, Value, Yaml};

/// Builds the node graph of the documents to dump.
pub struct Representer<'r> {
    mode: Mode,
    registry: &'r Registry,
    resolver: Resolver,
    version: Option<(u32, u32)>,
    sort_keys: bool,
    default_flow_style: Option<bool>,
    /// Anchored values already represented, with their node.
    anchors: HashMap<String, (Value, NodeRef)>,
    /// Nodes of class instances, by instance address.
    objects: HashMap<usize, NodeRef>,
    /// Anchored collections being represented.
    in_progress: HashMap<String, NodeRef>,
}

impl<'r> Representer<'r> {
    #[must_use]
    pub fn new(mode: Mode, registry: &'r Registry) -> Representer<'r> {
        Representer {
            mode,
            registry,
            resolver: Resolver::default(),
            version: None,
            sort_keys: mode != Mode::RoundTrip,
            default_flow_style: if mode == Mode::RoundTrip {
                Some(false)
            } else {
                None
            },
            anchors: HashMap::new(),
            objects: HashMap::new(),
            in_progress: HashMap::new(),
        }
    }

    /// The YAML version documents are written for when they carry no `%YAML` directive.
    pub fn set_version(&mut self, version: Option<(u32, u32)>) {
        self.version = version;
    }

    /// Sort mapping keys instead of keeping their order.
    pub fn set_sort_keys(&mut self, sort: bool) {
        self.sort_keys = sort;
    }

    /// Flow style of collections that do not carry one: always (`Some(true)`), never
    /// (`Some(false)`) or only for collections of scalars (`None`).
    pub fn set_default_flow_style(&mut self, flow: Option<bool>) {
        self.default_flow_style = flow;
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Build the document for one value.
    /// # Errors
    /// Returns `RepresenterError` if a value cannot be represented.
    pub fn represent_document(&mut self, value: &Value) -> Result<Document, RepresenterError> {
        let doc_format = value.format().and_then(|f| f.document.clone());
        let version = doc_format
            .as_ref()
            .and_then(|d| d.version)
            .or(self.version);
        self.resolver = Resolver::new(version.unwrap_or(crate::resolver::DEFAULT_VERSION));
        self.anchors.clear();
        self.objects.clear();
        self.in_progress.clear();

        let root = self.represent_data(value)?;
        let mut doc = Document::new(root);
        doc.processing_version = self.resolver.version();
        if let Some(d) = doc_format {
            doc.explicit_start = d.explicit_start;
            doc.explicit_end = d.explicit_end;
            doc.version = d.version;
            doc.tags = d.tags;
            doc.start_comment = d.start_comment;
            doc.end_comments = d.end_comments;
        } else {
            doc.version = self.version.filter(|_| self.mode == Mode::RoundTrip);
        }
        Ok(doc)
    }

    /// Build the node of a value.
    /// # Errors
    /// Returns `RepresenterError` if the value or one of its children cannot be represented.
    pub fn represent_data(&mut self, value: &Value) -> Result<NodeRef, RepresenterError> {
        let format = value.format();
        if let Some(alias) = format.and_then(|f| f.alias.as_ref()) {
            if let Some((original, node)) = self.anchors.get(alias) {
                if original == value {
                    return Ok(node.clone());
                }
            }
        }

        let node = match &value.data {
            Yaml::Tagged(tagged) => {
                let tag = full_tag(&tagged.tag);
                let inner = &tagged.value;
                let merged = inner
                    .format()
                    .map(|f| f.merged_keys.as_slice())
                    .unwrap_or_default();
                self.represent_as(&inner.data, &tag, format, merged)?
            }
            Yaml::Object(object) => {
                let id = Arc::as_ptr(&object.0).cast::<()>() as usize;
                if let Some(node) = self.objects.get(&id) {
                    return Ok(node.clone());
                }
                let Some(represent) = self.registry.representer(object.object_type_id()) else {
                    return Err(RepresenterError::new(&format!(
                        "cannot represent an object: {object:?}"
                    )));
                };
                let node = represent(self, value)?;
                if let Some(format) = format {
                    apply_comments(&node, format);
                    if let Some(flow) = format.flow {
                        node.set_flow(flow);
                    }
                }
                self.objects.insert(id, node.clone());
                node
            }
            Yaml::Alias(name) => {
                return self.in_progress.get(name).cloned().ok_or_else(|| {
                    RepresenterError::new(&format!("cannot represent the unresolved alias *{name}"))
                })
            }
            Yaml::BadValue => return Err(RepresenterError::new("cannot represent a bad value")),
            data => {
                // A value built by a custom constructor keeps its application tag.
                let tag = format
                    .and_then(|f| f.tag.as_ref())
                    .filter(|t| !t.is_non_specific() && !t.full.starts_with(DEFAULT_TAG_PREFIX))
                    .map_or(default_tag(data), |t| t.full.as_str());
                let merged = format
                    .map(|f| f.merged_keys.as_slice())
                    .unwrap_or_default();
                self.represent_as(data, tag, format, merged)?
            }
        };

        if let Some(anchor) = format.and_then(|f| f.anchor.as_ref()) {
            self.anchors
                .insert(anchor.clone(), (value.clone(), node.clone()));
        }
        Ok(node)
    }

    /// Represent `data` with the given tag.
    fn represent_as(
        &mut self,
        data: &Yaml,
        tag: &str,
        format: Option<&Format>,
        merged_keys: &[Value],
    ) -> Result<NodeRef, RepresenterError> {
        let explicit_tag = format
            .and_then(|f| f.tag.clone())
            .filter(|t| t.full == tag);
        let anchor = format.and_then(|f| f.anchor.clone());

        let node = match data {
            Yaml::Array(items) => {
                let node = Node::sequence(tag, false)
                    .with_explicit_tag(explicit_tag)
                    .with_anchor(anchor.clone())
                    .into_ref();
                let guard = self.enter(anchor.as_ref(), &node);
                for item in items {
                    let child = self.represent_data(item)?;
                    node.push_item(child);
                }
                self.leave(guard);
                node.set_flow(self.choose_flow(format, &node));
                node
            }
            Yaml::Hash(hash) => {
                let node = Node::mapping(tag, false)
                    .with_explicit_tag(explicit_tag)
                    .with_anchor(anchor.clone())
                    .into_ref();
                let guard = self.enter(anchor.as_ref(), &node);
                let mut pairs: Vec<(&Value, &Value)> = hash
                    .iter()
                    .filter(|(k, _)| self.mode != Mode::RoundTrip || !merged_keys.contains(k))
                    .collect();
                if self.sort_keys {
                    pairs.sort_by(|a, b| key_order(a.0, b.0));
                }
                for (k, v) in pairs {
                    let key = if is_merge_key(k) {
                        Node::scalar(MERGE, "<<".to_owned(), TScalarStyle::Plain).into_ref()
                    } else {
                        self.represent_data(k)?
                    };
                    let value = self.represent_data(v)?;
                    node.push_pair(key, value);
                }
                self.leave(guard);
                node.set_flow(self.choose_flow(format, &node));
                node
            }
            scalar => {
                let explicit = explicit_tag.is_some();
                let text = self.scalar_text(scalar, tag, format, explicit);
                let requested = format.and_then(|f| f.style);
                let style = self.scalar_style(&text, tag, requested, explicit);
                Node::scalar(tag, text, style)
                    .with_explicit_tag(explicit_tag)
                    .with_anchor(anchor)
                    .into_ref()
            }
        };
        if let Some(format) = format {
            apply_comments(&node, format);
        }
        Ok(node)
    }

    fn enter(&mut self, anchor: Option<&String>, node: &NodeRef) -> Option<String> {
        let anchor = anchor?;
        self.in_progress.insert(anchor.clone(), node.clone());
        Some(anchor.clone())
    }

    fn leave(&mut self, guard: Option<String>) {
        if let Some(anchor) = guard {
            self.in_progress.remove(&anchor);
        }
    }

    /// A scalar node for a class instance or a custom representer.
    #[must_use]
    pub fn represent_scalar(&mut self, tag: &str, text: &str) -> NodeRef {
        let tag = full_tag(tag);
        let style = self.scalar_style(text, &tag, None, false);
        Node::scalar(&tag, text.to_owned(), style).into_ref()
    }

    /// A sequence node for a class instance or a custom representer.
    /// # Errors
    /// Returns `RepresenterError` if an item cannot be represented.
    pub fn represent_sequence(
        &mut self,
        tag: &str,
        items: &[Value],
    ) -> Result<NodeRef, RepresenterError> {
        let node = Node::sequence(&full_tag(tag), false).into_ref();
        for item in items {
            let child = self.represent_data(item)?;
            node.push_item(child);
        }
        node.set_flow(self.choose_flow(None, &node));
        Ok(node)
    }

    /// A mapping node for a class instance or a custom representer. Keys are sorted unless
    /// the dump keeps key order.
    /// # Errors
    /// Returns `RepresenterError` if a key or value cannot be represented.
    pub fn represent_mapping(
        &mut self,
        tag: &str,
        mut pairs: Vec<(Value, Value)>,
    ) -> Result<NodeRef, RepresenterError> {
        if self.sort_keys {
            pairs.sort_by(|a, b| key_order(&a.0, &b.0));
        }
        let node = Node::mapping(&full_tag(tag), false).into_ref();
        for (k, v) in &pairs {
            let key = self.represent_data(k)?;
            let value = self.represent_data(v)?;
            node.push_pair(key, value);
        }
        node.set_flow(self.choose_flow(None, &node));
        Ok(node)
    }

    fn choose_flow(&self, format: Option<&Format>, node: &NodeRef) -> bool {
        if let Some(flow) = format.and_then(|f| f.flow) {
            return flow;
        }
        match self.default_flow_style {
            Some(flow) => flow,
            None => {
                if let Some(items) = node.items() {
                    items.iter().all(|n| n.is_scalar())
                } else if let Some(pairs) = node.pairs() {
                    pairs.iter().all(|(k, v)| k.is_scalar() && v.is_scalar())
                } else {
                    false
                }
            }
        }
    }

    /// The text of a scalar, in its original spelling when that still reads back the same.
    fn scalar_text(
        &self,
        data: &Yaml,
        tag: &str,
        format: Option<&Format>,
        explicit: bool,
    ) -> String {
        let version = self.resolver.version();
        let source = format
            .and_then(|f| f.source.as_deref())
            .filter(|s| explicit || self.resolver.resolve_plain(s) == tag);
        match data {
            Yaml::Null => match source {
                Some(s) => s.to_owned(),
                None if self.mode == Mode::RoundTrip => String::new(),
                None => "null".to_owned(),
            },
            Yaml::Boolean(b) => match source {
                Some(s) if parse_bool(s, version) == Some(*b) => s.to_owned(),
                _ => b.to_string(),
            },
            Yaml::Integer(i) => match source {
                Some(s) if parse_int(s, version) == Ok(*i) => s.to_owned(),
                _ => i.to_string(),
            },
            Yaml::Real(s) => {
                if tag != FLOAT || explicit || self.resolver.resolve_plain(s) == FLOAT {
                    s.clone()
                } else {
                    parse_f64(s).map_or_else(|| s.clone(), format_f64)
                }
            }
            Yaml::String(s) | Yaml::Timestamp(s) => s.clone(),
            _ => String::new(),
        }
    }

    fn scalar_style(
        &self,
        text: &str,
        tag: &str,
        requested: Option<TScalarStyle>,
        explicit: bool,
    ) -> TScalarStyle {
        let analysis = analyze_scalar(text);
        let resolves = self.resolver.resolve_plain(text) == tag;
        // A written tag decides the type, whatever the text resolves to.
        let plain_ok = if !explicit && (tag == STR || is_core_tag(tag)) {
            (analysis.allow_plain || (text.is_empty() && tag == NULL)) && resolves
        } else {
            analysis.allow_plain
        };
        match requested {
            Some(TScalarStyle::Plain) if plain_ok => TScalarStyle::Plain,
            Some(style @ (TScalarStyle::Literal | TScalarStyle::Folded)) if analysis.allow_block => {
                style
            }
            Some(TScalarStyle::SingleQuoted) if analysis.allow_single => {
                TScalarStyle::SingleQuoted
            }
            Some(TScalarStyle::DoubleQuoted) => TScalarStyle::DoubleQuoted,
            _ if plain_ok => TScalarStyle::Plain,
            _ if analysis.allow_single && !analysis.multiline => TScalarStyle::SingleQuoted,
            _ => TScalarStyle::DoubleQuoted,
        }
    }
}

fn apply_comments(node: &NodeRef, format: &Format) {
    if !format.comments.is_empty() {
        node.comments.borrow_mut().clone_from(&format.comments);
    }
}

fn default_tag(data: &Yaml) -> &'static str {
    match data {
        Yaml::Real(_) => FLOAT,
        Yaml::Integer(_) => INT,
        Yaml::Boolean(_) => BOOL,
        Yaml::Timestamp(_) => TIMESTAMP,
        Yaml::Array(_) => SEQ,
        Yaml::Hash(_) => MAP,
        Yaml::Null => NULL,
        _ => STR,
    }
}

fn is_core_tag(tag: &str) -> bool {
    matches!(tag, NULL | BOOL | INT | FLOAT | TIMESTAMP)
}

/// The full form of a tag given as `!!suffix`, `!local` or a full tag.
#[must_use]
pub fn full_tag(tag: &str) -> String {
    match tag.strip_prefix("!!") {
        Some(suffix) => format!("{DEFAULT_TAG_PREFIX}{suffix}"),
        None => tag.to_owned(),
    }
}

fn key_rank(v: &Value) -> u8 {
    match v.data {
        Yaml::Null => 0,
        Yaml::Boolean(_) => 1,
        Yaml::Integer(_) | Yaml::Real(_) => 2,
        Yaml::Timestamp(_) => 3,
        Yaml::String(_) => 4,
        _ => 5,
    }
}

fn key_order(a: &Value, b: &Value) -> Ordering {
    match (&a.data, &b.data) {
        (Yaml::String(x), Yaml::String(y)) | (Yaml::Timestamp(x), Yaml::Timestamp(y)) => x.cmp(y),
        (Yaml::Integer(x), Yaml::Integer(y)) => x.cmp(y),
        (Yaml::Boolean(x), Yaml::Boolean(y)) => x.cmp(y),
        (Yaml::Integer(_) | Yaml::Real(_), Yaml::Integer(_) | Yaml::Real(_)) => {
            let x = as_number(a);
            let y = as_number(b);
            x.total_cmp(&y)
        }
        _ => key_rank(a).cmp(&key_rank(b)),
    }
}

fn as_number(v: &Value) -> f64 {
    match &v.data {
        #[allow(clippy::cast_precision_loss)]
        Yaml::Integer(i) => *i as f64,
        Yaml::Real(s) => parse_f64(s).unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nodes::NodeKind;
    use hashlink::LinkedHashMap;

    fn scalar_of(node: &NodeRef) -> (String, TScalarStyle) {
        match &node.kind {
            NodeKind::Scalar(text, style) => (text.clone(), *style),
            _ => panic!("not a scalar"),
        }
    }

    #[test]
    fn test_scalar_styles() {
        let registry = Registry::default();
        let mut r = Representer::new(Mode::Safe, &registry);
        let cases = [
            (Value::from("abc"), "abc", TScalarStyle::Plain),
            (Value::from("123"), "123", TScalarStyle::SingleQuoted),
            (Value::from("true"), "true", TScalarStyle::SingleQuoted),
            (Value::from(""), "", TScalarStyle::SingleQuoted),
            (Value::from("a: b"), "a: b", TScalarStyle::SingleQuoted),
            (Value::from("a\nb"), "a\nb", TScalarStyle::DoubleQuoted),
            (Value::from(12), "12", TScalarStyle::Plain),
            (Value::from(true), "true", TScalarStyle::Plain),
            (Value::from(1.0), "1.0", TScalarStyle::Plain),
            (Value::null(), "null", TScalarStyle::Plain),
        ];
        for (value, text, style) in cases {
            let node = r.represent_data(&value).unwrap();
            assert_eq!(scalar_of(&node), (text.to_owned(), style), "{value:?}");
        }
    }

    #[test]
    fn test_source_spelling() {
        let registry = Registry::default();
        let mut r = Representer::new(Mode::RoundTrip, &registry);
        let mut v = Value::from(31);
        v.format_mut().source = Some("0x1F".to_owned());
        assert_eq!(scalar_of(&r.represent_data(&v).unwrap()).0, "0x1F");
        v.data = Yaml::Integer(32);
        assert_eq!(scalar_of(&r.represent_data(&v).unwrap()).0, "32");
        assert_eq!(scalar_of(&r.represent_data(&Value::null()).unwrap()).0, "");
    }

    #[test]
    fn test_flow_choice() {
        let registry = Registry::default();
        let mut r = Representer::new(Mode::Safe, &registry);
        let leaf = Value::from(vec![Value::from(1)]);
        let outer = Value::from(vec![leaf.clone()]);
        let node = r.represent_data(&outer).unwrap();
        assert!(!node.is_flow());
        assert!(node.items().unwrap()[0].is_flow());

        let mut r = Representer::new(Mode::RoundTrip, &registry);
        assert!(!r.represent_data(&leaf).unwrap().is_flow());
    }

    #[test]
    fn test_sorted_keys() {
        let registry = Registry::default();
        let mut r = Representer::new(Mode::Safe, &registry);
        let mut h = LinkedHashMap::new();
        h.insert(Value::from("b"), Value::from(1));
        h.insert(Value::from("a"), Value::from(2));
        let node = r.represent_data(&Value::from(h)).unwrap();
        let pairs = node.pairs().unwrap();
        assert_eq!(pairs[0].0.scalar_value(), Some("a"));
    }

    #[test]
    fn test_full_tag() {
        assert_eq!(full_tag("!!str"), STR);
        assert_eq!(full_tag("!user"), "!user");
    }

    #[test]
    fn test_unresolved_alias() {
        let registry = Registry::default();
        let mut r = Representer::new(Mode::Safe, &registry);
        let v = Value::from(vec![Value::new(Yaml::Alias("a".to_owned()))]);
        assert!(r.represent_data(&v).is_err());
    }
}
