//! Turns composed nodes into [`Value`]s.
//!
//! Which function builds a node depends on its tag: constructors registered with the engine
//! come first, then (in [`Mode::Unsafe`] only) multi constructors matched on a tag prefix, then
//! the core YAML tags. A tag nothing knows about becomes a [`Yaml::Tagged`] placeholder, except
//! in unsafe mode where it is an error.
//!
//! Anchored nodes are built once. Later aliases get a copy of the first result, and an alias to
//! a node that is still being built (a recursive structure) gets [`Yaml::Alias`]. The node it
//! points to keeps its anchor in every mode so that the structure can be dumped again.
//!
//! Copies made for aliases count against [`MAX_ALIAS_EXPANSION`], which keeps documents that nest
//! aliases of aliases from growing exponentially.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use hashlink::LinkedHashMap;

use crate::engine::{Mode, Registry};
use crate::error::ConstructorError;
use crate::nodes::{Document, NodeKind, NodeRef};
use crate::resolver::{
    Resolver, BOOL, FLOAT, INT, MAP, MERGE, NULL, OMAP, SEQ, SET, STR, TIMESTAMP, VALUE,
};
use crate::scanner::TScalarStyle;
use crate::value::{parse_f64, DocumentFormat, Value, Yaml};

/// Maximum number of values a document may copy for its aliases.
pub const MAX_ALIAS_EXPANSION: usize = 1_000_000;

/// Builds the values of one document after the other.
pub struct Constructor<'r> {
    mode: Mode,
    version: (u32, u32),
    allow_duplicate_keys: bool,
    registry: &'r Registry,
    /// Anchored nodes already built with the number of values in them, by node address.
    constructed: HashMap<usize, (Value, usize)>,
    /// Nodes being built.
    in_progress: HashSet<usize>,
    /// Nodes being built that an alias inside them refers to.
    recursive: HashSet<usize>,
    /// Values built so far in the current document, alias copies included.
    built: usize,
    /// Values copied for aliases so far in the current document.
    expanded: usize,
}

impl<'r> Constructor<'r> {
    #[must_use]
    pub fn new(mode: Mode, registry: &'r Registry) -> Constructor<'r> {
        Constructor {
            mode,
            version: crate::resolver::DEFAULT_VERSION,
            allow_duplicate_keys: false,
            registry,
            constructed: HashMap::new(),
            in_progress: HashSet::new(),
            recursive: HashSet::new(),
            built: 0,
            expanded: 0,
        }
    }

    /// Let a later duplicate key replace the earlier value instead of failing.
    pub fn set_allow_duplicate_keys(&mut self, allow: bool) {
        self.allow_duplicate_keys = allow;
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The YAML version of the document being built.
    #[must_use]
    pub fn version(&self) -> (u32, u32) {
        self.version
    }

    /// Build the value of a whole document.
    /// # Errors
    /// Returns `ConstructorError` if a node cannot be built.
    pub fn construct_document(&mut self, doc: &Document) -> Result<Value, ConstructorError> {
        self.version = doc.processing_version;
        self.constructed.clear();
        self.in_progress.clear();
        self.recursive.clear();
        self.built = 0;
        self.expanded = 0;
        let mut value = self.construct_object(&doc.root)?;
        if self.mode == Mode::RoundTrip {
            value.format_mut().document = Some(DocumentFormat {
                explicit_start: doc.explicit_start,
                explicit_end: doc.explicit_end,
                version: doc.version,
                tags: doc.tags.clone(),
                start_comment: doc.start_comment.clone(),
                end_comments: doc.end_comments.clone(),
            });
        }
        Ok(value)
    }

    /// Build the value of a node.
    /// # Errors
    /// Returns `ConstructorError` if the node or one of its children cannot be built.
    pub fn construct_object(&mut self, node: &NodeRef) -> Result<Value, ConstructorError> {
        let id = Rc::as_ptr(node) as usize;
        if let Some((cached, size)) = self.constructed.get(&id) {
            let expanded = self.expanded + size;
            if expanded > MAX_ALIAS_EXPANSION {
                return Err(ConstructorError::new(
                    node.start,
                    &node.tag,
                    &format!("aliases expand to more than {MAX_ALIAS_EXPANSION} values"),
                ));
            }
            self.expanded = expanded;
            self.built += size;
            let mut value = cached.clone();
            let keeps_anchor = value.format().is_some_and(|f| f.anchor.is_some());
            if self.mode == Mode::RoundTrip || keeps_anchor {
                let format = value.format_mut();
                format.alias = node.anchor.borrow().clone();
                format.document = None;
            }
            return Ok(value);
        }
        if self.in_progress.contains(&id) {
            self.recursive.insert(id);
            let anchor = node.anchor.borrow().clone().unwrap_or_default();
            return Ok(Value::new(Yaml::Alias(anchor)));
        }

        let first = self.built;
        self.built += 1;
        self.in_progress.insert(id);
        let result = self.dispatch(node);
        self.in_progress.remove(&id);
        let mut value = result?;

        let recursive = self.recursive.remove(&id);
        if self.mode == Mode::RoundTrip {
            record_format(node, &mut value);
        } else if recursive {
            value.format_mut().anchor = node.anchor.borrow().clone();
        }
        if node.anchor.borrow().is_some() {
            self.constructed
                .insert(id, (value.clone(), self.built - first));
        }
        Ok(value)
    }

    fn dispatch(&mut self, node: &NodeRef) -> Result<Value, ConstructorError> {
        let tag = node.tag.as_str();
        if let Some(constructor) = self.registry.constructor(tag) {
            return constructor(self, node);
        }
        if self.mode == Mode::Unsafe {
            if let Some((prefix_len, constructor)) = self.registry.multi_constructor(tag) {
                return constructor(self, &tag[prefix_len..], node);
            }
        }
        let data = match tag {
            NULL => Yaml::Null,
            BOOL => self.construct_bool(node)?,
            INT => self.construct_int(node)?,
            FLOAT => self.construct_float(node)?,
            STR | MERGE | VALUE => Yaml::String(self.construct_scalar(node)?),
            TIMESTAMP => Yaml::Timestamp(self.construct_scalar(node)?),
            SEQ => Yaml::Array(self.construct_sequence(node)?),
            MAP => return self.construct_map_value(node),
            OMAP => Yaml::Hash(self.construct_omap(node)?),
            SET => Yaml::Hash(self.construct_set(node)?),
            _ if self.mode == Mode::Unsafe => {
                return Err(ConstructorError::new(
                    node.start,
                    tag,
                    "could not determine a constructor for the tag",
                ))
            }
            _ => {
                log::debug!("no constructor for {}, keeping a tagged placeholder", tag);
                let inner = match &node.kind {
                    NodeKind::Scalar(..) => Yaml::String(self.construct_scalar(node)?),
                    NodeKind::Sequence(..) => Yaml::Array(self.construct_sequence(node)?),
                    NodeKind::Mapping(..) => {
                        return Ok(Value::tagged(tag, self.construct_map_value(node)?));
                    }
                };
                return Ok(Value::tagged(tag, Value::new(inner)));
            }
        };
        Ok(Value::new(data))
    }

    fn construct_map_value(&mut self, node: &NodeRef) -> Result<Value, ConstructorError> {
        let (hash, merged) = self.construct_mapping_merged(node)?;
        let mut value = Value::new(Yaml::Hash(hash));
        if !merged.is_empty() {
            value.format_mut().merged_keys = merged;
        }
        Ok(value)
    }

    /// The text of a scalar node.
    /// # Errors
    /// Returns `ConstructorError` if the node is not a scalar.
    pub fn construct_scalar(&self, node: &NodeRef) -> Result<String, ConstructorError> {
        node.scalar_value()
            .map(str::to_owned)
            .ok_or_else(|| ConstructorError::new(node.start, &node.tag, "expected a scalar node"))
    }

    /// The items of a sequence node.
    /// # Errors
    /// Returns `ConstructorError` if the node is not a sequence or an item cannot be built.
    pub fn construct_sequence(&mut self, node: &NodeRef) -> Result<Vec<Value>, ConstructorError> {
        let Some(items) = node.items().map(|items| items.clone()) else {
            return Err(ConstructorError::new(
                node.start,
                &node.tag,
                "expected a sequence node",
            ));
        };
        items.iter().map(|item| self.construct_object(item)).collect()
    }

    /// The pairs of a mapping node, `<<` merges applied.
    /// # Errors
    /// Returns `ConstructorError` if the node is not a mapping, a key is duplicated or a pair
    /// cannot be built.
    pub fn construct_mapping(
        &mut self,
        node: &NodeRef,
    ) -> Result<LinkedHashMap<Value, Value>, ConstructorError> {
        self.construct_mapping_merged(node).map(|(hash, _)| hash)
    }

    /// The pairs of a mapping, and the keys that came from `<<` merges.
    fn construct_mapping_merged(
        &mut self,
        node: &NodeRef,
    ) -> Result<(LinkedHashMap<Value, Value>, Vec<Value>), ConstructorError> {
        let Some(pairs) = node.pairs().map(|pairs| pairs.clone()) else {
            return Err(ConstructorError::new(
                node.start,
                &node.tag,
                "expected a mapping node",
            ));
        };

        let mut hash = LinkedHashMap::new();
        let mut merge_sources = Vec::new();
        for (key_node, value_node) in &pairs {
            if key_node.tag == MERGE && key_node.is_scalar() {
                self.collect_merge(node, value_node, &mut merge_sources)?;
                if self.mode == Mode::RoundTrip {
                    let mut key = Value::from("<<");
                    record_format(key_node, &mut key);
                    let value = self.construct_object(value_node)?;
                    hash.insert(key, value);
                }
                continue;
            }
            let key = self.construct_object(key_node)?;
            let value = self.construct_object(value_node)?;
            if let Some(slot) = hash.get_mut(&key) {
                if !self.allow_duplicate_keys {
                    return Err(ConstructorError::new(
                        key_node.start,
                        &node.tag,
                        &format!("found duplicate key {}", describe(&key)),
                    ));
                }
                log::debug!("duplicate key {}, the last value wins", describe(&key));
                *slot = value;
            } else {
                hash.insert(key, value);
            }
        }

        let mut merged_keys = Vec::new();
        for (key, value) in merge_sources {
            if !hash.contains_key(&key) {
                merged_keys.push(key.clone());
                hash.insert(key, value);
            }
        }
        Ok((hash, merged_keys))
    }

    /// Gather the pairs a `<<` value brings in, earliest source first.
    fn collect_merge(
        &mut self,
        mapping: &NodeRef,
        value_node: &NodeRef,
        out: &mut Vec<(Value, Value)>,
    ) -> Result<(), ConstructorError> {
        let sources = match &value_node.kind {
            NodeKind::Mapping(..) => vec![value_node.clone()],
            NodeKind::Sequence(items, _) => items.borrow().clone(),
            NodeKind::Scalar(..) => {
                return Err(ConstructorError::new(
                    value_node.start,
                    &mapping.tag,
                    "expected a mapping or list of mappings for merging",
                ))
            }
        };
        for source in sources {
            let value = self.construct_object(&source)?;
            let Some(hash) = value.as_hash() else {
                return Err(ConstructorError::new(
                    source.start,
                    &mapping.tag,
                    "expected a mapping for merging",
                ));
            };
            for (k, v) in hash {
                if is_merge_key(k) || out.iter().any(|(seen, _)| seen == k) {
                    continue;
                }
                out.push((k.clone(), v.clone()));
            }
        }
        Ok(())
    }

    fn construct_omap(
        &mut self,
        node: &NodeRef,
    ) -> Result<LinkedHashMap<Value, Value>, ConstructorError> {
        let mut hash = LinkedHashMap::new();
        for item in self.construct_sequence(node)? {
            let Some(pair) = item.as_hash().filter(|h| h.len() == 1) else {
                return Err(ConstructorError::new(
                    node.start,
                    OMAP,
                    "expected a single-pair mapping in an ordered map",
                ));
            };
            for (k, v) in pair {
                hash.insert(k.clone(), v.clone());
            }
        }
        Ok(hash)
    }

    fn construct_set(
        &mut self,
        node: &NodeRef,
    ) -> Result<LinkedHashMap<Value, Value>, ConstructorError> {
        let mut set = self.construct_mapping(node)?;
        for value in set.values_mut() {
            *value = Value::null();
        }
        Ok(set)
    }

    fn construct_bool(&self, node: &NodeRef) -> Result<Yaml, ConstructorError> {
        let text = self.construct_scalar(node)?;
        parse_bool(&text, self.version)
            .map(Yaml::Boolean)
            .ok_or_else(|| ConstructorError::new(node.start, BOOL, "invalid boolean"))
    }

    fn construct_int(&self, node: &NodeRef) -> Result<Yaml, ConstructorError> {
        let text = self.construct_scalar(node)?;
        match parse_int(&text, self.version) {
            Ok(v) => Ok(Yaml::Integer(v)),
            Err(info) => Err(ConstructorError::new(node.start, INT, info)),
        }
    }

    fn construct_float(&self, node: &NodeRef) -> Result<Yaml, ConstructorError> {
        let text = self.construct_scalar(node)?;
        if parse_f64(&text).is_some() {
            Ok(Yaml::Real(text))
        } else {
            Err(ConstructorError::new(node.start, FLOAT, "invalid float"))
        }
    }
}

/// Copy what a round-trip dump needs from the node onto the value.
fn record_format(node: &NodeRef, value: &mut Value) {
    let format = value.format_mut();
    format.tag.clone_from(&node.explicit_tag);
    format.anchor.clone_from(&node.anchor.borrow());
    format.comments = node.comments.borrow().clone();
    match &node.kind {
        NodeKind::Scalar(text, style) => {
            format.style = Some(*style);
            if *style == TScalarStyle::Plain && node.tag != STR {
                format.source = Some(text.clone());
            }
        }
        NodeKind::Sequence(_, flow) | NodeKind::Mapping(_, flow) => {
            format.flow = Some(flow.get());
        }
    }
}

/// Whether the key is the `<<` of a merge kept by a round-trip load.
#[must_use]
pub fn is_merge_key(key: &Value) -> bool {
    key.as_str() == Some("<<")
        && key
            .format()
            .and_then(|f| f.source.as_deref())
            .map_or(false, |s| s == "<<")
}

fn describe(key: &Value) -> String {
    match &key.data {
        Yaml::String(s) => format!("{s:?}"),
        Yaml::Integer(i) => i.to_string(),
        Yaml::Real(s) | Yaml::Timestamp(s) => s.clone(),
        Yaml::Boolean(b) => b.to_string(),
        other => other.kind().to_owned(),
    }
}

/// Value of a `!!bool` scalar.
#[must_use]
pub fn parse_bool(text: &str, version: (u32, u32)) -> Option<bool> {
    match text {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        "yes" | "Yes" | "YES" | "on" | "On" | "ON" if version == (1, 1) => Some(true),
        "no" | "No" | "NO" | "off" | "Off" | "OFF" if version == (1, 1) => Some(false),
        _ => None,
    }
}

/// Value of a `!!int` scalar.
/// # Errors
/// Returns a description of the problem if the text is not an integer or does not fit an i64.
pub fn parse_int(text: &str, version: (u32, u32)) -> Result<i64, &'static str> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let (negative, digits) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        _ => (false, cleaned.as_str()),
    };
    if digits.is_empty() {
        return Err("invalid integer");
    }
    let magnitude = if let Some(bin) = digits.strip_prefix("0b") {
        i128::from_str_radix(bin, 2)
    } else if let Some(hex) = digits.strip_prefix("0x") {
        i128::from_str_radix(hex, 16)
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i128::from_str_radix(oct, 8)
    } else if version == (1, 1) && digits.contains(':') {
        let mut value: i128 = 0;
        for part in digits.split(':') {
            let part = part.parse::<i128>().map_err(|_| "invalid integer")?;
            value = value
                .checked_mul(60)
                .and_then(|v| v.checked_add(part))
                .ok_or("integer out of range")?;
        }
        Ok(value)
    } else if version == (1, 1) && digits.len() > 1 && digits.starts_with('0') {
        i128::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<i128>()
    }
    .map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
            "integer out of range"
        }
        _ => "invalid integer",
    })?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).map_err(|_| "integer out of range")
}

/// The native value of an untagged plain scalar.
#[must_use]
pub fn construct_plain(text: &str, version: (u32, u32)) -> Yaml {
    let resolver = Resolver::new(version);
    match resolver.resolve_plain(text) {
        NULL => Yaml::Null,
        BOOL => parse_bool(text, version).map_or_else(|| Yaml::String(text.to_owned()), Yaml::Boolean),
        INT => parse_int(text, version).map_or_else(|_| Yaml::String(text.to_owned()), Yaml::Integer),
        FLOAT => Yaml::Real(text.to_owned()),
        TIMESTAMP => Yaml::Timestamp(text.to_owned()),
        _ => Yaml::String(text.to_owned()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::composer::Composer;
    use crate::parser::Parser;

    fn construct(src: &str, mode: Mode) -> Result<Value, ConstructorError> {
        let registry = Registry::default();
        let mut composer = Composer::new(Parser::new_from_str(src), None);
        let doc = composer.compose_document().unwrap().unwrap();
        Constructor::new(mode, &registry).construct_document(&doc)
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x1F", (1, 2)), Ok(31));
        assert_eq!(parse_int("-0o17", (1, 2)), Ok(-15));
        assert_eq!(parse_int("0b1010", (1, 2)), Ok(10));
        assert_eq!(parse_int("1_000", (1, 2)), Ok(1000));
        assert_eq!(parse_int("017", (1, 1)), Ok(15));
        assert_eq!(parse_int("017", (1, 2)), Ok(17));
        assert_eq!(parse_int("190:20:30", (1, 1)), Ok(685_230));
        assert_eq!(parse_int("-9223372036854775808", (1, 2)), Ok(i64::MIN));
        assert_eq!(
            parse_int("9223372036854775808", (1, 2)),
            Err("integer out of range")
        );
        assert_eq!(parse_int("12a", (1, 2)), Err("invalid integer"));
    }

    #[test]
    fn test_core_values() {
        let v = construct("a: 1\nb: 1.5\nc: true\nd: ~\ne: 2001-12-14\nf: '1'\n", Mode::Safe)
            .unwrap();
        assert_eq!(v["a"].as_i64(), Some(1));
        assert_eq!(v["b"].as_f64(), Some(1.5));
        assert_eq!(v["c"].as_bool(), Some(true));
        assert!(v["d"].is_null());
        assert_eq!(v["e"].data, Yaml::Timestamp("2001-12-14".to_owned()));
        assert_eq!(v["f"].as_str(), Some("1"));
    }

    #[test]
    fn test_yaml_1_1_values() {
        let v = construct("%YAML 1.1\n---\n- yes\n- 017\n- 1:30\n", Mode::Safe).unwrap();
        assert_eq!(v[0].as_bool(), Some(true));
        assert_eq!(v[1].as_i64(), Some(15));
        assert_eq!(v[2].as_i64(), Some(90));
    }

    #[test]
    fn test_invalid_explicit_tag() {
        assert!(construct("!!int abc\n", Mode::Safe).is_err());
        assert!(construct("!!bool maybe\n", Mode::Safe).is_err());
    }

    #[test]
    fn test_duplicate_keys() {
        let err = construct("a: 1\na: 2\n", Mode::Safe).unwrap_err();
        assert!(err.info.contains("duplicate key"));

        let registry = Registry::default();
        let mut composer = Composer::new(Parser::new_from_str("a: 1\nb: 0\na: 2\n"), None);
        let doc = composer.compose_document().unwrap().unwrap();
        let mut constructor = Constructor::new(Mode::Safe, &registry);
        constructor.set_allow_duplicate_keys(true);
        let v = constructor.construct_document(&doc).unwrap();
        assert_eq!(v["a"].as_i64(), Some(2));
        let keys: Vec<_> = v.as_hash().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn test_merge() {
        let src = "base: &b {x: 1, y: 2}\nother: &o {z: 3}\nd:\n  <<: [*b, *o]\n  x: 10\n";
        let v = construct(src, Mode::Safe).unwrap();
        assert_eq!(v["d"]["x"].as_i64(), Some(10));
        assert_eq!(v["d"]["y"].as_i64(), Some(2));
        assert_eq!(v["d"]["z"].as_i64(), Some(3));
        assert!(v["d"]["<<"].is_badvalue());

        let v = construct(src, Mode::RoundTrip).unwrap();
        let d = &v["d"];
        assert!(is_merge_key(d.as_hash().unwrap().keys().next().unwrap()));
        assert_eq!(d["y"].as_i64(), Some(2));
        assert_eq!(d.format().unwrap().merged_keys.len(), 2);
    }

    #[test]
    fn test_aliases() {
        let v = construct("a: &x [1]\nb: *x\n", Mode::RoundTrip).unwrap();
        assert_eq!(v["a"], v["b"]);
        assert_eq!(v["a"].anchor(), Some("x"));
        assert_eq!(v["b"].format().unwrap().alias.as_deref(), Some("x"));

        let v = construct("&a [1, *a]\n", Mode::Safe).unwrap();
        assert_eq!(v[1].data, Yaml::Alias("a".to_owned()));
        assert_eq!(v.anchor(), Some("a"));

        // Only the targets of recursive aliases keep their anchor outside round trips.
        let v = construct("a: &x [1]\nb: *x\n", Mode::Safe).unwrap();
        assert!(v["a"].format().is_none());
        assert!(v["b"].format().is_none());
    }

    #[test]
    fn test_alias_expansion_limit() {
        let mut src = "l0: &l0 [x, x, x, x, x, x, x, x, x, x]\n".to_owned();
        for level in 1..8 {
            let prev = level - 1;
            let items = vec![format!("*l{prev}"); 10].join(", ");
            src.push_str(&format!("l{level}: &l{level} [{items}]\n"));
        }
        for mode in [Mode::Safe, Mode::Unsafe, Mode::RoundTrip] {
            let err = construct(&src, mode).unwrap_err();
            assert!(err.info.contains("aliases expand to more than"), "{err}");
        }

        // Five levels stay well below the limit.
        let lines: Vec<&str> = src.lines().take(5).collect();
        let v = construct(&lines.join("\n"), Mode::Safe).unwrap();
        assert_eq!(v["l4"][9][9][9][9][9].as_str(), Some("x"));
    }

    #[test]
    fn test_unknown_tags() {
        let v = construct("!thing {a: 1}\n", Mode::Safe).unwrap();
        let tagged = v.as_tagged().unwrap();
        assert_eq!(tagged.tag, "!thing");
        assert_eq!(tagged.value["a"].as_i64(), Some(1));
        let v = construct("- !user Anthon-18\n", Mode::RoundTrip).unwrap();
        assert_eq!(v[0].as_tagged().unwrap().value.as_str(), Some("Anthon-18"));
        assert!(construct("!thing 1\n", Mode::Unsafe).is_err());
    }

    #[test]
    fn test_omap_and_set() {
        let v = construct("!!omap [b: 1, a: 2]\n", Mode::Safe).unwrap();
        let keys: Vec<_> = v.as_hash().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec![Some("b"), Some("a")]);
        let v = construct("!!set {x, y}\n", Mode::Safe).unwrap();
        assert!(v["x"].is_null());
        assert_eq!(v.as_hash().unwrap().len(), 2);
    }

    #[test]
    fn test_round_trip_format() {
        let v = construct("# top\na: 0x1F  # hex\nb: 'q'\nc: [1]\n", Mode::RoundTrip).unwrap();
        let a_key = v.as_hash().unwrap().keys().next().unwrap().clone();
        assert_eq!(a_key.comments().unwrap().before[0].text, "# top");
        let a = &v["a"];
        assert_eq!(a.as_i64(), Some(31));
        let format = a.format().unwrap();
        assert_eq!(format.source.as_deref(), Some("0x1F"));
        assert_eq!(format.comments.trailing.as_ref().unwrap().text, "# hex");
        assert_eq!(v["b"].format().unwrap().style, Some(TScalarStyle::SingleQuoted));
        assert_eq!(v["c"].format().unwrap().flow, Some(true));
        assert!(v.format().unwrap().document.is_some());
    }
}
