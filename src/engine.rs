//! The load/dump entry point and the class registry.
//!
//! An [`Engine`] holds every setting of a load or dump, plus the constructors and
//! representers registered for application types. Registration happens on one engine and
//! affects only that engine.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::rc::Rc;

use hashlink::LinkedHashMap;

use crate::composer::Composer;
use crate::constructor::Constructor;
use crate::emitter::{EmitterConfig, YamlEmitter};
use crate::error::{ConstructorError, RepresenterError, YamlError};
use crate::nodes::NodeRef;
use crate::parser::Parser;
use crate::reader::Reader;
use crate::representer::Representer;
use crate::value::{Value, YamlObject};

/// How documents are turned into values and back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    /// Core tags and registered classes only; unknown tags become placeholders.
    Safe,
    /// Like `Safe`, plus multi constructors; an unknown tag is an error.
    Unsafe,
    /// Like `Safe`, and values keep the comments, styles, tags and anchors they were written
    /// with so that dumping them reproduces the input.
    #[default]
    RoundTrip,
}

/// Builds a value from a node carrying a given tag.
pub type ConstructFn =
    Rc<dyn Fn(&mut Constructor<'_>, &NodeRef) -> Result<Value, ConstructorError>>;
/// Builds a value from a node whose tag starts with a given prefix. Gets the rest of the tag.
pub type MultiConstructFn =
    Rc<dyn Fn(&mut Constructor<'_>, &str, &NodeRef) -> Result<Value, ConstructorError>>;
/// Builds the node of an object value.
pub type RepresentFn =
    Rc<dyn Fn(&mut Representer<'_>, &Value) -> Result<NodeRef, RepresenterError>>;

/// Constructors by tag and representers by type.
#[derive(Default, Clone)]
pub struct Registry {
    constructors: HashMap<String, ConstructFn>,
    multi_constructors: Vec<(String, MultiConstructFn)>,
    representers: HashMap<TypeId, RepresentFn>,
}

impl Registry {
    /// Use `f` for nodes tagged `tag`. Replaces an earlier constructor for the same tag.
    pub fn add_constructor<F>(&mut self, tag: &str, f: F)
    where
        F: Fn(&mut Constructor<'_>, &NodeRef) -> Result<Value, ConstructorError> + 'static,
    {
        self.constructors.insert(tag.to_owned(), Rc::new(f));
    }

    /// Use `f` for nodes whose tag starts with `prefix` (unsafe mode only).
    pub fn add_multi_constructor<F>(&mut self, prefix: &str, f: F)
    where
        F: Fn(&mut Constructor<'_>, &str, &NodeRef) -> Result<Value, ConstructorError> + 'static,
    {
        self.multi_constructors.retain(|(p, _)| p != prefix);
        self.multi_constructors.push((prefix.to_owned(), Rc::new(f)));
    }

    /// Use `f` to dump object values holding a `T`.
    pub fn add_representer<T, F>(&mut self, f: F)
    where
        T: YamlObject,
        F: Fn(&mut Representer<'_>, &Value) -> Result<NodeRef, RepresenterError> + 'static,
    {
        self.representers.insert(TypeId::of::<T>(), Rc::new(f));
    }

    #[must_use]
    pub fn constructor(&self, tag: &str) -> Option<ConstructFn> {
        self.constructors.get(tag).cloned()
    }

    /// The multi constructor with the longest prefix of `tag`, and the length of that prefix.
    #[must_use]
    pub fn multi_constructor(&self, tag: &str) -> Option<(usize, MultiConstructFn)> {
        self.multi_constructors
            .iter()
            .filter(|(prefix, _)| tag.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, f)| (prefix.len(), f.clone()))
    }

    #[must_use]
    pub fn representer(&self, type_id: TypeId) -> Option<RepresentFn> {
        self.representers.get(&type_id).cloned()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut tags: Vec<&String> = self.constructors.keys().collect();
        tags.sort();
        f.debug_struct("Registry")
            .field("constructors", &tags)
            .field(
                "multi_constructors",
                &self.multi_constructors.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .field("representers", &self.representers.len())
            .finish()
    }
}

/// An application type that can be loaded from and dumped to a tagged node.
///
/// The default hooks map the type to a mapping of its [`fields`](YamlClass::fields):
///
/// ```
/// use hashlink::LinkedHashMap;
/// use yaml_roundtrip::{Engine, Mode, Value, YamlClass};
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// impl YamlClass for Point {
///     fn fields(&self) -> Vec<(String, Value)> {
///         vec![("x".into(), self.x.into()), ("y".into(), self.y.into())]
///     }
///
///     fn from_fields(fields: LinkedHashMap<Value, Value>) -> Result<Self, String> {
///         let get = |k: &str| fields.get(&Value::from(k)).and_then(Value::as_i64);
///         match (get("x"), get("y")) {
///             (Some(x), Some(y)) => Ok(Point { x, y }),
///             _ => Err("a point needs x and y".to_owned()),
///         }
///     }
/// }
///
/// let mut engine = Engine::new(Mode::RoundTrip);
/// engine.register_class::<Point>();
/// let value = engine.load("!Point\nx: 1\ny: 2\n").unwrap();
/// assert_eq!(value.as_object::<Point>(), Some(&Point { x: 1, y: 2 }));
/// assert_eq!(engine.dump(&value).unwrap(), "!Point\nx: 1\ny: 2\n");
/// ```
pub trait YamlClass: YamlObject + Sized {
    /// The tag of the type, `!` followed by the type name by default.
    #[must_use]
    fn yaml_tag() -> String {
        let name = type_name::<Self>();
        let name = name.split('<').next().unwrap_or(name);
        format!("!{}", name.rsplit("::").next().unwrap_or(name))
    }

    /// Field names and values, in the order they are dumped.
    fn fields(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Build an instance from the pairs of a mapping node.
    /// # Errors
    /// Returns a message if the pairs do not describe an instance.
    fn from_fields(_fields: LinkedHashMap<Value, Value>) -> Result<Self, String> {
        Err(format!("{} cannot be built from a mapping", type_name::<Self>()))
    }

    /// Build an instance from a node.
    /// # Errors
    /// Returns `ConstructorError` if the node does not describe an instance.
    fn from_yaml(
        constructor: &mut Constructor<'_>,
        node: &NodeRef,
    ) -> Result<Self, ConstructorError> {
        let fields = constructor.construct_mapping(node)?;
        Self::from_fields(fields).map_err(|e| ConstructorError::new(node.start, &node.tag, &e))
    }

    /// Build the node of an instance.
    /// # Errors
    /// Returns `RepresenterError` if a field cannot be represented.
    fn to_yaml(&self, representer: &mut Representer<'_>) -> Result<NodeRef, RepresenterError> {
        let pairs = self
            .fields()
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect();
        representer.represent_mapping(&Self::yaml_tag(), pairs)
    }
}

/// Register both directions of a class in `registry`. A later registration of the same tag
/// or type replaces this one.
pub fn register_class<T: YamlClass>(registry: &mut Registry) {
    let tag = crate::representer::full_tag(&T::yaml_tag());
    registry.add_constructor(&tag, |constructor, node| {
        T::from_yaml(constructor, node).map(Value::object)
    });
    registry.add_representer::<T, _>(|representer, value| match value.as_object::<T>() {
        Some(object) => object.to_yaml(representer),
        None => Err(RepresenterError::new(&format!(
            "expected an instance of {}",
            type_name::<T>()
        ))),
    });
}

/// Loads and dumps YAML streams.
#[derive(Clone, Debug)]
pub struct Engine {
    pub mode: Mode,
    /// Version of documents without a `%YAML` directive, and of dumped documents.
    pub version: Option<(u32, u32)>,
    /// Reject a block scalar starting on the `---` line with unindented content in YAML 1.1
    /// documents.
    pub top_level_block_style_scalar_no_indent_error_1_1: bool,
    /// Let a duplicate mapping key replace the earlier value instead of failing.
    pub allow_duplicate_keys: bool,
    /// Sort mapping keys on dump. Defaults to `true` except in round-trip mode.
    pub sort_keys: bool,
    pub emitter: EmitterConfig,
    registry: Registry,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(Mode::default())
    }
}

impl Engine {
    #[must_use]
    pub fn new(mode: Mode) -> Engine {
        let round_trip = mode == Mode::RoundTrip;
        Engine {
            mode,
            version: None,
            top_level_block_style_scalar_no_indent_error_1_1: false,
            allow_duplicate_keys: false,
            sort_keys: !round_trip,
            emitter: EmitterConfig {
                default_flow_style: if round_trip { Some(false) } else { None },
                ..EmitterConfig::default()
            },
            registry: Registry::default(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Load and dump `T` under its [`YamlClass::yaml_tag`].
    pub fn register_class<T: YamlClass>(&mut self) -> &mut Engine {
        register_class::<T>(&mut self.registry);
        self
    }

    pub fn add_constructor<F>(&mut self, tag: &str, f: F) -> &mut Engine
    where
        F: Fn(&mut Constructor<'_>, &NodeRef) -> Result<Value, ConstructorError> + 'static,
    {
        self.registry
            .add_constructor(&crate::representer::full_tag(tag), f);
        self
    }

    pub fn add_multi_constructor<F>(&mut self, prefix: &str, f: F) -> &mut Engine
    where
        F: Fn(&mut Constructor<'_>, &str, &NodeRef) -> Result<Value, ConstructorError> + 'static,
    {
        self.registry
            .add_multi_constructor(&crate::representer::full_tag(prefix), f);
        self
    }

    pub fn add_representer<T, F>(&mut self, f: F) -> &mut Engine
    where
        T: YamlObject,
        F: Fn(&mut Representer<'_>, &Value) -> Result<NodeRef, RepresenterError> + 'static,
    {
        self.registry.add_representer::<T, F>(f);
        self
    }

    /// Load the only document of `source`. An empty stream loads as null.
    /// # Errors
    /// Returns `YamlError` if the text is not valid YAML, holds more than one document, or a
    /// value cannot be built.
    pub fn load(&self, source: &str) -> Result<Value, YamlError> {
        self.load_single(Reader::from_str(source))
    }

    /// Load the only document of a byte source in UTF-8 or UTF-16.
    /// # Errors
    /// Returns `YamlError` if the bytes cannot be decoded or [`Engine::load`] would fail.
    pub fn load_bytes(&self, source: &[u8]) -> Result<Value, YamlError> {
        self.load_single(Reader::from_bytes(source))
    }

    /// Load the only document read from `source`.
    /// # Errors
    /// Returns `YamlError` if reading fails or [`Engine::load`] would fail.
    pub fn load_read<R: io::Read>(&self, source: R) -> Result<Value, YamlError> {
        self.load_single(Reader::from_read(source))
    }

    /// Load every document of `source`.
    /// # Errors
    /// Returns `YamlError` if the text is not valid YAML or a value cannot be built.
    pub fn load_all(&self, source: &str) -> Result<Vec<Value>, YamlError> {
        self.load_documents(Reader::from_str(source))
    }

    /// Load every document of a byte source in UTF-8 or UTF-16.
    /// # Errors
    /// Returns `YamlError` if the bytes cannot be decoded or [`Engine::load_all`] would fail.
    pub fn load_all_bytes(&self, source: &[u8]) -> Result<Vec<Value>, YamlError> {
        self.load_documents(Reader::from_bytes(source))
    }

    fn parser<'a>(&self, reader: Reader<'a>) -> Parser<'a> {
        let mut parser = Parser::new(reader);
        parser.set_strict_block_scalar_indent_1_1(
            self.top_level_block_style_scalar_no_indent_error_1_1,
        );
        parser.set_default_version(self.version);
        parser
    }

    fn constructor(&self) -> Constructor<'_> {
        let mut constructor = Constructor::new(self.mode, &self.registry);
        constructor.set_allow_duplicate_keys(self.allow_duplicate_keys);
        constructor
    }

    fn load_single(&self, reader: Reader<'_>) -> Result<Value, YamlError> {
        let mut composer = Composer::new(self.parser(reader), self.version);
        match composer.compose_single_document()? {
            Some(doc) => Ok(self.constructor().construct_document(&doc)?),
            None => Ok(Value::null()),
        }
    }

    fn load_documents(&self, reader: Reader<'_>) -> Result<Vec<Value>, YamlError> {
        let mut composer = Composer::new(self.parser(reader), self.version);
        let mut constructor = self.constructor();
        let mut values = Vec::new();
        while let Some(doc) = composer.compose_document()? {
            log::debug!("loaded document {}", values.len() + 1);
            values.push(constructor.construct_document(&doc)?);
        }
        Ok(values)
    }

    /// Dump one document.
    /// # Errors
    /// Returns `YamlError` if the value cannot be represented.
    pub fn dump(&self, value: &Value) -> Result<String, YamlError> {
        self.dump_all(std::slice::from_ref(value))
    }

    /// Dump a stream of documents.
    /// # Errors
    /// Returns `YamlError` if a value cannot be represented.
    pub fn dump_all(&self, values: &[Value]) -> Result<String, YamlError> {
        let mut out = String::new();
        self.dump_to(values, &mut out)?;
        Ok(out)
    }

    /// Dump a stream of documents into `writer`.
    /// # Errors
    /// Returns `YamlError` if a value cannot be represented or the writer fails.
    pub fn dump_to<W: fmt::Write>(
        &self,
        values: &[Value],
        writer: &mut W,
    ) -> Result<(), YamlError> {
        let mut representer = Representer::new(self.mode, &self.registry);
        representer.set_version(self.version);
        representer.set_sort_keys(self.sort_keys);
        representer.set_default_flow_style(self.emitter.default_flow_style);
        let mut emitter = YamlEmitter::with_config(writer, self.emitter.clone());
        for value in values {
            let doc = representer.represent_document(value)?;
            emitter.emit_document(&doc)?;
        }
        Ok(())
    }

    /// Dump a stream of documents into an I/O sink.
    /// # Errors
    /// Returns `YamlError` if a value cannot be represented or writing fails.
    pub fn dump_write<W: io::Write>(
        &self,
        values: &[Value],
        mut writer: W,
    ) -> Result<(), YamlError> {
        let text = self.dump_all(values)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}
