//! The native values documents are loaded into and dumped from.
//!
//! A [`Value`] is a [`Yaml`] datum plus, for round-trip loads, the [`Format`] it was written
//! with (tag, anchor, scalar style, comments...). Equality and hashing only look at the datum,
//! so a value read from a file compares equal to the same value built by hand.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::sync::Arc;
use std::vec;

use hashlink::LinkedHashMap;

use crate::nodes::{CommentLine, Comments, TrailingComment};
use crate::parser::Tag;
use crate::scanner::TScalarStyle;

/// A value of a class registered with the engine.
///
/// Blanket-implemented for every `Any + Debug + Send + Sync` type, so registered classes only
/// need to implement [`crate::YamlClass`].
pub trait YamlObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> YamlObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A shared handle to a class instance. Two handles are equal when they point to the same
/// instance.
#[derive(Clone)]
pub struct ObjectRef(pub Arc<dyn YamlObject>);

impl ObjectRef {
    pub fn new<T: YamlObject>(object: T) -> ObjectRef {
        ObjectRef(Arc::new(object))
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref::<T>()
    }

    /// The `TypeId` of the instance.
    #[must_use]
    pub fn object_type_id(&self) -> std::any::TypeId {
        (*self.0).as_any().type_id()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0).cast::<()>() as usize).hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A value carrying a tag nothing is registered for.
#[derive(Clone, PartialEq, Debug, Eq, Hash)]
pub struct TaggedValue {
    /// The full tag.
    pub tag: String,
    pub value: Value,
}

/// A YAML node is stored as this `Yaml` enumeration, which provides an easy way to
/// access your YAML document.
///
/// # Examples
///
/// ```
/// use yaml_roundtrip::{Value, Yaml};
/// let foo = Yaml::from_str("-123"); // convert the string to the appropriate YAML type
/// assert_eq!(foo.as_i64().unwrap(), -123);
///
/// // iterate over an Array
/// let vec = Value::from(vec![Value::from(1), Value::from(2)]);
/// for v in vec.as_vec().unwrap() {
///     assert!(v.as_i64().is_some());
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Eq, Hash)]
pub enum Yaml {
    /// Float types are stored as String and parsed on demand.
    /// Note that f64 does NOT implement Eq trait and can NOT be a hash key.
    Real(String),
    /// YAML int is stored as i64.
    Integer(i64),
    /// YAML scalar.
    String(String),
    /// YAML bool, e.g. `true` or `false`.
    Boolean(bool),
    /// A `!!timestamp`, kept as written.
    Timestamp(String),
    /// YAML array, can be accessed as a `Vec`.
    Array(Vec<Value>),
    /// YAML hash, can be accessed as a `LinkedHashMap`.
    ///
    /// Insertion order will match the order of insertion into the map.
    Hash(LinkedHashMap<Value, Value>),
    /// A node with a tag that has no constructor.
    Tagged(Box<TaggedValue>),
    /// An instance of a registered class.
    Object(ObjectRef),
    /// A reference, by anchor name, to a node that is still being constructed.
    Alias(String),
    /// YAML null, e.g. `null` or `~`.
    Null,
    /// Accessing a nonexistent node via the Index trait returns `BadValue`. This
    /// simplifies error handling in the calling code. Invalid type conversion also
    /// returns `BadValue`.
    BadValue,
}

/// How a document was written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentFormat {
    pub explicit_start: bool,
    pub explicit_end: bool,
    /// The `%YAML` directive.
    pub version: Option<(u32, u32)>,
    /// The `%TAG` directives.
    pub tags: Vec<(String, String)>,
    /// Comment on the `---` line.
    pub start_comment: Option<TrailingComment>,
    /// Comments after the last node.
    pub end_comments: Vec<CommentLine>,
}

/// How a value was written. Only round-trip loads record it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Format {
    /// The tag as written.
    pub tag: Option<Tag>,
    pub anchor: Option<String>,
    /// Set on the later occurrences of an anchored value: they were written as `*alias`.
    pub alias: Option<String>,
    pub style: Option<TScalarStyle>,
    /// Original spelling of a number, boolean or null (`0x1F`, `yes`, `~`).
    pub source: Option<String>,
    /// Flow style of a collection.
    pub flow: Option<bool>,
    pub comments: Comments,
    /// Keys of a mapping that were brought in by a `<<` merge.
    pub merged_keys: Vec<Value>,
    /// Set on the root value of a document.
    pub document: Option<DocumentFormat>,
}

/// A loaded value: the data, and how it was written.
#[derive(Clone, Debug)]
pub struct Value {
    pub data: Yaml,
    pub format: Option<Box<Format>>,
}

static BAD_VALUE: Value = Value {
    data: Yaml::BadValue,
    format: None,
};

macro_rules! define_as (
    ($name:ident, $t:ty, $yt:ident) => (
pub fn $name(&self) -> Option<$t> {
    match self.data {
        Yaml::$yt(v) => Some(v),
        _ => None
    }
}
    );
);

macro_rules! define_as_ref (
    ($name:ident, $t:ty, $yt:ident) => (
pub fn $name(&self) -> Option<$t> {
    match &self.data {
        Yaml::$yt(v) => Some(v),
        _ => None
    }
}
    );
);

macro_rules! define_as_mut (
    ($name:ident, $t:ty, $yt:ident) => (
pub fn $name(&mut self) -> Option<$t> {
    match &mut self.data {
        Yaml::$yt(v) => Some(v),
        _ => None
    }
}
    );
);

macro_rules! define_into (
    ($name:ident, $t:ty, $yt:ident) => (
pub fn $name(self) -> Option<$t> {
    match self.data {
        Yaml::$yt(v) => Some(v),
        _ => None
    }
}
    );
);

impl Value {
    #[must_use]
    pub fn new(data: Yaml) -> Value {
        Value { data, format: None }
    }

    #[must_use]
    pub fn null() -> Value {
        Value::new(Yaml::Null)
    }

    /// A value of a tag nothing is registered for.
    #[must_use]
    pub fn tagged(tag: &str, value: Value) -> Value {
        Value::new(Yaml::Tagged(Box::new(TaggedValue {
            tag: tag.to_owned(),
            value,
        })))
    }

    /// Wrap a class instance.
    pub fn object<T: YamlObject>(object: T) -> Value {
        Value::new(Yaml::Object(ObjectRef::new(object)))
    }

    #[must_use]
    pub fn bad_value() -> &'static Value {
        &BAD_VALUE
    }

    #[must_use]
    pub fn with_format(mut self, format: Format) -> Value {
        self.format = Some(Box::new(format));
        self
    }

    #[must_use]
    pub fn format(&self) -> Option<&Format> {
        self.format.as_deref()
    }

    /// The format of the value, created empty if there was none.
    pub fn format_mut(&mut self) -> &mut Format {
        self.format.get_or_insert_with(Box::default)
    }

    /// Comments attached to the value, if any.
    #[must_use]
    pub fn comments(&self) -> Option<&Comments> {
        self.format().map(|f| &f.comments)
    }

    /// Put a comment at the end of the line the value ends on.
    pub fn set_trailing_comment(&mut self, text: &str) {
        let text = if text.starts_with('#') {
            text.to_owned()
        } else {
            format!("# {text}")
        };
        self.format_mut().comments.trailing = Some(TrailingComment {
            col: 0,
            gap: 2,
            text,
        });
    }

    /// The tag the value was written with.
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.format().and_then(|f| f.tag.as_ref())
    }

    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        self.format().and_then(|f| f.anchor.as_deref())
    }

    define_as!(as_bool, bool, Boolean);
    define_as!(as_i64, i64, Integer);

    define_as_ref!(as_str, &str, String);
    define_as_ref!(as_hash, &LinkedHashMap<Value, Value>, Hash);
    define_as_ref!(as_vec, &Vec<Value>, Array);
    define_as_ref!(as_tagged, &TaggedValue, Tagged);

    define_as_mut!(as_hash_mut, &mut LinkedHashMap<Value, Value>, Hash);
    define_as_mut!(as_vec_mut, &mut Vec<Value>, Array);

    define_into!(into_bool, bool, Boolean);
    define_into!(into_i64, i64, Integer);
    define_into!(into_string, String, String);
    define_into!(into_hash, LinkedHashMap<Value, Value>, Hash);
    define_into!(into_vec, Vec<Value>, Array);

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match &self.data {
            Yaml::Real(v) => parse_f64(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_f64(self) -> Option<f64> {
        self.as_f64()
    }

    /// The registered class instance, if it is a `T`.
    #[must_use]
    pub fn as_object<T: Any>(&self) -> Option<&T> {
        match &self.data {
            Yaml::Object(o) => o.downcast_ref::<T>(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.data, Yaml::Null)
    }

    #[must_use]
    pub fn is_badvalue(&self) -> bool {
        matches!(self.data, Yaml::BadValue)
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.data, Yaml::Array(_))
    }

    #[must_use]
    pub fn is_hash(&self) -> bool {
        matches!(self.data, Yaml::Hash(_))
    }

    /// Insert into a mapping, keeping the position of an existing key.
    /// Returns `false` if this is not a mapping.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> bool {
        let Some(hash) = self.as_hash_mut() else {
            return false;
        };
        let key = key.into();
        let value = value.into();
        if let Some(slot) = hash.get_mut(&key) {
            *slot = value;
        } else {
            hash.insert(key, value);
        }
        true
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.data == other.data
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl Yaml {
    // Not implementing FromStr because there is no possibility of Error.
    // This function falls back to Yaml::String if nothing else matches.
    #[must_use]
    pub fn from_str(v: &str) -> Yaml {
        crate::constructor::construct_plain(v, crate::resolver::DEFAULT_VERSION)
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Yaml::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Yaml::String(v) => Some(v),
            _ => None,
        }
    }

    /// The scalar type name, for messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Yaml::Real(_) => "float",
            Yaml::Integer(_) => "int",
            Yaml::String(_) => "str",
            Yaml::Boolean(_) => "bool",
            Yaml::Timestamp(_) => "timestamp",
            Yaml::Array(_) => "seq",
            Yaml::Hash(_) => "map",
            Yaml::Tagged(_) => "tagged",
            Yaml::Object(_) => "object",
            Yaml::Alias(_) => "alias",
            Yaml::Null => "null",
            Yaml::BadValue => "bad value",
        }
    }
}

impl From<Yaml> for Value {
    fn from(data: Yaml) -> Value {
        Value::new(data)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::new(Yaml::String(v.to_owned()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::new(Yaml::String(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::new(Yaml::Integer(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::new(Yaml::Integer(i64::from(v)))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::new(Yaml::Boolean(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::new(Yaml::Real(format_f64(v)))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::new(Yaml::Array(v))
    }
}

impl From<LinkedHashMap<Value, Value>> for Value {
    fn from(v: LinkedHashMap<Value, Value>) -> Value {
        Value::new(Yaml::Hash(v))
    }
}

impl<'a> Index<&'a str> for Value {
    type Output = Value;

    fn index(&self, idx: &'a str) -> &Value {
        let key = Value::from(idx);
        match self.as_hash() {
            Some(h) => h.get(&key).unwrap_or(Value::bad_value()),
            None => Value::bad_value(),
        }
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        if let Some(v) = self.as_vec() {
            v.get(idx).unwrap_or(Value::bad_value())
        } else if let Some(v) = self.as_hash() {
            let Ok(i) = i64::try_from(idx) else {
                return Value::bad_value();
            };
            v.get(&Value::from(i)).unwrap_or(Value::bad_value())
        } else {
            Value::bad_value()
        }
    }
}

impl IntoIterator for Value {
    type Item = Value;
    type IntoIter = vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().unwrap_or_default().into_iter()
    }
}

/// Parse a YAML float: underscores, `.inf` and `.nan` spellings included.
#[must_use]
pub fn parse_f64(v: &str) -> Option<f64> {
    let cleaned: String = v.chars().filter(|&c| c != '_').collect();
    match cleaned.as_str() {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        s if s.contains(':') => parse_sexagesimal_f64(s),
        s => s.parse::<f64>().ok(),
    }
}

fn parse_sexagesimal_f64(v: &str) -> Option<f64> {
    let (sign, digits) = match v.as_bytes().first() {
        Some(b'-') => (-1.0, &v[1..]),
        Some(b'+') => (1.0, &v[1..]),
        _ => (1.0, v),
    };
    let mut value = 0.0;
    for part in digits.split(':') {
        value = value * 60.0 + part.parse::<f64>().ok()?;
    }
    Some(sign * value)
}

/// The canonical spelling of a float.
#[must_use]
pub fn format_f64(v: f64) -> String {
    if v.is_nan() {
        ".nan".to_owned()
    } else if v.is_infinite() {
        if v > 0.0 { ".inf" } else { "-.inf" }.to_owned()
    } else {
        let s = format!("{v:?}");
        if s.contains('.') || s.contains('e') {
            s
        } else {
            format!("{s}.0")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_equality_ignores_format() {
        let mut a = Value::from("x");
        a.format_mut().style = Some(TScalarStyle::DoubleQuoted);
        assert_eq!(a, Value::from("x"));
    }

    #[test]
    fn test_index() {
        let mut h = LinkedHashMap::new();
        h.insert(Value::from("a"), Value::from(vec![Value::from(1), Value::from(2)]));
        let v = Value::from(h);
        assert_eq!(v["a"][1].as_i64(), Some(2));
        assert!(v["b"].is_badvalue());
        assert!(v["a"][5].is_badvalue());
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64("1_000.5"), Some(1000.5));
        assert_eq!(parse_f64("-.inf"), Some(f64::NEG_INFINITY));
        assert!(parse_f64(".NaN").unwrap().is_nan());
        assert_eq!(parse_f64("1:30.5"), Some(90.5));
        assert_eq!(parse_f64("abc"), None);
    }

    #[test]
    fn test_format_f64() {
        assert_eq!(format_f64(1.0), "1.0");
        assert_eq!(format_f64(0.5), "0.5");
        assert_eq!(format_f64(f64::INFINITY), ".inf");
    }

    #[derive(Debug, PartialEq)]
    struct Point(i64, i64);

    #[test]
    fn test_objects() {
        let v = Value::object(Point(1, 2));
        assert_eq!(v.as_object::<Point>(), Some(&Point(1, 2)));
        assert!(v.as_object::<String>().is_none());
        assert_eq!(v, v.clone());
        assert_ne!(v, Value::object(Point(1, 2)));
    }
}
