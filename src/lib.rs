// Copyright 2015, Yuheng Chen.
// Copyright 2023, Ethiraric.
// See the LICENSE file at the top-level directory of this distribution.

//! A YAML 1.1 and 1.2 loader and dumper that can round-trip documents.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! yaml-roundtrip = "0.1.0"
//! ```
//!
//! An [`Engine`] loads text into [`Value`]s and dumps them back. Its [`Mode`] decides what is
//! kept along the way:
//!
//! * [`Mode::Safe`] builds plain data. Tags without a registered class are kept as
//!   [`Yaml::Tagged`] placeholders.
//! * [`Mode::Unsafe`] also runs prefix-matched constructors and rejects unknown tags.
//! * [`Mode::RoundTrip`] additionally records comments, scalar styles, flow styles, tags and
//!   anchors, so that dumping an unmodified value gives back the original text.
//!
//! # Examples
//!
//! ```
//! use yaml_roundtrip::{Engine, Mode};
//!
//! let source = "\
//! ## servers
//! name: web   # primary
//! ports: [80, 443]
//! ";
//! let engine = Engine::new(Mode::RoundTrip);
//! let mut doc = engine.load(source).unwrap();
//! assert_eq!(doc["ports"][1].as_i64(), Some(443));
//!
//! assert_eq!(engine.dump(&doc).unwrap(), source);
//!
//! doc.insert("replicas", 3);
//! assert!(engine.dump(&doc).unwrap().ends_with("replicas: 3\n"));
//! ```

#![cfg_attr(feature = "cargo-clippy", warn(clippy::pedantic))]
#![cfg_attr(
    feature = "cargo-clippy",
    allow(
        clippy::match_same_arms,
        clippy::should_implement_trait,
        clippy::missing_errors_doc,
        clippy::missing_panics_doc,
        clippy::redundant_else,
        clippy::module_name_repetitions,
    )
)]

pub(crate) mod char_traits;
pub mod composer;
pub mod constructor;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod nodes;
pub mod parser;
pub mod reader;
pub mod representer;
pub mod resolver;
pub mod scanner;
pub mod value;
pub mod yaml_loader;

// reexport key APIs
pub use crate::composer::Composer;
pub use crate::constructor::Constructor;
pub use crate::emitter::{EmitterConfig, YamlEmitter};
pub use crate::engine::{register_class, Engine, Mode, Registry, YamlClass};
pub use crate::error::{
    ComposerError, ConstructorError, EmitError, ParserError, ReaderError, RepresenterError,
    ScanError, YamlError,
};
pub use crate::nodes::{Document, Node, NodeRef};
pub use crate::parser::{Event, Parser, Tag};
pub use crate::reader::{Marker, Reader};
pub use crate::representer::Representer;
pub use crate::scanner::TScalarStyle;
pub use crate::value::{ObjectRef, TaggedValue, Value, Yaml, YamlObject};
pub use crate::yaml_loader::YamlLoader;
