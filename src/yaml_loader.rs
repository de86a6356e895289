//! The loader entry point of earlier releases.

use crate::engine::{Engine, Mode};
use crate::error::YamlError;
use crate::value::Value;

/// Loads every document of a string in safe mode.
pub struct YamlLoader;

impl YamlLoader {
    /// Load every document of `source` in safe mode.
    /// # Errors
    /// Returns `YamlError` if the text is not valid YAML or a value cannot be built.
    #[deprecated(note = "use `Engine::new(Mode::Safe).load_all` instead")]
    pub fn load_from_str(source: &str) -> Result<Vec<Value>, YamlError> {
        log::warn!(
            "YamlLoader::load_from_str is deprecated, use Engine::new(Mode::Safe).load_all instead"
        );
        Engine::new(Mode::Safe).load_all(source)
    }
}
