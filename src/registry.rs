//! Resolution of dispatchers and transformers by name.
//! Components are registered with a constructor, so a name can only ever
//! resolve to a type implementing the required trait.

use crate::dispatcher::{DefaultTransformDispatcher, TransformDispatcher};
use crate::error::{Error, Result};
use crate::transformer::{ContentTransformer, DefaultParameterSubstitutionTransformer};
use indexmap::IndexMap;
use log::debug;

/// Name of the dispatcher used when none is given.
pub const DEFAULT_DISPATCHER: &str = "default";

/// Name of the transformer used when none is given.
pub const DEFAULT_TRANSFORMER: &str = "xml-parameter";

pub type DispatcherFactory = fn() -> Box<dyn TransformDispatcher>;
pub type TransformerFactory = fn() -> Box<dyn ContentTransformer>;

/// Named constructors for the pluggable components.
pub struct Registry {
    dispatchers: IndexMap<String, DispatcherFactory>,
    transformers: IndexMap<String, TransformerFactory>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self { dispatchers: IndexMap::new(), transformers: IndexMap::new() }
    }

    /// Creates a registry holding the built-in components.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_dispatcher(DEFAULT_DISPATCHER, default_dispatcher);
        registry.register_dispatcher("DefaultTransformDispatcher", default_dispatcher);

        registry.register_transformer(DEFAULT_TRANSFORMER, xml_parameter);
        registry.register_transformer("default", xml_parameter);
        registry.register_transformer("DefaultParameterSubstitutionTransformer", xml_parameter);

        registry
    }

    pub fn register_dispatcher<S: Into<String>>(&mut self, name: S, factory: DispatcherFactory) {
        self.dispatchers.insert(name.into(), factory);
    }

    pub fn register_transformer<S: Into<String>>(&mut self, name: S, factory: TransformerFactory) {
        self.transformers.insert(name.into(), factory);
    }

    pub fn dispatcher_names(&self) -> Vec<&str> {
        self.dispatchers.keys().map(String::as_str).collect()
    }

    pub fn transformer_names(&self) -> Vec<&str> {
        self.transformers.keys().map(String::as_str).collect()
    }

    /// Instantiates the dispatcher registered as `name`.
    ///
    /// # Errors
    /// * `Error::ConfigError` if no dispatcher is registered under `name`
    pub fn create_dispatcher(&self, name: &str) -> Result<Box<dyn TransformDispatcher>> {
        debug!("Resolving dispatcher '{name}'");
        self.dispatchers.get(name).map(|factory| factory()).ok_or_else(|| {
            unknown("dispatcher", name, &self.dispatcher_names())
        })
    }

    /// Instantiates the transformer registered as `name`.
    ///
    /// # Errors
    /// * `Error::ConfigError` if no transformer is registered under `name`
    pub fn create_transformer(&self, name: &str) -> Result<Box<dyn ContentTransformer>> {
        debug!("Resolving transformer '{name}'");
        self.transformers.get(name).map(|factory| factory()).ok_or_else(|| {
            unknown("transformer", name, &self.transformer_names())
        })
    }
}

fn default_dispatcher() -> Box<dyn TransformDispatcher> {
    Box::new(DefaultTransformDispatcher::new())
}

fn xml_parameter() -> Box<dyn ContentTransformer> {
    Box::new(DefaultParameterSubstitutionTransformer::new())
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

fn unknown(kind: &str, name: &str, available: &[&str]) -> Error {
    log::warn!("Unknown {kind} '{name}'");
    Error::ConfigError(format!(
        "The given {kind} '{name}' is not registered (available: {})",
        available.join(", ")
    ))
}
