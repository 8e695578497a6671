//! textpipe discovers text files under a source path, rewrites each one with a
//! pluggable transformer and writes the result under a mirrored target path.
//! The default transformer substitutes values into XML parameter files, which
//! makes it a build-time tool for generating per-environment parameter sets.

/// Command-line interface module for the textpipe application
pub mod cli;

/// Flat key/value configuration and the `Configurable` trait
/// Supports .properties, JSON and YAML files plus command line overrides
pub mod config;

/// File discovery and dispatch of files to a transformer
pub mod dispatcher;

/// Error types and handling for the textpipe application
pub mod error;

/// Logger initialisation for the binary
pub mod logger;

/// Name based resolution of dispatchers and transformers
pub mod registry;

/// Content transformers
/// The default one rewrites `parameter` elements of XML documents
pub mod transformer;
