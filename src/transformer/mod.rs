//! Content transformation.
//! A transformer rewrites the bytes of a single file. Implementations provide
//! the streaming form once and get the line-buffer form from the trait.

use crate::config::Configurable;
use crate::error::{Error, Result};
use std::io::{Cursor, Read, Write};

pub mod parameter;

pub use parameter::DefaultParameterSubstitutionTransformer;

/// Separator used to join and split lines in [`ContentTransformer::apply_lines`].
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Name used in errors raised by the line-buffer adapter.
const IN_MEMORY_SOURCE: &str = "<in-memory lines>";

/// Trait for content transformers.
pub trait ContentTransformer: Configurable + Send + Sync {
    /// Reads the whole content from `input` and writes the transformed
    /// content to `output`.
    ///
    /// # Errors
    /// Any read, parse or write failure. Nothing guarantees `output` is left
    /// untouched on failure unless the implementation says so.
    fn apply(&self, input: &mut dyn Read, output: &mut dyn Write) -> Result<()>;

    /// Transforms a sequence of lines.
    ///
    /// The lines are joined with [`LINE_SEPARATOR`], passed through
    /// [`ContentTransformer::apply`] and the output is split on the same
    /// separator. Failures are reported as `Error::TransformError`.
    fn apply_lines(&self, lines: &[String]) -> Result<Vec<String>> {
        let mut input = Cursor::new(lines.join(LINE_SEPARATOR).into_bytes());
        let mut output = Vec::new();

        self.apply(&mut input, &mut output)
            .map_err(|e| e.in_transform(IN_MEMORY_SOURCE))?;

        let text = String::from_utf8(output).map_err(|e| {
            Error::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                .in_transform(IN_MEMORY_SOURCE)
        })?;

        Ok(text.split(LINE_SEPARATOR).map(str::to_string).collect())
    }
}
