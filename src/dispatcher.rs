//! File discovery and dispatch.
//! A dispatcher decides which files under a source path are transformed and
//! where their output goes under the target path.

use crate::config::{Configurable, Configuration};
use crate::error::{Error, Result};
use crate::transformer::ContentTransformer;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use walkdir::WalkDir;

/// Configuration key holding the comma separated extension allow-list.
pub const EXTENSIONS_CONF_NAME: &str = "pipe.conf.extensions";

/// Separator between extensions in [`EXTENSIONS_CONF_NAME`].
pub const EXTENSIONS_SEPARATOR: char = ',';

/// Trait for components that discover files and dispatch them to a
/// [`ContentTransformer`].
pub trait TransformDispatcher: Configurable {
    /// Transforms `source` (a file or a directory) into `target`.
    ///
    /// # Errors
    /// * `Error::SourceNotFoundError` if `source` doesn't exist; nothing is
    ///   created in that case
    /// * `Error::TargetDirectoryError` if the target directory can't be created
    /// * `Error::TransformError` for the first file that fails. Files written
    ///   before the failure are kept.
    fn transform(
        &self,
        source: &Path,
        target: &Path,
        transformer: &dyn ContentTransformer,
    ) -> Result<()>;
}

/// File name extensions a directory walk is restricted to.
///
/// Matching is case-sensitive against the file name suffix `.<ext>`.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
    globs: GlobSet,
}

impl ExtensionFilter {
    /// Builds a filter from a list such as `"xml, param"`.
    ///
    /// Returns `None` when the list holds no extension, which means every
    /// file is accepted.
    pub fn parse(list: &str) -> Result<Option<Self>> {
        let extensions: Vec<String> = list
            .trim()
            .split(EXTENSIONS_SEPARATOR)
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect();

        if extensions.is_empty() {
            return Ok(None);
        }

        let mut builder = GlobSetBuilder::new();
        for ext in &extensions {
            builder.add(Glob::new(&format!("*.{}", globset::escape(ext)))?);
        }

        Ok(Some(Self { extensions, globs: builder.build()? }))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Checks the file name of `path` against the allow-list.
    pub fn is_match<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref().file_name().is_some_and(|name| self.globs.is_match(name))
    }
}

/// Walks a directory tree and mirrors every matching file into the target.
#[derive(Debug, Default)]
pub struct DefaultTransformDispatcher {
    filter: RwLock<Option<ExtensionFilter>>,
}

impl DefaultTransformDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher restricted to `filter`.
    pub fn with_filter(filter: Option<ExtensionFilter>) -> Self {
        Self { filter: RwLock::new(filter) }
    }

    /// The configured extension filter, if any.
    pub fn filter(&self) -> Option<ExtensionFilter> {
        self.filter.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Output location for a single source file: `target` itself when it is an
    /// existing file, otherwise `target/<file name>` with `target` created as a
    /// directory.
    fn file_target(&self, source: &Path, target: &Path) -> Result<PathBuf> {
        if target.is_file() {
            return Ok(target.to_path_buf());
        }

        let name = source.file_name().ok_or_else(|| {
            Error::ConfigError(format!("'{}' has no file name", source.display()))
        })?;
        ensure_target_dir(target)?;
        Ok(target.join(name))
    }

    fn collect_dir(&self, source: &Path, target: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
        ensure_target_dir(target)?;
        let filter = self.filter();

        let mut jobs = Vec::new();
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Some(filter) = &filter {
                if !filter.is_match(path) {
                    debug!("Skipping file {} not matching the extension filter", path.display());
                    continue;
                }
            }

            let relative_path =
                path.strip_prefix(source).map_err(|e| Error::IoError(std::io::Error::other(e)))?;
            jobs.push((path.to_path_buf(), target.join(relative_path)));
        }
        Ok(jobs)
    }
}

/// Creates `target` and its parents when missing.
pub fn ensure_target_dir(target: &Path) -> Result<()> {
    if target.is_dir() {
        return Ok(());
    }
    debug!("Creating target directory {}", target.display());
    fs::create_dir_all(target).map_err(|source| Error::TargetDirectoryError {
        target_path: target.display().to_string(),
        source,
    })
}

/// Transforms one file into another, creating the parent directories of
/// `target`. Both handles are closed when this returns, on every path.
pub fn transform_one(
    source: &Path,
    target: &Path,
    transformer: &dyn ContentTransformer,
) -> Result<()> {
    let run = || -> Result<()> {
        if is_same_file(source, target)? {
            return Err(Error::ConfigError(format!(
                "'{}' would overwrite its own source",
                target.display()
            )));
        }
        let mut reader = BufReader::new(File::open(source)?);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(target)?);
        transformer.apply(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(())
    };

    run().map_err(|e| e.in_transform(source))?;
    debug!("Wrote {}", target.display());
    Ok(())
}

/// Whether `target` already exists and resolves to the same file as `source`.
fn is_same_file(source: &Path, target: &Path) -> Result<bool> {
    if !target.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(source)? == fs::canonicalize(target)?)
}

impl Configurable for DefaultTransformDispatcher {
    fn configure(&self, conf: &Configuration) -> Result<()> {
        if let Some(list) = conf.get(EXTENSIONS_CONF_NAME) {
            let filter = ExtensionFilter::parse(list)?;
            match &filter {
                Some(f) => {
                    debug!("Will only transform files with extension in {:?}", f.extensions())
                }
                None => debug!("Empty extension list, every file will be transformed"),
            }
            *self.filter.write().unwrap_or_else(PoisonError::into_inner) = filter;
        }
        Ok(())
    }
}

impl TransformDispatcher for DefaultTransformDispatcher {
    fn transform(
        &self,
        source: &Path,
        target: &Path,
        transformer: &dyn ContentTransformer,
    ) -> Result<()> {
        if !source.exists() {
            return Err(Error::SourceNotFoundError { source_path: source.display().to_string() });
        }

        let jobs = if source.is_file() {
            vec![(source.to_path_buf(), self.file_target(source, target)?)]
        } else {
            self.collect_dir(source, target)?
        };

        for (source_file, target_file) in &jobs {
            transform_one(source_file, target_file, transformer)?;
        }

        info!("Transformed {} file(s) into {}", jobs.len(), target.display());
        Ok(())
    }
}
