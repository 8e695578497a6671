//! Command-line interface implementation for textpipe.
//! Provides argument parsing and help text formatting using clap, and the
//! `run` entry point wiring configuration, dispatcher and transformer together.

use clap::{error::ErrorKind, CommandFactory, Parser};
use log::{debug, info};
use std::path::PathBuf;

use crate::config::build_configuration;
use crate::error::Result;
use crate::registry::{Registry, DEFAULT_DISPATCHER, DEFAULT_TRANSFORMER};

/// Command-line arguments structure for textpipe.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "textpipe: rewrite parameter files into a mirrored target tree",
    long_about = None
)]
pub struct Args {
    /// Source file or directory to transform
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target file or directory receiving the transformed files
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Dispatcher deciding which files are transformed and where they are placed
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_DISPATCHER)]
    pub pipe: String,

    /// Transformer rewriting the content of each file
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_TRANSFORMER)]
    pub transformer: String,

    /// Configuration file (.properties, .json, .yml or .yaml)
    #[arg(long, value_name = "PATH", alias = "default-conf-dir")]
    pub conf_file: Option<PathBuf>,

    /// Configuration entry overriding the file, in <key>=<value> form.
    /// May be given several times; later entries win.
    #[arg(short, long = "conf", value_name = "KEY=VALUE")]
    pub conf: Vec<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// The command printed when required arguments are missing.
pub fn usage() -> clap::Command {
    Args::command().help_template(
        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
    )
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                if let Err(e) = usage().print_help() {
                    log::error!("Unable to print usage: {e}");
                }
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}

/// Resolves the components named in `args`, configures them and runs the
/// transformation.
///
/// Component and configuration errors are returned before any file is read
/// or written.
pub fn run(args: Args) -> Result<()> {
    run_with_registry(args, &Registry::new())
}

/// [`run`] against a caller supplied registry.
pub fn run_with_registry(args: Args, registry: &Registry) -> Result<()> {
    let dispatcher = registry.create_dispatcher(&args.pipe)?;
    let transformer = registry.create_transformer(&args.transformer)?;

    let conf = build_configuration(args.conf_file.as_ref(), &args.conf)?;
    debug!("Effective configuration has {} entries", conf.len());

    dispatcher.configure(&conf)?;
    transformer.configure(&conf)?;

    info!("Transforming '{}' into '{}'", args.source.display(), args.target.display());
    dispatcher.transform(&args.source, &args.target, transformer.as_ref())
}
