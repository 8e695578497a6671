//! Logger setup for the textpipe binary.

/// Initialises `env_logger`: debug output with `verbose`, info otherwise.
/// `RUST_LOG` still takes precedence when set.
pub fn init_logger(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();
}
