// Command handlers module
pub mod check;
pub mod list;
pub mod monitor;

// Re-exports for cleaner imports
pub use check::execute as check;
pub use list::execute as list;
pub use monitor::execute as monitor;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::{AlertRegistry, Config, GlobalConfig, Resolver, SearchPath};

/// Load the merged configuration and build every configured sensor
pub(crate) fn load_registry(matches: &ArgMatches) -> Result<(GlobalConfig, AlertRegistry)> {
    let custom = matches.get_one::<PathBuf>("config");
    let config = Config::load(custom.map(PathBuf::as_path))?;
    for source in &config.sources {
        log::debug!("Loaded configuration from {:?}", source);
    }

    let global = config.global()?;
    let resolver = Resolver::new(SearchPath::with_defaults(&global.search_path))
        .with_python(global.python.clone())
        .shared();
    let registry = AlertRegistry::build(&config.entries, resolver)
        .context("Failed to build alerts from configuration")?;

    Ok((global, registry))
}
