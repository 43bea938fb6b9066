//! Monitor command handler.
//!
//! Runs the poll loop until interrupted.

use std::sync::atomic::Ordering;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::{DesktopNotifier, LogNotifier, Notifier, PollLoop};
use crate::platform::has_display;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let no_notify = matches.get_flag("no-notify");
    if !no_notify && !has_display() {
        bail!("No graphical session found (DISPLAY/WAYLAND_DISPLAY unset). Use --no-notify to log alerts instead.");
    }

    let (global, mut registry) = super::load_registry(matches)?;

    if let Some(disabled) = matches.get_many::<String>("disable") {
        let names: Vec<&String> = disabled.collect();
        registry.exclude(&names);
    }

    let interval = matches
        .get_one::<f64>("interval")
        .copied()
        .unwrap_or(global.interval);

    if registry.is_empty() {
        println!("{}", "No alerts configured, nothing to monitor.".yellow());
        return Ok(());
    }

    let mut poll = PollLoop::new(registry, interval, global.persist)
        .context("Invalid polling interval")?;

    let cancel_flag = poll.cancel_flag();
    ctrlc::set_handler(move || {
        cancel_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let notifier: Box<dyn Notifier> = if no_notify {
        Box::new(LogNotifier)
    } else {
        Box::new(DesktopNotifier::default())
    };

    poll.run(notifier.as_ref())?;
    Ok(())
}
