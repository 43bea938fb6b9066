//! Check command handler: evaluates one alert once.

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::Reading;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let name = matches
        .get_one::<String>("name")
        .ok_or_else(|| anyhow!("Alert name is required"))?;
    let value = matches.get_one::<String>("value").map(|v| Reading::parse(v));

    let (_, mut registry) = super::load_registry(matches)?;
    let available = registry.names().join(", ");
    let sensor = registry
        .get_mut(name)
        .ok_or_else(|| anyhow!("Unknown alert '{}'. Available: {}", name, available))?;

    if !sensor.enabled && value.is_none() {
        println!("{} {}", name.bold(), "is disabled (supply --value to test it anyway)".yellow());
        return Ok(());
    }

    let message = sensor.evaluate(value)?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&message)?);
        return Ok(());
    }

    match message {
        Some(message) => println!("{}", message.to_string().red().bold()),
        None => println!("{}", format!("{}: no alert", sensor.alert).green()),
    }
    println!(
        "{}",
        format!("next warning at {}{}", sensor.next_warn(), sensor.units).dimmed()
    );

    Ok(())
}
