use anyhow::Result;
use colored::*;
use serde::Serialize;

use crate::core::natives;

#[derive(Serialize)]
struct AlertSummary<'a> {
    name: &'a str,
    description: String,
    enabled: bool,
    min_warn: f64,
    reverse: bool,
}

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    if matches.get_flag("builtins") {
        return list_builtins();
    }

    let (_, registry) = super::load_registry(matches)?;

    if matches.get_flag("json") {
        let summaries: Vec<AlertSummary> = registry
            .iter()
            .map(|(name, sensor)| AlertSummary {
                name,
                description: sensor.to_string(),
                enabled: sensor.enabled,
                min_warn: sensor.min_warn(),
                reverse: sensor.reverse(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("{}", "No alerts configured.".yellow());
        return Ok(());
    }

    let width = registry.names().iter().map(|name| name.len()).max().unwrap_or(0);
    for (name, sensor) in registry.iter() {
        let status = if sensor.enabled {
            format!("{:<8}", "enabled").green()
        } else {
            format!("{:<8}", "disabled").red()
        };
        println!("{}  {}  {}", format!("{:<width$}", name).bold(), status, sensor);
    }

    Ok(())
}

fn list_builtins() -> Result<()> {
    println!("{}", "Built-in behaviors (rs: NAME[:ARGS])".bold());
    for (name, roles) in natives::names() {
        println!("  {} {}", format!("{:<20}", name).cyan(), roles.dimmed());
    }
    Ok(())
}
