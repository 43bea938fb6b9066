use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use prudence::commands;

fn monitor_args() -> [Arg; 3] {
    [
        Arg::new("interval")
            .short('i')
            .long("interval")
            .value_name("SECS")
            .help("Seconds between checks (overrides global.interval)")
            .value_parser(value_parser!(f64)),
        Arg::new("disable")
            .short('d')
            .long("disable")
            .value_name("NAME")
            .help("Alerts to skip (repeat or separate with commas)")
            .action(ArgAction::Append)
            .value_delimiter(','),
        Arg::new("no-notify")
            .long("no-notify")
            .help("Log alerts instead of sending desktop notifications")
            .action(ArgAction::SetTrue),
    ]
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print JSON instead of text")
        .action(ArgAction::SetTrue)
}

fn main() -> Result<()> {
    let matches = Command::new("prudence")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watch system signals and raise alerts when they cross a threshold")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Custom configuration file, merged over the defaults")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .args(monitor_args())
        .subcommand(
            Command::new("monitor")
                .about("Check every alert periodically (default)")
                .args(monitor_args()),
        )
        .subcommand(
            Command::new("list")
                .about("List configured alerts")
                .arg(
                    Arg::new("builtins")
                        .long("builtins")
                        .help("List built-in rs: behaviors instead")
                        .action(ArgAction::SetTrue),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Evaluate one alert once")
                .arg(
                    Arg::new("name")
                        .help("Alert name as configured")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("value")
                        .long("value")
                        .value_name("V")
                        .help("Use this value instead of probing")
                        .allow_negative_numbers(true),
                )
                .arg(json_arg()),
        )
        .get_matches();

    prudence::init_logging(matches.get_flag("debug"));

    dispatch(&matches)
}

fn dispatch(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("monitor", sub_matches)) => commands::monitor(sub_matches),
        Some(("list", sub_matches)) => commands::list(sub_matches),
        Some(("check", sub_matches)) => commands::check(sub_matches),
        _ => commands::monitor(matches),
    }
}
