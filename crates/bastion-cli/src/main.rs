//! Bastion CLI - Replay a descriptor trace into a device rule

mod config;
mod trace;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::OutputFormat;
use crate::trace::Trace;

#[derive(Parser, Debug)]
#[command(name = "bastion")]
#[command(about = "Generate USB device authorization rules from descriptor traces")]
#[command(version)]
struct Args {
    /// Descriptor trace (JSON) to replay
    #[arg(required_unless_present = "init_config")]
    trace: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "bastion.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Pin the rule to the port the device was seen on
    #[arg(long)]
    include_port: bool,

    /// Print the rule as JSON instead of rule text
    #[arg(long)]
    json: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.init_config {
        config::save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    // Config is read before logging is up, so its own messages are not shown
    let config = config::load_config(&args.config)?;

    let level = parse_level(args.log_level.as_deref().unwrap_or(&config.logging.level));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Bastion v{}", env!("CARGO_PKG_VERSION"));

    let Some(trace_path) = args.trace else {
        anyhow::bail!("No descriptor trace given");
    };

    let include_port = args.include_port || config.rules.include_port;
    let format = if args.json {
        OutputFormat::Json
    } else {
        config.rules.format
    };

    let trace = Trace::from_file(&trace_path)?;
    let rule = trace.replay(config.limits, include_port)?;

    match format {
        OutputFormat::Text => println!("{}", rule),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rule)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_trace_required_without_init() {
        assert!(Args::try_parse_from(["bastion"]).is_err());
        let args = Args::try_parse_from(["bastion", "--init-config"]).unwrap();
        assert!(args.init_config);

        let args = Args::try_parse_from(["bastion", "trace.json", "--include-port"]).unwrap();
        assert_eq!(args.trace, Some(PathBuf::from("trace.json")));
        assert!(args.include_port);
    }
}
