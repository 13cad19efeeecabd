use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use cip51_demos::{Demo, DemoConfig};

#[derive(Parser, Debug)]
#[command(
    name = "cip51-demos",
    version,
    about = "Run the CIP-51 peripheral examples against simulated hardware"
)]
struct Cli {
    /// Demo to run; all of them when omitted
    #[arg(short, long, value_enum)]
    demo: Option<Demo>,
    /// TOML settings file; the built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Foreground iterations per demo
    #[arg(short = 'n', long, default_value_t = 4)]
    cycles: u32,
    /// Log every interrupt and bus transfer
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            DemoConfig::from_toml(&text).with_context(|| format!("loading {}", path.display()))?
        }
        None => DemoConfig::embedded().context("built-in settings")?,
    };

    let demos = match cli.demo {
        Some(demo) => vec![demo],
        None => Demo::ALL.to_vec(),
    };
    for demo in demos {
        let report = demo
            .run(&config, cli.cycles)
            .with_context(|| format!("{} failed", demo.name()))?;
        log::info!(
            "{}: {} interrupts, {} errors",
            demo.name(),
            report.interrupts,
            report.errors
        );
        println!("== {} ==", demo.name());
        for line in &report.lines {
            println!("{}", line);
        }
    }

    Ok(())
}
