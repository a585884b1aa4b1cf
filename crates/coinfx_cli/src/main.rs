//! coinfx CLI
//!
//! Run effects headlessly against a recording surface and script the reload
//! ceremony.

use anyhow::Result;
use clap::{Parser, Subcommand};
use coinfx_effects::EffectKind;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod ceremony;
mod config;
mod runner;

use runner::Runner;

#[derive(Parser)]
#[command(name = "coinfx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Coin, card and shard effects", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available effects
    List,

    /// Run an effect on a recording surface at simulated 60 Hz
    Run {
        /// Effect name (see `coinfx list`)
        effect: String,

        /// Random seed; picked at random when omitted
        #[arg(short, long)]
        seed: Option<u64>,

        /// Effect configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many frames
        #[arg(long, default_value = "3600")]
        max_frames: u64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Config,

    /// Script a leftover drag and an auto-filled allocation
    Ceremony {
        /// Random seed; picked at random when omitted
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::List => cmd_list(),

        Commands::Run {
            effect,
            seed,
            config,
            max_frames,
            json,
        } => cmd_run(&effect, seed, config, max_frames, json),

        Commands::Config => cmd_config(),

        Commands::Ceremony { seed, json } => cmd_ceremony(seed, json),
    }
}

fn cmd_list() -> Result<()> {
    for kind in EffectKind::ALL {
        let image = if kind.uses_image() { "image" } else { "vector" };
        println!("{:<12} {:<7} {}", kind.name(), image, kind.description());
    }
    Ok(())
}

fn cmd_run(
    effect: &str,
    seed: Option<u64>,
    config: Option<PathBuf>,
    max_frames: u64,
    json: bool,
) -> Result<()> {
    let kind: EffectKind = effect.parse()?;
    let config = config::load(config.as_deref())?;
    let seed = seed.unwrap_or_else(rand::random);

    info!("Running {} (seed {})", kind, seed);
    let summary = Runner::new(config)
        .with_max_frames(max_frames)
        .run(kind, seed);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("effect         {}", summary.effect);
    println!("seed           {}", summary.seed);
    println!("frames         {}", summary.frames);
    println!(
        "draw commands  {} (peak {} per frame)",
        summary.draw_commands, summary.peak_draw_commands
    );
    match summary.completed_at {
        Some(seconds) => println!("completed      {:.3}s", seconds),
        None => println!("completed      no (stopped at frame cap)"),
    }
    if !summary.phases.is_empty() {
        println!("phases");
        for phase in &summary.phases {
            println!(
                "  {:>8.3}s  frame {:>5}  {}",
                phase.elapsed, phase.frame, phase.phase
            );
        }
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    print!("{}", config::default_toml()?);
    Ok(())
}

fn cmd_ceremony(seed: Option<u64>, json: bool) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let report = ceremony::run(seed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Leftovers");
    println!(
        "  dragged {} -> {}: ${:.2}",
        report.drag.source, report.drag.target, report.drag.amount
    );
    println!(
        "  haptics: {} pulses, {} ms",
        report.drag.haptic_pulses, report.drag.haptic_ms
    );
    println!("  income balance: ${:.2}", report.income_after_leftovers);
    println!("  kept: {}", report.kept.join(", "));
    println!("  transferred: {}", report.transferred.join(", "));

    println!("Allocation");
    for line in &report.allocations {
        println!(
            "  {:<14} <- {:<10} ${:>7.2}  ({} coins)",
            line.envelope, line.from, line.amount, line.coins
        );
    }
    if report.from_savings > 0.0 {
        println!("  drawn from savings: ${:.2}", report.from_savings);
    }
    println!(
        "Complete: ${:.2} across {} envelopes in {} frames",
        report.summary.total, report.summary.envelopes, report.frames
    );
    Ok(())
}
