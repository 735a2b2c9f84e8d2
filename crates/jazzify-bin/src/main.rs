// jazzify: play a chord-rhythm stage headlessly with an autoplayer.

mod autoplay;
mod drift;
mod runner;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use runner::{ClockKind, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "jazzify", about = "Chord rhythm stage runner")]
struct Args {
    /// Stage descriptor JSON file.
    #[arg(long)]
    stage: PathBuf,

    /// Seed for chord draws and damage rolls.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Session clock.
    #[arg(long, value_enum, default_value_t = ClockKind::Wall)]
    clock: ClockKind,

    /// Run against real time instead of stepping simulated frames.
    #[arg(long)]
    realtime: bool,

    /// Autoplay timing offset from each target, in ms (negative plays early).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    accuracy_ms: f64,

    /// Skip every Nth target.
    #[arg(long)]
    miss_every: Option<u32>,

    /// Stop after this many loop cycles if the encounter is still undecided.
    #[arg(long, default_value_t = 8)]
    max_cycles: u32,

    /// Playback speed relative to the reference clock for `--clock audio`.
    #[arg(long, default_value_t = 1.002)]
    drift: f64,

    /// Enable debug logging.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let stage = runner::load_stage(&args.stage)?;
    log::info!(
        "loaded stage {:?} {:?} ({} bpm, {} measures)",
        stage.stage_number,
        stage.name,
        stage.bpm,
        stage.measure_count
    );

    let options = RunOptions {
        seed: args.seed,
        clock: args.clock,
        realtime: args.realtime,
        accuracy_ms: args.accuracy_ms,
        miss_every: args.miss_every,
        max_cycles: args.max_cycles,
        drift: args.drift,
    };
    let summary = runner::run(&stage, &options)?;
    println!("{summary}");
    Ok(())
}
