mod reports;
mod simulation;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use reports::{render_console, render_json};
use simulation::{SimConfig, SimReport, run_simulation, split_csv};

#[derive(Debug, Parser)]
#[command(name = "tavernkeep-tester", version = "0.1.0")]
#[command(about = "Headless QA sweeps for the Tavernkeep inn engine")]
struct Args {
    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of inns simulated per seed
    #[arg(long, default_value_t = 4)]
    inns: usize,

    /// Ticks per inn
    #[arg(long, default_value_t = 2_000)]
    ticks: u32,

    /// Nominal milliseconds between ticks
    #[arg(long, default_value_t = 30_000)]
    tick_interval_ms: u64,

    /// Maximum deterministic jitter added to each tick interval
    #[arg(long, default_value_t = 15_000)]
    jitter_ms: u64,

    /// Chance per tick that the tick source skips an inn entirely
    #[arg(long, default_value_t = 0.05)]
    skip_chance: f64,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let seeds = split_csv(&args.seeds)
        .iter()
        .map(|s| {
            s.parse::<u64>()
                .with_context(|| format!("invalid seed {s:?}"))
        })
        .collect::<Result<Vec<u64>>>()?;

    let started = Instant::now();
    let mut reports: Vec<SimReport> = Vec::with_capacity(seeds.len());
    for seed in &seeds {
        let cfg = SimConfig {
            seed: *seed,
            inns: args.inns,
            ticks: args.ticks,
            tick_interval_ms: args.tick_interval_ms,
            jitter_ms: args.jitter_ms,
            skip_chance: args.skip_chance,
            verbose: args.verbose,
        };
        let report = run_simulation(&cfg);
        if args.verbose {
            println!(
                "{} seed {} finished: {} cycles, {} settlements",
                "·".dimmed(),
                seed,
                report.cycles_completed,
                report.settlements
            );
        }
        reports.push(report);
    }
    let elapsed = started.elapsed();

    let rendered = match args.report.as_str() {
        "json" => render_json(&reports, elapsed)?,
        _ => render_console(&reports, elapsed),
    };
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writer.write_all(rendered.as_bytes())?;
            writer.flush()?;
        }
        None => {
            let mut out = stdout();
            out.write_all(rendered.as_bytes())?;
            out.flush()?;
        }
    }

    let failures: usize = reports.iter().map(|r| r.violations.len()).sum();
    if failures > 0 {
        eprintln!(
            "{} {} invariant violation(s) across {} seed(s)",
            "FAIL".red().bold(),
            failures,
            reports.len()
        );
        std::process::exit(1);
    }
    println!(
        "{} {} seed(s) clean in {:.2?}",
        "PASS".green().bold(),
        reports.len(),
        elapsed
    );
    Ok(())
}
