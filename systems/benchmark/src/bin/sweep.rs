use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Mutex,
};

use benchmark::{
    AGGREGATE_KEY, AggregateOutcome, BenchmarkNetwork, Topology, network::DEFAULT_SEED, stats,
};
use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
use linksim::{anykv, statistics};
use rayon::prelude::*;

/// Measures benchmark throughput over a range of layouts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output directory
    odir: PathBuf,

    /// Smallest number of workers to sweep down to
    #[arg(long, default_value_t = 2)]
    min_workers: u32,

    /// Runs per layout, each with its own seed
    #[arg(short = 'n', long, default_value_t = 1)]
    runs: u64,

    #[arg(short = 'c', long, default_value_t = 200_000)]
    num_cycles: u64,

    #[arg(short = 'r', long, default_value_t = 1.0)]
    remote_probability: f64,
}

/// `(workers, initial events)` pairs: (128, 8), (64, 16), ... keeping the
/// number of events in flight constant.
fn layouts(min_workers: u32) -> Vec<(u32, u32)> {
    let mut layouts = vec![(128, 8)];
    while let Some(&(workers, initial_events)) = layouts.last() {
        if workers <= min_workers.max(1) {
            break;
        }
        layouts.push((workers / 2, initial_events * 2));
    }
    layouts
}

fn run_once(args: &Args, (workers, initial_events): (u32, u32), run: u64) -> Result<f64> {
    let mut sim = BenchmarkNetwork::new(workers, Topology::AllToAll)
        .initial_events(initial_events)
        .remote_probability(args.remote_probability)
        .num_cycles(args.num_cycles)
        .seed(DEFAULT_SEED + run * 1_000_000)
        .build()?;
    let summary = sim.run()?;

    let rate = match anykv::try_get::<AggregateOutcome>(AGGREGATE_KEY) {
        Some(Ok(aggregate)) => Some(aggregate.events_per_second),
        _ => stats::events_per_second(&statistics::snapshot(), summary.elapsed),
    };
    Ok(rate.unwrap_or(0.0))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    fs::create_dir_all(&args.odir)
        .wrap_err_with(|| format!("failed to create {}", args.odir.display()))?;

    let layouts = layouts(args.min_workers);
    println!("{layouts:?}");

    let rates = Mutex::new(vec![0.0; layouts.len()]);
    layouts
        .iter()
        .enumerate()
        .flat_map(|(index, layout)| (0..args.runs).map(move |run| (index, *layout, run)))
        .par_bridge()
        .try_for_each(|(index, layout, run)| -> Result<()> {
            let rate = run_once(&args, layout, run)?;
            println!("{}_{}_{} -> {}", layout.0, layout.1, run, rate);
            if let Ok(mut rates) = rates.lock() {
                rates[index] += rate / args.runs as f64;
            }
            Ok(())
        })?;

    let rates = rates
        .into_inner()
        .map_err(|_| color_eyre::eyre::eyre!("a sweep run panicked"))?;

    let path = args.odir.join("performance.csv");
    let mut out = BufWriter::new(File::create(&path)?);
    writeln!(out, "Benchmark,Events per second")?;
    for ((workers, initial_events), rate) in layouts.iter().zip(rates) {
        writeln!(out, "{workers}x{initial_events},{rate}")?;
    }
    out.flush()?;
    println!("Results in {}", path.display());

    Ok(())
}
