use std::{fs::File, io::BufWriter, path::PathBuf};

use benchmark::{
    AGGREGATE_KEY, AggregateOutcome, BenchmarkNetwork, CompletionMode, PortLayout, Topology,
    network::DEFAULT_SEED, stats,
};
use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
use linksim::{anykv, statistics};
use log::LevelFilter;

/// Runs one synthetic traffic benchmark
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of workers
    num_workers: u32,

    /// Topology of worker connections: all-to-all or ring
    topology: Topology,

    /// Output statistics file name
    stats_file: PathBuf,

    /// Number of initial events per worker
    #[arg(short = 'i', long)]
    initial_events: Option<u32>,

    /// Probability for each event to be a remote event [0-1]
    #[arg(short = 'r', long)]
    remote_probability: Option<f64>,

    /// Number of cycles to simulate
    #[arg(short = 'c', long)]
    num_cycles: Option<u64>,

    /// Verbosity of workers
    #[arg(short, long)]
    verbosity: Option<u32>,

    /// Latency of every link between workers
    #[arg(long)]
    look_ahead: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number ports by peer worker id instead of by order (all-to-all only)
    #[arg(long)]
    worker_ports: bool,

    /// Stop each worker at its first event past the horizon instead of a timer
    #[arg(long)]
    self_terminating: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    println!("\nStarting benchmark");

    let mut network = BenchmarkNetwork::new(args.num_workers, args.topology)
        .seed(args.seed)
        .log_level(LevelFilter::Info);
    if let Some(initial_events) = args.initial_events {
        network = network.initial_events(initial_events);
    }
    if let Some(remote_probability) = args.remote_probability {
        network = network.remote_probability(remote_probability);
    }
    if let Some(num_cycles) = args.num_cycles {
        network = network.num_cycles(num_cycles);
    }
    if let Some(verbosity) = args.verbosity {
        network = network.verbosity(verbosity);
    }
    if let Some(look_ahead) = args.look_ahead {
        network = network.look_ahead(look_ahead);
    }
    if args.worker_ports {
        network = network.port_layout(PortLayout::WorkerPorts);
    }
    if args.self_terminating {
        network = network.completion(CompletionMode::SelfTerminating);
    }

    let mut sim = network
        .build()
        .wrap_err("failed to build the benchmark network")?;
    let summary = sim.run()?;

    println!("Simulation time: {}", summary.elapsed.as_secs_f64());

    let file = File::create(&args.stats_file)
        .wrap_err_with(|| format!("failed to create {}", args.stats_file.display()))?;
    stats::write_csv(BufWriter::new(file), &statistics::snapshot())?;

    match anykv::try_get::<AggregateOutcome>(AGGREGATE_KEY) {
        Some(Ok(aggregate)) => {
            println!("Total events: {}", aggregate.total_events);
            println!("Events per second: {:.2}", aggregate.events_per_second);
        }
        Some(Err(failure)) => println!(
            "WARNING: aggregation unavailable ({failure}), see event_count in {}",
            args.stats_file.display()
        ),
        None => println!("WARNING: no aggregate was published"),
    }

    Ok(())
}
