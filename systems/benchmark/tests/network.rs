use benchmark::{
    AGGREGATE_KEY, AggregateOutcome, AggregationFailure, BenchmarkNetwork, CompletionMode,
    EVENT_COUNT, PortLayout, Topology, Worker, WorkerConfig, WorkerError,
    config::ConfigError,
    event::{Report, WorkerEvent},
    links::LinkSetError,
    network::{DEFAULT_SEED, NetworkError, worker_name},
};
use linksim::{
    BuildError, Distributions, EndReason, HandlerResult, Jiffies, Link, LinkError, Message,
    MessagePtr, PortNum, SimulationBuilder, SimulationError, anykv, statistics,
};

fn outcome() -> AggregateOutcome {
    anykv::get::<AggregateOutcome>(AGGREGATE_KEY)
}

fn counts() -> Vec<u64> {
    statistics::snapshot()
        .into_iter()
        .filter(|record| record.name == EVENT_COUNT)
        .map(|record| record.count)
        .collect()
}

#[test]
fn all_to_all_aggregates_every_worker() {
    let mut sim = BenchmarkNetwork::new(4, Topology::AllToAll)
        .initial_events(2)
        .num_cycles(200)
        .build()
        .unwrap();
    let summary = sim.run().unwrap();

    assert_eq!(summary.ended_by, EndReason::PrimariesDone);
    assert_eq!(summary.end_time, Jiffies(201));
    assert_eq!(summary.phases, 2);

    let aggregate = outcome().unwrap();
    assert_eq!(aggregate.reports, 3);
    assert_eq!(aggregate.total_events, statistics::total(EVENT_COUNT));
    assert!(aggregate.events_per_second > 0.0);
    assert_eq!(counts().len(), 4);
}

#[test]
fn worker_indexed_ports_aggregate_too() {
    let mut sim = BenchmarkNetwork::new(4, Topology::AllToAll)
        .port_layout(PortLayout::WorkerPorts)
        .num_cycles(100)
        .build()
        .unwrap();
    sim.run().unwrap();

    let aggregate = outcome().unwrap();
    assert_eq!(aggregate.reports, 3);
    assert_eq!(aggregate.total_events, statistics::total(EVENT_COUNT));
}

#[test]
fn ring_aggregates_around_the_loop() {
    let mut sim = BenchmarkNetwork::new(5, Topology::Ring)
        .initial_events(3)
        .num_cycles(300)
        .build()
        .unwrap();
    let summary = sim.run().unwrap();

    // One phase per hop of the sentinel, plus the quiet one
    assert_eq!(summary.phases, 6);
    let aggregate = outcome().unwrap();
    assert_eq!(aggregate.reports, 4);
    assert_eq!(aggregate.total_events, counts().iter().sum::<u64>());
}

#[test]
fn remote_only_ring_keeps_one_event_per_jiffy() {
    let mut sim = BenchmarkNetwork::new(3, Topology::Ring)
        .remote_probability(1.0)
        .num_cycles(10)
        .build()
        .unwrap();
    sim.run().unwrap();

    // Initial burst plus one event for every arrival at t = 1..=9
    assert_eq!(counts(), vec![10, 10, 10]);
    assert_eq!(outcome().unwrap().total_events, 30);
}

#[test]
fn local_only_worker_counts_its_self_loop() {
    let mut sim = BenchmarkNetwork::new(1, Topology::AllToAll)
        .remote_probability(0.0)
        .num_cycles(10)
        .build()
        .unwrap();
    let summary = sim.run().unwrap();

    // Emissions at t = 0, 2, 4, 6, 8; the one arriving at 10 is not re-emitted
    assert_eq!(counts(), vec![5]);
    assert_eq!(summary.end_time, Jiffies(11));
    let aggregate = outcome().unwrap();
    assert_eq!(aggregate.total_events, 5);
    assert_eq!(aggregate.reports, 0);
}

#[test]
fn initial_burst_multiplies_local_chains() {
    let mut sim = BenchmarkNetwork::new(1, Topology::AllToAll)
        .remote_probability(0.0)
        .initial_events(3)
        .num_cycles(10)
        .build()
        .unwrap();
    sim.run().unwrap();
    assert_eq!(counts(), vec![15]);
}

#[test]
fn same_seed_same_counts() {
    let run = |seed| {
        let mut sim = BenchmarkNetwork::new(4, Topology::AllToAll)
            .initial_events(4)
            .num_cycles(500)
            .seed(seed)
            .build()
            .unwrap();
        sim.run().unwrap();
        counts()
    };
    let first = run(DEFAULT_SEED);
    assert_eq!(first, run(DEFAULT_SEED));
    assert_ne!(first, run(DEFAULT_SEED + 1000));
}

#[test]
fn self_terminating_workers_end_after_the_horizon() {
    let mut sim = BenchmarkNetwork::new(3, Topology::AllToAll)
        .initial_events(8)
        .num_cycles(50)
        .completion(CompletionMode::SelfTerminating)
        .build()
        .unwrap();
    let summary = sim.run().unwrap();

    assert!(matches!(
        summary.ended_by,
        EndReason::PrimariesDone | EndReason::NoEvents
    ));
    assert!(summary.end_time >= Jiffies(50) && summary.end_time <= Jiffies(51));
    assert_eq!(outcome().unwrap().total_events, statistics::total(EVENT_COUNT));
}

fn build_all_to_all(n: usize, config: WorkerConfig) -> Result<linksim::Simulation, BuildError> {
    let network = BenchmarkNetwork::new(n as u32, Topology::AllToAll);
    let mut builder = SimulationBuilder::default()
        .seed(DEFAULT_SEED)
        .time_budget(Jiffies(config.num_cycles + 10));
    for id in 0..n {
        let config = config.clone();
        builder = builder.add_component(&worker_name(id), move |ctx| Worker::new(ctx, config));
    }
    for ((a, port_a), (b, port_b)) in network.port_pairs() {
        builder = builder.connect(
            (&worker_name(a), &format!("port_{port_a}")),
            (&worker_name(b), &format!("port_{port_b}")),
            Distributions::Fixed(Jiffies(1)),
        );
    }
    builder.build()
}

#[test]
fn unsupported_topology_falls_back_without_crashing() {
    let config = WorkerConfig::peers(4, 2).num_cycles(100);
    let mut sim = build_all_to_all(5, config).unwrap();
    let summary = sim.run().unwrap();

    assert_eq!(summary.phases, 1);
    assert_eq!(
        outcome(),
        Err(AggregationFailure::UnsupportedTopology {
            num_peers: 4,
            tx_peers: 2
        })
    );
    assert_eq!(counts().len(), 5);
    assert!(statistics::total(EVENT_COUNT) >= 5);
}

#[test]
fn huge_horizon_is_rejected_instead_of_overflowing() {
    let result = BenchmarkNetwork::new(2, Topology::AllToAll)
        .num_cycles(u64::MAX)
        .build();
    assert!(matches!(
        result,
        Err(NetworkError::Config(ConfigError::HorizonTooLarge { .. }))
    ));
}

#[test]
fn invalid_parameters_fail_before_the_run() {
    let result = BenchmarkNetwork::new(4, Topology::AllToAll)
        .remote_probability(1.5)
        .build();
    assert!(matches!(result, Err(NetworkError::Config(_))));

    let result = BenchmarkNetwork::new(4, Topology::AllToAll)
        .num_cycles(5)
        .look_ahead(10)
        .build();
    assert!(matches!(result, Err(NetworkError::Config(_))));
}

fn construction_error(result: Result<linksim::Simulation, BuildError>) -> (String, WorkerError) {
    match result {
        Err(BuildError::Construction { component, source }) => {
            let error = source
                .downcast::<WorkerError>()
                .map(|error| *error)
                .unwrap_or_else(|source| panic!("not a worker error: {source}"));
            (component, error)
        }
        Err(other) => panic!("unexpected build error: {other}"),
        Ok(_) => panic!("build succeeded"),
    }
}

#[test]
fn missing_peer_port_is_a_configuration_error() {
    // Ring workers need port_0 and port_1
    let result = SimulationBuilder::default()
        .add_component("Worker_0", |ctx| Worker::new(ctx, WorkerConfig::peers(2, 1)))
        .add_component("Worker_1", |ctx| Worker::new(ctx, WorkerConfig::peers(2, 1)))
        .connect(
            ("Worker_0", "port_0"),
            ("Worker_1", "port_1"),
            Distributions::Fixed(Jiffies(1)),
        )
        .build();
    let (component, error) = construction_error(result);
    assert_eq!(component, "Worker_0");
    assert!(matches!(
        error,
        WorkerError::Links(LinkSetError::MissingPort { port, .. }) if port == "port_1"
    ));
}

#[test]
fn connected_self_loop_port_is_rejected() {
    let config = WorkerConfig::peers(1, 1);
    let result = SimulationBuilder::default()
        .add_component("Worker_0", move |ctx| Worker::new(ctx, config))
        .add_component("Worker_1", |ctx| Worker::new(ctx, WorkerConfig::peers(1, 1)))
        .connect(
            ("Worker_0", "port_1"),
            ("Worker_1", "port_0"),
            Distributions::Fixed(Jiffies(1)),
        )
        .build();
    let (_, error) = construction_error(result);
    assert!(matches!(
        error,
        WorkerError::Links(LinkSetError::UnexpectedPort { port, .. }) if port == "port_1"
    ));
}

#[test]
fn connected_completion_port_is_rejected() {
    let result = SimulationBuilder::default()
        .add_component("Worker_0", |ctx| {
            Worker::new(ctx, WorkerConfig::peers(0, 0).remote_probability(0.0))
        })
        .add_component("Worker_1", |ctx| {
            Worker::new(ctx, WorkerConfig::peers(0, 0).remote_probability(0.0))
        })
        .connect(
            ("Worker_0", "completion_port"),
            ("Worker_1", "completion_port"),
            Distributions::Fixed(Jiffies(1)),
        )
        .build();
    let (component, error) = construction_error(result);
    assert_eq!(component, "Worker_0");
    assert!(matches!(error, WorkerError::CompletionPortConnected(_)));
}

#[test]
fn worker_layout_rejects_its_own_port_as_a_peer() {
    let result = SimulationBuilder::default()
        .add_component("Worker_0", |ctx| Worker::new(ctx, WorkerConfig::workers(2)))
        .add_component("Worker_1", |ctx| Worker::new(ctx, WorkerConfig::workers(2)))
        .connect(
            ("Worker_0", "port_0"),
            ("Worker_1", "port_0"),
            Distributions::Fixed(Jiffies(1)),
        )
        .build();
    let (component, error) = construction_error(result);
    assert_eq!(component, "Worker_0");
    assert!(matches!(
        error,
        WorkerError::Links(LinkSetError::UnexpectedPort { port, .. }) if port == "port_0"
    ));
}

#[test]
fn worker_layout_rejects_ids_beyond_the_layout() {
    let lone = || WorkerConfig::workers(1).remote_probability(0.0);
    let result = SimulationBuilder::default()
        .add_component("Worker_0", move |ctx| Worker::new(ctx, lone()))
        .add_component("Worker_1", move |ctx| Worker::new(ctx, lone()))
        .build();
    let (component, error) = construction_error(result);
    assert_eq!(component, "Worker_1");
    assert!(matches!(
        error,
        WorkerError::Links(LinkSetError::IdOutOfLayout {
            id: 1,
            num_workers: 1
        })
    ));
}

#[test]
fn idle_ring_member_is_counted_not_mistaken_for_the_end() {
    // Worker_2 starts with nothing and its upstream never sends remotely
    let configs = [
        WorkerConfig::peers(2, 1),
        WorkerConfig::peers(2, 1).remote_probability(0.0),
        WorkerConfig::peers(2, 1).initial_events(0),
        WorkerConfig::peers(2, 1),
    ];
    let network = BenchmarkNetwork::new(4, Topology::Ring);
    let mut builder = SimulationBuilder::default()
        .seed(DEFAULT_SEED)
        .time_budget(Jiffies(1_000));
    for (id, config) in configs.into_iter().enumerate() {
        let config = config.num_cycles(400);
        builder = builder.add_component(&worker_name(id), move |ctx| Worker::new(ctx, config));
    }
    for ((a, port_a), (b, port_b)) in network.port_pairs() {
        builder = builder.connect(
            (&worker_name(a), &format!("port_{port_a}")),
            (&worker_name(b), &format!("port_{port_b}")),
            Distributions::Fixed(Jiffies(1)),
        );
    }
    let mut sim = builder.build().unwrap();
    sim.run().unwrap();

    let counts = counts();
    assert_eq!(counts[2], 0);
    let aggregate = outcome().unwrap();
    assert_eq!(aggregate.reports, 3);
    assert_eq!(aggregate.total_events, counts.iter().sum::<u64>());
}

struct Garbage;

impl Message for Garbage {}

enum Payload {
    Garbage,
    Report,
}

struct Rogue {
    link: Link,
    payload: Payload,
}

impl linksim::Component for Rogue {
    fn setup(&mut self) -> HandlerResult {
        match self.payload {
            Payload::Garbage => self.link.send(Garbage),
            Payload::Report => self.link.send(WorkerEvent::Report(Report::new(1.0, 1))),
        }
        Ok(())
    }

    fn on_event(&mut self, _: PortNum, _: MessagePtr) -> HandlerResult {
        Ok(())
    }
}

fn run_against_rogue(payload: Payload) -> Result<linksim::RunSummary, SimulationError> {
    let mut sim = SimulationBuilder::default()
        .add_component("Worker_0", |ctx| {
            Worker::new(ctx, WorkerConfig::peers(1, 1).remote_probability(0.0))
        })
        .add_component("Rogue", move |ctx| {
            Ok::<_, LinkError>(Rogue {
                link: ctx.configure_link("port_0", 0)?,
                payload,
            })
        })
        .connect(
            ("Worker_0", "port_0"),
            ("Rogue", "port_0"),
            Distributions::Fixed(Jiffies(3)),
        )
        .time_budget(Jiffies(100))
        .build()
        .unwrap();
    sim.run()
}

#[test]
fn bad_event_type_aborts_the_run() {
    match run_against_rogue(Payload::Garbage) {
        Err(SimulationError::Component {
            component, time, ..
        }) => {
            assert_eq!(component, "Worker_0");
            assert_eq!(time, Jiffies(3));
        }
        other => panic!("unexpected outcome: {:?}", other.map(|s| s.ended_by)),
    }
}

#[test]
fn report_on_a_timed_link_aborts_the_run() {
    assert!(matches!(
        run_against_rogue(Payload::Report),
        Err(SimulationError::Component { .. })
    ));
}
