//! Post-run aggregation of per-worker event counts.
//!
//! Runs in the untimed phases after the timed run. A worker never learns the
//! global topology; it infers the pattern from its own `num_peers` and
//! `tx_peers`:
//!
//! * all-to-all (`num_peers == tx_peers`): in phase 0 every worker but the
//!   root sends its report on its first peer, which is the root. In phase 1
//!   the root drains one report per peer.
//! * ring (`num_peers == 2`, `tx_peers == 1`): in phase 0 every worker sends
//!   its report downstream, the root sends the tagged sentinel. From
//!   phase 1 on every worker forwards what arrives from upstream, and the
//!   root accumulates until the sentinel comes back around.
//!
//! Anything else is reported as unsupported without any exchange.

use log::debug;
use thiserror::Error;

use crate::{error::WorkerError, event::Report};

/// Ordinal of the peer reports are sent to: the root in all-to-all, the
/// downstream neighbour in a ring.
const DOWNSTREAM: usize = 0;
/// Ordinal reports arrive on in a ring.
const UPSTREAM: usize = 1;

/// Untimed report exchange by peer ordinal.
pub trait UntimedIo {
    fn send_report(&mut self, ordinal: usize, report: Report) -> Result<(), WorkerError>;
    fn recv_report(&mut self, ordinal: usize) -> Result<Option<Report>, WorkerError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyKind {
    AllToAll { num_peers: u32 },
    Ring,
    Unsupported { num_peers: u32, tx_peers: u32 },
}

impl TopologyKind {
    pub fn detect(num_peers: u32, tx_peers: u32) -> Self {
        if num_peers == tx_peers {
            TopologyKind::AllToAll { num_peers }
        } else if num_peers == 2 && tx_peers == 1 {
            TopologyKind::Ring
        } else {
            TopologyKind::Unsupported {
                num_peers,
                tx_peers,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregateReport {
    /// Events of the whole network.
    pub total_events: u64,
    pub events_per_second: f64,
    /// Reports the root combined, its own excluded.
    pub reports: usize,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum AggregationFailure {
    #[error("no report on peer {ordinal}, got {received} of {expected}")]
    MissingReport {
        ordinal: usize,
        received: usize,
        expected: usize,
    },

    #[error("unexpected aggregation phase {0}")]
    UnexpectedPhase(u32),

    #[error("ring did not close after {reports} reports")]
    RingNotClosed { reports: usize },

    #[error("unsupported topology: num_peers={num_peers} tx_peers={tx_peers}")]
    UnsupportedTopology { num_peers: u32, tx_peers: u32 },

    #[error("invalid elapsed time {0}")]
    InvalidElapsed(f64),
}

pub type AggregateOutcome = Result<AggregateReport, AggregationFailure>;

fn rate(report: &Report) -> Result<f64, AggregationFailure> {
    if report.elapsed.is_finite() && report.elapsed > 0.0 {
        Ok(report.count as f64 / report.elapsed)
    } else {
        Err(AggregationFailure::InvalidElapsed(report.elapsed))
    }
}

impl AggregateReport {
    fn own(report: &Report) -> Result<Self, AggregationFailure> {
        Ok(Self {
            total_events: report.count,
            events_per_second: rate(report)?,
            reports: 0,
        })
    }

    fn add(&mut self, report: &Report) -> Result<(), AggregationFailure> {
        self.events_per_second += rate(report)?;
        self.total_events += report.count;
        self.reports += 1;
        Ok(())
    }
}

pub struct AggregationProtocol {
    is_root: bool,
    topology: TopologyKind,
    // Ring root: running totals until the sentinel returns
    totals: Option<AggregateReport>,
    outcome: Option<AggregateOutcome>,
}

impl AggregationProtocol {
    pub fn new(is_root: bool, topology: TopologyKind) -> Self {
        Self {
            is_root,
            topology,
            totals: None,
            outcome: None,
        }
    }

    /// Runs one untimed phase. `own` is this worker's report.
    pub fn on_phase(
        &mut self,
        phase: u32,
        own: Report,
        io: &mut impl UntimedIo,
    ) -> Result<(), WorkerError> {
        match self.topology {
            TopologyKind::AllToAll { num_peers } => self.all_to_all(phase, num_peers, own, io),
            TopologyKind::Ring => self.ring(phase, own, io),
            TopologyKind::Unsupported {
                num_peers,
                tx_peers,
            } => {
                if self.is_root && phase == 0 {
                    self.outcome = Some(Err(AggregationFailure::UnsupportedTopology {
                        num_peers,
                        tx_peers,
                    }));
                }
                Ok(())
            }
        }
    }

    /// Final outcome at the root, `None` everywhere else.
    pub fn finish(&mut self) -> Option<AggregateOutcome> {
        if !self.is_root {
            return None;
        }
        let outcome = self.outcome.take().unwrap_or_else(|| {
            Err(match self.topology {
                TopologyKind::AllToAll { num_peers } => AggregationFailure::MissingReport {
                    ordinal: 0,
                    received: 0,
                    expected: num_peers as usize,
                },
                TopologyKind::Ring => AggregationFailure::RingNotClosed {
                    reports: self.totals.map_or(0, |totals| totals.reports),
                },
                TopologyKind::Unsupported {
                    num_peers,
                    tx_peers,
                } => AggregationFailure::UnsupportedTopology {
                    num_peers,
                    tx_peers,
                },
            })
        });
        Some(outcome)
    }

    fn all_to_all(
        &mut self,
        phase: u32,
        num_peers: u32,
        own: Report,
        io: &mut impl UntimedIo,
    ) -> Result<(), WorkerError> {
        match (phase, self.is_root) {
            (0, false) => io.send_report(DOWNSTREAM, own),
            // Alone, nothing to wait for
            (0, true) if num_peers == 0 => {
                self.outcome = Some(AggregateReport::own(&own));
                Ok(())
            }
            (0, true) => Ok(()),
            (1, true) => {
                let outcome = Self::gather(num_peers as usize, own, io)?;
                self.outcome = Some(outcome);
                Ok(())
            }
            (_, true) => {
                self.outcome = Some(Err(AggregationFailure::UnexpectedPhase(phase)));
                Ok(())
            }
            (_, false) => Ok(()),
        }
    }

    fn gather(
        num_peers: usize,
        own: Report,
        io: &mut impl UntimedIo,
    ) -> Result<AggregateOutcome, WorkerError> {
        let mut aggregate = AggregateReport::own(&own);
        for ordinal in 0..num_peers {
            let Some(report) = io.recv_report(ordinal)? else {
                return Ok(Err(AggregationFailure::MissingReport {
                    ordinal,
                    received: ordinal,
                    expected: num_peers,
                }));
            };
            // Every peer is drained, even after a bad report
            if let Err(failure) = aggregate
                .as_mut()
                .map_or(Ok(()), |totals| totals.add(&report))
            {
                aggregate = Err(failure);
            }
        }
        Ok(aggregate)
    }

    fn ring(&mut self, phase: u32, own: Report, io: &mut impl UntimedIo) -> Result<(), WorkerError> {
        if phase == 0 {
            if !self.is_root {
                return io.send_report(DOWNSTREAM, own);
            }
            io.send_report(DOWNSTREAM, Report::sentinel(own.elapsed))?;
            match AggregateReport::own(&own) {
                Ok(totals) => self.totals = Some(totals),
                Err(failure) => self.outcome = Some(Err(failure)),
            }
            return Ok(());
        }

        if !self.is_root {
            if let Some(report) = io.recv_report(UPSTREAM)? {
                io.send_report(DOWNSTREAM, report)?;
            }
            return Ok(());
        }

        if self.outcome.is_some() {
            return Ok(());
        }
        let Some(report) = io.recv_report(UPSTREAM)? else {
            return Ok(());
        };
        let Some(totals) = self.totals.as_mut() else {
            return Ok(());
        };
        if report.is_sentinel() {
            debug!("Ring closed in phase {phase} after {} reports", totals.reports);
            self.outcome = Some(Ok(*totals));
        } else if let Err(failure) = totals.add(&report) {
            self.outcome = Some(Err(failure));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};

    use super::*;

    #[derive(Default)]
    struct MockIo {
        inboxes: HashMap<usize, VecDeque<Report>>,
        outbox: Vec<(usize, Report)>,
    }

    impl UntimedIo for MockIo {
        fn send_report(&mut self, ordinal: usize, report: Report) -> Result<(), WorkerError> {
            self.outbox.push((ordinal, report));
            Ok(())
        }

        fn recv_report(&mut self, ordinal: usize) -> Result<Option<Report>, WorkerError> {
            Ok(self
                .inboxes
                .get_mut(&ordinal)
                .and_then(|inbox| inbox.pop_front()))
        }
    }

    type Route = HashMap<(usize, usize), (usize, usize)>;

    struct Network {
        nodes: Vec<(AggregationProtocol, MockIo, Report)>,
        routes: Route,
        phases: u32,
    }

    impl Network {
        fn new(topology: TopologyKind, reports: &[Report], routes: Route) -> Self {
            let nodes = reports
                .iter()
                .enumerate()
                .map(|(id, report)| {
                    (
                        AggregationProtocol::new(id == 0, topology),
                        MockIo::default(),
                        *report,
                    )
                })
                .collect();
            Self {
                nodes,
                routes,
                phases: 0,
            }
        }

        // Same barrier as the runtime: stop after a phase that sent nothing
        fn run(&mut self) {
            for phase in 0.. {
                for (protocol, io, own) in self.nodes.iter_mut() {
                    protocol.on_phase(phase, *own, io).unwrap();
                }
                let mut sent = Vec::new();
                for (id, (_, io, _)) in self.nodes.iter_mut().enumerate() {
                    for (ordinal, report) in io.outbox.drain(..) {
                        sent.push((self.routes[&(id, ordinal)], report));
                    }
                }
                if sent.is_empty() {
                    self.phases = phase + 1;
                    return;
                }
                for ((node, ordinal), report) in sent {
                    self.nodes[node]
                        .1
                        .inboxes
                        .entry(ordinal)
                        .or_default()
                        .push_back(report);
                }
            }
        }

        fn outcome(&mut self) -> AggregateOutcome {
            for (protocol, _, _) in self.nodes.iter_mut().skip(1) {
                assert!(protocol.finish().is_none());
            }
            self.nodes[0].0.finish().unwrap()
        }
    }

    fn all_to_all_routes(n: usize) -> Route {
        let mut ports = vec![0; n];
        let mut routes = Route::new();
        for a in 0..n {
            for b in a + 1..n {
                routes.insert((a, ports[a]), (b, ports[b]));
                routes.insert((b, ports[b]), (a, ports[a]));
                ports[a] += 1;
                ports[b] += 1;
            }
        }
        routes
    }

    fn ring_routes(n: usize) -> Route {
        (0..n)
            .flat_map(|a| {
                let b = (a + 1) % n;
                [((a, 0), (b, 1)), ((b, 1), (a, 0))]
            })
            .collect()
    }

    fn report(elapsed: f64, count: u64) -> Report {
        Report::new(elapsed, count)
    }

    #[test]
    fn detects_topologies() {
        assert_eq!(
            TopologyKind::detect(3, 3),
            TopologyKind::AllToAll { num_peers: 3 }
        );
        assert_eq!(TopologyKind::detect(2, 1), TopologyKind::Ring);
        assert_eq!(
            TopologyKind::detect(2, 2),
            TopologyKind::AllToAll { num_peers: 2 }
        );
        assert_eq!(
            TopologyKind::detect(4, 2),
            TopologyKind::Unsupported {
                num_peers: 4,
                tx_peers: 2
            }
        );
    }

    #[test]
    fn all_to_all_root_sums_every_peer() {
        let reports = [
            report(2.0, 100),
            report(2.0, 200),
            report(4.0, 400),
            report(1.0, 50),
        ];
        let mut network = Network::new(
            TopologyKind::AllToAll { num_peers: 3 },
            &reports,
            all_to_all_routes(4),
        );
        network.run();

        let aggregate = network.outcome().unwrap();
        assert_eq!(aggregate.reports, 3);
        assert_eq!(aggregate.total_events, 750);
        assert_eq!(aggregate.events_per_second, 50.0 + 100.0 + 100.0 + 50.0);
        assert_eq!(network.phases, 2);
    }

    #[test]
    fn all_to_all_missing_report_fails() {
        let mut root = AggregationProtocol::new(true, TopologyKind::AllToAll { num_peers: 3 });
        let mut io = MockIo::default();
        io.inboxes.entry(0).or_default().push_back(report(1.0, 10));
        io.inboxes.entry(1).or_default().push_back(report(1.0, 10));

        let own = report(1.0, 10);
        root.on_phase(0, own, &mut io).unwrap();
        root.on_phase(1, own, &mut io).unwrap();
        assert!(io.outbox.is_empty());
        assert_eq!(
            root.finish(),
            Some(Err(AggregationFailure::MissingReport {
                ordinal: 2,
                received: 2,
                expected: 3
            }))
        );
    }

    #[test]
    fn all_to_all_later_phase_is_unexpected() {
        let mut root = AggregationProtocol::new(true, TopologyKind::AllToAll { num_peers: 1 });
        let mut io = MockIo::default();
        io.inboxes.entry(0).or_default().push_back(report(1.0, 10));
        let own = report(1.0, 10);
        for phase in 0..3 {
            root.on_phase(phase, own, &mut io).unwrap();
        }
        assert_eq!(
            root.finish(),
            Some(Err(AggregationFailure::UnexpectedPhase(2)))
        );
    }

    #[test]
    fn lonely_root_reports_itself() {
        let mut network = Network::new(
            TopologyKind::AllToAll { num_peers: 0 },
            &[report(0.5, 10)],
            Route::new(),
        );
        network.run();
        assert_eq!(
            network.outcome(),
            Ok(AggregateReport {
                total_events: 10,
                events_per_second: 20.0,
                reports: 0
            })
        );
    }

    #[test]
    fn ring_closes_at_the_sentinel() {
        let reports: Vec<Report> = (1..=5).map(|i| report(1.0, i * 10)).collect();
        let mut network = Network::new(TopologyKind::Ring, &reports, ring_routes(5));
        network.run();

        let aggregate = network.outcome().unwrap();
        assert_eq!(aggregate.reports, 4);
        assert_eq!(aggregate.total_events, 150);
        assert_eq!(aggregate.events_per_second, 150.0);
        // The sentinel needs one phase per hop
        assert_eq!(network.phases, 6);
    }

    #[test]
    fn ring_counts_idle_workers_instead_of_closing_early() {
        let reports = [
            report(1.0, 10),
            report(1.0, 20),
            report(1.0, 0),
            report(1.0, 30),
        ];
        let mut network = Network::new(TopologyKind::Ring, &reports, ring_routes(4));
        network.run();

        let aggregate = network.outcome().unwrap();
        assert_eq!(aggregate.reports, 3);
        assert_eq!(aggregate.total_events, 60);
        assert_eq!(network.phases, 5);
    }

    #[test]
    fn zero_count_report_is_not_a_sentinel() {
        assert!(!report(1.0, 0).is_sentinel());
        let sentinel = Report::sentinel(1.0);
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.count, 0);
    }

    #[test]
    fn ring_of_two() {
        let mut network = Network::new(
            TopologyKind::Ring,
            &[report(2.0, 8), report(2.0, 4)],
            ring_routes(2),
        );
        network.run();
        assert_eq!(network.outcome().map(|a| a.total_events), Ok(12));
    }

    #[test]
    fn ring_without_sentinel_does_not_close() {
        let mut root = AggregationProtocol::new(true, TopologyKind::Ring);
        let mut io = MockIo::default();
        let own = report(1.0, 1);
        root.on_phase(0, own, &mut io).unwrap();
        assert_eq!(io.outbox, vec![(0, Report::sentinel(1.0))]);

        io.inboxes.entry(1).or_default().push_back(report(1.0, 5));
        root.on_phase(1, own, &mut io).unwrap();
        root.on_phase(2, own, &mut io).unwrap();
        assert_eq!(
            root.finish(),
            Some(Err(AggregationFailure::RingNotClosed { reports: 1 }))
        );
    }

    #[test]
    fn unsupported_topology_exchanges_nothing() {
        let topology = TopologyKind::detect(4, 2);
        let mut network = Network::new(
            topology,
            &[report(1.0, 1), report(1.0, 2), report(1.0, 3)],
            Route::new(),
        );
        network.run();
        assert_eq!(network.phases, 1);
        assert_eq!(
            network.outcome(),
            Err(AggregationFailure::UnsupportedTopology {
                num_peers: 4,
                tx_peers: 2
            })
        );
    }

    #[test]
    fn zero_elapsed_is_invalid() {
        let mut network = Network::new(
            TopologyKind::AllToAll { num_peers: 1 },
            &[report(0.0, 10), report(1.0, 10)],
            all_to_all_routes(2),
        );
        network.run();
        assert_eq!(
            network.outcome(),
            Err(AggregationFailure::InvalidElapsed(0.0))
        );
    }
}
