use linksim::{
    Component, ComponentContext, HandlerResult, Jiffies, MessagePtr, PortNum, TimerId, anykv,
    elapsed_run_time, now, ok_to_end,
};
use linksim::debug_component;
use log::{info, warn};

use crate::{
    aggregation::{AggregateOutcome, AggregationProtocol, TopologyKind},
    completion::CompletionSync,
    config::{CompletionMode, WorkerConfig},
    error::WorkerError,
    event::{Report, WorkerEvent},
    links::LinkSet,
    random::RandomStream,
    traffic::{Route, TrafficGenerator},
};

/// Key under which the root publishes its [`AggregateOutcome`] in `anykv`.
pub const AGGREGATE_KEY: &str = "aggregate";

/// Statistic every worker registers.
pub const EVENT_COUNT: &str = "event_count";

// 1 lifecycle, 2 parameters, 3 per event
macro_rules! verbose {
    ($worker:expr, $level:expr, $($arg:tt)+) => {
        if $worker.config.verbosity >= $level {
            info!(
                "[{}] Benchmark.{}: {}",
                now().0,
                $worker.name,
                format_args!($($arg)+)
            );
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkerState {
    /// Constructed, not set up yet.
    Idle,
    /// Generating traffic.
    Running,
    /// Past completion, still consuming in-flight traffic.
    Draining,
    /// Timed run over.
    Done,
}

impl WorkerState {
    fn advance(self, to: WorkerState) -> Result<WorkerState, WorkerError> {
        use WorkerState::*;
        match (self, to) {
            // A run may end before completion is reached
            (Idle, Running) | (Running, Draining) | (Running, Done) | (Draining, Done) => Ok(to),
            _ => Err(WorkerError::ProtocolViolation(format!(
                "worker cannot go from {self:?} to {to:?}"
            ))),
        }
    }

    fn accept_traffic(self) -> Result<(), WorkerError> {
        match self {
            WorkerState::Running | WorkerState::Draining => Ok(()),
            _ => Err(WorkerError::ProtocolViolation(format!(
                "traffic received while {self:?}"
            ))),
        }
    }
}

pub struct Worker {
    name: String,
    config: WorkerConfig,
    state: WorkerState,
    links: LinkSet,
    traffic: TrafficGenerator,
    completion: CompletionSync,
    aggregation: AggregationProtocol,
}

impl Worker {
    pub fn new(ctx: &mut ComponentContext<'_>, config: WorkerConfig) -> Result<Self, WorkerError> {
        config.validate()?;

        let links = LinkSet::configure(ctx, &config)?;
        let completion = CompletionSync::new(ctx, config.completion_after())?;
        let traffic = TrafficGenerator::new(
            RandomStream::new(ctx.seed()),
            config.remote_probability,
            config.tx_peers(),
            ctx.register_statistic(EVENT_COUNT),
        );
        let aggregation = AggregationProtocol::new(
            ctx.id() == 0,
            TopologyKind::detect(config.num_peers(), config.tx_peers()),
        );

        // Not ending without us
        ctx.register_as_primary();
        ctx.primary_do_not_end();

        let worker = Self {
            name: ctx.name().to_string(),
            config,
            state: WorkerState::Idle,
            links,
            traffic,
            completion,
            aggregation,
        };
        verbose!(worker, 2, "num_peers={}", worker.config.num_peers());
        verbose!(worker, 2, "tx_peers={}", worker.config.tx_peers());
        verbose!(worker, 2, "initial_events={}", worker.config.initial_events);
        verbose!(worker, 2, "remote_probability={}", worker.config.remote_probability);
        verbose!(worker, 2, "num_cycles={}", worker.config.num_cycles);
        Ok(worker)
    }

    fn transition(&mut self, to: WorkerState) -> Result<(), WorkerError> {
        self.state = self.state.advance(to)?;
        debug_component!("{:?}", self.state);
        Ok(())
    }

    fn horizon(&self) -> Jiffies {
        Jiffies(self.config.num_cycles)
    }

    fn emit(&mut self) -> Result<(), WorkerError> {
        let emission = self.traffic.emit_next(&self.links)?;
        verbose!(
            self,
            3,
            "Sending event, rand={:.6} remote={}",
            emission.draw,
            matches!(emission.route, Route::Remote(_))
        );
        Ok(())
    }

    fn own_report(&self) -> Report {
        Report::new(
            elapsed_run_time().as_secs_f64(),
            self.traffic.event_count(),
        )
    }
}

impl Component for Worker {
    fn setup(&mut self) -> HandlerResult {
        verbose!(self, 1, "Setup()");
        self.transition(WorkerState::Running)?;
        for _ in 0..self.config.initial_events {
            self.emit()?;
        }
        if self.config.completion == CompletionMode::Timer {
            self.completion.arm();
        }
        Ok(())
    }

    fn on_event(&mut self, port: PortNum, event: MessagePtr) -> HandlerResult {
        match event.try_as::<WorkerEvent>().as_deref() {
            Some(WorkerEvent::Traffic { .. }) => {}
            Some(WorkerEvent::Report(_)) => {
                return Err(WorkerError::ProtocolViolation(format!(
                    "report received on timed port {port}"
                ))
                .into());
            }
            None => {
                return Err(WorkerError::ProtocolViolation(format!(
                    "bad event type {} on port {port}",
                    event.type_name()
                ))
                .into());
            }
        }

        verbose!(
            self,
            3,
            "Received event on {} port {port}",
            if self.links.is_self_loop(port) { "self" } else { "peer" }
        );

        self.state.accept_traffic()?;

        if now() < self.horizon() {
            self.emit()?;
        } else if self.config.completion == CompletionMode::SelfTerminating
            && self.state == WorkerState::Running
        {
            verbose!(self, 3, "Completing");
            self.transition(WorkerState::Draining)?;
            ok_to_end();
        }
        Ok(())
    }

    fn on_timer(&mut self, id: TimerId) -> HandlerResult {
        self.completion.on_timer(id)?;
        debug_component!("Completion timer {id} fired");
        verbose!(self, 3, "Completing");
        self.transition(WorkerState::Draining)?;
        Ok(())
    }

    fn complete(&mut self, phase: u32) -> HandlerResult {
        if phase == 0 {
            verbose!(self, 1, "Complete() events={}", self.traffic.event_count());
            self.transition(WorkerState::Done)?;
        }
        let own = self.own_report();
        self.aggregation.on_phase(phase, own, &mut self.links)?;
        Ok(())
    }

    fn finish(&mut self) -> HandlerResult {
        verbose!(self, 1, "Finish()");
        let Some(outcome) = self.aggregation.finish() else {
            return Ok(());
        };
        match &outcome {
            Ok(aggregate) => info!(
                "Aggregate: {} events from {} workers, {:.2} events per second",
                aggregate.total_events,
                aggregate.reports + 1,
                aggregate.events_per_second
            ),
            Err(failure) => warn!(
                "Aggregation unavailable ({failure}), see the per-worker {EVENT_COUNT} statistics"
            ),
        }
        anykv::set::<AggregateOutcome>(AGGREGATE_KEY, outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{WorkerState::*, *};

    #[test]
    fn timer_lifecycle() {
        let state = Idle.advance(Running).unwrap();
        let state = state.advance(Draining).unwrap();
        assert_eq!(state.advance(Done).unwrap(), Done);
    }

    #[test]
    fn run_may_end_before_completion() {
        assert_eq!(Running.advance(Done).unwrap(), Done);
    }

    #[test]
    fn rejects_skipped_and_backward_steps() {
        for (from, to) in [
            (Idle, Draining),
            (Idle, Done),
            (Draining, Draining),
            (Draining, Running),
            (Done, Running),
            (Done, Done),
            (Running, Running),
        ] {
            assert!(
                matches!(from.advance(to), Err(WorkerError::ProtocolViolation(_))),
                "{from:?} -> {to:?}"
            );
        }
    }

    #[test]
    fn traffic_only_between_setup_and_the_end_of_the_run() {
        assert!(Running.accept_traffic().is_ok());
        assert!(Draining.accept_traffic().is_ok());
        for state in [Idle, Done] {
            assert!(matches!(
                state.accept_traffic(),
                Err(WorkerError::ProtocolViolation(_))
            ));
        }
    }
}
