use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    Component,
    actor::SharedActor,
    error::SimulationError,
    global::{self, lifecycle::Lifecycle},
    network::Network,
    nursery::Nursery,
    progress::Bar,
    random::Seed,
    time::{Jiffies, timer_manager::TimerManager},
    wiring::Wiring,
};

/// Why the timed part of a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// Every primary component that held the run signalled ok to end.
    PrimariesDone,
    /// Nothing was left to deliver.
    NoEvents,
    /// Simulated time reached the budget.
    TimeBudget,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Simulated time at which the timed run stopped.
    pub end_time: Jiffies,
    /// Wall-clock duration of the timed run.
    pub elapsed: Duration,
    pub ended_by: EndReason,
    /// Number of untimed phases that ran, at least one.
    pub phases: u32,
}

pub struct Simulation {
    actors: Vec<SharedActor>,
    nursery: Rc<Nursery>,
    time_budget: Jiffies,
    progress_bar: Bar,
    has_run: bool,
}

impl Simulation {
    pub(crate) fn new(
        seed: Seed,
        time_budget: Jiffies,
        wiring: Rc<Wiring>,
        lifecycle: Lifecycle,
        components: Vec<(String, Box<dyn Component>)>,
    ) -> Self {
        let nursery = Nursery::new(components);

        let network_actor = Rc::new(RefCell::new(Network::new(
            seed,
            wiring.clone(),
            nursery.clone(),
        )));

        let timers_actor = Rc::new(RefCell::new(TimerManager::new(nursery.clone())));

        global::setup_access(
            network_actor.clone(),
            timers_actor.clone(),
            wiring,
            lifecycle,
        );

        let actors: Vec<SharedActor> = vec![network_actor, timers_actor];

        Self {
            actors,
            nursery,
            time_budget,
            progress_bar: Bar::new(time_budget),
            has_run: false,
        }
    }

    /// Runs setup, the timed run, the untimed phases and finish.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        if self.has_run {
            return Err(SimulationError::AlreadyRun);
        }
        self.has_run = true;

        let started = Instant::now();
        self.start()?;
        debug!("{} primary components registered", global::primaries());

        let ended_by = loop {
            if global::may_end() {
                break EndReason::PrimariesDone;
            }
            if global::now() >= self.time_budget {
                break EndReason::TimeBudget;
            }
            if !self.step()? {
                break EndReason::NoEvents;
            }
        };

        // For small simulations progress bar is not fullfilling
        self.progress_bar.finish();

        let elapsed = started.elapsed();
        global::set_elapsed_run_time(elapsed);
        let end_time = global::now();
        match ended_by {
            EndReason::TimeBudget => warn!("Time budget {} exhausted", self.time_budget),
            _ => info!("Timed run ended at {end_time} ({ended_by:?}) after {elapsed:?}"),
        }

        let phases = self.run_untimed_phases()?;
        self.nursery.finish_all()?;

        info!("Looks good! ヽ('ー`)ノ");

        Ok(RunSummary {
            end_time,
            elapsed,
            ended_by,
            phases,
        })
    }
}

impl Simulation {
    fn start(&mut self) -> Result<(), SimulationError> {
        for actor in self.actors.iter() {
            actor.borrow_mut().start()?;
            global::schedule(); // Only after start() to avoid double borrow_mut() of SharedActor
        }
        Ok(())
    }

    // Returns false when no actor has anything left to do
    fn step(&mut self) -> Result<bool, SimulationError> {
        let Some((future, actor)) = self.peek_closest() else {
            return Ok(false);
        };
        if future > self.time_budget {
            global::fast_forward_clock(self.time_budget);
            return Ok(true);
        }
        global::fast_forward_clock(future);
        actor.borrow_mut().step()?;
        global::schedule(); // Only after step() to avoid double borrow_mut() of SharedActor
        self.progress_bar.make_progress(future);
        Ok(true)
    }

    fn peek_closest(&self) -> Option<(Jiffies, SharedActor)> {
        let mut closest: Option<(Jiffies, SharedActor)> = None;
        for actor in self.actors.iter() {
            if let Some(time) = actor.borrow().peek_closest() {
                if closest.as_ref().is_none_or(|(min_time, _)| time < *min_time) {
                    closest = Some((time, actor.clone()));
                }
            }
        }
        closest
    }

    fn run_untimed_phases(&mut self) -> Result<u32, SimulationError> {
        let mut phase = 0;
        loop {
            self.nursery.complete_all(phase)?;
            global::schedule();
            let sent = global::close_phase();
            debug!("Untimed phase {phase} closed with {sent} messages");
            if sent == 0 {
                return Ok(phase + 1);
            }
            phase += 1;
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        global::drop_all(); // Clear thread_locals
    }
}
