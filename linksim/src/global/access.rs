use std::{cell::RefCell, rc::Rc, time::Duration};

use log::debug;

use crate::{
    ComponentId, Message,
    actor::EventSubmitter,
    global::lifecycle::Lifecycle,
    network::NetworkActor,
    time::{
        Jiffies,
        timer_manager::{TimerId, TimerManagerActor, next_timer_id},
    },
    untimed::PhaseMailbox,
    wiring::{EndpointId, Wiring},
};

pub(crate) struct SimulationAccess {
    component_on_execution: ComponentId,
    pub(crate) scheduled_messages: Vec<(EndpointId, Jiffies, Rc<dyn Message>)>,
    pub(crate) scheduled_timers: Vec<(ComponentId, TimerId, Jiffies)>,
    wiring: Rc<Wiring>,
    mailbox: PhaseMailbox,
    lifecycle: Lifecycle,
    elapsed: Duration,
    network: NetworkActor,
    timers: TimerManagerActor,
}

impl SimulationAccess {
    fn new(
        network: NetworkActor,
        timers: TimerManagerActor,
        wiring: Rc<Wiring>,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            component_on_execution: 0,
            scheduled_messages: Vec::new(),
            scheduled_timers: Vec::new(),
            mailbox: PhaseMailbox::new(wiring.size()),
            wiring,
            lifecycle,
            elapsed: Duration::ZERO,
            network,
            timers,
        }
    }
}

fn drain_to<T: EventSubmitter>(submitter: &Rc<RefCell<T>>, events: &mut Vec<T::Event>) {
    if !events.is_empty() {
        submitter.borrow_mut().submit(events);
    }
}

impl SimulationAccess {
    fn check_owner(&self, endpoint: EndpointId) {
        debug_assert_eq!(
            self.wiring.endpoint(endpoint).owner,
            self.component_on_execution,
            "Link used by a component that does not own it"
        );
    }

    fn send(&mut self, endpoint: EndpointId, delay: Jiffies, message: Rc<dyn Message>) {
        self.check_owner(endpoint);
        self.scheduled_messages.push((endpoint, delay, message));
    }

    fn send_untimed(&mut self, endpoint: EndpointId, message: Rc<dyn Message>) {
        self.check_owner(endpoint);
        let dest = self.wiring.endpoint(endpoint).peer;
        self.mailbox.post(dest, message);
    }

    fn recv_untimed(&mut self, endpoint: EndpointId) -> Option<Rc<dyn Message>> {
        self.check_owner(endpoint);
        self.mailbox.take(endpoint)
    }

    fn schedule_timer_after(&mut self, after: Jiffies) -> TimerId {
        let timer_id = next_timer_id();
        self.scheduled_timers
            .push((self.component_on_execution, timer_id, after));
        timer_id
    }

    fn drain(&mut self) {
        drain_to(&self.network, &mut self.scheduled_messages);
        drain_to(&self.timers, &mut self.scheduled_timers);
    }
}

// Any actor makes step -> Buffering outgoing events -> Drain them to all actors
// Before any component step the actor sets the component on execution via set_component()
thread_local! {
    pub(crate) static ACCESS_HANDLE: RefCell<Option<SimulationAccess>> = const { RefCell::new(None) };
}

pub(crate) fn drop_access() {
    ACCESS_HANDLE.take();
}

pub(crate) fn setup_access(
    network: NetworkActor,
    timers: TimerManagerActor,
    wiring: Rc<Wiring>,
    lifecycle: Lifecycle,
) {
    ACCESS_HANDLE.with_borrow_mut(|access| {
        *access = Some(SimulationAccess::new(network, timers, wiring, lifecycle))
    });
}

fn with_access<F, T>(f: F) -> T
where
    F: FnOnce(&mut SimulationAccess) -> T,
{
    ACCESS_HANDLE.with_borrow_mut(|access| f(access.as_mut().expect("Out of simulation context")))
}

pub(crate) fn set_component(id: ComponentId) {
    with_access(|access| access.component_on_execution = id);
}

pub(crate) fn schedule() {
    with_access(|access| access.drain());
}

pub(crate) fn may_end() -> bool {
    with_access(|access| access.lifecycle.may_end())
}

pub(crate) fn primaries() -> usize {
    with_access(|access| access.lifecycle.primaries())
}

pub(crate) fn close_phase() -> usize {
    with_access(|access| access.mailbox.close_phase())
}

pub(crate) fn set_elapsed_run_time(elapsed: Duration) {
    with_access(|access| access.elapsed = elapsed);
}

pub(crate) fn send(endpoint: EndpointId, delay: Jiffies, message: Rc<dyn Message>) {
    with_access(|access| access.send(endpoint, delay, message));
}

pub(crate) fn send_untimed(endpoint: EndpointId, message: Rc<dyn Message>) {
    with_access(|access| access.send_untimed(endpoint, message));
}

pub(crate) fn recv_untimed(endpoint: EndpointId) -> Option<Rc<dyn Message>> {
    with_access(|access| access.recv_untimed(endpoint))
}

/// Schedules a timer for the running component. The returned id comes back
/// in [`Component::on_timer`](crate::Component::on_timer).
pub fn schedule_timer_after(after: Jiffies) -> TimerId {
    with_access(|access| access.schedule_timer_after(after))
}

/// Id of the component whose handler is running.
pub fn rank() -> ComponentId {
    with_access(|access| access.component_on_execution)
}

/// Tells the runtime the running primary component no longer needs the
/// timed run.
pub fn ok_to_end() {
    with_access(|access| {
        let id = access.component_on_execution;
        debug!("C{id} signals ok to end");
        access.lifecycle.ok_to_end(id)
    });
}

/// Wall-clock duration of the timed run. Zero until the timed run is over,
/// so it is meaningful in `complete` and `finish`.
pub fn elapsed_run_time() -> Duration {
    with_access(|access| access.elapsed)
}
