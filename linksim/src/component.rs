//! Components and their construction context.

use crate::{
    Jiffies, Link, PortNum,
    error::{ComponentError, LinkError},
    global::{lifecycle::Lifecycle, statistics},
    random::{self, Distributions, Seed},
    statistics::Statistic,
    time::TimerId,
    wiring::Wiring,
};

/// Identifier of a component, assigned from 0 in the order components are
/// added to the [`SimulationBuilder`](crate::SimulationBuilder).
pub type ComponentId = usize;

/// Result of every [`Component`] handler. An error aborts the run.
pub type HandlerResult = Result<(), ComponentError>;

/// Behavior of a simulated component.
///
/// The runtime calls `setup` once at time zero, then `on_event` and
/// `on_timer` in simulated time order until the timed run ends. After that
/// `complete` is called for phase 0, 1, … on every component, as long as
/// the previous phase sent untimed messages. `finish` comes last.
///
/// Inside every handler the globals of the crate are available: [`now`],
/// [`rank`], [`schedule_timer_after`], [`ok_to_end`] and
/// [`elapsed_run_time`].
///
/// [`now`]: crate::now
/// [`rank`]: crate::rank
/// [`schedule_timer_after`]: crate::schedule_timer_after
/// [`ok_to_end`]: crate::ok_to_end
/// [`elapsed_run_time`]: crate::elapsed_run_time
pub trait Component {
    fn setup(&mut self) -> HandlerResult {
        Ok(())
    }

    /// An event arrived on the port configured with number `port`.
    fn on_event(&mut self, port: PortNum, event: crate::MessagePtr) -> HandlerResult;

    fn on_timer(&mut self, _id: TimerId) -> HandlerResult {
        Ok(())
    }

    fn complete(&mut self, _phase: u32) -> HandlerResult {
        Ok(())
    }

    fn finish(&mut self) -> HandlerResult {
        Ok(())
    }
}

/// What a component may do while it is being constructed.
pub struct ComponentContext<'a> {
    id: ComponentId,
    name: &'a str,
    base_seed: Seed,
    wiring: &'a mut Wiring,
    lifecycle: &'a mut Lifecycle,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(
        id: ComponentId,
        name: &'a str,
        base_seed: Seed,
        wiring: &'a mut Wiring,
        lifecycle: &'a mut Lifecycle,
    ) -> Self {
        Self {
            id,
            name,
            base_seed,
            wiring,
            lifecycle,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Seed reserved for this component: the simulation seed plus the id.
    pub fn seed(&self) -> Seed {
        random::derive_seed(self.base_seed, self.id)
    }

    pub fn is_port_connected(&self, port: &str) -> bool {
        self.wiring
            .lookup(self.id, port)
            .is_some_and(|endpoint| self.wiring.endpoint(endpoint).peer != endpoint)
    }

    /// Names of the ports the builder linked to this component, sorted.
    pub fn connected_ports(&self) -> Vec<String> {
        self.wiring.connected_ports(self.id)
    }

    /// Takes over a port the builder connected to another component.
    pub fn configure_link(&mut self, port: &str, port_num: PortNum) -> Result<Link, LinkError> {
        let endpoint = self
            .wiring
            .lookup(self.id, port)
            .ok_or_else(|| LinkError::NotConnected {
                component: self.name.to_string(),
                port: port.to_string(),
            })?;
        let entry = self.wiring.endpoint_mut(endpoint);
        if entry.handler.is_some() {
            return Err(LinkError::AlreadyConfigured {
                component: self.name.to_string(),
                port: port.to_string(),
            });
        }
        entry.handler = Some(port_num);
        Ok(Link::new(endpoint, port_num))
    }

    /// Creates a link from this component back to itself on a port the
    /// builder left unconnected.
    pub fn configure_self_link(
        &mut self,
        port: &str,
        latency: Jiffies,
        port_num: PortNum,
    ) -> Result<Link, LinkError> {
        if let Some(endpoint) = self.wiring.lookup(self.id, port) {
            let component = self.name.to_string();
            let port = port.to_string();
            return Err(if self.wiring.endpoint(endpoint).peer == endpoint {
                LinkError::AlreadyConfigured { component, port }
            } else {
                LinkError::AlreadyConnected { component, port }
            });
        }
        let endpoint =
            self.wiring
                .self_link(self.id, port, Distributions::Fixed(latency), port_num);
        Ok(Link::new(endpoint, port_num))
    }

    pub fn register_statistic(&mut self, name: &str) -> Statistic {
        statistics::register(self.name, name)
    }

    pub fn register_as_primary(&mut self) {
        self.lifecycle.register_primary(self.id);
    }

    /// Holds the timed run open until this component calls
    /// [`ok_to_end`](crate::ok_to_end).
    pub fn primary_do_not_end(&mut self) {
        self.lifecycle.do_not_end(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configures_connected_and_self_links() {
        let mut wiring = Wiring::default();
        let mut lifecycle = Lifecycle::default();
        wiring
            .connect((0, "port_0"), (1, "port_0"), Distributions::Fixed(Jiffies(1)))
            .unwrap();

        let mut ctx = ComponentContext::new(0, "Worker_0", 100, &mut wiring, &mut lifecycle);
        assert_eq!(ctx.seed(), 100);
        assert!(ctx.is_port_connected("port_0"));
        assert!(!ctx.is_port_connected("port_1"));

        let remote = ctx.configure_link("port_0", 0).unwrap();
        assert_eq!(remote.port(), 0);
        assert!(matches!(
            ctx.configure_link("port_0", 0),
            Err(LinkError::AlreadyConfigured { .. })
        ));
        assert!(matches!(
            ctx.configure_link("port_1", 1),
            Err(LinkError::NotConnected { .. })
        ));
        assert!(matches!(
            ctx.configure_self_link("port_0", Jiffies(1), 1),
            Err(LinkError::AlreadyConnected { .. })
        ));

        let local = ctx.configure_self_link("port_1", Jiffies(1), 1).unwrap();
        assert_ne!(local, remote);
        assert!(!ctx.is_port_connected("port_1"));
        assert_eq!(ctx.connected_ports(), vec!["port_0".to_string()]);
    }

    #[test]
    fn seed_is_offset_by_component_id() {
        let mut wiring = Wiring::default();
        let mut lifecycle = Lifecycle::default();
        let ctx = ComponentContext::new(4, "Worker_4", 12345678, &mut wiring, &mut lifecycle);
        assert_eq!(ctx.seed(), 12345682);
    }
}
