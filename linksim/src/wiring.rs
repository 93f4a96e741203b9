use std::collections::HashMap;

use crate::{ComponentId, link::PortNum, random::Distributions};

pub(crate) type EndpointId = usize;

/// One side of a link. Sending on an endpoint delivers to `peer`, which is
/// the endpoint itself for self links.
pub(crate) struct Endpoint {
    pub(crate) owner: ComponentId,
    pub(crate) port: String,
    pub(crate) peer: EndpointId,
    pub(crate) latency: Distributions,
    // Port number handed back to the owner on delivery, set once configured
    pub(crate) handler: Option<PortNum>,
}

#[derive(Default)]
pub(crate) struct Wiring {
    endpoints: Vec<Endpoint>,
    by_port: HashMap<(ComponentId, String), EndpointId>,
}

impl Wiring {
    /// Connects two ports with a bidirectional link. Returns the port that
    /// was already taken on failure.
    pub(crate) fn connect(
        &mut self,
        a: (ComponentId, &str),
        b: (ComponentId, &str),
        latency: Distributions,
    ) -> Result<(), (ComponentId, String)> {
        for (owner, port) in [a, b] {
            if self.lookup(owner, port).is_some() {
                return Err((owner, port.to_string()));
            }
        }
        if a == b {
            return Err((a.0, a.1.to_string()));
        }

        let first = self.endpoints.len();
        let second = first + 1;
        self.push(a.0, a.1, second, latency);
        self.push(b.0, b.1, first, latency);
        Ok(())
    }

    pub(crate) fn self_link(
        &mut self,
        owner: ComponentId,
        port: &str,
        latency: Distributions,
        handler: PortNum,
    ) -> EndpointId {
        let id = self.endpoints.len();
        self.push(owner, port, id, latency);
        self.endpoints[id].handler = Some(handler);
        id
    }

    pub(crate) fn lookup(&self, owner: ComponentId, port: &str) -> Option<EndpointId> {
        self.by_port.get(&(owner, port.to_string())).copied()
    }

    pub(crate) fn endpoint(&self, id: EndpointId) -> &Endpoint {
        &self.endpoints[id]
    }

    pub(crate) fn endpoint_mut(&mut self, id: EndpointId) -> &mut Endpoint {
        &mut self.endpoints[id]
    }

    pub(crate) fn size(&self) -> usize {
        self.endpoints.len()
    }

    /// Ports of `owner` that are linked to another endpoint, sorted by name.
    pub(crate) fn connected_ports(&self, owner: ComponentId) -> Vec<String> {
        let mut ports: Vec<String> = self
            .endpoints
            .iter()
            .enumerate()
            .filter(|(id, e)| e.owner == owner && e.peer != *id)
            .map(|(_, e)| e.port.clone())
            .collect();
        ports.sort();
        ports
    }

    pub(crate) fn first_unconfigured(&self) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.handler.is_none())
    }

    fn push(&mut self, owner: ComponentId, port: &str, peer: EndpointId, latency: Distributions) {
        self.by_port
            .insert((owner, port.to_string()), self.endpoints.len());
        self.endpoints.push(Endpoint {
            owner,
            port: port.to_string(),
            peer,
            latency,
            handler: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Jiffies;

    #[test]
    fn connect_links_both_directions() {
        let mut wiring = Wiring::default();
        wiring
            .connect((0, "port_0"), (1, "port_3"), Distributions::Fixed(Jiffies(2)))
            .unwrap();

        let a = wiring.lookup(0, "port_0").unwrap();
        let b = wiring.lookup(1, "port_3").unwrap();
        assert_eq!(wiring.endpoint(a).peer, b);
        assert_eq!(wiring.endpoint(b).peer, a);
        assert_eq!(wiring.connected_ports(1), vec!["port_3".to_string()]);
    }

    #[test]
    fn port_cannot_be_connected_twice() {
        let mut wiring = Wiring::default();
        let latency = Distributions::Fixed(Jiffies(1));
        wiring.connect((0, "port_0"), (1, "port_0"), latency).unwrap();
        let err = wiring
            .connect((2, "port_0"), (1, "port_0"), latency)
            .unwrap_err();
        assert_eq!(err, (1, "port_0".to_string()));
    }

    #[test]
    fn self_links_are_not_reported_as_connected() {
        let mut wiring = Wiring::default();
        let id = wiring.self_link(0, "port_1", Distributions::Fixed(Jiffies(1)), 1);
        assert_eq!(wiring.endpoint(id).peer, id);
        assert!(wiring.connected_ports(0).is_empty());
        assert!(wiring.first_unconfigured().is_none());
    }
}
