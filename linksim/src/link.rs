use std::rc::Rc;

use crate::{Message, MessagePtr, global, time::Jiffies, wiring::EndpointId};

/// Number a component picks for a port when configuring it. Deliveries on
/// the port come back to [`Component::on_event`](crate::Component::on_event)
/// with this number.
pub type PortNum = usize;

/// Handle to one configured port of a component.
///
/// Links are only usable from inside the handlers of the component that
/// configured them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    endpoint: EndpointId,
    port: PortNum,
}

impl Link {
    pub(crate) fn new(endpoint: EndpointId, port: PortNum) -> Self {
        Self { endpoint, port }
    }

    pub fn port(&self) -> PortNum {
        self.port
    }

    /// Delivers `message` to the other side after the link latency.
    pub fn send(&self, message: impl Message + 'static) {
        self.send_after(Jiffies::ZERO, message);
    }

    /// Delivers `message` to the other side `delay` plus the link latency
    /// from now.
    pub fn send_after(&self, delay: Jiffies, message: impl Message + 'static) {
        global::send(self.endpoint, delay, Rc::new(message));
    }

    /// Queues `message` for the other side. It can be received from the next
    /// untimed phase on.
    pub fn send_untimed(&self, message: impl Message + 'static) {
        global::send_untimed(self.endpoint, Rc::new(message));
    }

    /// Takes the oldest untimed message that arrived on this link, if any.
    pub fn recv_untimed(&self) -> Option<MessagePtr> {
        global::recv_untimed(self.endpoint).map(MessagePtr)
    }
}
