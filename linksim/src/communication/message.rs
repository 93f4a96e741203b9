//! Message types moved over links.

use std::{any::Any, cmp::Reverse, collections::BinaryHeap, rc::Rc};

use crate::{time::Jiffies, wiring::EndpointId};

/// Anything that can travel over a [`Link`](crate::Link).
///
/// Receivers get a type-erased [`MessagePtr`] and must check the concrete
/// type themselves, so components wired to the wrong kind of peer notice it
/// on the first delivery.
pub trait Message: Any {
    /// Name used when a receiver rejects the message.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Type-erased message handed to [`Component::on_event`](crate::Component::on_event)
/// and returned by [`Link::recv_untimed`](crate::Link::recv_untimed).
pub struct MessagePtr(pub Rc<dyn Message>);

impl MessagePtr {
    pub fn try_as<T: 'static>(&self) -> Option<Rc<T>> {
        (self.0.clone() as Rc<dyn Any>).downcast::<T>().ok()
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl std::fmt::Debug for MessagePtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessagePtr({})", self.type_name())
    }
}

#[derive(Clone)]
pub(crate) struct RoutedMessage {
    pub(crate) arrival_time: Jiffies,
    // Submission order, breaks ties between equal arrival times
    pub(crate) seq: u64,
    pub(crate) dest: EndpointId,
    pub(crate) message: Rc<dyn Message>,
}

impl RoutedMessage {
    fn key(&self) -> (Jiffies, u64) {
        (self.arrival_time, self.seq)
    }
}

impl PartialEq for RoutedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RoutedMessage {}

impl PartialOrd for RoutedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RoutedMessage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

pub(crate) type TimePriorityMessageQueue = BinaryHeap<Reverse<RoutedMessage>>;
