//! Mailboxes for the untimed `complete` phases.
//!
//! Untimed sends carry no timestamp. What is sent during phase N becomes
//! receivable once the phase is closed, so from phase N+1 on. Messages that
//! are not received stay queued on their endpoint.

use std::{collections::VecDeque, rc::Rc};

use crate::{communication::Message, wiring::EndpointId};

pub(crate) struct PhaseMailbox {
    pending: Vec<(EndpointId, Rc<dyn Message>)>,
    inboxes: Vec<VecDeque<Rc<dyn Message>>>,
}

impl PhaseMailbox {
    pub(crate) fn new(endpoints: usize) -> Self {
        Self {
            pending: Vec::new(),
            inboxes: (0..endpoints).map(|_| VecDeque::new()).collect(),
        }
    }

    pub(crate) fn post(&mut self, dest: EndpointId, message: Rc<dyn Message>) {
        self.pending.push((dest, message));
    }

    pub(crate) fn take(&mut self, endpoint: EndpointId) -> Option<Rc<dyn Message>> {
        self.inboxes.get_mut(endpoint)?.pop_front()
    }

    /// Makes everything posted in the current phase receivable and returns
    /// how many messages were posted.
    pub(crate) fn close_phase(&mut self) -> usize {
        let posted = self.pending.len();
        for (dest, message) in self.pending.drain(..) {
            self.inboxes[dest].push_back(message);
        }
        posted
    }
}
