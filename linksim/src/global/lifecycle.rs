use std::collections::BTreeSet;

use log::debug;

use crate::ComponentId;

/// Primary-component end-of-run barrier.
///
/// A primary component that asked the run not to end holds it open until it
/// calls [`ok_to_end`](crate::ok_to_end). The timed run may stop once at
/// least one component held it and none holds it anymore.
#[derive(Default, Debug, Clone)]
pub(crate) struct Lifecycle {
    primaries: BTreeSet<ComponentId>,
    holding: BTreeSet<ComponentId>,
    held_once: bool,
}

impl Lifecycle {
    pub(crate) fn register_primary(&mut self, id: ComponentId) {
        self.primaries.insert(id);
    }

    pub(crate) fn do_not_end(&mut self, id: ComponentId) {
        self.primaries.insert(id);
        self.holding.insert(id);
        self.held_once = true;
    }

    pub(crate) fn ok_to_end(&mut self, id: ComponentId) {
        if self.holding.remove(&id) {
            debug!(
                "C{id} is ok to end, {} primaries still running",
                self.holding.len()
            );
        }
    }

    pub(crate) fn may_end(&self) -> bool {
        self.held_once && self.holding.is_empty()
    }

    pub(crate) fn primaries(&self) -> usize {
        self.primaries.len()
    }
}
