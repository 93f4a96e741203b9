//! Simulated time of the run on this thread.

use std::cell::Cell;

use log::trace;

use crate::Jiffies;

thread_local! {
    pub(crate) static CLOCK: Cell<Jiffies> = const { Cell::new(Jiffies::ZERO) };
}

pub(crate) fn drop_clock() {
    CLOCK.take();
}

/// Moves time to `future`. Time never goes backwards.
pub(crate) fn fast_forward_clock(future: Jiffies) {
    let present = CLOCK.replace(future);
    debug_assert!(present <= future, "clock moved from {present} back to {future}");
    trace!("Now {future}");
}

/// Current simulated time. Zero outside of a run.
pub fn now() -> Jiffies {
    CLOCK.get()
}
