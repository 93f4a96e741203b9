//! Run-wide unique identifiers.

use std::cell::Cell;

thread_local! {
    pub(crate) static TSO: Cell<usize> = Cell::new(0)
}

/// Returns an identifier never returned before in the current simulation
/// run. Values increase monotonically, so runs with the same configuration
/// see the same identifiers.
pub(crate) fn global_unique_id() -> usize {
    TSO.replace(TSO.get() + 1)
}

pub(crate) fn drop_tso() {
    TSO.take();
}
