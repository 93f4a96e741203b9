//! Statistics sink.
//!
//! Components register named counters while they are constructed and bump
//! them while the simulation runs. The driver reads a [`snapshot`] after the
//! run, before the simulation is dropped.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

/// Monotonically increasing counter owned by one component.
#[derive(Clone, Debug, Default)]
pub struct Statistic {
    value: Rc<Cell<u64>>,
}

impl Statistic {
    /// A counter that is not registered with the sink.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn add_data(&self, amount: u64) {
        self.value.set(self.value.get() + amount);
    }

    pub fn count(&self) -> u64 {
        self.value.get()
    }
}

/// One row of a [`snapshot`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatisticRecord {
    pub component: String,
    pub name: String,
    pub count: u64,
}

thread_local! {
    static STATISTICS: RefCell<Vec<(String, String, Statistic)>> = RefCell::new(Vec::new());
}

pub(crate) fn register(component: &str, name: &str) -> Statistic {
    let statistic = Statistic::default();
    STATISTICS.with_borrow_mut(|stats| {
        stats.push((component.to_string(), name.to_string(), statistic.clone()))
    });
    statistic
}

/// All registered statistics in registration order.
pub fn snapshot() -> Vec<StatisticRecord> {
    STATISTICS.with_borrow(|stats| {
        stats
            .iter()
            .map(|(component, name, statistic)| StatisticRecord {
                component: component.clone(),
                name: name.clone(),
                count: statistic.count(),
            })
            .collect()
    })
}

/// Sum of the statistic called `name` over all components.
pub fn total(name: &str) -> u64 {
    STATISTICS.with_borrow(|stats| {
        stats
            .iter()
            .filter(|(_, n, _)| n == name)
            .map(|(_, _, statistic)| statistic.count())
            .sum()
    })
}

pub(crate) fn drop_statistics() {
    STATISTICS.take();
}
