//! Untyped key-value store shared by everything running on this thread.
//!
//! Components publish results here so the code driving the simulation can
//! read them after [`Simulation::run`](crate::Simulation::run) returns. The
//! store is cleared when the simulation is dropped.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    pub(crate) static ANY_KV: RefCell<HashMap<String, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

pub fn set<T: 'static>(key: &str, value: T) {
    ANY_KV.with(|m| {
        m.borrow_mut().insert(key.to_string(), Box::new(value));
    });
}

pub fn get<T: 'static + Clone>(key: &str) -> T {
    try_get(key).expect("No key or wrong type cast")
}

pub fn try_get<T: 'static + Clone>(key: &str) -> Option<T> {
    ANY_KV.with(|m| {
        m.borrow()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    })
}

pub(crate) fn drop_anykv() {
    ANY_KV.take();
}
