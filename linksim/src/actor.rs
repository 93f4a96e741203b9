use std::{cell::RefCell, rc::Rc};

use crate::{error::SimulationError, time::Jiffies};

pub(crate) type SharedActor = Rc<RefCell<dyn SimulationActor>>;

pub(crate) trait SimulationActor {
    fn start(&mut self) -> Result<(), SimulationError>;
    fn step(&mut self) -> Result<(), SimulationError>;
    fn peek_closest(&self) -> Option<Jiffies>;
}

pub(crate) trait EventSubmitter {
    type Event;
    fn submit(&mut self, events: &mut Vec<Self::Event>);
}
