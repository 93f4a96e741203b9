use std::{cell::RefCell, rc::Rc};

use log::debug;

use crate::{
    Component, ComponentId, HandlerResult, communication::Delivery, error::SimulationError,
    global, now,
};

pub(crate) struct Nursery {
    // Indexed by ComponentId, iteration order is deterministic
    components: Vec<(String, RefCell<Box<dyn Component>>)>,
}

impl Nursery {
    pub(crate) fn new(components: Vec<(String, Box<dyn Component>)>) -> Rc<Self> {
        Rc::new(Self {
            components: components
                .into_iter()
                .map(|(name, component)| (name, RefCell::new(component)))
                .collect(),
        })
    }

    pub(crate) fn deliver(&self, to: ComponentId, delivery: Delivery) -> Result<(), SimulationError> {
        self.with_component(to, |component| match delivery {
            Delivery::Event(port, event) => {
                debug!("Delivering {} to C{to} on port {port}", event.type_name());
                component.on_event(port, event)
            }
            Delivery::Timer(id) => component.on_timer(id),
        })
    }

    pub(crate) fn setup_all(&self) -> Result<(), SimulationError> {
        self.for_each(|component| component.setup())
    }

    pub(crate) fn complete_all(&self, phase: u32) -> Result<(), SimulationError> {
        self.for_each(|component| component.complete(phase))
    }

    pub(crate) fn finish_all(&self) -> Result<(), SimulationError> {
        self.for_each(|component| component.finish())
    }

    pub(crate) fn size(&self) -> usize {
        self.components.len()
    }

    fn for_each(
        &self,
        mut f: impl FnMut(&mut dyn Component) -> HandlerResult,
    ) -> Result<(), SimulationError> {
        (0..self.components.len()).try_for_each(|id| self.with_component(id, &mut f))
    }

    fn with_component(
        &self,
        id: ComponentId,
        f: impl FnOnce(&mut dyn Component) -> HandlerResult,
    ) -> Result<(), SimulationError> {
        let (name, component) = &self.components[id];
        global::set_component(id);
        let result = f(component.borrow_mut().as_mut());
        result.map_err(|source| SimulationError::Component {
            component: name.clone(),
            time: now(),
            source,
        })
    }
}
