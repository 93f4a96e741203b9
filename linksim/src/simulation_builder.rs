use std::collections::HashMap;

use log::LevelFilter;

use crate::{
    Component, ComponentContext, ComponentId, Simulation,
    error::{BuildError, ComponentError},
    global::{lifecycle::Lifecycle, statistics},
    random::{Distributions, Seed},
    time::Jiffies,
    wiring::Wiring,
};

fn init_logger(default_level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format(|buf, record| {
            let module_path = record.module_path().unwrap_or("unknown");
            let crate_name = module_path.split("::").next().unwrap_or(module_path);
            use std::io::Write;
            writeln!(buf, "[{}] {}", crate_name, record.args())
        })
        .try_init();
}

fn resolve<'l>(
    ids: &HashMap<String, ComponentId>,
    (component, port): &'l (String, String),
) -> Result<(ComponentId, &'l str), BuildError> {
    ids.get(component)
        .map(|id| (*id, port.as_str()))
        .ok_or_else(|| BuildError::UnknownComponent(component.clone()))
}

type Factory =
    Box<dyn FnOnce(&mut ComponentContext<'_>) -> Result<Box<dyn Component>, ComponentError>>;

struct LinkDescription {
    a: (String, String),
    b: (String, String),
    latency: Distributions,
}

pub struct SimulationBuilder {
    seed: Seed,
    time_budget: Jiffies,
    default_log_level: LevelFilter,
    components: Vec<(String, Factory)>,
    links: Vec<LinkDescription>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        SimulationBuilder {
            seed: 69,
            time_budget: Jiffies(1_000_000),
            default_log_level: LevelFilter::Error,
            components: Vec::new(),
            links: Vec::new(),
        }
    }
}

impl SimulationBuilder {
    /// Adds a component. The factory runs inside [`build`](Self::build),
    /// after every link is known, in the order components were added.
    pub fn add_component<C, E, F>(mut self, name: &str, factory: F) -> Self
    where
        C: Component + 'static,
        E: Into<ComponentError>,
        F: FnOnce(&mut ComponentContext<'_>) -> Result<C, E> + 'static,
    {
        self.components.push((
            name.to_string(),
            Box::new(move |ctx: &mut ComponentContext<'_>| {
                factory(ctx)
                    .map(|component| Box::new(component) as Box<dyn Component>)
                    .map_err(Into::into)
            }),
        ));
        self
    }

    /// Links port `a.1` of component `a.0` with port `b.1` of component `b.0`.
    pub fn connect(mut self, a: (&str, &str), b: (&str, &str), latency: Distributions) -> Self {
        self.links.push(LinkDescription {
            a: (a.0.to_string(), a.1.to_string()),
            b: (b.0.to_string(), b.1.to_string()),
            latency,
        });
        self
    }

    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn time_budget(mut self, time_budget: Jiffies) -> Self {
        self.time_budget = time_budget;
        self
    }

    /// Log level used when `RUST_LOG` is not set.
    pub fn default_log_level(mut self, level: LevelFilter) -> Self {
        self.default_log_level = level;
        self
    }

    pub fn build(self) -> Result<Simulation, BuildError> {
        init_logger(self.default_log_level);

        let result = self.assemble();
        if result.is_err() {
            statistics::drop_statistics();
        }
        result
    }
}

impl SimulationBuilder {
    fn assemble(self) -> Result<Simulation, BuildError> {
        let mut ids: HashMap<String, ComponentId> = HashMap::new();
        for (id, (name, _)) in self.components.iter().enumerate() {
            if ids.insert(name.clone(), id).is_some() {
                return Err(BuildError::DuplicateComponent(name.clone()));
            }
        }

        let mut wiring = Wiring::default();
        for link in &self.links {
            let a = resolve(&ids, &link.a)?;
            let b = resolve(&ids, &link.b)?;
            link.latency
                .check()
                .map_err(|reason| BuildError::InvalidLatency {
                    component: link.a.0.clone(),
                    port: link.a.1.clone(),
                    reason,
                })?;
            wiring
                .connect(a, b, link.latency)
                .map_err(|(id, port)| BuildError::PortConnectedTwice {
                    component: self.components[id].0.clone(),
                    port,
                })?;
        }

        let mut lifecycle = Lifecycle::default();
        let mut components = Vec::with_capacity(self.components.len());
        for (id, (name, factory)) in self.components.into_iter().enumerate() {
            let mut ctx = ComponentContext::new(id, &name, self.seed, &mut wiring, &mut lifecycle);
            let component = factory(&mut ctx).map_err(|source| BuildError::Construction {
                component: name.clone(),
                source,
            })?;
            components.push((name, component));
        }

        if let Some(endpoint) = wiring.first_unconfigured() {
            return Err(BuildError::UnconfiguredPort {
                component: components[endpoint.owner].0.clone(),
                port: endpoint.port.clone(),
            });
        }

        Ok(Simulation::new(
            self.seed,
            self.time_budget,
            std::rc::Rc::new(wiring),
            lifecycle,
            components,
        ))
    }
}
