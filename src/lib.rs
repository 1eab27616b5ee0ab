pub mod config;
pub mod net;
pub mod options;
pub mod sim;

pub use net::{Arc, ArcKind, Multiplicity, Net, Place, Transition};
pub use sim::{
    BasicSimulation, SimError, Simulation, SimulationBuilder, TaskSimulation,
    TransitionSimulation,
};
