pub mod engine;
pub mod functions;
pub mod registry;

mod events;
mod group;
mod prompt;

pub use engine::{Colloquy, ColloquyBuilder, RunStatus};
pub use functions::{FunctionHandler, FunctionRegistry, FunctionSpec};
pub use registry::{NodeRegistry, RouteTarget, RoutingGraph};
